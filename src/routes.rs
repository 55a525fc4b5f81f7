use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};

use crate::state::AppServices;
use crate::{activities_api, events_api, health, keys_api, participants_api, qr_api};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/v1/", get(health::route_catalogue))
        .route("/api/v1/health", get(health::health))
        .route("/api/v1/health/db", get(health::database_health))
        .route("/api/v1/health/keystore", get(health::keystore_health))
        .route("/api/v1/health/redis", get(health::keystore_health))
        .route(
            "/api/v1/events",
            get(events_api::list_events).post(events_api::create_event),
        )
        .route(
            "/api/v1/events/:event_id",
            get(events_api::get_event).delete(events_api::delete_event),
        )
        .route(
            "/api/v1/events/:event_id/activities",
            get(activities_api::list_activities).post(activities_api::create_activity),
        )
        .route(
            "/api/v1/events/:event_id/activities/:activity_id",
            get(activities_api::get_activity),
        )
        .route(
            "/api/v1/events/:event_id/participants",
            get(participants_api::list_participants).post(participants_api::add_participant),
        )
        .route(
            "/api/v1/events/:event_id/participants/:participant_id",
            get(participants_api::get_participant),
        )
        .route(
            "/api/v1/events/:event_id/qr/send",
            post(qr_api::send_qr_codes),
        )
        .route(
            "/api/v1/events/:event_id/qr/scan",
            post(qr_api::scan_activity),
        )
        .route("/api/v1/admin/keys", get(keys_api::list_keys))
        .route("/api/v1/admin/keys/:role", get(keys_api::get_key))
        .route("/api/v1/admin/keys/:role/issue", post(keys_api::issue_key))
}

/// API routes with the shared services installed.
pub fn app(services: AppServices) -> Router {
    api_routes()
        .layer(Extension(services.authorizer.clone()))
        .layer(Extension(services))
}

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::keystore::KeyStoreHealth;
use crate::state::AppServices;

/// Method, path, and purpose of each public route.
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/api/v1/", "List available routes"),
    ("GET", "/api/v1/health", "Health check for the API"),
    ("GET", "/api/v1/health/db", "Health check for the entity database"),
    ("GET", "/api/v1/health/keystore", "Health check for the key store"),
    ("GET", "/api/v1/health/redis", "Health check for the key store (legacy path)"),
    ("POST", "/api/v1/events", "Create an event"),
    ("GET", "/api/v1/events", "List events"),
    ("GET", "/api/v1/events/:event_id", "Get an event"),
    ("DELETE", "/api/v1/events/:event_id", "Delete an event with its activities and participants"),
    ("POST", "/api/v1/events/:event_id/activities", "Create an activity for an event"),
    ("GET", "/api/v1/events/:event_id/activities", "List activities of an event"),
    ("GET", "/api/v1/events/:event_id/activities/:activity_id", "Get an activity of an event"),
    ("POST", "/api/v1/events/:event_id/participants", "Add a participant to an event"),
    ("GET", "/api/v1/events/:event_id/participants", "List participants of an event"),
    ("GET", "/api/v1/events/:event_id/participants/:participant_id", "Get a participant of an event"),
    ("POST", "/api/v1/events/:event_id/qr/send", "Send QR codes to participants via email"),
    ("POST", "/api/v1/events/:event_id/qr/scan", "Register a scanned activity for a participant"),
    ("POST", "/api/v1/admin/keys/:role/issue", "Issue a new organizer or scanner key"),
    ("GET", "/api/v1/admin/keys", "List role key status"),
    ("GET", "/api/v1/admin/keys/:role", "Get the current key for a role"),
];

pub async fn route_catalogue() -> Json<Value> {
    let routes: Vec<Value> = ROUTES
        .iter()
        .map(|(method, path, description)| {
            json!({ "method": method, "path": path, "description": description })
        })
        .collect();
    Json(json!({ "message": "Event check-in API", "routes": routes }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "message": "API is running", "timestamp": Utc::now() }))
}

pub async fn database_health(
    Extension(services): Extension<AppServices>,
) -> (StatusCode, Json<Value>) {
    let Some(database) = services.database.as_ref() else {
        return (
            StatusCode::OK,
            Json(json!({ "message": "In-memory store is healthy", "timestamp": Utc::now() })),
        );
    };
    match database.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "message": "Database is healthy", "timestamp": Utc::now() })),
        ),
        Err(err) => {
            tracing::error!(error = %err, "database health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Database is not healthy",
                    "error": err.to_string(),
                    "timestamp": Utc::now(),
                })),
            )
        }
    }
}

pub async fn keystore_health(
    Extension(services): Extension<AppServices>,
) -> (StatusCode, Json<Value>) {
    match services.keystore.health().await {
        KeyStoreHealth::Healthy { ping } => (
            StatusCode::OK,
            Json(json!({
                "message": format!("Key store is healthy. Ping response: {ping}"),
                "timestamp": Utc::now(),
            })),
        ),
        KeyStoreHealth::Unhealthy { error } => {
            tracing::error!(%error, "key store health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "message": "Key store is not healthy.",
                    "error": error,
                    "timestamp": Utc::now(),
                })),
            )
        }
    }
}

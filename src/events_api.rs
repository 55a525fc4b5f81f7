use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::error::{AppError, AppResult};
use crate::extractor::{parse_id, Caller};
use crate::models::Event;
use crate::state::AppServices;

const MANAGE_ROLES: &[Role] = &[Role::Organizer, Role::Admin];
const READ_ROLES: &[Role] = &[Role::Organizer, Role::Scanner, Role::Admin];

#[derive(Debug, Deserialize)]
pub struct CreateEvent {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct EventCreated {
    pub message: &'static str,
    pub event: Event,
}

#[derive(Debug, Serialize)]
pub struct EventList {
    pub events: Vec<Event>,
}

#[derive(Debug, Serialize)]
pub struct EventDetail {
    pub event: Event,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeleted {
    pub message: &'static str,
    pub event_id: Uuid,
}

pub async fn create_event(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    payload: Option<Json<CreateEvent>>,
) -> AppResult<(StatusCode, Json<EventCreated>)> {
    caller.require(MANAGE_ROLES)?;
    let Some(Json(payload)) = payload else {
        return Err(AppError::Validation("name is required".to_string()));
    };
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let event = Event {
        id: Uuid::new_v4(),
        name: name.to_string(),
    };
    services.events.create_event(&event).await?;
    tracing::info!(event_id = %event.id, "event created");
    Ok((
        StatusCode::CREATED,
        Json(EventCreated {
            message: "Event created",
            event,
        }),
    ))
}

pub async fn list_events(
    caller: Caller,
    Extension(services): Extension<AppServices>,
) -> AppResult<Json<EventList>> {
    caller.require(READ_ROLES)?;
    let events = services.events.list_events().await?;
    Ok(Json(EventList { events }))
}

pub async fn get_event(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
) -> AppResult<Json<EventDetail>> {
    caller.require(READ_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let event = services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    Ok(Json(EventDetail { event }))
}

pub async fn delete_event(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
) -> AppResult<Json<EventDeleted>> {
    caller.require(MANAGE_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    if !services.events.delete_event(event_id).await? {
        return Err(AppError::NotFound("Event".to_string()));
    }
    tracing::info!(%event_id, "event deleted");
    Ok(Json(EventDeleted {
        message: "Event deleted",
        event_id,
    }))
}

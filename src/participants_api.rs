use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::extractor::{parse_id, Caller};
use crate::models::{normalize_email, Participant};
use crate::state::AppServices;

const ORGANIZER_ROLES: &[Role] = &[Role::Organizer, Role::Admin];

#[derive(Debug, Deserialize)]
pub struct CreateParticipant {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ParticipantCreated {
    pub message: &'static str,
    pub participant: Participant,
}

#[derive(Debug, Serialize)]
pub struct ParticipantList {
    pub participants: Vec<Participant>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantDetail {
    pub participant: Participant,
}

pub async fn add_participant(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
    payload: Option<Json<CreateParticipant>>,
) -> AppResult<(StatusCode, Json<ParticipantCreated>)> {
    caller.require(ORGANIZER_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let Some(Json(payload)) = payload else {
        return Err(AppError::Validation("name and email are required".to_string()));
    };
    let name = payload.name.trim();
    let email = normalize_email(&payload.email);
    if name.is_empty() || email.is_empty() {
        return Err(AppError::Validation("name and email are required".to_string()));
    }

    services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;

    let participant = Participant::new(event_id, name, email);
    match services.participants.insert_participant(&participant).await {
        Ok(()) => {}
        Err(StoreError::DuplicateEmail) => {
            return Err(AppError::Conflict(
                "Email already registered for this event".to_string(),
            ))
        }
        Err(err) => return Err(err.into()),
    }
    tracing::info!(%event_id, participant_id = %participant.id, "participant added");
    Ok((
        StatusCode::CREATED,
        Json(ParticipantCreated {
            message: "Participant added",
            participant,
        }),
    ))
}

pub async fn list_participants(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
) -> AppResult<Json<ParticipantList>> {
    caller.require(ORGANIZER_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    let participants = services.participants.list_participants(event_id).await?;
    Ok(Json(ParticipantList { participants }))
}

pub async fn get_participant(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path((event_id, participant_id)): Path<(String, String)>,
) -> AppResult<Json<ParticipantDetail>> {
    caller.require(ORGANIZER_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let participant_id = parse_id(&participant_id, "participantId")?;
    services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    let participant = services
        .participants
        .find_participant(participant_id)
        .await?
        .filter(|participant| participant.event_id == event_id)
        .ok_or_else(|| AppError::NotFound("Participant".to_string()))?;
    Ok(Json(ParticipantDetail { participant }))
}

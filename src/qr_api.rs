use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::error::{AppError, AppResult};
use crate::extractor::{parse_id, Caller};
use crate::models::Activity;
use crate::notify::BatchReport;
use crate::state::AppServices;

const SCAN_ROLES: &[Role] = &[Role::Scanner, Role::Admin];
const SEND_ROLES: &[Role] = &[Role::Organizer, Role::Admin];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    pub ticket_id: Option<String>,
    pub activity_qr_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    pub message: &'static str,
    pub participant_id: Uuid,
    pub activity: Activity,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub email_body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: BatchReport,
}

pub async fn scan_activity(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
    payload: Option<Json<ScanRequest>>,
) -> AppResult<Json<ScanResponse>> {
    caller.require(SCAN_ROLES)?;

    let request = payload.map(|Json(body)| body).unwrap_or_default();
    let (ticket_id, activity_qr_id) = match (
        non_blank(request.ticket_id),
        non_blank(request.activity_qr_id),
    ) {
        (Some(ticket), Some(activity)) => (ticket, activity),
        _ => {
            return Err(AppError::Validation(
                "ticketId and activityQrId are required".to_string(),
            ))
        }
    };
    let event_id = parse_id(&event_id, "eventId")?;
    let participant_id = parse_id(&ticket_id, "ticketId")?;

    let receipt = services
        .checkin
        .register_scan(event_id, participant_id, &activity_qr_id)
        .await?;
    Ok(Json(ScanResponse {
        message: "Activity scanned successfully",
        participant_id: receipt.participant_id,
        activity: receipt.activity,
        scanned_at: receipt.scan.scanned_at,
    }))
}

pub async fn send_qr_codes(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
    payload: Option<Json<SendRequest>>,
) -> AppResult<Json<SendResponse>> {
    caller.require(SEND_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let template = payload.and_then(|Json(body)| non_blank(body.email_body));

    let event = services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    let participants = services.participants.list_participants(event_id).await?;

    let report = services
        .dispatcher
        .send_batch(participants, &event, template.as_deref())
        .await;
    Ok(Json(SendResponse {
        message: "QR code emails processed.",
        report,
    }))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

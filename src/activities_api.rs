use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::Role;
use crate::db::StoreError;
use crate::error::{AppError, AppResult};
use crate::extractor::{parse_id, Caller};
use crate::models::Activity;
use crate::state::AppServices;

const CREATE_ROLES: &[Role] = &[Role::Organizer, Role::Admin];
const READ_ROLES: &[Role] = &[Role::Organizer, Role::Scanner, Role::Admin];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    pub name: String,
    pub qr_id: String,
}

#[derive(Debug, Serialize)]
pub struct ActivityCreated {
    pub message: &'static str,
    pub activity: Activity,
}

#[derive(Debug, Serialize)]
pub struct ActivityList {
    pub activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
pub struct ActivityDetail {
    pub activity: Activity,
}

async fn require_event(services: &AppServices, event_id: Uuid) -> AppResult<()> {
    services
        .events
        .find_event(event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event".to_string()))?;
    Ok(())
}

pub async fn create_activity(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
    payload: Option<Json<CreateActivity>>,
) -> AppResult<(StatusCode, Json<ActivityCreated>)> {
    caller.require(CREATE_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let Some(Json(payload)) = payload else {
        return Err(AppError::Validation("name and qrId are required".to_string()));
    };
    let name = payload.name.trim();
    let qr_id = payload.qr_id.trim();
    if name.is_empty() || qr_id.is_empty() {
        return Err(AppError::Validation("name and qrId are required".to_string()));
    }
    require_event(&services, event_id).await?;

    let activity = Activity {
        id: Uuid::new_v4(),
        event_id,
        qr_id: qr_id.to_string(),
        name: name.to_string(),
    };
    match services.activities.create_activity(&activity).await {
        Ok(()) => {}
        Err(StoreError::DuplicateQrId) => {
            return Err(AppError::Conflict("QR id already in use".to_string()))
        }
        Err(err) => return Err(err.into()),
    }
    tracing::info!(%event_id, activity_id = %activity.id, qr_id = %activity.qr_id, "activity created");
    Ok((
        StatusCode::CREATED,
        Json(ActivityCreated {
            message: "Activity created",
            activity,
        }),
    ))
}

pub async fn list_activities(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(event_id): Path<String>,
) -> AppResult<Json<ActivityList>> {
    caller.require(READ_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    require_event(&services, event_id).await?;
    let activities = services.activities.list_activities(event_id).await?;
    Ok(Json(ActivityList { activities }))
}

pub async fn get_activity(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path((event_id, activity_id)): Path<(String, String)>,
) -> AppResult<Json<ActivityDetail>> {
    caller.require(READ_ROLES)?;
    let event_id = parse_id(&event_id, "eventId")?;
    let activity_id = parse_id(&activity_id, "activityId")?;
    require_event(&services, event_id).await?;
    let activity = services
        .activities
        .find_activity(activity_id)
        .await?
        .filter(|activity| activity.event_id == event_id)
        .ok_or_else(|| AppError::NotFound("Activity".to_string()))?;
    Ok(Json(ActivityDetail { activity }))
}

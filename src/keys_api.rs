use axum::{
    extract::{Extension, Path},
    Json,
};
use serde::Serialize;

use crate::auth::{IssuedRoleKey, ProvisionedRole, Role, RoleKeyStatus};
use crate::error::{AppError, AppResult};
use crate::extractor::Caller;
use crate::state::AppServices;

const ADMIN_ONLY: &[Role] = &[Role::Admin];

#[derive(Serialize)]
pub struct KeyList {
    pub keys: Vec<RoleKeyStatus>,
}

fn parse_role(raw: &str) -> AppResult<ProvisionedRole> {
    raw.parse::<ProvisionedRole>().map_err(AppError::Validation)
}

/// Rotates the organizer or scanner key. The previous value stops matching on the next request.
pub async fn issue_key(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(role): Path<String>,
) -> AppResult<Json<IssuedRoleKey>> {
    caller.require(ADMIN_ONLY)?;
    let role = parse_role(&role)?;
    let issued = services.keys.issue(role).await?;
    services.authorizer.resolver().invalidate();
    Ok(Json(issued))
}

pub async fn list_keys(
    caller: Caller,
    Extension(services): Extension<AppServices>,
) -> AppResult<Json<KeyList>> {
    caller.require(ADMIN_ONLY)?;
    let keys = services.keys.status().await?;
    Ok(Json(KeyList { keys }))
}

pub async fn get_key(
    caller: Caller,
    Extension(services): Extension<AppServices>,
    Path(role): Path<String>,
) -> AppResult<Json<IssuedRoleKey>> {
    caller.require(ADMIN_ONLY)?;
    let role = parse_role(&role)?;
    services
        .keys
        .reveal(role)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Key".to_string()))
}

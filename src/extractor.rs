use axum::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::{AuthContext, Authorizer, Role, RoleGate, API_KEY_HEADER};
use crate::error::AppError;

/// Verified role context for the current request.
///
/// Resolution never rejects; the handler decides through [`Caller::require`], so a
/// missing or wrong key and a key store outage surface as distinct statuses.
pub struct Caller(pub AuthContext);

impl Caller {
    pub fn require(&self, allowed: &[Role]) -> Result<Role, AppError> {
        RoleGate::require(&self.0, allowed)
    }

    pub fn context(&self) -> &AuthContext {
        &self.0
    }
}

/// Parses an identifier from a path segment or body field, rejecting malformed values with 400.
pub fn parse_id(raw: &str, field: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid {field}")))
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(authorizer) = parts.extensions.get::<Arc<Authorizer>>().cloned() else {
            tracing::error!("authorizer missing from request extensions");
            return Ok(Caller(AuthContext::unavailable("authorizer not configured")));
        };
        let credential = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok());
        Ok(Caller(authorizer.resolve_role(credential).await))
    }
}

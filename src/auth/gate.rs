use super::roles::{AuthContext, Role};
use crate::error::AppError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Pass(Role),
    Unauthorized,
    Forbidden,
    Unavailable(String),
}

/// Per-operation capability check.
pub struct RoleGate;

impl RoleGate {
    pub fn check(context: &AuthContext, allowed: &[Role]) -> GateDecision {
        if !context.ready {
            return GateDecision::Unavailable(
                context
                    .error
                    .clone()
                    .unwrap_or_else(|| "verification did not complete".to_string()),
            );
        }
        if context.role == Role::Anonymous {
            return GateDecision::Unauthorized;
        }
        if !allowed.contains(&context.role) {
            return GateDecision::Forbidden;
        }
        GateDecision::Pass(context.role)
    }

    pub fn require(context: &AuthContext, allowed: &[Role]) -> Result<Role, AppError> {
        match Self::check(context, allowed) {
            GateDecision::Pass(role) => Ok(role),
            GateDecision::Unauthorized => Err(AppError::Unauthorized),
            GateDecision::Forbidden => Err(AppError::Forbidden("Forbidden".to_string())),
            GateDecision::Unavailable(reason) => Err(AppError::AuthUnavailable(reason)),
        }
    }
}

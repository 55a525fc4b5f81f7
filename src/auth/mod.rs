//! Credential resolution and role gating.

pub mod gate;
pub mod keys;
pub mod resolver;
pub mod roles;

pub use gate::{GateDecision, RoleGate};
pub use keys::{IssuedRoleKey, RoleKeyRegistry, RoleKeyStatus};
pub use resolver::{Authorizer, KeyStoreRoleResolver, ProvisionedKeys, RoleResolver};
pub use roles::{fingerprint, AuthContext, ProvisionedRole, Role, RoleKey};

/// Header carrying the request credential.
pub const API_KEY_HEADER: &str = "x-api-key";

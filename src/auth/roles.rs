use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Organizer,
    Scanner,
    Anonymous,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Organizer => "organizer",
            Role::Scanner => "scanner",
            Role::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles whose keys are provisioned in the key store rather than configured statically.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionedRole {
    Organizer,
    Scanner,
}

impl ProvisionedRole {
    pub const ALL: [ProvisionedRole; 2] = [ProvisionedRole::Organizer, ProvisionedRole::Scanner];

    pub fn role(&self) -> Role {
        match self {
            ProvisionedRole::Organizer => Role::Organizer,
            ProvisionedRole::Scanner => Role::Scanner,
        }
    }
}

impl FromStr for ProvisionedRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "organizer" => Ok(ProvisionedRole::Organizer),
            "scanner" => Ok(ProvisionedRole::Scanner),
            "admin" => Err("the admin key is static configuration and cannot be issued".to_string()),
            other => Err(format!("unknown key role '{other}'")),
        }
    }
}

/// A credential value bound to exactly one role.
#[derive(Clone, PartialEq, Eq)]
pub struct RoleKey {
    pub value: String,
    pub role: Role,
}

impl RoleKey {
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.value)
    }
}

impl fmt::Debug for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleKey")
            .field("role", &self.role)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Outcome of credential verification.
///
/// `ready == false` means verification could not run. That is not the same as
/// `Role::Anonymous` with `ready == true`, which is a verified "no match".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthContext {
    pub role: Role,
    pub ready: bool,
    pub error: Option<String>,
}

impl AuthContext {
    pub fn verified(role: Role) -> Self {
        Self {
            role,
            ready: true,
            error: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::verified(Role::Anonymous)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            role: Role::Anonymous,
            ready: false,
            error: Some(reason.into()),
        }
    }
}

/// Short SHA-256 prefix safe to put in logs.
pub fn fingerprint(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..6])
}

/// Compares two credentials without an early exit on the first differing byte.
pub(crate) fn credentials_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    a.as_slice().ct_eq(b.as_slice()).into()
}

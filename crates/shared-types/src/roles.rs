//! # Roles and Caller Claims
//!
//! Identity attributes asserted by the enrollment authority. The ledger core
//! trusts these claims without re-verification; verifying the certificate or
//! token they came from is the transport layer's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Permission class of a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full administrative access, including registration on behalf of others.
    Admin,
    /// Registers and submits archives it owns.
    Uploader,
    /// Approves or rejects pending archives.
    Approver,
    /// Read-only access to records and audit trails.
    Auditor,
    /// Borrows, extends, and returns approved archives.
    Borrower,
}

impl Role {
    /// All roles, in enrollment order.
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Uploader,
        Role::Approver,
        Role::Auditor,
        Role::Borrower,
    ];

    /// Stable string form used in claims and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Uploader => "Uploader",
            Role::Approver => "Approver",
            Role::Auditor => "Auditor",
            Role::Borrower => "Borrower",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized role string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role: {}", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Uploader" => Ok(Role::Uploader),
            "Approver" => Ok(Role::Approver),
            "Auditor" => Ok(Role::Auditor),
            "Borrower" => Ok(Role::Borrower),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// Verified identity attributes for one call.
///
/// Built by the transport layer after it has authenticated the caller.
/// Authorization inside the core is a pure function of these claims, the
/// current record, and the operation arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerClaims {
    /// Enrollment username; also the owner/borrower identity string.
    pub username: String,
    /// Permission class asserted by the issuing authority.
    pub role: Role,
}

impl CallerClaims {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            role,
        }
    }

    /// Whether this caller holds one of the listed roles.
    pub fn has_any_role(&self, allowed: &[Role]) -> bool {
        allowed.contains(&self.role)
    }
}

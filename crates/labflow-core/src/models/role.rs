//! Acting identity classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of the acting identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Lab staff with financial visibility
    Admin,
    /// Lab staff without financial visibility
    Tech,
    /// External referring doctor, scoped to own cases
    Doctor,
}

impl Role {
    /// Database string representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Tech => "tech",
            Role::Doctor => "doctor",
        }
    }

    /// Parse from database string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "tech" => Some(Role::Tech),
            "doctor" => Some(Role::Doctor),
            _ => None,
        }
    }

    pub fn is_lab_staff(self) -> bool {
        matches!(self, Role::Admin | Role::Tech)
    }

    /// Price and invoiced flag are admin-only.
    pub fn sees_financials(self) -> bool {
        self == Role::Admin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lab staff directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub user_id: String,
    pub display_name: String,
    /// `Admin` or `Tech`
    pub role: Role,
}

/// The authoritative identity behind a request.
///
/// Resolved from the store per request and passed explicitly to every
/// operation; never read from ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    /// Authentication identity
    pub user_id: String,
    /// Name recorded in the activity log
    pub display_name: String,
    pub role: Role,
    /// Linked doctor row; set iff role is `Doctor`
    pub doctor_id: Option<String>,
}

impl Viewer {
    pub fn admin(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role: Role::Admin,
            doctor_id: None,
        }
    }

    pub fn tech(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role: Role::Tech,
            doctor_id: None,
        }
    }

    pub fn doctor(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        doctor_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            role: Role::Doctor,
            doctor_id: Some(doctor_id.into()),
        }
    }
}

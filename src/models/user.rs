use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    PlatformAdmin,
    EventOrganizer,
    Customer,
    EntryManager,
    SupportExecutive,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::PlatformAdmin => "platform_admin",
            UserRole::EventOrganizer => "event_organizer",
            UserRole::Customer => "customer",
            UserRole::EntryManager => "entry_manager",
            UserRole::SupportExecutive => "support_executive",
        }
    }

    /// Roles allowed to self-register through the public API.
    pub fn self_registration_allowed(&self) -> bool {
        matches!(
            self,
            UserRole::Customer | UserRole::EventOrganizer | UserRole::PlatformAdmin
        )
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "platform_admin" => Ok(UserRole::PlatformAdmin),
            "event_organizer" => Ok(UserRole::EventOrganizer),
            "customer" => Ok(UserRole::Customer),
            "entry_manager" => Ok(UserRole::EntryManager),
            "support_executive" => Ok(UserRole::SupportExecutive),
            other => Err(format!("unknown user role '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Reset tokens are stored hashed; the raw token only ever travels in the
/// reset email (or the simulation response).
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Issued,
    Used,
    Invalidated,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Issued => "issued",
            TicketStatus::Used => "used",
            TicketStatus::Invalidated => "invalidated",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(TicketStatus::Issued),
            "used" => Ok(TicketStatus::Used),
            "invalidated" => Ok(TicketStatus::Invalidated),
            other => Err(format!("unknown ticket status '{other}'")),
        }
    }
}

/// Entry credential for one booking seat, issued when the payment is
/// captured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub booking_seat_id: Uuid,
    pub qr_code: String,
    pub status: TicketStatus,
    pub validated_at: Option<DateTime<Utc>>,
    pub entry_manager_id: Option<Uuid>,
}

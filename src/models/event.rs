use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    Published,
    SoldOut,
    Cancelled,
    Completed,
}

impl EventStatus {
    /// Legal transition table. Self-transitions are handled by the caller
    /// as no-ops and are not part of the table.
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        use EventStatus::*;
        match self {
            Draft => matches!(next, Published | Cancelled),
            Published => matches!(next, SoldOut | Cancelled | Completed),
            SoldOut => matches!(next, Published | Cancelled | Completed),
            Cancelled | Completed => false,
        }
    }

    /// Whether customers may open bookings against the event.
    pub fn is_bookable(self) -> bool {
        matches!(self, EventStatus::Published | EventStatus::SoldOut)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Published => "published",
            EventStatus::SoldOut => "sold_out",
            EventStatus::Cancelled => "cancelled",
            EventStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "published" => Ok(EventStatus::Published),
            "sold_out" => Ok(EventStatus::SoldOut),
            "cancelled" => Ok(EventStatus::Cancelled),
            "completed" => Ok(EventStatus::Completed),
            other => Err(format!("unknown event status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
}

/// Listing view: an event with its live seat counters.
#[derive(Debug, Clone, Serialize)]
pub struct EventWithInventory {
    #[serde(flatten)]
    pub event: Event,
    pub total_seats: i64,
    pub available_seats: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_have_no_exits() {
        for next in [
            EventStatus::Draft,
            EventStatus::Published,
            EventStatus::SoldOut,
            EventStatus::Cancelled,
            EventStatus::Completed,
        ] {
            assert!(!EventStatus::Cancelled.can_transition_to(next));
            assert!(!EventStatus::Completed.can_transition_to(next));
        }
    }

    #[test]
    fn sold_out_can_reopen() {
        assert!(EventStatus::SoldOut.can_transition_to(EventStatus::Published));
        assert!(EventStatus::Published.can_transition_to(EventStatus::SoldOut));
    }

    #[test]
    fn draft_cannot_complete_directly() {
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::Completed));
        assert!(!EventStatus::Draft.can_transition_to(EventStatus::SoldOut));
    }
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Cancelled,
    RefundRequested,
    Refunded,
}

impl BookingStatus {
    /// Legal transition table. `PendingPayment -> Refunded` and
    /// `Confirmed -> Refunded` exist only for the event-cancellation
    /// cascade and the approved-refund path; `RefundRequested ->
    /// Confirmed` is the rejected-refund revert.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        match self {
            PendingPayment => matches!(next, Confirmed | Cancelled | Refunded),
            Confirmed => matches!(next, RefundRequested | Refunded),
            RefundRequested => matches!(next, Refunded | Confirmed),
            Cancelled | Refunded => false,
        }
    }

    /// Statuses swept up by the event-cancellation cascade.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            BookingStatus::PendingPayment
                | BookingStatus::Confirmed
                | BookingStatus::RefundRequested
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::RefundRequested => "refund_requested",
            BookingStatus::Refunded => "refunded",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(BookingStatus::PendingPayment),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "refund_requested" => Ok(BookingStatus::RefundRequested),
            "refunded" => Ok(BookingStatus::Refunded),
            other => Err(format!("unknown booking status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub status: BookingStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub offer_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Join of a booking and one seat, price-locked at booking time. The seat
/// set of a booking is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSeat {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub seat_id: Uuid,
    pub ticket_price: Decimal,
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A bookable slot of an event. `is_available` reflects the absence of an
/// active seat assignment; it is only ever mutated by inventory
/// reserve/release inside a lifecycle transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub event_id: Uuid,
    pub row_label: String,
    pub seat_number: i32,
    pub is_available: bool,
    pub price_override: Option<Decimal>,
}

impl Seat {
    /// The price this seat sells at, given the event's base price.
    pub fn effective_price(&self, base_price: Decimal) -> Decimal {
        self.price_override.unwrap_or(base_price)
    }
}

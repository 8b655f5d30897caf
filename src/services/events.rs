//! Event lifecycle: creation with a seat grid, listing, and the status
//! state machine including the cancellation cascade.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{BookingStatus, Event, EventStatus, EventWithInventory, PaymentStatus, Seat, UserRole};
use crate::store::{NewEvent, NewSeat, StoreTx};
use crate::utils::error::{AppError, AppResult};

use super::{bookings, identity, inventory, TicketingService};

/// Row labels run 'A'..'Z'.
const MAX_ROW_COUNT: u32 = 26;

#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub row_count: u32,
    pub seats_per_row: u32,
}

impl TicketingService {
    pub async fn create_event(&self, req: CreateEvent) -> AppResult<Event> {
        let mut tx = self.begin().await?;
        identity::require_role(tx.as_mut(), req.organizer_id, UserRole::EventOrganizer).await?;

        if req.end_time <= req.start_time {
            return Err(AppError::Validation(
                "end_time must be after start_time".into(),
            ));
        }
        if req.base_price < Decimal::ZERO {
            return Err(AppError::Validation("base_price must not be negative".into()));
        }
        if req.row_count == 0 || req.row_count > MAX_ROW_COUNT {
            return Err(AppError::Validation(format!(
                "row_count must be between 1 and {MAX_ROW_COUNT}"
            )));
        }
        if req.seats_per_row == 0 {
            return Err(AppError::Validation(
                "seats_per_row must be at least 1".into(),
            ));
        }

        let event = tx
            .insert_event(NewEvent {
                organizer_id: req.organizer_id,
                title: req.title,
                description: req.description,
                venue: req.venue,
                start_time: req.start_time,
                end_time: req.end_time,
                base_price: req.base_price,
                status: EventStatus::Draft,
                created_at: self.now(),
            })
            .await?;

        let mut seats = Vec::with_capacity((req.row_count * req.seats_per_row) as usize);
        for row_index in 0..req.row_count {
            let row_label = char::from(b'A' + row_index as u8).to_string();
            for seat_number in 1..=req.seats_per_row {
                seats.push(NewSeat {
                    event_id: event.id,
                    row_label: row_label.clone(),
                    seat_number: seat_number as i32,
                    price_override: None,
                });
            }
        }
        tx.insert_seats(seats).await?;

        tx.commit().await?;
        Ok(event)
    }

    pub async fn list_events(&self) -> AppResult<Vec<EventWithInventory>> {
        let mut tx = self.begin().await?;
        tx.list_events_with_inventory().await
    }

    /// Seat map of an event, ordered by row and number. Mirrors the
    /// listing contract: an unknown event yields an empty map.
    pub async fn seat_map(&self, event_id: Uuid) -> AppResult<Vec<Seat>> {
        let mut tx = self.begin().await?;
        tx.seats_for_event(event_id).await
    }

    /// Drive the event state machine. A self-transition is a no-op;
    /// anything outside the transition table is `InvalidState`. Moving to
    /// `cancelled` runs the cascade over every active booking as part of
    /// the same transaction.
    pub async fn update_event_status(
        &self,
        event_id: Uuid,
        new_status: EventStatus,
    ) -> AppResult<Event> {
        let mut tx = self.begin().await?;
        let event = tx
            .event_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;

        if new_status != event.status && !event.status.can_transition_to(new_status) {
            return Err(AppError::InvalidState(format!(
                "Invalid event status transition: {} -> {}",
                event.status, new_status
            )));
        }

        tx.set_event_status(event_id, new_status).await?;
        if new_status == EventStatus::Cancelled {
            cancel_event_cascade(tx.as_mut(), event_id, self.now()).await?;
        }
        tx.commit().await?;

        let mut updated = event;
        updated.status = new_status;
        Ok(updated)
    }
}

/// Cancellation cascade: every booking still in an active status moves to
/// refunded, its seats are released, its payment (if any) is marked
/// refunded and all its tickets are invalidated. Re-running it on an
/// already-cancelled event finds no active bookings and does nothing.
pub(crate) async fn cancel_event_cascade(
    tx: &mut dyn StoreTx,
    event_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<()> {
    for booking in tx.bookings_for_event(event_id).await? {
        if !booking.status.is_active() {
            continue;
        }
        bookings::transition_booking(tx, &booking, BookingStatus::Refunded, now).await?;
        inventory::release_booking_seats(tx, booking.id).await?;
        if let Some(payment) = tx.payment_for_booking(booking.id).await? {
            tx.set_payment_status(payment.id, PaymentStatus::Refunded)
                .await?;
        }
        tx.invalidate_tickets_for_booking(booking.id).await?;
    }
    Ok(())
}

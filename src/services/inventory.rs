//! Inventory store: atomic seat reservation and release.
//!
//! These helpers run inside the caller's transaction, so a failure after
//! reservation rolls the seat flips back together with everything else.

use uuid::Uuid;

use crate::models::{EventStatus, Seat};
use crate::store::StoreTx;
use crate::utils::error::{AppError, AppResult};

/// Reserve the given seats of an event.
///
/// Verifies every id belongs to the event and is available, then marks
/// all of them unavailable in one step. Ids that are missing from the
/// event or already taken fail the whole reservation with `Conflict`
/// listing the offending ids; no partial reservation is ever observable.
pub(crate) async fn reserve_seats(
    tx: &mut dyn StoreTx,
    event_id: Uuid,
    seat_ids: &[Uuid],
) -> AppResult<Vec<Seat>> {
    if seat_ids.is_empty() {
        return Err(AppError::Validation(
            "At least one seat must be selected".into(),
        ));
    }

    let mut requested: Vec<Uuid> = Vec::with_capacity(seat_ids.len());
    for id in seat_ids {
        if !requested.contains(id) {
            requested.push(*id);
        }
    }

    let seats = tx.seats_for_update(event_id, &requested).await?;

    if seats.len() != requested.len() {
        let missing: Vec<String> = requested
            .iter()
            .filter(|id| !seats.iter().any(|s| s.id == **id))
            .map(Uuid::to_string)
            .collect();
        return Err(AppError::Conflict(format!(
            "Seats not found for this event: {}",
            missing.join(", ")
        )));
    }

    let unavailable: Vec<String> = seats
        .iter()
        .filter(|s| !s.is_available)
        .map(|s| s.id.to_string())
        .collect();
    if !unavailable.is_empty() {
        return Err(AppError::Conflict(format!(
            "Seats unavailable: {}",
            unavailable.join(", ")
        )));
    }

    tx.set_seats_availability(&requested, false).await?;
    Ok(seats)
}

/// Mark seats available again. Idempotent.
pub(crate) async fn release_seats(tx: &mut dyn StoreTx, seat_ids: &[Uuid]) -> AppResult<()> {
    tx.set_seats_availability(seat_ids, true).await
}

/// Release every seat held by a booking.
pub(crate) async fn release_booking_seats(
    tx: &mut dyn StoreTx,
    booking_id: Uuid,
) -> AppResult<()> {
    let seat_ids: Vec<Uuid> = tx
        .booking_seats_for_booking(booking_id)
        .await?
        .iter()
        .map(|bs| bs.seat_id)
        .collect();
    release_seats(tx, &seat_ids).await
}

/// Flip a published event to sold_out when its last seat goes, and a
/// sold_out event back to published when any seat frees up. No-op for
/// every other status. A seat freed by any path reopens a sold_out
/// event, cancellation flows included.
pub(crate) async fn recompute_event_status(
    tx: &mut dyn StoreTx,
    event_id: Uuid,
) -> AppResult<()> {
    let Some(event) = tx.event_by_id(event_id).await? else {
        return Ok(());
    };
    let remaining = tx.available_seat_count(event_id).await?;

    if remaining == 0 && event.status == EventStatus::Published {
        tx.set_event_status(event_id, EventStatus::SoldOut).await?;
    } else if remaining > 0 && event.status == EventStatus::SoldOut {
        tx.set_event_status(event_id, EventStatus::Published).await?;
    }
    Ok(())
}

//! Entry-time ticket validation and plain-text ticket documents.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{BookingStatus, EventStatus, Ticket, TicketStatus, UserRole};
use crate::utils::error::{AppError, AppResult};

use super::{identity, TicketingService};

#[derive(Debug, Clone, Serialize)]
pub struct TicketValidation {
    pub valid: bool,
    pub message: String,
    pub ticket: Option<Ticket>,
}

fn rejected(message: &str, ticket: Option<Ticket>) -> TicketValidation {
    TicketValidation {
        valid: false,
        message: message.to_string(),
        ticket,
    }
}

impl TicketingService {
    /// Redeem a ticket at the venue entrance.
    ///
    /// The checks form a strict, ordered gate: unknown code, already
    /// used, not issued, booking not active, event cancelled. The first
    /// failing check decides the message; only a fully clean ticket is
    /// marked used.
    pub async fn validate_ticket(
        &self,
        qr_code: &str,
        entry_manager_id: Uuid,
    ) -> AppResult<TicketValidation> {
        let mut tx = self.begin().await?;
        identity::require_role(tx.as_mut(), entry_manager_id, UserRole::EntryManager).await?;

        let Some(ticket) = tx.ticket_by_qr(qr_code).await? else {
            return Ok(rejected("Ticket not found", None));
        };
        if ticket.status == TicketStatus::Used {
            return Ok(rejected("Ticket already used", Some(ticket)));
        }
        if ticket.status != TicketStatus::Issued {
            return Ok(rejected("Ticket is not valid for entry", Some(ticket)));
        }

        let booking_seat = tx
            .booking_seat_by_id(ticket.booking_seat_id)
            .await?
            .ok_or_else(|| AppError::Internal("Booking seat missing for ticket".into()))?;
        let booking = tx
            .booking_by_id(booking_seat.booking_id)
            .await?
            .ok_or_else(|| AppError::Internal("Booking missing for ticket".into()))?;
        if booking.status != BookingStatus::Confirmed {
            return Ok(rejected("Booking is not active", Some(ticket)));
        }
        let event = tx
            .event_by_id(booking.event_id)
            .await?
            .ok_or_else(|| AppError::Internal("Event missing for booking".into()))?;
        if event.status == EventStatus::Cancelled {
            return Ok(rejected("Event is cancelled", Some(ticket)));
        }

        let used = tx
            .mark_ticket_used(ticket.id, entry_manager_id, self.now())
            .await?;
        tx.commit().await?;

        Ok(TicketValidation {
            valid: true,
            message: "Ticket validated".into(),
            ticket: Some(used),
        })
    }

    /// Plain-text ticket sheet for a booking.
    pub async fn ticket_download_text(&self, booking_id: Uuid) -> AppResult<String> {
        let mut tx = self.begin().await?;
        let booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        let tickets = tx.tickets_for_booking(booking.id).await?;

        let mut lines = vec![
            "Event Ticket (Simulation)".to_string(),
            format!("Booking ID: {}", booking.id),
            format!("Customer ID: {}", booking.customer_id),
            format!("Event ID: {}", booking.event_id),
            format!("Status: {}", booking.status),
            "Ticket Codes:".to_string(),
        ];
        for ticket in &tickets {
            lines.push(format!("- {}", ticket.qr_code));
        }
        Ok(lines.join("\n"))
    }

    /// Plain-text preview of the booking confirmation email.
    pub async fn confirmation_email_text(&self, booking_id: Uuid) -> AppResult<String> {
        let mut tx = self.begin().await?;
        let booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

        Ok(format!(
            "To: customer_{}@mail.local\n\
             Subject: Booking {} confirmation\n\n\
             Your booking for event {} is currently {}.\n\
             Amount: {}",
            booking.customer_id,
            booking.id,
            booking.event_id,
            booking.status,
            booking.total_amount.round_dp(2),
        ))
    }
}

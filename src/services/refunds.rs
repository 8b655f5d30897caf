//! Refund workflow: customer requests, support-executive decisions.

use uuid::Uuid;

use crate::models::{BookingStatus, PaymentStatus, Refund, RefundStatus, UserRole};
use crate::store::NewRefund;
use crate::utils::error::{AppError, AppResult};

use super::{bookings, identity, inventory, TicketingService};

impl TicketingService {
    pub async fn request_refund(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        reason: &str,
    ) -> AppResult<Refund> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("Refund reason is required".into()));
        }

        let now = self.now();
        let mut tx = self.begin().await?;

        let booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        if booking.customer_id != customer_id {
            return Err(AppError::Forbidden(
                "Booking does not belong to customer".into(),
            ));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(AppError::InvalidState(
                "Refund can only be requested for confirmed bookings".into(),
            ));
        }
        if tx.refund_for_booking(booking.id).await?.is_some() {
            return Err(AppError::Validation(
                "Refund already exists for this booking".into(),
            ));
        }

        let refund = tx
            .insert_refund(NewRefund {
                booking_id: booking.id,
                reason: reason.to_string(),
                refund_amount: booking.total_amount,
                requested_by: customer_id,
                created_at: now,
            })
            .await?;
        bookings::transition_booking(tx.as_mut(), &booking, BookingStatus::RefundRequested, now)
            .await?;

        tx.commit().await?;
        Ok(refund)
    }

    pub async fn decide_refund(
        &self,
        booking_id: Uuid,
        support_executive_id: Uuid,
        approve: bool,
    ) -> AppResult<Refund> {
        let now = self.now();
        let mut tx = self.begin().await?;

        identity::require_role(tx.as_mut(), support_executive_id, UserRole::SupportExecutive)
            .await?;

        let booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Refund request not found".into()))?;
        let refund = tx
            .refund_for_booking(booking.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Refund request not found".into()))?;
        if refund.status != RefundStatus::Requested {
            return Err(AppError::InvalidState("Refund is already resolved".into()));
        }

        let refund = if approve {
            let resolved = tx
                .resolve_refund(refund.id, RefundStatus::Completed, support_executive_id, now)
                .await?;
            bookings::transition_booking(tx.as_mut(), &booking, BookingStatus::Refunded, now)
                .await?;
            if let Some(payment) = tx.payment_for_booking(booking.id).await? {
                tx.set_payment_status(payment.id, PaymentStatus::Refunded)
                    .await?;
            }
            inventory::release_booking_seats(tx.as_mut(), booking.id).await?;
            tx.invalidate_tickets_for_booking(booking.id).await?;
            inventory::recompute_event_status(tx.as_mut(), booking.event_id).await?;
            resolved
        } else {
            let resolved = tx
                .resolve_refund(refund.id, RefundStatus::Rejected, support_executive_id, now)
                .await?;
            bookings::transition_booking(tx.as_mut(), &booking, BookingStatus::Confirmed, now)
                .await?;
            resolved
        };

        tx.commit().await?;
        Ok(refund)
    }
}

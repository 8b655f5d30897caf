//! Booking lifecycle: creation and payment capture.
//!
//! `create_booking` is the hot path of the platform: reservation, pricing,
//! booking/seat/payment persistence and offer redemption all commit as a
//! single transaction, so a failure at any step releases the reserved
//! seats and leaves the offer's usage count untouched.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, PaymentStatus, RefundStatus, UserRole,
};
use crate::store::{NewBooking, NewBookingSeat, NewPayment, NewTicket, StoreTx};
use crate::utils::error::{AppError, AppResult};

use super::{identity, inventory, pricing, TicketingService};

/// A booking as callers see it: amounts plus the dependent records'
/// statuses and ticket codes.
#[derive(Debug, Clone, Serialize)]
pub struct BookingView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub status: BookingStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub offer_code: Option<String>,
    pub ticket_codes: Vec<String>,
    pub payment_status: Option<PaymentStatus>,
    pub refund_status: Option<RefundStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalesAnalytics {
    pub total_bookings: u64,
    pub confirmed_bookings: u64,
    pub refunded_bookings: u64,
    /// Sum of totals over confirmed and refund-requested bookings.
    pub gross_sales: Decimal,
}

/// The single gate through which booking statuses change. Anything
/// outside the transition table fails with `InvalidState`.
pub(crate) async fn transition_booking(
    tx: &mut dyn StoreTx,
    booking: &Booking,
    next: BookingStatus,
    now: DateTime<Utc>,
) -> AppResult<()> {
    if !booking.status.can_transition_to(next) {
        return Err(AppError::InvalidState(format!(
            "Booking cannot move from {} to {}",
            booking.status, next
        )));
    }
    tx.set_booking_status(booking.id, next, now).await
}

pub(crate) async fn booking_view(
    tx: &mut dyn StoreTx,
    booking: &Booking,
) -> AppResult<BookingView> {
    let ticket_codes = tx
        .tickets_for_booking(booking.id)
        .await?
        .into_iter()
        .map(|t| t.qr_code)
        .collect();
    let payment_status = tx.payment_for_booking(booking.id).await?.map(|p| p.status);
    let refund_status = tx.refund_for_booking(booking.id).await?.map(|r| r.status);

    Ok(BookingView {
        id: booking.id,
        customer_id: booking.customer_id,
        event_id: booking.event_id,
        status: booking.status,
        subtotal: booking.subtotal,
        discount_amount: booking.discount_amount,
        tax_amount: booking.tax_amount,
        total_amount: booking.total_amount,
        offer_code: booking.offer_code.clone(),
        ticket_codes,
        payment_status,
        refund_status,
    })
}

impl TicketingService {
    pub async fn create_booking(
        &self,
        customer_id: Uuid,
        event_id: Uuid,
        seat_ids: &[Uuid],
        offer_code: Option<&str>,
    ) -> AppResult<BookingView> {
        let now = self.now();
        let mut tx = self.begin().await?;

        identity::require_role(tx.as_mut(), customer_id, UserRole::Customer).await?;

        let event = tx
            .event_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        if !event.status.is_bookable() {
            return Err(AppError::Validation(
                "Event is not available for booking".into(),
            ));
        }
        if event.start_time <= now {
            return Err(AppError::Validation(
                "Cannot book tickets for past events".into(),
            ));
        }

        let seats = inventory::reserve_seats(tx.as_mut(), event_id, seat_ids).await?;
        let seat_prices: Vec<Decimal> = seats
            .iter()
            .map(|seat| seat.effective_price(event.base_price))
            .collect();

        // The offer row stays locked until commit, so the limit check and
        // the increment below cannot race with another redemption.
        let offer = match offer_code.map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => {
                let offer = tx
                    .offer_by_code_for_update(&code.to_uppercase())
                    .await?
                    .ok_or_else(|| {
                        AppError::Validation("Invalid or inactive offer code".into())
                    })?;
                pricing::check_offer_usable(&offer, now)?;
                Some(offer)
            }
            None => None,
        };

        let quote = pricing::quote(&seat_prices, offer.as_ref(), self.pricing.tax_rate);

        let booking = tx
            .insert_booking(NewBooking {
                customer_id,
                event_id,
                status: BookingStatus::PendingPayment,
                subtotal: quote.subtotal,
                discount_amount: quote.discount_amount,
                tax_amount: quote.tax_amount,
                total_amount: quote.total_amount,
                offer_code: quote.offer_code,
                created_at: now,
            })
            .await?;

        let booking_seats: Vec<NewBookingSeat> = seats
            .iter()
            .map(|seat| NewBookingSeat {
                booking_id: booking.id,
                seat_id: seat.id,
                ticket_price: seat.effective_price(event.base_price),
            })
            .collect();
        tx.insert_booking_seats(booking_seats).await?;

        tx.insert_payment(NewPayment {
            booking_id: booking.id,
            amount: booking.total_amount,
            status: PaymentStatus::Initiated,
            method: "pending".into(),
            transaction_ref: self.refs.transaction_ref(),
        })
        .await?;

        if let Some(offer) = &offer {
            tx.increment_offer_usage(offer.id).await?;
        }

        inventory::recompute_event_status(tx.as_mut(), event_id).await?;

        let view = booking_view(tx.as_mut(), &booking).await?;
        tx.commit().await?;

        tracing::info!(
            booking_id = %booking.id,
            event_id = %event_id,
            seats = seats.len(),
            total = %booking.total_amount,
            "Booking created"
        );
        Ok(view)
    }

    pub async fn capture_payment(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
        method: &str,
        mark_success: bool,
    ) -> AppResult<BookingView> {
        let now = self.now();
        let mut tx = self.begin().await?;

        let mut booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        if booking.customer_id != customer_id {
            return Err(AppError::Forbidden(
                "Booking does not belong to customer".into(),
            ));
        }
        if booking.status != BookingStatus::PendingPayment {
            return Err(AppError::InvalidState(
                "Payment can only be captured for pending bookings".into(),
            ));
        }
        let payment = tx
            .payment_for_booking(booking.id)
            .await?
            .ok_or_else(|| AppError::Internal("Booking payment record missing".into()))?;

        if mark_success {
            tx.record_payment_attempt(payment.id, method, PaymentStatus::Paid, Some(now))
                .await?;
            transition_booking(tx.as_mut(), &booking, BookingStatus::Confirmed, now).await?;
            booking.status = BookingStatus::Confirmed;

            let tickets: Vec<NewTicket> = tx
                .booking_seats_for_booking(booking.id)
                .await?
                .iter()
                .map(|bs| NewTicket {
                    booking_seat_id: bs.id,
                    qr_code: self.refs.ticket_code(),
                })
                .collect();
            tx.insert_tickets(tickets).await?;
        } else {
            tx.record_payment_attempt(payment.id, method, PaymentStatus::Failed, None)
                .await?;
            transition_booking(tx.as_mut(), &booking, BookingStatus::Cancelled, now).await?;
            booking.status = BookingStatus::Cancelled;
            inventory::release_booking_seats(tx.as_mut(), booking.id).await?;
        }

        inventory::recompute_event_status(tx.as_mut(), booking.event_id).await?;

        let view = booking_view(tx.as_mut(), &booking).await?;
        tx.commit().await?;
        Ok(view)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> AppResult<BookingView> {
        let mut tx = self.begin().await?;
        let booking = tx
            .booking_by_id(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
        booking_view(tx.as_mut(), &booking).await
    }

    pub async fn customer_booking_history(
        &self,
        customer_id: Uuid,
    ) -> AppResult<Vec<BookingView>> {
        let mut tx = self.begin().await?;
        let bookings = tx.bookings_for_customer(customer_id).await?;
        let mut views = Vec::with_capacity(bookings.len());
        for booking in &bookings {
            views.push(booking_view(tx.as_mut(), booking).await?);
        }
        Ok(views)
    }

    pub async fn sales_analytics(&self) -> AppResult<SalesAnalytics> {
        let mut tx = self.begin().await?;
        let bookings = tx.list_bookings().await?;

        let confirmed = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Confirmed)
            .count() as u64;
        let refunded = bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Refunded)
            .count() as u64;
        let gross_sales: Decimal = bookings
            .iter()
            .filter(|b| {
                matches!(
                    b.status,
                    BookingStatus::Confirmed | BookingStatus::RefundRequested
                )
            })
            .map(|b| b.total_amount)
            .sum::<Decimal>()
            .round_dp(2);

        Ok(SalesAnalytics {
            total_bookings: bookings.len() as u64,
            confirmed_bookings: confirmed,
            refunded_bookings: refunded,
            gross_sales,
        })
    }
}

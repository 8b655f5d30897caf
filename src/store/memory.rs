//! In-memory store backend.
//!
//! One coarse async mutex guards the whole state and is held for the
//! lifetime of a transaction, so transactions are fully serialized —
//! strictly stronger than the row-level isolation the contract asks for.
//! A snapshot taken at `begin` is restored when the transaction is
//! dropped without commit. Backs the test suite and demo setups.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{
    Booking, BookingSeat, BookingStatus, Event, EventStatus, EventWithInventory, Offer,
    PasswordResetToken, Payment, PaymentStatus, Refund, RefundStatus, Seat, SupportStatus,
    SupportTicket, Ticket, TicketStatus, User, UserRole,
};
use crate::store::{
    NewBooking, NewBookingSeat, NewEvent, NewOffer, NewPasswordResetToken, NewPayment, NewRefund,
    NewSeat, NewSupportTicket, NewTicket, NewUser, Store, StoreTx,
};
use crate::utils::error::{AppError, AppResult};

#[derive(Debug, Default, Clone)]
struct MemState {
    users: Vec<User>,
    reset_tokens: Vec<PasswordResetToken>,
    events: Vec<Event>,
    seats: Vec<Seat>,
    offers: Vec<Offer>,
    bookings: Vec<Booking>,
    booking_seats: Vec<BookingSeat>,
    payments: Vec<Payment>,
    tickets: Vec<Ticket>,
    refunds: Vec<Refund>,
    support_tickets: Vec<SupportTicket>,
}

#[derive(Debug, Default, Clone)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

struct MemTx {
    guard: OwnedMutexGuard<MemState>,
    /// `Some` until commit; restored on drop to roll back.
    snapshot: Option<MemState>,
}

impl Drop for MemTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for MemTx {
    async fn insert_user(&mut self, new: NewUser) -> AppResult<User> {
        if self.guard.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict("Email is already registered".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_active: new.is_active,
        };
        self.guard.users.push(user.clone());
        Ok(user)
    }

    async fn user_by_id(&mut self, user_id: Uuid) -> AppResult<Option<User>> {
        Ok(self.guard.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        Ok(self.guard.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&mut self, role: Option<UserRole>) -> AppResult<Vec<User>> {
        Ok(self
            .guard
            .users
            .iter()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect())
    }

    async fn set_user_password(&mut self, user_id: Uuid, password_hash: &str) -> AppResult<()> {
        if let Some(user) = self.guard.users.iter_mut().find(|u| u.id == user_id) {
            user.password_hash = password_hash.to_string();
        }
        Ok(())
    }

    async fn count_users(&mut self) -> AppResult<i64> {
        Ok(self.guard.users.len() as i64)
    }

    async fn insert_reset_token(
        &mut self,
        new: NewPasswordResetToken,
    ) -> AppResult<PasswordResetToken> {
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            token_hash: new.token_hash,
            expires_at: new.expires_at,
            used: false,
            created_at: new.created_at,
        };
        self.guard.reset_tokens.push(token.clone());
        Ok(token)
    }

    async fn reset_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<PasswordResetToken>> {
        Ok(self
            .guard
            .reset_tokens
            .iter()
            .filter(|t| t.token_hash == token_hash && !t.used)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn mark_reset_token_used(&mut self, token_id: Uuid) -> AppResult<()> {
        if let Some(token) = self.guard.reset_tokens.iter_mut().find(|t| t.id == token_id) {
            token.used = true;
        }
        Ok(())
    }

    async fn revoke_reset_tokens(&mut self, user_id: Uuid, except: Option<Uuid>) -> AppResult<()> {
        for token in self
            .guard
            .reset_tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && !t.used && except != Some(t.id))
        {
            token.used = true;
        }
        Ok(())
    }

    async fn insert_event(&mut self, new: NewEvent) -> AppResult<Event> {
        let event = Event {
            id: Uuid::new_v4(),
            organizer_id: new.organizer_id,
            title: new.title,
            description: new.description,
            venue: new.venue,
            start_time: new.start_time,
            end_time: new.end_time,
            base_price: new.base_price,
            status: new.status,
            created_at: new.created_at,
        };
        self.guard.events.push(event.clone());
        Ok(event)
    }

    async fn event_by_id(&mut self, event_id: Uuid) -> AppResult<Option<Event>> {
        Ok(self.guard.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn list_events_with_inventory(&mut self) -> AppResult<Vec<EventWithInventory>> {
        let mut events: Vec<EventWithInventory> = self
            .guard
            .events
            .iter()
            .map(|event| {
                let seats = self.guard.seats.iter().filter(|s| s.event_id == event.id);
                let (total, available) = seats.fold((0i64, 0i64), |(t, a), seat| {
                    (t + 1, a + i64::from(seat.is_available))
                });
                EventWithInventory {
                    event: event.clone(),
                    total_seats: total,
                    available_seats: available,
                }
            })
            .collect();
        events.sort_by_key(|e| e.event.start_time);
        Ok(events)
    }

    async fn set_event_status(&mut self, event_id: Uuid, status: EventStatus) -> AppResult<()> {
        if let Some(event) = self.guard.events.iter_mut().find(|e| e.id == event_id) {
            event.status = status;
        }
        Ok(())
    }

    async fn bookings_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Booking>> {
        Ok(self
            .guard
            .bookings
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn insert_seats(&mut self, seats: Vec<NewSeat>) -> AppResult<()> {
        for new in seats {
            let duplicate = self.guard.seats.iter().any(|s| {
                s.event_id == new.event_id
                    && s.row_label == new.row_label
                    && s.seat_number == new.seat_number
            });
            if duplicate {
                return Err(AppError::Conflict(format!(
                    "Seat {}{} already exists for event",
                    new.row_label, new.seat_number
                )));
            }
            self.guard.seats.push(Seat {
                id: Uuid::new_v4(),
                event_id: new.event_id,
                row_label: new.row_label,
                seat_number: new.seat_number,
                is_available: true,
                price_override: new.price_override,
            });
        }
        Ok(())
    }

    async fn seats_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Seat>> {
        let mut seats: Vec<Seat> = self
            .guard
            .seats
            .iter()
            .filter(|s| s.event_id == event_id)
            .cloned()
            .collect();
        seats.sort_by(|a, b| {
            a.row_label
                .cmp(&b.row_label)
                .then(a.seat_number.cmp(&b.seat_number))
        });
        Ok(seats)
    }

    async fn seats_for_update(
        &mut self,
        event_id: Uuid,
        seat_ids: &[Uuid],
    ) -> AppResult<Vec<Seat>> {
        // The transaction holds the global lock, so the read is already
        // exclusive.
        Ok(self
            .guard
            .seats
            .iter()
            .filter(|s| s.event_id == event_id && seat_ids.contains(&s.id))
            .cloned()
            .collect())
    }

    async fn set_seats_availability(
        &mut self,
        seat_ids: &[Uuid],
        is_available: bool,
    ) -> AppResult<()> {
        for seat in self
            .guard
            .seats
            .iter_mut()
            .filter(|s| seat_ids.contains(&s.id))
        {
            seat.is_available = is_available;
        }
        Ok(())
    }

    async fn available_seat_count(&mut self, event_id: Uuid) -> AppResult<i64> {
        Ok(self
            .guard
            .seats
            .iter()
            .filter(|s| s.event_id == event_id && s.is_available)
            .count() as i64)
    }

    async fn insert_offer(&mut self, new: NewOffer) -> AppResult<Offer> {
        if self.guard.offers.iter().any(|o| o.code == new.code) {
            return Err(AppError::Conflict(format!(
                "Offer code '{}' already exists",
                new.code
            )));
        }
        let offer = Offer {
            id: Uuid::new_v4(),
            code: new.code,
            offer_type: new.offer_type,
            value: new.value,
            active: new.active,
            usage_limit: new.usage_limit,
            used_count: 0,
            valid_until: new.valid_until,
        };
        self.guard.offers.push(offer.clone());
        Ok(offer)
    }

    async fn list_offers(&mut self) -> AppResult<Vec<Offer>> {
        let mut offers = self.guard.offers.clone();
        offers.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(offers)
    }

    async fn offer_by_code_for_update(&mut self, code: &str) -> AppResult<Option<Offer>> {
        Ok(self.guard.offers.iter().find(|o| o.code == code).cloned())
    }

    async fn increment_offer_usage(&mut self, offer_id: Uuid) -> AppResult<()> {
        if let Some(offer) = self.guard.offers.iter_mut().find(|o| o.id == offer_id) {
            offer.used_count += 1;
        }
        Ok(())
    }

    async fn insert_booking(&mut self, new: NewBooking) -> AppResult<Booking> {
        let booking = Booking {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            event_id: new.event_id,
            status: new.status,
            subtotal: new.subtotal,
            discount_amount: new.discount_amount,
            tax_amount: new.tax_amount,
            total_amount: new.total_amount,
            offer_code: new.offer_code,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.guard.bookings.push(booking.clone());
        Ok(booking)
    }

    async fn booking_by_id(&mut self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self
            .guard
            .bookings
            .iter()
            .find(|b| b.id == booking_id)
            .cloned())
    }

    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> AppResult<Vec<Booking>> {
        let mut bookings: Vec<Booking> = self
            .guard
            .bookings
            .iter()
            .filter(|b| b.customer_id == customer_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_bookings(&mut self) -> AppResult<Vec<Booking>> {
        Ok(self.guard.bookings.clone())
    }

    async fn set_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        if let Some(booking) = self.guard.bookings.iter_mut().find(|b| b.id == booking_id) {
            booking.status = status;
            booking.updated_at = updated_at;
        }
        Ok(())
    }

    async fn insert_booking_seats(
        &mut self,
        seats: Vec<NewBookingSeat>,
    ) -> AppResult<Vec<BookingSeat>> {
        let mut inserted = Vec::with_capacity(seats.len());
        for new in seats {
            let duplicate = self
                .guard
                .booking_seats
                .iter()
                .any(|bs| bs.booking_id == new.booking_id && bs.seat_id == new.seat_id);
            if duplicate {
                return Err(AppError::Conflict(
                    "Seat is already linked to this booking".into(),
                ));
            }
            let booking_seat = BookingSeat {
                id: Uuid::new_v4(),
                booking_id: new.booking_id,
                seat_id: new.seat_id,
                ticket_price: new.ticket_price,
            };
            self.guard.booking_seats.push(booking_seat.clone());
            inserted.push(booking_seat);
        }
        Ok(inserted)
    }

    async fn booking_seats_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> AppResult<Vec<BookingSeat>> {
        Ok(self
            .guard
            .booking_seats
            .iter()
            .filter(|bs| bs.booking_id == booking_id)
            .cloned()
            .collect())
    }

    async fn booking_seat_by_id(
        &mut self,
        booking_seat_id: Uuid,
    ) -> AppResult<Option<BookingSeat>> {
        Ok(self
            .guard
            .booking_seats
            .iter()
            .find(|bs| bs.id == booking_seat_id)
            .cloned())
    }

    async fn insert_payment(&mut self, new: NewPayment) -> AppResult<Payment> {
        let duplicate = self
            .guard
            .payments
            .iter()
            .any(|p| p.booking_id == new.booking_id || p.transaction_ref == new.transaction_ref);
        if duplicate {
            return Err(AppError::Conflict(
                "Payment already exists for this booking".into(),
            ));
        }
        let payment = Payment {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            amount: new.amount,
            status: new.status,
            method: new.method,
            transaction_ref: new.transaction_ref,
            paid_at: None,
        };
        self.guard.payments.push(payment.clone());
        Ok(payment)
    }

    async fn payment_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self
            .guard
            .payments
            .iter()
            .find(|p| p.booking_id == booking_id)
            .cloned())
    }

    async fn set_payment_status(
        &mut self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> AppResult<()> {
        if let Some(payment) = self.guard.payments.iter_mut().find(|p| p.id == payment_id) {
            payment.status = status;
        }
        Ok(())
    }

    async fn record_payment_attempt(
        &mut self,
        payment_id: Uuid,
        method: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        if let Some(payment) = self.guard.payments.iter_mut().find(|p| p.id == payment_id) {
            payment.method = method.to_string();
            payment.status = status;
            payment.paid_at = paid_at;
        }
        Ok(())
    }

    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> AppResult<Vec<Ticket>> {
        let mut inserted = Vec::with_capacity(tickets.len());
        for new in tickets {
            let duplicate = self
                .guard
                .tickets
                .iter()
                .any(|t| t.booking_seat_id == new.booking_seat_id || t.qr_code == new.qr_code);
            if duplicate {
                return Err(AppError::Conflict(
                    "Ticket already issued for this seat".into(),
                ));
            }
            let ticket = Ticket {
                id: Uuid::new_v4(),
                booking_seat_id: new.booking_seat_id,
                qr_code: new.qr_code,
                status: TicketStatus::Issued,
                validated_at: None,
                entry_manager_id: None,
            };
            self.guard.tickets.push(ticket.clone());
            inserted.push(ticket);
        }
        Ok(inserted)
    }

    async fn ticket_by_qr(&mut self, qr_code: &str) -> AppResult<Option<Ticket>> {
        Ok(self
            .guard
            .tickets
            .iter()
            .find(|t| t.qr_code == qr_code)
            .cloned())
    }

    async fn tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<Vec<Ticket>> {
        let seat_ids: Vec<Uuid> = self
            .guard
            .booking_seats
            .iter()
            .filter(|bs| bs.booking_id == booking_id)
            .map(|bs| bs.id)
            .collect();
        Ok(self
            .guard
            .tickets
            .iter()
            .filter(|t| seat_ids.contains(&t.booking_seat_id))
            .cloned()
            .collect())
    }

    async fn mark_ticket_used(
        &mut self,
        ticket_id: Uuid,
        entry_manager_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let ticket = self
            .guard
            .tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))?;
        ticket.status = TicketStatus::Used;
        ticket.entry_manager_id = Some(entry_manager_id);
        ticket.validated_at = Some(validated_at);
        Ok(ticket.clone())
    }

    async fn invalidate_tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<()> {
        let seat_ids: Vec<Uuid> = self
            .guard
            .booking_seats
            .iter()
            .filter(|bs| bs.booking_id == booking_id)
            .map(|bs| bs.id)
            .collect();
        for ticket in self
            .guard
            .tickets
            .iter_mut()
            .filter(|t| seat_ids.contains(&t.booking_seat_id))
        {
            ticket.status = TicketStatus::Invalidated;
        }
        Ok(())
    }

    async fn insert_refund(&mut self, new: NewRefund) -> AppResult<Refund> {
        if self
            .guard
            .refunds
            .iter()
            .any(|r| r.booking_id == new.booking_id)
        {
            return Err(AppError::Conflict(
                "Refund already exists for this booking".into(),
            ));
        }
        let refund = Refund {
            id: Uuid::new_v4(),
            booking_id: new.booking_id,
            status: RefundStatus::Requested,
            reason: new.reason,
            refund_amount: new.refund_amount,
            requested_by: new.requested_by,
            resolved_by: None,
            resolved_at: None,
            created_at: new.created_at,
        };
        self.guard.refunds.push(refund.clone());
        Ok(refund)
    }

    async fn refund_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Refund>> {
        Ok(self
            .guard
            .refunds
            .iter()
            .find(|r| r.booking_id == booking_id)
            .cloned())
    }

    async fn resolve_refund(
        &mut self,
        refund_id: Uuid,
        status: RefundStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<Refund> {
        let refund = self
            .guard
            .refunds
            .iter_mut()
            .find(|r| r.id == refund_id)
            .ok_or_else(|| AppError::NotFound("Refund request not found".into()))?;
        refund.status = status;
        refund.resolved_by = Some(resolved_by);
        refund.resolved_at = Some(resolved_at);
        Ok(refund.clone())
    }

    async fn insert_support_ticket(&mut self, new: NewSupportTicket) -> AppResult<SupportTicket> {
        let ticket = SupportTicket {
            id: Uuid::new_v4(),
            customer_id: new.customer_id,
            booking_id: new.booking_id,
            event_id: new.event_id,
            subject: new.subject,
            description: new.description,
            status: SupportStatus::Open,
            assigned_to: None,
            resolution: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        };
        self.guard.support_tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn support_ticket_by_id(
        &mut self,
        ticket_id: Uuid,
    ) -> AppResult<Option<SupportTicket>> {
        Ok(self
            .guard
            .support_tickets
            .iter()
            .find(|t| t.id == ticket_id)
            .cloned())
    }

    async fn list_support_tickets(&mut self) -> AppResult<Vec<SupportTicket>> {
        let mut tickets = self.guard.support_tickets.clone();
        tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tickets)
    }

    async fn update_support_ticket(
        &mut self,
        ticket_id: Uuid,
        status: SupportStatus,
        assigned_to: Uuid,
        resolution: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<SupportTicket> {
        let ticket = self
            .guard
            .support_tickets
            .iter_mut()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| AppError::NotFound("Complaint not found".into()))?;
        ticket.status = status;
        ticket.assigned_to = Some(assigned_to);
        if let Some(resolution) = resolution {
            ticket.resolution = Some(resolution);
        }
        ticket.updated_at = updated_at;
        Ok(ticket.clone())
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn new_event(now: DateTime<Utc>) -> NewEvent {
        NewEvent {
            organizer_id: Uuid::new_v4(),
            title: "Test Event".into(),
            description: "".into(),
            venue: "Hall".into(),
            start_time: now + chrono::Duration::days(1),
            end_time: now + chrono::Duration::days(1) + chrono::Duration::hours(2),
            base_price: Decimal::new(3500, 2),
            status: EventStatus::Published,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn dropping_a_transaction_rolls_back() {
        let store = MemStore::new();
        let now = Utc::now();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_event(new_event(now)).await.unwrap();
            // dropped without commit
        }

        let mut tx = store.begin().await.unwrap();
        assert!(tx.list_events_with_inventory().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn commit_makes_changes_visible() {
        let store = MemStore::new();
        let now = Utc::now();

        let mut tx = store.begin().await.unwrap();
        let event = tx.insert_event(new_event(now)).await.unwrap();
        tx.insert_seats(vec![NewSeat {
            event_id: event.id,
            row_label: "A".into(),
            seat_number: 1,
            price_override: None,
        }])
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.available_seat_count(event.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemStore::new();
        let mut tx = store.begin().await.unwrap();
        let new = NewUser {
            name: "A".into(),
            email: "a@ticket.local".into(),
            password_hash: "x".into(),
            role: UserRole::Customer,
            is_active: true,
        };
        tx.insert_user(new.clone()).await.unwrap();
        let err = tx.insert_user(new).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}

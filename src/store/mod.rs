//! The single authoritative transactional store.
//!
//! Every public operation of the platform runs inside exactly one
//! [`StoreTx`]: it is opened with [`Store::begin`], mutated through the
//! contract below, and either committed or dropped (drop rolls back).
//! Seat rows and offer rows are the only contended shared state; the
//! backends guarantee that reads of those rows through the `*_for_update`
//! methods are exclusive for the lifetime of the transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{
    Booking, BookingSeat, BookingStatus, Event, EventStatus, EventWithInventory, Offer, OfferType,
    PasswordResetToken, Payment, PaymentStatus, Refund, RefundStatus, Seat, SupportStatus,
    SupportTicket, Ticket, User, UserRole,
};
use crate::utils::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewPasswordResetToken {
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewEvent {
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

#[derive(Debug, Clone)]
pub struct NewSeat {
    pub event_id: Uuid,
    pub row_label: String,
    pub seat_number: i32,
    pub price_override: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub code: String,
    pub offer_type: OfferType,
    pub value: Decimal,
    pub active: bool,
    pub usage_limit: Option<i32>,
    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub status: BookingStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub offer_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBookingSeat {
    pub booking_id: Uuid,
    pub seat_id: Uuid,
    pub ticket_price: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub booking_id: Uuid,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: String,
    pub transaction_ref: String,
}

#[derive(Debug, Clone)]
pub struct NewTicket {
    pub booking_seat_id: Uuid,
    pub qr_code: String,
}

#[derive(Debug, Clone)]
pub struct NewRefund {
    pub booking_id: Uuid,
    pub reason: String,
    pub refund_amount: Decimal,
    pub requested_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSupportTicket {
    pub customer_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>>;
}

#[async_trait]
pub trait StoreTx: Send {
    // ---- users ----
    async fn insert_user(&mut self, new: NewUser) -> AppResult<User>;
    async fn user_by_id(&mut self, user_id: Uuid) -> AppResult<Option<User>>;
    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&mut self, role: Option<UserRole>) -> AppResult<Vec<User>>;
    async fn set_user_password(&mut self, user_id: Uuid, password_hash: &str) -> AppResult<()>;
    async fn count_users(&mut self) -> AppResult<i64>;

    // ---- password reset tokens ----
    async fn insert_reset_token(
        &mut self,
        new: NewPasswordResetToken,
    ) -> AppResult<PasswordResetToken>;
    /// Most recent unused token with this hash, if any.
    async fn reset_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<PasswordResetToken>>;
    async fn mark_reset_token_used(&mut self, token_id: Uuid) -> AppResult<()>;
    /// Mark every outstanding token of the user as used, optionally
    /// sparing one.
    async fn revoke_reset_tokens(&mut self, user_id: Uuid, except: Option<Uuid>) -> AppResult<()>;

    // ---- events ----
    async fn insert_event(&mut self, new: NewEvent) -> AppResult<Event>;
    async fn event_by_id(&mut self, event_id: Uuid) -> AppResult<Option<Event>>;
    async fn list_events_with_inventory(&mut self) -> AppResult<Vec<EventWithInventory>>;
    async fn set_event_status(&mut self, event_id: Uuid, status: EventStatus) -> AppResult<()>;
    async fn bookings_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Booking>>;

    // ---- seats ----
    async fn insert_seats(&mut self, seats: Vec<NewSeat>) -> AppResult<()>;
    /// Seats of an event ordered by row label, then seat number.
    async fn seats_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Seat>>;
    /// The requested seats of the event, read under an exclusive row
    /// lock. Ids not belonging to the event are simply absent from the
    /// result.
    async fn seats_for_update(
        &mut self,
        event_id: Uuid,
        seat_ids: &[Uuid],
    ) -> AppResult<Vec<Seat>>;
    async fn set_seats_availability(
        &mut self,
        seat_ids: &[Uuid],
        is_available: bool,
    ) -> AppResult<()>;
    async fn available_seat_count(&mut self, event_id: Uuid) -> AppResult<i64>;

    // ---- offers ----
    async fn insert_offer(&mut self, new: NewOffer) -> AppResult<Offer>;
    async fn list_offers(&mut self) -> AppResult<Vec<Offer>>;
    /// Exact-match lookup (codes are stored uppercase) under an exclusive
    /// row lock, so the usage-limit check and the increment are
    /// linearizable.
    async fn offer_by_code_for_update(&mut self, code: &str) -> AppResult<Option<Offer>>;
    async fn increment_offer_usage(&mut self, offer_id: Uuid) -> AppResult<()>;

    // ---- bookings ----
    async fn insert_booking(&mut self, new: NewBooking) -> AppResult<Booking>;
    async fn booking_by_id(&mut self, booking_id: Uuid) -> AppResult<Option<Booking>>;
    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> AppResult<Vec<Booking>>;
    async fn list_bookings(&mut self) -> AppResult<Vec<Booking>>;
    async fn set_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()>;
    async fn insert_booking_seats(
        &mut self,
        seats: Vec<NewBookingSeat>,
    ) -> AppResult<Vec<BookingSeat>>;
    async fn booking_seats_for_booking(&mut self, booking_id: Uuid)
        -> AppResult<Vec<BookingSeat>>;
    async fn booking_seat_by_id(
        &mut self,
        booking_seat_id: Uuid,
    ) -> AppResult<Option<BookingSeat>>;

    // ---- payments ----
    async fn insert_payment(&mut self, new: NewPayment) -> AppResult<Payment>;
    async fn payment_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Payment>>;
    async fn set_payment_status(&mut self, payment_id: Uuid, status: PaymentStatus)
        -> AppResult<()>;
    /// Capture attempt: records the chosen method together with the
    /// outcome.
    async fn record_payment_attempt(
        &mut self,
        payment_id: Uuid,
        method: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;

    // ---- tickets ----
    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> AppResult<Vec<Ticket>>;
    async fn ticket_by_qr(&mut self, qr_code: &str) -> AppResult<Option<Ticket>>;
    async fn tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<Vec<Ticket>>;
    async fn mark_ticket_used(
        &mut self,
        ticket_id: Uuid,
        entry_manager_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> AppResult<Ticket>;
    async fn invalidate_tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<()>;

    // ---- refunds ----
    async fn insert_refund(&mut self, new: NewRefund) -> AppResult<Refund>;
    async fn refund_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Refund>>;
    async fn resolve_refund(
        &mut self,
        refund_id: Uuid,
        status: RefundStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<Refund>;

    // ---- support tickets ----
    async fn insert_support_ticket(&mut self, new: NewSupportTicket) -> AppResult<SupportTicket>;
    async fn support_ticket_by_id(
        &mut self,
        ticket_id: Uuid,
    ) -> AppResult<Option<SupportTicket>>;
    async fn list_support_tickets(&mut self) -> AppResult<Vec<SupportTicket>>;
    async fn update_support_ticket(
        &mut self,
        ticket_id: Uuid,
        status: SupportStatus,
        assigned_to: Uuid,
        resolution: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<SupportTicket>;

    /// Make every change of this transaction visible to subsequent
    /// transactions. Dropping an uncommitted transaction rolls it back.
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

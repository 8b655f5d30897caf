//! PostgreSQL store backend.
//!
//! One [`StoreTx`] maps to one `sqlx` transaction. The contended rows
//! (seats, offers) are read with `SELECT … FOR UPDATE`, so the
//! availability check / usage-limit check and the matching write are
//! race-free across concurrent transactions. Statuses are stored as TEXT
//! and converted through the domain enums' `FromStr`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
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

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn parse_status<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(AppError::Internal)
}

fn unique_conflict(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.to_string())
        }
        _ => AppError::Database(e),
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> AppResult<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_status(&row.role)?,
            is_active: row.is_active,
        })
    }
}

#[derive(FromRow)]
struct ResetTokenRow {
    id: Uuid,
    user_id: Uuid,
    token_hash: String,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl From<ResetTokenRow> for PasswordResetToken {
    fn from(row: ResetTokenRow) -> Self {
        PasswordResetToken {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            used: row.used,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    venue: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    base_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = AppError;

    fn try_from(row: EventRow) -> AppResult<Self> {
        Ok(Event {
            id: row.id,
            organizer_id: row.organizer_id,
            title: row.title,
            description: row.description,
            venue: row.venue,
            start_time: row.start_time,
            end_time: row.end_time,
            base_price: row.base_price,
            status: parse_status(&row.status)?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct EventInventoryRow {
    id: Uuid,
    organizer_id: Uuid,
    title: String,
    description: String,
    venue: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    base_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    total_seats: i64,
    available_seats: i64,
}

#[derive(FromRow)]
struct SeatRow {
    id: Uuid,
    event_id: Uuid,
    row_label: String,
    seat_number: i32,
    is_available: bool,
    price_override: Option<Decimal>,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            id: row.id,
            event_id: row.event_id,
            row_label: row.row_label,
            seat_number: row.seat_number,
            is_available: row.is_available,
            price_override: row.price_override,
        }
    }
}

#[derive(FromRow)]
struct OfferRow {
    id: Uuid,
    code: String,
    offer_type: String,
    value: Decimal,
    active: bool,
    usage_limit: Option<i32>,
    used_count: i32,
    valid_until: Option<DateTime<Utc>>,
}

impl TryFrom<OfferRow> for Offer {
    type Error = AppError;

    fn try_from(row: OfferRow) -> AppResult<Self> {
        Ok(Offer {
            id: row.id,
            code: row.code,
            offer_type: parse_status(&row.offer_type)?,
            value: row.value,
            active: row.active,
            usage_limit: row.usage_limit,
            used_count: row.used_count,
            valid_until: row.valid_until,
        })
    }
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    event_id: Uuid,
    status: String,
    subtotal: Decimal,
    discount_amount: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    offer_code: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = AppError;

    fn try_from(row: BookingRow) -> AppResult<Self> {
        Ok(Booking {
            id: row.id,
            customer_id: row.customer_id,
            event_id: row.event_id,
            status: parse_status(&row.status)?,
            subtotal: row.subtotal,
            discount_amount: row.discount_amount,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            offer_code: row.offer_code,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct BookingSeatRow {
    id: Uuid,
    booking_id: Uuid,
    seat_id: Uuid,
    ticket_price: Decimal,
}

impl From<BookingSeatRow> for BookingSeat {
    fn from(row: BookingSeatRow) -> Self {
        BookingSeat {
            id: row.id,
            booking_id: row.booking_id,
            seat_id: row.seat_id,
            ticket_price: row.ticket_price,
        }
    }
}

#[derive(FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    status: String,
    method: String,
    transaction_ref: String,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = AppError;

    fn try_from(row: PaymentRow) -> AppResult<Self> {
        Ok(Payment {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            status: parse_status(&row.status)?,
            method: row.method,
            transaction_ref: row.transaction_ref,
            paid_at: row.paid_at,
        })
    }
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    booking_seat_id: Uuid,
    qr_code: String,
    status: String,
    validated_at: Option<DateTime<Utc>>,
    entry_manager_id: Option<Uuid>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = AppError;

    fn try_from(row: TicketRow) -> AppResult<Self> {
        Ok(Ticket {
            id: row.id,
            booking_seat_id: row.booking_seat_id,
            qr_code: row.qr_code,
            status: parse_status(&row.status)?,
            validated_at: row.validated_at,
            entry_manager_id: row.entry_manager_id,
        })
    }
}

#[derive(FromRow)]
struct RefundRow {
    id: Uuid,
    booking_id: Uuid,
    status: String,
    reason: String,
    refund_amount: Decimal,
    requested_by: Uuid,
    resolved_by: Option<Uuid>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<RefundRow> for Refund {
    type Error = AppError;

    fn try_from(row: RefundRow) -> AppResult<Self> {
        Ok(Refund {
            id: row.id,
            booking_id: row.booking_id,
            status: parse_status(&row.status)?,
            reason: row.reason,
            refund_amount: row.refund_amount,
            requested_by: row.requested_by,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct SupportTicketRow {
    id: Uuid,
    customer_id: Uuid,
    booking_id: Option<Uuid>,
    event_id: Option<Uuid>,
    subject: String,
    description: String,
    status: String,
    assigned_to: Option<Uuid>,
    resolution: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SupportTicketRow> for SupportTicket {
    type Error = AppError;

    fn try_from(row: SupportTicketRow) -> AppResult<Self> {
        Ok(SupportTicket {
            id: row.id,
            customer_id: row.customer_id,
            booking_id: row.booking_id,
            event_id: row.event_id,
            subject: row.subject,
            description: row.description,
            status: parse_status(&row.status)?,
            assigned_to: row.assigned_to,
            resolution: row.resolution,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn insert_user(&mut self, new: NewUser) -> AppResult<User> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, role, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.password_hash)
        .bind(new.role.as_str())
        .bind(new.is_active)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_conflict(e, "Email is already registered"))?;

        Ok(User {
            id,
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_active: new.is_active,
        })
    }

    async fn user_by_id(&mut self, user_id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, is_active FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, is_active FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&mut self, role: Option<UserRole>) -> AppResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, password_hash, role, is_active FROM users \
             WHERE ($1::text IS NULL OR role = $1) ORDER BY name",
        )
        .bind(role.map(|r| r.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn set_user_password(&mut self, user_id: Uuid, password_hash: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn count_users(&mut self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count)
    }

    async fn insert_reset_token(
        &mut self,
        new: NewPasswordResetToken,
    ) -> AppResult<PasswordResetToken> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO password_reset_tokens (id, user_id, token_hash, expires_at, used, created_at) \
             VALUES ($1, $2, $3, $4, FALSE, $5)",
        )
        .bind(id)
        .bind(new.user_id)
        .bind(&new.token_hash)
        .bind(new.expires_at)
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(PasswordResetToken {
            id,
            user_id: new.user_id,
            token_hash: new.token_hash,
            expires_at: new.expires_at,
            used: false,
            created_at: new.created_at,
        })
    }

    async fn reset_token_by_hash(
        &mut self,
        token_hash: &str,
    ) -> AppResult<Option<PasswordResetToken>> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT id, user_id, token_hash, expires_at, used, created_at \
             FROM password_reset_tokens \
             WHERE token_hash = $1 AND used = FALSE \
             ORDER BY created_at DESC LIMIT 1",
        )
        .bind(token_hash)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(PasswordResetToken::from))
    }

    async fn mark_reset_token_used(&mut self, token_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE password_reset_tokens SET used = TRUE WHERE id = $1")
            .bind(token_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn revoke_reset_tokens(&mut self, user_id: Uuid, except: Option<Uuid>) -> AppResult<()> {
        sqlx::query(
            "UPDATE password_reset_tokens SET used = TRUE \
             WHERE user_id = $1 AND used = FALSE AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(user_id)
        .bind(except)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_event(&mut self, new: NewEvent) -> AppResult<Event> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, venue, start_time, \
             end_time, base_price, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(id)
        .bind(new.organizer_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.venue)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.base_price)
        .bind(new.status.as_str())
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(Event {
            id,
            organizer_id: new.organizer_id,
            title: new.title,
            description: new.description,
            venue: new.venue,
            start_time: new.start_time,
            end_time: new.end_time,
            base_price: new.base_price,
            status: new.status,
            created_at: new.created_at,
        })
    }

    async fn event_by_id(&mut self, event_id: Uuid) -> AppResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(
            "SELECT id, organizer_id, title, description, venue, start_time, end_time, \
             base_price, status, created_at FROM events WHERE id = $1",
        )
        .bind(event_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn list_events_with_inventory(&mut self) -> AppResult<Vec<EventWithInventory>> {
        let rows = sqlx::query_as::<_, EventInventoryRow>(
            "SELECT e.id, e.organizer_id, e.title, e.description, e.venue, e.start_time, \
             e.end_time, e.base_price, e.status, e.created_at, \
             COUNT(s.id) AS total_seats, \
             COUNT(s.id) FILTER (WHERE s.is_available) AS available_seats \
             FROM events e \
             LEFT JOIN seats s ON s.event_id = e.id \
             GROUP BY e.id \
             ORDER BY e.start_time ASC",
        )
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(EventWithInventory {
                    event: Event {
                        id: row.id,
                        organizer_id: row.organizer_id,
                        title: row.title,
                        description: row.description,
                        venue: row.venue,
                        start_time: row.start_time,
                        end_time: row.end_time,
                        base_price: row.base_price,
                        status: parse_status(&row.status)?,
                        created_at: row.created_at,
                    },
                    total_seats: row.total_seats,
                    available_seats: row.available_seats,
                })
            })
            .collect()
    }

    async fn set_event_status(&mut self, event_id: Uuid, status: EventStatus) -> AppResult<()> {
        sqlx::query("UPDATE events SET status = $2 WHERE id = $1")
            .bind(event_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn bookings_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, customer_id, event_id, status, subtotal, discount_amount, tax_amount, \
             total_amount, offer_code, created_at, updated_at \
             FROM bookings WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn insert_seats(&mut self, seats: Vec<NewSeat>) -> AppResult<()> {
        for new in seats {
            sqlx::query(
                "INSERT INTO seats (id, event_id, row_label, seat_number, is_available, price_override) \
                 VALUES ($1, $2, $3, $4, TRUE, $5)",
            )
            .bind(Uuid::new_v4())
            .bind(new.event_id)
            .bind(&new.row_label)
            .bind(new.seat_number)
            .bind(new.price_override)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| unique_conflict(e, "Seat already exists for event"))?;
        }
        Ok(())
    }

    async fn seats_for_event(&mut self, event_id: Uuid) -> AppResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, event_id, row_label, seat_number, is_available, price_override \
             FROM seats WHERE event_id = $1 ORDER BY row_label, seat_number",
        )
        .bind(event_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn seats_for_update(
        &mut self,
        event_id: Uuid,
        seat_ids: &[Uuid],
    ) -> AppResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, event_id, row_label, seat_number, is_available, price_override \
             FROM seats WHERE event_id = $1 AND id = ANY($2) FOR UPDATE",
        )
        .bind(event_id)
        .bind(seat_ids.to_vec())
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn set_seats_availability(
        &mut self,
        seat_ids: &[Uuid],
        is_available: bool,
    ) -> AppResult<()> {
        sqlx::query("UPDATE seats SET is_available = $2 WHERE id = ANY($1)")
            .bind(seat_ids.to_vec())
            .bind(is_available)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn available_seat_count(&mut self, event_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM seats WHERE event_id = $1 AND is_available",
        )
        .bind(event_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(count)
    }

    async fn insert_offer(&mut self, new: NewOffer) -> AppResult<Offer> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO offers (id, code, offer_type, value, active, usage_limit, used_count, valid_until) \
             VALUES ($1, $2, $3, $4, $5, $6, 0, $7)",
        )
        .bind(id)
        .bind(&new.code)
        .bind(new.offer_type.as_str())
        .bind(new.value)
        .bind(new.active)
        .bind(new.usage_limit)
        .bind(new.valid_until)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_conflict(e, "Offer code already exists"))?;

        Ok(Offer {
            id,
            code: new.code,
            offer_type: new.offer_type,
            value: new.value,
            active: new.active,
            usage_limit: new.usage_limit,
            used_count: 0,
            valid_until: new.valid_until,
        })
    }

    async fn list_offers(&mut self) -> AppResult<Vec<Offer>> {
        let rows = sqlx::query_as::<_, OfferRow>(
            "SELECT id, code, offer_type, value, active, usage_limit, used_count, valid_until \
             FROM offers ORDER BY code",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Offer::try_from).collect()
    }

    async fn offer_by_code_for_update(&mut self, code: &str) -> AppResult<Option<Offer>> {
        let row = sqlx::query_as::<_, OfferRow>(
            "SELECT id, code, offer_type, value, active, usage_limit, used_count, valid_until \
             FROM offers WHERE code = $1 FOR UPDATE",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Offer::try_from).transpose()
    }

    async fn increment_offer_usage(&mut self, offer_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE offers SET used_count = used_count + 1 WHERE id = $1")
            .bind(offer_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_booking(&mut self, new: NewBooking) -> AppResult<Booking> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO bookings (id, customer_id, event_id, status, subtotal, discount_amount, \
             tax_amount, total_amount, offer_code, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)",
        )
        .bind(id)
        .bind(new.customer_id)
        .bind(new.event_id)
        .bind(new.status.as_str())
        .bind(new.subtotal)
        .bind(new.discount_amount)
        .bind(new.tax_amount)
        .bind(new.total_amount)
        .bind(&new.offer_code)
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(Booking {
            id,
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
        })
    }

    async fn booking_by_id(&mut self, booking_id: Uuid) -> AppResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, customer_id, event_id, status, subtotal, discount_amount, tax_amount, \
             total_amount, offer_code, created_at, updated_at \
             FROM bookings WHERE id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Booking::try_from).transpose()
    }

    async fn bookings_for_customer(&mut self, customer_id: Uuid) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, customer_id, event_id, status, subtotal, discount_amount, tax_amount, \
             total_amount, offer_code, created_at, updated_at \
             FROM bookings WHERE customer_id = $1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn list_bookings(&mut self) -> AppResult<Vec<Booking>> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, customer_id, event_id, status, subtotal, discount_amount, tax_amount, \
             total_amount, offer_code, created_at, updated_at FROM bookings",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn set_booking_status(
        &mut self,
        booking_id: Uuid,
        status: BookingStatus,
        updated_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE bookings SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(booking_id)
            .bind(status.as_str())
            .bind(updated_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_booking_seats(
        &mut self,
        seats: Vec<NewBookingSeat>,
    ) -> AppResult<Vec<BookingSeat>> {
        let mut inserted = Vec::with_capacity(seats.len());
        for new in seats {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO booking_seats (id, booking_id, seat_id, ticket_price) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(new.booking_id)
            .bind(new.seat_id)
            .bind(new.ticket_price)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| unique_conflict(e, "Seat is already linked to this booking"))?;
            inserted.push(BookingSeat {
                id,
                booking_id: new.booking_id,
                seat_id: new.seat_id,
                ticket_price: new.ticket_price,
            });
        }
        Ok(inserted)
    }

    async fn booking_seats_for_booking(
        &mut self,
        booking_id: Uuid,
    ) -> AppResult<Vec<BookingSeat>> {
        let rows = sqlx::query_as::<_, BookingSeatRow>(
            "SELECT id, booking_id, seat_id, ticket_price FROM booking_seats WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(BookingSeat::from).collect())
    }

    async fn booking_seat_by_id(
        &mut self,
        booking_seat_id: Uuid,
    ) -> AppResult<Option<BookingSeat>> {
        let row = sqlx::query_as::<_, BookingSeatRow>(
            "SELECT id, booking_id, seat_id, ticket_price FROM booking_seats WHERE id = $1",
        )
        .bind(booking_seat_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(BookingSeat::from))
    }

    async fn insert_payment(&mut self, new: NewPayment) -> AppResult<Payment> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO payments (id, booking_id, amount, status, method, transaction_ref, paid_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NULL)",
        )
        .bind(id)
        .bind(new.booking_id)
        .bind(new.amount)
        .bind(new.status.as_str())
        .bind(&new.method)
        .bind(&new.transaction_ref)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_conflict(e, "Payment already exists for this booking"))?;

        Ok(Payment {
            id,
            booking_id: new.booking_id,
            amount: new.amount,
            status: new.status,
            method: new.method,
            transaction_ref: new.transaction_ref,
            paid_at: None,
        })
    }

    async fn payment_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            "SELECT id, booking_id, amount, status, method, transaction_ref, paid_at \
             FROM payments WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Payment::try_from).transpose()
    }

    async fn set_payment_status(
        &mut self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE payments SET status = $2 WHERE id = $1")
            .bind(payment_id)
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn record_payment_attempt(
        &mut self,
        payment_id: Uuid,
        method: &str,
        status: PaymentStatus,
        paid_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE payments SET method = $2, status = $3, paid_at = $4 WHERE id = $1")
            .bind(payment_id)
            .bind(method)
            .bind(status.as_str())
            .bind(paid_at)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_tickets(&mut self, tickets: Vec<NewTicket>) -> AppResult<Vec<Ticket>> {
        let mut inserted = Vec::with_capacity(tickets.len());
        for new in tickets {
            let id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO tickets (id, booking_seat_id, qr_code, status, validated_at, entry_manager_id) \
                 VALUES ($1, $2, $3, $4, NULL, NULL)",
            )
            .bind(id)
            .bind(new.booking_seat_id)
            .bind(&new.qr_code)
            .bind(TicketStatus::Issued.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| unique_conflict(e, "Ticket already issued for this seat"))?;
            inserted.push(Ticket {
                id,
                booking_seat_id: new.booking_seat_id,
                qr_code: new.qr_code,
                status: TicketStatus::Issued,
                validated_at: None,
                entry_manager_id: None,
            });
        }
        Ok(inserted)
    }

    async fn ticket_by_qr(&mut self, qr_code: &str) -> AppResult<Option<Ticket>> {
        let row = sqlx::query_as::<_, TicketRow>(
            "SELECT id, booking_seat_id, qr_code, status, validated_at, entry_manager_id \
             FROM tickets WHERE qr_code = $1",
        )
        .bind(qr_code)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Ticket::try_from).transpose()
    }

    async fn tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<Vec<Ticket>> {
        let rows = sqlx::query_as::<_, TicketRow>(
            "SELECT t.id, t.booking_seat_id, t.qr_code, t.status, t.validated_at, t.entry_manager_id \
             FROM tickets t \
             JOIN booking_seats bs ON bs.id = t.booking_seat_id \
             WHERE bs.booking_id = $1",
        )
        .bind(booking_id)
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    async fn mark_ticket_used(
        &mut self,
        ticket_id: Uuid,
        entry_manager_id: Uuid,
        validated_at: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let row = sqlx::query_as::<_, TicketRow>(
            "UPDATE tickets SET status = $2, entry_manager_id = $3, validated_at = $4 \
             WHERE id = $1 \
             RETURNING id, booking_seat_id, qr_code, status, validated_at, entry_manager_id",
        )
        .bind(ticket_id)
        .bind(TicketStatus::Used.as_str())
        .bind(entry_manager_id)
        .bind(validated_at)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Ticket::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound("Ticket not found".into()))
    }

    async fn invalidate_tickets_for_booking(&mut self, booking_id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE tickets SET status = $2 \
             WHERE booking_seat_id IN (SELECT id FROM booking_seats WHERE booking_id = $1)",
        )
        .bind(booking_id)
        .bind(TicketStatus::Invalidated.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn insert_refund(&mut self, new: NewRefund) -> AppResult<Refund> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO refunds (id, booking_id, status, reason, refund_amount, requested_by, \
             resolved_by, resolved_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, NULL, NULL, $7)",
        )
        .bind(id)
        .bind(new.booking_id)
        .bind(RefundStatus::Requested.as_str())
        .bind(&new.reason)
        .bind(new.refund_amount)
        .bind(new.requested_by)
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| unique_conflict(e, "Refund already exists for this booking"))?;

        Ok(Refund {
            id,
            booking_id: new.booking_id,
            status: RefundStatus::Requested,
            reason: new.reason,
            refund_amount: new.refund_amount,
            requested_by: new.requested_by,
            resolved_by: None,
            resolved_at: None,
            created_at: new.created_at,
        })
    }

    async fn refund_for_booking(&mut self, booking_id: Uuid) -> AppResult<Option<Refund>> {
        let row = sqlx::query_as::<_, RefundRow>(
            "SELECT id, booking_id, status, reason, refund_amount, requested_by, resolved_by, \
             resolved_at, created_at FROM refunds WHERE booking_id = $1",
        )
        .bind(booking_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Refund::try_from).transpose()
    }

    async fn resolve_refund(
        &mut self,
        refund_id: Uuid,
        status: RefundStatus,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<Refund> {
        let row = sqlx::query_as::<_, RefundRow>(
            "UPDATE refunds SET status = $2, resolved_by = $3, resolved_at = $4 \
             WHERE id = $1 \
             RETURNING id, booking_id, status, reason, refund_amount, requested_by, resolved_by, \
             resolved_at, created_at",
        )
        .bind(refund_id)
        .bind(status.as_str())
        .bind(resolved_by)
        .bind(resolved_at)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(Refund::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound("Refund request not found".into()))
    }

    async fn insert_support_ticket(&mut self, new: NewSupportTicket) -> AppResult<SupportTicket> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO support_tickets (id, customer_id, booking_id, event_id, subject, \
             description, status, assigned_to, resolution, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, NULL, NULL, $8, $8)",
        )
        .bind(id)
        .bind(new.customer_id)
        .bind(new.booking_id)
        .bind(new.event_id)
        .bind(&new.subject)
        .bind(&new.description)
        .bind(SupportStatus::Open.as_str())
        .bind(new.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(SupportTicket {
            id,
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
        })
    }

    async fn support_ticket_by_id(
        &mut self,
        ticket_id: Uuid,
    ) -> AppResult<Option<SupportTicket>> {
        let row = sqlx::query_as::<_, SupportTicketRow>(
            "SELECT id, customer_id, booking_id, event_id, subject, description, status, \
             assigned_to, resolution, created_at, updated_at \
             FROM support_tickets WHERE id = $1",
        )
        .bind(ticket_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(SupportTicket::try_from).transpose()
    }

    async fn list_support_tickets(&mut self) -> AppResult<Vec<SupportTicket>> {
        let rows = sqlx::query_as::<_, SupportTicketRow>(
            "SELECT id, customer_id, booking_id, event_id, subject, description, status, \
             assigned_to, resolution, created_at, updated_at \
             FROM support_tickets ORDER BY created_at DESC",
        )
        .fetch_all(&mut *self.tx)
        .await?;
        rows.into_iter().map(SupportTicket::try_from).collect()
    }

    async fn update_support_ticket(
        &mut self,
        ticket_id: Uuid,
        status: SupportStatus,
        assigned_to: Uuid,
        resolution: Option<String>,
        updated_at: DateTime<Utc>,
    ) -> AppResult<SupportTicket> {
        let row = sqlx::query_as::<_, SupportTicketRow>(
            "UPDATE support_tickets \
             SET status = $2, assigned_to = $3, resolution = COALESCE($4, resolution), updated_at = $5 \
             WHERE id = $1 \
             RETURNING id, customer_id, booking_id, event_id, subject, description, status, \
             assigned_to, resolution, created_at, updated_at",
        )
        .bind(ticket_id)
        .bind(status.as_str())
        .bind(assigned_to)
        .bind(resolution)
        .bind(updated_at)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(SupportTicket::try_from)
            .transpose()?
            .ok_or_else(|| AppError::NotFound("Complaint not found".into()))
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

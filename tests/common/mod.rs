#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use tessera_server::models::{Event, EventStatus, Offer, OfferType, Seat, User, UserRole};
use tessera_server::services::{
    Clock, LogNotifier, PricingConfig, TicketingService, UuidReferences,
};
use tessera_server::store::{MemStore, NewEvent, NewOffer, NewSeat, NewUser, Store};

/// Movable clock so expiry logic is deterministic.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub struct TestApp {
    pub service: TicketingService,
    pub store: MemStore,
    pub clock: Arc<TestClock>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

pub fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn test_app() -> TestApp {
    let store = MemStore::new();
    let clock = Arc::new(TestClock::new(start_time()));
    let service = TicketingService::new(
        Arc::new(store.clone()),
        clock.clone(),
        Arc::new(UuidReferences),
        Arc::new(LogNotifier),
        PricingConfig {
            tax_rate: Decimal::new(8, 2),
            currency: "USD".into(),
        },
        "Test Ticketing Platform",
    );
    TestApp {
        service,
        store,
        clock,
    }
}

pub async fn create_user(store: &MemStore, role: UserRole) -> User {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .insert_user(NewUser {
            name: format!("{role} user"),
            email: format!("{}-{}@test.local", role.as_str(), Uuid::new_v4()),
            password_hash: "unused-hash".into(),
            role,
            is_active: true,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user
}

pub async fn create_inactive_user(store: &MemStore, role: UserRole) -> User {
    let mut tx = store.begin().await.unwrap();
    let user = tx
        .insert_user(NewUser {
            name: "Inactive user".into(),
            email: format!("inactive-{}@test.local", Uuid::new_v4()),
            password_hash: "unused-hash".into(),
            role,
            is_active: false,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    user
}

/// A published event starting five days after the fixture clock, with a
/// grid of `row_count` rows of `seats_per_row` seats. Returns the seats
/// ordered by row and number.
pub async fn create_published_event(
    store: &MemStore,
    organizer_id: Uuid,
    row_count: u8,
    seats_per_row: i32,
    base_price: Decimal,
) -> (Event, Vec<Seat>) {
    create_event_with_status(
        store,
        organizer_id,
        row_count,
        seats_per_row,
        base_price,
        EventStatus::Published,
    )
    .await
}

pub async fn create_event_with_status(
    store: &MemStore,
    organizer_id: Uuid,
    row_count: u8,
    seats_per_row: i32,
    base_price: Decimal,
    status: EventStatus,
) -> (Event, Vec<Seat>) {
    let starts_at = start_time() + Duration::days(5);
    let mut tx = store.begin().await.unwrap();
    let event = tx
        .insert_event(NewEvent {
            organizer_id,
            title: "Indie Music Night".into(),
            description: "A live showcase with three local indie bands.".into(),
            venue: "City Hall Stage".into(),
            start_time: starts_at,
            end_time: starts_at + Duration::hours(4),
            base_price,
            status,
            created_at: start_time(),
        })
        .await
        .unwrap();

    let mut seats = Vec::new();
    for row_index in 0..row_count {
        for seat_number in 1..=seats_per_row {
            seats.push(NewSeat {
                event_id: event.id,
                row_label: char::from(b'A' + row_index).to_string(),
                seat_number,
                price_override: None,
            });
        }
    }
    tx.insert_seats(seats).await.unwrap();
    let seats = tx.seats_for_event(event.id).await.unwrap();
    tx.commit().await.unwrap();
    (event, seats)
}

pub async fn create_offer(
    store: &MemStore,
    code: &str,
    offer_type: OfferType,
    value: Decimal,
    usage_limit: Option<i32>,
    valid_until: Option<DateTime<Utc>>,
) -> Offer {
    let mut tx = store.begin().await.unwrap();
    let offer = tx
        .insert_offer(NewOffer {
            code: code.into(),
            offer_type,
            value,
            active: true,
            usage_limit,
            valid_until,
        })
        .await
        .unwrap();
    tx.commit().await.unwrap();
    offer
}

pub async fn offer_used_count(store: &MemStore, code: &str) -> i32 {
    let mut tx = store.begin().await.unwrap();
    let offers = tx.list_offers().await.unwrap();
    offers
        .into_iter()
        .find(|o| o.code == code)
        .map(|o| o.used_count)
        .unwrap_or(0)
}

pub async fn available_seats(store: &MemStore, event_id: Uuid) -> i64 {
    let mut tx = store.begin().await.unwrap();
    tx.available_seat_count(event_id).await.unwrap()
}

pub async fn event_status(store: &MemStore, event_id: Uuid) -> EventStatus {
    let mut tx = store.begin().await.unwrap();
    tx.event_by_id(event_id).await.unwrap().unwrap().status
}

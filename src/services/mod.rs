//! The booking engine and its collaborators.
//!
//! [`TicketingService`] is the only entry point callers get; every public
//! method opens one store transaction, drives the operation to completion
//! and commits, or returns an error with all intermediate changes rolled
//! back. Status fields are never mutated outside these methods.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use crate::store::{Store, StoreTx};
use crate::utils::error::AppResult;

pub mod bookings;
pub mod events;
pub mod identity;
pub mod inventory;
pub mod notifications;
pub mod pricing;
pub mod refunds;
pub mod seed;
pub mod support;
pub mod tickets;

pub use bookings::BookingView;
pub use notifications::{LogNotifier, Notifier, SmtpNotifier};
pub use pricing::PricingConfig;
pub use tickets::TicketValidation;

/// Injectable time source; expiry checks and timestamps must be
/// deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Produces the opaque references the platform hands out. Must be
/// collision-free within the store's uniqueness constraints.
pub trait ReferenceGenerator: Send + Sync {
    fn transaction_ref(&self) -> String;
    fn ticket_code(&self) -> String;
    fn reset_token(&self) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UuidReferences;

impl ReferenceGenerator for UuidReferences {
    fn transaction_ref(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("TXN-{}", &hex[..12])
    }

    fn ticket_code(&self) -> String {
        let hex = Uuid::new_v4().simple().to_string().to_uppercase();
        format!("TKT-{}", &hex[..16])
    }

    fn reset_token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(43)
            .map(char::from)
            .collect()
    }
}

#[derive(Clone)]
pub struct TicketingService {
    pub(crate) store: Arc<dyn Store>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) refs: Arc<dyn ReferenceGenerator>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) pricing: PricingConfig,
    pub(crate) app_name: String,
}

impl TicketingService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        refs: Arc<dyn ReferenceGenerator>,
        notifier: Arc<dyn Notifier>,
        pricing: PricingConfig,
        app_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            clock,
            refs,
            notifier,
            pricing,
            app_name: app_name.into(),
        }
    }

    pub(crate) async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        self.store.begin().await
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

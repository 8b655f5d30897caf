//! Demo data for an empty store: one user per role, two offers and a
//! published event with a 4×10 seat grid.

use chrono::Duration;
use rust_decimal::Decimal;

use crate::models::{EventStatus, OfferType, UserRole};
use crate::store::{NewEvent, NewOffer, NewSeat, NewUser};
use crate::utils::error::{AppError, AppResult};

use super::{identity, TicketingService};

impl TicketingService {
    pub async fn seed_initial_data(&self) -> AppResult<()> {
        let mut tx = self.begin().await?;
        if tx.count_users().await? > 0 {
            return Ok(());
        }

        let demo_users = [
            ("Admin One", "admin@ticket.local", "admin123", UserRole::PlatformAdmin),
            ("Organizer One", "organizer@ticket.local", "organizer123", UserRole::EventOrganizer),
            ("Customer One", "customer@ticket.local", "customer123", UserRole::Customer),
            ("Entry Manager One", "entry@ticket.local", "entry123", UserRole::EntryManager),
            ("Support One", "support@ticket.local", "support123", UserRole::SupportExecutive),
        ];
        let mut organizer_id = None;
        for (name, email, password, role) in demo_users {
            let user = tx
                .insert_user(NewUser {
                    name: name.into(),
                    email: email.into(),
                    password_hash: identity::hash_password(password)?,
                    role,
                    is_active: true,
                })
                .await?;
            if role == UserRole::EventOrganizer {
                organizer_id = Some(user.id);
            }
        }
        let organizer_id = organizer_id
            .ok_or_else(|| AppError::Internal("demo data is missing an organizer".into()))?;

        tx.insert_offer(NewOffer {
            code: "WELCOME10".into(),
            offer_type: OfferType::Percentage,
            value: Decimal::from(10),
            active: true,
            usage_limit: Some(100),
            valid_until: None,
        })
        .await?;
        tx.insert_offer(NewOffer {
            code: "FLAT5".into(),
            offer_type: OfferType::Fixed,
            value: Decimal::from(5),
            active: true,
            usage_limit: None,
            valid_until: None,
        })
        .await?;

        let now = self.now();
        let event = tx
            .insert_event(NewEvent {
                organizer_id,
                title: "Indie Music Night".into(),
                description: "A live showcase with three local indie bands.".into(),
                venue: "City Hall Stage".into(),
                start_time: now + Duration::days(5),
                end_time: now + Duration::days(5) + Duration::hours(4),
                base_price: Decimal::new(3500, 2),
                status: EventStatus::Published,
                created_at: now,
            })
            .await?;

        let mut seats = Vec::with_capacity(40);
        for row_label in ["A", "B", "C", "D"] {
            for seat_number in 1..=10 {
                seats.push(NewSeat {
                    event_id: event.id,
                    row_label: row_label.into(),
                    seat_number,
                    price_override: None,
                });
            }
        }
        tx.insert_seats(seats).await?;

        tx.commit().await?;
        tracing::info!("Seeded demo users, offers and one published event");
        Ok(())
    }
}

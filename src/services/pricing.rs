//! Pricing engine.
//!
//! `quote` is a pure function of the seat prices, the (already validated)
//! offer and the configured tax rate. All amounts are rounded to two
//! decimal places with banker's rounding and are never negative: the
//! discount is clamped at the subtotal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::{Offer, OfferType};
use crate::utils::error::{AppError, AppResult};

use super::TicketingService;

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub tax_rate: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    /// Canonical (stored) code of the applied offer, if any.
    pub offer_code: Option<String>,
}

/// Reject offers that are inactive, expired or out of redemptions.
/// Lookup misses produce the same message as inactive codes, so the
/// response does not leak which codes exist.
pub(crate) fn check_offer_usable(offer: &Offer, now: DateTime<Utc>) -> AppResult<()> {
    if !offer.active {
        return Err(AppError::Validation("Invalid or inactive offer code".into()));
    }
    if offer.valid_until.is_some_and(|valid_until| valid_until < now) {
        return Err(AppError::Validation("Offer has expired".into()));
    }
    if offer.usage_exhausted() {
        return Err(AppError::Validation("Offer usage limit reached".into()));
    }
    Ok(())
}

pub fn quote(seat_prices: &[Decimal], offer: Option<&Offer>, tax_rate: Decimal) -> Quote {
    let subtotal = seat_prices
        .iter()
        .copied()
        .sum::<Decimal>()
        .round_dp(2);

    let mut discount_amount = match offer {
        Some(offer) => match offer.offer_type {
            OfferType::Percentage => (subtotal * offer.value / Decimal::ONE_HUNDRED).round_dp(2),
            OfferType::Fixed => offer.value.round_dp(2),
        },
        None => Decimal::ZERO,
    };
    if discount_amount > subtotal {
        discount_amount = subtotal;
    }

    let taxable = subtotal - discount_amount;
    let tax_amount = (taxable * tax_rate).round_dp(2);

    Quote {
        subtotal,
        discount_amount,
        tax_amount,
        total_amount: taxable + tax_amount,
        offer_code: offer.map(|o| o.code.clone()),
    }
}

impl TicketingService {
    pub async fn list_offers(&self) -> AppResult<Vec<Offer>> {
        let mut tx = self.begin().await?;
        tx.list_offers().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn offer(offer_type: OfferType, value: Decimal) -> Offer {
        Offer {
            id: Uuid::new_v4(),
            code: "TEST".into(),
            offer_type,
            value,
            active: true,
            usage_limit: None,
            used_count: 0,
            valid_until: None,
        }
    }

    fn money(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    #[test]
    fn ten_percent_off_two_seats_at_eight_percent_tax() {
        let prices = [money(3500), money(3500)];
        let offer = offer(OfferType::Percentage, Decimal::from(10));
        let quote = quote(&prices, Some(&offer), Decimal::new(8, 2));

        assert_eq!(quote.subtotal, money(7000));
        assert_eq!(quote.discount_amount, money(700));
        assert_eq!(quote.tax_amount, money(504));
        assert_eq!(quote.total_amount, money(6804));
        assert_eq!(quote.offer_code.as_deref(), Some("TEST"));
    }

    #[test]
    fn fixed_offer_discounts_its_face_value() {
        let prices = [money(3500)];
        let offer = offer(OfferType::Fixed, Decimal::from(5));
        let quote = quote(&prices, Some(&offer), Decimal::new(8, 2));

        assert_eq!(quote.discount_amount, money(500));
        assert_eq!(quote.tax_amount, money(240));
        assert_eq!(quote.total_amount, money(3240));
    }

    #[test]
    fn discount_is_clamped_at_the_subtotal() {
        let prices = [money(1000)];
        let offer = offer(OfferType::Fixed, Decimal::from(50));
        let quote = quote(&prices, Some(&offer), Decimal::new(8, 2));

        assert_eq!(quote.discount_amount, money(1000));
        assert_eq!(quote.tax_amount, Decimal::ZERO);
        assert_eq!(quote.total_amount, Decimal::ZERO);
    }

    #[test]
    fn no_offer_means_no_discount() {
        let prices = [money(3500), money(4200)];
        let quote = quote(&prices, None, Decimal::new(8, 2));

        assert_eq!(quote.subtotal, money(7700));
        assert_eq!(quote.discount_amount, Decimal::ZERO);
        assert_eq!(quote.offer_code, None);
    }

    #[test]
    fn totals_respect_the_arithmetic_invariant() {
        for (prices, offer_value) in [
            (vec![money(3500), money(3500)], Decimal::from(10)),
            (vec![money(1999), money(2350), money(105)], Decimal::from(33)),
        ] {
            let offer = offer(OfferType::Percentage, offer_value);
            let quote = quote(&prices, Some(&offer), Decimal::new(8, 2));
            assert_eq!(
                quote.total_amount,
                (quote.subtotal - quote.discount_amount) + quote.tax_amount
            );
            assert!(quote.discount_amount >= Decimal::ZERO);
            assert!(quote.total_amount >= Decimal::ZERO);
        }
    }

    #[test]
    fn tax_rate_is_injected_not_ambient() {
        let prices = [money(10000)];
        let zero = quote(&prices, None, Decimal::ZERO);
        let high = quote(&prices, None, Decimal::new(25, 2));

        assert_eq!(zero.tax_amount, Decimal::ZERO);
        assert_eq!(high.tax_amount, money(2500));
    }

    #[test]
    fn expired_and_exhausted_offers_are_rejected() {
        let now = Utc::now();
        let mut expired = offer(OfferType::Fixed, Decimal::from(5));
        expired.valid_until = Some(now - chrono::Duration::hours(1));
        assert!(matches!(
            check_offer_usable(&expired, now),
            Err(AppError::Validation(_))
        ));

        let mut exhausted = offer(OfferType::Fixed, Decimal::from(5));
        exhausted.usage_limit = Some(1);
        exhausted.used_count = 1;
        assert!(matches!(
            check_offer_usable(&exhausted, now),
            Err(AppError::Validation(_))
        ));

        let mut inactive = offer(OfferType::Fixed, Decimal::from(5));
        inactive.active = false;
        assert!(matches!(
            check_offer_usable(&inactive, now),
            Err(AppError::Validation(_))
        ));
    }
}

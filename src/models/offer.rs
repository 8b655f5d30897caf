use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    Percentage,
    Fixed,
}

impl OfferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Percentage => "percentage",
            OfferType::Fixed => "fixed",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(OfferType::Percentage),
            "fixed" => Ok(OfferType::Fixed),
            other => Err(format!("unknown offer type '{other}'")),
        }
    }
}

/// A discount code. Codes are stored uppercase and matched
/// case-insensitively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub code: String,
    pub offer_type: OfferType,
    pub value: Decimal,
    pub active: bool,
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub valid_until: Option<DateTime<Utc>>,
}

impl Offer {
    pub fn usage_exhausted(&self) -> bool {
        self.usage_limit
            .is_some_and(|limit| self.used_count >= limit)
    }
}

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_TAX_RATE: &str = "0.08";

/// SMTP settings; absent when the platform runs with simulated email.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_email: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    pub database_url: String,
    pub port: u16,
    pub currency: String,
    /// Process-wide tax rate, injected into the pricing engine.
    pub tax_rate: Decimal,
    pub cors_allowed_origins: Vec<String>,
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        let tax_rate = env::var("TAX_RATE").unwrap_or_else(|_| DEFAULT_TAX_RATE.to_string());
        let tax_rate = Decimal::from_str(&tax_rate).unwrap_or_else(|_| {
            tracing::warn!("TAX_RATE '{}' is not a decimal, using {}", tax_rate, DEFAULT_TAX_RATE);
            Decimal::new(8, 2)
        });

        let smtp = env::var("SMTP_HOST").ok().map(|host| SmtpConfig {
            host,
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(587),
            username: env::var("SMTP_USERNAME").ok(),
            password: env::var("SMTP_PASSWORD").ok(),
            from_email: env::var("SMTP_FROM_EMAIL")
                .unwrap_or_else(|_| "noreply@ticket.local".to_string()),
        });

        Self {
            app_name: env::var("APP_NAME")
                .unwrap_or_else(|_| "Online Event Ticket Booking Platform".to_string()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/tessera".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "USD".to_string()),
            tax_rate,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            smtp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tax_rate_is_eight_percent() {
        std::env::remove_var("TAX_RATE");
        let config = Config::from_env();
        assert_eq!(config.tax_rate, Decimal::new(8, 2));
    }
}

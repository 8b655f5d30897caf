//! Outbound notifications.
//!
//! The platform never depends on delivery for its own state transitions;
//! when SMTP is not configured the [`LogNotifier`] keeps everything
//! operational in simulation mode and callers are told so via the
//! receipt.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use uuid::Uuid;

use crate::config::SmtpConfig;
use crate::models::UserRole;
use crate::utils::error::{AppError, AppResult};

use super::{identity, TicketingService};

#[derive(Debug, Clone, Serialize)]
pub struct NotificationReceipt {
    pub sent: bool,
    pub mode: String,
    pub to_email: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fire-and-forget email. The receipt echoes the payload so callers
    /// in simulation mode can display it.
    async fn notify(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationReceipt>;
}

/// Simulation mode: log the message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationReceipt> {
        tracing::info!(to_email, subject, "Email delivery simulated");
        Ok(NotificationReceipt {
            sent: false,
            mode: "simulation".into(),
            to_email: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
}

impl SmtpNotifier {
    pub fn from_config(config: &SmtpConfig) -> AppResult<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AppError::Email(format!("SMTP relay error: {e}")))?
            .port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        Ok(Self {
            transport: builder.build(),
            from_email: config.from_email.clone(),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(
        &self,
        to_email: &str,
        subject: &str,
        body: &str,
    ) -> AppResult<NotificationReceipt> {
        let from: Mailbox = self
            .from_email
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid sender address: {e}")))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid recipient address: {e}")))?;
        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AppError::Email(format!("Failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(format!("Email send failed: {e}")))?;

        Ok(NotificationReceipt {
            sent: true,
            mode: "smtp".into(),
            to_email: to_email.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        })
    }
}

impl TicketingService {
    /// Compose and send the event-details email for a customer.
    pub async fn send_event_detail_email(
        &self,
        customer_id: Uuid,
        event_id: Uuid,
    ) -> AppResult<NotificationReceipt> {
        let mut tx = self.begin().await?;

        let customer = identity::get_active_user(tx.as_mut(), customer_id).await?;
        if customer.role != UserRole::Customer {
            return Err(AppError::Validation("Target user must be a customer".into()));
        }
        let event = tx
            .event_by_id(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".into()))?;
        let available_seats = tx.available_seat_count(event.id).await?;
        drop(tx);

        let subject = format!("Event Details: {}", event.title);
        let body = format!(
            "Hi {},\n\n\
             Here are the event details:\n\
             - Event: {}\n\
             - Description: {}\n\
             - Venue: {}\n\
             - Start: {}\n\
             - End: {}\n\
             - Base Price: {} {}\n\
             - Status: {}\n\
             - Seats Available: {}\n\n\
             Thanks,\n{}",
            customer.name,
            event.title,
            event.description,
            event.venue,
            event.start_time.format("%Y-%m-%d %H:%M"),
            event.end_time.format("%Y-%m-%d %H:%M"),
            event.base_price.round_dp(2),
            self.pricing.currency,
            event.status,
            available_seats,
            self.app_name,
        );

        self.notifier.notify(&customer.email, &subject, &body).await
    }
}

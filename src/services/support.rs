//! Customer complaints handled by support executives.

use uuid::Uuid;

use crate::models::{SupportStatus, SupportTicket, UserRole};
use crate::store::NewSupportTicket;
use crate::utils::error::{AppError, AppResult};

use super::{identity, TicketingService};

impl TicketingService {
    pub async fn create_complaint(
        &self,
        customer_id: Uuid,
        booking_id: Option<Uuid>,
        event_id: Option<Uuid>,
        subject: &str,
        description: &str,
    ) -> AppResult<SupportTicket> {
        let subject = subject.trim();
        if subject.is_empty() {
            return Err(AppError::Validation("Complaint subject is required".into()));
        }

        let mut tx = self.begin().await?;
        identity::require_role(tx.as_mut(), customer_id, UserRole::Customer).await?;

        if let Some(booking_id) = booking_id {
            let owned = tx
                .booking_by_id(booking_id)
                .await?
                .is_some_and(|b| b.customer_id == customer_id);
            if !owned {
                return Err(AppError::Validation("Invalid booking for complaint".into()));
            }
        }
        if let Some(event_id) = event_id {
            if tx.event_by_id(event_id).await?.is_none() {
                return Err(AppError::Validation("Invalid event for complaint".into()));
            }
        }

        let complaint = tx
            .insert_support_ticket(NewSupportTicket {
                customer_id,
                booking_id,
                event_id,
                subject: subject.to_string(),
                description: description.trim().to_string(),
                created_at: self.now(),
            })
            .await?;
        tx.commit().await?;
        Ok(complaint)
    }

    pub async fn update_complaint(
        &self,
        complaint_id: Uuid,
        support_executive_id: Uuid,
        new_status: SupportStatus,
        resolution: Option<String>,
    ) -> AppResult<SupportTicket> {
        let mut tx = self.begin().await?;
        identity::require_role(tx.as_mut(), support_executive_id, UserRole::SupportExecutive)
            .await?;

        if tx.support_ticket_by_id(complaint_id).await?.is_none() {
            return Err(AppError::NotFound("Complaint not found".into()));
        }

        let complaint = tx
            .update_support_ticket(
                complaint_id,
                new_status,
                support_executive_id,
                resolution.filter(|r| !r.trim().is_empty()),
                self.now(),
            )
            .await?;
        tx.commit().await?;
        Ok(complaint)
    }

    pub async fn list_complaints(&self) -> AppResult<Vec<SupportTicket>> {
        let mut tx = self.begin().await?;
        tx.list_support_tickets().await
    }
}

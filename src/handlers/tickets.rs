use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::TicketStatus;
use crate::utils::error::AppResult;
use crate::utils::response::success;

use super::AppState;

#[derive(Deserialize)]
pub struct TicketValidationRequest {
    pub qr_code: String,
    pub entry_manager_id: Uuid,
}

#[derive(Serialize)]
pub struct TicketValidationOut {
    pub valid: bool,
    pub message: String,
    pub ticket_status: Option<TicketStatus>,
}

pub async fn validate_ticket(
    State(state): State<AppState>,
    Json(payload): Json<TicketValidationRequest>,
) -> AppResult<Response> {
    let outcome = state
        .service
        .validate_ticket(&payload.qr_code, payload.entry_manager_id)
        .await?;
    let out = TicketValidationOut {
        valid: outcome.valid,
        message: outcome.message.clone(),
        ticket_status: outcome.ticket.map(|t| t.status),
    };
    Ok(success(out, outcome.message))
}

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::SupportStatus;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

use super::AppState;

#[derive(Deserialize)]
pub struct ComplaintCreateRequest {
    pub customer_id: Uuid,
    #[serde(default)]
    pub booking_id: Option<Uuid>,
    #[serde(default)]
    pub event_id: Option<Uuid>,
    pub subject: String,
    pub description: String,
}

pub async fn create_complaint(
    State(state): State<AppState>,
    Json(payload): Json<ComplaintCreateRequest>,
) -> AppResult<Response> {
    let complaint = state
        .service
        .create_complaint(
            payload.customer_id,
            payload.booking_id,
            payload.event_id,
            &payload.subject,
            &payload.description,
        )
        .await?;
    Ok(created(complaint, "Complaint filed"))
}

#[derive(Deserialize)]
pub struct ComplaintUpdateRequest {
    pub support_executive_id: Uuid,
    pub status: SupportStatus,
    #[serde(default)]
    pub resolution: Option<String>,
}

pub async fn update_complaint(
    State(state): State<AppState>,
    Path(complaint_id): Path<Uuid>,
    Json(payload): Json<ComplaintUpdateRequest>,
) -> AppResult<Response> {
    let complaint = state
        .service
        .update_complaint(
            complaint_id,
            payload.support_executive_id,
            payload.status,
            payload.resolution,
        )
        .await?;
    Ok(success(complaint, "Complaint updated"))
}

pub async fn list_complaints(State(state): State<AppState>) -> AppResult<Response> {
    let complaints = state.service.list_complaints().await?;
    Ok(success(complaints, "Complaints listed"))
}

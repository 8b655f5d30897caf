use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

use super::AppState;

#[derive(Deserialize)]
pub struct BookingCreateRequest {
    pub customer_id: Uuid,
    pub event_id: Uuid,
    pub seat_ids: Vec<Uuid>,
    #[serde(default)]
    pub offer_code: Option<String>,
}

pub async fn create_booking(
    State(state): State<AppState>,
    Json(payload): Json<BookingCreateRequest>,
) -> AppResult<Response> {
    let booking = state
        .service
        .create_booking(
            payload.customer_id,
            payload.event_id,
            &payload.seat_ids,
            payload.offer_code.as_deref(),
        )
        .await?;
    Ok(created(booking, "Booking created"))
}

#[derive(Deserialize)]
pub struct PaymentCaptureRequest {
    pub customer_id: Uuid,
    pub method: String,
    pub mark_success: bool,
}

pub async fn capture_payment(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PaymentCaptureRequest>,
) -> AppResult<Response> {
    let booking = state
        .service
        .capture_payment(
            booking_id,
            payload.customer_id,
            &payload.method,
            payload.mark_success,
        )
        .await?;
    Ok(success(booking, "Payment processed"))
}

pub async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Response> {
    let booking = state.service.get_booking(booking_id).await?;
    Ok(success(booking, "Booking found"))
}

pub async fn customer_history(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Response> {
    let bookings = state.service.customer_booking_history(customer_id).await?;
    Ok(success(bookings, "Booking history listed"))
}

#[derive(Deserialize)]
pub struct RefundRequestCreate {
    pub customer_id: Uuid,
    pub reason: String,
}

pub async fn refund_request(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RefundRequestCreate>,
) -> AppResult<Response> {
    let refund = state
        .service
        .request_refund(booking_id, payload.customer_id, &payload.reason)
        .await?;
    Ok(created(refund, "Refund requested"))
}

#[derive(Deserialize)]
pub struct RefundDecisionRequest {
    pub support_executive_id: Uuid,
    pub approve: bool,
}

pub async fn refund_decision(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<RefundDecisionRequest>,
) -> AppResult<Response> {
    let refund = state
        .service
        .decide_refund(booking_id, payload.support_executive_id, payload.approve)
        .await?;
    Ok(success(refund, "Refund decision recorded"))
}

pub async fn ticket_download(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<String> {
    state.service.ticket_download_text(booking_id).await
}

pub async fn confirmation_email(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<String> {
    state.service.confirmation_email_text(booking_id).await
}

pub async fn analytics(State(state): State<AppState>) -> AppResult<Response> {
    let summary = state.service.sales_analytics().await?;
    Ok(success(summary, "Sales analytics computed"))
}

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::EventStatus;
use crate::services::events::CreateEvent;
use crate::utils::error::AppResult;
use crate::utils::response::{created, success};

use super::AppState;

pub async fn list_events(State(state): State<AppState>) -> AppResult<Response> {
    let events = state.service.list_events().await?;
    Ok(success(events, "Events listed"))
}

#[derive(Deserialize)]
pub struct EventCreateRequest {
    pub organizer_id: Uuid,
    pub title: String,
    pub description: String,
    pub venue: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub base_price: Decimal,
    pub row_count: u32,
    pub seats_per_row: u32,
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(payload): Json<EventCreateRequest>,
) -> AppResult<Response> {
    let event = state
        .service
        .create_event(CreateEvent {
            organizer_id: payload.organizer_id,
            title: payload.title,
            description: payload.description,
            venue: payload.venue,
            start_time: payload.start_time,
            end_time: payload.end_time,
            base_price: payload.base_price,
            row_count: payload.row_count,
            seats_per_row: payload.seats_per_row,
        })
        .await?;
    Ok(created(event, "Event created"))
}

#[derive(Deserialize)]
pub struct EventStatusUpdateRequest {
    pub status: EventStatus,
}

pub async fn update_event_status(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventStatusUpdateRequest>,
) -> AppResult<Response> {
    let event = state
        .service
        .update_event_status(event_id, payload.status)
        .await?;
    Ok(success(event, "Event status updated"))
}

pub async fn list_event_seats(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> AppResult<Response> {
    let seats = state.service.seat_map(event_id).await?;
    Ok(success(seats, "Seats listed"))
}

#[derive(Deserialize)]
pub struct EventDetailEmailRequest {
    pub customer_id: Uuid,
    pub event_id: Uuid,
}

pub async fn send_event_detail_email(
    State(state): State<AppState>,
    Json(payload): Json<EventDetailEmailRequest>,
) -> AppResult<Response> {
    let receipt = state
        .service
        .send_event_detail_email(payload.customer_id, payload.event_id)
        .await?;
    Ok(success(receipt, "Event details email processed"))
}

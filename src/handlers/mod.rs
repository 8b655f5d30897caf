use axum::response::Response;
use serde::Serialize;

use crate::services::TicketingService;
use crate::utils::response::success;

pub mod auth;
pub mod bookings;
pub mod complaints;
pub mod events;
pub mod offers;
pub mod tickets;

#[derive(Clone)]
pub struct AppState {
    pub service: TicketingService,
}

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "tessera-api",
    };

    success(payload, "Health check successful")
}

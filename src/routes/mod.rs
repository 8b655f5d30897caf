use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{self, AppState};
use crate::services::TicketingService;

pub fn create_routes(service: TicketingService, allowed_origins: &[String]) -> Router {
    let state = AppState { service };

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route(
            "/api/auth/forgot-password",
            post(handlers::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::reset_password),
        )
        .route("/api/users", get(handlers::auth::list_users))
        .route(
            "/api/events",
            get(handlers::events::list_events).post(handlers::events::create_event),
        )
        .route(
            "/api/events/:event_id/seats",
            get(handlers::events::list_event_seats),
        )
        .route(
            "/api/events/:event_id/status",
            patch(handlers::events::update_event_status),
        )
        .route(
            "/api/notifications/event-detail-email",
            post(handlers::events::send_event_detail_email),
        )
        .route("/api/bookings", post(handlers::bookings::create_booking))
        .route(
            "/api/bookings/:booking_id",
            get(handlers::bookings::get_booking),
        )
        .route(
            "/api/bookings/:booking_id/pay",
            post(handlers::bookings::capture_payment),
        )
        .route(
            "/api/bookings/:booking_id/refund-request",
            post(handlers::bookings::refund_request),
        )
        .route(
            "/api/bookings/:booking_id/refund-decision",
            post(handlers::bookings::refund_decision),
        )
        .route(
            "/api/bookings/:booking_id/ticket-download",
            get(handlers::bookings::ticket_download),
        )
        .route(
            "/api/bookings/:booking_id/confirmation-email",
            get(handlers::bookings::confirmation_email),
        )
        .route(
            "/api/customers/:customer_id/bookings",
            get(handlers::bookings::customer_history),
        )
        .route(
            "/api/tickets/validate",
            post(handlers::tickets::validate_ticket),
        )
        .route("/api/offers", get(handlers::offers::list_offers))
        .route("/api/analytics", get(handlers::bookings::analytics))
        .route(
            "/api/complaints",
            post(handlers::complaints::create_complaint)
                .get(handlers::complaints::list_complaints),
        )
        .route(
            "/api/complaints/:complaint_id",
            patch(handlers::complaints::update_complaint),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(allowed_origins));

    apply_security_headers(router)
}

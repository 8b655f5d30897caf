//! Identity service tests: registration, login and the password-reset
//! token lifecycle under a movable clock.

mod common;

use chrono::Duration;
use common::*;

use tessera_server::models::UserRole;
use tessera_server::utils::error::AppError;

#[tokio::test]
async fn register_and_login_roundtrip() {
    let app = test_app();

    let user = app
        .service
        .register("Ada", "  Ada@Ticket.Local ", "secret123", UserRole::Customer)
        .await
        .unwrap();
    assert_eq!(user.email, "ada@ticket.local");
    assert_eq!(user.role, UserRole::Customer);
    assert!(user.is_active);

    let logged_in = app
        .service
        .authenticate("ada@ticket.local", "secret123")
        .await
        .unwrap();
    assert_eq!(logged_in.id, user.id);

    let err = app
        .service
        .authenticate("ada@ticket.local", "wrong-password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));

    let err = app
        .service
        .authenticate("nobody@ticket.local", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
}

#[tokio::test]
async fn registration_guards() {
    let app = test_app();

    app.service
        .register("Ada", "ada@ticket.local", "secret123", UserRole::Customer)
        .await
        .unwrap();

    let err = app
        .service
        .register("Imposter", "ada@ticket.local", "secret123", UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = app
        .service
        .register("Bob", "bob@ticket.local", "short", UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .service
        .register("Eve", "eve@ticket.local", "secret123", UserRole::EntryManager)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .service
        .register("Nameless", "   ", "secret123", UserRole::Customer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn password_reset_flow() {
    let app = test_app();
    app.service
        .register("Ada", "ada@ticket.local", "secret123", UserRole::Customer)
        .await
        .unwrap();

    let outcome = app
        .service
        .request_password_reset("ada@ticket.local")
        .await
        .unwrap();
    assert_eq!(outcome.mode, "simulation");
    let token = outcome.reset_token.expect("simulation mode surfaces the token");

    app.service
        .reset_password(&token, "brand-new-pass")
        .await
        .unwrap();

    let err = app
        .service
        .authenticate("ada@ticket.local", "secret123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Auth(_)));
    app.service
        .authenticate("ada@ticket.local", "brand-new-pass")
        .await
        .unwrap();

    // Tokens are single use.
    let err = app
        .service
        .reset_password(&token, "another-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn reset_tokens_expire_and_are_consumed() {
    let app = test_app();
    app.service
        .register("Ada", "ada@ticket.local", "secret123", UserRole::Customer)
        .await
        .unwrap();

    let outcome = app
        .service
        .request_password_reset("ada@ticket.local")
        .await
        .unwrap();
    let token = outcome.reset_token.unwrap();

    app.clock.advance(Duration::minutes(31));
    let err = app
        .service
        .reset_password(&token, "brand-new-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("expired")));

    // The expired token was consumed, so a retry is a plain miss.
    let err = app
        .service
        .reset_password(&token, "brand-new-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Invalid")));
}

#[tokio::test]
async fn a_new_reset_request_supersedes_the_old_token() {
    let app = test_app();
    app.service
        .register("Ada", "ada@ticket.local", "secret123", UserRole::Customer)
        .await
        .unwrap();

    let first = app
        .service
        .request_password_reset("ada@ticket.local")
        .await
        .unwrap()
        .reset_token
        .unwrap();
    let second = app
        .service
        .request_password_reset("ada@ticket.local")
        .await
        .unwrap()
        .reset_token
        .unwrap();

    let err = app
        .service
        .reset_password(&first, "brand-new-pass")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    app.service
        .reset_password(&second, "brand-new-pass")
        .await
        .unwrap();
}

#[tokio::test]
async fn unknown_accounts_get_the_same_generic_answer() {
    let app = test_app();

    let outcome = app
        .service
        .request_password_reset("ghost@ticket.local")
        .await
        .unwrap();
    assert!(outcome.sent);
    assert_eq!(outcome.reset_token, None);
    assert!(outcome.message.contains("If the account exists"));
}

#[tokio::test]
async fn seeding_an_empty_store_is_idempotent() {
    let app = test_app();
    app.service.seed_initial_data().await.unwrap();
    app.service.seed_initial_data().await.unwrap();

    let users = app.service.list_users(None).await.unwrap();
    assert_eq!(users.len(), 5);
    app.service
        .authenticate("customer@ticket.local", "customer123")
        .await
        .unwrap();

    let events = app.service.list_events().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].total_seats, 40);
    assert_eq!(events[0].available_seats, 40);

    let offers = app.service.list_offers().await.unwrap();
    assert_eq!(offers.len(), 2);
}

#[tokio::test]
async fn event_detail_email_is_composed_for_customers_only() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, _) = create_published_event(&app.store, organizer.id, 1, 3, money(3500)).await;

    let receipt = app
        .service
        .send_event_detail_email(customer.id, event.id)
        .await
        .unwrap();
    assert_eq!(receipt.mode, "simulation");
    assert!(receipt.subject.contains(&event.title));
    assert!(receipt.body.contains("Seats Available: 3"));
    assert!(receipt.body.contains("35.00 USD"));

    let err = app
        .service
        .send_event_detail_email(organizer.id, event.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .service
        .send_event_detail_email(customer.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

//! End-to-end booking engine tests over the in-memory store.
//!
//! These cover the acceptance properties of the platform: deterministic
//! pricing arithmetic, no double booking, offer usage bounds, cascade
//! completeness on event cancellation, refund exclusivity and single-use
//! tickets.

mod common;

use chrono::Duration;
use common::*;
use rust_decimal::Decimal;

use tessera_server::services::Clock;
use tessera_server::models::{
    BookingStatus, EventStatus, OfferType, PaymentStatus, RefundStatus, TicketStatus, UserRole,
};
use tessera_server::store::{NewSeat, NewTicket, Store};
use tessera_server::utils::error::AppError;

#[tokio::test]
async fn welcome10_booking_matches_expected_amounts() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) =
        create_published_event(&app.store, organizer.id, 4, 10, money(3500)).await;
    create_offer(
        &app.store,
        "WELCOME10",
        OfferType::Percentage,
        Decimal::from(10),
        Some(100),
        None,
    )
    .await;

    // Offer codes match case-insensitively.
    let booking = app
        .service
        .create_booking(
            customer.id,
            event.id,
            &[seats[0].id, seats[1].id],
            Some("welcome10"),
        )
        .await
        .unwrap();

    assert_eq!(booking.subtotal, money(7000));
    assert_eq!(booking.discount_amount, money(700));
    assert_eq!(booking.tax_amount, money(504));
    assert_eq!(booking.total_amount, money(6804));
    assert_eq!(booking.offer_code.as_deref(), Some("WELCOME10"));
    assert_eq!(booking.status, BookingStatus::PendingPayment);
    assert_eq!(booking.payment_status, Some(PaymentStatus::Initiated));
    assert!(booking.ticket_codes.is_empty());
    assert_eq!(
        booking.total_amount,
        (booking.subtotal - booking.discount_amount) + booking.tax_amount
    );

    assert_eq!(offer_used_count(&app.store, "WELCOME10").await, 1);
    assert_eq!(available_seats(&app.store, event.id).await, 38);
}

#[tokio::test]
async fn seat_price_override_wins_over_base_price() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let mut tx = app.store.begin().await.unwrap();
    tx.insert_seats(vec![NewSeat {
        event_id: event.id,
        row_label: "Z".into(),
        seat_number: 1,
        price_override: Some(money(5000)),
    }])
    .await
    .unwrap();
    let premium = tx
        .seats_for_event(event.id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.row_label == "Z")
        .unwrap();
    tx.commit().await.unwrap();

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id, premium.id], None)
        .await
        .unwrap();

    assert_eq!(booking.subtotal, money(8500));
    assert_eq!(booking.discount_amount, Decimal::ZERO);
    assert_eq!(booking.tax_amount, money(680));
    assert_eq!(booking.total_amount, money(9180));
}

#[tokio::test]
async fn duplicate_seat_ids_collapse_to_one_seat() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 3, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id, seats[0].id], None)
        .await
        .unwrap();

    assert_eq!(booking.subtotal, money(3500));
    assert_eq!(available_seats(&app.store, event.id).await, 2);
}

#[tokio::test]
async fn taken_and_unknown_seats_conflict() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let first = create_user(&app.store, UserRole::Customer).await;
    let second = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;

    app.service
        .create_booking(first.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();

    let err = app
        .service
        .create_booking(second.id, event.id, &[seats[0].id, seats[1].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    // The losing request must not have reserved its other seat.
    assert_eq!(available_seats(&app.store, event.id).await, 3);

    let err = app
        .service
        .create_booking(second.id, event.id, &[uuid::Uuid::new_v4()], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = app
        .service
        .create_booking(second.id, event.id, &[], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_double_book() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let first = create_user(&app.store, UserRole::Customer).await;
    let second = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;

    let contested = seats[0].id;
    let (service_a, service_b) = (app.service.clone(), app.service.clone());
    let (event_a, event_b) = (event.id, event.id);

    let a = tokio::spawn(async move {
        service_a
            .create_booking(first.id, event_a, &[contested], None)
            .await
    });
    let b = tokio::spawn(async move {
        service_b
            .create_booking(second.id, event_b, &[contested], None)
            .await
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::Conflict(_)))));
    assert_eq!(available_seats(&app.store, event.id).await, 3);
}

#[tokio::test]
async fn last_reservation_flips_event_to_sold_out_and_release_reopens_it() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(
            customer.id,
            event.id,
            &[seats[0].id, seats[1].id],
            None,
        )
        .await
        .unwrap();
    assert_eq!(event_status(&app.store, event.id).await, EventStatus::SoldOut);

    // A failed capture cancels the booking, releases the seats and
    // reopens the event.
    let cancelled = app
        .service
        .capture_payment(booking.id, customer.id, "card", false)
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(cancelled.payment_status, Some(PaymentStatus::Failed));
    assert_eq!(available_seats(&app.store, event.id).await, 2);
    assert_eq!(
        event_status(&app.store, event.id).await,
        EventStatus::Published
    );
}

#[tokio::test]
async fn offer_usage_limit_is_enforced() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let first = create_user(&app.store, UserRole::Customer).await;
    let second = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;
    create_offer(
        &app.store,
        "FLAT5",
        OfferType::Fixed,
        Decimal::from(5),
        Some(1),
        None,
    )
    .await;

    let booking = app
        .service
        .create_booking(first.id, event.id, &[seats[0].id], Some("FLAT5"))
        .await
        .unwrap();
    assert_eq!(booking.discount_amount, money(500));

    let err = app
        .service
        .create_booking(second.id, event.id, &[seats[1].id], Some("FLAT5"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("usage limit")));
    assert_eq!(offer_used_count(&app.store, "FLAT5").await, 1);
    // The losing booking must not have reserved its seat either.
    assert_eq!(available_seats(&app.store, event.id).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redemption_never_exceeds_the_limit() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let first = create_user(&app.store, UserRole::Customer).await;
    let second = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;
    create_offer(
        &app.store,
        "ONCE",
        OfferType::Fixed,
        Decimal::from(5),
        Some(1),
        None,
    )
    .await;

    let (service_a, service_b) = (app.service.clone(), app.service.clone());
    let (seat_a, seat_b) = (seats[0].id, seats[1].id);
    let event_id = event.id;

    let a = tokio::spawn(async move {
        service_a
            .create_booking(first.id, event_id, &[seat_a], Some("ONCE"))
            .await
    });
    let b = tokio::spawn(async move {
        service_b
            .create_booking(second.id, event_id, &[seat_b], Some("ONCE"))
            .await
    });
    let results = [a.await.unwrap(), b.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(offer_used_count(&app.store, "ONCE").await, 1);
}

#[tokio::test]
async fn unusable_offers_are_rejected_before_any_money_moves() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 5, money(3500)).await;
    create_offer(
        &app.store,
        "EXPIRED",
        OfferType::Fixed,
        Decimal::from(5),
        None,
        Some(start_time() - Duration::hours(1)),
    )
    .await;

    let err = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], Some("EXPIRED"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("expired")));

    let err = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], Some("NOSUCH"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // A blank code means no offer at all.
    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], Some("   "))
        .await
        .unwrap();
    assert_eq!(booking.discount_amount, Decimal::ZERO);
    assert_eq!(booking.offer_code, None);

    // The two rejected attempts must not have held the seat.
    assert_eq!(available_seats(&app.store, event.id).await, 4);
}

#[tokio::test]
async fn successful_capture_confirms_and_issues_one_ticket_per_seat() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 2, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id, seats[1].id], None)
        .await
        .unwrap();
    let confirmed = app
        .service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();

    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(confirmed.payment_status, Some(PaymentStatus::Paid));
    assert_eq!(confirmed.ticket_codes.len(), 2);
    assert_ne!(confirmed.ticket_codes[0], confirmed.ticket_codes[1]);

    let mut tx = app.store.begin().await.unwrap();
    let payment = tx.payment_for_booking(booking.id).await.unwrap().unwrap();
    assert_eq!(payment.method, "card");
    assert_eq!(payment.paid_at, Some(app.clock.now()));
    assert_eq!(payment.amount, confirmed.total_amount);
}

#[tokio::test]
async fn capture_guards_owner_and_state() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let stranger = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();

    let err = app
        .service
        .capture_payment(booking.id, stranger.id, "card", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .service
        .capture_payment(uuid::Uuid::new_v4(), customer.id, "card", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    app.service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();
    let err = app
        .service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn approved_refund_unwinds_the_whole_booking() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let support = create_user(&app.store, UserRole::SupportExecutive).await;
    let entry = create_user(&app.store, UserRole::EntryManager).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id, seats[1].id], None)
        .await
        .unwrap();
    app.service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();
    assert_eq!(event_status(&app.store, event.id).await, EventStatus::SoldOut);

    let refund = app
        .service
        .request_refund(booking.id, customer.id, "Cannot attend")
        .await
        .unwrap();
    assert_eq!(refund.status, RefundStatus::Requested);
    assert_eq!(refund.refund_amount, money(7560));
    assert_eq!(
        app.service.get_booking(booking.id).await.unwrap().status,
        BookingStatus::RefundRequested
    );

    let resolved = app
        .service
        .decide_refund(booking.id, support.id, true)
        .await
        .unwrap();
    assert_eq!(resolved.status, RefundStatus::Completed);
    assert_eq!(resolved.resolved_by, Some(support.id));

    let view = app.service.get_booking(booking.id).await.unwrap();
    assert_eq!(view.status, BookingStatus::Refunded);
    assert_eq!(view.payment_status, Some(PaymentStatus::Refunded));
    assert_eq!(view.refund_status, Some(RefundStatus::Completed));
    assert_eq!(available_seats(&app.store, event.id).await, 2);
    assert_eq!(
        event_status(&app.store, event.id).await,
        EventStatus::Published
    );

    let mut tx = app.store.begin().await.unwrap();
    let tickets = tx.tickets_for_booking(booking.id).await.unwrap();
    assert!(tickets
        .iter()
        .all(|t| t.status == TicketStatus::Invalidated));
    drop(tx);

    // Invalidated tickets no longer pass the entry gate.
    let outcome = app
        .service
        .validate_ticket(&view.ticket_codes[0], entry.id)
        .await
        .unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.message, "Ticket is not valid for entry");
}

#[tokio::test]
async fn rejected_refund_reverts_and_blocks_a_second_request() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let support = create_user(&app.store, UserRole::SupportExecutive).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();
    app.service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();
    app.service
        .request_refund(booking.id, customer.id, "Changed my mind")
        .await
        .unwrap();

    let resolved = app
        .service
        .decide_refund(booking.id, support.id, false)
        .await
        .unwrap();
    assert_eq!(resolved.status, RefundStatus::Rejected);
    assert_eq!(
        app.service.get_booking(booking.id).await.unwrap().status,
        BookingStatus::Confirmed
    );
    // The seats stay with the booking after a rejection.
    assert_eq!(available_seats(&app.store, event.id).await, 1);

    let err = app
        .service
        .request_refund(booking.id, customer.id, "Second try")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = app
        .service
        .decide_refund(booking.id, support.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
}

#[tokio::test]
async fn refund_guards() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let stranger = create_user(&app.store, UserRole::Customer).await;
    let support = create_user(&app.store, UserRole::SupportExecutive).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();

    // Pending bookings cannot be refunded.
    let err = app
        .service
        .request_refund(booking.id, customer.id, "Too early")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    app.service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();

    let err = app
        .service
        .request_refund(booking.id, stranger.id, "Not mine")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // No refund exists yet, so a decision has nothing to act on.
    let err = app
        .service
        .decide_refund(booking.id, support.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Only support executives decide.
    app.service
        .request_refund(booking.id, customer.id, "Cannot attend")
        .await
        .unwrap();
    let err = app
        .service
        .decide_refund(booking.id, customer.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn cancelling_an_event_cascades_over_every_active_booking() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let first = create_user(&app.store, UserRole::Customer).await;
    let second = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;

    // One booking left pending, one confirmed with issued tickets.
    let pending = app
        .service
        .create_booking(first.id, event.id, &[seats[0].id, seats[1].id], None)
        .await
        .unwrap();
    let confirmed = app
        .service
        .create_booking(second.id, event.id, &[seats[2].id], None)
        .await
        .unwrap();
    app.service
        .capture_payment(confirmed.id, second.id, "card", true)
        .await
        .unwrap();

    let cancelled = app
        .service
        .update_event_status(event.id, EventStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, EventStatus::Cancelled);

    for booking_id in [pending.id, confirmed.id] {
        let view = app.service.get_booking(booking_id).await.unwrap();
        assert_eq!(view.status, BookingStatus::Refunded);
        assert_eq!(view.payment_status, Some(PaymentStatus::Refunded));
    }
    assert_eq!(available_seats(&app.store, event.id).await, 4);

    let mut tx = app.store.begin().await.unwrap();
    let tickets = tx.tickets_for_booking(confirmed.id).await.unwrap();
    assert!(!tickets.is_empty());
    assert!(tickets
        .iter()
        .all(|t| t.status == TicketStatus::Invalidated));
    drop(tx);

    // Re-cancelling is a no-op; leaving the terminal state is not.
    app.service
        .update_event_status(event.id, EventStatus::Cancelled)
        .await
        .unwrap();
    let err = app
        .service
        .update_event_status(event.id, EventStatus::Published)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));

    // And nobody can book a cancelled event.
    let err = app
        .service
        .create_booking(first.id, event.id, &[seats[3].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn bookings_require_a_bookable_future_event_and_a_customer() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let inactive = create_inactive_user(&app.store, UserRole::Customer).await;
    let (draft, draft_seats) = create_event_with_status(
        &app.store,
        organizer.id,
        1,
        2,
        money(3500),
        EventStatus::Draft,
    )
    .await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let err = app
        .service
        .create_booking(organizer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .service
        .create_booking(inactive.id, event.id, &[seats[0].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .service
        .create_booking(customer.id, uuid::Uuid::new_v4(), &[seats[0].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .service
        .create_booking(customer.id, draft.id, &[draft_seats[0].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Move past the start time: the event is no longer bookable.
    app.clock.advance(Duration::days(6));
    let err = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("past")));
}

#[tokio::test]
async fn ticket_validation_is_a_strict_ordered_gate() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let entry = create_user(&app.store, UserRole::EntryManager).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 4, money(3500)).await;

    // Unknown code.
    let outcome = app
        .service
        .validate_ticket("TKT-DOESNOTEXIST", entry.id)
        .await
        .unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.message, "Ticket not found");

    // Only entry managers may validate.
    let err = app
        .service
        .validate_ticket("TKT-DOESNOTEXIST", customer.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    // An issued ticket whose booking never got confirmed is rejected at
    // the booking gate.
    let pending = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();
    let mut tx = app.store.begin().await.unwrap();
    let booking_seat = tx.booking_seats_for_booking(pending.id).await.unwrap()[0].clone();
    tx.insert_tickets(vec![NewTicket {
        booking_seat_id: booking_seat.id,
        qr_code: "TKT-MANUALPENDING".into(),
    }])
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let outcome = app
        .service
        .validate_ticket("TKT-MANUALPENDING", entry.id)
        .await
        .unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.message, "Booking is not active");
}

#[tokio::test]
async fn tickets_are_single_use() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let entry = create_user(&app.store, UserRole::EntryManager).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();
    let confirmed = app
        .service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();
    let code = &confirmed.ticket_codes[0];

    let first = app.service.validate_ticket(code, entry.id).await.unwrap();
    assert!(first.valid);
    assert_eq!(first.message, "Ticket validated");
    let ticket = first.ticket.unwrap();
    assert_eq!(ticket.status, TicketStatus::Used);
    assert_eq!(ticket.entry_manager_id, Some(entry.id));
    assert_eq!(ticket.validated_at, Some(app.clock.now()));

    let second = app.service.validate_ticket(code, entry.id).await.unwrap();
    assert!(!second.valid);
    assert_eq!(second.message, "Ticket already used");
}

#[tokio::test]
async fn cancelled_event_rejects_still_issued_tickets() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let entry = create_user(&app.store, UserRole::EntryManager).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 2, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();
    let confirmed = app
        .service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();

    // Flip the event status behind the cascade's back; the ticket is
    // still issued, so the event gate has to catch it.
    let mut tx = app.store.begin().await.unwrap();
    tx.set_event_status(event.id, EventStatus::Cancelled)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let outcome = app
        .service
        .validate_ticket(&confirmed.ticket_codes[0], entry.id)
        .await
        .unwrap();
    assert!(!outcome.valid);
    assert_eq!(outcome.message, "Event is cancelled");
}

#[tokio::test]
async fn analytics_counts_and_gross_sales() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let support = create_user(&app.store, UserRole::SupportExecutive).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 2, 3, money(3500)).await;

    // Confirmed: 2 seats, 70.00 + 5.60 tax = 75.60.
    let confirmed = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id, seats[1].id], None)
        .await
        .unwrap();
    app.service
        .capture_payment(confirmed.id, customer.id, "card", true)
        .await
        .unwrap();

    // Pending: not counted as sales.
    app.service
        .create_booking(customer.id, event.id, &[seats[2].id], None)
        .await
        .unwrap();

    // Refunded: drops out of gross sales.
    let refunded = app
        .service
        .create_booking(customer.id, event.id, &[seats[3].id], None)
        .await
        .unwrap();
    app.service
        .capture_payment(refunded.id, customer.id, "card", true)
        .await
        .unwrap();
    app.service
        .request_refund(refunded.id, customer.id, "Cannot attend")
        .await
        .unwrap();
    app.service
        .decide_refund(refunded.id, support.id, true)
        .await
        .unwrap();

    let analytics = app.service.sales_analytics().await.unwrap();
    assert_eq!(analytics.total_bookings, 3);
    assert_eq!(analytics.confirmed_bookings, 1);
    assert_eq!(analytics.refunded_bookings, 1);
    assert_eq!(analytics.gross_sales, money(7560));
}

#[tokio::test]
async fn booking_views_and_documents_reflect_the_booking() {
    let app = test_app();
    let organizer = create_user(&app.store, UserRole::EventOrganizer).await;
    let customer = create_user(&app.store, UserRole::Customer).await;
    let (event, seats) = create_published_event(&app.store, organizer.id, 1, 3, money(3500)).await;

    let booking = app
        .service
        .create_booking(customer.id, event.id, &[seats[0].id], None)
        .await
        .unwrap();
    let confirmed = app
        .service
        .capture_payment(booking.id, customer.id, "card", true)
        .await
        .unwrap();

    let history = app
        .service
        .customer_booking_history(customer.id)
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, booking.id);

    let sheet = app.service.ticket_download_text(booking.id).await.unwrap();
    assert!(sheet.contains(&confirmed.ticket_codes[0]));
    assert!(sheet.contains(&booking.id.to_string()));

    let email = app
        .service
        .confirmation_email_text(booking.id)
        .await
        .unwrap();
    assert!(email.contains("confirmed"));
    assert!(email.contains("37.80"));

    let err = app
        .service
        .get_booking(uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

mod common;

use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use rideshare_backend::entities::booking::BookingStatus;
use rideshare_backend::entities::driver_subscription::{self, SubscriptionStatus};
use rideshare_backend::entities::mobile_money_payment::{PaymentStatus, PaymentType, Provider};
use rideshare_backend::entities::transaction::{self, TransactionStatus};
use rideshare_backend::error::AppError;
use rideshare_backend::services::capability::{Access, Identity};
use rideshare_backend::services::payments::{self, PaymentRequest};
use rideshare_backend::services::{ledger, rides, subscriptions};

use common::*;

fn identity(user_id: Uuid, access: Access) -> Identity {
    Identity {
        user_id,
        email: format!("{}@example.com", user_id.simple()),
        access,
        is_admin: false,
    }
}

fn booking_payment(booking_id: Uuid) -> PaymentRequest {
    PaymentRequest {
        payment_type: PaymentType::Booking,
        reference_id: Some(booking_id),
        provider: Provider::Mtn,
        phone_number: "0772 123 456".to_string(),
    }
}

fn subscription_payment() -> PaymentRequest {
    PaymentRequest {
        payment_type: PaymentType::Subscription,
        reference_id: None,
        provider: Provider::Airtel,
        phone_number: "+256 752 123456".to_string(),
    }
}

async fn paid_subscription(db: &DatabaseConnection, driver: Uuid) -> Uuid {
    let payment = payments::initiate(db, &identity(driver, Access::Driver), subscription_payment())
        .await
        .unwrap();
    payments::settle(db, payment.id).await.unwrap();
    payment.id
}

#[tokio::test]
async fn test_booking_payment_confirms_booking() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    let ride = create_ride(&db, driver, 4).await;
    let booking = ledger::reserve(&db, ride.id, passenger, 2).await.unwrap();

    let payment = payments::initiate(
        &db,
        &identity(passenger, Access::Passenger),
        booking_payment(booking.id),
    )
    .await
    .unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
    assert_eq!(payment.amount, 8_000);
    assert_eq!(payment.phone_number, "0772123456");
    assert!(payment.transaction_ref.is_none());

    let settled = payments::settle(&db, payment.id).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);
    let reference = settled.transaction_ref.clone().expect("transaction ref");
    assert!(reference.starts_with("SIM-"));

    assert_eq!(reload_booking(&db, booking.id).await.status, BookingStatus::Confirmed);
    let tx = transaction::Entity::find()
        .filter(transaction::Column::BookingId.eq(booking.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Paid);

    // Settling again changes nothing
    let again = payments::settle(&db, payment.id).await.unwrap();
    assert_eq!(again.status, PaymentStatus::Completed);
    assert_eq!(again.transaction_ref, Some(reference));
    assert_ledger_balanced(&db, ride.id).await;
}

#[tokio::test]
async fn test_payment_for_cancelled_booking_is_marked_for_refund() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    let ride = create_ride(&db, driver, 4).await;
    let booking = ledger::reserve(&db, ride.id, passenger, 1).await.unwrap();

    let payment = payments::initiate(
        &db,
        &identity(passenger, Access::Passenger),
        booking_payment(booking.id),
    )
    .await
    .unwrap();
    ledger::release(&db, booking.id).await.unwrap();

    let settled = payments::settle(&db, payment.id).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::RefundDue);
    assert!(settled.transaction_ref.is_some());

    assert_eq!(reload_booking(&db, booking.id).await.status, BookingStatus::Cancelled);
    let tx = transaction::Entity::find()
        .filter(transaction::Column::BookingId.eq(booking.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Cancelled);
    assert_ledger_balanced(&db, ride.id).await;

    let due = payments::refunds_due(&db).await.unwrap();
    assert_eq!(due.iter().map(|p| p.id).collect::<Vec<_>>(), vec![payment.id]);

    // A repeated callback leaves the refund marker alone
    let again = payments::settle(&db, payment.id).await.unwrap();
    assert_eq!(again.status, PaymentStatus::RefundDue);
}

#[tokio::test]
async fn test_payment_after_driver_confirmation_marks_fare_paid() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    create_subscription(&db, driver, Duration::days(3)).await;
    let ride = create_ride(&db, driver, 4).await;
    let booking = ledger::reserve(&db, ride.id, passenger, 1).await.unwrap();

    let payment = payments::initiate(
        &db,
        &identity(passenger, Access::Passenger),
        booking_payment(booking.id),
    )
    .await
    .unwrap();
    ledger::confirm_booking(&db, driver, booking.id).await.unwrap();

    let settled = payments::settle(&db, payment.id).await.unwrap();
    assert_eq!(settled.status, PaymentStatus::Completed);
    let tx = transaction::Entity::find()
        .filter(transaction::Column::BookingId.eq(booking.id))
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Paid);
    assert!(payments::refunds_due(&db).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_payment_initiation_checks() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    let stranger = create_passenger(&db).await;
    let ride = create_ride(&db, driver, 4).await;
    let booking = ledger::reserve(&db, ride.id, passenger, 1).await.unwrap();

    let mut bad_phone = booking_payment(booking.id);
    bad_phone.phone_number = "0612345678".to_string();
    let err = payments::initiate(&db, &identity(passenger, Access::Passenger), bad_phone)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = payments::initiate(
        &db,
        &identity(stranger, Access::Passenger),
        booking_payment(booking.id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = payments::initiate(
        &db,
        &identity(passenger, Access::Passenger),
        subscription_payment(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    ledger::release(&db, booking.id).await.unwrap();
    let err = payments::initiate(
        &db,
        &identity(passenger, Access::Passenger),
        booking_payment(booking.id),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}

#[tokio::test]
async fn test_payments_are_private() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let other = create_driver(&db).await;

    let payment = payments::initiate(&db, &identity(driver, Access::Driver), subscription_payment())
        .await
        .unwrap();

    let found = payments::find_owned(&db, driver, payment.id).await.unwrap();
    assert_eq!(found.id, payment.id);

    let err = payments::find_owned(&db, other, payment.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_subscription_activation_and_renewal() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    assert!(!subscriptions::driver_has_active_subscription(&db, driver).await.unwrap());

    // Pending payments cannot activate anything
    let pending = payments::initiate(&db, &identity(driver, Access::Driver), subscription_payment())
        .await
        .unwrap();
    assert_eq!(pending.amount, 6_000);
    let err = subscriptions::activate(&db, driver, pending.id).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    payments::settle(&db, pending.id).await.unwrap();
    let first = subscriptions::activate(&db, driver, pending.id).await.unwrap();
    let expected = Utc::now() + Duration::days(7);
    let drift = (first.expires_at.with_timezone(&Utc) - expected).num_seconds().abs();
    assert!(drift < 60, "first period should run seven days from now");
    assert!(subscriptions::driver_has_active_subscription(&db, driver).await.unwrap());

    let err = subscriptions::activate(&db, driver, pending.id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let renewal = paid_subscription(&db, driver).await;
    let second = subscriptions::activate(&db, driver, renewal).await.unwrap();
    assert_eq!(
        second.expires_at.with_timezone(&Utc),
        first.expires_at.with_timezone(&Utc) + Duration::days(7)
    );

    let current = subscriptions::current_subscription(&db, driver).await.unwrap().unwrap();
    assert_eq!(current.id, second.id);
}

#[tokio::test]
async fn test_someone_elses_payment_cannot_activate() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let other = create_driver(&db).await;
    let payment_id = paid_subscription(&db, driver).await;

    let err = subscriptions::activate(&db, other, payment_id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn test_lapsed_subscription_expires_and_blocks_posting() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let lapsed = create_subscription(&db, driver, Duration::hours(-2)).await;

    assert!(!subscriptions::driver_has_active_subscription(&db, driver).await.unwrap());
    assert!(subscriptions::current_subscription(&db, driver).await.unwrap().is_none());

    let stored = driver_subscription::Entity::find_by_id(lapsed.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, SubscriptionStatus::Expired);

    let new_ride = rides::NewRide {
        pickup_location: "Kampala".to_string(),
        pickup: None,
        destination: "Jinja".to_string(),
        destination_coords: None,
        departure_time: Utc::now() + Duration::hours(3),
        available_seats: 3,
        notes: None,
    };
    let err = rides::post_ride(&db, driver, new_ride.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::SubscriptionRequired));

    create_subscription(&db, driver, Duration::days(5)).await;
    let posted = rides::post_ride(&db, driver, new_ride).await.unwrap();
    assert_eq!(posted.total_seats, 3);
    assert_eq!(posted.available_seats, 3);
    assert_eq!(posted.fare_per_seat, 4_000);
}

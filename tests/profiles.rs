mod common;

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use rideshare_backend::entities::booking::BookingStatus;
use rideshare_backend::entities::profile::{self, UserRole};
use rideshare_backend::entities::{driver_details, ride};
use rideshare_backend::entities::ride::RideStatus;
use rideshare_backend::error::AppError;
use rideshare_backend::services::capability::{self, Access};
use rideshare_backend::services::ledger::{self, ReleaseOutcome};
use rideshare_backend::services::profiles::{
    self, OnboardRequest, UpdateProfileRequest, VehicleRequest,
};
use rideshare_backend::services::{bookings, rides};

use common::*;

fn vehicle() -> VehicleRequest {
    VehicleRequest {
        car_make: "Toyota".to_string(),
        car_model: "Premio".to_string(),
        car_color: Some("  Silver ".to_string()),
        license_plate: "uba 123x".to_string(),
        seats_available: 4,
    }
}

fn onboarding(role: UserRole, vehicle: Option<VehicleRequest>) -> OnboardRequest {
    OnboardRequest {
        role,
        full_name: "Nakato Sarah".to_string(),
        phone_number: "0772123456".to_string(),
        vehicle,
    }
}

async fn profile_count(db: &sea_orm::DatabaseConnection, user_id: Uuid) -> u64 {
    profile::Entity::find()
        .filter(profile::Column::UserId.eq(user_id))
        .count(db)
        .await
        .unwrap()
}

async fn set_departure(db: &sea_orm::DatabaseConnection, ride: &ride::Model, hours: i64) {
    let mut active = ride.clone().into_active_model();
    active.departure_time = Set((Utc::now() + Duration::hours(hours)).into());
    active.update(db).await.unwrap();
}

#[tokio::test]
async fn test_vehicle_requirement_follows_role() {
    let db = setup_db().await;
    let user = create_user(&db, None).await;
    let email = format!("{}@example.com", user.simple());

    let err = profiles::onboard(&db, user, &email, onboarding(UserRole::Driver, None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = profiles::onboard(&db, user, &email, onboarding(UserRole::Passenger, Some(vehicle())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(profile_count(&db, user).await, 0);

    let created = profiles::onboard(&db, user, &email, onboarding(UserRole::Driver, Some(vehicle())))
        .await
        .unwrap();
    assert_eq!(created.role, UserRole::Driver);
    assert_eq!(created.email.as_deref(), Some(email.as_str()));

    let identity = capability::resolve(&db, user, &email).await.unwrap();
    let view = profiles::load(&db, &identity).await.unwrap();
    assert_eq!(view.access, Access::Driver);
    let details = view.driver_details.expect("vehicle saved with profile");
    assert_eq!(details.license_plate, "UBA 123X");
    assert_eq!(details.car_color.as_deref(), Some("Silver"));
    assert_eq!(details.seats_available, 4);
}

#[tokio::test]
async fn test_onboarding_length_and_seat_limits() {
    let db = setup_db().await;
    let user = create_user(&db, None).await;
    let email = format!("{}@example.com", user.simple());

    let mut cases = Vec::new();

    let mut short_name = onboarding(UserRole::Passenger, None);
    short_name.full_name = " A ".to_string();
    cases.push(short_name);

    let mut long_name = onboarding(UserRole::Passenger, None);
    long_name.full_name = "x".repeat(101);
    cases.push(long_name);

    let mut short_phone = onboarding(UserRole::Passenger, None);
    short_phone.phone_number = "077212345".to_string();
    cases.push(short_phone);

    let mut long_phone = onboarding(UserRole::Passenger, None);
    long_phone.phone_number = "+2567721234567890".to_string();
    cases.push(long_phone);

    let long_plate = "U".repeat(21);
    for plate in ["UB", long_plate.as_str()] {
        let mut v = vehicle();
        v.license_plate = plate.to_string();
        cases.push(onboarding(UserRole::Driver, Some(v)));
    }

    for seats in [0, 9] {
        let mut v = vehicle();
        v.seats_available = seats;
        cases.push(onboarding(UserRole::Driver, Some(v)));
    }

    for request in cases {
        let err = profiles::onboard(&db, user, &email, request).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)), "unexpected error: {err}");
    }

    assert_eq!(profile_count(&db, user).await, 0);
    assert_eq!(driver_details::Entity::find().count(&db).await.unwrap(), 0);

    // Bounds themselves are accepted
    let mut v = vehicle();
    v.license_plate = "UBA".to_string();
    v.seats_available = 8;
    let mut edge = onboarding(UserRole::Driver, Some(v));
    edge.full_name = "Al".to_string();
    edge.phone_number = "+256772123456".to_string();
    profiles::onboard(&db, user, &email, edge).await.unwrap();
}

#[tokio::test]
async fn test_second_onboarding_conflicts() {
    let db = setup_db().await;
    let user = create_user(&db, None).await;
    let email = format!("{}@example.com", user.simple());

    profiles::onboard(&db, user, &email, onboarding(UserRole::Passenger, None))
        .await
        .unwrap();

    let err = profiles::onboard(&db, user, &email, onboarding(UserRole::Driver, Some(vehicle())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = profile::Entity::find()
        .filter(profile::Column::UserId.eq(user))
        .all(&db)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].role, UserRole::Passenger);
    assert_eq!(driver_details::Entity::find().count(&db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_profile_update_keeps_role() {
    let db = setup_db().await;
    let passenger = create_passenger(&db).await;

    let request: UpdateProfileRequest = serde_json::from_value(serde_json::json!({
        "full_name": "  Okello John  ",
        "role": "driver",
        "avatar_url": "   "
    }))
    .unwrap();
    let updated = profiles::update_profile(&db, passenger, request).await.unwrap();

    assert_eq!(updated.full_name, "Okello John");
    assert_eq!(updated.role, UserRole::Passenger);
    assert_eq!(updated.avatar_url, None);
    assert_eq!(updated.phone_number.as_deref(), Some("0772123456"));

    let bad_phone = UpdateProfileRequest {
        full_name: None,
        phone_number: Some("12345".to_string()),
        avatar_url: None,
    };
    let err = profiles::update_profile(&db, passenger, bad_phone).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let newcomer = create_user(&db, None).await;
    let empty = UpdateProfileRequest {
        full_name: Some("Somebody".to_string()),
        phone_number: None,
        avatar_url: None,
    };
    let err = profiles::update_profile(&db, newcomer, empty).await.unwrap_err();
    assert!(matches!(err, AppError::OnboardingRequired));
}

#[tokio::test]
async fn test_save_vehicle_replaces_existing_details() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;

    let first = profiles::save_vehicle(&db, driver, vehicle()).await.unwrap();

    let mut replacement = vehicle();
    replacement.car_make = "Honda".to_string();
    replacement.license_plate = "ubb 900k".to_string();
    replacement.car_color = None;
    let second = profiles::save_vehicle(&db, driver, replacement).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.car_make, "Honda");
    assert_eq!(second.license_plate, "UBB 900K");
    assert_eq!(second.car_color, None);
    assert_eq!(driver_details::Entity::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_driver_rides_split_and_order() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let other = create_driver(&db).await;

    let soon = create_ride(&db, driver, 3).await;
    set_departure(&db, &soon, 2).await;
    let later = create_ride(&db, driver, 3).await;
    set_departure(&db, &later, 30).await;
    let cancelled = create_ride(&db, driver, 3).await;
    set_departure(&db, &cancelled, 10).await;
    let completed = create_ride(&db, driver, 3).await;
    set_departure(&db, &completed, 20).await;
    create_ride(&db, other, 3).await;

    ledger::cancel_ride(&db, driver, cancelled.id).await.unwrap();
    ledger::complete_ride(&db, driver, completed.id).await.unwrap();

    let listing = rides::driver_rides(&db, driver).await.unwrap();
    let active: Vec<_> = listing.active.iter().map(|r| r.id).collect();
    let past: Vec<_> = listing.past.iter().map(|r| r.id).collect();

    assert_eq!(active, vec![later.id, soon.id]);
    assert_eq!(past, vec![completed.id, cancelled.id]);
    assert!(listing.past.iter().all(|r| r.status != RideStatus::Available));
}

#[tokio::test]
async fn test_ride_passengers_only_for_owner() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let other_driver = create_driver(&db).await;
    let first = create_passenger(&db).await;
    let second = create_passenger(&db).await;
    let ride = create_ride(&db, driver, 4).await;

    let a = ledger::reserve(&db, ride.id, first, 2).await.unwrap();
    let b = ledger::reserve(&db, ride.id, second, 1).await.unwrap();
    ledger::release(&db, b.id).await.unwrap();

    let err = rides::ride_passengers(&db, other_driver, ride.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = rides::ride_passengers(&db, first, ride.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = rides::ride_passengers(&db, driver, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::RideNotFound));

    let listing = rides::ride_passengers(&db, driver, ride.id).await.unwrap();
    assert_eq!(listing.ride.id, ride.id);
    assert_eq!(listing.passengers.len(), 2);

    let seated = listing.passengers.iter().find(|p| p.booking_id == a.id).unwrap();
    assert_eq!(seated.passenger_id, first);
    assert_eq!(seated.seats_booked, 2);
    assert_eq!(seated.status, BookingStatus::Pending);
    assert_eq!(seated.total_fare, 8_000);
    assert_eq!(seated.phone_number.as_deref(), Some("0772123456"));
    assert!(!seated.passenger_name.is_empty());

    let gone = listing.passengers.iter().find(|p| p.booking_id == b.id).unwrap();
    assert_eq!(gone.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn test_passenger_bookings_split_and_order() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    let someone_else = create_passenger(&db).await;

    let first_ride = create_ride(&db, driver, 3).await;
    let second_ride = create_ride(&db, driver, 3).await;
    let third_ride = create_ride(&db, driver, 3).await;

    let oldest = ledger::reserve(&db, first_ride.id, passenger, 1).await.unwrap();
    let middle = ledger::reserve(&db, second_ride.id, passenger, 2).await.unwrap();
    let newest = ledger::reserve(&db, third_ride.id, passenger, 1).await.unwrap();
    ledger::reserve(&db, third_ride.id, someone_else, 1).await.unwrap();

    for (booking, age) in [(&oldest, 3), (&middle, 2), (&newest, 1)] {
        let mut active = booking.clone().into_active_model();
        active.created_at = Set((Utc::now() - Duration::minutes(age)).into());
        active.update(&db).await.unwrap();
    }

    ledger::release(&db, middle.id).await.unwrap();

    let listing = bookings::passenger_bookings(&db, passenger).await.unwrap();
    let active: Vec<_> = listing.active.iter().map(|b| b.booking.id).collect();
    let past: Vec<_> = listing.past.iter().map(|b| b.booking.id).collect();

    assert_eq!(active, vec![newest.id, oldest.id]);
    assert_eq!(past, vec![middle.id]);

    let view = &listing.active[0];
    assert_eq!(view.total_fare, 4_000);
    assert_eq!(view.ride.as_ref().map(|r| r.id), Some(third_ride.id));
    assert_eq!(view.driver.as_ref().map(|d| d.user_id), Some(driver));
    assert_eq!(listing.past[0].total_fare, 8_000);
}

#[tokio::test]
async fn test_only_the_passenger_can_cancel_their_booking() {
    let db = setup_db().await;
    let driver = create_driver(&db).await;
    let passenger = create_passenger(&db).await;
    let intruder = create_passenger(&db).await;
    let ride = create_ride(&db, driver, 4).await;

    let booking = ledger::reserve(&db, ride.id, passenger, 2).await.unwrap();

    for other in [intruder, driver] {
        let err = bookings::cancel_own_booking(&db, other, booking.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
    assert_eq!(reload_booking(&db, booking.id).await.status, BookingStatus::Pending);
    assert_eq!(reload_ride(&db, ride.id).await.available_seats, 2);

    let err = bookings::cancel_own_booking(&db, passenger, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::BookingNotFound));

    let outcome = bookings::cancel_own_booking(&db, passenger, booking.id).await.unwrap();
    assert_eq!(outcome, ReleaseOutcome::Released { seats: 2 });
    let again = bookings::cancel_own_booking(&db, passenger, booking.id).await.unwrap();
    assert_eq!(again, ReleaseOutcome::AlreadyCancelled);
    assert_ledger_balanced(&db, ride.id).await;
}

#![allow(dead_code)]

use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use rideshare_backend::entities::booking::{self, BookingStatus};
use rideshare_backend::entities::driver_subscription::{self, SubscriptionStatus};
use rideshare_backend::entities::profile::{self, UserRole};
use rideshare_backend::entities::{ride, user};
use rideshare_backend::entities::ride::RideStatus;
use rideshare_backend::services::fares::{FARE_PER_SEAT, SUBSCRIPTION_FEE};

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub async fn create_user(db: &DatabaseConnection, role: Option<UserRole>) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    user::ActiveModel {
        id: Set(id),
        email: Set(format!("{}@example.com", id.simple())),
        password_hash: Set("not-a-real-hash".to_string()),
        email_confirmed_at: Set(Some(now.into())),
        confirmation_token: Set(None),
        created_at: Set(now.into()),
    }
    .insert(db)
    .await
    .expect("insert user");

    if let Some(role) = role {
        profile::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(id),
            full_name: Set(format!("User {}", &id.simple().to_string()[..6])),
            phone_number: Set(Some("0772123456".to_string())),
            email: Set(None),
            role: Set(role),
            avatar_url: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(db)
        .await
        .expect("insert profile");
    }

    id
}

pub async fn create_driver(db: &DatabaseConnection) -> Uuid {
    create_user(db, Some(UserRole::Driver)).await
}

pub async fn create_passenger(db: &DatabaseConnection) -> Uuid {
    create_user(db, Some(UserRole::Passenger)).await
}

/// Subscription period ending `expires_in` from now (negative for lapsed).
pub async fn create_subscription(
    db: &DatabaseConnection,
    driver_id: Uuid,
    expires_in: Duration,
) -> driver_subscription::Model {
    let now = Utc::now();
    driver_subscription::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        amount: Set(SUBSCRIPTION_FEE),
        status: Set(SubscriptionStatus::Active),
        payment_method: Set("MTN MoMo".to_string()),
        payment_reference: Set(Uuid::new_v4()),
        created_at: Set(now.into()),
        expires_at: Set((now + expires_in).into()),
    }
    .insert(db)
    .await
    .expect("insert subscription")
}

pub async fn create_ride(db: &DatabaseConnection, driver_id: Uuid, seats: i32) -> ride::Model {
    let now = Utc::now();
    ride::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        pickup_location: Set("Kampala Old Taxi Park".to_string()),
        pickup_lat: Set(Some(0.3136)),
        pickup_lng: Set(Some(32.5811)),
        destination: Set("Entebbe Airport".to_string()),
        destination_lat: Set(Some(0.0424)),
        destination_lng: Set(Some(32.4435)),
        departure_time: Set((now + Duration::hours(6)).into()),
        total_seats: Set(seats),
        available_seats: Set(seats),
        fare_per_seat: Set(FARE_PER_SEAT),
        status: Set(RideStatus::Available),
        notes: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(db)
    .await
    .expect("insert ride")
}

pub async fn reload_ride(db: &DatabaseConnection, ride_id: Uuid) -> ride::Model {
    ride::Entity::find_by_id(ride_id)
        .one(db)
        .await
        .expect("load ride")
        .expect("ride exists")
}

pub async fn reload_booking(db: &DatabaseConnection, booking_id: Uuid) -> booking::Model {
    booking::Entity::find_by_id(booking_id)
        .one(db)
        .await
        .expect("load booking")
        .expect("booking exists")
}

/// Asserts `available + seats of non-cancelled bookings == total`.
pub async fn assert_ledger_balanced(db: &DatabaseConnection, ride_id: Uuid) {
    let ride = reload_ride(db, ride_id).await;
    let held: i32 = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::Status.ne(BookingStatus::Cancelled))
        .all(db)
        .await
        .expect("load bookings")
        .iter()
        .map(|b| b.seats_booked)
        .sum();

    assert_eq!(
        ride.available_seats + held,
        ride.total_seats,
        "seat ledger out of balance"
    );
}

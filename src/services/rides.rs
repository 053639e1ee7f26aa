use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::{driver_details, profile, rating, ride};
use crate::entities::ride::RideStatus;
use crate::error::{AppError, AppResult};
use crate::services::fares::{FareSplit, FARE_PER_SEAT};
use crate::services::subscriptions;
use crate::utils::geo::Coordinates;
use crate::utils::validation::{require_length, require_range};

pub const MAX_SEATS_PER_RIDE: i32 = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct NewRide {
    pub pickup_location: String,
    pub pickup: Option<Coordinates>,
    pub destination: String,
    pub destination_coords: Option<Coordinates>,
    pub departure_time: DateTime<Utc>,
    pub available_seats: i32,
    pub notes: Option<String>,
}

/// Posts a ride for a driver with a running subscription.
pub async fn post_ride(
    db: &DatabaseConnection,
    driver_id: Uuid,
    new_ride: NewRide,
) -> AppResult<ride::Model> {
    let pickup_location = require_length("Pickup location", &new_ride.pickup_location, 3, 200)?;
    let destination = require_length("Destination", &new_ride.destination, 3, 200)?;
    let seats = require_range("Available seats", new_ride.available_seats, 1, MAX_SEATS_PER_RIDE)?;

    if new_ride.departure_time <= Utc::now() {
        return Err(AppError::BadRequest(
            "Departure time must be in the future".to_string(),
        ));
    }
    for coords in [new_ride.pickup, new_ride.destination_coords].into_iter().flatten() {
        if !coords.is_valid() {
            return Err(AppError::BadRequest("Invalid coordinates".to_string()));
        }
    }

    subscriptions::require_active_subscription(db, driver_id).await?;

    let notes = new_ride
        .notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    let stamp: DateTime<FixedOffset> = Utc::now().into();
    let ride = ride::ActiveModel {
        id: Set(Uuid::new_v4()),
        driver_id: Set(driver_id),
        pickup_location: Set(pickup_location),
        pickup_lat: Set(new_ride.pickup.map(|c| c.lat)),
        pickup_lng: Set(new_ride.pickup.map(|c| c.lng)),
        destination: Set(destination),
        destination_lat: Set(new_ride.destination_coords.map(|c| c.lat)),
        destination_lng: Set(new_ride.destination_coords.map(|c| c.lng)),
        departure_time: Set(new_ride.departure_time.into()),
        total_seats: Set(seats),
        available_seats: Set(seats),
        fare_per_seat: Set(FARE_PER_SEAT),
        status: Set(RideStatus::Available),
        notes: Set(notes),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(db)
    .await?;

    tracing::info!(ride_id = %ride.id, %driver_id, seats, "Ride posted");
    Ok(ride)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideSearch {
    pub from: Option<String>,
    pub to: Option<String>,
    pub near_lat: Option<f64>,
    pub near_lng: Option<f64>,
    pub radius_km: Option<f64>,
}

const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

/// Bookable rides: open, with seats left, not yet departed, soonest first.
pub async fn search_rides<C: ConnectionTrait>(db: &C, search: &RideSearch) -> AppResult<Vec<ride::Model>> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let mut query = ride::Entity::find()
        .filter(ride::Column::Status.eq(RideStatus::Available))
        .filter(ride::Column::AvailableSeats.gt(0))
        .filter(ride::Column::DepartureTime.gte(now));

    if let Some(from) = search.from.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(contains_ignore_case(ride::Column::PickupLocation, from));
    }
    if let Some(to) = search.to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query = query.filter(contains_ignore_case(ride::Column::Destination, to));
    }

    let rides = query
        .order_by_asc(ride::Column::DepartureTime)
        .all(db)
        .await?;

    let Some(center) = Coordinates::from_parts(search.near_lat, search.near_lng) else {
        return Ok(rides);
    };
    let radius = search.radius_km.unwrap_or(DEFAULT_SEARCH_RADIUS_KM);

    Ok(rides
        .into_iter()
        .filter(|r| {
            Coordinates::from_parts(r.pickup_lat, r.pickup_lng)
                .is_some_and(|pickup| pickup.is_within(&center, radius))
        })
        .collect())
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn contains_ignore_case(column: ride::Column, needle: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column)))
        .like(LikeExpr::new(like_pattern(needle)).escape('\\'))
}

/// Public view of a driver shown next to their rides.
#[derive(Debug, Clone, Serialize)]
pub struct DriverCard {
    pub user_id: Uuid,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub vehicle: Option<VehicleInfo>,
    pub average_rating: Option<f64>,
    pub rating_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleInfo {
    pub car_make: String,
    pub car_model: String,
    pub car_color: Option<String>,
    pub license_plate: String,
}

impl From<driver_details::Model> for VehicleInfo {
    fn from(d: driver_details::Model) -> Self {
        Self {
            car_make: d.car_make,
            car_model: d.car_model,
            car_color: d.car_color,
            license_plate: d.license_plate,
        }
    }
}

/// Loads profile, vehicle and rating summary for each driver in one pass per table.
pub async fn driver_cards<C: ConnectionTrait>(
    db: &C,
    driver_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, DriverCard>> {
    if driver_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(driver_ids.iter().copied()))
        .all(db)
        .await?;
    let mut vehicles: HashMap<Uuid, driver_details::Model> = driver_details::Entity::find()
        .filter(driver_details::Column::UserId.is_in(driver_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|d| (d.user_id, d))
        .collect();
    let ratings = rating::Entity::find()
        .filter(rating::Column::RatedUserId.is_in(driver_ids.iter().copied()))
        .all(db)
        .await?;

    let mut cards = HashMap::new();
    for p in profiles {
        let received: Vec<i16> = ratings
            .iter()
            .filter(|r| r.rated_user_id == p.user_id)
            .map(|r| r.rating)
            .collect();
        let average_rating = (!received.is_empty()).then(|| {
            received.iter().map(|&r| f64::from(r)).sum::<f64>() / received.len() as f64
        });

        cards.insert(
            p.user_id,
            DriverCard {
                user_id: p.user_id,
                full_name: p.full_name,
                avatar_url: p.avatar_url,
                vehicle: vehicles.remove(&p.user_id).map(VehicleInfo::from),
                average_rating,
                rating_count: received.len(),
            },
        );
    }

    Ok(cards)
}

#[derive(Debug, Serialize)]
pub struct DriverRides {
    pub active: Vec<ride::Model>,
    pub past: Vec<ride::Model>,
}

/// The driver's rides, newest departure first, split into open and closed.
pub async fn driver_rides<C: ConnectionTrait>(db: &C, driver_id: Uuid) -> AppResult<DriverRides> {
    let rides = ride::Entity::find()
        .filter(ride::Column::DriverId.eq(driver_id))
        .order_by_desc(ride::Column::DepartureTime)
        .all(db)
        .await?;

    let (past, active) = rides.into_iter().partition(|r| r.status.is_terminal());
    Ok(DriverRides { active, past })
}

#[derive(Debug, Serialize)]
pub struct PassengerInfo {
    pub booking_id: Uuid,
    pub passenger_id: Uuid,
    pub passenger_name: String,
    pub phone_number: Option<String>,
    pub seats_booked: i32,
    pub status: BookingStatus,
    pub total_fare: i64,
}

#[derive(Debug, Serialize)]
pub struct RidePassengers {
    pub ride: ride::Model,
    pub passengers: Vec<PassengerInfo>,
}

/// Bookings on a ride, oldest first. Only the ride's driver may look.
pub async fn ride_passengers<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
    ride_id: Uuid,
) -> AppResult<RidePassengers> {
    let found = ride::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or(AppError::RideNotFound)?;

    if found.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "You can only view passengers of your own rides".to_string(),
        ));
    }

    let bookings = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .order_by_asc(booking::Column::CreatedAt)
        .all(db)
        .await?;

    let profiles = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(bookings.iter().map(|b| b.passenger_id)))
        .all(db)
        .await?;

    let passengers = bookings
        .into_iter()
        .map(|b| {
            let passenger = profiles.iter().find(|p| p.user_id == b.passenger_id);
            PassengerInfo {
                booking_id: b.id,
                passenger_id: b.passenger_id,
                passenger_name: passenger.map(|p| p.full_name.clone()).unwrap_or_default(),
                phone_number: passenger.and_then(|p| p.phone_number.clone()),
                seats_booked: b.seats_booked,
                status: b.status,
                total_fare: FareSplit::for_seats(b.seats_booked).total_amount,
            }
        })
        .collect();

    Ok(RidePassengers {
        ride: found,
        passengers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Kampala"), "%kampala%");
        assert_eq!(like_pattern("50%_Off"), r"%50\%\_off%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }
}

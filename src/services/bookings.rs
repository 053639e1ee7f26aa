//! Passenger-facing booking views and cancellation.

use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{booking, ride};
use crate::error::{AppError, AppResult};
use crate::services::fares::FareSplit;
use crate::services::ledger::{self, ReleaseOutcome};
use crate::services::rides::{self, DriverCard};

#[derive(Debug, Serialize)]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub total_fare: i64,
    pub ride: Option<ride::Model>,
    pub driver: Option<DriverCard>,
}

#[derive(Debug, Serialize)]
pub struct PassengerBookings {
    pub active: Vec<BookingView>,
    pub past: Vec<BookingView>,
}

/// The passenger's bookings, newest first, with the ride and driver attached.
pub async fn passenger_bookings<C: ConnectionTrait>(
    db: &C,
    passenger_id: Uuid,
) -> AppResult<PassengerBookings> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::PassengerId.eq(passenger_id))
        .order_by_desc(booking::Column::CreatedAt)
        .all(db)
        .await?;

    let booked_rides = ride::Entity::find()
        .filter(ride::Column::Id.is_in(bookings.iter().map(|b| b.ride_id)))
        .all(db)
        .await?;

    let driver_ids: Vec<Uuid> = booked_rides.iter().map(|r| r.driver_id).collect();
    let cards = rides::driver_cards(db, &driver_ids).await?;

    let mut active = Vec::new();
    let mut past = Vec::new();
    for b in bookings {
        let ride = booked_rides.iter().find(|r| r.id == b.ride_id).cloned();
        let driver = ride.as_ref().and_then(|r| cards.get(&r.driver_id).cloned());
        let is_active = b.status.is_active();

        let view = BookingView {
            total_fare: FareSplit::for_seats(b.seats_booked).total_amount,
            booking: b,
            ride,
            driver,
        };
        if is_active {
            active.push(view);
        } else {
            past.push(view);
        }
    }

    Ok(PassengerBookings { active, past })
}

/// Cancels a booking on behalf of the passenger who made it.
pub async fn cancel_own_booking(
    db: &DatabaseConnection,
    passenger_id: Uuid,
    booking_id: Uuid,
) -> AppResult<ReleaseOutcome> {
    let existing = booking::Entity::find_by_id(booking_id)
        .one(db)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    if existing.passenger_id != passenger_id {
        return Err(AppError::Forbidden(
            "You can only cancel your own bookings".to_string(),
        ));
    }

    ledger::release(db, booking_id).await
}

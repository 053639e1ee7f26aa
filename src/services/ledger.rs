//! Seat reservation ledger.
//!
//! Every change to a ride's `available_seats` goes through this module, and
//! every change happens inside one database transaction together with the
//! booking row that justifies it. The invariant kept for each ride is
//!
//! ```text
//! available_seats + sum(seats_booked of non-cancelled bookings) == total_seats
//! ```
//!
//! Reservations use a conditional decrement (`... WHERE available_seats >= n`)
//! instead of read-then-write, so concurrent callers serialize on the ride row
//! and can never oversubscribe it.

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride::{self, RideStatus};
use crate::entities::transaction::{self, TransactionStatus};
use crate::error::{AppError, AppResult};
use crate::services::fares::FareSplit;
use crate::services::subscriptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    /// Seats were handed back to the ride.
    Released { seats: i32 },
    /// The booking was cancelled earlier; nothing changed.
    AlreadyCancelled,
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

/// Claims `seat_count` seats of a ride for a passenger.
pub async fn reserve(
    db: &DatabaseConnection,
    ride_id: Uuid,
    passenger_id: Uuid,
    seat_count: i32,
) -> AppResult<booking::Model> {
    if seat_count < 1 {
        return Err(AppError::BadRequest("Must book at least 1 seat".to_string()));
    }

    let txn = db.begin().await?;

    let ride = ride::Entity::find_by_id(ride_id)
        .one(&txn)
        .await?
        .ok_or(AppError::RideNotFound)?;

    if ride.driver_id == passenger_id {
        return Err(AppError::BadRequest("You cannot book your own ride".to_string()));
    }
    if ride.status != RideStatus::Available || ride.departure_time.with_timezone(&Utc) < Utc::now() {
        return Err(AppError::RideUnavailable);
    }

    ensure_no_active_booking(&txn, ride_id, passenger_id).await?;

    let stamp = now();
    let decremented = ride::Entity::update_many()
        .col_expr(
            ride::Column::AvailableSeats,
            Expr::col(ride::Column::AvailableSeats).sub(seat_count),
        )
        .col_expr(ride::Column::UpdatedAt, Expr::value(stamp))
        .filter(ride::Column::Id.eq(ride_id))
        .filter(ride::Column::Status.eq(RideStatus::Available))
        .filter(ride::Column::AvailableSeats.gte(seat_count))
        .exec(&txn)
        .await?;

    if decremented.rows_affected == 0 {
        // Someone else changed the ride since we read it; report what we see now.
        let current = ride::Entity::find_by_id(ride_id)
            .one(&txn)
            .await?
            .ok_or(AppError::RideNotFound)?;
        if current.status != RideStatus::Available {
            return Err(AppError::RideUnavailable);
        }
        tracing::debug!(
            %ride_id,
            requested = seat_count,
            available = current.available_seats,
            "Reservation rejected"
        );
        return Err(AppError::InsufficientCapacity {
            requested: seat_count,
            available: current.available_seats,
        });
    }

    // The decrement holds the ride row lock until commit, so a concurrent
    // request from the same passenger is visible from here on.
    ensure_no_active_booking(&txn, ride_id, passenger_id).await?;

    mark_full_if_sold_out(&txn, ride_id).await?;

    let booking = booking::ActiveModel {
        id: Set(Uuid::new_v4()),
        ride_id: Set(ride_id),
        passenger_id: Set(passenger_id),
        seats_booked: Set(seat_count),
        status: Set(BookingStatus::Pending),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(&txn)
    .await?;

    let split = FareSplit::for_seats(seat_count);
    transaction::ActiveModel {
        id: Set(Uuid::new_v4()),
        booking_id: Set(booking.id),
        passenger_id: Set(passenger_id),
        driver_id: Set(ride.driver_id),
        seats_count: Set(seat_count),
        total_amount: Set(split.total_amount),
        driver_amount: Set(split.driver_amount),
        platform_commission: Set(split.platform_commission),
        status: Set(TransactionStatus::Pending),
        created_at: Set(stamp),
        updated_at: Set(stamp),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        %ride_id,
        booking_id = %booking.id,
        %passenger_id,
        seats = seat_count,
        "Seats reserved"
    );
    Ok(booking)
}

/// Cancels a booking and hands its seats back to the ride. Cancelling an
/// already-cancelled booking is a no-op.
pub async fn release(db: &DatabaseConnection, booking_id: Uuid) -> AppResult<ReleaseOutcome> {
    let txn = db.begin().await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    match booking.status {
        BookingStatus::Cancelled => return Ok(ReleaseOutcome::AlreadyCancelled),
        BookingStatus::Completed => {
            return Err(AppError::BadRequest(
                "Completed bookings cannot be cancelled".to_string(),
            ));
        }
        BookingStatus::Pending | BookingStatus::Confirmed => {}
    }

    let stamp = now();
    let flipped = booking::Entity::update_many()
        .col_expr(booking::Column::Status, BookingStatus::Cancelled.as_enum())
        .col_expr(booking::Column::UpdatedAt, Expr::value(stamp))
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
        .exec(&txn)
        .await?;

    if flipped.rows_affected == 0 {
        // A concurrent cancel won the race and already credited the seats.
        return Ok(ReleaseOutcome::AlreadyCancelled);
    }

    restore_seats(&txn, booking.ride_id, booking.seats_booked, stamp).await?;

    transaction::Entity::update_many()
        .col_expr(
            transaction::Column::Status,
            Expr::value(TransactionStatus::Cancelled),
        )
        .col_expr(transaction::Column::UpdatedAt, Expr::value(stamp))
        .filter(transaction::Column::BookingId.eq(booking_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        %booking_id,
        ride_id = %booking.ride_id,
        seats = booking.seats_booked,
        "Seats released"
    );
    Ok(ReleaseOutcome::Released {
        seats: booking.seats_booked,
    })
}

/// Driver confirms a pending booking on one of their rides.
pub async fn confirm_booking(
    db: &DatabaseConnection,
    driver_id: Uuid,
    booking_id: Uuid,
) -> AppResult<booking::Model> {
    let txn = db.begin().await?;

    let booking = booking::Entity::find_by_id(booking_id)
        .one(&txn)
        .await?
        .ok_or(AppError::BookingNotFound)?;
    let ride = ride::Entity::find_by_id(booking.ride_id)
        .one(&txn)
        .await?
        .ok_or(AppError::RideNotFound)?;

    if ride.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "You can only manage bookings on your own rides".to_string(),
        ));
    }
    subscriptions::require_active_subscription(&txn, driver_id).await?;

    match booking.status {
        BookingStatus::Confirmed => return Ok(booking),
        BookingStatus::Pending => {}
        _ => {
            return Err(AppError::BadRequest(
                "Only pending bookings can be confirmed".to_string(),
            ));
        }
    }

    let mut active: booking::ActiveModel = booking.into();
    active.status = Set(BookingStatus::Confirmed);
    active.updated_at = Set(now());
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(%booking_id, %driver_id, "Booking confirmed");
    Ok(updated)
}

/// Driver cancels a ride: every active booking is cancelled and all seats
/// return to the ride.
pub async fn cancel_ride(
    db: &DatabaseConnection,
    driver_id: Uuid,
    ride_id: Uuid,
) -> AppResult<ride::Model> {
    let txn = db.begin().await?;
    let stamp = now();

    // Closing the ride first locks it, so no reservation can slip in between
    // the booking sweep below and the seat reset.
    close_ride(&txn, driver_id, ride_id, RideStatus::Cancelled, stamp).await?;
    let swept = sweep_bookings(&txn, ride_id, BookingStatus::Cancelled, stamp).await?;
    let updated = reload(&txn, ride_id).await?;

    txn.commit().await?;

    tracing::info!(
        %ride_id,
        %driver_id,
        cancelled_bookings = swept,
        "Ride cancelled"
    );
    Ok(updated)
}

/// Driver marks a ride as done: active bookings and their payments complete.
pub async fn complete_ride(
    db: &DatabaseConnection,
    driver_id: Uuid,
    ride_id: Uuid,
) -> AppResult<ride::Model> {
    let txn = db.begin().await?;
    let stamp = now();

    close_ride(&txn, driver_id, ride_id, RideStatus::Completed, stamp).await?;
    let swept = sweep_bookings(&txn, ride_id, BookingStatus::Completed, stamp).await?;
    let updated = reload(&txn, ride_id).await?;

    txn.commit().await?;

    tracing::info!(
        %ride_id,
        %driver_id,
        completed_bookings = swept,
        "Ride completed"
    );
    Ok(updated)
}

/// Moves an open ride owned by `driver_id` into a terminal status with a
/// single conditional update. Cancelling also frees every seat.
async fn close_ride(
    txn: &DatabaseTransaction,
    driver_id: Uuid,
    ride_id: Uuid,
    status: RideStatus,
    stamp: DateTime<FixedOffset>,
) -> AppResult<()> {
    let mut update = ride::Entity::update_many()
        .col_expr(ride::Column::Status, status.as_enum())
        .col_expr(ride::Column::UpdatedAt, Expr::value(stamp))
        .filter(ride::Column::Id.eq(ride_id))
        .filter(ride::Column::DriverId.eq(driver_id))
        .filter(ride::Column::Status.is_in([RideStatus::Available, RideStatus::Full]));
    if status == RideStatus::Cancelled {
        update = update.col_expr(
            ride::Column::AvailableSeats,
            SimpleExpr::from(Expr::col(ride::Column::TotalSeats)),
        );
    }

    if update.exec(txn).await?.rows_affected == 0 {
        // Report why: missing, not ours, or already closed.
        owned_open_ride(txn, driver_id, ride_id).await?;
        return Err(AppError::RideUnavailable);
    }
    Ok(())
}

/// Moves every active booking of a ride, and its fare transaction, to the
/// ride's final state. Returns how many bookings moved.
async fn sweep_bookings(
    txn: &DatabaseTransaction,
    ride_id: Uuid,
    status: BookingStatus,
    stamp: DateTime<FixedOffset>,
) -> AppResult<usize> {
    let active_bookings = active_booking_ids(txn, ride_id).await?;
    if active_bookings.is_empty() {
        return Ok(0);
    }

    booking::Entity::update_many()
        .col_expr(booking::Column::Status, status.as_enum())
        .col_expr(booking::Column::UpdatedAt, Expr::value(stamp))
        .filter(booking::Column::Id.is_in(active_bookings.iter().copied()))
        .exec(txn)
        .await?;

    let transaction_status = match status {
        BookingStatus::Completed => TransactionStatus::Completed,
        _ => TransactionStatus::Cancelled,
    };
    settle_transactions(txn, &active_bookings, transaction_status, stamp).await?;

    Ok(active_bookings.len())
}

async fn reload(txn: &DatabaseTransaction, ride_id: Uuid) -> AppResult<ride::Model> {
    ride::Entity::find_by_id(ride_id)
        .one(txn)
        .await?
        .ok_or(AppError::RideNotFound)
}

async fn ensure_no_active_booking(
    txn: &DatabaseTransaction,
    ride_id: Uuid,
    passenger_id: Uuid,
) -> AppResult<()> {
    let existing = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::PassengerId.eq(passenger_id))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
        .count(txn)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "You already have a booking for this ride".to_string(),
        ));
    }
    Ok(())
}

async fn mark_full_if_sold_out(txn: &DatabaseTransaction, ride_id: Uuid) -> AppResult<()> {
    ride::Entity::update_many()
        .col_expr(ride::Column::Status, RideStatus::Full.as_enum())
        .filter(ride::Column::Id.eq(ride_id))
        .filter(ride::Column::Status.eq(RideStatus::Available))
        .filter(ride::Column::AvailableSeats.eq(0))
        .exec(txn)
        .await?;
    Ok(())
}

async fn restore_seats(
    txn: &DatabaseTransaction,
    ride_id: Uuid,
    seats: i32,
    stamp: DateTime<FixedOffset>,
) -> AppResult<()> {
    // Never credit past the posted capacity.
    let credited = ride::Entity::update_many()
        .col_expr(
            ride::Column::AvailableSeats,
            Expr::col(ride::Column::AvailableSeats).add(seats),
        )
        .col_expr(ride::Column::UpdatedAt, Expr::value(stamp))
        .filter(ride::Column::Id.eq(ride_id))
        .filter(Expr::col(ride::Column::AvailableSeats).lte(Expr::col(ride::Column::TotalSeats).sub(seats)))
        .exec(txn)
        .await?;

    if credited.rows_affected == 0 {
        tracing::error!(%ride_id, seats, "Seat ledger out of balance on release");
        return Err(AppError::Internal(format!(
            "Seat ledger out of balance for ride {}",
            ride_id
        )));
    }

    // Only a sold-out ride reopens; completed and cancelled rides stay closed.
    ride::Entity::update_many()
        .col_expr(ride::Column::Status, RideStatus::Available.as_enum())
        .filter(ride::Column::Id.eq(ride_id))
        .filter(ride::Column::Status.eq(RideStatus::Full))
        .filter(ride::Column::AvailableSeats.gt(0))
        .exec(txn)
        .await?;

    Ok(())
}

async fn owned_open_ride<C: ConnectionTrait>(
    db: &C,
    driver_id: Uuid,
    ride_id: Uuid,
) -> AppResult<ride::Model> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(db)
        .await?
        .ok_or(AppError::RideNotFound)?;

    if ride.driver_id != driver_id {
        return Err(AppError::Forbidden(
            "You can only manage your own rides".to_string(),
        ));
    }
    if ride.status.is_terminal() {
        return Err(AppError::BadRequest(format!(
            "Ride is already {}",
            ride.status.to_value()
        )));
    }
    Ok(ride)
}

async fn active_booking_ids<C: ConnectionTrait>(db: &C, ride_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::Status.is_in(BookingStatus::ACTIVE))
        .all(db)
        .await?
        .into_iter()
        .map(|b| b.id)
        .collect();
    Ok(ids)
}

async fn settle_transactions<C: ConnectionTrait>(
    db: &C,
    booking_ids: &[Uuid],
    status: TransactionStatus,
    stamp: DateTime<FixedOffset>,
) -> AppResult<()> {
    if booking_ids.is_empty() {
        return Ok(());
    }

    transaction::Entity::update_many()
        .col_expr(transaction::Column::Status, Expr::value(status))
        .col_expr(transaction::Column::UpdatedAt, Expr::value(stamp))
        .filter(transaction::Column::BookingId.is_in(booking_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(())
}

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking;
use crate::error::AppResult;
use crate::services::bookings::{self, PassengerBookings};
use crate::services::capability::Identity;
use crate::services::fares::FareSplit;
use crate::services::ledger::{self, ReleaseOutcome};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub ride_id: Uuid,
    pub seats: i32,
}

#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    pub booking: booking::Model,
    pub total_fare: i64,
}

/// Book seats on a ride
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<Json<BookingCreatedResponse>> {
    let booking = ledger::reserve(&state.db, payload.ride_id, identity.user_id, payload.seats).await?;
    let total_fare = FareSplit::for_seats(booking.seats_booked).total_amount;

    Ok(Json(BookingCreatedResponse {
        booking,
        total_fare,
    }))
}

/// List the passenger's bookings, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<PassengerBookings>> {
    let listing = bookings::passenger_bookings(&state.db, identity.user_id).await?;
    Ok(Json(listing))
}

/// Cancel a booking and hand its seats back. Repeating the call is a no-op.
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReleaseOutcome>> {
    let outcome = bookings::cancel_own_booking(&state.db, identity.user_id, id).await?;
    Ok(Json(outcome))
}

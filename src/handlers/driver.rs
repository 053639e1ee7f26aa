use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::entities::{booking, driver_subscription, ride};
use crate::error::AppResult;
use crate::services::capability::Identity;
use crate::services::rides::{self as ride_service, DriverRides, NewRide, RidePassengers};
use crate::services::{ledger, subscriptions};
use crate::services::subscriptions::SubscriptionSummary;
use crate::AppState;

/// Post a new ride. Requires an active subscription.
pub async fn post_ride(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<NewRide>,
) -> AppResult<Json<ride::Model>> {
    let created = ride_service::post_ride(&state.db, identity.user_id, payload).await?;
    Ok(Json(created))
}

/// List the driver's rides, newest departure first
pub async fn my_rides(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<DriverRides>> {
    let rides = ride_service::driver_rides(&state.db, identity.user_id).await?;
    Ok(Json(rides))
}

/// Bookings on one of the driver's rides
pub async fn ride_passengers(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RidePassengers>> {
    let passengers = ride_service::ride_passengers(&state.db, identity.user_id, id).await?;
    Ok(Json(passengers))
}

/// Mark a ride as completed
pub async fn complete_ride(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let updated = ledger::complete_ride(&state.db, identity.user_id, id).await?;
    Ok(Json(updated))
}

/// Cancel a ride and every booking on it
pub async fn cancel_ride(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ride::Model>> {
    let updated = ledger::cancel_ride(&state.db, identity.user_id, id).await?;
    Ok(Json(updated))
}

/// Confirm a pending booking on one of the driver's rides
pub async fn confirm_booking(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<booking::Model>> {
    let confirmed = ledger::confirm_booking(&state.db, identity.user_id, id).await?;
    Ok(Json(confirmed))
}

/// Current subscription state for the driver dashboard
pub async fn get_subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<SubscriptionSummary>> {
    let current = subscriptions::current_subscription(&state.db, identity.user_id).await?;
    Ok(Json(subscriptions::summarize(current, Utc::now())))
}

#[derive(Debug, Deserialize)]
pub struct ActivateSubscriptionRequest {
    pub payment_id: Uuid,
}

/// Turn a completed subscription payment into a subscription period
pub async fn activate_subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<ActivateSubscriptionRequest>,
) -> AppResult<Json<driver_subscription::Model>> {
    let subscription =
        subscriptions::activate(&state.db, identity.user_id, payload.payment_id).await?;
    Ok(Json(subscription))
}

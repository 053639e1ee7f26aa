use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::profile::UserRole;
use crate::entities::ride::RideStatus;
use crate::entities::user_role::AppRole;
use crate::entities::{mobile_money_payment, profile, ride, transaction, user, user_role};
use crate::error::AppResult;
use crate::services::{accounts, payments};
use crate::services::capability::Identity;
use crate::services::stats::{self, PlatformStats};
use crate::AppState;

const RECENT_LIMIT: u64 = 20;

// ============ Dashboard ============

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<PlatformStats>> {
    Ok(Json(stats::platform_stats(&state.db).await?))
}

/// Latest transactions (admin)
pub async fn recent_transactions(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<transaction::Model>>> {
    let transactions = transaction::Entity::find()
        .order_by_desc(transaction::Column::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(&state.db)
        .await?;

    Ok(Json(transactions))
}

/// Payments collected for bookings cancelled before settlement (admin)
pub async fn refunds_due(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<mobile_money_payment::Model>>> {
    Ok(Json(payments::refunds_due(&state.db).await?))
}

#[derive(Debug, Serialize)]
pub struct AdminRideResponse {
    pub id: Uuid,
    pub driver_name: String,
    pub pickup_location: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub total_seats: i32,
    pub available_seats: i32,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
}

/// Latest rides with their driver (admin)
pub async fn recent_rides(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<AdminRideResponse>>> {
    let rides = ride::Entity::find()
        .order_by_desc(ride::Column::CreatedAt)
        .limit(RECENT_LIMIT)
        .all(&state.db)
        .await?;

    let drivers = profile::Entity::find()
        .filter(profile::Column::UserId.is_in(rides.iter().map(|r| r.driver_id)))
        .all(&state.db)
        .await?;

    let responses = rides
        .into_iter()
        .map(|r| AdminRideResponse {
            id: r.id,
            driver_name: drivers
                .iter()
                .find(|d| d.user_id == r.driver_id)
                .map(|d| d.full_name.clone())
                .unwrap_or_default(),
            pickup_location: r.pickup_location,
            destination: r.destination,
            departure_time: r.departure_time.with_timezone(&Utc),
            total_seats: r.total_seats,
            available_seats: r.available_seats,
            status: r.status,
            created_at: r.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(responses))
}

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub is_admin: bool,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// List all users with their marketplace role and admin flag (admin)
pub async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find()
        .order_by_desc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;
    let profiles = profile::Entity::find().all(&state.db).await?;
    let admins = user_role::Entity::find()
        .filter(user_role::Column::Role.eq(AppRole::Admin))
        .all(&state.db)
        .await?;

    let responses = users
        .into_iter()
        .map(|u| {
            let p = profiles.iter().find(|p| p.user_id == u.id);
            UserResponse {
                id: u.id,
                full_name: p.map(|p| p.full_name.clone()),
                role: p.map(|p| p.role),
                is_admin: admins.iter().any(|a| a.user_id == u.id),
                email_confirmed: u.email_confirmed_at.is_some(),
                email: u.email,
                created_at: u.created_at.with_timezone(&Utc),
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Grant the admin capability (admin)
pub async fn grant_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    accounts::grant_admin(&state.db, id).await?;
    Ok(Json(json!({ "message": "Admin access granted" })))
}

/// Revoke the admin capability (admin). Admins cannot revoke their own.
pub async fn revoke_admin(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    accounts::revoke_admin(&state.db, identity.user_id, id).await?;
    Ok(Json(json!({ "message": "Admin access revoked" })))
}

use axum::{
    extract::{Path, Query, State},
    Json,
};
use sea_orm::EntityTrait;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::ride;
use crate::error::{AppError, AppResult};
use crate::services::rides::{self, DriverCard, RideSearch};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RideResponse {
    #[serde(flatten)]
    pub ride: ride::Model,
    pub driver: Option<DriverCard>,
}

/// Search bookable rides. All filters are optional.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<RideSearch>,
) -> AppResult<Json<Vec<RideResponse>>> {
    let found = rides::search_rides(&state.db, &params).await?;

    let driver_ids: Vec<Uuid> = found.iter().map(|r| r.driver_id).collect();
    let cards = rides::driver_cards(&state.db, &driver_ids).await?;

    let responses = found
        .into_iter()
        .map(|r| RideResponse {
            driver: cards.get(&r.driver_id).cloned(),
            ride: r,
        })
        .collect();

    Ok(Json(responses))
}

/// Get a single ride with its driver
pub async fn get_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RideResponse>> {
    let found = ride::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::RideNotFound)?;

    let mut cards = rides::driver_cards(&state.db, &[found.driver_id]).await?;
    Ok(Json(RideResponse {
        driver: cards.remove(&found.driver_id),
        ride: found,
    }))
}

use axum::{extract::State, Extension, Json};

use crate::entities::rating;
use crate::error::AppResult;
use crate::services::capability::Identity;
use crate::services::ratings::{self, NewRating};
use crate::AppState;

pub async fn create_rating(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<NewRating>,
) -> AppResult<Json<rating::Model>> {
    let saved = ratings::rate(&state.db, identity.user_id, payload).await?;
    Ok(Json(saved))
}

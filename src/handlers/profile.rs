use axum::{extract::State, Extension, Json};

use crate::entities::driver_details;
use crate::error::AppResult;
use crate::services::capability::Identity;
use crate::services::profiles::{
    self, OnboardRequest, ProfileView, UpdateProfileRequest, VehicleRequest,
};
use crate::AppState;

/// Current user's profile, or only the access state before onboarding
pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ProfileView>> {
    Ok(Json(profiles::load(&state.db, &identity).await?))
}

/// Pick a role and create the profile. Drivers register their vehicle here.
pub async fn onboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<OnboardRequest>,
) -> AppResult<Json<ProfileView>> {
    profiles::onboard(&state.db, identity.user_id, &identity.email, payload).await?;
    Ok(Json(profiles::load(&state.db, &identity).await?))
}

/// Update name, phone or avatar. The role cannot be changed.
pub async fn update(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileView>> {
    profiles::update_profile(&state.db, identity.user_id, payload).await?;
    Ok(Json(profiles::load(&state.db, &identity).await?))
}

/// Replace the driver's vehicle details
pub async fn update_vehicle(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<VehicleRequest>,
) -> AppResult<Json<driver_details::Model>> {
    let saved = profiles::save_vehicle(&state.db, identity.user_id, payload).await?;
    Ok(Json(saved))
}

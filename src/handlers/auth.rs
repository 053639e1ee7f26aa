use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::entities::user;
use crate::error::AppResult;
use crate::services::accounts;
use crate::utils::jwt::create_token;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed: bool,
}

impl From<&user::Model> for UserInfo {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            email_confirmed: user.email_confirmed_at.is_some(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Absent while the email still has to be confirmed.
    pub token: Option<String>,
    pub user: UserInfo,
    pub confirmation_required: bool,
}

fn issue_token(state: &AppState, user: &user::Model) -> AppResult<String> {
    create_token(
        user.id,
        &user.email,
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )
}

/// Register a new account. The profile is created later during onboarding.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let confirmation_required = state.config.require_email_confirmation;
    let user = accounts::register(
        &state.db,
        &payload.email,
        &payload.password,
        confirmation_required,
    )
    .await?;

    let token = if confirmation_required {
        // Sandbox mode: no mailer, the link is only logged
        if let Some(code) = &user.confirmation_token {
            tracing::info!(user_id = %user.id, "Confirmation link: /api/auth/confirm?token={}", code);
        }
        None
    } else {
        Some(issue_token(&state, &user)?)
    };

    Ok(Json(RegisterResponse {
        token,
        user: UserInfo::from(&user),
        confirmation_required,
    }))
}

/// Confirm an email address with the token issued at registration
pub async fn confirm(
    State(state): State<AppState>,
    Json(payload): Json<ConfirmRequest>,
) -> AppResult<Json<Value>> {
    accounts::confirm_email(&state.db, &payload.token).await?;
    Ok(Json(json!({ "message": "Email confirmed. You can now sign in." })))
}

/// Login with email and password
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = accounts::authenticate(
        &state.db,
        &payload.email,
        &payload.password,
        state.config.require_email_confirmation,
    )
    .await?;

    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse {
        token,
        user: UserInfo::from(&user),
    }))
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::error::{AppError, AppResult};
use crate::services::capability::{self, Access, Identity};
use crate::utils::jwt::verify_token;
use crate::AppState;

/// Validate the bearer token and resolve the caller's capabilities
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    let identity = capability::resolve(&state.db, claims.sub, &claims.email).await?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn identity(request: &Request) -> AppResult<&Identity> {
    request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))
}

/// Require a completed profile, any role
pub async fn require_profile(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    identity(&request)?.require_onboarded()?;
    Ok(next.run(request).await)
}

/// Require passenger role
pub async fn require_passenger(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    identity(&request)?.require_access(Access::Passenger)?;
    Ok(next.run(request).await)
}

/// Require driver role
pub async fn require_driver(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    identity(&request)?.require_access(Access::Driver)?;
    Ok(next.run(request).await)
}

/// Require the admin capability
pub async fn require_admin(
    request: Request,
    next: Next,
) -> AppResult<Response> {
    identity(&request)?.require_admin()?;
    Ok(next.run(request).await)
}

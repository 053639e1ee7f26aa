use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

const GENERIC_FAILURE: &str = "An error occurred. Please try again.";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not enough seats: requested {requested}, available {available}")]
    InsufficientCapacity { requested: i32, available: i32 },

    #[error("ride is not available")]
    RideUnavailable,

    #[error("ride not found")]
    RideNotFound,

    #[error("booking not found")]
    BookingNotFound,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("email not confirmed")]
    EmailNotConfirmed,

    #[error("user already registered")]
    AlreadyRegistered,

    #[error("profile onboarding required")]
    OnboardingRequired,

    #[error("active driver subscription required")]
    SubscriptionRequired,

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_)
            | AppError::EmailNotConfirmed
            | AppError::OnboardingRequired
            | AppError::SubscriptionRequired => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::RideNotFound | AppError::BookingNotFound => {
                StatusCode::NOT_FOUND
            }
            AppError::Conflict(_)
            | AppError::InsufficientCapacity { .. }
            | AppError::RideUnavailable
            | AppError::AlreadyRegistered => StatusCode::CONFLICT,
            AppError::Database(e) => DbFailure::classify(&e.to_string()).status_code(),
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Backend error text never leaks.
    pub fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::InsufficientCapacity { .. } => {
                "Not enough seats available for this ride.".to_string()
            }
            AppError::RideUnavailable => {
                "This ride is no longer available for booking.".to_string()
            }
            AppError::RideNotFound => "The ride could not be found.".to_string(),
            AppError::BookingNotFound => "The booking could not be found.".to_string(),
            AppError::InvalidCredentials => "Invalid email or password.".to_string(),
            AppError::EmailNotConfirmed => {
                "Please confirm your email address before signing in.".to_string()
            }
            AppError::AlreadyRegistered => {
                "An account with this email already exists.".to_string()
            }
            AppError::OnboardingRequired => {
                "Please complete your profile before continuing.".to_string()
            }
            AppError::SubscriptionRequired => {
                "An active driver subscription is required for this action.".to_string()
            }
            AppError::Database(e) => DbFailure::classify(&e.to_string()).message().to_string(),
            AppError::Internal(_) => GENERIC_FAILURE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = Json(json!({ "error": self.public_message() }));
        (status, body).into_response()
    }
}

/// Known classes of backend failure, recognised from the driver's error text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFailure {
    Duplicate,
    MissingReference,
    MissingField,
    InvalidData,
    NotEnoughSeats,
    RideUnavailable,
    RideNotFound,
    PermissionDenied,
    InvalidLogin,
    EmailNotConfirmed,
    AlreadyRegistered,
    Unknown,
}

impl DbFailure {
    pub fn classify(raw: &str) -> Self {
        let message = raw.to_lowercase();
        let has = |needle: &str| message.contains(needle);

        if has("duplicate key") || has("already exists") || has("unique constraint") {
            DbFailure::Duplicate
        } else if has("foreign key") {
            DbFailure::MissingReference
        } else if has("not-null constraint") || has("not null constraint") || has("required") {
            DbFailure::MissingField
        } else if has("check constraint") {
            DbFailure::InvalidData
        } else if has("not enough seats") {
            DbFailure::NotEnoughSeats
        } else if has("ride is not available") {
            DbFailure::RideUnavailable
        } else if has("ride not found") {
            DbFailure::RideNotFound
        } else if has("unauthorized") || has("permission") {
            DbFailure::PermissionDenied
        } else if has("invalid login") || has("invalid email or password") {
            DbFailure::InvalidLogin
        } else if has("email not confirmed") {
            DbFailure::EmailNotConfirmed
        } else if has("user already registered") {
            DbFailure::AlreadyRegistered
        } else {
            DbFailure::Unknown
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            DbFailure::Duplicate => "This record already exists.",
            DbFailure::MissingReference => "A referenced item was not found.",
            DbFailure::MissingField => "A required field is missing.",
            DbFailure::InvalidData => "Invalid data provided.",
            DbFailure::NotEnoughSeats => "Not enough seats available for this ride.",
            DbFailure::RideUnavailable => "This ride is no longer available for booking.",
            DbFailure::RideNotFound => "The ride could not be found.",
            DbFailure::PermissionDenied => "You do not have permission for this action.",
            DbFailure::InvalidLogin => "Invalid email or password.",
            DbFailure::EmailNotConfirmed => "Please confirm your email address before signing in.",
            DbFailure::AlreadyRegistered => "An account with this email already exists.",
            DbFailure::Unknown => GENERIC_FAILURE,
        }
    }

    pub fn status_code(self) -> StatusCode {
        match self {
            DbFailure::Duplicate
            | DbFailure::MissingReference
            | DbFailure::NotEnoughSeats
            | DbFailure::RideUnavailable
            | DbFailure::AlreadyRegistered => StatusCode::CONFLICT,
            DbFailure::MissingField | DbFailure::InvalidData => StatusCode::BAD_REQUEST,
            DbFailure::RideNotFound => StatusCode::NOT_FOUND,
            DbFailure::PermissionDenied | DbFailure::EmailNotConfirmed => StatusCode::FORBIDDEN,
            DbFailure::InvalidLogin => StatusCode::UNAUTHORIZED,
            DbFailure::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_postgres_unique_violation() {
        let raw = r#"error returned from database: duplicate key value violates unique constraint "profiles_user_id_key""#;
        assert_eq!(DbFailure::classify(raw), DbFailure::Duplicate);
        assert_eq!(DbFailure::classify(raw).message(), "This record already exists.");
    }

    #[test]
    fn test_classifies_sqlite_constraint_messages() {
        assert_eq!(
            DbFailure::classify("UNIQUE constraint failed: users.email"),
            DbFailure::Duplicate
        );
        assert_eq!(
            DbFailure::classify("FOREIGN KEY constraint failed"),
            DbFailure::MissingReference
        );
        assert_eq!(
            DbFailure::classify("CHECK constraint failed: available_seats >= 0"),
            DbFailure::InvalidData
        );
    }

    #[test]
    fn test_unknown_errors_use_generic_message() {
        let err = AppError::Database(DbErr::Custom("relation \"rides\" does not exist".into()));
        assert_eq!(err.public_message(), GENERIC_FAILURE);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_text_is_hidden() {
        let err = AppError::Internal("Failed to parse password hash: bad salt".into());
        assert_eq!(err.public_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_domain_errors_have_fixed_messages() {
        let err = AppError::InsufficientCapacity {
            requested: 3,
            available: 1,
        };
        assert_eq!(err.public_message(), "Not enough seats available for this ride.");
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        assert_eq!(
            AppError::RideUnavailable.public_message(),
            "This ride is no longer available for booking."
        );
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::OnboardingRequired.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_trigger_style_messages_are_mapped() {
        assert_eq!(
            DbFailure::classify("P0001: Not enough seats available"),
            DbFailure::NotEnoughSeats
        );
        assert_eq!(
            DbFailure::classify("Email not confirmed"),
            DbFailure::EmailNotConfirmed
        );
        assert_eq!(
            DbFailure::classify("permission denied for table rides"),
            DbFailure::PermissionDenied
        );
    }
}

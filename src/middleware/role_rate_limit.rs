use std::sync::Arc;

use axum::http::Request;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::KeyExtractor, GovernorError, GovernorLayer,
};
use uuid::Uuid;

use crate::middleware::rate_limit::rate_limit_error_handler;
use crate::services::capability::Identity;

/// Keys the limiter on the identity resolved by `auth_middleware`, so it must
/// sit inside that layer.
#[derive(Debug, Clone, Copy)]
pub struct IdentityKeyExtractor;

impl KeyExtractor for IdentityKeyExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Identity>()
            .map(|identity| identity.user_id)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

pub type RoleGovernorLayer = GovernorLayer<
    IdentityKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    axum::body::Body,
>;

/// Per-user budgets. Admin routes rely on the global IP limiter only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitedRole {
    Passenger,
    Driver,
    /// Routes shared by drivers and passengers (profile, payments, ratings).
    Member,
}

impl RateLimitedRole {
    /// (milliseconds per token, burst)
    fn budget(self) -> (u64, u32) {
        match self {
            // 500 requests per minute
            RateLimitedRole::Driver => (120, 500),
            // 100 requests per minute
            RateLimitedRole::Passenger => (600, 100),
            // 300 requests per minute
            RateLimitedRole::Member => (200, 300),
        }
    }

    #[cfg(test)]
    fn per_minute(self) -> u64 {
        60_000 / self.budget().0
    }
}

pub fn create_role_governor(role: RateLimitedRole) -> RoleGovernorLayer {
    let (per_ms, burst) = role.budget();
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(burst)
            .key_extractor(IdentityKeyExtractor)
            .finish()
            .expect("role governor config"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::capability::Access;

    #[test]
    fn test_key_is_resolved_user() {
        let user_id = Uuid::new_v4();
        let mut req = Request::new(());
        req.extensions_mut().insert(Identity {
            user_id,
            email: "driver@example.com".to_string(),
            access: Access::Driver,
            is_admin: false,
        });

        assert_eq!(IdentityKeyExtractor.extract(&req).unwrap(), user_id);
    }

    #[test]
    fn test_shared_routes_do_not_starve_either_role() {
        let member = RateLimitedRole::Member;
        assert!(member.budget().1 >= RateLimitedRole::Passenger.budget().1);
        assert!(member.per_minute() >= RateLimitedRole::Passenger.per_minute());
        assert!(member.per_minute() <= RateLimitedRole::Driver.per_minute());

        assert_eq!(RateLimitedRole::Driver.per_minute(), 500);
        assert_eq!(RateLimitedRole::Passenger.per_minute(), 100);
        assert_eq!(member.per_minute(), 300);

        // Building the layer validates the config
        let _layer = create_role_governor(member);
    }

    #[test]
    fn test_missing_identity_is_rejected() {
        let req = Request::new(());
        assert!(matches!(
            IdentityKeyExtractor.extract(&req),
            Err(GovernorError::UnableToExtractKey)
        ));
    }
}

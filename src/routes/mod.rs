use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, driver, passenger, payments, profile, ratings, rides};
use crate::middleware::auth::{
    auth_middleware, require_admin, require_driver, require_passenger, require_profile,
};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::{create_role_governor, RateLimitedRole};
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // IP-based governor for routes without a token
    let public_governor = create_public_governor();

    // Public routes
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/confirm", post(auth::confirm))
        .layer(public_governor.clone());

    let ride_routes = Router::new()
        .route("/", get(rides::search))
        .route("/{id}", get(rides::get_ride))
        .layer(public_governor);

    // Profile routes (auth only, so users can onboard)
    let profile_routes = Router::new()
        .route("/", get(profile::me).put(profile::update))
        .route("/onboard", post(profile::onboard))
        .route(
            "/vehicle",
            put(profile::update_vehicle).route_layer(middleware::from_fn(require_driver)),
        )
        .layer(create_role_governor(RateLimitedRole::Member))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Routes open to any onboarded user, driver or passenger
    // Rate limit: 300 requests per minute, shared by both roles
    let member_routes = Router::new()
        .route("/payments", post(payments::create_payment))
        .route("/payments/{id}", get(payments::get_payment))
        .route("/ratings", post(ratings::create_rating))
        .layer(create_role_governor(RateLimitedRole::Member))
        .layer(middleware::from_fn(require_profile))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin capability)
    let admin_routes = Router::new()
        .route("/stats", get(admin::stats))
        .route("/transactions", get(admin::recent_transactions))
        .route("/payments/refunds", get(admin::refunds_due))
        .route("/rides", get(admin::recent_rides))
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}/admin",
            post(admin::grant_admin).delete(admin::revoke_admin),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Driver routes (requires auth + driver role)
    // Rate limit: 500 requests per minute
    let driver_routes = Router::new()
        .route("/rides", post(driver::post_ride).get(driver::my_rides))
        .route("/rides/{id}/passengers", get(driver::ride_passengers))
        .route("/rides/{id}/complete", post(driver::complete_ride))
        .route("/rides/{id}/cancel", post(driver::cancel_ride))
        .route("/bookings/{id}/confirm", post(driver::confirm_booking))
        .route(
            "/subscription",
            get(driver::get_subscription).post(driver::activate_subscription),
        )
        .layer(create_role_governor(RateLimitedRole::Driver))
        .layer(middleware::from_fn(require_driver))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Passenger routes (requires auth + passenger role)
    // Rate limit: 100 requests per minute
    let passenger_routes = Router::new()
        .route("/", post(passenger::create_booking).get(passenger::my_bookings))
        .route("/{id}", delete(passenger::cancel_booking))
        .layer(create_role_governor(RateLimitedRole::Passenger))
        .layer(middleware::from_fn(require_passenger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/rides", ride_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api", member_routes)
        .nest("/api/admin", admin_routes)
        .nest("/api/driver", driver_routes)
        .nest("/api/bookings", passenger_routes)
        .with_state(state)
}

pub mod admin;
pub mod auth;
pub mod driver;
pub mod passenger;
pub mod payments;
pub mod profile;
pub mod ratings;
pub mod rides;

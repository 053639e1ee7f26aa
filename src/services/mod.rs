pub mod accounts;
pub mod bookings;
pub mod capability;
pub mod fares;
pub mod ledger;
pub mod payments;
pub mod profiles;
pub mod ratings;
pub mod rides;
pub mod stats;
pub mod subscriptions;

pub mod booking;
pub mod driver_details;
pub mod driver_subscription;
pub mod mobile_money_payment;
pub mod profile;
pub mod rating;
pub mod ride;
pub mod transaction;
pub mod user;
pub mod user_role;

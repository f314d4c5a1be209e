pub mod accounts;
pub mod plans;
pub mod subscriptions;
pub mod users;

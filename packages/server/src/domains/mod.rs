// Business domains
pub mod auth;
pub mod jobs;
pub mod messaging;
pub mod recruiting;
pub mod users;

//! Recruiting domain - find workers for jobs and message them

pub mod activities;
pub mod models;

pub use activities::{create_recruits, list_recruits, CreateRecruits};
pub use models::{Recruit, RecruitRequest};

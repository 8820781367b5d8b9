// Common types and utilities shared across the application

pub mod entity_ids;
pub mod errors;
pub mod id;
pub mod phone;
pub mod types;
pub mod utils;

pub use entity_ids::{
    CompanyId, CrewId, InviteId, JobId, MessageId, MyworkerId, RecruitId, SmslogId, UserId,
};
pub use errors::{AppError, AppResult};
pub use id::Id;
pub use phone::{PhoneNumber, PhoneNumberError};
pub use types::*;
pub use utils::geo::GeoPoint;

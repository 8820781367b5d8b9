pub mod invite;
pub mod myworker;
pub mod user;

pub use invite::Invite;
pub use myworker::Myworker;
pub use user::{
    CompanyMembership, EligibilityFilter, NearQuery, User, UserType, WorkerLocation,
    WorkerProfile,
};

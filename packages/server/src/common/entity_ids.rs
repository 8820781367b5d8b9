//! Typed ID definitions for all domain entities.
//!
//! Marker types are never constructed; they only tag `Id<T>`.

pub use super::id::Id;

pub struct User;
pub struct Company;
pub struct Job;
pub struct Crew;
pub struct Myworker;
pub struct Invite;
pub struct Recruit;
pub struct Message;
pub struct Smslog;

pub type UserId = Id<User>;
pub type CompanyId = Id<Company>;
pub type JobId = Id<Job>;
pub type CrewId = Id<Crew>;
pub type MyworkerId = Id<Myworker>;
pub type InviteId = Id<Invite>;
pub type RecruitId = Id<Recruit>;
pub type MessageId = Id<Message>;
pub type SmslogId = Id<Smslog>;

pub mod recruit;

pub use recruit::{Recruit, RecruitRequest};

//! Jobs and the companies that post them. Read-only from this service.

pub mod models;

pub use models::{Company, Job, JobLocation};

// LaborHub - recruiting and messaging core
//
// This crate provides the backend API that lets companies broadcast jobs to
// nearby workers and message workers by app push or SMS invite.
// Architecture follows domain-driven design; infrastructure sits behind the
// traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod outbox;
pub mod postgres_store;
pub mod test_dependencies;
pub mod traits;

pub use deps::{MessagingSettings, ServerDeps, TwilioAdapter};
pub use outbox::{
    BaseDispatchQueue, ChannelDispatchQueue, DispatchReceiver, DispatchTask, DispatchWorker,
    Dispatcher,
};
pub use postgres_store::PostgresStore;
pub use test_dependencies::TestDependencies;
pub use traits::*;

pub mod build_recruit;
pub mod create_recruits;
pub mod resolve_recipients;

pub use build_recruit::record_recruit;
pub use create_recruits::{create_recruits, list_recruits, CreateRecruits};
pub use resolve_recipients::{resolve_recipients, RecipientQuery, ResolvedRecipients};

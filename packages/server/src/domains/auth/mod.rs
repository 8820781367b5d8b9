//! Auth domain - bearer token issue and verification
//!
//! Sign-in itself is handled by the account service; this service only
//! verifies the tokens it issues.

pub mod jwt;

pub use jwt::{Claims, JwtService};

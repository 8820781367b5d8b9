// HTTP routes
pub mod health;
pub mod messages;
pub mod params;
pub mod recruits;

pub use health::*;
pub use messages::*;
pub use recruits::*;

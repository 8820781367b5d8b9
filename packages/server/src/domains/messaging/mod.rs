//! Messaging domain - the fan-out engine behind every send
//!
//! Recruiting, surveys, application inquiries and direct messages all go
//! through `send_message`, which persists one Message per send and queues
//! push or SMS per receiver.

pub mod activities;
pub mod models;

pub use activities::{send_message, Recipient, SendMessage};
pub use models::{Message, MessageType};

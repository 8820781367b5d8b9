pub mod message;
pub mod smslog;

pub use message::{Message, MessageReceiver, MessageSender, MessageType, ReceiverStatus};
pub use smslog::{SmsOutcome, Smslog};

pub mod classify;
pub mod compose;
pub mod inbox;
pub mod send_message;
pub mod translate;

pub use classify::{classify_recipients, ClassifiedRecipients, Recipient};
pub use inbox::{list_messages, mark_message_read};
pub use send_message::{send_message, SendMessage};
pub use translate::fill_missing_translation;

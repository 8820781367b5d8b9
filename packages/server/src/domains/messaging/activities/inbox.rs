use tracing::{debug, info};

use crate::common::{AppError, AppResult, JobId, MessageId, UserId};
use crate::domains::messaging::models::{Message, ReceiverStatus};
use crate::kernel::ServerDeps;

/// Messages the user sent or received, newest first.
pub async fn list_messages(
    user_id: UserId,
    job_id: Option<JobId>,
    deps: &ServerDeps,
) -> AppResult<Vec<Message>> {
    let messages = deps.store.find_messages_for_user(user_id, job_id).await?;
    debug!(user_id = %user_id, count = messages.len(), "listed messages");
    Ok(messages)
}

/// Mark the user's receiver entry read. Other receivers are untouched.
pub async fn mark_message_read(
    user_id: UserId,
    message_id: MessageId,
    deps: &ServerDeps,
) -> AppResult<Message> {
    let message = deps
        .store
        .find_message(message_id)
        .await?
        .ok_or_else(|| AppError::validation(format!("Message {} not found", message_id)))?;

    if !message.is_addressed_to(user_id) {
        return Err(AppError::validation("You are not a receiver of this message"));
    }

    let unread = message
        .all_receivers()
        .any(|r| r.user_id == user_id && r.status == ReceiverStatus::New);
    if !unread {
        return Ok(message);
    }

    let updated = deps
        .store
        .mark_message_read(message_id, user_id)
        .await?
        .ok_or_else(|| AppError::validation(format!("Message {} not found", message_id)))?;
    info!(message_id = %message_id, user_id = %user_id, "message marked read");

    Ok(updated)
}

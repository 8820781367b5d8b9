use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::common::{
    AppError, AppResult, CompanyId, JobId, LocalizedText, MessageId, PhoneNumber, UserId,
};
use crate::domains::messaging::activities::{list_messages, mark_message_read};
use crate::domains::messaging::{send_message, Message, MessageType, Recipient, SendMessage};
use crate::server::app::AppState;
use crate::server::middleware::{require_auth, AuthUser};
use crate::server::routes::params::empty_string_as_none;

/// A receiver as clients send it: an object or a bare user id.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ReceiverInput {
    Object {
        user_id: UserId,
        #[serde(default)]
        company_id: Option<CompanyId>,
    },
    Id(UserId),
}

impl ReceiverInput {
    pub fn user_id(&self) -> UserId {
        match self {
            ReceiverInput::Object { user_id, .. } | ReceiverInput::Id(user_id) => *user_id,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SenderInput {
    pub user_id: UserId,
    #[serde(default)]
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_id: Option<JobId>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub sender: SenderInput,
    #[serde(default)]
    pub receivers: Vec<ReceiverInput>,
    /// Older clients send a single receiver
    #[serde(default)]
    pub receiver: Option<ReceiverInput>,
    #[serde(default)]
    pub receivers_phone_numbers: Vec<String>,
    pub message: LocalizedText,
    #[serde(default)]
    pub auto_translate: bool,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl SendMessageBody {
    /// Collapse every receiver shape into canonical recipients.
    pub fn recipients(&self) -> AppResult<Vec<Recipient>> {
        let mut recipients: Vec<Recipient> = self
            .receivers
            .iter()
            .chain(self.receiver.iter())
            .map(|r| Recipient::ByUserId(r.user_id()))
            .collect();

        for raw in &self.receivers_phone_numbers {
            let phone = PhoneNumber::parse(raw).map_err(|e| {
                AppError::validation(format!("Invalid phone number '{}': {}", raw, e))
            })?;
            recipients.push(Recipient::ByPhoneNumber(phone));
        }
        Ok(recipients)
    }
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: Message,
}

/// `POST /messages`
pub async fn send_message_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<SendMessageBody>, JsonRejection>,
) -> AppResult<Json<MessagesResponse>> {
    let user = require_auth(auth)?;
    let Json(body) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    if body.sender.user_id != user.user_id {
        return Err(AppError::validation("sender.user_id must be the signed-in user"));
    }
    if let Some(company_id) = body.sender.company_id {
        if Some(company_id) != user.company_id {
            return Err(AppError::validation("sender.company_id must be your own company"));
        }
    }

    let recipients = body.recipients()?;
    let request = SendMessage::builder()
        .sender_user_id(body.sender.user_id)
        .sender_company_id(body.sender.company_id)
        .message_type(body.message_type)
        .job_id(body.job_id)
        .body(body.message)
        .recipients(recipients)
        .metadata(body.metadata)
        .auto_translate(body.auto_translate)
        .build();

    let message = send_message(request, &state.deps).await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages: vec![message],
    }))
}

/// `GET /messages?job_id=`
pub async fn list_messages_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<Json<MessagesResponse>> {
    let user = require_auth(auth)?;
    let messages = list_messages(user.user_id, query.job_id, &state.deps).await?;

    Ok(Json(MessagesResponse {
        success: true,
        messages,
    }))
}

/// `POST /messages/:id/read`
pub async fn mark_read_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Path(message_id): Path<MessageId>,
) -> AppResult<Json<MessageResponse>> {
    let user = require_auth(auth)?;
    let message = mark_message_read(user.user_id, message_id, &state.deps).await?;

    Ok(Json(MessageResponse {
        success: true,
        message,
    }))
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

use crate::common::{CompanyId, JobId, LocalizedText, MessageId, UserId};

/// Kind of conversation a message belongs to.
///
/// Survey messages carry their survey name in the tag, e.g. `survey-exit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MessageType {
    Message,
    Recruit,
    Application,
    Survey(String),
    Suggest,
    FacebookMessage,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::Message => f.write_str("message"),
            MessageType::Recruit => f.write_str("recruit"),
            MessageType::Application => f.write_str("application"),
            MessageType::Survey(name) => write!(f, "survey-{}", name),
            MessageType::Suggest => f.write_str("suggest"),
            MessageType::FacebookMessage => f.write_str("facebook-message"),
        }
    }
}

impl FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "message" => Ok(MessageType::Message),
            "recruit" => Ok(MessageType::Recruit),
            "application" => Ok(MessageType::Application),
            "suggest" => Ok(MessageType::Suggest),
            "facebook-message" => Ok(MessageType::FacebookMessage),
            other => match other.strip_prefix("survey-") {
                Some(name) if !name.is_empty() => Ok(MessageType::Survey(name.to_string())),
                _ => Err(format!("unknown message type '{}'", other)),
            },
        }
    }
}

impl TryFrom<String> for MessageType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MessageType> for String {
    fn from(value: MessageType) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiverStatus {
    #[default]
    New,
    Read,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSender {
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceiver {
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub status: ReceiverStatus,
}

impl MessageReceiver {
    pub fn new(user_id: UserId, company_id: Option<CompanyId>) -> Self {
        Self {
            user_id,
            company_id,
            status: ReceiverStatus::New,
        }
    }
}

/// One logical send. `receivers` is the fan-out unit; `receiver` is only
/// populated on records written before multi-receiver messages existed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub job_id: Option<JobId>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub sender: MessageSender,
    pub receivers: Vec<MessageReceiver>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver: Option<MessageReceiver>,
    pub message: LocalizedText,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub datetime: DateTime<Utc>,
}

impl Message {
    /// Every receiver entry, including the legacy singular one.
    pub fn all_receivers(&self) -> impl Iterator<Item = &MessageReceiver> {
        self.receivers.iter().chain(self.receiver.iter())
    }

    pub fn is_addressed_to(&self, user_id: UserId) -> bool {
        self.all_receivers().any(|r| r.user_id == user_id)
    }

    pub fn involves(&self, user_id: UserId) -> bool {
        self.sender.user_id == user_id || self.is_addressed_to(user_id)
    }

    /// Flip `new → read` for `user_id`'s entries. Returns whether anything changed.
    pub fn mark_read_by(&mut self, user_id: UserId) -> bool {
        let mut changed = false;
        for receiver in self.receivers.iter_mut().chain(self.receiver.iter_mut()) {
            if receiver.user_id == user_id && receiver.status == ReceiverStatus::New {
                receiver.status = ReceiverStatus::Read;
                changed = true;
            }
        }
        changed
    }
}

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: MessageId,
    job_id: Option<JobId>,
    message_type: String,
    sender_user_id: UserId,
    sender_company_id: Option<CompanyId>,
    receivers: Json<Vec<MessageReceiver>>,
    receiver: Option<Json<MessageReceiver>>,
    message: Json<LocalizedText>,
    metadata: Option<serde_json::Value>,
    datetime: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        Ok(Self {
            id: row.id,
            job_id: row.job_id,
            message_type: row.message_type.parse().map_err(anyhow::Error::msg)?,
            sender: MessageSender {
                user_id: row.sender_user_id,
                company_id: row.sender_company_id,
            },
            receivers: row.receivers.0,
            receiver: row.receiver.map(|r| r.0),
            message: row.message.0,
            metadata: row.metadata,
            datetime: row.datetime,
        })
    }
}

impl Message {
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        let row = sqlx::query_as::<_, MessageRow>(
            "INSERT INTO messages (
                id, job_id, message_type, sender_user_id, sender_company_id,
                receivers, receiver, message, metadata, datetime
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.job_id)
        .bind(self.message_type.to_string())
        .bind(self.sender.user_id)
        .bind(self.sender.company_id)
        .bind(Json(&self.receivers))
        .bind(self.receiver.as_ref().map(Json))
        .bind(Json(&self.message))
        .bind(&self.metadata)
        .bind(self.datetime)
        .fetch_one(pool)
        .await?;
        Message::try_from(row)
    }

    pub async fn find_by_id(id: MessageId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, MessageRow>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(Message::try_from)
            .transpose()
    }

    /// Messages sent by or addressed to `user_id`, newest first.
    pub async fn find_for_user(
        user_id: UserId,
        job_id: Option<JobId>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let containment = serde_json::json!([{ "user_id": user_id }]);
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages
             WHERE (receivers @> $1 OR receiver->>'user_id' = $2 OR sender_user_id = $3)
               AND ($4::uuid IS NULL OR job_id = $4)
             ORDER BY datetime DESC",
        )
        .bind(containment)
        .bind(user_id.to_string())
        .bind(user_id)
        .bind(job_id)
        .fetch_all(pool)
        .await?;
        rows.into_iter().map(Message::try_from).collect()
    }

    /// Flip one receiver's entries to `read` inside the row, so concurrent
    /// readers of the same message never overwrite each other.
    pub async fn mark_read_by_receiver(
        id: MessageId,
        user_id: UserId,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, MessageRow>(
            r#"UPDATE messages SET
                receivers = COALESCE(
                    (SELECT jsonb_agg(
                        CASE WHEN r->>'user_id' = $2
                             THEN jsonb_set(r, '{status}', '"read"')
                             ELSE r END
                        ORDER BY ord)
                     FROM jsonb_array_elements(receivers) WITH ORDINALITY AS e(r, ord)),
                    '[]'::jsonb),
                receiver = CASE WHEN receiver->>'user_id' = $2
                                THEN jsonb_set(receiver, '{status}', '"read"')
                                ELSE receiver END
             WHERE id = $1
             RETURNING *"#,
        )
        .bind(id)
        .bind(user_id.to_string())
        .fetch_optional(pool)
        .await?
        .map(Message::try_from)
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_to(receivers: Vec<MessageReceiver>) -> Message {
        Message {
            id: MessageId::new(),
            job_id: None,
            message_type: MessageType::Message,
            sender: MessageSender {
                user_id: UserId::new(),
                company_id: None,
            },
            receivers,
            receiver: None,
            message: LocalizedText::new("Hi", ""),
            metadata: None,
            datetime: Utc::now(),
        }
    }

    #[test]
    fn message_type_round_trips_survey_names() {
        let parsed: MessageType = "survey-exit".parse().unwrap();
        assert_eq!(parsed, MessageType::Survey("exit".to_string()));
        assert_eq!(parsed.to_string(), "survey-exit");
        assert!("survey-".parse::<MessageType>().is_err());
        assert!("broadcast".parse::<MessageType>().is_err());
    }

    #[test]
    fn message_type_serializes_as_tag_string() {
        let json = serde_json::to_value(MessageType::FacebookMessage).unwrap();
        assert_eq!(json, "facebook-message");
    }

    #[test]
    fn mark_read_only_touches_the_reader() {
        let reader = UserId::new();
        let other = UserId::new();
        let mut message = message_to(vec![
            MessageReceiver::new(reader, None),
            MessageReceiver::new(other, None),
        ]);

        assert!(message.mark_read_by(reader));
        assert_eq!(message.receivers[0].status, ReceiverStatus::Read);
        assert_eq!(message.receivers[1].status, ReceiverStatus::New);

        // already read
        assert!(!message.mark_read_by(reader));
    }

    #[test]
    fn legacy_receiver_counts_as_addressed() {
        let legacy = UserId::new();
        let mut message = message_to(Vec::new());
        message.receiver = Some(MessageReceiver::new(legacy, None));

        assert!(message.is_addressed_to(legacy));
        assert!(message.mark_read_by(legacy));
        assert_eq!(message.receiver.unwrap().status, ReceiverStatus::Read);
    }
}

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{CompanyId, MessageId, SmslogId, UserId};

/// Audit row for one outbound SMS attempt.
///
/// Written before the gateway call; `response` or `exception` is patched in
/// once the gateway answers.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Smslog {
    pub id: SmslogId,
    pub message_id: Option<MessageId>,
    pub sender_user_id: Option<UserId>,
    pub sender_company_id: Option<CompanyId>,
    pub receiver_user_id: Option<UserId>,
    pub receiver_phone: String,
    pub body: String,
    pub billable: bool,
    pub response: Option<serde_json::Value>,
    pub exception: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gateway result recorded onto an Smslog.
#[derive(Debug, Clone, PartialEq)]
pub enum SmsOutcome {
    Delivered(serde_json::Value),
    Failed(String),
}

impl Smslog {
    pub fn apply_outcome(&mut self, outcome: &SmsOutcome) {
        match outcome {
            SmsOutcome::Delivered(response) => self.response = Some(response.clone()),
            SmsOutcome::Failed(exception) => self.exception = Some(exception.clone()),
        }
        self.updated_at = Utc::now();
    }

    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO smslogs (
                id, message_id, sender_user_id, sender_company_id, receiver_user_id,
                receiver_phone, body, billable, response, exception, created_at, updated_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.message_id)
        .bind(self.sender_user_id)
        .bind(self.sender_company_id)
        .bind(self.receiver_user_id)
        .bind(&self.receiver_phone)
        .bind(&self.body)
        .bind(self.billable)
        .bind(&self.response)
        .bind(&self.exception)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn record_outcome(id: SmslogId, outcome: &SmsOutcome, pool: &PgPool) -> Result<()> {
        let (response, exception) = match outcome {
            SmsOutcome::Delivered(response) => (Some(response.clone()), None),
            SmsOutcome::Failed(exception) => (None, Some(exception.clone())),
        };

        sqlx::query(
            "UPDATE smslogs
             SET response = COALESCE($2, response),
                 exception = COALESCE($3, exception),
                 updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(response)
        .bind(exception)
        .execute(pool)
        .await?;
        Ok(())
    }
}

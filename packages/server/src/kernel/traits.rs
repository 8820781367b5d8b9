// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Recruiting and messaging rules live in the domain activities that use these traits.
//
// Naming convention: Base* for trait names (e.g., BaseStore, BaseSmsService)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::{
    CompanyId, JobId, Language, LocalizedText, MessageId, PhoneNumber, SmslogId, UserId,
};
use crate::domains::jobs::{Company, Job};
use crate::domains::messaging::models::{Message, SmsOutcome, Smslog};
use crate::domains::recruiting::models::Recruit;
use crate::domains::users::{Invite, Myworker, NearQuery, User};

// =============================================================================
// Push Notification Trait (Infrastructure)
// =============================================================================

/// Notification payload handed to the push provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    pub contents: LocalizedText,
    pub data: serde_json::Value,
}

#[async_trait]
pub trait BasePushNotificationService: Send + Sync {
    /// Deliver to every device token in `player_ids`
    async fn send_notification(
        &self,
        player_ids: &[String],
        notification: &PushNotification,
    ) -> Result<()>;
}

// =============================================================================
// SMS Trait (Infrastructure)
// =============================================================================

/// What the SMS gateway answered.
#[derive(Debug, Clone, PartialEq)]
pub struct SmsReceipt {
    pub sid: String,
    pub status: String,
    /// Full gateway response, stored on the Smslog
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait BaseSmsService: Send + Sync {
    /// `to` is the full number, `+<cc><local>`
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt>;
}

// =============================================================================
// Translation Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseTranslationService: Send + Sync {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String>;
}

// =============================================================================
// Store Trait (Infrastructure - persistence)
// =============================================================================

/// Result of an idempotent find-or-create.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert<T> {
    Created(T),
    Existing(T),
}

impl<T> Upsert<T> {
    pub fn from_pair((record, created): (T, bool)) -> Self {
        if created {
            Upsert::Created(record)
        } else {
            Upsert::Existing(record)
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Upsert::Created(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Upsert::Created(record) | Upsert::Existing(record) => record,
        }
    }
}

/// Document store used by recruiting and messaging.
///
/// Writes are single-record; nothing here spans a transaction.
#[async_trait]
pub trait BaseStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    // Jobs and companies
    async fn find_job(&self, id: JobId) -> Result<Option<Job>>;
    async fn find_jobs(&self, ids: &[JobId]) -> Result<Vec<Job>>;
    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>>;

    // Users
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>>;
    /// Matches on the (country_code, local_number) pair
    async fn find_users_by_phone(&self, phones: &[PhoneNumber]) -> Result<Vec<User>>;
    async fn find_users_near(&self, query: &NearQuery) -> Result<Vec<User>>;
    /// Insert keyed by phone pair; returns the existing user on conflict
    async fn find_or_create_user_by_phone(&self, user: &User) -> Result<Upsert<User>>;

    // Roster and invites
    async fn find_roster_user_ids(&self, company_id: CompanyId) -> Result<Vec<UserId>>;
    async fn find_or_create_myworker(
        &self,
        company_id: CompanyId,
        worker_user_id: UserId,
    ) -> Result<Upsert<Myworker>>;
    async fn find_or_create_invite(
        &self,
        company_id: CompanyId,
        phone_number: &PhoneNumber,
        user_id: UserId,
    ) -> Result<Upsert<Invite>>;

    // Recruits
    async fn insert_recruit(&self, recruit: &Recruit) -> Result<Recruit>;
    async fn find_recruits(
        &self,
        company_id: CompanyId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Recruit>>;

    // Messages
    async fn insert_message(&self, message: &Message) -> Result<Message>;
    async fn find_message(&self, id: MessageId) -> Result<Option<Message>>;
    /// Messages the user sent or receives, newest first
    async fn find_messages_for_user(
        &self,
        user_id: UserId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Message>>;
    /// Flip `user_id`'s receiver entries from `new` to `read` in place.
    /// Other entries are left as stored. Returns the updated message.
    async fn mark_message_read(
        &self,
        id: MessageId,
        user_id: UserId,
    ) -> Result<Option<Message>>;

    // SMS audit
    async fn insert_smslog(&self, log: &Smslog) -> Result<Smslog>;
    async fn record_smslog_outcome(&self, id: SmslogId, outcome: &SmsOutcome) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_tracks_creation() {
        let created = Upsert::from_pair((1, true));
        let existing = Upsert::from_pair((2, false));

        assert!(created.is_created());
        assert!(!existing.is_created());
        assert_eq!(existing.into_inner(), 2);
        assert_eq!(created.into_inner(), 1);
    }
}

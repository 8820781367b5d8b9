use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use crate::common::{CompanyId, JobId, MessageId, PhoneNumber, SmslogId, UserId};
use crate::domains::jobs::{Company, Job};
use crate::domains::messaging::models::{Message, SmsOutcome, Smslog};
use crate::domains::recruiting::models::Recruit;
use crate::domains::users::{Invite, Myworker, NearQuery, User};
use crate::kernel::{BaseStore, Upsert};

/// `BaseStore` over Postgres. Queries live on the models; this only routes.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
        Job::find_by_id(id, &self.pool).await
    }

    async fn find_jobs(&self, ids: &[JobId]) -> Result<Vec<Job>> {
        Job::find_by_ids(ids, &self.pool).await
    }

    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>> {
        Company::find_by_id(id, &self.pool).await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        User::find_by_id(id, &self.pool).await
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        User::find_by_ids(ids, &self.pool).await
    }

    async fn find_users_by_phone(&self, phones: &[PhoneNumber]) -> Result<Vec<User>> {
        User::find_by_phone_numbers(phones, &self.pool).await
    }

    async fn find_users_near(&self, query: &NearQuery) -> Result<Vec<User>> {
        User::find_near(query, &self.pool).await
    }

    async fn find_or_create_user_by_phone(&self, user: &User) -> Result<Upsert<User>> {
        user.insert_or_find_by_phone(&self.pool)
            .await
            .map(Upsert::from_pair)
    }

    async fn find_roster_user_ids(&self, company_id: CompanyId) -> Result<Vec<UserId>> {
        Myworker::find_worker_ids_for_company(company_id, &self.pool).await
    }

    async fn find_or_create_myworker(
        &self,
        company_id: CompanyId,
        worker_user_id: UserId,
    ) -> Result<Upsert<Myworker>> {
        Myworker::find_or_create(company_id, worker_user_id, &self.pool)
            .await
            .map(Upsert::from_pair)
    }

    async fn find_or_create_invite(
        &self,
        company_id: CompanyId,
        phone_number: &PhoneNumber,
        user_id: UserId,
    ) -> Result<Upsert<Invite>> {
        Invite::find_or_create(company_id, phone_number, user_id, &self.pool)
            .await
            .map(Upsert::from_pair)
    }

    async fn insert_recruit(&self, recruit: &Recruit) -> Result<Recruit> {
        recruit.insert(&self.pool).await
    }

    async fn find_recruits(
        &self,
        company_id: CompanyId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Recruit>> {
        Recruit::find_for_company(company_id, job_id, &self.pool).await
    }

    async fn insert_message(&self, message: &Message) -> Result<Message> {
        message.insert(&self.pool).await
    }

    async fn find_message(&self, id: MessageId) -> Result<Option<Message>> {
        Message::find_by_id(id, &self.pool).await
    }

    async fn find_messages_for_user(
        &self,
        user_id: UserId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Message>> {
        Message::find_for_user(user_id, job_id, &self.pool).await
    }

    async fn mark_message_read(
        &self,
        id: MessageId,
        user_id: UserId,
    ) -> Result<Option<Message>> {
        Message::mark_read_by_receiver(id, user_id, &self.pool).await
    }

    async fn insert_smslog(&self, log: &Smslog) -> Result<Smslog> {
        log.insert(&self.pool).await
    }

    async fn record_smslog_outcome(&self, id: SmslogId, outcome: &SmsOutcome) -> Result<()> {
        Smslog::record_outcome(id, outcome, &self.pool).await
    }
}

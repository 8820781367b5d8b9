// Test dependencies and mock implementations
//
// Provides mock implementations of all infrastructure traits for testing.
// The in-memory store stands in for Postgres so activities and routes can be
// exercised without a database.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::common::utils::geo::{central_angle, BoundingBox};
use crate::common::{
    CompanyId, JobId, Language, MessageId, PhoneNumber, RecruitId, SmslogId, UserId,
};
use crate::domains::auth::JwtService;
use crate::domains::jobs::{Company, Job};
use crate::domains::messaging::models::{Message, SmsOutcome, Smslog};
use crate::domains::recruiting::models::Recruit;
use crate::domains::users::{Invite, Myworker, NearQuery, User};
use crate::kernel::{
    BaseDispatchQueue, BasePushNotificationService, BaseSmsService, BaseStore,
    BaseTranslationService, DispatchTask, Dispatcher, MessagingSettings, PushNotification,
    ServerDeps, SmsReceipt, Upsert,
};

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_JWT_ISSUER: &str = "laborhub-test";

// =============================================================================
// Memory Store
// =============================================================================

/// Write log entry, in the order writes hit the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    User(UserId),
    Myworker(CompanyId, UserId),
    Invite(CompanyId, UserId),
    Recruit(RecruitId),
    Message(MessageId),
    MessageUpdate(MessageId),
    Smslog(SmslogId),
}

#[derive(Default)]
struct MemoryState {
    jobs: Vec<Job>,
    companies: Vec<Company>,
    users: Vec<User>,
    myworkers: Vec<Myworker>,
    invites: Vec<Invite>,
    recruits: Vec<Recruit>,
    messages: Vec<Message>,
    smslogs: Vec<Smslog>,
    writes: Vec<StoreWrite>,
}

pub struct MemoryStore {
    state: Mutex<MemoryState>,
    failing_phones: Mutex<Vec<PhoneNumber>>,
    failing_geo: Mutex<bool>,
    yielding_message_reads: Mutex<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            failing_phones: Mutex::new(Vec::new()),
            failing_geo: Mutex::new(false),
            yielding_message_reads: Mutex::new(false),
        }
    }

    pub fn with_job(self, job: Job) -> Self {
        self.put_job(job);
        self
    }

    pub fn with_company(self, company: Company) -> Self {
        self.put_company(company);
        self
    }

    pub fn with_user(self, user: User) -> Self {
        self.put_user(user);
        self
    }

    pub fn with_myworker(self, company_id: CompanyId, worker_user_id: UserId) -> Self {
        self.put_myworker(company_id, worker_user_id);
        self
    }

    /// Make user creation fail for this phone number
    pub fn failing_user_creation_for(self, phone: PhoneNumber) -> Self {
        self.fail_user_creation_for(phone);
        self
    }

    /// Make every geo query fail
    pub fn failing_geo_queries(self) -> Self {
        *self.failing_geo.lock().unwrap() = true;
        self
    }

    /// Yield to the scheduler before every message read, so concurrent
    /// callers interleave between their read and their write
    pub fn yield_on_message_reads(&self) {
        *self.yielding_message_reads.lock().unwrap() = true;
    }

    // Seeding through a shared handle. These skip the write log.

    pub fn put_job(&self, job: Job) {
        self.state.lock().unwrap().jobs.push(job);
    }

    pub fn put_company(&self, company: Company) {
        self.state.lock().unwrap().companies.push(company);
    }

    pub fn put_user(&self, user: User) {
        self.state.lock().unwrap().users.push(user);
    }

    pub fn put_myworker(&self, company_id: CompanyId, worker_user_id: UserId) {
        self.state
            .lock()
            .unwrap()
            .myworkers
            .push(Myworker::new(company_id, worker_user_id));
    }

    pub fn fail_user_creation_for(&self, phone: PhoneNumber) {
        self.failing_phones.lock().unwrap().push(phone);
    }

    pub fn users(&self) -> Vec<User> {
        self.state.lock().unwrap().users.clone()
    }

    pub fn myworkers(&self) -> Vec<Myworker> {
        self.state.lock().unwrap().myworkers.clone()
    }

    pub fn invites(&self) -> Vec<Invite> {
        self.state.lock().unwrap().invites.clone()
    }

    pub fn recruits(&self) -> Vec<Recruit> {
        self.state.lock().unwrap().recruits.clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().unwrap().messages.clone()
    }

    pub fn smslogs(&self) -> Vec<Smslog> {
        self.state.lock().unwrap().smslogs.clone()
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn user_by_phone(&self, phone: &PhoneNumber) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .iter()
            .find(|u| u.phone_number.as_ref() == Some(phone))
            .cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseStore for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_job(&self, id: JobId) -> Result<Option<Job>> {
        let state = self.state.lock().unwrap();
        Ok(state.jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn find_jobs(&self, ids: &[JobId]) -> Result<Vec<Job>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .jobs
            .iter()
            .filter(|j| ids.contains(&j.id))
            .cloned()
            .collect())
    }

    async fn find_company(&self, id: CompanyId) -> Result<Option<Company>> {
        let state = self.state.lock().unwrap();
        Ok(state.companies.iter().find(|c| c.id == id).cloned())
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.lock().unwrap();
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_users(&self, ids: &[UserId]) -> Result<Vec<User>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn find_users_by_phone(&self, phones: &[PhoneNumber]) -> Result<Vec<User>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .filter(|u| {
                u.phone_number
                    .as_ref()
                    .map(|p| phones.contains(p))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn find_users_near(&self, query: &NearQuery) -> Result<Vec<User>> {
        if *self.failing_geo.lock().unwrap() {
            anyhow::bail!("geo index unavailable");
        }

        let bbox = BoundingBox::around(query.point, query.max_distance_radians);
        let state = self.state.lock().unwrap();
        let mut found: Vec<User> = state
            .users
            .iter()
            .filter(|u| match u.location() {
                Some(loc) => {
                    bbox.contains(loc)
                        && central_angle(query.point, loc) <= query.max_distance_radians
                }
                None => false,
            })
            .filter(|u| query.eligibility.admits(u))
            .cloned()
            .collect();
        found.sort_by_key(|u| u.created_at);
        Ok(found)
    }

    async fn find_or_create_user_by_phone(&self, user: &User) -> Result<Upsert<User>> {
        if let Some(phone) = &user.phone_number {
            if self.failing_phones.lock().unwrap().contains(phone) {
                anyhow::bail!("simulated insert failure for {}", phone);
            }
        }

        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .users
            .iter()
            .find(|u| u.phone_number.is_some() && u.phone_number == user.phone_number)
        {
            return Ok(Upsert::Existing(existing.clone()));
        }

        state.users.push(user.clone());
        state.writes.push(StoreWrite::User(user.id));
        Ok(Upsert::Created(user.clone()))
    }

    async fn find_roster_user_ids(&self, company_id: CompanyId) -> Result<Vec<UserId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .myworkers
            .iter()
            .filter(|m| m.company_id == company_id)
            .map(|m| m.worker_user_id)
            .collect())
    }

    async fn find_or_create_myworker(
        &self,
        company_id: CompanyId,
        worker_user_id: UserId,
    ) -> Result<Upsert<Myworker>> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .myworkers
            .iter()
            .find(|m| m.company_id == company_id && m.worker_user_id == worker_user_id)
        {
            return Ok(Upsert::Existing(existing.clone()));
        }

        let link = Myworker::new(company_id, worker_user_id);
        state.myworkers.push(link.clone());
        state
            .writes
            .push(StoreWrite::Myworker(company_id, worker_user_id));
        Ok(Upsert::Created(link))
    }

    async fn find_or_create_invite(
        &self,
        company_id: CompanyId,
        phone_number: &PhoneNumber,
        user_id: UserId,
    ) -> Result<Upsert<Invite>> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .invites
            .iter()
            .find(|i| i.company_id == company_id && &i.phone_number == phone_number)
        {
            return Ok(Upsert::Existing(existing.clone()));
        }

        let invite = Invite::new(company_id, phone_number.clone(), user_id);
        state.invites.push(invite.clone());
        state.writes.push(StoreWrite::Invite(company_id, user_id));
        Ok(Upsert::Created(invite))
    }

    async fn insert_recruit(&self, recruit: &Recruit) -> Result<Recruit> {
        let mut state = self.state.lock().unwrap();
        state.recruits.push(recruit.clone());
        state.writes.push(StoreWrite::Recruit(recruit.id));
        Ok(recruit.clone())
    }

    async fn find_recruits(
        &self,
        company_id: CompanyId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Recruit>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Recruit> = state
            .recruits
            .iter()
            .filter(|r| r.company_id == company_id)
            .filter(|r| job_id.map(|id| r.request.job_id == id).unwrap_or(true))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    async fn insert_message(&self, message: &Message) -> Result<Message> {
        let mut state = self.state.lock().unwrap();
        state.messages.push(message.clone());
        state.writes.push(StoreWrite::Message(message.id));
        Ok(message.clone())
    }

    async fn find_message(&self, id: MessageId) -> Result<Option<Message>> {
        if *self.yielding_message_reads.lock().unwrap() {
            tokio::task::yield_now().await;
        }
        let state = self.state.lock().unwrap();
        Ok(state.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn find_messages_for_user(
        &self,
        user_id: UserId,
        job_id: Option<JobId>,
    ) -> Result<Vec<Message>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| m.involves(user_id))
            .filter(|m| job_id.map(|id| m.job_id == Some(id)).unwrap_or(true))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        Ok(found)
    }

    async fn mark_message_read(
        &self,
        id: MessageId,
        user_id: UserId,
    ) -> Result<Option<Message>> {
        let mut state = self.state.lock().unwrap();
        let Some(stored) = state.messages.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        let changed = stored.mark_read_by(user_id);
        let updated = stored.clone();
        if changed {
            state.writes.push(StoreWrite::MessageUpdate(id));
        }
        Ok(Some(updated))
    }

    async fn insert_smslog(&self, log: &Smslog) -> Result<Smslog> {
        let mut state = self.state.lock().unwrap();
        state.smslogs.push(log.clone());
        state.writes.push(StoreWrite::Smslog(log.id));
        Ok(log.clone())
    }

    async fn record_smslog_outcome(&self, id: SmslogId, outcome: &SmsOutcome) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let log = state
            .smslogs
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| anyhow::anyhow!("smslog {} not found", id))?;
        log.apply_outcome(outcome);
        Ok(())
    }
}

// =============================================================================
// Mock SMS Service
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SentSms {
    pub from: String,
    pub to: String,
    pub body: String,
}

pub struct MockSmsService {
    sent: Arc<Mutex<Vec<SentSms>>>,
    failing_numbers: Arc<Mutex<Vec<String>>>,
}

impl MockSmsService {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            failing_numbers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reject sends to this full number (`+<cc><local>`)
    pub fn failing_for(self, to: &str) -> Self {
        self.failing_numbers.lock().unwrap().push(to.to_string());
        self
    }

    pub fn sent_messages(&self) -> Vec<SentSms> {
        self.sent.lock().unwrap().clone()
    }
}

impl Default for MockSmsService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSmsService for MockSmsService {
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt> {
        if self.failing_numbers.lock().unwrap().iter().any(|n| n == to) {
            anyhow::bail!("Twilio error 400 (code 21211): Invalid 'To' Phone Number");
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(SentSms {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        let sid = format!("SM{:032}", sent.len());
        Ok(SmsReceipt {
            sid: sid.clone(),
            status: "queued".to_string(),
            raw: serde_json::json!({ "sid": sid, "status": "queued", "to": to }),
        })
    }
}

// =============================================================================
// Mock Push Notification Service
// =============================================================================

pub struct MockPushNotificationService {
    sent_notifications: Arc<Mutex<Vec<(Vec<String>, PushNotification)>>>,
}

impl MockPushNotificationService {
    pub fn new() -> Self {
        Self {
            sent_notifications: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get all sent notifications (player_ids, notification)
    pub fn sent_notifications(&self) -> Vec<(Vec<String>, PushNotification)> {
        self.sent_notifications.lock().unwrap().clone()
    }
}

impl Default for MockPushNotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BasePushNotificationService for MockPushNotificationService {
    async fn send_notification(
        &self,
        player_ids: &[String],
        notification: &PushNotification,
    ) -> Result<()> {
        self.sent_notifications
            .lock()
            .unwrap()
            .push((player_ids.to_vec(), notification.clone()));
        Ok(())
    }
}

// =============================================================================
// Mock Translation Service
// =============================================================================

/// Default output is `"[<target>] <text>"`.
pub struct MockTranslationService {
    fail: bool,
    calls: Arc<Mutex<Vec<(String, Language, Language)>>>,
}

impl MockTranslationService {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<(String, Language, Language)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockTranslationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTranslationService for MockTranslationService {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((text.to_string(), source, target));

        if self.fail {
            anyhow::bail!("translation quota exceeded");
        }
        Ok(format!("[{}] {}", target.code(), text))
    }
}

// =============================================================================
// Spy Dispatch Queue
// =============================================================================

/// Records tasks instead of running them; `drain` runs them synchronously.
pub struct SpyDispatchQueue {
    tasks: Arc<Mutex<Vec<DispatchTask>>>,
    dispatched: Arc<Mutex<Vec<DispatchTask>>>,
}

impl SpyDispatchQueue {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            dispatched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Tasks waiting to be drained
    pub fn queued(&self) -> Vec<DispatchTask> {
        self.tasks.lock().unwrap().clone()
    }

    /// Every task ever enqueued, drained or not
    pub fn all_tasks(&self) -> Vec<DispatchTask> {
        let mut all = self.dispatched.lock().unwrap().clone();
        all.extend(self.queued());
        all
    }

    pub fn sms_tasks(&self) -> Vec<DispatchTask> {
        self.all_tasks()
            .into_iter()
            .filter(|t| matches!(t, DispatchTask::Sms { .. }))
            .collect()
    }

    pub fn push_tasks(&self) -> Vec<DispatchTask> {
        self.all_tasks()
            .into_iter()
            .filter(|t| matches!(t, DispatchTask::Push { .. }))
            .collect()
    }

    /// Run every queued task. Returns how many failed.
    pub async fn drain(&self, dispatcher: &Dispatcher) -> usize {
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        let mut failures = 0;
        for task in tasks {
            self.dispatched.lock().unwrap().push(task.clone());
            if dispatcher.dispatch(task).await.is_err() {
                failures += 1;
            }
        }
        failures
    }
}

impl Default for SpyDispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseDispatchQueue for SpyDispatchQueue {
    async fn enqueue(&self, task: DispatchTask) -> Result<()> {
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }

    fn pending(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub store: Arc<MemoryStore>,
    pub sms_service: Arc<MockSmsService>,
    pub push_service: Arc<MockPushNotificationService>,
    pub translator: Arc<MockTranslationService>,
    pub dispatch_queue: Arc<SpyDispatchQueue>,
    pub settings: MessagingSettings,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            sms_service: Arc::new(MockSmsService::new()),
            push_service: Arc::new(MockPushNotificationService::new()),
            translator: Arc::new(MockTranslationService::new()),
            dispatch_queue: Arc::new(SpyDispatchQueue::new()),
            settings: MessagingSettings {
                sms_from_number: "+15550000000".to_string(),
                app_download_url: "https://laborhub.test/download".to_string(),
            },
        }
    }

    /// Set a seeded memory store
    pub fn mock_store(mut self, store: MemoryStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    /// Set a mock SMS service
    pub fn mock_sms(mut self, service: MockSmsService) -> Self {
        self.sms_service = Arc::new(service);
        self
    }

    /// Set a mock push notification service
    pub fn mock_push(mut self, service: MockPushNotificationService) -> Self {
        self.push_service = Arc::new(service);
        self
    }

    /// Set a mock translator
    pub fn mock_translator(mut self, translator: MockTranslationService) -> Self {
        self.translator = Arc::new(translator);
        self
    }

    /// Convert into ServerDeps for testing
    pub fn into_deps(&self) -> Arc<ServerDeps> {
        Arc::new(ServerDeps::new(
            self.store.clone(),
            self.translator.clone(),
            self.dispatch_queue.clone(),
            Arc::new(JwtService::new(TEST_JWT_SECRET, TEST_JWT_ISSUER.to_string())),
            self.settings.clone(),
        ))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(
            self.store.clone(),
            self.push_service.clone(),
            self.sms_service.clone(),
            self.settings.sms_from_number.clone(),
        )
    }

    /// Run all queued dispatch tasks. Returns how many failed.
    pub async fn drain_dispatch(&self) -> usize {
        self.dispatch_queue.drain(&self.dispatcher()).await
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

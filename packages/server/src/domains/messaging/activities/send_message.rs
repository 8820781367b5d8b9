//! Message fan-out engine
//!
//! One call turns a logical send into persisted records plus queued
//! dispatch. Write order is fixed:
//!
//! ```text
//! validate ─► links for onboarding users ─► stub users + links for unknown numbers
//!          ─► Message ─► enqueue push / SMS
//! ```
//!
//! Nothing is written until validation passes. After that, a failure for one
//! recipient is logged and the others carry on.

use std::collections::HashSet;

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use typed_builder::TypedBuilder;

use crate::common::{
    AppError, AppResult, CompanyId, JobId, LocalizedText, MessageId, PhoneNumber, UserId,
};
use crate::domains::jobs::{Company, Job};
use crate::domains::messaging::activities::classify::{classify_recipients, Recipient};
use crate::domains::messaging::activities::compose::{compose_sms, download_link, push_notification};
use crate::domains::messaging::activities::translate::fill_missing_translation;
use crate::domains::messaging::models::{Message, MessageReceiver, MessageSender, MessageType};
use crate::domains::users::User;
use crate::kernel::{BaseStore, DispatchTask, ServerDeps};

#[derive(Clone, Debug, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct SendMessage {
    pub sender_user_id: UserId,
    /// Falls back to the sender's own company
    #[builder(default)]
    pub sender_company_id: Option<CompanyId>,
    pub message_type: MessageType,
    #[builder(default)]
    pub job_id: Option<JobId>,
    pub body: LocalizedText,
    #[builder(default)]
    pub recipients: Vec<Recipient>,
    #[builder(default)]
    pub metadata: Option<Value>,
    #[builder(default)]
    pub auto_translate: bool,
}

#[instrument(skip(request, deps), fields(sender = %request.sender_user_id, kind = %request.message_type))]
pub async fn send_message(request: SendMessage, deps: &ServerDeps) -> AppResult<Message> {
    let store = deps.store.as_ref();

    let sender = store
        .find_user(request.sender_user_id)
        .await?
        .ok_or_else(|| AppError::validation("Sender not found"))?;
    let company_id = request.sender_company_id.or_else(|| sender.company_id());

    let job = match request.job_id {
        Some(job_id) => Some(
            store
                .find_job(job_id)
                .await?
                .ok_or_else(|| AppError::validation(format!("Job {} not found", job_id)))?,
        ),
        None => None,
    };
    if request.message_type == MessageType::Recruit && job.is_none() {
        return Err(AppError::validation("job_id is required for recruit messages"));
    }
    if request.recipients.is_empty() {
        return Err(AppError::validation("At least one receiver is required"));
    }
    if request.body.is_blank() {
        return Err(AppError::validation("Message text is required"));
    }

    let classified = classify_recipients(&request.recipients, store).await?;

    // SMS invites name the company, so it must exist before anything is written
    let company = if classified.needs_sms() {
        let company_id = company_id.ok_or_else(|| {
            AppError::validation("company_id is required to message workers without the app")
        })?;
        Some(
            store
                .find_company(company_id)
                .await?
                .ok_or_else(|| AppError::validation(format!("Company {} not found", company_id)))?,
        )
    } else {
        None
    };

    let body = if request.auto_translate {
        fill_missing_translation(request.body, deps.translator.as_ref()).await
    } else {
        request.body
    };

    let mut sms_users: Vec<User> = Vec::new();
    if let Some(company) = &company {
        join_all(
            classified
                .onboarding
                .iter()
                .map(|user| ensure_links(company.id, user, store)),
        )
        .await;
        sms_users.extend(classified.onboarding.iter().cloned());

        let created = join_all(
            classified
                .unmatched
                .iter()
                .map(|phone| onboard_phone_number(company.id, phone, store)),
        )
        .await;
        sms_users.extend(created.into_iter().flatten());
    }

    let mut seen: HashSet<UserId> = HashSet::new();
    let receivers: Vec<MessageReceiver> = classified
        .registered
        .iter()
        .chain(sms_users.iter())
        .filter(|user| seen.insert(user.id))
        .map(|user| MessageReceiver::new(user.id, user.company_id()))
        .collect();

    if receivers.is_empty() {
        return Err(anyhow::anyhow!("no receiver could be created for this message").into());
    }

    let message = Message {
        id: MessageId::new(),
        job_id: job.as_ref().map(|j| j.id),
        message_type: request.message_type,
        sender: MessageSender {
            user_id: sender.id,
            company_id,
        },
        receivers,
        receiver: None,
        message: body,
        metadata: request.metadata,
        datetime: Utc::now(),
    };
    let message = store.insert_message(&message).await?;
    info!(
        message_id = %message.id,
        receivers = message.receivers.len(),
        "message saved"
    );

    enqueue_dispatch(
        &message,
        &classified.registered,
        &sms_users,
        job.as_ref(),
        company.as_ref(),
        deps,
    )
    .await;

    Ok(message)
}

/// Idempotently link a worker to the company roster and record the invite.
async fn ensure_links(company_id: CompanyId, user: &User, store: &dyn BaseStore) {
    match store.find_or_create_myworker(company_id, user.id).await {
        Ok(link) if link.is_created() => debug!(user_id = %user.id, "added worker to roster"),
        Ok(_) => {}
        Err(e) => error!(user_id = %user.id, error = %e, "failed to link worker to company"),
    }

    let Some(phone) = &user.phone_number else {
        warn!(user_id = %user.id, "onboarding worker has no phone number, skipping invite");
        return;
    };
    match store.find_or_create_invite(company_id, phone, user.id).await {
        Ok(invite) if invite.is_created() => debug!(user_id = %user.id, "recorded invite"),
        Ok(_) => {}
        Err(e) => error!(user_id = %user.id, error = %e, "failed to record invite"),
    }
}

/// Create the stub account for an unknown number, then its links.
///
/// Returns `None` when the account could not be written.
async fn onboard_phone_number(
    company_id: CompanyId,
    phone: &PhoneNumber,
    store: &dyn BaseStore,
) -> Option<User> {
    let user = match store
        .find_or_create_user_by_phone(&User::new_onboarding_worker(phone.clone()))
        .await
    {
        Ok(upsert) => {
            if !upsert.is_created() {
                debug!(phone = %phone, "number registered concurrently, reusing user");
            }
            upsert.into_inner()
        }
        Err(e) => {
            error!(phone = %phone, error = %e, "failed to create onboarding worker");
            return None;
        }
    };

    ensure_links(company_id, &user, store).await;
    Some(user)
}

async fn enqueue_dispatch(
    message: &Message,
    registered: &[User],
    sms_users: &[User],
    job: Option<&Job>,
    company: Option<&Company>,
    deps: &ServerDeps,
) {
    let mut tasks = Vec::new();

    let notification = push_notification(message);
    for user in registered.iter().filter(|u| !u.player_ids.is_empty()) {
        tasks.push(DispatchTask::Push {
            message_id: message.id,
            user_id: user.id,
            player_ids: user.player_ids.clone(),
            notification: notification.clone(),
        });
    }

    if let Some(company) = company {
        for user in sms_users {
            let Some(phone) = &user.phone_number else {
                warn!(user_id = %user.id, "no phone number, cannot send sms");
                continue;
            };
            let link = download_link(&deps.settings.app_download_url, phone);
            tasks.push(DispatchTask::Sms {
                message_id: message.id,
                sender_user_id: message.sender.user_id,
                sender_company_id: Some(company.id),
                receiver_user_id: user.id,
                to: phone.clone(),
                body: compose_sms(message, job, company, user.language, &link),
                billable: true,
            });
        }
    }

    for task in tasks {
        let kind = task.kind();
        if let Err(e) = deps.dispatch_queue.enqueue(task).await {
            error!(message_id = %message.id, kind, error = %e, "failed to enqueue dispatch");
        }
    }
}

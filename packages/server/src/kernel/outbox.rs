//! Outbox for push and SMS dispatch.
//!
//! Request handlers persist their records, enqueue one `DispatchTask` per
//! notification, and return. The `DispatchWorker` drains the queue in the
//! background and records each SMS outcome onto its Smslog.
//!
//! ```text
//! send_message ──► BaseDispatchQueue::enqueue
//!                        │
//!                        ▼
//!                  DispatchWorker ──► Dispatcher ──► push / SMS gateway
//!                                          └──► Smslog insert + outcome patch
//! ```
//!
//! # Example
//!
//! ```ignore
//! let (queue, receiver) = ChannelDispatchQueue::new();
//! let worker = DispatchWorker::new(receiver, dispatcher);
//! tokio::spawn(worker.run());
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::common::{CompanyId, MessageId, PhoneNumber, SmslogId, UserId};
use crate::domains::messaging::models::{SmsOutcome, Smslog};
use crate::kernel::{BasePushNotificationService, BaseSmsService, BaseStore, PushNotification};

/// One side effect to run after a message has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchTask {
    Push {
        message_id: MessageId,
        user_id: UserId,
        player_ids: Vec<String>,
        notification: PushNotification,
    },
    Sms {
        message_id: MessageId,
        sender_user_id: UserId,
        sender_company_id: Option<CompanyId>,
        receiver_user_id: UserId,
        to: PhoneNumber,
        body: String,
        billable: bool,
    },
}

impl DispatchTask {
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchTask::Push { .. } => "push",
            DispatchTask::Sms { .. } => "sms",
        }
    }

    pub fn message_id(&self) -> MessageId {
        match self {
            DispatchTask::Push { message_id, .. } | DispatchTask::Sms { message_id, .. } => {
                *message_id
            }
        }
    }
}

#[async_trait]
pub trait BaseDispatchQueue: Send + Sync {
    async fn enqueue(&self, task: DispatchTask) -> Result<()>;

    /// Tasks accepted but not yet dispatched
    fn pending(&self) -> usize;
}

// =============================================================================
// In-process channel queue
// =============================================================================

/// Unbounded in-process queue. Dropping every handle closes the channel,
/// which lets the worker finish the backlog and stop.
#[derive(Clone)]
pub struct ChannelDispatchQueue {
    sender: mpsc::UnboundedSender<DispatchTask>,
    pending: Arc<AtomicUsize>,
}

pub struct DispatchReceiver {
    receiver: mpsc::UnboundedReceiver<DispatchTask>,
    pending: Arc<AtomicUsize>,
}

impl ChannelDispatchQueue {
    pub fn new() -> (Self, DispatchReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        (
            Self {
                sender,
                pending: pending.clone(),
            },
            DispatchReceiver { receiver, pending },
        )
    }
}

#[async_trait]
impl BaseDispatchQueue for ChannelDispatchQueue {
    async fn enqueue(&self, task: DispatchTask) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.sender.send(task) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            anyhow::bail!("dispatch queue closed, dropped {} task", e.0.kind());
        }
        Ok(())
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// Runs a single task against the gateways.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn BaseStore>,
    push_service: Arc<dyn BasePushNotificationService>,
    sms_service: Arc<dyn BaseSmsService>,
    sms_from_number: String,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn BaseStore>,
        push_service: Arc<dyn BasePushNotificationService>,
        sms_service: Arc<dyn BaseSmsService>,
        sms_from_number: String,
    ) -> Self {
        Self {
            store,
            push_service,
            sms_service,
            sms_from_number,
        }
    }

    pub async fn dispatch(&self, task: DispatchTask) -> Result<()> {
        match task {
            DispatchTask::Push {
                message_id,
                user_id,
                player_ids,
                notification,
            } => {
                debug!(message_id = %message_id, user_id = %user_id, "dispatching push");
                self.push_service
                    .send_notification(&player_ids, &notification)
                    .await
            }
            DispatchTask::Sms {
                message_id,
                sender_user_id,
                sender_company_id,
                receiver_user_id,
                to,
                body,
                billable,
            } => {
                let now = Utc::now();
                let log = Smslog {
                    id: SmslogId::new(),
                    message_id: Some(message_id),
                    sender_user_id: Some(sender_user_id),
                    sender_company_id,
                    receiver_user_id: Some(receiver_user_id),
                    receiver_phone: to.full_number(),
                    body,
                    billable,
                    response: None,
                    exception: None,
                    created_at: now,
                    updated_at: now,
                };

                // send even if the audit row could not be written
                let logged = match self.store.insert_smslog(&log).await {
                    Ok(saved) => Some(saved.id),
                    Err(e) => {
                        error!(message_id = %message_id, error = %e, "failed to write smslog");
                        None
                    }
                };

                let outcome = match self
                    .sms_service
                    .send_sms(&self.sms_from_number, &log.receiver_phone, &log.body)
                    .await
                {
                    Ok(receipt) => {
                        info!(
                            message_id = %message_id,
                            sid = %receipt.sid,
                            status = %receipt.status,
                            "sms accepted by gateway"
                        );
                        SmsOutcome::Delivered(receipt.raw)
                    }
                    Err(e) => {
                        warn!(message_id = %message_id, error = %e, "sms gateway rejected message");
                        SmsOutcome::Failed(e.to_string())
                    }
                };

                if let Some(id) = logged {
                    self.store.record_smslog_outcome(id, &outcome).await?;
                }

                match outcome {
                    SmsOutcome::Delivered(_) => Ok(()),
                    SmsOutcome::Failed(exception) => anyhow::bail!(exception),
                }
            }
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

/// Background loop draining a `ChannelDispatchQueue`.
pub struct DispatchWorker {
    receiver: DispatchReceiver,
    dispatcher: Dispatcher,
}

impl DispatchWorker {
    pub fn new(receiver: DispatchReceiver, dispatcher: Dispatcher) -> Self {
        Self {
            receiver,
            dispatcher,
        }
    }

    /// Run until every queue handle is dropped and the backlog is empty.
    pub async fn run(mut self) {
        info!("dispatch worker starting");

        while let Some(task) = self.receiver.receiver.recv().await {
            let kind = task.kind();
            let message_id = task.message_id();

            if let Err(e) = self.dispatcher.dispatch(task).await {
                error!(kind, message_id = %message_id, error = %e, "dispatch failed");
            }
            self.receiver.pending.fetch_sub(1, Ordering::SeqCst);
        }

        info!("dispatch worker stopped");
    }
}

//! Server dependencies for domain activities (using traits for testability)
//!
//! This module provides the central dependency container used by recruiting and messaging.
//! All external services use trait abstractions to enable testing.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use twilio::TwilioService;

use crate::domains::auth::JwtService;
use crate::kernel::{
    BaseDispatchQueue, BaseSmsService, BaseStore, BaseTranslationService, SmsReceipt,
};

// =============================================================================
// TwilioService Adapter (implements BaseSmsService trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseSmsService trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseSmsService for TwilioAdapter {
    async fn send_sms(&self, from: &str, to: &str, body: &str) -> Result<SmsReceipt> {
        let response = self
            .0
            .send_sms(from, to, body)
            .await
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(SmsReceipt {
            sid: response.sid.clone(),
            status: response.status.clone(),
            raw: serde_json::to_value(&response)?,
        })
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Settings the messaging activities read at request time.
#[derive(Debug, Clone)]
pub struct MessagingSettings {
    /// Sender number for outbound SMS
    pub sms_from_number: String,
    /// Base of the app-download deep link appended to invite SMS
    pub app_download_url: String,
}

/// Server dependencies accessible to activities and routes (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn BaseStore>,
    pub translator: Arc<dyn BaseTranslationService>,
    pub dispatch_queue: Arc<dyn BaseDispatchQueue>,
    pub jwt_service: Arc<JwtService>,
    pub settings: MessagingSettings,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        store: Arc<dyn BaseStore>,
        translator: Arc<dyn BaseTranslationService>,
        dispatch_queue: Arc<dyn BaseDispatchQueue>,
        jwt_service: Arc<JwtService>,
        settings: MessagingSettings,
    ) -> Self {
        Self {
            store,
            translator,
            dispatch_queue,
            jwt_service,
            settings,
        }
    }
}

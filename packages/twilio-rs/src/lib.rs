// Minimal client for the Twilio Programmable Messaging REST API.

use std::collections::HashMap;
use std::fmt;

pub mod models;
use reqwest::{header, Client};

pub use crate::models::{MessageResponse, TwilioErrorBody};

const API_BASE: &str = "https://api.twilio.com/2010-04-01";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
}

/// Error returned by the Twilio client.
///
/// `status` is set when Twilio answered with a non-success HTTP status.
#[derive(Debug, Clone)]
pub struct TwilioError {
    pub status: Option<u16>,
    pub code: Option<i64>,
    pub message: String,
}

impl fmt::Display for TwilioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.code) {
            (Some(status), Some(code)) => {
                write!(f, "Twilio error {} (code {}): {}", status, code, self.message)
            }
            (Some(status), None) => write!(f, "Twilio error {}: {}", status, self.message),
            _ => write!(f, "Twilio request failed: {}", self.message),
        }
    }
}

impl std::error::Error for TwilioError {}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Send an SMS from `from` to `to`. Both numbers are E.164 (`+15551234567`).
    pub async fn send_sms(
        &self,
        from: &str,
        to: &str,
        body: &str,
    ) -> Result<MessageResponse, TwilioError> {
        let url = format!(
            "{base}/Accounts/{sid}/Messages.json",
            base = API_BASE,
            sid = self.options.account_sid
        );

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", to);
        form_body.insert("From", from);
        form_body.insert("Body", body);

        let response = self
            .client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .headers(headers)
            .form(&form_body)
            .send()
            .await
            .map_err(|e| TwilioError {
                status: None,
                code: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let parsed: Option<TwilioErrorBody> = serde_json::from_str(&raw).ok();
            return Err(TwilioError {
                status: Some(status.as_u16()),
                code: parsed.as_ref().and_then(|b| b.code),
                message: parsed.and_then(|b| b.message).unwrap_or(raw),
            });
        }

        response
            .json::<MessageResponse>()
            .await
            .map_err(|e| TwilioError {
                status: Some(status.as_u16()),
                code: None,
                message: format!("Failed to parse Twilio response: {}", e),
            })
    }
}

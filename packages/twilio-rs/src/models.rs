use serde::{Deserialize, Serialize};

/// Message resource returned by `POST /Accounts/{sid}/Messages.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub sid: String,
    pub status: String,
    pub to: Option<String>,
    pub from: Option<String>,
    pub body: Option<String>,
    pub num_segments: Option<String>,
    pub price: Option<String>,
    pub error_code: Option<i64>,
    pub error_message: Option<String>,
    pub date_created: Option<String>,
}

/// Error payload Twilio sends with 4xx/5xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct TwilioErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub more_info: Option<String>,
    pub status: Option<u16>,
}

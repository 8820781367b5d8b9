use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

use crate::kernel::MessagingSettings;

const DEFAULT_APP_DOWNLOAD_URL: &str = "https://laborhub.app/download";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub twilio_account_sid: String,
    pub twilio_auth_token: String,
    pub twilio_from_number: String,
    pub onesignal_app_id: Option<String>,
    pub onesignal_api_key: Option<String>,
    pub google_translate_api_key: Option<String>,
    pub app_download_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "laborhub".to_string()),
            twilio_account_sid: env::var("TWILIO_ACCOUNT_SID")
                .context("TWILIO_ACCOUNT_SID must be set")?,
            twilio_auth_token: env::var("TWILIO_AUTH_TOKEN")
                .context("TWILIO_AUTH_TOKEN must be set")?,
            twilio_from_number: env::var("TWILIO_FROM_NUMBER")
                .context("TWILIO_FROM_NUMBER must be set")?,
            onesignal_app_id: non_empty("ONESIGNAL_APP_ID"),
            onesignal_api_key: non_empty("ONESIGNAL_API_KEY"),
            google_translate_api_key: non_empty("GOOGLE_TRANSLATE_API_KEY"),
            app_download_url: env::var("APP_DOWNLOAD_URL")
                .unwrap_or_else(|_| DEFAULT_APP_DOWNLOAD_URL.to_string()),
        })
    }

    pub fn messaging_settings(&self) -> MessagingSettings {
        MessagingSettings {
            sms_from_number: self.twilio_from_number.clone(),
            app_download_url: self.app_download_url.clone(),
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{error, info, warn};

use crate::kernel::{BasePushNotificationService, PushNotification};

const NOTIFICATIONS_URL: &str = "https://onesignal.com/api/v1/notifications";

/// OneSignal push client.
/// Workers' devices register `player_ids`; notifications target those ids directly.
pub struct OneSignalClient {
    client: Client,
    app_id: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct OneSignalNotification<'a> {
    app_id: &'a str,
    include_player_ids: &'a [String],
    contents: HashMap<&'static str, &'a str>,
    data: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OneSignalResponse {
    id: Option<String>,
    #[serde(default)]
    recipients: i64,
    #[serde(default)]
    errors: Option<serde_json::Value>,
}

impl OneSignalClient {
    pub fn new(app_id: String, api_key: String) -> Self {
        Self {
            client: Client::new(),
            app_id,
            api_key,
        }
    }
}

#[async_trait]
impl BasePushNotificationService for OneSignalClient {
    async fn send_notification(
        &self,
        player_ids: &[String],
        notification: &PushNotification,
    ) -> Result<()> {
        if player_ids.is_empty() {
            return Ok(());
        }

        // OneSignal requires an English entry
        let mut contents = HashMap::new();
        contents.insert("en", notification.contents.get_or_fallback(crate::common::Language::En));
        if !notification.contents.es.trim().is_empty() {
            contents.insert("es", notification.contents.es.as_str());
        }

        let payload = OneSignalNotification {
            app_id: &self.app_id,
            include_player_ids: player_ids,
            contents,
            data: &notification.data,
        };

        info!("Sending OneSignal push to {} devices", player_ids.len());

        let response = self
            .client
            .post(NOTIFICATIONS_URL)
            .header("Authorization", format!("Basic {}", self.api_key))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            error!("OneSignal push failed {}: {}", status, body);
            anyhow::bail!("OneSignal API error {}: {}", status, body);
        }

        let parsed: OneSignalResponse = response.json().await?;
        if let Some(errors) = parsed.errors {
            // invalid player ids are reported here but the rest still deliver
            warn!(errors = %errors, "OneSignal reported delivery errors");
        }

        info!(
            notification_id = ?parsed.id,
            recipients = parsed.recipients,
            "OneSignal notification accepted"
        );
        Ok(())
    }
}

/// Push service used when no OneSignal credentials are configured.
pub struct NoopPushNotificationService;

#[async_trait]
impl BasePushNotificationService for NoopPushNotificationService {
    async fn send_notification(
        &self,
        player_ids: &[String],
        _notification: &PushNotification,
    ) -> Result<()> {
        warn!(
            devices = player_ids.len(),
            "Push notifications disabled, dropping notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::LocalizedText;

    #[test]
    fn payload_serializes_player_ids_and_contents() {
        let ids = vec!["player-1".to_string()];
        let data = serde_json::json!({"type": "message"});
        let mut contents = HashMap::new();
        contents.insert("en", "Hello");
        let payload = OneSignalNotification {
            app_id: "app",
            include_player_ids: &ids,
            contents,
            data: &data,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["include_player_ids"][0], "player-1");
        assert_eq!(json["contents"]["en"], "Hello");
        assert_eq!(json["data"]["type"], "message");
    }

    #[tokio::test]
    async fn empty_player_list_is_a_no_op() {
        let client = OneSignalClient::new("app".to_string(), "key".to_string());
        let notification = PushNotification {
            contents: LocalizedText::new("Hi", "Hola"),
            data: serde_json::Value::Null,
        };
        assert!(client.send_notification(&[], &notification).await.is_ok());
    }
}

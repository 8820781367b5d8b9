use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::common::Language;
use crate::kernel::BaseTranslationService;

const TRANSLATE_URL: &str = "https://translation.googleapis.com/language/translate/v2";

/// Google Cloud Translation (v2 REST) client
pub struct GoogleTranslateClient {
    client: Client,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'static str,
    target: &'static str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateData {
    translations: Vec<Translation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Translation {
    translated_text: String,
}

impl GoogleTranslateClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }
}

#[async_trait]
impl BaseTranslationService for GoogleTranslateClient {
    async fn translate(&self, text: &str, source: Language, target: Language) -> Result<String> {
        let response = self
            .client
            .post(TRANSLATE_URL)
            .query(&[("key", self.api_key.as_str())])
            .json(&TranslateRequest {
                q: text,
                source: source.code(),
                target: target.code(),
                format: "text",
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Google Translate API error {}: {}", status, body);
        }

        let parsed: TranslateResponse = response.json().await?;
        parsed
            .data
            .translations
            .into_iter()
            .next()
            .map(|t| t.translated_text)
            .ok_or_else(|| anyhow::anyhow!("No translation returned"))
    }
}

/// Translation service used when no API key is configured.
pub struct NoopTranslationService;

#[async_trait]
impl BaseTranslationService for NoopTranslationService {
    async fn translate(&self, _text: &str, _source: Language, _target: Language) -> Result<String> {
        anyhow::bail!("Translation is not configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_translation_response() {
        let raw = r#"{"data":{"translations":[{"translatedText":"Hola"}]}}"#;
        let parsed: TranslateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.translations[0].translated_text, "Hola");
    }

    #[tokio::test]
    async fn noop_translation_fails() {
        let result = NoopTranslationService
            .translate("Hello", Language::En, Language::Es)
            .await;
        assert!(result.is_err());
    }
}

// Common types used across multiple domains and layers

use serde::{Deserialize, Serialize};

/// Supported message languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Language::En => Language::Es,
            Language::Es => Language::En,
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "en" => Some(Language::En),
            "es" => Some(Language::Es),
            _ => None,
        }
    }
}

/// Bilingual text as stored on messages and push payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(default)]
    pub en: String,
    #[serde(default)]
    pub es: String,
}

impl LocalizedText {
    pub fn new(en: impl Into<String>, es: impl Into<String>) -> Self {
        Self {
            en: en.into(),
            es: es.into(),
        }
    }

    pub fn get(&self, language: Language) -> &str {
        match language {
            Language::En => &self.en,
            Language::Es => &self.es,
        }
    }

    pub fn set(&mut self, language: Language, text: String) {
        match language {
            Language::En => self.en = text,
            Language::Es => self.es = text,
        }
    }

    /// Text in `language`, falling back to the other language when blank.
    pub fn get_or_fallback(&self, language: Language) -> &str {
        let preferred = self.get(language);
        if preferred.trim().is_empty() {
            self.get(language.other())
        } else {
            preferred
        }
    }

    pub fn is_blank(&self) -> bool {
        self.en.trim().is_empty() && self.es.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_uses_other_language_when_blank() {
        let text = LocalizedText::new("Hello", "");
        assert_eq!(text.get_or_fallback(Language::Es), "Hello");
        assert_eq!(text.get_or_fallback(Language::En), "Hello");
    }

    #[test]
    fn missing_fields_deserialize_empty() {
        let text: LocalizedText = serde_json::from_str(r#"{"es":"Hola"}"#).unwrap();
        assert_eq!(text.en, "");
        assert_eq!(text.es, "Hola");
        assert!(!text.is_blank());
    }
}

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const BASE_URL_ENV: &str = "CAREERBOT_BASE_URL";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Language used for voice input and the sidebar selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Hi,
    Es,
}

impl Language {
    /// Locale tag handed to speech recognition.
    pub fn speech_locale(self) -> &'static str {
        match self {
            Self::En => "en-US",
            Self::Hi => "hi-IN",
            Self::Es => "es-ES",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi",
            Self::Es => "Spanish",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::En => Self::Hi,
            Self::Hi => Self::Es,
            Self::Es => Self::En,
        }
    }
}

/// Timing of the typing playback for bot replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealSettings {
    pub enabled: bool,
    pub min_interval_ms: u64,
    pub max_interval_ms: u64,
}

impl Default for RevealSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval_ms: 11,
            max_interval_ms: 25,
        }
    }
}

impl RevealSettings {
    pub fn interval_band(&self) -> RangeInclusive<u64> {
        self.min_interval_ms..=self.max_interval_ms
    }
}

/// Client configuration, persisted as JSON and overridable from the CLI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub firebase_api_key: Option<String>,
    pub language: Language,
    pub reveal: RevealSettings,
    pub export_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            firebase_api_key: None,
            language: Language::default(),
            reveal: RevealSettings::default(),
            export_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Apply `CAREERBOT_BASE_URL` when it is set and non-empty.
    pub fn apply_env(mut self) -> Self {
        if let Ok(url) = std::env::var(BASE_URL_ENV)
            && !url.trim().is_empty()
        {
            self.base_url = url.trim().to_string();
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "base_url must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        let reveal = &self.reveal;
        if reveal.min_interval_ms == 0 || reveal.min_interval_ms > reveal.max_interval_ms {
            return Err(ConfigError::Invalid(format!(
                "reveal interval band {}..={} is empty or zero",
                reveal.min_interval_ms, reveal.max_interval_ms
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000");
        assert_eq!(config.reveal.interval_band(), 11..=25);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ClientConfig::default().with_base_url("https://bot.example.com/");
        assert_eq!(
            config.endpoint("/api/ask"),
            "https://bot.example.com/api/ask"
        );
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let config = ClientConfig::default().with_base_url("localhost:5000");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_inverted_interval_band() {
        let mut config = ClientConfig::default();
        config.reveal.min_interval_ms = 30;
        config.reveal.max_interval_ms = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://10.0.0.2:5000","language":"es"}"#)
                .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:5000");
        assert_eq!(config.language, Language::Es);
        assert_eq!(config.language.speech_locale(), "es-ES");
        assert!(config.reveal.enabled);
    }

    #[test]
    fn test_language_cycles() {
        assert_eq!(Language::En.next(), Language::Hi);
        assert_eq!(Language::Hi.next(), Language::Es);
        assert_eq!(Language::Es.next(), Language::En);
    }
}

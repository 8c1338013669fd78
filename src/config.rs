//! Configuration for a wizard session.
//!
//! All session behaviour is controlled through [`WizardConfig`], built via
//! its [`WizardConfigBuilder`]. The processing service itself is configured
//! on its side; here we only say where it lives and how long to wait for it.

use crate::error::WizardError;
use crate::language::Language;
use crate::progress::ExecutionObserver;
use std::fmt;
use std::sync::Arc;

/// Default processing-service address.
pub const DEFAULT_API_BASE: &str = "http://localhost:8000";

/// Environment variable read by [`WizardConfig::from_env`].
pub const API_BASE_ENV: &str = "EFFILAYOUTER_API_BASE";

/// Configuration for a wizard session.
///
/// # Example
/// ```rust
/// use effilayouter::{Language, WizardConfig};
///
/// let config = WizardConfig::builder()
///     .api_base("http://127.0.0.1:8000")
///     .initial_language(Language::Arabic)
///     .build()
///     .unwrap();
/// assert_eq!(config.api_base, "http://127.0.0.1:8000");
/// ```
#[derive(Clone)]
pub struct WizardConfig {
    /// Base URL of the processing service, without a trailing slash.
    /// Default: `http://localhost:8000`.
    pub api_base: String,

    /// Per-request timeout in seconds. Default: 900.
    ///
    /// Translation of a long document runs inside a single request, so this
    /// is deliberately generous.
    pub request_timeout_secs: u64,

    /// Language selected when the session starts. Default: English.
    pub initial_language: Language,

    /// Receives every record mutation as it happens.
    pub observer: Option<Arc<dyn ExecutionObserver>>,

    /// Buffer size of the execution-event broadcast. Default: 256.
    pub event_capacity: usize,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_secs: 900,
            initial_language: Language::default(),
            observer: None,
            event_capacity: 256,
        }
    }
}

impl fmt::Debug for WizardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardConfig")
            .field("api_base", &self.api_base)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("initial_language", &self.initial_language)
            .field(
                "observer",
                &self.observer.as_ref().map(|_| "<dyn ExecutionObserver>"),
            )
            .field("event_capacity", &self.event_capacity)
            .finish()
    }
}

impl WizardConfig {
    pub fn builder() -> WizardConfigBuilder {
        WizardConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with `api_base` taken from `EFFILAYOUTER_API_BASE` when set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.api_base = normalise_base(&base);
            }
        }
        config
    }
}

/// Builder for [`WizardConfig`].
#[derive(Debug)]
pub struct WizardConfigBuilder {
    config: WizardConfig,
}

impl WizardConfigBuilder {
    pub fn api_base(mut self, base: impl AsRef<str>) -> Self {
        self.config.api_base = normalise_base(base.as_ref());
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn initial_language(mut self, language: Language) -> Self {
        self.config.initial_language = language;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    pub fn event_capacity(mut self, n: usize) -> Self {
        self.config.event_capacity = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WizardConfig, WizardError> {
        let c = &self.config;
        if !(c.api_base.starts_with("http://") || c.api_base.starts_with("https://")) {
            return Err(WizardError::InvalidConfig(format!(
                "API base must be an http(s) URL, got '{}'",
                c.api_base
            )));
        }
        if c.request_timeout_secs == 0 {
            return Err(WizardError::InvalidConfig(
                "Request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.event_capacity == 0 {
            return Err(WizardError::InvalidConfig(
                "Event capacity must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

fn normalise_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

//! Configuration loader and validator for the dashboard backend.
use crate::model::Platform;
use crate::webhook::{DeliveryMode, WebhookRegistry};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    /// Platform -> Make.com scenario URL. Platforms missing here are unintegrated.
    #[serde(default)]
    pub webhooks: BTreeMap<Platform, String>,
    #[serde(default)]
    pub automation: Automation,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub delivery_mode: DeliveryMode,
}

/// Automation profile submission settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Automation {
    #[serde(default)]
    pub profile_webhook: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
}

impl Default for Automation {
    fn default() -> Self {
        Self {
            profile_webhook: None,
            source: default_source(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_source() -> String {
    "LeaderAmplifierAi".to_string()
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.app.resolved_data_dir())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.app.request_timeout_ms)
    }

    /// Default SQLite URL under the data directory.
    pub fn database_url(&self) -> String {
        format!("sqlite://{}/amplifier.db", self.app.resolved_data_dir())
    }

    /// Build the webhook registry. URLs were checked by `validate`.
    pub fn webhook_registry(&self) -> Result<WebhookRegistry, ConfigError> {
        let mut registry = WebhookRegistry::default();
        for (platform, raw) in &self.webhooks {
            registry.insert(*platform, parse_webhook_url(&format!("webhooks.{platform}"), raw)?);
        }
        Ok(registry)
    }

    pub fn profile_webhook(&self) -> Result<Option<Url>, ConfigError> {
        self.automation
            .profile_webhook
            .as_deref()
            .map(|raw| parse_webhook_url("automation.profile_webhook", raw))
            .transpose()
    }
}

impl App {
    /// `data_dir` with a leading `~/` expanded against `HOME`.
    pub fn resolved_data_dir(&self) -> String {
        match self.data_dir.strip_prefix("~/") {
            Some(rest) => match std::env::var("HOME") {
                Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
                Err(_) => self.data_dir.clone(),
            },
            None => self.data_dir.clone(),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty".into()));
    }
    if cfg.app.request_timeout_ms == 0 {
        return Err(ConfigError::Invalid("app.request_timeout_ms must be > 0".into()));
    }
    for (platform, raw) in &cfg.webhooks {
        parse_webhook_url(&format!("webhooks.{platform}"), raw)?;
    }
    if let Some(raw) = &cfg.automation.profile_webhook {
        parse_webhook_url("automation.profile_webhook", raw)?;
    }
    if cfg.automation.source.trim().is_empty() {
        return Err(ConfigError::Invalid("automation.source must be non-empty".into()));
    }
    Ok(())
}

fn parse_webhook_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid URL: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::Invalid(format!(
            "{field} must use http or https, got {other}"
        ))),
    }
}

/// Returns the example YAML configuration.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  request_timeout_ms: 10000
  # send_and_assume: a completed request counts as delivered, status ignored.
  # acknowledged: only 2xx responses count as delivered.
  delivery_mode: send_and_assume

webhooks:
  LinkedIn: "https://hook.us2.make.com/YOUR_LINKEDIN_SCENARIO"
  Twitter: "https://hook.us2.make.com/YOUR_TWITTER_SCENARIO"

automation:
  profile_webhook: "https://hook.us2.make.com/YOUR_PROFILE_SCENARIO"
  source: "LeaderAmplifierAi"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.app.delivery_mode, DeliveryMode::SendAndAssume);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn registry_contains_only_configured_platforms() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        let registry = cfg.webhook_registry().unwrap();
        assert!(registry.endpoint(Platform::LinkedIn).is_some());
        assert!(registry.endpoint(Platform::Twitter).is_some());
        assert!(registry.endpoint(Platform::Instagram).is_none());
    }

    #[test]
    fn defaults_apply_when_sections_missing() {
        let cfg: Config = serde_yaml::from_str("app:\n  data_dir: ./data\n").unwrap();
        validate(&cfg).unwrap();
        assert!(cfg.webhooks.is_empty());
        assert_eq!(cfg.app.request_timeout_ms, 10_000);
        assert_eq!(cfg.automation.source, "LeaderAmplifierAi");
        assert!(cfg.profile_webhook().unwrap().is_none());
    }

    #[test]
    fn webhook_keys_accept_slugs() {
        let yaml = "app:\n  data_dir: ./data\nwebhooks:\n  linkedin: \"https://hook.us2.make.com/a\"\n  youtube: \"https://hook.us2.make.com/b\"\n  TikTok: \"https://hook.us2.make.com/c\"\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        let registry = cfg.webhook_registry().unwrap();
        assert_eq!(
            registry.platforms().collect::<Vec<_>>(),
            vec![Platform::LinkedIn, Platform::YouTube, Platform::TikTok]
        );

        let err = serde_yaml::from_str::<Config>("app:\n  data_dir: ./data\nwebhooks:\n  myspace: \"https://x.example\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("unknown platform: myspace"));
    }

    #[test]
    fn invalid_data_dir() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("data_dir")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn invalid_webhook_urls() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.webhooks.insert(Platform::Instagram, "not a url".into());
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("webhooks.Instagram")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.automation.profile_webhook = Some("ftp://hook.example.com/x".into());
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.request_timeout_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let td = tempdir().unwrap();
        let data_path = td.path().join("data");
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.app.data_dir = data_path.to_string_lossy().to_string();
        cfg.ensure_dirs().unwrap();
        assert!(data_path.exists());
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.webhooks.len(), 2);
    }
}

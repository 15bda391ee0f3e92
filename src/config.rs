use std::fmt;
use std::path::PathBuf;

use color_eyre::{
    Result,
    eyre::{Context, bail},
};
use serde::{Deserialize, Deserializer};
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://www.robotevents.com/api/v2/";

/// Runtime settings, read once from the environment at startup.
#[derive(Clone, Deserialize)]
pub struct Config {
    pub api_token: String,
    pub slack_webhook_url: Url,
    #[serde(default, deserialize_with = "comma_separated")]
    pub event_ids: Vec<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: Url,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Also post the "no teams are missing" message for unchanged events.
    #[serde(default)]
    pub notify_unchanged: bool,
}

fn default_api_base_url() -> Url {
    Url::parse(DEFAULT_API_BASE_URL).expect("default API base URL is valid")
}

const fn default_page_size() -> u32 {
    250
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_user_agent() -> String {
    concat!("roster-tracker/", env!("CARGO_PKG_VERSION")).into()
}

fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect())
}

impl Config {
    /// Loads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config: Config = envy::from_iter(vars).wrap_err("failed to load config")?;

        if config.api_token.trim().is_empty() {
            bail!("API_TOKEN environment variable is not set");
        }

        // `Url::join` drops the last path segment unless it ends with a slash
        if !config.api_base_url.path().ends_with('/') {
            let path = format!("{}/", config.api_base_url.path());
            config.api_base_url.set_path(&path);
        }

        Ok(config)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<redacted>")
            .field("slack_webhook_url", &"<redacted>")
            .field("event_ids", &self.event_ids)
            .field("api_base_url", &self.api_base_url.as_str())
            .field("page_size", &self.page_size)
            .field("storage_path", &self.storage_path)
            .field("user_agent", &self.user_agent)
            .field("notify_unchanged", &self.notify_unchanged)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn required() -> Vec<(String, String)> {
        vars(&[
            ("API_TOKEN", "secret"),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/services/T/B/X"),
        ])
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_vars(required()).unwrap();

        assert_eq!(config.api_token, "secret");
        assert!(config.event_ids.is_empty());
        assert_eq!(config.api_base_url.as_str(), DEFAULT_API_BASE_URL);
        assert_eq!(config.page_size, 250);
        assert_eq!(config.storage_path, PathBuf::from("."));
        assert!(config.user_agent.starts_with("roster-tracker/"));
        assert!(!config.notify_unchanged);
    }

    #[test]
    fn test_event_ids_split_and_trimmed() {
        let mut pairs = required();
        pairs.push(("EVENT_IDS".into(), " 123, 456 ,,789,".into()));

        let config = Config::from_vars(pairs).unwrap();

        assert_eq!(config.event_ids, vec!["123", "456", "789"]);
    }

    #[test]
    fn test_empty_event_ids_yield_nothing() {
        let mut pairs = required();
        pairs.push(("EVENT_IDS".into(), String::new()));

        let config = Config::from_vars(pairs).unwrap();

        assert!(config.event_ids.is_empty());
    }

    #[test]
    fn test_missing_token_is_fatal() {
        let pairs = vars(&[("SLACK_WEBHOOK_URL", "https://hooks.slack.com/x")]);
        assert!(Config::from_vars(pairs).is_err());
    }

    #[test]
    fn test_blank_token_is_fatal() {
        let pairs = vars(&[
            ("API_TOKEN", "  "),
            ("SLACK_WEBHOOK_URL", "https://hooks.slack.com/x"),
        ]);
        let err = Config::from_vars(pairs).unwrap_err();
        assert!(err.to_string().contains("API_TOKEN"));
    }

    #[test]
    fn test_missing_or_invalid_webhook_is_fatal() {
        assert!(Config::from_vars(vars(&[("API_TOKEN", "secret")])).is_err());

        let pairs = vars(&[("API_TOKEN", "secret"), ("SLACK_WEBHOOK_URL", "")]);
        assert!(Config::from_vars(pairs).is_err());
    }

    #[test]
    fn test_overrides_and_base_url_normalised() {
        let mut pairs = required();
        pairs.extend(vars(&[
            ("API_BASE_URL", "http://localhost:8080/api/v2"),
            ("PAGE_SIZE", "50"),
            ("STORAGE_PATH", "/var/lib/roster"),
            ("NOTIFY_UNCHANGED", "true"),
        ]));

        let config = Config::from_vars(pairs).unwrap();

        assert_eq!(config.api_base_url.as_str(), "http://localhost:8080/api/v2/");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.storage_path, PathBuf::from("/var/lib/roster"));
        assert!(config.notify_unchanged);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(required()).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("hooks.slack.com"));
    }
}

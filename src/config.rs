//! Configuration parsing and validation
//!
//! Everything the handlers need from the environment is parsed once at start into [`Config`]
//! with clap (flags, falling back to environment variables) and then handed to
//! [`crate::AppState`]. Nothing reads the environment after that.
use anyhow::anyhow;
use clap::{ArgAction, Args, Parser};
use std::fmt;
use std::time::Duration;
use tracing::warn;
use url::Url;

use crate::client::PoolSettings;

pub const DEFAULT_USERS_TABLE: &str = "profiles";
pub const DEFAULT_HEALTH_TABLE: &str = "profiles";
pub const DEFAULT_LISTING_TABLE: &str = "submissions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1/";

/// A credential that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([redacted])")
    }
}

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the handlers will listen.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// The port on which the metrics server will listen.
    #[arg(long, default_value_t = 9090)]
    pub metrics_port: u16,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, default_value_t = true, action = ArgAction::Set)]
    pub metrics: bool,

    /// The prefix to use for metrics.
    #[arg(long, default_value = "edge_relay")]
    pub metrics_prefix: String,

    #[command(flatten)]
    pub store: StoreConfig,

    #[command(flatten)]
    pub model: ModelConfig,

    #[command(flatten)]
    pub tables: Tables,

    #[command(flatten)]
    pub chat: ChatDefaults,

    /// Maximum number of idle HTTP connections to keep alive per upstream host.
    #[arg(long, default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle HTTP connections alive.
    #[arg(long, default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

/// Where the data store lives and the privileged key used to reach it.
#[derive(Debug, Clone, Default, Args)]
pub struct StoreConfig {
    /// Base URL of the data store project, e.g. https://xyz.supabase.co
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Service-role key for the data store. Bypasses row-level policies.
    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub service_role_key: Option<Secret>,
}

impl StoreConfig {
    /// Both the URL and the key, or `None` if either is missing or blank.
    pub fn credentials(&self) -> Result<Option<(Url, Secret)>, anyhow::Error> {
        let url = match self.supabase_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url,
            _ => return Ok(None),
        };
        let key = match &self.service_role_key {
            Some(key) if !key.is_blank() => key.clone(),
            _ => return Ok(None),
        };
        let url = Url::parse(url).map_err(|e| anyhow!("Invalid data store URL '{}': {}", url, e))?;
        Ok(Some((url, key)))
    }
}

#[derive(Debug, Clone, Args)]
pub struct ModelConfig {
    /// API key for the chat completion provider.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<Secret>,

    /// Base URL of an OpenAI-compatible API.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: Url,
}

impl ModelConfig {
    pub fn api_key(&self) -> Option<Secret> {
        self.openai_api_key
            .as_ref()
            .filter(|key| !key.is_blank())
            .cloned()
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: Url::parse(DEFAULT_OPENAI_BASE_URL)
                .expect("default OpenAI URL is valid"),
        }
    }
}

/// Which tables each handler touches.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct Tables {
    /// Table holding the user rows that /activate-user updates.
    #[arg(long, env = "USERS_TABLE", default_value = DEFAULT_USERS_TABLE)]
    pub users: String,

    /// Table probed by /health-check.
    #[arg(long = "health-table", env = "HEALTH_TABLE", default_value = DEFAULT_HEALTH_TABLE)]
    pub health: String,

    /// Table returned by /list-rows.
    #[arg(long = "listing-table", env = "LISTING_TABLE", default_value = DEFAULT_LISTING_TABLE)]
    pub listing: String,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            users: DEFAULT_USERS_TABLE.into(),
            health: DEFAULT_HEALTH_TABLE.into(),
            listing: DEFAULT_LISTING_TABLE.into(),
        }
    }
}

/// Values the chat handler uses when the request leaves them out.
#[derive(Debug, Clone, PartialEq, Args)]
pub struct ChatDefaults {
    #[arg(long = "default-model", env = "DEFAULT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long = "default-system-prompt", env = "DEFAULT_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    #[arg(long = "default-temperature", env = "DEFAULT_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,
}

impl Default for ChatDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(anyhow!(
                "Default temperature {} is outside the range 0 to 2",
                self.chat.temperature
            ));
        }
        if self.store.credentials()?.is_none() {
            warn!("Data store URL or service-role key not set; store-backed endpoints will fail");
        }
        if self.model.api_key().is_none() {
            warn!("OpenAI API key not set; /chat will fail");
        }
        Ok(self)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_idle_per_host: self.pool_max_idle_per_host,
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["edge-relay"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse(&[
            "--port",
            "8080",
            "--supabase-url",
            "https://project.supabase.co",
            "--service-role-key",
            "service-key",
            "--listing-table",
            "leads",
            "--default-temperature",
            "0.2",
            "--metrics",
            "false",
        ]);

        assert_eq!(config.port, 8080);
        assert!(!config.metrics);
        assert_eq!(config.tables.listing, "leads");
        assert_eq!(config.tables.users, DEFAULT_USERS_TABLE);
        assert_eq!(config.chat.temperature, 0.2);

        let (url, key) = config.store.credentials().unwrap().unwrap();
        assert_eq!(url.as_str(), "https://project.supabase.co/");
        assert_eq!(key.expose(), "service-key");
    }

    #[test]
    fn test_blank_credentials_count_as_missing() {
        let store = StoreConfig {
            supabase_url: Some("https://project.supabase.co".into()),
            service_role_key: Some(Secret::from("   ".to_string())),
        };
        assert!(store.credentials().unwrap().is_none());

        let store = StoreConfig {
            supabase_url: Some("".into()),
            service_role_key: Some(Secret::from("key".to_string())),
        };
        assert!(store.credentials().unwrap().is_none());

        let model = ModelConfig {
            openai_api_key: Some(Secret::from(String::new())),
            ..ModelConfig::default()
        };
        assert!(model.api_key().is_none());
    }

    #[test]
    fn test_invalid_store_url_is_rejected() {
        let store = StoreConfig {
            supabase_url: Some("not a url".into()),
            service_role_key: Some(Secret::from("key".to_string())),
        };
        assert!(store.credentials().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_temperature() {
        let config = parse(&["--default-temperature", "3.5"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_are_redacted_in_debug_output() {
        let config = parse(&["--openai-api-key", "sk-very-secret"]);
        let printed = format!("{config:?}");
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("[redacted]"));
    }
}

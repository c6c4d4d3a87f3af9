//! Process configuration, read once at startup and injected everywhere else.

use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

/// Connection-string variables, checked in order.
pub const DATABASE_URL_VARS: [&str; 3] = ["DATABASE_URL", "SQLITE_DATABASE_URL", "DB_URL"];
pub const API_KEY_VARS: [&str; 2] = ["ANTHROPIC_API_KEY", "LLM_API_KEY"];

pub const DEFAULT_LLM_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_OEMBED_URL: &str = "https://www.youtube.com/oembed";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Settings for the hosted language model.
#[derive(Debug)]
pub struct LlmConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Extra attempts after the first call. Zero means a single round trip.
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_LLM_MODEL.to_string(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            max_retries: 0,
        }
    }
}

/// Deployment metadata surfaced verbatim by the version endpoint.
#[derive(Debug, Clone, Default, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentInfo {
    pub commit: Option<String>,
    pub branch: Option<String>,
    pub environment: Option<String>,
    pub deployed_at: Option<String>,
}

#[derive(Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub persistence_enabled: bool,
    pub llm: LlmConfig,
    /// `None` disables metadata lookups for video links.
    pub youtube_oembed_url: Option<String>,
    pub deployment: DeploymentInfo,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: None,
            persistence_enabled: false,
            llm: LlmConfig::default(),
            youtube_oembed_url: Some(DEFAULT_OEMBED_URL.to_string()),
            deployment: DeploymentInfo::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let first_of = |keys: &[&str]| keys.iter().find_map(|&k| get(k));

        let defaults = Self::default();
        let database_url = first_of(&DATABASE_URL_VARS);
        let persistence_enabled = match get("PERSISTENCE_ENABLED") {
            Some(v) => parse_bool("PERSISTENCE_ENABLED", &v)?,
            None => database_url.is_some(),
        };

        let llm_defaults = LlmConfig::default();
        let llm = LlmConfig {
            api_key: first_of(&API_KEY_VARS).map(SecretString::from),
            model: get("LLM_MODEL").unwrap_or(llm_defaults.model),
            base_url: get("LLM_BASE_URL").unwrap_or(llm_defaults.base_url),
            max_tokens: parse_or("LLM_MAX_TOKENS", get("LLM_MAX_TOKENS"), llm_defaults.max_tokens)?,
            timeout: Duration::from_secs(parse_or(
                "LLM_TIMEOUT_SECS",
                get("LLM_TIMEOUT_SECS"),
                llm_defaults.timeout.as_secs(),
            )?),
            max_retries: parse_or("LLM_MAX_RETRIES", get("LLM_MAX_RETRIES"), 0)?,
        };

        let youtube_oembed_url = match get("YOUTUBE_OEMBED_URL") {
            Some(v) if v.eq_ignore_ascii_case("off") => None,
            Some(v) => Some(v),
            None => defaults.youtube_oembed_url,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", get("PORT"), defaults.port)?,
            database_url,
            persistence_enabled,
            llm,
            youtube_oembed_url,
            deployment: DeploymentInfo {
                commit: get("GIT_COMMIT_SHA"),
                branch: get("GIT_BRANCH"),
                environment: get("DEPLOY_ENV"),
                deployed_at: get("DEPLOYED_AT"),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn persistence_follows_connection_string() {
        let config = config_from(&[]).unwrap();
        assert!(!config.persistence_enabled);
        assert!(config.database_url.is_none());

        let config = config_from(&[("DB_URL", "sqlite://coach.db")]).unwrap();
        assert!(config.persistence_enabled);
        assert_eq!(config.database_url.as_deref(), Some("sqlite://coach.db"));
    }

    #[test]
    fn earlier_database_variable_wins() {
        let config = config_from(&[
            ("DB_URL", "sqlite://old.db"),
            ("DATABASE_URL", "sqlite://new.db"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("sqlite://new.db"));
    }

    #[test]
    fn explicit_flag_overrides_connection_string() {
        let config = config_from(&[
            ("DATABASE_URL", "sqlite://coach.db"),
            ("PERSISTENCE_ENABLED", "false"),
        ])
        .unwrap();
        assert!(!config.persistence_enabled);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = config_from(&[("DATABASE_URL", "   "), ("ANTHROPIC_API_KEY", "")]).unwrap();
        assert!(config.database_url.is_none());
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn reads_llm_settings() {
        let config = config_from(&[
            ("LLM_API_KEY", "sk-test"),
            ("LLM_MODEL", "claude-test"),
            ("LLM_TIMEOUT_SECS", "15"),
            ("LLM_MAX_RETRIES", "2"),
        ])
        .unwrap();
        assert_eq!(
            config.llm.api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("sk-test".to_string())
        );
        assert_eq!(config.llm.model, "claude-test");
        assert_eq!(config.llm.timeout, Duration::from_secs(15));
        assert_eq!(config.llm.max_retries, 2);
    }

    #[test]
    fn rejects_bad_port() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn oembed_can_be_switched_off() {
        let config = config_from(&[("YOUTUBE_OEMBED_URL", "off")]).unwrap();
        assert!(config.youtube_oembed_url.is_none());
    }

    #[test]
    fn deployment_metadata_is_verbatim() {
        let config = config_from(&[("GIT_COMMIT_SHA", "abc123"), ("DEPLOY_ENV", "preview")]).unwrap();
        assert_eq!(config.deployment.commit.as_deref(), Some("abc123"));
        assert_eq!(config.deployment.environment.as_deref(), Some("preview"));
        assert!(config.deployment.branch.is_none());
    }
}

//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use secrecy::SecretString;

use crate::error::ConfigError;

/// Default trigger text (U+53EB, "call out").
pub const DEFAULT_TRIGGER: &str = "叫";

/// Default LINE Messaging API base URL.
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";

/// Process-wide configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Absolute URL prefix for assets referenced in replies.
    pub base_url: Url,
    /// Exact text that triggers the audio reply.
    pub trigger: String,
    pub bind_address: String,
    pub port: u16,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    pub line: LineConfig,
}

/// Credentials and endpoint for the LINE platform collaborators.
#[derive(Debug, Clone)]
pub struct LineConfig {
    pub channel_secret: SecretString,
    pub channel_access_token: SecretString,
    pub api_base: Url,
    pub reply_timeout: Duration,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = non_empty("BASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("BASE_URL".into()))
            .and_then(|raw| parse_base_url("BASE_URL", &raw))?;

        let channel_secret = non_empty("LINE_CHANNEL_SECRET")
            .ok_or_else(|| ConfigError::MissingEnvVar("LINE_CHANNEL_SECRET".into()))?;

        let channel_access_token = non_empty("LINE_CHANNEL_ACCESS_TOKEN")
            .or_else(|| non_empty("LINE_CHANNEL_TOKEN"))
            .ok_or_else(|| ConfigError::MissingEnvVar("LINE_CHANNEL_ACCESS_TOKEN".into()))?;

        let api_base = match non_empty("LINE_API_BASE_URL") {
            Some(raw) => parse_base_url("LINE_API_BASE_URL", &raw)?,
            None => parse_base_url("LINE_API_BASE_URL", DEFAULT_LINE_API_BASE)?,
        };

        let reply_timeout_secs: u64 = match non_empty("LINE_REPLY_TIMEOUT_SECS") {
            Some(raw) => parse_number("LINE_REPLY_TIMEOUT_SECS", &raw)?,
            None => 10,
        };

        let port: u16 = match non_empty("PINGU_PORT").or_else(|| non_empty("PORT")) {
            Some(raw) => parse_number("PINGU_PORT", &raw)?,
            None => 8080,
        };

        // Trigger is compared verbatim, so only an entirely unset value falls back.
        let trigger = lookup("PINGU_TRIGGER")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_TRIGGER.to_string());

        Ok(Self {
            base_url,
            trigger,
            bind_address: non_empty("PINGU_BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            static_dir: non_empty("PINGU_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            line: LineConfig {
                channel_secret: SecretString::from(channel_secret),
                channel_access_token: SecretString::from(channel_access_token),
                api_base,
                reply_timeout: Duration::from_secs(reply_timeout_secs),
            },
        })
    }

    /// `host:port` the HTTP listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Parse an absolute http(s) URL that can serve as a path prefix.
pub fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        key: key.into(),
        message: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("expected an absolute http(s) URL, got {raw}"),
        });
    }

    Ok(url)
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.into(),
        message: format!("not a valid number: {raw}"),
    })
}

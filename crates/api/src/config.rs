use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use adverify_core::lifecycle::{LifecyclePolicy, NotifyOn, DEFAULT_CLIENT_DWELL_SECS};
use adverify_events::postback::{DEFAULT_URL_TEMPLATE, MAX_RETRIES};
use adverify_events::PostbackConfig;

/// Accepted range for the postback timeout, in seconds.
const POSTBACK_TIMEOUT_RANGE_SECS: (u64, u64) = (5, 15);

/// Default target of the "open the ad" button.
pub const DEFAULT_AD_LINK: &str = "https://otieu.com/4/10231904";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// An environment value that was accepted after being adjusted.
///
/// Configuration is loaded before logging is set up, so adjustments are
/// collected here and reported by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAdjustment {
    pub var: &'static str,
    pub requested: String,
    pub applied: String,
}

/// Log output format of the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// Everything except `BOT_SECRET` has a default suitable for local
/// development.
#[derive(Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight postbacks (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Shared secret the bot presents on privileged calls.
    pub bot_secret: String,
    /// Externally reachable base URL used to build confirmation links.
    pub public_base_url: String,
    /// Advertisement the confirmation page sends the user to.
    pub ad_link: String,
    /// Postback delivery settings; `None` disables postbacks.
    pub postback: Option<PostbackConfig>,
    pub policy: LifecyclePolicy,
    pub log_format: LogFormat,
    /// Values that were clamped into range while loading.
    pub adjustments: Vec<ConfigAdjustment>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("shutdown_timeout_secs", &self.shutdown_timeout_secs)
            .field("bot_secret", &"[redacted]")
            .field("public_base_url", &self.public_base_url)
            .field("ad_link", &self.ad_link)
            .field("postback", &self.postback)
            .field("policy", &self.policy)
            .field("log_format", &self.log_format)
            .field("adjustments", &self.adjustments)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `BOT_SECRET`                 | (required)                 |
    /// | `PUBLIC_BASE_URL`            | `http://localhost:3000`    |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `10`                       |
    /// | `AD_LINK`                    | ad network landing page    |
    /// | `POSTBACK_URL_TEMPLATE`      | Monetag postback; empty disables |
    /// | `POSTBACK_TIMEOUT_SECS`      | `10` (clamped to 5..=15)   |
    /// | `POSTBACK_MAX_RETRIES`       | `0` (at most 3)            |
    /// | `POSTBACK_ON`                | `ad` (`ad` or `all`)       |
    /// | `REQUIRE_SECRET_ON_COMPLETE` | `false`                    |
    /// | `CLIENT_DWELL_SECS`          | `8`                        |
    /// | `LOG_FORMAT`                 | `text` (`text` or `json`)  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let bot_secret = env
            .get("BOT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("BOT_SECRET"))?;

        let cors_origins: Vec<String> = env
            .or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let public_base_url = env
            .or("PUBLIC_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();

        let mut adjustments = Vec::new();

        let policy = LifecyclePolicy {
            require_secret_on_complete: env.parse_bool("REQUIRE_SECRET_ON_COMPLETE", false)?,
            client_dwell_secs: env.parse("CLIENT_DWELL_SECS", DEFAULT_CLIENT_DWELL_SECS)?,
            notify_on: env.parse("POSTBACK_ON", NotifyOn::AdOnly)?,
        };

        Ok(Self {
            host: env.or("HOST", "0.0.0.0"),
            port: env.parse("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env.parse("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env.parse("SHUTDOWN_TIMEOUT_SECS", 10)?,
            bot_secret,
            public_base_url,
            ad_link: env.or("AD_LINK", DEFAULT_AD_LINK),
            postback: postback_from(&env, &mut adjustments)?,
            policy,
            log_format: env.parse("LOG_FORMAT", LogFormat::Text)?,
            adjustments,
        })
    }

    /// Public confirmation link for `token` under the page path `verify_path`.
    pub fn verify_url(&self, verify_path: &str, token: &str) -> String {
        format!("{}/{verify_path}/{token}", self.public_base_url)
    }
}

fn postback_from(
    env: &Env<'_>,
    adjustments: &mut Vec<ConfigAdjustment>,
) -> Result<Option<PostbackConfig>, ConfigError> {
    let url_template = env.or("POSTBACK_URL_TEMPLATE", DEFAULT_URL_TEMPLATE);
    if url_template.trim().is_empty() {
        return Ok(None);
    }

    let (min, max) = POSTBACK_TIMEOUT_RANGE_SECS;
    let requested: u64 = env.parse("POSTBACK_TIMEOUT_SECS", 10)?;
    let timeout_secs = requested.clamp(min, max);
    if timeout_secs != requested {
        adjustments.push(ConfigAdjustment {
            var: "POSTBACK_TIMEOUT_SECS",
            requested: requested.to_string(),
            applied: timeout_secs.to_string(),
        });
    }

    let max_retries: u32 = env.parse("POSTBACK_MAX_RETRIES", 0)?;
    if max_retries > MAX_RETRIES {
        return Err(ConfigError::Invalid {
            var: "POSTBACK_MAX_RETRIES",
            value: max_retries.to_string(),
            reason: format!("at most {MAX_RETRIES} retries are allowed"),
        });
    }

    Ok(Some(PostbackConfig {
        url_template,
        timeout: Duration::from_secs(timeout_secs),
        max_retries,
        ..PostbackConfig::default()
    }))
}

/// Typed access to a variable lookup.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
    }

    fn or(&self, var: &str, default: &str) -> String {
        self.get(var).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(var) {
            None => Ok(default),
            Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn parse_bool(&self, var: &'static str, default: bool) -> Result<bool, ConfigError> {
        match self.get(var) {
            None => Ok(default),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::Invalid {
                    var,
                    value: raw,
                    reason: "expected a boolean".into(),
                }),
            },
        }
    }
}

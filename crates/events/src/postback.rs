//! Postback delivery with exponential-backoff retry.
//!
//! [`PostbackNotifier`] confirms a verified token to the reward network by
//! issuing an HTTP GET against a URL template containing `{token}`. Each
//! attempt is bounded by [`PostbackConfig::timeout`]. The default
//! is a single attempt; up to [`MAX_RETRIES`] extra attempts can
//! be enabled, spaced 1x, 2x, 4x [`PostbackConfig::retry_base`] apart.

use std::time::Duration;

use adverify_core::notify::{Notifier, NotifyOutcome};
use adverify_core::token::token_prefix;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Placeholder substituted with the token in the URL template.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Default endpoint of the ad network's postback API.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://api.monetag.com/postback?token={token}&status=completed";

/// Default per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on retries after the first attempt.
pub const MAX_RETRIES: u32 = 3;

/// Everything except RFC 3986 unreserved characters is escaped.
const TOKEN_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Backoff multipliers applied to `retry_base` (1x, 2x, 4x).
const BACKOFF_FACTORS: [u32; MAX_RETRIES as usize] = [1, 2, 4];

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for postback delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum PostbackError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Postback returned HTTP {0}")]
    HttpStatus(u16),

    /// The URL template is unusable.
    #[error("Invalid postback URL template: {0}")]
    InvalidTemplate(String),
}

impl PostbackError {
    fn outcome(&self) -> NotifyOutcome {
        match self {
            Self::Request(err) if err.is_timeout() => NotifyOutcome::TimedOut,
            _ => NotifyOutcome::Failed,
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PostbackConfig {
    /// Endpoint template; must contain `{token}`.
    pub url_template: String,
    /// Timeout of a single attempt.
    pub timeout: Duration,
    /// Extra attempts after the first one, capped at [`MAX_RETRIES`].
    pub max_retries: u32,
    /// Base delay of the backoff schedule.
    pub retry_base: Duration,
}

impl Default for PostbackConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_base: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// PostbackNotifier
// ---------------------------------------------------------------------------

/// Delivers postbacks for verified tokens to the reward network.
pub struct PostbackNotifier {
    client: reqwest::Client,
    config: PostbackConfig,
}

impl PostbackNotifier {
    /// Build a notifier, validating the URL template up front.
    pub fn new(mut config: PostbackConfig) -> Result<Self, PostbackError> {
        if !config.url_template.contains(TOKEN_PLACEHOLDER) {
            return Err(PostbackError::InvalidTemplate(format!(
                "'{}' does not contain {TOKEN_PLACEHOLDER}",
                config.url_template
            )));
        }
        reqwest::Url::parse(&config.url_template.replace(TOKEN_PLACEHOLDER, "sample"))
            .map_err(|e| PostbackError::InvalidTemplate(e.to_string()))?;

        config.max_retries = config.max_retries.min(MAX_RETRIES);

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &PostbackConfig {
        &self.config
    }

    /// The concrete URL a postback for `token` is sent to. The token is
    /// percent-encoded before substitution.
    pub fn url_for(&self, token: &str) -> String {
        let encoded = utf8_percent_encode(token, TOKEN_ENCODE_SET).to_string();
        self.config.url_template.replace(TOKEN_PLACEHOLDER, &encoded)
    }

    /// Deliver the postback for `token`, retrying per the configured budget.
    pub async fn deliver(&self, token: &str) -> Result<(), PostbackError> {
        let url = self.url_for(token);
        let mut attempt = 0;

        loop {
            match self.try_send(&url).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.config.max_retries => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        token_prefix = token_prefix(token),
                        error = %e,
                        "Postback attempt failed, retrying"
                    );
                    let factor = BACKOFF_FACTORS[attempt as usize];
                    tokio::time::sleep(self.config.retry_base * factor).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        attempts = attempt + 1,
                        token_prefix = token_prefix(token),
                        error = %e,
                        "Postback delivery failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Execute a single GET request and check the response status.
    async fn try_send(&self, url: &str) -> Result<(), PostbackError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(PostbackError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for PostbackNotifier {
    async fn notify(&self, token: &str) -> NotifyOutcome {
        match self.deliver(token).await {
            Ok(()) => NotifyOutcome::Delivered,
            Err(e) => e.outcome(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

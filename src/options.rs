use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::StrategyKind;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_RETRIES: usize = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

pub const VALID_MIN_TIMEOUT: Duration = Duration::from_secs(1);
pub const VALID_MAX_TIMEOUT: Duration = Duration::from_secs(30);
pub const VALID_MIN_RETRIES: usize = 1;
pub const VALID_MAX_RETRIES: usize = 10;
pub const VALID_MIN_BASE_DELAY: Duration = Duration::from_millis(300);
pub const VALID_MAX_BASE_DELAY: Duration = Duration::from_secs(5);
pub const VALID_MIN_MAX_DELAY: Duration = Duration::from_millis(300);
pub const VALID_MAX_MAX_DELAY: Duration = Duration::from_secs(120);

/// Configures the request deadline and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Deadline for a whole logical request in milliseconds, retries included.
    pub timeout_ms: u64,
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    pub strategy: StrategyKind,
    /// Base delay in milliseconds; the fixed delay for the fixed strategy.
    pub base_delay_ms: u64,
    /// Delay ceiling in milliseconds. Ignored by the fixed strategy.
    pub max_delay_ms: u64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_retries: DEFAULT_MAX_RETRIES,
            strategy: StrategyKind::Exponential,
            base_delay_ms: DEFAULT_BASE_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
        }
    }
}

impl RetryOptions {
    /// Reads options from the environment, keeping defaults for unset variables.
    ///
    /// Reads:
    /// - `HTTP_RETRY_TIMEOUT_MS`
    /// - `HTTP_RETRY_MAX_RETRIES`
    /// - `HTTP_RETRY_STRATEGY` (`fixed`, `exponential` or `jitter`)
    /// - `HTTP_RETRY_BASE_DELAY_MS`
    /// - `HTTP_RETRY_MAX_DELAY_MS`
    ///
    /// Values are not range-checked here; the builder does that.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use http_retrier::RetryOptions;
    ///
    /// let opts = RetryOptions::from_env().expect("invalid HTTP_RETRY_* env vars");
    /// ```
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut opts = Self::default();
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = read("HTTP_RETRY_TIMEOUT_MS") {
            opts.timeout_ms = parse_var("HTTP_RETRY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read("HTTP_RETRY_MAX_RETRIES") {
            opts.max_retries = parse_var("HTTP_RETRY_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read("HTTP_RETRY_STRATEGY") {
            opts.strategy = parse_var("HTTP_RETRY_STRATEGY", &value)?;
        }
        if let Some(value) = read("HTTP_RETRY_BASE_DELAY_MS") {
            opts.base_delay_ms = parse_var("HTTP_RETRY_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read("HTTP_RETRY_MAX_DELAY_MS") {
            opts.max_delay_ms = parse_var("HTTP_RETRY_MAX_DELAY_MS", &value)?;
        }
        Ok(opts)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err| format!("{name} has invalid value '{value}': {err}"))
}

use std::{fmt, sync::Arc, time::Duration};

use crate::{
    options::{
        DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT,
        VALID_MAX_BASE_DELAY, VALID_MAX_MAX_DELAY, VALID_MAX_RETRIES, VALID_MAX_TIMEOUT,
        VALID_MIN_BASE_DELAY, VALID_MIN_MAX_DELAY, VALID_MIN_RETRIES, VALID_MIN_TIMEOUT,
    },
    Backoff, ReqwestTransport, RetryClient, RetryObserver, RetryOptions, RetryTransport,
    StrategyKind, TracingObserver,
};

/// Fluent builder for [`RetryClient`].
///
/// Setters store values as given. [`build`](Self::build) replaces every
/// out-of-range value with its default and logs a warning.
#[derive(Clone)]
pub struct RetryClientBuilder {
    timeout: Duration,
    max_retries: usize,
    strategy: StrategyKind,
    base_delay: Duration,
    max_delay: Duration,
    http: Option<reqwest::Client>,
    observer: Arc<dyn RetryObserver>,
}

impl fmt::Debug for RetryClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClientBuilder")
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("strategy", &self.strategy)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("custom_http", &self.http.is_some())
            .finish()
    }
}

impl Default for RetryClientBuilder {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            strategy: StrategyKind::Exponential,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            http: None,
            observer: Arc::new(TracingObserver),
        }
    }
}

impl RetryClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deadline for a whole logical request. Valid range: 1s to 30s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Valid range: 1 to 10.
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay for exponential and jitter strategies, and the delay of the
    /// fixed strategy. Valid range: 300ms to 5s.
    pub fn with_retry_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay ceiling, ignored by the fixed strategy. Valid range: 300ms to 120s.
    pub fn with_retry_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_retry_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Selects the strategy by name, falling back to exponential for unknown names.
    pub fn with_retry_strategy_str(mut self, strategy: &str) -> Self {
        self.strategy = strategy.parse().unwrap_or_else(|_| {
            tracing::warn!(
                invalid_value = strategy,
                default_value = %StrategyKind::Exponential,
                "invalid retry strategy, using default"
            );
            StrategyKind::Exponential
        });
        self
    }

    /// Applies every field of `opts`.
    pub fn with_options(self, opts: &RetryOptions) -> Self {
        self.with_timeout(opts.timeout())
            .with_max_retries(opts.max_retries)
            .with_retry_strategy(opts.strategy)
            .with_retry_base_delay(opts.base_delay())
            .with_retry_max_delay(opts.max_delay())
    }

    /// Uses a preconfigured `reqwest::Client` as the underlying transport.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub fn build(self) -> RetryClient {
        let timeout = in_range(
            "timeout",
            self.timeout,
            VALID_MIN_TIMEOUT..=VALID_MAX_TIMEOUT,
            DEFAULT_TIMEOUT,
        );
        let max_retries = in_range(
            "max retries",
            self.max_retries,
            VALID_MIN_RETRIES..=VALID_MAX_RETRIES,
            DEFAULT_MAX_RETRIES,
        );
        let base_delay = in_range(
            "base delay",
            self.base_delay,
            VALID_MIN_BASE_DELAY..=VALID_MAX_BASE_DELAY,
            DEFAULT_BASE_DELAY,
        );
        let max_delay = in_range(
            "max delay",
            self.max_delay,
            VALID_MIN_MAX_DELAY..=VALID_MAX_MAX_DELAY,
            DEFAULT_MAX_DELAY,
        );

        let options = RetryOptions {
            timeout_ms: timeout.as_millis() as u64,
            max_retries,
            strategy: self.strategy,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        };
        let backoff = Backoff::from_kind(self.strategy, base_delay, max_delay);
        let http = ReqwestTransport::new(self.http.unwrap_or_default());
        let transport =
            RetryTransport::new(http, max_retries, backoff).with_shared_observer(self.observer);

        RetryClient::from_parts(transport, options)
    }
}

fn in_range<T>(name: &str, value: T, range: std::ops::RangeInclusive<T>, default: T) -> T
where
    T: PartialOrd + fmt::Debug,
{
    if range.contains(&value) {
        return value;
    }
    tracing::warn!(
        invalid_value = ?value,
        default_value = ?default,
        "invalid {name}, using default value"
    );
    default
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::RetryClientBuilder;
    use crate::{RetryOptions, RetryStrategy, StrategyKind};

    #[test]
    fn defaults_survive_build() {
        let client = RetryClientBuilder::new().build();
        assert_eq!(client.options(), &RetryOptions::default());
        assert_eq!(client.transport().max_retries(), 3);
    }

    #[test]
    fn valid_values_are_kept() {
        let client = RetryClientBuilder::new()
            .with_timeout(Duration::from_secs(12))
            .with_max_retries(7)
            .with_retry_strategy(StrategyKind::Fixed)
            .with_retry_base_delay(Duration::from_millis(750))
            .with_retry_max_delay(Duration::from_secs(60))
            .build();

        let opts = client.options();
        assert_eq!(opts.timeout_ms, 12_000);
        assert_eq!(opts.max_retries, 7);
        assert_eq!(opts.strategy, StrategyKind::Fixed);
        assert_eq!(opts.base_delay_ms, 750);
        assert_eq!(opts.max_delay_ms, 60_000);
        assert_eq!(
            client.transport().strategy().delay(4),
            Duration::from_millis(750)
        );
    }

    #[test]
    fn out_of_range_values_fall_back_to_defaults() {
        let client = RetryClientBuilder::new()
            .with_timeout(Duration::from_millis(10))
            .with_max_retries(0)
            .with_retry_base_delay(Duration::from_secs(9))
            .with_retry_max_delay(Duration::from_secs(600))
            .build();

        assert_eq!(client.options(), &RetryOptions::default());
        assert_eq!(client.transport().max_retries(), 3);
        assert_eq!(
            client.transport().strategy().delay(0),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let client = RetryClientBuilder::new()
            .with_timeout(Duration::from_secs(30))
            .with_max_retries(10)
            .with_retry_base_delay(Duration::from_millis(300))
            .with_retry_max_delay(Duration::from_secs(120))
            .build();

        let opts = client.options();
        assert_eq!(opts.timeout_ms, 30_000);
        assert_eq!(opts.max_retries, 10);
        assert_eq!(opts.base_delay_ms, 300);
        assert_eq!(opts.max_delay_ms, 120_000);
    }

    #[test]
    fn strategy_by_name() {
        let jitter = RetryClientBuilder::new()
            .with_retry_strategy_str("jitter")
            .build();
        assert_eq!(jitter.options().strategy, StrategyKind::Jitter);

        let fallback = RetryClientBuilder::new()
            .with_retry_strategy(StrategyKind::Fixed)
            .with_retry_strategy_str("fibonacci")
            .build();
        assert_eq!(fallback.options().strategy, StrategyKind::Exponential);
    }

    #[test]
    fn options_apply_in_one_call() {
        let opts = RetryOptions {
            timeout_ms: 2_000,
            max_retries: 2,
            strategy: StrategyKind::Jitter,
            base_delay_ms: 400,
            max_delay_ms: 4_000,
        };
        let client = RetryClientBuilder::new().with_options(&opts).build();
        assert_eq!(client.options(), &opts);
    }
}

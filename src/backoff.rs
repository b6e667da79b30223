use std::{fmt, str::FromStr, time::Duration};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maps a zero-based attempt index to the delay before the next attempt.
///
/// Implementations must be pure: one strategy value is shared by every
/// logical request going through a [`RetryTransport`](crate::RetryTransport).
/// Closures of the form `Fn(usize) -> Duration` implement this trait too.
pub trait RetryStrategy: Send + Sync {
    fn delay(&self, attempt: usize) -> Duration;
}

impl<F> RetryStrategy for F
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: usize) -> Duration {
        self(attempt)
    }
}

/// Same delay for every attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl RetryStrategy for FixedDelay {
    fn delay(&self, _attempt: usize) -> Duration {
        self.delay
    }
}

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// `base * 2^attempt`, capped at `max_delay`.
///
/// When `base` is larger than `max_delay`, attempt 0 still waits the full
/// `base`; later attempts are capped as usual. A product that overflows or
/// comes out as zero is replaced by `max_delay`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExponentialBackoff {
    base: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self { base, max_delay }
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        if attempt == 0 && self.base > self.max_delay {
            return self.base;
        }

        let nanos = u32::try_from(attempt)
            .ok()
            .and_then(|exp| 1u128.checked_shl(exp))
            .and_then(|multiplier| self.base.as_nanos().checked_mul(multiplier));

        match nanos {
            Some(nanos) if nanos != 0 && nanos <= self.max_delay.as_nanos() => Duration::new(
                (nanos / NANOS_PER_SEC) as u64,
                (nanos % NANOS_PER_SEC) as u32,
            ),
            _ => self.max_delay,
        }
    }
}

/// [`ExponentialBackoff`] plus a uniform random offset in `[0, delay / 2)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct JitterBackoff {
    exponential: ExponentialBackoff,
}

impl JitterBackoff {
    pub fn new(base: Duration, max_delay: Duration) -> Self {
        Self {
            exponential: ExponentialBackoff::new(base, max_delay),
        }
    }
}

impl RetryStrategy for JitterBackoff {
    fn delay(&self, attempt: usize) -> Duration {
        let delay = self.exponential.delay(attempt);
        let half = u64::try_from(delay.as_nanos() / 2).unwrap_or(u64::MAX);
        if half == 0 {
            return delay;
        }

        let jitter = rand::thread_rng().gen_range(0..half);
        delay.saturating_add(Duration::from_nanos(jitter))
    }
}

/// Name of a built-in strategy, as accepted by configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Fixed,
    #[default]
    Exponential,
    Jitter,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Exponential => "exponential",
            Self::Jitter => "jitter",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "fixed" => Ok(Self::Fixed),
            "exponential" => Ok(Self::Exponential),
            "jitter" => Ok(Self::Jitter),
            other => Err(format!("unknown retry strategy '{other}'")),
        }
    }
}

/// One of the built-in strategies, resolved from a [`StrategyKind`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backoff {
    Fixed(FixedDelay),
    Exponential(ExponentialBackoff),
    Jitter(JitterBackoff),
}

impl Backoff {
    /// Builds the strategy named by `kind`.
    ///
    /// For [`StrategyKind::Fixed`] the `base` is the fixed delay and
    /// `max_delay` is ignored.
    pub fn from_kind(kind: StrategyKind, base: Duration, max_delay: Duration) -> Self {
        match kind {
            StrategyKind::Fixed => Self::Fixed(FixedDelay::new(base)),
            StrategyKind::Exponential => {
                Self::Exponential(ExponentialBackoff::new(base, max_delay))
            }
            StrategyKind::Jitter => Self::Jitter(JitterBackoff::new(base, max_delay)),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Fixed(_) => StrategyKind::Fixed,
            Self::Exponential(_) => StrategyKind::Exponential,
            Self::Jitter(_) => StrategyKind::Jitter,
        }
    }
}

impl RetryStrategy for Backoff {
    fn delay(&self, attempt: usize) -> Duration {
        match self {
            Self::Fixed(inner) => inner.delay(attempt),
            Self::Exponential(inner) => inner.delay(attempt),
            Self::Jitter(inner) => inner.delay(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{
        Backoff, ExponentialBackoff, FixedDelay, JitterBackoff, RetryStrategy, StrategyKind,
    };

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn fixed_delay_is_constant() {
        let strategy = FixedDelay::new(ms(250));
        for attempt in [0, 1, 2, 10, 63, 64, 1_000, usize::MAX] {
            assert_eq!(strategy.delay(attempt), ms(250));
        }
    }

    #[test]
    fn exponential_doubles_until_cap() {
        let strategy = ExponentialBackoff::new(ms(100), ms(1_000));
        assert_eq!(strategy.delay(0), ms(100));
        assert_eq!(strategy.delay(1), ms(200));
        assert_eq!(strategy.delay(2), ms(400));
        assert_eq!(strategy.delay(3), ms(800));
        assert_eq!(strategy.delay(4), ms(1_000));
        assert_eq!(strategy.delay(10), ms(1_000));
    }

    #[test]
    fn exponential_is_monotonic_and_never_exceeds_cap() {
        let cap = ms(10_000);
        let strategy = ExponentialBackoff::new(ms(3), cap);
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = strategy.delay(attempt);
            assert!(delay >= previous, "attempt {attempt} went backwards");
            assert!(delay <= cap, "attempt {attempt} exceeded cap");
            previous = delay;
        }
        assert_eq!(previous, cap);
    }

    #[test]
    fn exponential_overflow_clamps_to_cap() {
        let cap = ms(5_000);
        let strategy = ExponentialBackoff::new(Duration::from_secs(u64::MAX / 4), cap);
        assert_eq!(strategy.delay(1), cap);
        assert_eq!(strategy.delay(40), cap);
        assert_eq!(strategy.delay(usize::MAX), cap);
    }

    #[test]
    fn exponential_keeps_doubling_past_32_attempts() {
        let cap = Duration::from_secs(3_600);
        let strategy = ExponentialBackoff::new(Duration::from_nanos(1), cap);
        assert_eq!(strategy.delay(31), Duration::from_nanos(1 << 31));
        assert_eq!(strategy.delay(32), Duration::from_nanos(1 << 32));
        assert_eq!(strategy.delay(41), Duration::from_nanos(1 << 41));
        assert_eq!(strategy.delay(42), cap);
        assert_eq!(strategy.delay(127), cap);
        assert_eq!(strategy.delay(128), cap);
    }

    #[test]
    fn exponential_zero_base_uses_cap() {
        let strategy = ExponentialBackoff::new(Duration::ZERO, ms(700));
        assert_eq!(strategy.delay(0), ms(700));
        assert_eq!(strategy.delay(3), ms(700));
    }

    #[test]
    fn exponential_base_above_cap_returns_base_on_first_attempt_only() {
        let strategy = ExponentialBackoff::new(ms(2_000), ms(500));
        assert_eq!(strategy.delay(0), ms(2_000));
        for attempt in 1..20 {
            assert!(strategy.delay(attempt) <= ms(500));
        }
    }

    #[test]
    fn jitter_stays_within_half_open_range() {
        let exponential = ExponentialBackoff::new(ms(10), ms(2_000));
        let strategy = JitterBackoff::new(ms(10), ms(2_000));
        for attempt in 0..12 {
            let floor = exponential.delay(attempt);
            let ceiling = floor + floor / 2;
            for _ in 0..50 {
                let delay = strategy.delay(attempt);
                assert!(delay >= floor, "attempt {attempt}: {delay:?} < {floor:?}");
                assert!(delay < ceiling, "attempt {attempt}: {delay:?} >= {ceiling:?}");
            }
        }
    }

    #[test]
    fn jitter_of_tiny_delay_adds_nothing() {
        let strategy = JitterBackoff::new(Duration::from_nanos(1), Duration::from_nanos(1));
        assert_eq!(strategy.delay(0), Duration::from_nanos(1));
    }

    #[test]
    fn closures_are_strategies() {
        let strategy = |attempt: usize| Duration::from_millis(attempt as u64 * 7);
        assert_eq!(RetryStrategy::delay(&strategy, 3), ms(21));
    }

    #[test]
    fn strategy_kind_parses_and_displays() {
        for kind in [
            StrategyKind::Fixed,
            StrategyKind::Exponential,
            StrategyKind::Jitter,
        ] {
            assert_eq!(kind.to_string().parse::<StrategyKind>(), Ok(kind));
        }
        assert!("linear".parse::<StrategyKind>().is_err());
        assert_eq!(StrategyKind::default(), StrategyKind::Exponential);
    }

    #[test]
    fn backoff_from_kind_selects_variant() {
        let fixed = Backoff::from_kind(StrategyKind::Fixed, ms(300), ms(10_000));
        assert_eq!(fixed.kind(), StrategyKind::Fixed);
        assert_eq!(fixed.delay(5), ms(300));

        let exponential = Backoff::from_kind(StrategyKind::Exponential, ms(300), ms(1_000));
        assert_eq!(exponential.delay(1), ms(600));
        assert_eq!(exponential.delay(2), ms(1_000));

        let jitter = Backoff::from_kind(StrategyKind::Jitter, ms(300), ms(1_000));
        assert_eq!(jitter.kind(), StrategyKind::Jitter);
        assert!(jitter.delay(0) >= ms(300));
    }
}

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::time::{self, Instant};

use crate::{Request, Response, Result, RetryError, RetryStrategy, Transport, TransportError};

/// Why an attempt is being retried.
#[derive(Debug)]
pub enum RetryCause<'a> {
    Status(StatusCode),
    Transport(&'a TransportError),
}

/// Receives one notification per scheduled retry.
pub trait RetryObserver: Send + Sync {
    /// `attempt` is the 1-based number of the attempt that just failed.
    fn on_retry(&self, attempt: usize, delay: Duration, cause: RetryCause<'_>);
}

/// Reports retries as `tracing` debug events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl RetryObserver for TracingObserver {
    fn on_retry(&self, attempt: usize, delay: Duration, cause: RetryCause<'_>) {
        match cause {
            RetryCause::Status(status) => tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                status = status.as_u16(),
                "attempt failed with server error, retrying"
            ),
            RetryCause::Transport(err) => tracing::debug!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed with transport error, retrying"
            ),
        }
    }
}

/// Retries requests on transport errors and 5xx responses.
///
/// Responses with a status below 500 are returned as-is. Every response that
/// is not returned is drained and closed before the next attempt.
#[derive(Clone)]
pub struct RetryTransport<T> {
    inner: T,
    max_retries: usize,
    strategy: Arc<dyn RetryStrategy>,
    observer: Arc<dyn RetryObserver>,
}

impl<T: fmt::Debug> fmt::Debug for RetryTransport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryTransport")
            .field("inner", &self.inner)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

enum Outcome {
    Status(StatusCode),
    Failed(TransportError),
}

impl<T: Transport> RetryTransport<T> {
    /// Wraps `inner`, sending each request at most `max_retries + 1` times.
    pub fn new(inner: T, max_retries: usize, strategy: impl RetryStrategy + 'static) -> Self {
        Self {
            inner,
            max_retries,
            strategy: Arc::new(strategy),
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl RetryObserver + 'static) -> Self {
        self.observer = Arc::new(observer);
        self
    }

    pub(crate) fn with_shared_observer(mut self, observer: Arc<dyn RetryObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    pub fn strategy(&self) -> &dyn RetryStrategy {
        self.strategy.as_ref()
    }

    /// Runs one logical request.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        let deadline = request
            .timeout()
            .and_then(|timeout| Instant::now().checked_add(timeout));
        let mut first_body = request.take_body();
        let mut last = None;
        let mut attempt = 0;

        while attempt <= self.max_retries {
            let body = match request.rewind() {
                Some(rewind) => Some(rewind().map_err(RetryError::BodyReplay)?),
                None => first_body.take(),
            };

            let sent = self.inner.send(request.for_attempt(body));
            let result = match deadline {
                Some(deadline) => match time::timeout_at(deadline, sent).await {
                    Ok(result) => result,
                    Err(_) => {
                        return Err(RetryError::DeadlineExceeded {
                            attempts: attempt + 1,
                        })
                    }
                },
                None => sent.await,
            };

            let outcome = match result {
                Ok(response) if response.status().as_u16() < 500 => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    response.discard().await?;
                    Outcome::Status(status)
                }
                Err(err) => Outcome::Failed(err),
            };

            if attempt == self.max_retries {
                last = Some(outcome);
                break;
            }

            let delay = self.strategy.delay(attempt);
            let cause = match &outcome {
                Outcome::Status(status) => RetryCause::Status(*status),
                Outcome::Failed(err) => RetryCause::Transport(err),
            };
            self.observer.on_retry(attempt + 1, delay, cause);

            match deadline {
                Some(deadline)
                    if Instant::now()
                        .checked_add(delay)
                        .map_or(true, |wake| wake >= deadline) =>
                {
                    time::sleep_until(deadline).await;
                    return Err(RetryError::DeadlineExceeded {
                        attempts: attempt + 1,
                    });
                }
                _ => time::sleep(delay).await,
            }

            last = Some(outcome);
            attempt += 1;
        }

        Err(match last {
            Some(Outcome::Failed(err)) => RetryError::Transport(err),
            Some(Outcome::Status(status)) => RetryError::Exhausted {
                status: status.as_u16(),
            },
            None => RetryError::AllRetriesFailed,
        })
    }
}

#[async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn send(&self, request: Request) -> std::result::Result<Response, TransportError> {
        self.execute(request).await.map_err(TransportError::other)
    }
}

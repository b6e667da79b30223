//! `http-retrier` adds retry-with-backoff to async HTTP transports.
//!
//! [`RetryTransport`] wraps any [`Transport`] and resends a request when the
//! send fails or the server answers with a 5xx status, waiting between
//! attempts as a [`RetryStrategy`] dictates:
//! - [`FixedDelay`]
//! - [`ExponentialBackoff`]
//! - [`JitterBackoff`]
//!
//! [`RetryClient`] bundles a retrying `reqwest` transport behind a validated
//! builder.

mod backoff;
mod body;
mod builder;
mod client;
mod error;
pub mod options;
mod retry;
mod transport;
mod types;

pub use backoff::{
    Backoff, ExponentialBackoff, FixedDelay, JitterBackoff, RetryStrategy, StrategyKind,
};
pub use body::{Body, FullBody, ResponseBody, Rewind};
pub use builder::RetryClientBuilder;
pub use client::RetryClient;
pub use error::{BoxError, RetryError, TransportError};
pub use options::RetryOptions;
pub use retry::{RetryCause, RetryObserver, RetryTransport, TracingObserver};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Request, Response};

pub type Result<T> = std::result::Result<T, RetryError>;

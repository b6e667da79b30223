use std::fmt;

use reqwest::{Method, Url};

use crate::{
    Body, ReqwestTransport, Request, Response, Result, RetryClientBuilder, RetryOptions,
    RetryTransport,
};

#[derive(Clone)]
/// HTTP client that retries transport errors and 5xx responses.
///
/// Built by [`RetryClientBuilder`]. The configured timeout is the default
/// deadline of each logical request, waits between attempts included.
pub struct RetryClient {
    transport: RetryTransport<ReqwestTransport>,
    options: RetryOptions,
}

impl fmt::Debug for RetryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryClient")
            .field("options", &self.options)
            .finish()
    }
}

impl Default for RetryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryClient {
    /// Creates a client with default options.
    pub fn new() -> Self {
        RetryClientBuilder::new().build()
    }

    /// Creates a client from options, applying the builder's range checks.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use http_retrier::{RetryClient, RetryOptions};
    ///
    /// let opts = RetryOptions::from_env().expect("invalid HTTP_RETRY_* env vars");
    /// let client = RetryClient::from_options(&opts);
    /// ```
    pub fn from_options(opts: &RetryOptions) -> Self {
        RetryClientBuilder::new().with_options(opts).build()
    }

    pub fn builder() -> RetryClientBuilder {
        RetryClientBuilder::new()
    }

    pub(crate) fn from_parts(
        transport: RetryTransport<ReqwestTransport>,
        options: RetryOptions,
    ) -> Self {
        Self { transport, options }
    }

    /// Options after validation.
    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn transport(&self) -> &RetryTransport<ReqwestTransport> {
        &self.transport
    }

    /// Sends `request`, retrying per the configured strategy.
    ///
    /// Requests without their own timeout get the client's.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        let request = match request.timeout() {
            Some(_) => request,
            None => request.with_timeout(self.options.timeout()),
        };
        self.transport.execute(request).await
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        let url = Url::parse(url)?;
        self.execute(Request::new(Method::GET, url)).await
    }

    /// Sends a POST. Buffered bodies are replayed on every retry.
    pub async fn post(&self, url: &str, body: impl Into<Body>) -> Result<Response> {
        let request = Request::new(Method::POST, Url::parse(url)?).with_body(body);
        self.execute(request).await
    }
}

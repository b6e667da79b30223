use std::{fmt, sync::Arc, time::Duration};

use bytes::{Bytes, BytesMut};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method, StatusCode, Url,
};

use crate::{Body, BoxError, FullBody, ResponseBody, Result, RetryError, Rewind};

/// Outgoing request descriptor.
///
/// Buffered bodies (bytes, strings, vectors) are rewound automatically on
/// every attempt. Stream bodies are sent once; later attempts go out with an
/// empty body unless a rewind function is supplied with
/// [`with_rewind`](Self::with_rewind).
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Body>,
    rewind: Option<Rewind>,
    timeout: Option<Duration>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            rewind: None,
            timeout: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> Option<Body> {
        self.body.take()
    }

    /// Deadline for the whole logical request, all attempts included.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Whether the body can be reproduced for another attempt.
    pub fn is_replayable(&self) -> bool {
        self.rewind.is_some()
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Buffered bodies become replayable unless a rewind function is already set.
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        let body = body.into();
        if self.rewind.is_none() {
            self.rewind = body.rewind_for();
        }
        self.body = Some(body);
        self
    }

    /// Sets the function that produces a fresh body for each attempt.
    ///
    /// When present it is called before every send, the first included.
    pub fn with_rewind<F>(mut self, rewind: F) -> Self
    where
        F: Fn() -> std::result::Result<Body, BoxError> + Send + Sync + 'static,
    {
        self.rewind = Some(Arc::new(rewind));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn rewind(&self) -> Option<&Rewind> {
        self.rewind.as_ref()
    }

    /// Copy of the request line and headers carrying `body`, for one send.
    pub(crate) fn for_attempt(&self, body: Option<Body>) -> Self {
        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
            rewind: None,
            timeout: self.timeout,
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("replayable", &self.rewind.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Response produced by a transport.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Box<dyn ResponseBody>,
}

impl Response {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl ResponseBody + 'static) -> Self {
        Self {
            status,
            headers,
            body: Box::new(body),
        }
    }

    pub fn from_bytes(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, HeaderMap::new(), FullBody::new(body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn into_body(self) -> Box<dyn ResponseBody> {
        self.body
    }

    /// Next chunk of the body, `None` once exhausted.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.body.chunk().await.map_err(RetryError::Body)
    }

    /// Reads the remaining body and closes it.
    pub async fn bytes(mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        self.body.close().await.map_err(RetryError::Body)?;
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|err| RetryError::Body(Box::new(err)))
    }

    /// Drains and closes a response that will not be handed to the caller.
    ///
    /// Close runs even when draining fails; the drain error wins.
    pub(crate) async fn discard(self) -> Result<()> {
        let mut body = self.body;
        let mut drained = Ok(());
        loop {
            match body.chunk().await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(err) => {
                    drained = Err(RetryError::Drain(err));
                    break;
                }
            }
        }
        let closed = body.close().await;

        drained?;
        closed.map_err(RetryError::Close)
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

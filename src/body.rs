use std::{fmt, sync::Arc};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{stream::BoxStream, Stream, StreamExt, TryStreamExt};

use crate::BoxError;

/// Produces a fresh copy of a request body for another attempt.
pub type Rewind = Arc<dyn Fn() -> Result<Body, BoxError> + Send + Sync>;

/// Request body: either fully buffered or a one-shot stream.
pub struct Body {
    inner: Inner,
}

enum Inner {
    Full(Bytes),
    Stream(BoxStream<'static, Result<Bytes, BoxError>>),
}

impl Body {
    pub fn empty() -> Self {
        Self::from(Bytes::new())
    }

    /// Wraps a stream of chunks. Stream bodies can only be sent once.
    pub fn wrap_stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            inner: Inner::Stream(stream.map_err(Into::into).boxed()),
        }
    }

    /// Returns the buffered bytes, or `None` for stream bodies.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.inner {
            Inner::Full(bytes) => Some(&bytes[..]),
            Inner::Stream(_) => None,
        }
    }

    /// Reads the whole body into memory.
    pub async fn into_bytes(self) -> Result<Bytes, BoxError> {
        match self.inner {
            Inner::Full(bytes) => Ok(bytes),
            Inner::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    pub(crate) fn rewind_for(&self) -> Option<Rewind> {
        match &self.inner {
            Inner::Full(bytes) => {
                let bytes = bytes.clone();
                let rewind: Rewind = Arc::new(move || Ok::<_, BoxError>(Body::from(bytes.clone())));
                Some(rewind)
            }
            Inner::Stream(_) => None,
        }
    }

    pub(crate) fn into_reqwest(self) -> reqwest::Body {
        match self.inner {
            Inner::Full(bytes) => reqwest::Body::from(bytes),
            Inner::Stream(stream) => reqwest::Body::wrap_stream(stream),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Full(bytes) => f.debug_tuple("Body").field(&bytes.len()).finish(),
            Inner::Stream(_) => f.write_str("Body(<stream>)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(value: Bytes) -> Self {
        Self {
            inner: Inner::Full(value),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(value: Vec<u8>) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<String> for Body {
    fn from(value: String) -> Self {
        Self::from(Bytes::from(value))
    }
}

impl From<&'static str> for Body {
    fn from(value: &'static str) -> Self {
        Self::from(Bytes::from_static(value.as_bytes()))
    }
}

impl From<&'static [u8]> for Body {
    fn from(value: &'static [u8]) -> Self {
        Self::from(Bytes::from_static(value))
    }
}

/// Response body as seen by the retry loop.
///
/// A discarded response is drained with [`chunk`](Self::chunk) until it
/// yields `None`, then [`close`](Self::close)d. Transports that hand out
/// pooled connections release them in `close`.
#[async_trait]
pub trait ResponseBody: Send {
    /// Next chunk of the body, `None` once exhausted.
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError>;

    async fn close(self: Box<Self>) -> Result<(), BoxError> {
        Ok(())
    }
}

/// In-memory response body.
#[derive(Clone, Debug, Default)]
pub struct FullBody {
    data: Option<Bytes>,
}

impl FullBody {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        Self {
            data: (!data.is_empty()).then_some(data),
        }
    }
}

#[async_trait]
impl ResponseBody for FullBody {
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError> {
        Ok(self.data.take())
    }
}

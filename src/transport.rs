use async_trait::async_trait;
use bytes::Bytes;

use crate::{BoxError, Request, Response, ResponseBody, TransportError};

/// Sends one request and returns one response.
///
/// A transport may enforce its own timeouts, TLS and pooling. Responses it
/// returns must release their resources when their body is closed.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, TransportError>;
}

/// [`Transport`] backed by a `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, mut request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.take_body() {
            builder = builder.body(body.into_reqwest());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        Ok(Response::new(status, headers, response))
    }
}

// Dropping a fully read `reqwest::Response` hands its connection back to the pool.
#[async_trait]
impl ResponseBody for reqwest::Response {
    async fn chunk(&mut self) -> Result<Option<Bytes>, BoxError> {
        reqwest::Response::chunk(self).await.map_err(Into::into)
    }
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn send(&self, request: Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}

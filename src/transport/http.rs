//! Default transport on `reqwest`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Method;
use url::Url;
use uuid::Uuid;

use crate::error::Result;
use crate::protocol::headers::{Headers, USER_AGENT};

use super::{HttpResponse, Transport};

/// HTTP transport that retries timeouts, connect errors and 429/503 responses.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    max_retries: u32,
}

impl HttpTransport {
    /// Create a transport with its own connection pool.
    pub fn new(max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()?;
        Ok(Self::with_client(client, max_retries))
    }

    /// Create a transport on an existing client.
    pub fn with_client(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    fn is_retriable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    fn is_retriable_status(status: u16) -> bool {
        status == 429 || status == 503
    }

    fn backoff(retries: u32) -> Duration {
        Duration::from_millis(100 * u64::from(retries))
    }

    async fn send(
        &self,
        method: Method,
        url: &Url,
        headers: &Headers,
        body: Option<Vec<u8>>,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        let mut retries = 0;
        loop {
            let mut builder = self.client.request(method.clone(), url.clone());
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if let Some(timeout) = timeout {
                builder = builder.timeout(timeout);
            }
            if let Some(body) = &body {
                builder = builder.body(body.clone());
            }

            let attempt_start = Instant::now();
            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    tracing::debug!(
                        %method,
                        path = url.path(),
                        status,
                        duration_ms = attempt_start.elapsed().as_millis(),
                        "response received"
                    );
                    if retries < self.max_retries && Self::is_retriable_status(status) {
                        retries += 1;
                        tracing::warn!(status, attempt = retries, "retriable status");
                        tokio::time::sleep(Self::backoff(retries)).await;
                        continue;
                    }
                    let body = response.bytes().await?;
                    return Ok(HttpResponse {
                        status,
                        body: body.to_vec(),
                    });
                }
                Err(e) if retries < self.max_retries && Self::is_retriable(&e) => {
                    retries += 1;
                    tracing::warn!(
                        %method,
                        path = url.path(),
                        attempt = retries,
                        error = %e,
                        "retriable transport error"
                    );
                    tokio::time::sleep(Self::backoff(retries)).await;
                }
                Err(e) => {
                    tracing::warn!(%method, path = url.path(), error = %e, "transport error");
                    return Err(e.into());
                }
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &Url,
        headers: &Headers,
        body: Vec<u8>,
        timeout: Option<Duration>,
        request_id: Uuid,
    ) -> Result<HttpResponse> {
        tracing::trace!(%request_id, bytes = body.len(), "post");
        self.send(Method::POST, url, headers, Some(body), timeout)
            .await
    }

    async fn get(
        &self,
        url: &Url,
        headers: &Headers,
        timeout: Option<Duration>,
    ) -> Result<HttpResponse> {
        self.send(Method::GET, url, headers, None, timeout).await
    }
}

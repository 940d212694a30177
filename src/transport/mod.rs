//! HTTP transport boundary.
//!
//! The core never talks to the network directly. Every request goes through a
//! [`Transport`], which owns retry and backoff for transient failures.

#[cfg(feature = "reqwest")]
mod http;

#[cfg(feature = "reqwest")]
pub use http::HttpTransport;

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::headers::Headers;

/// Longest body excerpt kept in [`Error::HttpStatus`].
const STATUS_BODY_LIMIT: usize = 1024;

/// Raw HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Create a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a 2xx response; [`Error::HttpStatus`] otherwise.
    pub fn into_body(self) -> Result<Vec<u8>> {
        if self.is_success() {
            return Ok(self.body);
        }
        let mut body = String::from_utf8_lossy(&self.body).into_owned();
        if body.len() > STATUS_BODY_LIMIT {
            let mut end = STATUS_BODY_LIMIT;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        Err(Error::HttpStatus {
            status: self.status,
            body,
        })
    }
}

/// Performs HTTP requests for a connection.
///
/// Implementations must be cheap to share; a connection and all of its row
/// cursors hold the same instance.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// POST `body` to `url`.
    async fn post(
        &self,
        url: &Url,
        headers: &Headers,
        body: Vec<u8>,
        timeout: Option<Duration>,
        request_id: Uuid,
    ) -> Result<HttpResponse>;

    /// GET `url`.
    async fn get(&self, url: &Url, headers: &Headers, timeout: Option<Duration>)
    -> Result<HttpResponse>;
}

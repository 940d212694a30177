//! Chunk downloads.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::error::{Result, codes};
use crate::protocol::headers::{Headers, SSE_C_AES, SSE_C_ALGORITHM, SSE_C_KEY};
use crate::state::action::ChunkRef;
use crate::transport::Transport;

/// A resolved chunk download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Presigned chunk location
    pub url: Url,
    /// Headers to send
    pub headers: Headers,
    /// Download timeout
    pub timeout: Option<Duration>,
}

impl ChunkRequest {
    /// Resolve a chunk reference.
    ///
    /// Headers supplied by the server are sent as is. Without them, the
    /// result key is sent as a customer-provided encryption key so that
    /// storage returns the chunk decrypted.
    pub fn from_ref(chunk: &ChunkRef, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(&chunk.meta.url)?;
        let headers = if !chunk.headers.is_empty() {
            let mut headers: Headers = chunk
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            headers.sort();
            headers
        } else if !chunk.qrmk.is_empty() {
            vec![
                (SSE_C_ALGORITHM.to_string(), SSE_C_AES.to_string()),
                (SSE_C_KEY.to_string(), chunk.qrmk.clone()),
            ]
        } else {
            Vec::new()
        };
        Ok(Self {
            url,
            headers,
            timeout,
        })
    }
}

/// Downloads chunk bodies.
#[async_trait]
pub trait ChunkFetcher: Send + Sync + Debug {
    /// Download one chunk and return its (decompressed, decrypted) body.
    async fn fetch(&self, request: &ChunkRequest) -> Result<Vec<u8>>;
}

/// Chunk fetcher that downloads through a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportChunkFetcher {
    transport: Arc<dyn Transport>,
}

impl TransportChunkFetcher {
    /// Create a fetcher on `transport`.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl ChunkFetcher for TransportChunkFetcher {
    async fn fetch(&self, request: &ChunkRequest) -> Result<Vec<u8>> {
        let response = self
            .transport
            .get(&request.url, &request.headers, request.timeout)
            .await?;
        response.into_body().inspect_err(|e| {
            tracing::warn!(code = codes::FAILED_TO_GET_CHUNK, error = %e, "failed to get chunk");
        })
    }
}

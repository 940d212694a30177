//! Session keepalive.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};
use url::Url;

use crate::error::{Result, codes};
use crate::protocol::headers::{HEARTBEAT_PATH, endpoint, query_headers};
use crate::protocol::response::ExecResponse;
use crate::state::session::Session;
use crate::transport::Transport;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Background task that posts a heartbeat every interval.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the heartbeat loop. The first heartbeat is sent after one interval.
    pub(crate) fn start(
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        base_url: Url,
        interval: Duration,
        timeout: Option<Duration>,
        parent: &Span,
    ) -> Self {
        let stop = CancellationToken::new();
        let token = stop.clone();
        let interval = interval.max(MIN_INTERVAL);
        let task = async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = beat(transport.as_ref(), &session, &base_url, timeout).await {
                            tracing::warn!(code = codes::FAILED_TO_HEARTBEAT, error = %e, "heartbeat failed");
                        }
                    }
                }
            }
            tracing::debug!("heartbeat stopped");
        };
        let handle = tokio::spawn(task.instrument(tracing::debug_span!(parent: parent, "heartbeat")));
        Self { stop, handle }
    }

    /// Stop the loop and wait for it to exit.
    pub(crate) async fn stop(mut self) {
        self.stop.cancel();
        if let Err(e) = (&mut self.handle).await {
            tracing::debug!(error = %e, "heartbeat task ended abnormally");
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Send one heartbeat.
pub(crate) async fn beat(
    transport: &dyn Transport,
    session: &Session,
    base_url: &Url,
    timeout: Option<Duration>,
) -> Result<()> {
    let (url, request_id) = endpoint(base_url, HEARTBEAT_PATH, &[])?;
    let headers = query_headers(session.service_name().as_deref(), session.token());
    let response = transport
        .post(&url, &headers, Vec::new(), timeout, request_id)
        .await?;
    ExecResponse::from_slice(&response.into_body()?)?.check()?;
    tracing::trace!(%request_id, "heartbeat ok");
    Ok(())
}

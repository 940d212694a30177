//! Per-call execution options.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Names of the per-call options, as other Snowflake drivers spell them.
pub mod keys {
    /// Expected number of statements in a multi-statement request
    pub const MULTI_STATEMENT_COUNT: &str = "MULTI_STATEMENT_COUNT";
    /// Return as soon as the query is accepted
    pub const ASYNC_MODE_QUERY: &str = "ASYNC_MODE_QUERY";
    /// Channel notified with the assigned query id
    pub const QUERY_ID_CHAN: &str = "QUERY_ID_CHANNEL";
    /// Fetch the result of an existing query instead of submitting
    pub const RESUME_QUERY_ID: &str = "RESUME_QUERY_ID";
    /// Query issued by the driver itself
    pub const INTERNAL_QUERY: &str = "INTERNAL_QUERY";
}

/// Options for a single `exec` / `query` call.
///
/// The default runs synchronously as an application query with no
/// multi-statement hint, no notification, no resume and no cancellation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Number of statements expected in the SQL text (0 = any number)
    pub multi_statement_count: Option<u32>,
    /// Return as soon as the query is accepted
    pub async_exec: bool,
    /// Mark the query as issued by the driver
    pub internal: bool,
    /// Receives the server-assigned query id once known
    pub query_id_sender: Option<mpsc::UnboundedSender<String>>,
    /// Fetch this query's result instead of submitting the SQL
    pub resume_query_id: Option<String>,
    /// Cancels the call (and the row cursor it returns)
    pub cancel: Option<CancellationToken>,
}

impl ExecOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `count` statements in one request (0 = any number).
    pub fn multi_statement(mut self, count: u32) -> Self {
        self.multi_statement_count = Some(count);
        self
    }

    /// Submit without waiting for the query to finish.
    pub fn async_exec(mut self) -> Self {
        self.async_exec = true;
        self
    }

    /// Mark the query as internal.
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Notify `sender` with the query id.
    pub fn query_id_sender(mut self, sender: mpsc::UnboundedSender<String>) -> Self {
        self.query_id_sender = Some(sender);
        self
    }

    /// Fetch the result of an already submitted query.
    pub fn resume(mut self, query_id: impl Into<String>) -> Self {
        self.resume_query_id = Some(query_id.into());
        self
    }

    /// Cancel the call when `token` is cancelled.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Push the query id to the notification channel, if any.
    pub(crate) fn notify_query_id(&self, query_id: &str) {
        let Some(sender) = &self.query_id_sender else {
            return;
        };
        if sender.send(query_id.to_string()).is_err() {
            tracing::debug!(query_id, "query id receiver dropped");
        }
    }

    /// Returns true if the caller has cancelled.
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Server default (READ COMMITTED)
    #[default]
    Default,
    /// Read uncommitted
    ReadUncommitted,
    /// Read committed
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

/// Options for [`Conn::begin_tx`](crate::tokio::Conn::begin_tx).
#[derive(Debug, Clone, Copy, Default)]
pub struct TxOptions {
    /// Isolation level; only the default is supported
    pub isolation: IsolationLevel,
    /// Read-only transaction; not supported
    pub read_only: bool,
}

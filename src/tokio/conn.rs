//! Asynchronous Snowflake connection.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};
use url::Url;

use crate::chunk::fetcher::{ChunkFetcher, TransportChunkFetcher};
use crate::conversion::{ToParams, encode_bindings};
use crate::error::{Error, Result, ServerError, codes};
use crate::exec_options::{ExecOptions, IsolationLevel, TxOptions};
use crate::opts::Opts;
use crate::protocol::headers::{
    CLIENT_START_TIME_KEY, Headers, QUERY_REQUEST_PATH, SESSION_PATH, endpoint, query_headers,
    query_result_path,
};
use crate::protocol::request::{Bindings, ExecRequest, MULTI_STATEMENT_COUNT};
use crate::protocol::response::{ExecResponse, ExecResponseData};
use crate::state::classify::{
    NO_LAST_INSERT_ID, StatementKind, affected_rows, child_results, classify,
};
use crate::state::cursor::ResultSetDescriptor;
use crate::state::session::{Session, SessionState};
use crate::transport::{HttpResponse, Transport};

use super::heartbeat::Heartbeat;
use super::rows::Rows;
use super::statement::Statement;
use super::transaction::Transaction;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Outcome of [`Conn::exec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows inserted, updated, deleted or merged (0 for other statements)
    pub affected_rows: i64,
    /// Always -1; the service does not report insert ids
    pub last_insert_id: i64,
    /// Query id of the submitted statement
    pub query_id: String,
}

#[derive(Debug, Clone)]
struct Handles {
    transport: Arc<dyn Transport>,
    fetcher: Arc<dyn ChunkFetcher>,
    session: Arc<Session>,
}

#[derive(Debug)]
struct Live {
    handles: Handles,
    heartbeat: Option<Heartbeat>,
}

/// Asynchronous Snowflake connection.
///
/// All methods take `&self`; a connection can be shared between tasks.
#[derive(Debug)]
pub struct Conn {
    id: u64,
    base_url: Url,
    request_timeout: Option<Duration>,
    prefetch_window: usize,
    span: Span,
    live: Mutex<Option<Live>>,
}

impl Conn {
    /// Open a connection with the default HTTP transport.
    ///
    /// The session token in `opts` must already be authenticated.
    #[cfg(feature = "reqwest")]
    pub async fn connect<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts = opts.try_into()?;
        let transport = crate::transport::HttpTransport::new(opts.max_retries)?;
        Self::with_transport(opts, Arc::new(transport)).await
    }

    /// Open a connection on a custom transport. Chunks are downloaded through it too.
    pub async fn with_transport(opts: Opts, transport: Arc<dyn Transport>) -> Result<Self> {
        let fetcher = Arc::new(TransportChunkFetcher::new(Arc::clone(&transport)));
        Self::with_parts(opts, transport, fetcher).await
    }

    /// Open a connection on a custom transport and chunk fetcher.
    pub async fn with_parts(
        opts: Opts,
        transport: Arc<dyn Transport>,
        fetcher: Arc<dyn ChunkFetcher>,
    ) -> Result<Self> {
        let base_url = opts.base_url()?;
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        let span = opts.span.clone().unwrap_or_else(|| {
            tracing::info_span!("snowflake.conn", connection_id = id, account = %opts.account)
        });
        let session = Arc::new(Session::new(&opts));

        let heartbeat = session.keepalive_enabled().then(|| {
            Heartbeat::start(
                Arc::clone(&transport),
                Arc::clone(&session),
                base_url.clone(),
                opts.keepalive_interval,
                opts.request_timeout,
                &span,
            )
        });
        tracing::debug!(parent: &span, %base_url, keepalive = heartbeat.is_some(), "connection opened");

        Ok(Self {
            id,
            base_url,
            request_timeout: opts.request_timeout,
            prefetch_window: opts.prefetch_window,
            span,
            live: Mutex::new(Some(Live {
                handles: Handles {
                    transport,
                    fetcher,
                    session,
                },
                heartbeat,
            })),
        })
    }

    /// Connection id, unique within the process.
    pub fn connection_id(&self) -> u64 {
        self.id
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().is_none()
    }

    /// Span every call of this connection is recorded under.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Execute a statement and return the affected row count.
    pub async fn exec<P: ToParams>(&self, sql: &str, params: P) -> Result<ExecResult> {
        self.exec_with(sql, params, &ExecOptions::default()).await
    }

    /// Execute a statement with per-call options.
    ///
    /// A multi-statement request sums the affected rows of its DML children.
    pub async fn exec_with<P: ToParams>(
        &self,
        sql: &str,
        params: P,
        opts: &ExecOptions,
    ) -> Result<ExecResult> {
        let bindings = encode_bindings(&params.to_params())?;
        async move {
            let handles = self.handles()?;
            let data = self.submit(&handles, sql, bindings, opts).await?;
            let query_id = data.query_id.clone();
            let mut affected = 0_i64;
            for leaf in self.expand(&handles, data, opts.cancel.as_ref()).await? {
                if classify(&leaf) == StatementKind::Dml {
                    affected = affected.saturating_add(affected_rows(&leaf)?);
                }
            }
            Ok(ExecResult {
                affected_rows: affected,
                last_insert_id: NO_LAST_INSERT_ID,
                query_id,
            })
        }
        .instrument(self.span.clone())
        .await
    }

    /// Execute a query and stream its rows.
    pub async fn query<P: ToParams>(&self, sql: &str, params: P) -> Result<Rows> {
        self.query_with(sql, params, &ExecOptions::default()).await
    }

    /// Execute a query with per-call options.
    ///
    /// The cancellation token in `opts`, if any, also governs the returned rows.
    /// A multi-statement request yields the rows of every child in order.
    pub async fn query_with<P: ToParams>(
        &self,
        sql: &str,
        params: P,
        opts: &ExecOptions,
    ) -> Result<Rows> {
        let bindings = encode_bindings(&params.to_params())?;
        async move {
            let handles = self.handles()?;
            let data = self.submit(&handles, sql, bindings, opts).await?;
            let span = tracing::debug_span!(parent: &self.span, "rows", query_id = %data.query_id);
            let results = self
                .expand(&handles, data, opts.cancel.as_ref())
                .await?
                .iter()
                .map(ResultSetDescriptor::from_response)
                .collect::<Result<Vec<_>>>()?;
            Ok(Rows::new(
                results,
                handles.fetcher,
                opts.cancel.clone(),
                self.request_timeout,
                self.prefetch_window,
                span,
            ))
        }
        .instrument(self.span.clone())
        .await
    }

    /// Run `SELECT 1`.
    pub async fn ping(&self) -> Result<()> {
        self.exec("SELECT 1", ()).await?;
        Ok(())
    }

    /// Prepare a statement.
    ///
    /// Nothing is sent to the server; the SQL is submitted on every execution.
    pub fn prepare(&self, sql: impl Into<String>) -> Result<Statement<'_>> {
        self.handles()?;
        Ok(Statement::new(self, sql.into()))
    }

    /// Begin a transaction with default options.
    pub async fn begin(&self) -> Result<Transaction> {
        self.begin_tx(TxOptions::default()).await
    }

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Read-only transactions and non-default isolation levels are rejected
    /// with [`Error::Unsupported`] before anything is sent.
    pub async fn begin_tx(&self, opts: TxOptions) -> Result<Transaction> {
        if opts.read_only {
            return Err(Error::Unsupported(ServerError::feature_not_supported(
                codes::NO_READ_ONLY_TRANSACTION,
                "no readonly mode is supported",
            )));
        }
        if opts.isolation != IsolationLevel::Default {
            return Err(Error::Unsupported(ServerError::feature_not_supported(
                codes::NO_DEFAULT_TRANSACTION_ISOLATION_LEVEL,
                "no default isolation transaction level is supported",
            )));
        }
        self.exec("BEGIN", ()).await?;
        Ok(Transaction::new(self.id))
    }

    /// Close the session.
    ///
    /// Stops the heartbeat and asks the server to delete the session. A failed
    /// delete is logged; the connection is closed either way. Closing twice is
    /// a no-op.
    pub async fn close(&self) {
        let Some(live) = self.lock().take() else {
            return;
        };
        async move {
            if let Some(heartbeat) = live.heartbeat {
                heartbeat.stop().await;
            }
            if let Err(e) = self.delete_session(&live.handles).await {
                tracing::warn!(code = codes::FAILED_TO_CLOSE_SESSION, error = %e, "failed to close session");
            }
            tracing::debug!("connection closed");
        }
        .instrument(self.span.clone())
        .await;
    }

    /// Current database.
    pub fn database(&self) -> Option<String> {
        self.state_field(|s| s.database.clone())
    }

    /// Current schema.
    pub fn schema(&self) -> Option<String> {
        self.state_field(|s| s.schema.clone())
    }

    /// Current role.
    pub fn role(&self) -> Option<String> {
        self.state_field(|s| s.role.clone())
    }

    /// Current warehouse.
    pub fn warehouse(&self) -> Option<String> {
        self.state_field(|s| s.warehouse.clone())
    }

    /// Query id of the last successful statement.
    pub fn last_query_id(&self) -> Option<String> {
        self.state_field(|s| s.last_query_id.clone())
    }

    /// SQLSTATE of the last successful statement.
    pub fn last_sql_state(&self) -> Option<String> {
        self.state_field(|s| s.last_sql_state.clone())
    }

    /// Session parameter by name (case-insensitive).
    pub fn session_param(&self, name: &str) -> Option<String> {
        self.handles().ok()?.session.param(name)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Live>> {
        self.live
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn handles(&self) -> Result<Handles> {
        self.lock()
            .as_ref()
            .map(|live| live.handles.clone())
            .ok_or(Error::ConnectionClosed)
    }

    fn state_field(&self, f: impl FnOnce(&SessionState) -> String) -> Option<String> {
        let handles = self.handles().ok()?;
        Some(f(&handles.session.snapshot())).filter(|v| !v.is_empty())
    }

    fn headers(&self, handles: &Handles) -> Headers {
        query_headers(
            handles.session.service_name().as_deref(),
            handles.session.token(),
        )
    }

    async fn submit(
        &self,
        handles: &Handles,
        sql: &str,
        bindings: Bindings,
        opts: &ExecOptions,
    ) -> Result<ExecResponseData> {
        if opts.is_cancelled() {
            return Err(Error::Canceled);
        }
        let data = match &opts.resume_query_id {
            Some(query_id) => {
                tracing::debug!(query_id = %query_id, "resuming query");
                self.fetch_result(handles, query_id, opts.cancel.as_ref())
                    .await?
            }
            None => {
                let sequence_id = handles.session.next_sequence();
                let parameters = opts.multi_statement_count.map(|count| {
                    let mut map = serde_json::Map::new();
                    map.insert(MULTI_STATEMENT_COUNT.to_string(), count.into());
                    map
                });
                let request = ExecRequest {
                    sql_text: sql.to_string(),
                    async_exec: opts.async_exec,
                    sequence_id,
                    is_internal: opts.internal,
                    parameters,
                    bindings,
                };
                let body = serde_json::to_vec(&request)?;
                let (url, request_id) = endpoint(&self.base_url, QUERY_REQUEST_PATH, &[])?;
                tracing::debug!(sequence_id, %request_id, binds = request.bindings.len(), "submitting query");
                let response = with_cancel(
                    opts.cancel.as_ref(),
                    handles.transport.post(
                        &url,
                        &self.headers(handles),
                        body,
                        self.request_timeout,
                        request_id,
                    ),
                )
                .await?;
                decode_response(response).inspect_err(|e| {
                    tracing::warn!(code = codes::FAILED_TO_POST_QUERY, error = %e, "query failed");
                })?
            }
        };
        handles.session.apply_response(&data);
        opts.notify_query_id(&data.query_id);
        Ok(data)
    }

    async fn fetch_result(
        &self,
        handles: &Handles,
        query_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<ExecResponseData> {
        let start = chrono::Utc::now().timestamp().to_string();
        let (url, request_id) = endpoint(
            &self.base_url,
            &query_result_path(query_id),
            &[(CLIENT_START_TIME_KEY, &start)],
        )?;
        tracing::debug!(query_id, %request_id, "fetching result");
        let response = with_cancel(
            cancel,
            handles
                .transport
                .get(&url, &self.headers(handles), self.request_timeout),
        )
        .await?;
        decode_response(response)
    }

    /// Flatten a response into its result-bearing statements.
    ///
    /// A multi-statement parent is replaced by its children, depth first and
    /// in server order. The first failing child aborts the expansion.
    async fn expand(
        &self,
        handles: &Handles,
        data: ExecResponseData,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<ExecResponseData>> {
        let mut leaves = Vec::new();
        let mut stack = vec![data];
        while let Some(data) = stack.pop() {
            if classify(&data) != StatementKind::Multi {
                leaves.push(data);
                continue;
            }
            let children = child_results(&data)?;
            tracing::debug!(query_id = %data.query_id, children = children.len(), "multi-statement");
            let mut fetched = Vec::with_capacity(children.len());
            for child in children {
                let mut child_data = self.fetch_result(handles, &child.query_id, cancel).await?;
                if child_data.statement_type_id == 0 {
                    child_data.statement_type_id = child.statement_type_id;
                }
                fetched.push(child_data);
            }
            stack.extend(fetched.into_iter().rev());
        }
        Ok(leaves)
    }

    async fn delete_session(&self, handles: &Handles) -> Result<()> {
        let (url, request_id) = endpoint(&self.base_url, &format!("{}?delete=true", SESSION_PATH), &[])?;
        let response = handles
            .transport
            .post(&url, &self.headers(handles), Vec::new(), self.request_timeout, request_id)
            .await?;
        ExecResponse::from_slice(&response.into_body()?)?.check()?;
        Ok(())
    }
}

fn decode_response(response: HttpResponse) -> Result<ExecResponseData> {
    let body = response.into_body()?;
    let response = ExecResponse::from_slice(&body).inspect_err(|e| {
        tracing::debug!(code = codes::FAILED_TO_PARSE_RESPONSE, error = %e, "unreadable response");
    })?;
    Ok(response.check()?.data)
}

async fn with_cancel<T>(
    cancel: Option<&CancellationToken>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => Err(Error::Canceled),
            result = fut => result,
        },
        None => fut.await,
    }
}

//! Streaming row reader with chunk prefetch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::chunk::decode::{RawRows, decode_chunk};
use crate::chunk::fetcher::{ChunkFetcher, ChunkRequest};
use crate::conversion::FromRow;
use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::row::Row;
use crate::state::action::{Action, ChunkRef};
use crate::state::cursor::{CursorState, ResultSetDescriptor, RowCursor};

type Position = (usize, usize);

/// Rows of a query, read one at a time.
///
/// Remote chunks are downloaded ahead of the reader, at most `prefetch_window`
/// at a time, and handed to the cursor in order. Chained result sets of a
/// multi-statement query follow each other transparently.
///
/// Dropping `Rows` aborts every download still in flight.
#[derive(Debug)]
pub struct Rows {
    cursor: RowCursor,
    fetcher: Arc<dyn ChunkFetcher>,
    cancel: Option<CancellationToken>,
    timeout: Option<Duration>,
    window: usize,
    plan: VecDeque<ChunkRef>,
    inflight: VecDeque<(Position, JoinHandle<Result<RawRows>>)>,
    span: Span,
}

impl Rows {
    pub(crate) fn new(
        results: Vec<ResultSetDescriptor>,
        fetcher: Arc<dyn ChunkFetcher>,
        cancel: Option<CancellationToken>,
        timeout: Option<Duration>,
        window: usize,
        span: Span,
    ) -> Self {
        let cursor = RowCursor::new(results);
        let plan = cursor.upcoming_chunks().into();
        let mut rows = Self {
            cursor,
            fetcher,
            cancel,
            timeout,
            window: window.max(1),
            plan,
            inflight: VecDeque::new(),
            span,
        };
        rows.fill_window();
        rows
    }

    /// Read the next row.
    ///
    /// Returns `Ok(None)` once every result set is consumed, and keeps doing
    /// so. After a failure every call returns the same error.
    pub async fn next(&mut self) -> Result<Option<Row>> {
        loop {
            if !self.is_done() && self.is_cancelled() {
                self.abort_all();
                return Err(self.cursor.fail(Error::Canceled));
            }
            match self.cursor.step()? {
                Action::Row(row) => return Ok(Some(row)),
                Action::FetchChunk(chunk) => match self.await_chunk(&chunk).await {
                    Ok(rows) => self.cursor.chunk_arrived(rows)?,
                    Err(e) => {
                        self.abort_all();
                        tracing::debug!(
                            parent: &self.span,
                            result_index = chunk.result_index,
                            chunk_index = chunk.chunk_index,
                            error = %e,
                            "chunk failed"
                        );
                        return Err(self.cursor.fail(e));
                    }
                },
                Action::Finished => {
                    self.abort_all();
                    return Ok(None);
                }
            }
        }
    }

    /// Read every remaining row and convert it.
    pub async fn collect<T: FromRow>(&mut self) -> Result<Vec<T>> {
        let mut out = Vec::new();
        while let Some(row) = self.next().await? {
            out.push(T::from_row(self.cursor.columns(), &row)?);
        }
        Ok(out)
    }

    /// Columns of the result set being read.
    pub fn columns(&self) -> &[ColumnType] {
        self.cursor.columns()
    }

    /// Query id of the result set being read.
    pub fn query_id(&self) -> &str {
        self.cursor.query_id()
    }

    /// Cursor state.
    pub fn state(&self) -> CursorState {
        self.cursor.state()
    }

    /// Stop reading. Pending downloads are aborted and buffered rows dropped.
    ///
    /// Calling `close` more than once is harmless.
    pub fn close(&mut self) {
        self.abort_all();
        self.cursor.close();
    }

    fn is_done(&self) -> bool {
        matches!(
            self.cursor.state(),
            CursorState::Exhausted | CursorState::Failed
        )
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    fn spawn(&self, chunk: ChunkRef) -> (Position, JoinHandle<Result<RawRows>>) {
        let position = chunk.position();
        let task = fetch_chunk(Arc::clone(&self.fetcher), chunk, self.timeout);
        (position, tokio::spawn(task.instrument(self.span.clone())))
    }

    fn fill_window(&mut self) {
        while self.inflight.len() < self.window {
            let Some(chunk) = self.plan.pop_front() else {
                break;
            };
            let task = self.spawn(chunk);
            self.inflight.push_back(task);
        }
    }

    async fn await_chunk(&mut self, chunk: &ChunkRef) -> Result<RawRows> {
        let position = chunk.position();

        // Chunks past a result set's declared total are never read.
        while self.inflight.front().is_some_and(|(p, _)| *p < position) {
            if let Some((_, handle)) = self.inflight.pop_front() {
                handle.abort();
            }
        }
        while self.plan.front().is_some_and(|c| c.position() < position) {
            self.plan.pop_front();
        }
        self.fill_window();
        if self.inflight.front().is_none_or(|(p, _)| *p != position) {
            let task = self.spawn(chunk.clone());
            self.inflight.push_front(task);
        }

        let Some((_, mut handle)) = self.inflight.pop_front() else {
            return Err(Error::InvalidUsage("no download for requested chunk".into()));
        };
        self.fill_window();

        let joined = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.cancelled() => None,
                joined = &mut handle => Some(joined),
            },
            None => Some((&mut handle).await),
        };
        let Some(joined) = joined else {
            handle.abort();
            return Err(Error::Canceled);
        };
        joined.map_err(Error::transport)?
    }

    fn abort_all(&mut self) {
        for (_, handle) in self.inflight.drain(..) {
            handle.abort();
        }
        self.plan.clear();
    }
}

impl Drop for Rows {
    fn drop(&mut self) {
        self.abort_all();
    }
}

async fn fetch_chunk(
    fetcher: Arc<dyn ChunkFetcher>,
    chunk: ChunkRef,
    timeout: Option<Duration>,
) -> Result<RawRows> {
    let request = ChunkRequest::from_ref(&chunk, timeout)?;
    let body = match timeout {
        Some(limit) => tokio::time::timeout(limit, fetcher.fetch(&request))
            .await
            .map_err(|_| Error::Timeout)??,
        None => fetcher.fetch(&request).await?,
    };
    tracing::trace!(
        result_index = chunk.result_index,
        chunk_index = chunk.chunk_index,
        bytes = body.len(),
        "chunk downloaded"
    );
    decode_chunk(&body, chunk.format, &chunk.columns)
}

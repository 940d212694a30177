//! Row cursor state machine.
//!
//! Walks an ordered list of result sets (one for a single statement, one per
//! child for a multi-statement chain). Each result set starts with its inline
//! rows and continues with its remote chunks. The cursor never performs I/O:
//! it asks for chunks through [`Action::FetchChunk`] and is fed the decoded
//! rows back.

use std::collections::{HashMap, VecDeque};

use crate::chunk::decode::decode_inline;
use crate::error::{Error, Result};
use crate::protocol::response::{ChunkMeta, ColumnType, ExecResponseData};
use crate::protocol::types::ResultFormat;
use crate::row::Row;

use super::action::{Action, ChunkRef};

/// Cursor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Nothing read yet
    Created,
    /// Inline rows loaded
    Started,
    /// Waiting for a chunk
    Fetching,
    /// Rows available
    Buffered,
    /// All result sets consumed; reads return no row
    Exhausted,
    /// A read failed; reads return the same error
    Failed,
}

/// One result set to stream.
#[derive(Debug, Clone, Default)]
pub struct ResultSetDescriptor {
    /// Query id the rows belong to
    pub query_id: String,
    /// Column schema
    pub columns: Vec<ColumnType>,
    /// Row encoding of the chunks
    pub format: ResultFormat,
    /// Declared row total (0 or less means not reported)
    pub total: i64,
    /// Rows that arrived with the response
    pub inline_rows: Vec<Vec<Option<String>>>,
    /// Remote chunks, in order
    pub chunks: Vec<ChunkMeta>,
    /// Headers to send with chunk downloads
    pub chunk_headers: HashMap<String, String>,
    /// Chunk decryption key
    pub qrmk: String,
}

impl ResultSetDescriptor {
    /// Build a descriptor from a response, decoding any inline rows.
    pub fn from_response(data: &ExecResponseData) -> Result<Self> {
        Ok(Self {
            query_id: data.query_id.clone(),
            columns: data.row_type.clone(),
            format: data.result_format(),
            total: data.total,
            inline_rows: decode_inline(data)?,
            chunks: data.chunks.clone(),
            chunk_headers: data.chunk_headers.clone(),
            qrmk: data.qrmk.clone(),
        })
    }

    fn limit(&self) -> Option<u64> {
        u64::try_from(self.total).ok().filter(|t| *t > 0)
    }

    fn chunk_ref(&self, result_index: usize, chunk_index: usize) -> Option<ChunkRef> {
        self.chunks.get(chunk_index).map(|meta| ChunkRef {
            result_index,
            chunk_index,
            meta: meta.clone(),
            headers: self.chunk_headers.clone(),
            qrmk: self.qrmk.clone(),
            format: self.format,
            columns: self.columns.clone(),
        })
    }
}

/// Sans-I/O row cursor.
#[derive(Debug)]
pub struct RowCursor {
    results: Vec<ResultSetDescriptor>,
    result_index: usize,
    next_chunk: usize,
    buffer: VecDeque<Vec<Option<String>>>,
    rows_read: u64,
    state: CursorState,
    error: Option<Error>,
}

impl RowCursor {
    /// Create a cursor over result sets, visited in order.
    pub fn new(results: Vec<ResultSetDescriptor>) -> Self {
        Self {
            results,
            result_index: 0,
            next_chunk: 0,
            buffer: VecDeque::new(),
            rows_read: 0,
            state: CursorState::Created,
            error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Columns of the result set being read.
    pub fn columns(&self) -> &[ColumnType] {
        self.results
            .get(self.result_index)
            .map(|r| r.columns.as_slice())
            .unwrap_or_default()
    }

    /// Query id of the result set being read.
    pub fn query_id(&self) -> &str {
        self.results
            .get(self.result_index)
            .map(|r| r.query_id.as_str())
            .unwrap_or_default()
    }

    /// Every chunk in fetch order, starting at the cursor's position.
    ///
    /// Drivers use this to download ahead of the cursor.
    pub fn upcoming_chunks(&self) -> Vec<ChunkRef> {
        let mut refs = Vec::new();
        for (result_index, result) in self.results.iter().enumerate().skip(self.result_index) {
            let first = if result_index == self.result_index {
                self.next_chunk
            } else {
                0
            };
            refs.extend((first..result.chunks.len()).filter_map(|i| result.chunk_ref(result_index, i)));
        }
        refs
    }

    /// Advance the cursor.
    pub fn step(&mut self) -> Result<Action> {
        match self.state {
            CursorState::Failed => return Err(self.stored_error()),
            CursorState::Exhausted => return Ok(Action::Finished),
            CursorState::Fetching => {
                return Err(Error::InvalidUsage(
                    "cursor stepped while a chunk is pending".into(),
                ));
            }
            CursorState::Created => self.load_inline(),
            CursorState::Started | CursorState::Buffered => {}
        }

        loop {
            let Some(result) = self.results.get(self.result_index) else {
                return Ok(self.finish());
            };
            let capped = result.limit().is_some_and(|limit| self.rows_read >= limit);

            if !capped {
                if let Some(values) = self.buffer.pop_front() {
                    self.rows_read += 1;
                    self.state = CursorState::Buffered;
                    return Ok(Action::Row(Row::new(values)));
                }
                if let Some(chunk) = result.chunk_ref(self.result_index, self.next_chunk) {
                    self.state = CursorState::Fetching;
                    return Ok(Action::FetchChunk(chunk));
                }
            }

            if self.result_index + 1 >= self.results.len() {
                return Ok(self.finish());
            }
            self.result_index += 1;
            self.next_chunk = 0;
            self.rows_read = 0;
            self.buffer.clear();
            self.load_inline();
            tracing::debug!(
                result_index = self.result_index,
                query_id = self.query_id(),
                "next result set"
            );
        }
    }

    /// Feed the decoded rows of the chunk requested by the last `FetchChunk`.
    pub fn chunk_arrived(&mut self, rows: Vec<Vec<Option<String>>>) -> Result<()> {
        if self.state != CursorState::Fetching {
            return Err(Error::InvalidUsage(format!(
                "chunk delivered in state {:?}",
                self.state
            )));
        }
        tracing::trace!(
            result_index = self.result_index,
            chunk_index = self.next_chunk,
            rows = rows.len(),
            "chunk arrived"
        );
        self.buffer.extend(rows);
        self.next_chunk += 1;
        self.state = CursorState::Buffered;
        Ok(())
    }

    /// Move to `Failed`, keeping `err` for every later read. Returns the error.
    ///
    /// A cursor that already failed keeps its first error.
    pub fn fail(&mut self, err: Error) -> Error {
        if self.state != CursorState::Failed {
            self.error = Some(err);
            self.state = CursorState::Failed;
            self.buffer.clear();
        }
        self.stored_error()
    }

    /// Drop buffered rows and stop. Later reads return no row.
    pub fn close(&mut self) {
        self.buffer.clear();
        if self.state != CursorState::Failed {
            self.state = CursorState::Exhausted;
        }
    }

    fn stored_error(&self) -> Error {
        self.error
            .clone()
            .unwrap_or_else(|| Error::InvalidUsage("cursor failed without an error".into()))
    }

    fn load_inline(&mut self) {
        if let Some(result) = self.results.get_mut(self.result_index) {
            self.buffer.extend(std::mem::take(&mut result.inline_rows));
        }
        self.state = CursorState::Started;
    }

    fn finish(&mut self) -> Action {
        self.buffer.clear();
        self.state = CursorState::Exhausted;
        Action::Finished
    }
}

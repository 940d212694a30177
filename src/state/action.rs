//! Action types for state machine I/O requests.

use std::collections::HashMap;

use crate::protocol::response::{ChunkMeta, ColumnType};
use crate::protocol::types::ResultFormat;
use crate::row::Row;

/// Action requested by a state machine.
///
/// The caller should perform the requested I/O (if any), feed the outcome
/// back, and call `step()` again.
#[derive(Debug)]
pub enum Action {
    /// A row is ready for the caller.
    Row(Row),

    /// Download and decode the referenced chunk, then call
    /// [`RowCursor::chunk_arrived`](super::cursor::RowCursor::chunk_arrived).
    FetchChunk(ChunkRef),

    /// The state machine has finished successfully.
    Finished,
}

/// A remote chunk and everything needed to fetch and decode it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    /// Index of the result set the chunk belongs to
    pub result_index: usize,
    /// Index of the chunk within its result set
    pub chunk_index: usize,
    /// Location and sizes
    pub meta: ChunkMeta,
    /// Headers the server asked for
    pub headers: HashMap<String, String>,
    /// Decryption key
    pub qrmk: String,
    /// Row encoding
    pub format: ResultFormat,
    /// Columns of the result set, used to render Arrow cells
    pub columns: Vec<ColumnType>,
}

impl ChunkRef {
    /// Position of the chunk in the cursor's fetch order.
    pub fn position(&self) -> (usize, usize) {
        (self.result_index, self.chunk_index)
    }
}

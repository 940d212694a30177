//! Sans-I/O state for the Snowflake client.
//!
//! These types hold protocol logic without performing any I/O. The row
//! cursor produces [`Action`] values that tell the caller what to do next.

pub mod action;
pub mod classify;
pub mod cursor;
pub mod session;

pub use action::{Action, ChunkRef};
pub use classify::{ChildResult, StatementKind, affected_rows, child_results, classify};
pub use cursor::{CursorState, ResultSetDescriptor, RowCursor};
pub use session::{Session, SessionState};

//! Asynchronous Snowflake client using Tokio.

mod conn;
mod heartbeat;
mod rows;
mod statement;
mod transaction;

pub use conn::{Conn, ExecResult};
pub use rows::Rows;
pub use statement::Statement;
pub use transaction::Transaction;

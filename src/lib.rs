//! An asynchronous Snowflake client over the SQL REST protocol.
//!
//! # Features
//!
//! - **Sans-I/O state**: Classification, session bookkeeping and the row cursor hold no I/O
//! - **Streaming results**: Remote chunks are downloaded ahead of the reader and read in order
//! - **Multi-statement**: Child results are chained transparently
//! - **Pluggable I/O**: HTTP goes through [`Transport`], chunk downloads through [`ChunkFetcher`]
//!
//! # Example
//!
//! ```no_run
//! use zero_snowflake::tokio::Conn;
//! use zero_snowflake::Opts;
//!
//! #[tokio::main]
//! async fn main() -> zero_snowflake::error::Result<()> {
//!     let opts = Opts {
//!         account: "myaccount".into(),
//!         user: "me".into(),
//!         token: Some("session-token".into()),
//!         warehouse: Some("COMPUTE_WH".into()),
//!         ..Default::default()
//!     };
//!
//!     let conn = Conn::connect(opts).await?;
//!
//!     let result = conn.exec("INSERT INTO t VALUES (?, ?)", (1, "one")).await?;
//!     println!("Inserted: {}", result.affected_rows);
//!
//!     let mut rows = conn.query("SELECT id, name FROM t", ()).await?;
//!     let all: Vec<(i64, String)> = rows.collect().await?;
//!     println!("Rows: {:?}", all);
//!
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod conversion;
pub mod error;
pub mod exec_options;
pub mod opts;
pub mod protocol;
pub mod row;
pub mod state;
pub mod tokio;
pub mod transport;

pub use chunk::{ChunkFetcher, ChunkRequest, TransportChunkFetcher};
pub use conversion::{FromRow, FromValue, Param, ToParam, ToParams};
pub use error::{Error, Result, ServerError};
pub use exec_options::{ExecOptions, IsolationLevel, TxOptions};
pub use opts::Opts;
pub use row::Row;
pub use state::cursor::CursorState;
pub use self::tokio::{Conn, ExecResult, Rows, Statement, Transaction};
pub use transport::{HttpResponse, Transport};

#[cfg(feature = "reqwest")]
pub use transport::HttpTransport;

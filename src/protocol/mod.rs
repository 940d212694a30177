//! Snowflake REST wire protocol.
//!
//! # Structure
//!
//! - `request`: query submission body and bind entries (encoding)
//! - `response`: response envelope, column schema, chunk descriptors (decoding)
//! - `headers`: fixed headers, endpoint paths, URL construction
//! - `types`: statement type ids, bind type tags, result formats

pub mod headers;
pub mod request;
pub mod response;
pub mod types;

pub use request::{BindData, BindValue, Bindings, ExecRequest};
pub use response::{ChunkMeta, ColumnType, ExecResponse, ExecResponseData, NameValueParameter};
pub use types::{BindType, ResultFormat, TimestampMode};

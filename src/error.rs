//! Error types for zero-snowflake.

use std::sync::Arc;

use thiserror::Error;

use crate::protocol::response::ExecResponse;

/// Result type for zero-snowflake operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Driver-side error numbers, in the same ranges the service's own drivers use.
pub mod codes {
    /// Submitting a query failed at the HTTP level.
    pub const FAILED_TO_POST_QUERY: i64 = 261000;
    /// The remote session-close call failed.
    pub const FAILED_TO_CLOSE_SESSION: i64 = 261003;
    /// The response body could not be decoded.
    pub const FAILED_TO_PARSE_RESPONSE: i64 = 261008;
    /// A heartbeat request failed.
    pub const FAILED_TO_HEARTBEAT: i64 = 261010;
    /// A result chunk could not be downloaded.
    pub const FAILED_TO_GET_CHUNK: i64 = 262000;
    /// Read-only transactions were requested.
    pub const NO_READ_ONLY_TRANSACTION: i64 = 263000;
    /// A non-default isolation level was requested.
    pub const NO_DEFAULT_TRANSACTION_ISOLATION_LEVEL: i64 = 263001;
}

/// SQLSTATE reported for features the service does not support.
pub const SQLSTATE_FEATURE_NOT_SUPPORTED: &str = "0A000";

/// Structured error reported by the service (or synthesized with the same shape).
///
/// Carries everything needed to correlate a failure with server-side diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerError {
    /// Numeric error code (-1 when the server sent none)
    pub code: i64,
    /// SQLSTATE (5 characters, may be empty)
    pub sql_state: String,
    /// Human-readable message
    pub message: String,
    /// Query id the error belongs to (may be empty)
    pub query_id: String,
}

impl ServerError {
    pub(crate) fn feature_not_supported(code: i64, message: &str) -> Self {
        Self {
            code,
            sql_state: SQLSTATE_FEATURE_NOT_SUPPORTED.to_string(),
            message: message.to_string(),
            query_id: String::new(),
        }
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:06}", self.code)?;
        if !self.sql_state.is_empty() {
            write!(f, " ({})", self.sql_state)?;
        }
        write!(f, ": {}", self.message)?;
        if !self.query_id.is_empty() {
            write!(f, "\nQUERY ID: {}", self.query_id)?;
        }
        Ok(())
    }
}

/// Error type for zero-snowflake.
///
/// `Clone` so that a failed row cursor can hand the same error to every
/// subsequent read.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Network-level failure reported by the transport, passed through unchanged
    #[error("Transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// Non-success HTTP status after the transport gave up
    #[error("HTTP status {status}: {body}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// A request or chunk fetch exceeded its timeout
    #[error("Operation timed out")]
    Timeout,

    /// The caller cancelled the operation
    #[error("Operation cancelled")]
    Canceled,

    /// The service answered with `success: false`
    #[error("Snowflake error: {0}")]
    Server(ServerError),

    /// Malformed response body or unparsable status code.
    ///
    /// `partial` holds whatever was decoded, for diagnostics.
    #[error("Decode error: {message}")]
    Decode {
        /// What went wrong
        message: String,
        /// Partially decoded response, when one was available
        partial: Option<Box<ExecResponse>>,
    },

    /// Feature rejected before any network call (read-only transactions, isolation levels)
    #[error("Unsupported: {0}")]
    Unsupported(ServerError),

    /// A bound value has no wire representation
    #[error("Type inference error: {0}")]
    TypeInference(String),

    /// The connection was closed
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Invalid usage (bad configuration, misuse of the API)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),
}

impl Error {
    /// Build a decode error without partial data.
    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
            partial: None,
        }
    }

    /// Wrap any error as a transport failure.
    pub fn transport<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        Error::Transport(Arc::new(err))
    }

    /// Get the structured error if this is a server or unsupported-feature error.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Error::Server(e) | Error::Unsupported(e) => Some(e),
            _ => None,
        }
    }

    /// Get the error code if available.
    pub fn code(&self) -> Option<i64> {
        self.server_error().map(|e| e.code)
    }

    /// Get the SQLSTATE code if available.
    pub fn sql_state(&self) -> Option<&str> {
        self.server_error()
            .map(|e| e.sql_state.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Get the query id the error belongs to, if known.
    pub fn query_id(&self) -> Option<&str> {
        match self {
            Error::Decode {
                partial: Some(resp),
                ..
            } => Some(resp.data.query_id.as_str()),
            _ => self.server_error().map(|e| e.query_id.as_str()),
        }
        .filter(|s| !s.is_empty())
    }

    /// Partially decoded response attached to a decode error.
    pub fn partial_response(&self) -> Option<&ExecResponse> {
        match self {
            Error::Decode { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }

    /// Returns true if the error was caused by cancellation or timeout.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled | Error::Timeout)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::decode(err.to_string())
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUsage(format!("Invalid URL: {}", err))
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else {
            Error::transport(err)
        }
    }
}

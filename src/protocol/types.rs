//! Common Snowflake REST protocol types.

use serde::{Deserialize, Serialize};

/// Statement type identifiers reported in `statementTypeId`.
pub mod statement_type {
    /// Multiple statement execution.
    ///
    /// The server also reports this id for single DML statements, so it only
    /// means "multi" when the first column is [`MULTI_STATEMENT_COLUMN`](super::MULTI_STATEMENT_COLUMN).
    pub const MULTI: i64 = 0x1000;

    /// Base of the DML band
    pub const DML: i64 = 0x3000;
    /// INSERT
    pub const INSERT: i64 = DML + 0x100;
    /// UPDATE
    pub const UPDATE: i64 = DML + 0x200;
    /// DELETE
    pub const DELETE: i64 = DML + 0x300;
    /// MERGE
    pub const MERGE: i64 = DML + 0x400;
    /// Multi-table INSERT (upper bound of the DML band)
    pub const MULTI_TABLE_INSERT: i64 = DML + 0x500;

    /// Base of the DDL band
    pub const DDL: i64 = 0x6000;
    /// CREATE
    pub const CREATE: i64 = DDL + 0x101;
    /// COMMENT
    pub const COMMENT: i64 = DDL + 0x200;
    /// DROP
    pub const DROP: i64 = DDL + 0x300;
    /// ALTER
    pub const ALTER: i64 = DDL + 0x401;
}

/// Column type names reported in `rowtype[].type`.
pub mod column_type {
    pub const FIXED: &str = "fixed";
    pub const REAL: &str = "real";
    pub const TEXT: &str = "text";
    pub const BOOLEAN: &str = "boolean";
    pub const BINARY: &str = "binary";
    pub const DATE: &str = "date";
    pub const TIME: &str = "time";
    pub const TIMESTAMP_NTZ: &str = "timestamp_ntz";
    pub const TIMESTAMP_LTZ: &str = "timestamp_ltz";
    pub const TIMESTAMP_TZ: &str = "timestamp_tz";
}

/// Name of the first column the server returns for a multi-statement parent.
pub const MULTI_STATEMENT_COLUMN: &str = "multiple statement execution";

/// Wire type tag of a bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BindType {
    /// Fixed-point number
    Fixed,
    /// Floating point number
    Real,
    /// Boolean
    Boolean,
    /// Text
    Text,
    /// Binary, hex encoded
    Binary,
    /// Date, epoch milliseconds
    Date,
    /// Time of day, nanoseconds since midnight
    Time,
    /// Timestamp without time zone
    TimestampNtz,
    /// Timestamp in the session time zone
    TimestampLtz,
    /// Timestamp with explicit offset
    TimestampTz,
}

impl BindType {
    /// Wire name of this type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            BindType::Fixed => "FIXED",
            BindType::Real => "REAL",
            BindType::Boolean => "BOOLEAN",
            BindType::Text => "TEXT",
            BindType::Binary => "BINARY",
            BindType::Date => "DATE",
            BindType::Time => "TIME",
            BindType::TimestampNtz => "TIMESTAMP_NTZ",
            BindType::TimestampLtz => "TIMESTAMP_LTZ",
            BindType::TimestampTz => "TIMESTAMP_TZ",
        }
    }
}

impl std::fmt::Display for BindType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How date/time values are represented on the wire for the rest of a request.
///
/// Switched by [`Param::Mode`](crate::Param::Mode) markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampMode {
    /// `TIMESTAMP_NTZ` (initial mode)
    #[default]
    Ntz,
    /// `TIMESTAMP_LTZ`
    Ltz,
    /// `TIMESTAMP_TZ`
    Tz,
    /// `DATE`
    Date,
    /// `TIME`
    Time,
    /// `BINARY`; date/time values cannot be bound in this mode
    Binary,
}

impl TimestampMode {
    /// Type tag used for date/time values under this mode.
    pub fn bind_type(self) -> BindType {
        match self {
            TimestampMode::Ntz => BindType::TimestampNtz,
            TimestampMode::Ltz => BindType::TimestampLtz,
            TimestampMode::Tz => BindType::TimestampTz,
            TimestampMode::Date => BindType::Date,
            TimestampMode::Time => BindType::Time,
            TimestampMode::Binary => BindType::Binary,
        }
    }
}

/// Encoding of row data in a response or chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultFormat {
    /// Literal JSON arrays of nullable strings
    #[default]
    Json,
    /// Arrow IPC stream (base64 when inline)
    Arrow,
}

impl ResultFormat {
    /// Parse the `queryResultFormat` tag. Empty or unknown tags mean JSON.
    pub fn from_tag(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("arrow") {
            ResultFormat::Arrow
        } else {
            ResultFormat::Json
        }
    }
}

//! Query response body.
//!
//! Every field tolerates being absent or `null` so that partially populated
//! bodies still decode and can be handed back for diagnostics.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result, ServerError};

use super::types::ResultFormat;

fn null_default<'de, D, T>(deserializer: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Top-level response envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecResponse {
    /// Payload
    #[serde(deserialize_with = "null_default")]
    pub data: ExecResponseData,
    /// Human-readable message
    #[serde(deserialize_with = "null_default")]
    pub message: String,
    /// Status code as a decimal string (empty when absent)
    #[serde(deserialize_with = "null_default")]
    pub code: String,
    /// Whether the request succeeded
    #[serde(deserialize_with = "null_default")]
    pub success: bool,
}

impl ExecResponse {
    /// Decode a response body.
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|e| {
            Error::decode(format!("failed to decode response body: {}", e))
        })
    }

    /// Numeric status code. An empty code is reported as -1.
    ///
    /// An unparsable code is a decode error carrying this response.
    pub fn status_code(&self) -> Result<i64> {
        if self.code.is_empty() {
            return Ok(-1);
        }
        self.code.trim().parse().map_err(|_| Error::Decode {
            message: format!("invalid status code: {:?}", self.code),
            partial: Some(Box::new(self.clone())),
        })
    }

    /// Structured error for a `success: false` response.
    pub fn server_error(&self, code: i64) -> ServerError {
        ServerError {
            code,
            sql_state: self.data.sql_state.clone(),
            message: self.message.clone(),
            query_id: self.data.query_id.clone(),
        }
    }

    /// Validate the envelope: parse the code and turn `success: false` into an error.
    pub fn check(self) -> Result<Self> {
        let code = self.status_code()?;
        tracing::debug!(success = self.success, code, "response status");
        if !self.success {
            return Err(Error::Server(self.server_error(code)));
        }
        Ok(self)
    }
}

/// Column descriptor from `rowtype`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnType {
    /// Column name
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Snowflake type name (`fixed`, `text`, `timestamp_ntz`, ...)
    #[serde(rename = "type", deserialize_with = "null_default")]
    pub type_: String,
    /// Character length
    #[serde(deserialize_with = "null_default")]
    pub length: i64,
    /// Numeric precision
    #[serde(deserialize_with = "null_default")]
    pub precision: i64,
    /// Numeric scale
    #[serde(deserialize_with = "null_default")]
    pub scale: i64,
    /// Nullability
    #[serde(deserialize_with = "null_default")]
    pub nullable: bool,
    /// Byte length
    #[serde(deserialize_with = "null_default")]
    pub byte_length: i64,
}

impl ColumnType {
    /// Returns true if the column has the given type name (case-insensitive).
    pub fn is_type(&self, name: &str) -> bool {
        self.type_.eq_ignore_ascii_case(name)
    }
}

/// Remote chunk descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkMeta {
    /// Presigned location of the chunk
    #[serde(deserialize_with = "null_default")]
    pub url: String,
    /// Rows in the chunk
    #[serde(deserialize_with = "null_default")]
    pub row_count: i64,
    /// Uncompressed byte size
    #[serde(deserialize_with = "null_default")]
    pub uncompressed_size: i64,
    /// Compressed byte size
    #[serde(deserialize_with = "null_default")]
    pub compressed_size: i64,
}

/// Session parameter returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameValueParameter {
    /// Parameter name
    #[serde(deserialize_with = "null_default")]
    pub name: String,
    /// Raw JSON value
    pub value: serde_json::Value,
}

impl NameValueParameter {
    /// Canonical text form of the value.
    ///
    /// Strings are copied, integers and floats are formatted back to text,
    /// booleans become `true`/`false`; anything else is empty.
    pub fn value_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i.to_string()
                } else if let Some(u) = n.as_u64() {
                    u.to_string()
                } else {
                    n.as_f64().map(|f| f.to_string()).unwrap_or_default()
                }
            }
            _ => String::new(),
        }
    }
}

/// Response payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecResponseData {
    /// Session parameters changed or reported by the server
    #[serde(deserialize_with = "null_default")]
    pub parameters: Vec<NameValueParameter>,
    /// Column schema
    #[serde(rename = "rowtype", deserialize_with = "null_default")]
    pub row_type: Vec<ColumnType>,
    /// Inline rows (JSON format)
    #[serde(rename = "rowset", deserialize_with = "null_default")]
    pub row_set: Vec<Vec<Option<String>>>,
    /// Inline rows (Arrow format, base64)
    #[serde(rename = "rowsetBase64", deserialize_with = "null_default")]
    pub row_set_base64: String,
    /// Total rows in the result
    #[serde(deserialize_with = "null_default")]
    pub total: i64,
    /// Rows returned inline
    #[serde(deserialize_with = "null_default")]
    pub returned: i64,
    /// Server-assigned query id
    #[serde(deserialize_with = "null_default")]
    pub query_id: String,
    /// SQLSTATE
    #[serde(deserialize_with = "null_default")]
    pub sql_state: String,
    /// Database in effect after the statement
    #[serde(deserialize_with = "null_default")]
    pub final_database_name: String,
    /// Schema in effect after the statement
    #[serde(deserialize_with = "null_default")]
    pub final_schema_name: String,
    /// Warehouse in effect after the statement
    #[serde(deserialize_with = "null_default")]
    pub final_warehouse_name: String,
    /// Role in effect after the statement
    #[serde(deserialize_with = "null_default")]
    pub final_role_name: String,
    /// Statement type id, see [`statement_type`](super::types::statement_type)
    #[serde(deserialize_with = "null_default")]
    pub statement_type_id: i64,
    /// Number of bind values the server saw
    #[serde(deserialize_with = "null_default")]
    pub number_of_binds: i64,
    /// Remote chunks
    #[serde(deserialize_with = "null_default")]
    pub chunks: Vec<ChunkMeta>,
    /// Headers required to fetch chunks
    #[serde(deserialize_with = "null_default")]
    pub chunk_headers: HashMap<String, String>,
    /// Per-result chunk decryption key
    #[serde(deserialize_with = "null_default")]
    pub qrmk: String,
    /// `json` or `arrow`
    #[serde(deserialize_with = "null_default")]
    pub query_result_format: String,
    /// Comma-joined child query ids (multi-statement parent only)
    #[serde(deserialize_with = "null_default")]
    pub result_ids: String,
    /// Comma-joined child statement type ids (multi-statement parent only)
    #[serde(deserialize_with = "null_default")]
    pub result_types: String,
}

impl ExecResponseData {
    /// Row data encoding.
    pub fn result_format(&self) -> ResultFormat {
        ResultFormat::from_tag(&self.query_result_format)
    }
}

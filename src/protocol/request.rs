//! Query submission request body.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use super::types::BindType;

/// Request parameter carrying the multi-statement count hint.
pub use crate::exec_options::keys::MULTI_STATEMENT_COUNT;

/// Value part of a bind entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BindData {
    /// Scalar in canonical text form, `None` for NULL
    Scalar(Option<String>),
    /// Array elements in canonical text form
    Array(Vec<String>),
}

/// A typed bind value as sent on the wire: `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindValue {
    /// Type tag
    #[serde(rename = "type")]
    pub type_: BindType,
    /// Encoded value
    pub value: BindData,
}

impl BindValue {
    /// Scalar bind entry.
    pub fn scalar(type_: BindType, value: Option<String>) -> Self {
        Self {
            type_,
            value: BindData::Scalar(value),
        }
    }

    /// Array bind entry; `type_` is the element type.
    pub fn array(type_: BindType, values: Vec<String>) -> Self {
        Self {
            type_,
            value: BindData::Array(values),
        }
    }
}

/// Bind entries ordered by position.
///
/// Serialized as a JSON object keyed by the 1-based position as a string,
/// emitted in position order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(Vec<BindValue>);

impl Bindings {
    /// Create an empty binding list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the value at the next position.
    pub fn push(&mut self, value: BindValue) {
        self.0.push(value);
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value at a 1-based position.
    pub fn get(&self, position: usize) -> Option<&BindValue> {
        position.checked_sub(1).and_then(|i| self.0.get(i))
    }

    /// Iterate `(position, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BindValue)> {
        self.0.iter().enumerate().map(|(i, v)| (i + 1, v))
    }
}

impl Serialize for Bindings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (position, value) in self.iter() {
            map.serialize_entry(&position.to_string(), value)?;
        }
        map.end()
    }
}

/// Query submission request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecRequest {
    /// SQL text
    pub sql_text: String,
    /// Return as soon as the query is accepted
    pub async_exec: bool,
    /// Per-connection sequence number
    pub sequence_id: u64,
    /// Issued by the driver itself rather than the application
    pub is_internal: bool,
    /// Statement parameters (only the multi-statement count hint today)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Map<String, serde_json::Value>>,
    /// Bind values
    #[serde(skip_serializing_if = "Bindings::is_empty")]
    pub bindings: Bindings,
}

//! String type implementations.

use crate::error::Result;
use crate::protocol::response::ColumnType;

use super::{FromValue, Param, ToParam};

// Every column renders to text, so String decodes from any type.
impl FromValue for String {
    fn from_text(_column: &ColumnType, text: &str) -> Result<Self> {
        Ok(text.to_owned())
    }
}

impl ToParam for str {
    fn to_param(&self) -> Param {
        Param::Text(self.to_owned())
    }
}

impl ToParam for String {
    fn to_param(&self) -> Param {
        Param::Text(self.clone())
    }
}

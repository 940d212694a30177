//! Decimal type implementation (rust_decimal crate).
//!
//! `fixed` columns arrive as exact decimal text and are bound back as `FIXED`
//! text, so no precision is lost in either direction.

use rust_decimal::Decimal;

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::protocol::types::column_type;

use super::{FromValue, Param, ToParam};

impl FromValue for Decimal {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::FIXED) && !column.is_type(column_type::REAL) {
            return Err(Error::decode(format!(
                "cannot decode {} as Decimal",
                column.type_
            )));
        }
        Decimal::from_str_exact(text)
            .map_err(|e| Error::decode(format!("invalid decimal: {}", e)))
    }
}

impl ToParam for Decimal {
    fn to_param(&self) -> Param {
        Param::Fixed(self.to_string())
    }
}

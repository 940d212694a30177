//! Primitive type implementations (bool, integers, floats).

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::protocol::types::column_type;

use super::{FromValue, Param, ToParam};

// === Boolean ===

impl FromValue for bool {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::BOOLEAN) && !column.is_type(column_type::FIXED) {
            return Err(Error::decode(format!(
                "cannot decode {} as bool",
                column.type_
            )));
        }
        match text {
            "1" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "false" | "FALSE" | "False" => Ok(false),
            _ => Err(Error::decode(format!("invalid boolean: {:?}", text))),
        }
    }
}

impl ToParam for bool {
    fn to_param(&self) -> Param {
        Param::Bool(*self)
    }
}

// === Integer types ===

macro_rules! impl_int {
    ($($t:ty),+) => {$(
        impl FromValue for $t {
            fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
                if !column.is_type(column_type::FIXED) {
                    return Err(Error::decode(format!(
                        "cannot decode {} as {}",
                        column.type_,
                        stringify!($t)
                    )));
                }
                text.parse().map_err(|e| {
                    Error::decode(format!("invalid {}: {}", stringify!($t), e))
                })
            }
        }
    )+};
}

impl_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_to_param_int {
    ($($t:ty),+) => {$(
        impl ToParam for $t {
            fn to_param(&self) -> Param {
                Param::Int(i64::from(*self))
            }
        }
    )+};
}

impl_to_param_int!(i8, i16, i32, i64, u8, u16, u32);

// u64 does not fit i64; the wire form is decimal text either way
impl ToParam for u64 {
    fn to_param(&self) -> Param {
        Param::Fixed(self.to_string())
    }
}

// === Floating point ===

impl FromValue for f64 {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::REAL) && !column.is_type(column_type::FIXED) {
            return Err(Error::decode(format!(
                "cannot decode {} as f64",
                column.type_
            )));
        }
        text.parse()
            .map_err(|e| Error::decode(format!("invalid f64: {}", e)))
    }
}

impl FromValue for f32 {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::REAL) && !column.is_type(column_type::FIXED) {
            return Err(Error::decode(format!(
                "cannot decode {} as f32",
                column.type_
            )));
        }
        text.parse()
            .map_err(|e| Error::decode(format!("invalid f32: {}", e)))
    }
}

impl ToParam for f64 {
    fn to_param(&self) -> Param {
        Param::Float(*self)
    }
}

impl ToParam for f32 {
    fn to_param(&self) -> Param {
        Param::Float(f64::from(*self))
    }
}

// === Arrays of scalars ===

macro_rules! impl_to_param_array {
    ($($t:ty),+) => {$(
        impl ToParam for [$t] {
            fn to_param(&self) -> Param {
                Param::Array(self.iter().map(ToParam::to_param).collect())
            }
        }

        impl ToParam for Vec<$t> {
            fn to_param(&self) -> Param {
                self.as_slice().to_param()
            }
        }
    )+};
}

impl_to_param_array!(bool, i32, i64, f64, String, &str);

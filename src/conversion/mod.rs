//! Conversion between Rust values and Snowflake wire values.
//!
//! Encoding goes through [`Param`], a closed set of value categories that
//! [`bind::encode_bindings`] maps to typed bind entries. Decoding goes through
//! [`FromValue`], which sees the column descriptor alongside the cell text.

pub mod bind;
mod bytes;
mod chrono;
mod primitives;
mod row;
mod string;

#[cfg(feature = "with-rust-decimal")]
mod decimal;

pub use bind::encode_bindings;
pub use row::FromRow;

use ::chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::protocol::types::TimestampMode;

/// A value to bind to a statement placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Fixed-point number already in canonical decimal text
    Fixed(String),
    /// Floating point number
    Float(f64),
    /// Text
    Text(String),
    /// Binary data
    Binary(Vec<u8>),
    /// Date/time instant; its wire form depends on the current [`TimestampMode`]
    DateTime(DateTime<FixedOffset>),
    /// Switches the timestamp mode for the following values; occupies no placeholder
    Mode(TimestampMode),
    /// One-dimensional array of scalars of a single category
    Array(Vec<Param>),
}

impl Param {
    /// Bind following date/time values as `TIMESTAMP_NTZ`.
    pub const TIMESTAMP_NTZ: Param = Param::Mode(TimestampMode::Ntz);
    /// Bind following date/time values as `TIMESTAMP_LTZ`.
    pub const TIMESTAMP_LTZ: Param = Param::Mode(TimestampMode::Ltz);
    /// Bind following date/time values as `TIMESTAMP_TZ`.
    pub const TIMESTAMP_TZ: Param = Param::Mode(TimestampMode::Tz);
    /// Bind following date/time values as `DATE`.
    pub const DATE: Param = Param::Mode(TimestampMode::Date);
    /// Bind following date/time values as `TIME`.
    pub const TIME: Param = Param::Mode(TimestampMode::Time);
    /// Switch to `BINARY` mode.
    pub const BINARY: Param = Param::Mode(TimestampMode::Binary);
}

/// Trait for converting Rust values into bind parameters.
pub trait ToParam {
    /// Convert to a [`Param`].
    fn to_param(&self) -> Param;
}

/// Trait for encoding a parameter list.
pub trait ToParams {
    /// Convert all parameters, in placeholder order.
    fn to_params(&self) -> Vec<Param>;
}

/// Trait for decoding a cell into a Rust type.
///
/// JSON result cells arrive as text; the column descriptor tells how to read it
/// (for example `date` cells are days since the epoch).
pub trait FromValue: Sized {
    /// Decode from NULL.
    ///
    /// Default implementation returns an error. Override for types that can
    /// represent NULL (like `Option<T>`).
    fn from_null() -> Result<Self> {
        Err(Error::decode("unexpected NULL value"))
    }

    /// Decode from the cell text.
    fn from_text(column: &ColumnType, text: &str) -> Result<Self>;
}

// === Param itself ===

impl ToParam for Param {
    fn to_param(&self) -> Param {
        self.clone()
    }
}

// === Option<T> - NULL handling ===

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Param {
        match self {
            Some(v) => v.to_param(),
            None => Param::Null,
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_null() -> Result<Self> {
        Ok(None)
    }

    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        T::from_text(column, text).map(Some)
    }
}

// === Reference support ===

impl<T: ToParam + ?Sized> ToParam for &T {
    fn to_param(&self) -> Param {
        (*self).to_param()
    }
}

// === ToParams implementations ===

impl ToParams for () {
    fn to_params(&self) -> Vec<Param> {
        Vec::new()
    }
}

impl<T: ToParam> ToParams for [T] {
    fn to_params(&self) -> Vec<Param> {
        self.iter().map(ToParam::to_param).collect()
    }
}

impl<T: ToParam> ToParams for Vec<T> {
    fn to_params(&self) -> Vec<Param> {
        self.as_slice().to_params()
    }
}

impl<T: ToParam, const N: usize> ToParams for [T; N] {
    fn to_params(&self) -> Vec<Param> {
        self.as_slice().to_params()
    }
}

impl<T: ToParams + ?Sized> ToParams for &T {
    fn to_params(&self) -> Vec<Param> {
        (*self).to_params()
    }
}

// Tuple implementations via macro
macro_rules! impl_to_params {
    ($($idx:tt: $T:ident),+) => {
        impl<$($T: ToParam),+> ToParams for ($($T,)+) {
            fn to_params(&self) -> Vec<Param> {
                vec![$(self.$idx.to_param()),+]
            }
        }
    };
}

impl_to_params!(0: T0);
impl_to_params!(0: T0, 1: T1);
impl_to_params!(0: T0, 1: T1, 2: T2);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10);
impl_to_params!(0: T0, 1: T1, 2: T2, 3: T3, 4: T4, 5: T5, 6: T6, 7: T7, 8: T8, 9: T9, 10: T10, 11: T11);

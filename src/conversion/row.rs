//! Row decoding traits and implementations.

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::row::Row;

use super::FromValue;

/// Trait for decoding a result row into a Rust type.
pub trait FromRow: Sized {
    /// Decode a row using column metadata.
    fn from_row(cols: &[ColumnType], row: &Row) -> Result<Self>;
}

/// Decode a single column value.
fn decode_column<T: FromValue>(column: &ColumnType, value: Option<&str>) -> Result<T> {
    match value {
        None => T::from_null(),
        Some(text) => T::from_text(column, text),
    }
}

impl FromRow for Row {
    fn from_row(_cols: &[ColumnType], row: &Row) -> Result<Self> {
        Ok(row.clone())
    }
}

impl FromRow for Vec<Option<String>> {
    fn from_row(_cols: &[ColumnType], row: &Row) -> Result<Self> {
        Ok(row.values().to_vec())
    }
}

// === Tuple implementations ===

macro_rules! impl_from_row_tuple {
    ($count:literal: $($idx:tt => $T:ident),+) => {
        impl<$($T: FromValue),+> FromRow for ($($T,)+) {
            fn from_row(cols: &[ColumnType], row: &Row) -> Result<Self> {
                if cols.len() < $count || row.len() < $count {
                    return Err(Error::decode("not enough columns for tuple"));
                }
                Ok(($(
                    decode_column(&cols[$idx], row.get($idx))?,
                )+))
            }
        }
    };
}

impl_from_row_tuple!(1: 0 => T1);
impl_from_row_tuple!(2: 0 => T1, 1 => T2);
impl_from_row_tuple!(3: 0 => T1, 1 => T2, 2 => T3);
impl_from_row_tuple!(4: 0 => T1, 1 => T2, 2 => T3, 3 => T4);
impl_from_row_tuple!(5: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5);
impl_from_row_tuple!(6: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6);
impl_from_row_tuple!(7: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7);
impl_from_row_tuple!(8: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8);
impl_from_row_tuple!(9: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9);
impl_from_row_tuple!(10: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10);
impl_from_row_tuple!(11: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10, 10 => T11);
impl_from_row_tuple!(12: 0 => T1, 1 => T2, 2 => T3, 3 => T4, 4 => T5, 5 => T6, 6 => T7, 7 => T8, 8 => T9, 9 => T10, 10 => T11, 11 => T12);

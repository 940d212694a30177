//! Binary type implementations.
//!
//! Binary values travel as lower-case hex text in both directions.

use crate::error::{Error, Result};
use crate::protocol::response::ColumnType;
use crate::protocol::types::column_type;

use super::{FromValue, Param, ToParam};

/// Encode bytes as lower-case hex.
pub(crate) fn encode_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    out
}

fn hex_digit(c: u8) -> Result<u8> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(Error::decode(format!("invalid hex digit: {:?}", char::from(c)))),
    }
}

/// Decode hex text (either case).
pub(crate) fn decode_hex(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    if bytes.len() % 2 != 0 {
        return Err(Error::decode("hex text has odd length"));
    }
    bytes
        .chunks_exact(2)
        .map(|pair| Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
        .collect()
}

impl FromValue for Vec<u8> {
    fn from_text(column: &ColumnType, text: &str) -> Result<Self> {
        if !column.is_type(column_type::BINARY) {
            return Err(Error::decode(format!(
                "cannot decode {} as bytes",
                column.type_
            )));
        }
        decode_hex(text)
    }
}

impl ToParam for [u8] {
    fn to_param(&self) -> Param {
        Param::Binary(self.to_vec())
    }
}

impl ToParam for Vec<u8> {
    fn to_param(&self) -> Param {
        Param::Binary(self.clone())
    }
}

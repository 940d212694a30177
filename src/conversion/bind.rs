//! Bind parameter encoding.
//!
//! Walks the parameter list once, keeping the current [`TimestampMode`].
//! Mode markers switch the mode for every later date/time value and take no
//! placeholder; every other value takes the next 1-based position.

use chrono::{DateTime, FixedOffset, Timelike};

use crate::error::{Error, Result};
use crate::protocol::request::{BindValue, Bindings};
use crate::protocol::types::{BindType, TimestampMode};

use super::Param;
use super::bytes::encode_hex;
use super::chrono::TZ_OFFSET_BIAS_MINUTES;

/// What a parameter contributes under the current mode.
enum Inference {
    /// A scalar with this type tag and wire text (`None` for NULL)
    Scalar(BindType, Option<String>),
    /// An array; the tag is the element type
    Array(BindType, Vec<String>),
    /// A mode marker
    ChangeMode(TimestampMode),
}

/// Encode parameters into typed bind entries.
///
/// Fails with [`Error::TypeInference`] when a value has no wire form: a
/// date/time under `BINARY` mode, or an array that is empty, nested,
/// heterogeneous or contains NULL.
pub fn encode_bindings(params: &[Param]) -> Result<Bindings> {
    let mut mode = TimestampMode::default();
    let mut bindings = Bindings::new();
    for param in params {
        match infer(param, mode)? {
            Inference::Scalar(type_, value) => bindings.push(BindValue::scalar(type_, value)),
            Inference::Array(type_, values) => bindings.push(BindValue::array(type_, values)),
            Inference::ChangeMode(next) => mode = next,
        }
    }
    Ok(bindings)
}

fn infer(param: &Param, mode: TimestampMode) -> Result<Inference> {
    Ok(match param {
        Param::Mode(next) => Inference::ChangeMode(*next),
        Param::Array(elements) => {
            let (type_, values) = encode_array(elements, mode)?;
            Inference::Array(type_, values)
        }
        scalar => {
            let (type_, value) = encode_scalar(scalar, mode)?;
            Inference::Scalar(type_, value)
        }
    })
}

fn encode_scalar(param: &Param, mode: TimestampMode) -> Result<(BindType, Option<String>)> {
    Ok(match param {
        Param::Null => (BindType::Text, None),
        Param::Bool(b) => (BindType::Boolean, Some(b.to_string())),
        Param::Int(i) => (BindType::Fixed, Some(i.to_string())),
        Param::Fixed(s) => (BindType::Fixed, Some(s.clone())),
        Param::Float(f) => (BindType::Real, Some(f.to_string())),
        Param::Text(s) => (BindType::Text, Some(s.clone())),
        Param::Binary(b) => (BindType::Binary, Some(encode_hex(b))),
        Param::DateTime(dt) => (mode.bind_type(), Some(encode_datetime(dt, mode)?)),
        Param::Mode(_) | Param::Array(_) => {
            return Err(Error::TypeInference(format!(
                "{:?} is not a scalar value",
                param
            )));
        }
    })
}

fn encode_array(elements: &[Param], mode: TimestampMode) -> Result<(BindType, Vec<String>)> {
    let mut element_type: Option<BindType> = None;
    let mut values = Vec::with_capacity(elements.len());
    for element in elements {
        let (type_, value) = match element {
            Param::Array(_) | Param::Mode(_) => {
                return Err(Error::TypeInference(
                    "arrays must be one-dimensional arrays of scalars".into(),
                ));
            }
            scalar => encode_scalar(scalar, mode)?,
        };
        let value = value.ok_or_else(|| {
            Error::TypeInference("arrays cannot contain NULL elements".into())
        })?;
        match element_type {
            None => element_type = Some(type_),
            Some(first) if first != type_ => {
                return Err(Error::TypeInference(format!(
                    "array mixes {} and {} elements",
                    first, type_
                )));
            }
            Some(_) => {}
        }
        values.push(value);
    }
    let type_ = element_type.ok_or_else(|| {
        Error::TypeInference("cannot infer the element type of an empty array".into())
    })?;
    Ok((type_, values))
}

fn epoch_nanos(dt: &DateTime<FixedOffset>) -> Result<i64> {
    dt.timestamp_nanos_opt().ok_or_else(|| {
        Error::TypeInference(format!("{} is out of range for nanosecond precision", dt))
    })
}

fn encode_datetime(dt: &DateTime<FixedOffset>, mode: TimestampMode) -> Result<String> {
    match mode {
        // wall-clock seconds, reported in milliseconds
        TimestampMode::Date => Ok((dt.naive_local().and_utc().timestamp() * 1000).to_string()),
        TimestampMode::Time => {
            let nanos = i64::from(dt.num_seconds_from_midnight()) * 1_000_000_000
                + i64::from(dt.nanosecond());
            Ok(nanos.to_string())
        }
        TimestampMode::Ntz | TimestampMode::Ltz => Ok(epoch_nanos(dt)?.to_string()),
        TimestampMode::Tz => Ok(format!(
            "{} {}",
            epoch_nanos(dt)?,
            dt.offset().local_minus_utc() / 60 + TZ_OFFSET_BIAS_MINUTES
        )),
        TimestampMode::Binary => Err(Error::TypeInference(
            "date/time values cannot be bound in BINARY mode".into(),
        )),
    }
}

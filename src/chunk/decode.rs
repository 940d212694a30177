//! Row data decoding.
//!
//! JSON chunks are the row arrays of a JSON list without the enclosing
//! brackets. Arrow data is an IPC stream whose cells are rendered to the same
//! text the JSON format carries, so both feed the same value conversions:
//! scaled integers become decimal text, dates become days since the epoch and
//! timestamp structs become `seconds.fraction[ offset]`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{Error, Result};
use crate::protocol::response::{ColumnType, ExecResponseData};
use crate::protocol::types::ResultFormat;

/// Decoded rows: cells rendered as text, `None` for NULL.
pub type RawRows = Vec<Vec<Option<String>>>;

/// Decode the rows that came inline with a response.
pub fn decode_inline(data: &ExecResponseData) -> Result<RawRows> {
    match data.result_format() {
        ResultFormat::Arrow if !data.row_set_base64.is_empty() => {
            let bytes = STANDARD
                .decode(data.row_set_base64.trim())
                .map_err(|e| Error::decode(format!("invalid inline arrow block: {}", e)))?;
            decode_arrow(&bytes, &data.row_type)
        }
        _ => Ok(data.row_set.clone()),
    }
}

/// Decode a downloaded chunk body against the result set's columns.
pub fn decode_chunk(body: &[u8], format: ResultFormat, columns: &[ColumnType]) -> Result<RawRows> {
    let rows = match format {
        ResultFormat::Json => decode_json(body)?,
        ResultFormat::Arrow => decode_arrow(body, columns)?,
    };
    let column_count = columns.len();
    if let Some(row) = rows
        .iter()
        .find(|r| column_count > 0 && r.len() != column_count)
    {
        return Err(Error::decode(format!(
            "chunk row has {} cells, expected {}",
            row.len(),
            column_count
        )));
    }
    Ok(rows)
}

fn decode_json(body: &[u8]) -> Result<RawRows> {
    let trimmed = body.trim_ascii();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let mut wrapped = Vec::with_capacity(trimmed.len() + 2);
    wrapped.push(b'[');
    wrapped.extend_from_slice(trimmed);
    wrapped.push(b']');
    serde_json::from_slice(&wrapped)
        .map_err(|e| Error::decode(format!("failed to decode json chunk: {}", e)))
}

#[cfg(feature = "arrow")]
mod arrow_text {
    use arrow::array::{Array, ArrayRef, AsArray, Int32Array, Int64Array};
    use arrow::compute::cast;
    use arrow::datatypes::{DataType, Field, Int32Type, Int64Type};
    use arrow::util::display::{ArrayFormatter, FormatOptions};

    use crate::error::{Error, Result};
    use crate::protocol::response::ColumnType;
    use crate::protocol::types::column_type;

    const NANOS_SCALE: u32 = 9;
    const MAX_SCALE: i64 = 38;

    /// Render an unscaled integer with `scale` fractional digits.
    pub(super) fn scaled_text(value: i128, scale: u32) -> String {
        if scale == 0 {
            return value.to_string();
        }
        let scale = scale as usize;
        let digits = format!("{:0>width$}", value.unsigned_abs(), width = scale + 1);
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        let sign = if value < 0 { "-" } else { "" };
        format!("{sign}{int_part}.{frac_part}")
    }

    enum Kind<'a> {
        /// Integer holding a number times 10^scale
        Scaled { values: Int64Array, scale: u32 },
        /// Days since the epoch
        Days(Int32Array),
        /// Timestamp struct of epoch, optional fraction and optional offset
        Epoch {
            epoch: Int64Array,
            fraction: Option<Int32Array>,
            timezone: Option<Int32Array>,
            scale: u32,
        },
        Display(ArrayFormatter<'a>),
    }

    /// Renders the cells of one Arrow column as text.
    pub(super) struct CellRenderer<'a> {
        array: &'a ArrayRef,
        kind: Kind<'a>,
    }

    impl<'a> CellRenderer<'a> {
        pub(super) fn new(
            array: &'a ArrayRef,
            field: &Field,
            column: Option<&ColumnType>,
            options: &FormatOptions<'a>,
        ) -> Result<Self> {
            let type_name = column
                .map(|c| c.type_.to_ascii_lowercase())
                .or_else(|| field.metadata().get("logicalType").map(|t| t.to_ascii_lowercase()))
                .unwrap_or_default();
            let is_timestamp = [
                column_type::TIMESTAMP_NTZ,
                column_type::TIMESTAMP_LTZ,
                column_type::TIMESTAMP_TZ,
            ]
            .contains(&type_name.as_str());
            let scale = column_scale(field, column)?;

            let kind = match array.data_type() {
                DataType::Struct(_) if is_timestamp => {
                    let fields = array.as_struct();
                    let epoch = fields.column_by_name("epoch").ok_or_else(|| {
                        Error::decode(format!("timestamp column {} has no epoch field", field.name()))
                    })?;
                    Kind::Epoch {
                        epoch: int64(epoch)?,
                        fraction: fields.column_by_name("fraction").map(int32).transpose()?,
                        timezone: fields.column_by_name("timezone").map(int32).transpose()?,
                        scale,
                    }
                }
                DataType::Struct(_) => {
                    return Err(Error::decode(format!(
                        "unsupported arrow struct column {} ({})",
                        field.name(),
                        type_name
                    )));
                }
                DataType::Date32 => Kind::Days(int32(array)?),
                data_type if data_type.is_integer() && scale > 0 => Kind::Scaled {
                    values: int64(array)?,
                    scale,
                },
                _ => Kind::Display(ArrayFormatter::try_new(array.as_ref(), options).map_err(
                    |e| Error::decode(format!("unsupported arrow column {}: {}", field.name(), e)),
                )?),
            };
            Ok(Self { array, kind })
        }

        pub(super) fn render(&self, row: usize) -> Option<String> {
            if self.array.is_null(row) {
                return None;
            }
            let text = match &self.kind {
                Kind::Scaled { values, scale } => {
                    scaled_text(i128::from(values.value(row)), *scale)
                }
                Kind::Days(days) => days.value(row).to_string(),
                Kind::Epoch {
                    epoch,
                    fraction,
                    timezone,
                    scale,
                } => {
                    let secs = i128::from(epoch.value(row));
                    let mut text = match fraction {
                        Some(nanos) => scaled_text(
                            secs * 1_000_000_000 + i128::from(nanos.value(row)),
                            NANOS_SCALE,
                        ),
                        None => scaled_text(secs, *scale),
                    };
                    if let Some(offset) = timezone {
                        text.push(' ');
                        text.push_str(&offset.value(row).to_string());
                    }
                    text
                }
                Kind::Display(formatter) => formatter.value(row).to_string(),
            };
            Some(text)
        }
    }

    /// Scale from the field metadata, falling back to the column descriptor.
    fn column_scale(field: &Field, column: Option<&ColumnType>) -> Result<u32> {
        let scale = match field.metadata().get("scale") {
            Some(text) => text.trim().parse().map_err(|_| {
                Error::decode(format!("invalid scale {:?} on column {}", text, field.name()))
            })?,
            None => column.map_or(0, |c| c.scale),
        };
        if !(0..=MAX_SCALE).contains(&scale) {
            return Err(Error::decode(format!(
                "scale {} out of range on column {}",
                scale,
                field.name()
            )));
        }
        u32::try_from(scale).map_err(|_| Error::decode("scale out of range"))
    }

    fn int64(array: &ArrayRef) -> Result<Int64Array> {
        let array = cast(array, &DataType::Int64)
            .map_err(|e| Error::decode(format!("expected an integer arrow column: {}", e)))?;
        Ok(array.as_primitive::<Int64Type>().clone())
    }

    fn int32(array: &ArrayRef) -> Result<Int32Array> {
        let array = cast(array, &DataType::Int32)
            .map_err(|e| Error::decode(format!("expected an integer arrow column: {}", e)))?;
        Ok(array.as_primitive::<Int32Type>().clone())
    }
}

#[cfg(feature = "arrow")]
fn decode_arrow(bytes: &[u8], columns: &[ColumnType]) -> Result<RawRows> {
    use arrow::ipc::reader::StreamReader;
    use arrow::util::display::FormatOptions;

    use self::arrow_text::CellRenderer;

    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let reader = StreamReader::try_new(std::io::Cursor::new(bytes), None)
        .map_err(|e| Error::decode(format!("failed to read arrow stream: {}", e)))?;
    let options = FormatOptions::default();

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| Error::decode(format!("failed to read arrow batch: {}", e)))?;
        let schema = batch.schema();
        let renderers = batch
            .columns()
            .iter()
            .zip(schema.fields())
            .enumerate()
            .map(|(i, (array, field))| CellRenderer::new(array, field, columns.get(i), &options))
            .collect::<Result<Vec<_>>>()?;

        for row_idx in 0..batch.num_rows() {
            rows.push(renderers.iter().map(|r| r.render(row_idx)).collect());
        }
    }
    Ok(rows)
}

#[cfg(not(feature = "arrow"))]
fn decode_arrow(_bytes: &[u8], _columns: &[ColumnType]) -> Result<RawRows> {
    Err(Error::InvalidUsage(
        "arrow result received but the `arrow` feature is disabled".into(),
    ))
}

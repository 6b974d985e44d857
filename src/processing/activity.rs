use crate::processing::types::{
    FieldValue, NormalizedRecord, ProcessError, RecordTable, Source, TIMESTAMP_COLUMN,
};
use chrono::{DateTime, NaiveDateTime};
use fitparser::profile::MesgNum;
use fitparser::{FitDataField, FitDataRecord, Value};
use std::collections::HashMap;

const POSITION_LAT_FIELD: &str = "position_lat";
const POSITION_LONG_FIELD: &str = "position_long";
const SEMICIRCLES_TO_DEGREES: f64 = 180.0 / 2_147_483_648.0;

/// Decode a FIT payload and flatten its `record` messages into a table.
///
/// Every named field of every record message becomes a column; records that
/// lack a field get a null in that column. Framing and CRCs are validated by
/// `fitparser`, so corrupt uploads surface as [`ProcessError::Format`].
pub fn parse_activity(bytes: &[u8]) -> Result<RecordTable, ProcessError> {
    let messages = fitparser::from_bytes(bytes)
        .map_err(|err| ProcessError::Format(format!("file FIT non decodificabile: {err}")))?;

    let table = records_to_table(&messages);
    tracing::debug!(
        messages = messages.len(),
        rows = table.len(),
        columns = table.columns.len(),
        "parsed activity file"
    );
    Ok(table)
}

/// Union the fields of all `record` messages into one [`RecordTable`].
pub fn records_to_table(messages: &[FitDataRecord]) -> RecordTable {
    let mut columns: Vec<String> = Vec::new();
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<(usize, FieldValue)>> = Vec::new();

    for message in messages.iter().filter(|m| m.kind() == MesgNum::Record) {
        let mut row = Vec::with_capacity(message.fields().len());
        for field in message.fields() {
            let idx = *column_index
                .entry(field.name().to_string())
                .or_insert_with(|| {
                    columns.push(field.name().to_string());
                    columns.len() - 1
                });
            row.push((idx, field_value(field)));
        }
        rows.push(row);
    }

    let timestamp_idx = column_index.get(TIMESTAMP_COLUMN).copied();
    let lat_idx = column_index.get(POSITION_LAT_FIELD).copied();
    let lon_idx = column_index.get(POSITION_LONG_FIELD).copied();

    let width = columns.len();
    let mut table = RecordTable::new(Source::Activity, columns);
    table.records = rows
        .into_iter()
        .map(|row| {
            let mut values: Vec<Option<FieldValue>> = vec![None; width];
            for (idx, value) in row {
                values[idx] = Some(value);
            }

            let number = |idx: Option<usize>| {
                idx.and_then(|i| values[i].as_ref())
                    .and_then(FieldValue::as_f64)
            };

            NormalizedRecord {
                datetime: number(timestamp_idx).and_then(epoch_seconds_to_datetime),
                latitude: number(lat_idx).map(|v| v * SEMICIRCLES_TO_DEGREES),
                longitude: number(lon_idx).map(|v| v * SEMICIRCLES_TO_DEGREES),
                values,
            }
        })
        .collect();

    table
}

/// Interpret epoch seconds as a UTC wall-clock time.
pub fn epoch_seconds_to_datetime(seconds: f64) -> Option<NaiveDateTime> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|dt| dt.naive_utc())
}

fn field_value(field: &FitDataField) -> FieldValue {
    match field.value() {
        Value::Timestamp(ts) => FieldValue::Number(ts.timestamp() as f64),
        Value::Byte(v) | Value::Enum(v) | Value::UInt8(v) | Value::UInt8z(v) => {
            FieldValue::Number(f64::from(*v))
        }
        Value::SInt8(v) => FieldValue::Number(f64::from(*v)),
        Value::SInt16(v) => FieldValue::Number(f64::from(*v)),
        Value::UInt16(v) | Value::UInt16z(v) => FieldValue::Number(f64::from(*v)),
        Value::SInt32(v) => FieldValue::Number(f64::from(*v)),
        Value::UInt32(v) | Value::UInt32z(v) => FieldValue::Number(f64::from(*v)),
        Value::SInt64(v) => FieldValue::Number(*v as f64),
        Value::UInt64(v) | Value::UInt64z(v) => FieldValue::Number(*v as f64),
        Value::Float32(v) => FieldValue::Number(f64::from(*v)),
        Value::Float64(v) => FieldValue::Number(*v),
        Value::String(text) => FieldValue::Text(text.clone()),
        _ => FieldValue::Text(field.to_string()),
    }
}

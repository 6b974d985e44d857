use crate::processing::types::{
    DATETIME_COLUMN, FieldValue, LATITUDE_COLUMN, LONGITUDE_COLUMN, NormalizedRecord,
    ProcessError, RecordTable, Source,
};
use chrono::NaiveDateTime;
use csv::{ReaderBuilder, StringRecord};

/// Textual layout of the `Datetime` column.
pub const TRACK_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Cell spellings read as a missing value.
const MISSING_MARKERS: [&str; 8] = ["NaN", "nan", "-NaN", "NA", "N/A", "n/a", "NULL", "null"];

const LATITUDE_LIMIT: f64 = 90.0;
const LONGITUDE_LIMIT: f64 = 180.0;

/// Parse a tab-separated GPS log into a [`RecordTable`].
///
/// The header row names the columns. `Datetime`, `Latitude` and `Longitude`
/// are lifted into the record itself; every other column is kept as an
/// optional field. A single unparsable `Datetime` cell fails the whole file.
pub fn parse_track(bytes: &[u8]) -> Result<RecordTable, ProcessError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|err| ProcessError::Format(format!("intestazione TSV illeggibile: {err}")))?
        .clone();

    let datetime_idx = required_column(&headers, DATETIME_COLUMN)?;
    let latitude_idx = required_column(&headers, LATITUDE_COLUMN)?;
    let longitude_idx = required_column(&headers, LONGITUDE_COLUMN)?;

    let optional: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| ![datetime_idx, latitude_idx, longitude_idx].contains(idx))
        .map(|(idx, name)| (idx, name.to_string()))
        .collect();

    let mut table = RecordTable::new(
        Source::Track,
        optional.iter().map(|(_, name)| name.clone()).collect(),
    );

    for (row, result) in reader.records().enumerate() {
        // Header is line 1.
        let line = row + 2;
        let record = result
            .map_err(|err| ProcessError::Format(format!("riga {line} non valida: {err}")))?;

        let datetime = parse_datetime(cell(&record, datetime_idx), line)?;
        let latitude = parse_coordinate(
            cell(&record, latitude_idx),
            LATITUDE_COLUMN,
            LATITUDE_LIMIT,
            line,
        )?;
        let longitude = parse_coordinate(
            cell(&record, longitude_idx),
            LONGITUDE_COLUMN,
            LONGITUDE_LIMIT,
            line,
        )?;
        let values = optional
            .iter()
            .map(|(idx, _)| parse_field(cell(&record, *idx)))
            .collect();

        table.records.push(NormalizedRecord {
            datetime: Some(datetime),
            latitude,
            longitude,
            values,
        });
    }

    tracing::debug!(
        rows = table.len(),
        columns = table.columns.len(),
        "parsed track file"
    );
    Ok(table)
}

fn required_column(headers: &StringRecord, name: &str) -> Result<usize, ProcessError> {
    headers
        .iter()
        .position(|header| header == name)
        .ok_or_else(|| ProcessError::Format(format!("colonna '{name}' mancante")))
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

fn parse_datetime(raw: &str, line: usize) -> Result<NaiveDateTime, ProcessError> {
    NaiveDateTime::parse_from_str(raw.trim(), TRACK_DATETIME_FORMAT).map_err(|err| {
        ProcessError::Format(format!(
            "Datetime '{raw}' alla riga {line} non corrisponde a GG/MM/AAAA hh:mm:ss ({err})"
        ))
    })
}

fn is_missing(trimmed: &str) -> bool {
    trimmed.is_empty() || MISSING_MARKERS.contains(&trimmed)
}

/// Degrees within `±limit`; missing cells are null.
fn parse_coordinate(
    raw: &str,
    column: &str,
    limit: f64,
    line: usize,
) -> Result<Option<f64>, ProcessError> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return Ok(None);
    }
    let value = trimmed.parse::<f64>().map_err(|_| {
        ProcessError::Format(format!("{column} '{raw}' alla riga {line} non è numerico"))
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(ProcessError::Format(format!(
            "{column} '{raw}' alla riga {line} fuori dall'intervallo ±{limit}"
        )));
    }
    Ok(Some(value))
}

/// Non-finite numbers (`inf`) carry no measurement and read as null.
fn parse_field(raw: &str) -> Option<FieldValue> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(FieldValue::Number(value)),
        Ok(_) => None,
        Err(_) => Some(FieldValue::Text(trimmed.to_string())),
    }
}

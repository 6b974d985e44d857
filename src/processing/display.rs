use crate::processing::combine::CombinedTable;
use crate::processing::types::{
    DATETIME_COLUMN, FieldValue, LATITUDE_COLUMN, LONGITUDE_COLUMN, NormalizedRecord,
    RecordTable, Source,
};
use chrono::NaiveDateTime;

const NULL_CELL: &str = "—";

/// Stringified table ready for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

fn datetime_cell(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| NULL_CELL.to_string())
}

fn number_cell(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| NULL_CELL.to_string())
}

fn field_cell(value: Option<&FieldValue>) -> String {
    value
        .map(ToString::to_string)
        .unwrap_or_else(|| NULL_CELL.to_string())
}

/// GPS tables expose their coordinates as columns; FIT tables already carry
/// the raw position fields.
fn lifted_headers(source: Source) -> &'static [&'static str] {
    match source {
        Source::Track => &[LATITUDE_COLUMN, LONGITUDE_COLUMN],
        Source::Activity => &[],
    }
}

fn lifted_cells(source: Source, record: Option<&NormalizedRecord>) -> Vec<String> {
    match source {
        Source::Track => vec![
            number_cell(record.and_then(|r| r.latitude)),
            number_cell(record.and_then(|r| r.longitude)),
        ],
        Source::Activity => Vec::new(),
    }
}

fn source_cells(source: Source, width: usize, record: Option<&NormalizedRecord>) -> Vec<String> {
    let mut cells = lifted_cells(source, record);
    cells.extend((0..width).map(|idx| {
        field_cell(record.and_then(|r| r.values.get(idx)).and_then(Option::as_ref))
    }));
    cells
}

/// Rows of a single-source table; every row when `limit` is `None`.
pub fn table_view(table: &RecordTable, limit: Option<usize>) -> DisplayTable {
    let mut headers = vec![DATETIME_COLUMN.to_string()];
    headers.extend(lifted_headers(table.source).iter().map(|h| h.to_string()));
    headers.extend(table.columns.iter().cloned());

    let rows = table
        .records
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|record| {
            let mut cells = vec![datetime_cell(record.datetime)];
            cells.extend(source_cells(table.source, table.columns.len(), Some(record)));
            cells
        })
        .collect();

    DisplayTable {
        headers,
        rows,
        total_rows: table.len(),
    }
}

/// Rows of a combined table; headers are prefixed with their source so
/// duplicate names stay distinguishable.
pub fn combined_view(table: &CombinedTable<'_>, limit: Option<usize>) -> DisplayTable {
    let sources = [Source::Track, Source::Activity];

    let mut headers = vec![DATETIME_COLUMN.to_string()];
    for source in sources {
        let side = table.table(source);
        headers.extend(
            lifted_headers(source)
                .iter()
                .copied()
                .chain(side.columns.iter().map(String::as_str))
                .map(|name| format!("{} · {name}", source.label())),
        );
    }

    let rows = table
        .rows
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .map(|row| {
            let mut cells = vec![datetime_cell(row.datetime)];
            for source in sources {
                cells.extend(source_cells(
                    source,
                    table.table(source).columns.len(),
                    row.record(source),
                ));
            }
            cells
        })
        .collect();

    DisplayTable {
        headers,
        rows,
        total_rows: table.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::combine::combine;
    use crate::processing::types::MergePolicy;

    fn gps() -> RecordTable {
        let mut table = RecordTable::new(Source::Track, vec!["AirO2(%)".into()]);
        table.records = vec![NormalizedRecord {
            datetime: None,
            latitude: Some(45.5),
            longitude: Some(7.25),
            values: vec![None],
        }];
        table
    }

    #[test]
    fn track_view_lists_coordinates_and_nulls() {
        let preview = table_view(&gps(), None);
        assert_eq!(
            preview.headers,
            vec!["Datetime", "Latitude", "Longitude", "AirO2(%)"]
        );
        assert_eq!(preview.rows, vec![vec!["—", "45.5", "7.25", "—"]]);
        assert_eq!(preview.total_rows, 1);
    }

    #[test]
    fn combined_view_prefixes_sources() {
        let track = gps();
        let activity = RecordTable::new(Source::Activity, vec!["heart_rate".into()]);
        let combined = combine(&track, &activity, MergePolicy::Concatenate);

        let preview = combined_view(&combined, None);
        assert_eq!(
            preview.headers,
            vec![
                "Datetime",
                "GPS · Latitude",
                "GPS · Longitude",
                "GPS · AirO2(%)",
                "FIT · heart_rate"
            ]
        );
        assert_eq!(preview.rows[0].len(), preview.headers.len());
        assert_eq!(preview.rows[0][4], "—");
    }

    #[test]
    fn view_keeps_every_row_unless_capped() {
        let mut table = gps();
        let record = table.records[0].clone();
        table.records = vec![record; 40];

        let full = table_view(&table, None);
        assert_eq!(full.rows.len(), 40);
        assert_eq!(full.total_rows, 40);

        let capped = table_view(&table, Some(10));
        assert_eq!(capped.rows.len(), 10);
        assert_eq!(capped.total_rows, 40);
    }
}

use crate::processing::combine::CombinedTable;
use crate::processing::types::{ChartKind, FieldValue, RecordTable, Source};
use chrono::NaiveDateTime;

/// Anything that can hand out `(time, value)` pairs for a named column.
pub trait TimeSeriesSource {
    /// Human-readable name used in notices ("dati GPS", ...).
    fn describe(&self) -> &'static str;

    /// Points of `column` for rows with a datetime and a numeric value, in row
    /// order. `None` when the column is absent altogether.
    fn time_series(&self, column: &str) -> Option<Vec<ChartPoint>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartPoint {
    pub time: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<ChartPoint>,
}

/// Data of one requested chart, ready for a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub kind: ChartKind,
    pub title: &'static str,
    pub series: Vec<ChartSeries>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Rendered(Chart),
    /// At least one column of the chart is absent from the source.
    MissingColumn {
        kind: ChartKind,
        columns: Vec<&'static str>,
        message: String,
    },
}

/// Build `kind` from `source`, or explain which columns are missing.
pub fn build_chart<S: TimeSeriesSource + ?Sized>(source: &S, kind: ChartKind) -> ChartOutcome {
    let mut series = Vec::new();
    let mut missing = Vec::new();

    for (column, label) in kind.columns() {
        match source.time_series(column) {
            Some(points) => series.push(ChartSeries {
                label: (*label).to_string(),
                points,
            }),
            None => missing.push(*column),
        }
    }

    if missing.is_empty() {
        ChartOutcome::Rendered(Chart {
            kind,
            title: kind.title(),
            series,
        })
    } else {
        let quoted: Vec<String> = missing.iter().map(|column| format!("'{column}'")).collect();
        let message = format!(
            "Colonna {} non trovata nei {}.",
            quoted.join(" o "),
            source.describe()
        );
        tracing::warn!(chart = ?kind, missing = ?missing, "chart skipped");
        ChartOutcome::MissingColumn {
            kind,
            columns: missing,
            message,
        }
    }
}

fn point(time: Option<NaiveDateTime>, value: Option<&FieldValue>) -> Option<ChartPoint> {
    Some(ChartPoint {
        time: time?,
        value: value?.as_f64()?,
    })
}

impl TimeSeriesSource for RecordTable {
    fn describe(&self) -> &'static str {
        match self.source {
            Source::Track => "dati GPS",
            Source::Activity => "dati FIT",
        }
    }

    fn time_series(&self, column: &str) -> Option<Vec<ChartPoint>> {
        let column = self.column(column)?;
        Some(
            self.records
                .iter()
                .zip(column.values())
                .filter_map(|(record, value)| point(record.datetime, value))
                .collect(),
        )
    }
}

impl TimeSeriesSource for CombinedTable<'_> {
    fn describe(&self) -> &'static str {
        "dati combinati"
    }

    fn time_series(&self, column: &str) -> Option<Vec<ChartPoint>> {
        let located = self.locate(column)?;
        Some(
            self.rows
                .iter()
                .filter_map(|row| point(row.datetime, self.value(row, located)))
                .collect(),
        )
    }
}

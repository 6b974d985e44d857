use chrono::NaiveDateTime;
use std::fmt;
use thiserror::Error;

/// Column holding the parsed sample time in both sources.
pub const DATETIME_COLUMN: &str = "Datetime";
pub const LATITUDE_COLUMN: &str = "Latitude";
pub const LONGITUDE_COLUMN: &str = "Longitude";
/// Oxygen percentage column emitted by the track logger.
pub const OXYGEN_COLUMN: &str = "AirO2(%)";
pub const HEART_RATE_COLUMN: &str = "heart_rate";
/// Raw epoch-seconds column of FIT record messages.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Hard failures that abort processing of a single uploaded file.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProcessError {
    #[error("Formato non valido: {0}")]
    Format(String),
    #[error("Nessun dato: {0}")]
    EmptyInput(String),
}

/// One cell of an optional column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Number(value) => write!(f, "{value}"),
            FieldValue::Text(text) => f.write_str(text),
        }
    }
}

/// One sample of a track or activity.
///
/// `values` is aligned with the owning table's column list: a `None` entry is
/// a null at this row, while a column missing from the table is absent for
/// every row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedRecord {
    pub datetime: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub values: Vec<Option<FieldValue>>,
}

impl NormalizedRecord {
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Where a table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Track,
    Activity,
}

impl Source {
    pub fn label(self) -> &'static str {
        match self {
            Source::Track => "GPS",
            Source::Activity => "FIT",
        }
    }
}

/// Ordered samples from one source, in file order, plus the names of the
/// optional fields they carry.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordTable {
    pub source: Source,
    pub columns: Vec<String>,
    pub records: Vec<NormalizedRecord>,
}

/// Borrowed view of a column that is known to exist in its table.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    table: &'a RecordTable,
    index: usize,
}

impl<'a> Column<'a> {
    pub fn name(self) -> &'a str {
        &self.table.columns[self.index]
    }

    /// Cell of this column at `row`, `None` when null.
    pub fn value(self, row: usize) -> Option<&'a FieldValue> {
        self.table
            .records
            .get(row)
            .and_then(|record| record.values.get(self.index))
            .and_then(Option::as_ref)
    }

    pub fn values(self) -> impl Iterator<Item = Option<&'a FieldValue>> + 'a {
        let Column { table, index } = self;
        table
            .records
            .iter()
            .map(move |record| record.values.get(index).and_then(Option::as_ref))
    }

    /// Numeric cells only; nulls and text are skipped.
    pub fn numbers(self) -> impl Iterator<Item = f64> + 'a {
        self.values().flatten().filter_map(FieldValue::as_f64)
    }
}

impl RecordTable {
    pub fn new(source: Source, columns: Vec<String>) -> Self {
        Self {
            source,
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Look up an optional column; `None` means the source never carried it.
    pub fn column(&self, name: &str) -> Option<Column<'_>> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|index| Column { table: self, index })
    }

    /// First column present out of a list of accepted spellings.
    pub fn first_column(&self, names: &[&str]) -> Option<Column<'_>> {
        names.iter().find_map(|name| self.column(name))
    }

    pub fn positions(&self) -> Vec<(f64, f64)> {
        self.records
            .iter()
            .filter_map(NormalizedRecord::position)
            .collect()
    }
}

/// Policy used to line up the GPS and FIT tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergePolicy {
    /// Same-index pairing, the shorter side padded with nulls.
    Concatenate,
    /// Join on `Datetime` equality, keeping timestamps from either side.
    #[default]
    OuterTimeJoin,
}

impl MergePolicy {
    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "concat" => Some(MergePolicy::Concatenate),
            "outer" => Some(MergePolicy::OuterTimeJoin),
            _ => None,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MergePolicy::Concatenate => "concatenazione per posizione",
            MergePolicy::OuterTimeJoin => "unione esterna su Datetime",
        }
    }
}

/// Rendering flavour of a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WidgetStyle {
    /// Server-rendered SVG.
    Static,
    /// Script-driven widget (Leaflet / Chart.js).
    #[default]
    Interactive,
}

impl WidgetStyle {
    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "static" => Some(WidgetStyle::Static),
            "interactive" => Some(WidgetStyle::Interactive),
            _ => None,
        }
    }
}

/// Charts the user can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChartKind {
    Oxygen,
    HeartRate,
    OxygenVsHeartRate,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::Oxygen,
        ChartKind::HeartRate,
        ChartKind::OxygenVsHeartRate,
    ];

    pub fn from_form(value: &str) -> Option<Self> {
        match value {
            "oxygen" => Some(ChartKind::Oxygen),
            "heart_rate" => Some(ChartKind::HeartRate),
            "oxygen_vs_heart_rate" => Some(ChartKind::OxygenVsHeartRate),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::Oxygen => "Ossigeno nel Tempo",
            ChartKind::HeartRate => "Battito Cardiaco nel Tempo",
            ChartKind::OxygenVsHeartRate => "Ossigeno vs Battito Cardiaco",
        }
    }

    /// Columns plotted by this chart, with their legend labels.
    pub fn columns(self) -> &'static [(&'static str, &'static str)] {
        match self {
            ChartKind::Oxygen => &[(OXYGEN_COLUMN, OXYGEN_COLUMN)],
            ChartKind::HeartRate => &[(HEART_RATE_COLUMN, HEART_RATE_COLUMN)],
            ChartKind::OxygenVsHeartRate => &[
                (OXYGEN_COLUMN, "Ossigeno"),
                (HEART_RATE_COLUMN, "Battito Cardiaco"),
            ],
        }
    }
}

/// User-facing toggles for one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardOptions {
    pub merge_policy: MergePolicy,
    pub chart_style: WidgetStyle,
    pub map_style: WidgetStyle,
    pub show_statistics: bool,
    pub charts: Vec<ChartKind>,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            chart_style: WidgetStyle::default(),
            map_style: WidgetStyle::default(),
            show_statistics: true,
            charts: ChartKind::ALL.to_vec(),
        }
    }
}

impl DashboardOptions {
    pub fn wants(&self, kind: ChartKind) -> bool {
        self.charts.contains(&kind)
    }
}

/// An uploaded file held in memory for the duration of a request.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Per-request context: the files submitted in this cycle.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub track: Option<Upload>,
    pub activity: Option<Upload>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.track.is_none() && self.activity.is_none()
    }
}

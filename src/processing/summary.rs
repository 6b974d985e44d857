use crate::processing::types::RecordTable;
use chrono::{Duration, NaiveDateTime};
use geo::{Distance, Geodesic, Point};

/// Accepted spellings of the altitude column, in lookup order.
pub const ALTITUDE_COLUMNS: [&str; 4] = ["Altitude", "Altitude(m)", "altitude", "enhanced_altitude"];

/// Placeholder shown for metrics that cannot be derived.
pub const NOT_AVAILABLE: &str = "N/A";

pub const LABEL_DISTANCE: &str = "Distanza totale";
pub const LABEL_START: &str = "Ora di inizio";
pub const LABEL_END: &str = "Ora di fine";
pub const LABEL_MAX_ALTITUDE: &str = "Altitudine massima";
pub const LABEL_ELEVATION_GAIN: &str = "Dislivello";
pub const LABEL_DURATION: &str = "Durata";

const REPORT_DATETIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Typed trip metrics derived from a GPS table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TripStatistics {
    pub distance_meters: f64,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub max_altitude: Option<f64>,
    /// Peak-to-trough altitude range, not cumulative ascent.
    pub elevation_gain_meters: f64,
    pub duration: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub label: &'static str,
    pub value: String,
}

/// Display-ready statistics, always carrying all six metrics in a fixed order.
#[derive(Debug, Clone, PartialEq)]
pub struct StatisticsReport {
    pub entries: Vec<ReportEntry>,
}

impl StatisticsReport {
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.value.as_str())
    }
}

/// Reduce a GPS table into [`TripStatistics`].
///
/// Each metric degrades on its own: a missing altitude column only affects the
/// altitude metrics, an empty table leaves the times undefined.
pub fn derive_trip_statistics(table: &RecordTable) -> TripStatistics {
    let distance_meters = path_distance(&table.positions());

    let (start, end) = table
        .records
        .iter()
        .filter_map(|record| record.datetime)
        .fold((None, None), |(min, max): (Option<NaiveDateTime>, Option<NaiveDateTime>), ts| {
            (
                Some(min.map_or(ts, |m| m.min(ts))),
                Some(max.map_or(ts, |m| m.max(ts))),
            )
        });

    let altitude_bounds = table.first_column(&ALTITUDE_COLUMNS).and_then(|column| {
        column
            .numbers()
            .filter(|value| value.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, value| {
                Some(acc.map_or((value, value), |(lo, hi)| (lo.min(value), hi.max(value))))
            })
    });

    let max_altitude = altitude_bounds.map(|(_, hi)| hi);
    let elevation_gain_meters = altitude_bounds
        .map(|(lo, hi)| (hi - lo).max(0.0))
        .unwrap_or(0.0);

    let duration = match (start, end) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    };

    TripStatistics {
        distance_meters,
        start,
        end,
        max_altitude,
        elevation_gain_meters,
        duration,
    }
}

/// Sum of geodesic distances between consecutive `(lat, lon)` pairs, in
/// sequence order.
pub fn path_distance(positions: &[(f64, f64)]) -> f64 {
    positions
        .windows(2)
        .map(|pair| match pair {
            [from, to] if from == to => 0.0,
            [(lat1, lon1), (lat2, lon2)] => {
                Geodesic::distance(Point::new(*lon1, *lat1), Point::new(*lon2, *lat2))
            }
            _ => 0.0,
        })
        .fold(0.0, |total, step| total + step)
}

impl TripStatistics {
    pub fn report(&self) -> StatisticsReport {
        let entries = vec![
            ReportEntry {
                label: LABEL_DISTANCE,
                value: format_distance(self.distance_meters),
            },
            ReportEntry {
                label: LABEL_START,
                value: format_datetime(self.start),
            },
            ReportEntry {
                label: LABEL_END,
                value: format_datetime(self.end),
            },
            ReportEntry {
                label: LABEL_MAX_ALTITUDE,
                value: self
                    .max_altitude
                    .map(|alt| format!("{alt:.1} m"))
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            },
            ReportEntry {
                label: LABEL_ELEVATION_GAIN,
                value: format!("{:.1} m", self.elevation_gain_meters),
            },
            ReportEntry {
                label: LABEL_DURATION,
                value: format_duration(self.duration),
            },
        ];
        StatisticsReport { entries }
    }
}

fn format_distance(meters: f64) -> String {
    format!("{:.2} km", meters / 1000.0)
}

fn format_datetime(value: Option<NaiveDateTime>) -> String {
    value
        .map(|dt| dt.format(REPORT_DATETIME_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Whole hours and minutes; leftover seconds are truncated.
pub fn format_duration(duration: Option<Duration>) -> String {
    match duration {
        Some(span) => {
            let total_seconds = span.num_seconds().max(0);
            let hours = total_seconds / 3600;
            let minutes = (total_seconds % 3600) / 60;
            format!("{hours} ore e {minutes} minuti")
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::{FieldValue, NormalizedRecord, Source};
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, 1)
            .and_then(|day| day.and_hms_opt(h, m, s))
            .unwrap()
    }

    fn table(rows: &[(NaiveDateTime, f64, f64, Option<f64>)], with_altitude: bool) -> RecordTable {
        let columns = if with_altitude {
            vec!["Altitude".to_string()]
        } else {
            Vec::new()
        };
        let mut table = RecordTable::new(Source::Track, columns);
        table.records = rows
            .iter()
            .map(|(dt, lat, lon, alt)| NormalizedRecord {
                datetime: Some(*dt),
                latitude: Some(*lat),
                longitude: Some(*lon),
                values: if with_altitude {
                    vec![alt.map(FieldValue::Number)]
                } else {
                    Vec::new()
                },
            })
            .collect();
        table
    }

    #[test]
    fn identical_points_cover_no_distance() {
        let rows: Vec<_> = (0..5).map(|i| (at(10, i, 0), 45.0, 7.0, None)).collect();
        let stats = derive_trip_statistics(&table(&rows, false));
        assert_eq!(stats.distance_meters, 0.0);
    }

    #[test]
    fn single_row_has_zero_distance_and_duration() {
        let stats = derive_trip_statistics(&table(&[(at(9, 15, 0), 45.0, 7.0, None)], false));
        assert_eq!(stats.distance_meters, 0.0);
        assert_eq!(stats.start, stats.end);

        let report = stats.report();
        assert_eq!(report.get(LABEL_DURATION), Some("0 ore e 0 minuti"));
        assert_eq!(report.get(LABEL_DISTANCE), Some("0.00 km"));
    }

    #[test]
    fn empty_table_reports_placeholders() {
        let report = derive_trip_statistics(&table(&[], true)).report();
        assert_eq!(report.entries.len(), 6);
        assert_eq!(report.get(LABEL_START), Some(NOT_AVAILABLE));
        assert_eq!(report.get(LABEL_END), Some(NOT_AVAILABLE));
        assert_eq!(report.get(LABEL_MAX_ALTITUDE), Some(NOT_AVAILABLE));
        assert_eq!(report.get(LABEL_ELEVATION_GAIN), Some("0.0 m"));
        assert_eq!(report.get(LABEL_DURATION), Some(NOT_AVAILABLE));
    }

    #[test]
    fn elevation_gain_is_range_not_cumulative_ascent() {
        let rows = [
            (at(10, 0, 0), 45.0, 7.0, Some(100.0)),
            (at(10, 1, 0), 45.0, 7.0, Some(150.0)),
            (at(10, 2, 0), 45.0, 7.0, Some(120.0)),
            (at(10, 3, 0), 45.0, 7.0, Some(170.0)),
        ];
        let stats = derive_trip_statistics(&table(&rows, true));
        assert_eq!(stats.max_altitude, Some(170.0));
        // Cumulative ascent would be 100 m.
        assert_eq!(stats.elevation_gain_meters, 70.0);
    }

    #[test]
    fn flat_or_missing_altitude_has_zero_gain() {
        let flat = [
            (at(10, 0, 0), 45.0, 7.0, Some(50.0)),
            (at(10, 1, 0), 45.0, 7.0, Some(50.0)),
        ];
        assert_eq!(
            derive_trip_statistics(&table(&flat, true)).elevation_gain_meters,
            0.0
        );

        let stats = derive_trip_statistics(&table(&flat, false));
        assert_eq!(stats.elevation_gain_meters, 0.0);
        assert_eq!(stats.max_altitude, None);
        assert_eq!(stats.report().get(LABEL_MAX_ALTITUDE), Some(NOT_AVAILABLE));
    }

    #[test]
    fn start_and_end_come_from_min_and_max_not_order() {
        let rows = [
            (at(11, 0, 0), 45.0, 7.0, None),
            (at(10, 0, 0), 45.0, 7.0, None),
            (at(10, 30, 0), 45.0, 7.0, None),
        ];
        let stats = derive_trip_statistics(&table(&rows, false));
        assert_eq!(stats.start, Some(at(10, 0, 0)));
        assert_eq!(stats.end, Some(at(11, 0, 0)));
    }

    #[test]
    fn duration_truncates_seconds() {
        assert_eq!(
            format_duration(Some(Duration::seconds(2 * 3600 + 5 * 60 + 59))),
            "2 ore e 5 minuti"
        );
    }

    #[test]
    fn distance_follows_sequence_order() {
        let there_and_back = [(45.0, 7.0), (45.1, 7.1), (45.0, 7.0)];
        let one_way = path_distance(&there_and_back[..2]);
        let total = path_distance(&there_and_back);
        assert!((total - 2.0 * one_way).abs() < 1e-6);
    }
}

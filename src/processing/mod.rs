pub mod activity;
pub mod charts;
pub mod combine;
pub mod display;
pub mod route;
pub mod summary;
pub mod track;
pub mod types;

use activity::parse_activity;
use charts::{ChartOutcome, build_chart};
use combine::combine;
use display::{DisplayTable, combined_view, table_view};
use route::{Route, build_route};
use summary::{StatisticsReport, derive_trip_statistics};
use track::parse_track;
use uuid::Uuid;

pub use types::{
    ChartKind, DashboardOptions, FieldValue, MergePolicy, NormalizedRecord, ProcessError,
    RecordTable, Session, Source, Upload, WidgetStyle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A message shown to the user for this render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackSection {
    pub file_name: String,
    pub map: Result<Route, ProcessError>,
    /// `None` when statistics are switched off.
    pub statistics: Option<StatisticsReport>,
    pub table: DisplayTable,
    pub charts: Vec<ChartOutcome>,
}

#[derive(Debug, Clone)]
pub struct ActivitySection {
    pub file_name: String,
    pub table: DisplayTable,
    pub charts: Vec<ChartOutcome>,
}

#[derive(Debug, Clone)]
pub struct CombinedSection {
    pub policy: MergePolicy,
    pub table: DisplayTable,
    pub charts: Vec<ChartOutcome>,
}

/// Everything produced by one upload-and-render cycle.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub cycle_id: Uuid,
    pub options: DashboardOptions,
    pub notices: Vec<Notice>,
    pub track: Option<TrackSection>,
    pub activity: Option<ActivitySection>,
    pub combined: Option<CombinedSection>,
}

/// Run one dashboard cycle over the files of `session`.
///
/// The stages are:
/// 1. [`track::parse_track`] and [`activity::parse_activity`] decode whichever
///    files were uploaded. A failure in one file is reported as a notice and
///    never stops the other.
/// 2. [`summary::derive_trip_statistics`] and [`route::build_route`] run on the
///    GPS table.
/// 3. [`combine::combine`] lines up both tables with the selected
///    [`MergePolicy`] when both parsed.
/// 4. [`charts::build_chart`] extracts every requested chart; absent columns
///    become [`ChartOutcome::MissingColumn`] instead of errors.
pub fn build_dashboard(session: &Session, options: &DashboardOptions) -> Dashboard {
    let cycle_id = Uuid::new_v4();
    let span = tracing::info_span!("dashboard", cycle = %cycle_id);
    let _entered = span.enter();

    let mut notices = Vec::new();

    if session.is_empty() {
        notices.push(Notice::new(
            NoticeLevel::Info,
            "Carica un file TSV e/o un file FIT per iniziare.",
        ));
    }

    let track_table = session.track.as_ref().and_then(|upload| {
        load(upload, "TSV", parse_track, &mut notices, "Dati GPS caricati con successo!")
    });
    let activity_table = session.activity.as_ref().and_then(|upload| {
        load(upload, "FIT", parse_activity, &mut notices, "Dati FIT caricati con successo!")
    });

    let track = track_table.as_ref().map(|(file_name, table)| {
        let map = build_route(table);
        if let Err(err) = &map {
            tracing::warn!(error = %err, "route map skipped");
        }
        let statistics = options
            .show_statistics
            .then(|| derive_trip_statistics(table).report());

        TrackSection {
            file_name: file_name.clone(),
            map,
            statistics,
            table: table_view(table, None),
            charts: requested_charts(table, options, &[ChartKind::Oxygen]),
        }
    });

    let activity = activity_table.as_ref().map(|(file_name, table)| ActivitySection {
        file_name: file_name.clone(),
        table: table_view(table, None),
        charts: requested_charts(table, options, &[ChartKind::HeartRate]),
    });

    let combined = match (&track_table, &activity_table) {
        (Some((_, gps)), Some((_, fit))) => {
            let merged = combine(gps, fit, options.merge_policy);
            Some(CombinedSection {
                policy: options.merge_policy,
                table: combined_view(&merged, None),
                charts: requested_charts(&merged, options, &ChartKind::ALL),
            })
        }
        _ => None,
    };

    tracing::info!(
        track = track.is_some(),
        activity = activity.is_some(),
        combined = combined.is_some(),
        notices = notices.len(),
        "dashboard built"
    );

    Dashboard {
        cycle_id,
        options: options.clone(),
        notices,
        track,
        activity,
        combined,
    }
}

fn load(
    upload: &Upload,
    kind: &str,
    parse: fn(&[u8]) -> Result<RecordTable, ProcessError>,
    notices: &mut Vec<Notice>,
    success: &str,
) -> Option<(String, RecordTable)> {
    match parse(&upload.bytes) {
        Ok(table) => {
            tracing::info!(file = %upload.file_name, rows = table.len(), "{kind} file loaded");
            notices.push(Notice::new(NoticeLevel::Success, success));
            Some((upload.file_name.clone(), table))
        }
        Err(err) => {
            tracing::warn!(file = %upload.file_name, error = %err, "{kind} file rejected");
            notices.push(Notice::new(
                NoticeLevel::Error,
                format!("Errore durante il caricamento del file {kind}: {err}"),
            ));
            None
        }
    }
}

fn requested_charts<S: charts::TimeSeriesSource + ?Sized>(
    source: &S,
    options: &DashboardOptions,
    candidates: &[ChartKind],
) -> Vec<ChartOutcome> {
    candidates
        .iter()
        .copied()
        .filter(|kind| options.wants(*kind))
        .map(|kind| build_chart(source, kind))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, bytes: &[u8]) -> Upload {
        Upload {
            file_name: name.into(),
            bytes: bytes.to_vec(),
        }
    }

    const TRACK: &str = "Datetime\tLatitude\tLongitude\n\
                         01/01/2023 10:00:00\t45.0\t7.0\n\
                         01/01/2023 11:30:00\t45.1\t7.1\n";

    #[test]
    fn empty_session_asks_for_files() {
        let dashboard = build_dashboard(&Session::default(), &DashboardOptions::default());
        assert!(dashboard.track.is_none());
        assert!(dashboard.activity.is_none());
        assert!(dashboard.combined.is_none());
        assert_eq!(dashboard.notices[0].level, NoticeLevel::Info);
    }

    #[test]
    fn broken_activity_does_not_stop_track() {
        let session = Session {
            track: Some(upload("walk.tsv", TRACK.as_bytes())),
            activity: Some(upload("walk.fit", b"not a fit file")),
        };
        let dashboard = build_dashboard(&session, &DashboardOptions::default());

        let track = dashboard.track.expect("track should still render");
        assert!(track.map.is_ok());
        assert!(track.statistics.is_some());
        assert!(dashboard.activity.is_none());
        assert!(dashboard.combined.is_none());
        assert!(
            dashboard
                .notices
                .iter()
                .any(|n| n.level == NoticeLevel::Error && n.message.contains("FIT"))
        );
    }

    #[test]
    fn statistics_can_be_switched_off() {
        let session = Session {
            track: Some(upload("walk.tsv", TRACK.as_bytes())),
            activity: None,
        };
        let options = DashboardOptions {
            show_statistics: false,
            charts: Vec::new(),
            ..Default::default()
        };
        let track = build_dashboard(&session, &options).track.unwrap();
        assert!(track.statistics.is_none());
        assert!(track.charts.is_empty());
    }

    #[test]
    fn missing_oxygen_is_a_chart_notice_not_an_error() {
        let session = Session {
            track: Some(upload("walk.tsv", TRACK.as_bytes())),
            activity: None,
        };
        let dashboard = build_dashboard(&session, &DashboardOptions::default());
        let track = dashboard.track.unwrap();
        assert!(matches!(
            track.charts.as_slice(),
            [ChartOutcome::MissingColumn { .. }]
        ));
        assert!(dashboard.notices.iter().all(|n| n.level != NoticeLevel::Error));
    }

    #[test]
    fn long_tables_are_shown_in_full() {
        let mut tsv = String::from("Datetime\tLatitude\tLongitude\n");
        for minute in 0..40 {
            tsv.push_str(&format!("01/01/2023 10:{minute:02}:00\t45.0\t7.0\n"));
        }
        let session = Session {
            track: Some(upload("long.tsv", tsv.as_bytes())),
            activity: None,
        };
        let track = build_dashboard(&session, &DashboardOptions::default())
            .track
            .unwrap();
        assert_eq!(track.table.rows.len(), 40);
        assert_eq!(track.table.total_rows, 40);
    }

    #[test]
    fn header_only_track_reports_empty_map() {
        let session = Session {
            track: Some(upload("empty.tsv", b"Datetime\tLatitude\tLongitude\n")),
            activity: None,
        };
        let track = build_dashboard(&session, &DashboardOptions::default())
            .track
            .unwrap();
        assert!(matches!(track.map, Err(ProcessError::EmptyInput(_))));
        assert!(track.statistics.is_some());
    }
}

use crate::processing::types::{
    FieldValue, MergePolicy, NormalizedRecord, RecordTable, Source,
};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// One combined row: at most one sample from each source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedRow<'a> {
    pub datetime: Option<NaiveDateTime>,
    pub track: Option<&'a NormalizedRecord>,
    pub activity: Option<&'a NormalizedRecord>,
}

impl<'a> CombinedRow<'a> {
    pub fn record(&self, source: Source) -> Option<&'a NormalizedRecord> {
        match source {
            Source::Track => self.track,
            Source::Activity => self.activity,
        }
    }
}

/// Read-only union of a GPS table and a FIT table for cross-source charts.
#[derive(Debug, Clone)]
pub struct CombinedTable<'a> {
    pub policy: MergePolicy,
    pub track: &'a RecordTable,
    pub activity: &'a RecordTable,
    pub rows: Vec<CombinedRow<'a>>,
}

impl<'a> CombinedTable<'a> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn table(&self, source: Source) -> &'a RecordTable {
        match source {
            Source::Track => self.track,
            Source::Activity => self.activity,
        }
    }

    /// Resolve a column name, preferring the GPS side when both carry it.
    pub fn locate(&self, name: &str) -> Option<(Source, usize)> {
        [Source::Track, Source::Activity]
            .into_iter()
            .find_map(|source| {
                self.table(source)
                    .columns
                    .iter()
                    .position(|column| column == name)
                    .map(|idx| (source, idx))
            })
    }

    /// Cell at (`row`, located column); `None` when the side is missing or null.
    pub fn value(&self, row: &CombinedRow<'a>, (source, idx): (Source, usize)) -> Option<&'a FieldValue> {
        row.record(source)
            .and_then(|record| record.values.get(idx))
            .and_then(Option::as_ref)
    }
}

/// Line up the two tables according to `policy`.
pub fn combine<'a>(
    track: &'a RecordTable,
    activity: &'a RecordTable,
    policy: MergePolicy,
) -> CombinedTable<'a> {
    let rows = match policy {
        MergePolicy::Concatenate => concatenate(track, activity),
        MergePolicy::OuterTimeJoin => outer_time_join(track, activity),
    };

    tracing::debug!(
        ?policy,
        track_rows = track.len(),
        activity_rows = activity.len(),
        combined_rows = rows.len(),
        "combined tables"
    );

    CombinedTable {
        policy,
        track,
        activity,
        rows,
    }
}

/// Positional pairing: row `i` takes record `i` from each side, padding the
/// shorter table with nulls. Rows are not checked for temporal agreement.
fn concatenate<'a>(track: &'a RecordTable, activity: &'a RecordTable) -> Vec<CombinedRow<'a>> {
    let len = track.len().max(activity.len());
    (0..len)
        .map(|idx| {
            let track = track.records.get(idx);
            let activity = activity.records.get(idx);
            CombinedRow {
                datetime: track
                    .and_then(|record| record.datetime)
                    .or_else(|| activity.and_then(|record| record.datetime)),
                track,
                activity,
            }
        })
        .collect()
}

/// Join on datetime equality keeping keys from both sides, sorted by time.
///
/// Duplicate keys yield every pairing of the matching records. Records with no
/// datetime cannot match and are appended unpaired, GPS first.
fn outer_time_join<'a>(track: &'a RecordTable, activity: &'a RecordTable) -> Vec<CombinedRow<'a>> {
    type Bucket<'b> = (Vec<&'b NormalizedRecord>, Vec<&'b NormalizedRecord>);
    let mut keyed: BTreeMap<NaiveDateTime, Bucket<'a>> = BTreeMap::new();
    let mut unkeyed: Vec<CombinedRow<'a>> = Vec::new();

    for record in &track.records {
        match record.datetime {
            Some(ts) => keyed.entry(ts).or_default().0.push(record),
            None => unkeyed.push(CombinedRow {
                datetime: None,
                track: Some(record),
                activity: None,
            }),
        }
    }
    for record in &activity.records {
        match record.datetime {
            Some(ts) => keyed.entry(ts).or_default().1.push(record),
            None => unkeyed.push(CombinedRow {
                datetime: None,
                track: None,
                activity: Some(record),
            }),
        }
    }

    let mut rows = Vec::with_capacity(keyed.len() + unkeyed.len());
    for (ts, (tracks, activities)) in keyed {
        let track_side: Vec<Option<&NormalizedRecord>> = if tracks.is_empty() {
            vec![None]
        } else {
            tracks.into_iter().map(Some).collect()
        };
        let activity_side: Vec<Option<&NormalizedRecord>> = if activities.is_empty() {
            vec![None]
        } else {
            activities.into_iter().map(Some).collect()
        };

        for track in &track_side {
            for activity in &activity_side {
                rows.push(CombinedRow {
                    datetime: Some(ts),
                    track: *track,
                    activity: *activity,
                });
            }
        }
    }
    rows.extend(unkeyed);
    rows
}

//! Fixture builders shared by the integration tests.

#![allow(dead_code)]

use chrono::NaiveDateTime;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z).
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

const RECORD_MESG_NUM: u16 = 20;

/// A field of a FIT `record` message, holding its raw encoded value.
#[derive(Debug, Clone, Copy)]
pub enum RecordField {
    /// Seconds since the FIT epoch.
    Timestamp(u32),
    HeartRate(u8),
    /// Semicircles.
    PositionLat(i32),
    PositionLong(i32),
    /// Raw value, `(metres + 500) * 5`.
    Altitude(u16),
}

impl RecordField {
    /// `(field number, size, base type)` as written in the definition message.
    fn definition(self) -> [u8; 3] {
        match self {
            RecordField::Timestamp(_) => [253, 4, 0x86],
            RecordField::HeartRate(_) => [3, 1, 0x02],
            RecordField::PositionLat(_) => [0, 4, 0x85],
            RecordField::PositionLong(_) => [1, 4, 0x85],
            RecordField::Altitude(_) => [2, 2, 0x84],
        }
    }

    fn encode(self, out: &mut Vec<u8>) {
        match self {
            RecordField::Timestamp(v) => out.extend_from_slice(&v.to_le_bytes()),
            RecordField::HeartRate(v) => out.push(v),
            RecordField::PositionLat(v) | RecordField::PositionLong(v) => {
                out.extend_from_slice(&v.to_le_bytes())
            }
            RecordField::Altitude(v) => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
}

/// FIT seconds for a UTC wall-clock time.
pub fn fit_seconds(datetime: NaiveDateTime) -> u32 {
    (datetime.and_utc().timestamp() - FIT_EPOCH_OFFSET) as u32
}

pub fn degrees_to_semicircles(degrees: f64) -> i32 {
    (degrees * 2_147_483_648.0 / 180.0).round() as i32
}

/// Encode a FIT file with one `record` message per entry of `records`.
///
/// Each record is preceded by its own definition message on local message 0,
/// so records may carry different field sets.
pub fn fit_file(records: &[Vec<RecordField>]) -> Vec<u8> {
    let mut data = Vec::new();
    for fields in records {
        data.push(0x40);
        data.push(0);
        data.push(0);
        data.extend_from_slice(&RECORD_MESG_NUM.to_le_bytes());
        data.push(fields.len() as u8);
        for field in fields {
            data.extend_from_slice(&field.definition());
        }

        data.push(0x00);
        for field in fields {
            field.encode(&mut data);
        }
    }

    let mut file = Vec::with_capacity(14 + data.len() + 2);
    file.push(14);
    file.push(0x20);
    file.extend_from_slice(&2132u16.to_le_bytes());
    file.extend_from_slice(&(data.len() as u32).to_le_bytes());
    file.extend_from_slice(b".FIT");
    let header_crc = fit_crc(&file);
    file.extend_from_slice(&header_crc.to_le_bytes());
    file.extend_from_slice(&data);
    let crc = fit_crc(&file);
    file.extend_from_slice(&crc.to_le_bytes());
    file
}

/// FIT CRC-16 using the nibble lookup table from the FIT SDK.
pub fn fit_crc(data: &[u8]) -> u16 {
    const CRC_TABLE: [u16; 16] = [
        0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
        0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
    ];

    data.iter().fold(0u16, |crc, byte| {
        let mut tmp = CRC_TABLE[(crc & 0xF) as usize];
        let mut crc = (crc >> 4) & 0x0FFF;
        crc ^= tmp ^ CRC_TABLE[(byte & 0xF) as usize];
        tmp = CRC_TABLE[(crc & 0xF) as usize];
        crc = (crc >> 4) & 0x0FFF;
        crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
    })
}

/// Tab-separated track with one line per `(datetime, lat, lon)` row.
pub fn track_tsv(rows: &[(&str, f64, f64)]) -> String {
    let mut tsv = String::from("Datetime\tLatitude\tLongitude\n");
    for (datetime, lat, lon) in rows {
        tsv.push_str(&format!("{datetime}\t{lat}\t{lon}\n"));
    }
    tsv
}

/// The two-point walk used throughout the tests: 10:00 -> 11:30.
pub fn sample_track() -> String {
    track_tsv(&[
        ("01/01/2023 10:00:00", 45.0, 7.0),
        ("01/01/2023 11:30:00", 45.1, 7.1),
    ])
}

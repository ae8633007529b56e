use chrono::NaiveDate;

use crate::error::{IndexError, Result};

/// One point of an index series.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IndexRecord {
    pub date: NaiveDate, // "2025-07-08"
    #[serde(serialize_with = "serialize_four_decimals")]
    pub index: f64,
    pub base_date: NaiveDate,
}

/// Rounds to 4 decimal places, the precision every published index carries.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn serialize_four_decimals<S: serde::Serializer>(value: &f64, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.4}", value))
}

/// Concatenates per-window outputs into one chronological series.
///
/// Windows are expected in base-date order with dates ascending inside each
/// window. Any date that does not strictly follow its predecessor means two
/// windows overlap.
///
/// # Errors
/// * `OverlappingWindows` with the first offending date.
pub fn assemble(windows: Vec<Vec<IndexRecord>>) -> Result<Vec<IndexRecord>> {
    let mut series: Vec<IndexRecord> = Vec::with_capacity(windows.iter().map(Vec::len).sum());

    for records in windows {
        for record in records {
            if let Some(previous) = series.last() {
                if record.date <= previous.date {
                    return Err(IndexError::OverlappingWindows(record.date));
                }
            }
            series.push(record);
        }
    }

    Ok(series)
}

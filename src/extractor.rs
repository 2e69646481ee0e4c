//! Raw-record extraction from one decoded collection.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::constants::extractor::PROGRESS_INTERVAL_MS;
use crate::record::RawRecord;
use crate::types::{FileName, RawRow};

/// Result of extracting one raw collection.
#[derive(Clone, Debug, Default)]
pub struct DayHarvest {
    /// Valid records, empty when only identity keys were requested.
    pub records: Vec<RawRecord>,
    /// Identity keys of every valid record, regardless of `only_indexes`.
    pub keys: HashSet<FileName>,
}

/// Extract validated records and identity keys from decoded rows.
///
/// Invalid rows contribute to neither output. Valid rows always contribute
/// their identity key; the full record is kept unless `only_indexes` is set
/// (next-window extraction needs identity only). `cap` bounds the number of
/// examined input rows, not extracted ones.
pub fn extract_raw(
    rows: impl IntoIterator<Item = RawRow>,
    only_indexes: bool,
    cap: Option<usize>,
) -> DayHarvest {
    let mut harvest = DayHarvest::default();
    let report_every = Duration::from_millis(PROGRESS_INTERVAL_MS);
    let extraction_start = Instant::now();
    let mut last_report = extraction_start;
    let mut last_examined = 0usize;
    let mut examined = 0usize;
    let mut extracted = 0usize;

    for row in rows {
        examined += 1;
        if let Some(record) = RawRecord::from_row(&row) {
            extracted += 1;
            harvest.keys.insert(record.file_name.clone());
            if !only_indexes {
                harvest.records.push(record);
            }
        }
        if cap.is_some_and(|cap| examined >= cap) {
            break;
        }
        if last_report.elapsed() >= report_every {
            let rate = (examined - last_examined) as f64 / last_report.elapsed().as_secs_f64();
            debug!(examined, extracted, rate, "extraction progress");
            last_examined = examined;
            last_report = Instant::now();
        }
    }

    debug!(
        examined,
        extracted,
        elapsed_ms = extraction_start.elapsed().as_millis(),
        "extraction done"
    );
    harvest
}

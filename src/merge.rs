//! Window-level merging and key-based record aggregation.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::errors::ExtractError;
use crate::extractor::DayHarvest;
use crate::record::{merge, RawRecord, WindowRecord};
use crate::support::SupportTable;
use crate::types::FileName;

/// Combine per-day extraction results into one window dataset.
///
/// Records are concatenated in window order (deterministic); the two key
/// sets are unions of the per-day key sets. The window/next-window
/// intersection is left to aggregation, which needs full records.
pub fn merge_days(
    window_days: Vec<DayHarvest>,
    next_window_days: Vec<DayHarvest>,
) -> (Vec<RawRecord>, HashSet<FileName>, HashSet<FileName>) {
    let mut records = Vec::new();
    let mut window_keys = HashSet::new();
    for day in window_days {
        records.extend(day.records);
        window_keys.extend(day.keys);
    }
    let mut next_window_keys = HashSet::new();
    for day in next_window_days {
        next_window_keys.extend(day.keys);
    }
    (records, window_keys, next_window_keys)
}

/// Merge raw records by identity key and tag next-window recurrence.
///
/// The first occurrence of a key creates its `WindowRecord`; later
/// occurrences fold in through the pure merge function. Keys found in
/// `next_window_keys` are marked as recurring (idempotent). When a support
/// table is supplied, every categorical feature is registered under the
/// `features` domain. The returned map preserves first-seen order.
pub fn aggregate(
    records: &[RawRecord],
    next_window_keys: &HashSet<FileName>,
    mut support: Option<&mut SupportTable>,
) -> Result<IndexMap<FileName, WindowRecord>, ExtractError> {
    let mut merged: IndexMap<FileName, WindowRecord> = IndexMap::new();
    for raw in records {
        if raw.file_name.is_empty() {
            return Err(ExtractError::MissingIdentity);
        }
        let mut incoming = WindowRecord::from_raw(raw);
        incoming.recurs_in_next_window = next_window_keys.contains(&raw.file_name);
        match merged.get_mut(&raw.file_name) {
            Some(existing) => *existing = merge(existing, &incoming),
            None => {
                merged.insert(raw.file_name.clone(), incoming);
            }
        }
        if let Some(table) = support.as_deref_mut() {
            for (feature, value) in raw.features() {
                table.insert(crate::constants::support::FEATURES_DOMAIN, feature, value)?;
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn raw(name: &str, site: &str, accesses: u64) -> RawRecord {
        RawRecord {
            file_name: name.to_string(),
            site_name: site.to_string(),
            process: "analysis".to_string(),
            file_type: "MINIAOD".to_string(),
            num_accesses: accesses,
        }
    }

    fn harvest(records: Vec<RawRecord>) -> DayHarvest {
        let keys = records.iter().map(|r| r.file_name.clone()).collect();
        DayHarvest { records, keys }
    }

    #[test]
    fn merge_days_concatenates_in_window_order_and_unions_keys() {
        let day1 = harvest(vec![raw("/store/f1.root", "T2_IT_Bari", 1)]);
        let day2 = harvest(vec![raw("/store/f2.root", "T1_US_FNAL", 1)]);
        let next = harvest(vec![raw("/store/f1.root", "T2_IT_Bari", 1)]);

        let (records, window_keys, next_keys) = merge_days(vec![day1, day2], vec![next]);
        assert_eq!(records[0].file_name, "/store/f1.root");
        assert_eq!(records[1].file_name, "/store/f2.root");
        assert_eq!(window_keys.len(), 2);
        assert_eq!(next_keys.len(), 1);
    }

    #[test]
    fn disjoint_windows_share_no_recurring_keys() {
        let (records, window_keys, next_keys) = merge_days(
            vec![harvest(vec![raw("/store/f1.root", "T2_IT_Bari", 1)])],
            vec![harvest(vec![raw("/store/f9.root", "T2_IT_Bari", 1)])],
        );
        let merged = aggregate(&records, &next_keys, None).unwrap();
        assert!(window_keys.is_disjoint(&next_keys));
        assert!(!merged["/store/f1.root"].recurs_in_next_window);
    }

    #[test]
    fn aggregate_merges_by_key_and_tags_recurrence() {
        let records = vec![
            raw("/store/f1.root", "T2_IT_Bari", 2),
            raw("/store/f2.root", "T1_US_FNAL", 1),
            raw("/store/f1.root", "T2_DE_DESY", 3),
        ];
        let next_keys: HashSet<FileName> = ["/store/f1.root".to_string()].into();

        let merged = aggregate(&records, &next_keys, None).unwrap();
        assert_eq!(merged.len(), 2);

        let f1 = &merged["/store/f1.root"];
        assert_eq!(f1.tot_requests, 2);
        assert_eq!(f1.num_accesses, 5);
        assert_eq!(f1.features["site_name"], "T2_DE_DESY");
        assert!(f1.recurs_in_next_window);
        assert!(!merged["/store/f2.root"].recurs_in_next_window);

        // First-seen order is preserved for deterministic serialization.
        let order: Vec<&FileName> = merged.keys().collect();
        assert_eq!(order, ["/store/f1.root", "/store/f2.root"]);
    }

    #[test]
    fn aggregate_counters_are_order_insensitive() {
        let records = vec![
            raw("/store/f1.root", "T2_IT_Bari", 2),
            raw("/store/f1.root", "T2_DE_DESY", 3),
            raw("/store/f2.root", "T1_US_FNAL", 1),
            raw("/store/f1.root", "T2_FR_IN2P3", 4),
        ];
        let next_keys = HashSet::new();
        let baseline = aggregate(&records, &next_keys, None).unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..3 {
            let mut shuffled = records.clone();
            shuffled.shuffle(&mut rng);
            let merged = aggregate(&shuffled, &next_keys, None).unwrap();
            for (key, record) in &baseline {
                assert_eq!(merged[key].tot_requests, record.tot_requests);
                assert_eq!(merged[key].num_accesses, record.num_accesses);
            }
        }
    }

    #[test]
    fn aggregate_registers_features_in_support_table() {
        let records = vec![
            raw("/store/f1.root", "T2_IT_Bari", 1),
            raw("/store/f1.root", "T2_IT_Bari", 1),
        ];
        let mut table = SupportTable::new();
        aggregate(&records, &HashSet::new(), Some(&mut table)).unwrap();
        table.gen_indexes().unwrap();
        // Idempotent insert: the duplicate rows add nothing new.
        assert_eq!(
            table.get_sorted_keys("features"),
            vec!["file_type", "process", "site_name"]
        );
    }

    #[test]
    fn empty_identity_key_is_fatal() {
        let records = vec![raw("", "T2_IT_Bari", 1)];
        assert!(matches!(
            aggregate(&records, &HashSet::new(), None),
            Err(ExtractError::MissingIdentity)
        ));
    }
}

use chrono::NaiveDate;

use crate::constants::extractor::DEFAULT_RECORD_CAP;

/// Top-level extraction configuration.
#[derive(Clone, Debug)]
pub struct DatasetConfig {
    /// First day of the observation window.
    pub start_date: NaiveDate,
    /// Number of days covered by the window (and by the next window).
    pub window_size: u32,
    /// Days between consecutive extracted days within the window.
    pub stride: u32,
    /// Maximum number of concurrently running extraction tasks.
    pub worker_budget: usize,
    /// Whether to build the categorical-feature support table.
    pub extract_support_tables: bool,
    /// Cap on examined rows per raw collection; `None` disables the cap.
    pub record_cap: Option<usize>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2018, 1, 1).expect("valid default date"),
            window_size: 7,
            stride: 1,
            worker_budget: 4,
            extract_support_tables: true,
            record_cap: Some(DEFAULT_RECORD_CAP),
        }
    }
}

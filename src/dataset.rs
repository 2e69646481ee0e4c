//! Windowed extraction orchestration and dataset serialization.

use std::collections::HashSet;
use std::io::Write;
use std::time::Instant;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DatasetConfig;
use crate::constants::support::{FEATURES_DOMAIN, PROCESS_FEATURE};
use crate::errors::ExtractError;
use crate::extractor::{extract_raw, DayHarvest};
use crate::merge::{aggregate, merge_days};
use crate::record::{RawRecord, WindowRecord};
use crate::runner::{run_tasks, ExtractionTask};
use crate::source::{ResourceProvider, RowDecoder};
use crate::support::{process_family, SupportTable};
use crate::types::FileName;
use crate::window::{gen_window_dates, DateTriple};

/// Timing and size figures for one extraction run.
#[derive(Clone, Copy, Debug)]
pub struct ExtractStats {
    /// Number of aggregated window records.
    pub record_count: usize,
    /// Wall-clock extraction time in seconds.
    pub extraction_secs: f64,
}

/// Aggregated output of one window extraction.
#[derive(Debug)]
pub struct WindowExtract {
    /// Window records keyed by identity, in first-seen order.
    pub records: IndexMap<FileName, WindowRecord>,
    /// Finalized support table, when extraction was asked to build one.
    pub support: Option<SupportTable>,
    /// Run statistics carried into the dataset metadata header.
    pub stats: ExtractStats,
}

/// Metadata header written ahead of the serialized records.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DatasetMetadata {
    /// First day of the observation window.
    pub start_date: NaiveDate,
    /// Window length in days.
    pub window_size: u32,
    /// Serialized support tables, or `false` when disabled.
    pub support_tables: serde_json::Value,
    /// Number of records that follow the header.
    pub record_count: usize,
    /// Wall-clock extraction time in seconds.
    pub extraction_time_seconds: f64,
}

/// Windowed extraction pipeline over one resource provider and decoder.
pub struct WindowDataset<P: ResourceProvider, D: RowDecoder> {
    provider: P,
    decoder: D,
    config: DatasetConfig,
}

impl<P: ResourceProvider, D: RowDecoder> WindowDataset<P, D> {
    /// Build a pipeline from explicitly owned collaborators.
    pub fn new(provider: P, decoder: D, config: DatasetConfig) -> Self {
        Self {
            provider,
            decoder,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    fn windows(&self) -> Result<(Vec<DateTriple>, Vec<DateTriple>), ExtractError> {
        let window = gen_window_dates(
            self.config.start_date,
            self.config.window_size,
            self.config.stride,
            false,
        )?;
        let next_window = gen_window_dates(
            self.config.start_date,
            self.config.window_size,
            self.config.stride,
            true,
        )?;
        Ok((window, next_window))
    }

    /// Extract one day's raw collections into a single harvest.
    fn extract_day(&self, day: DateTriple, only_indexes: bool) -> Result<DayHarvest, ExtractError> {
        let mut combined = DayHarvest::default();
        for object in self.provider.list_day(day)? {
            let bytes =
                self.provider
                    .open(&object)
                    .map_err(|err| ExtractError::ResourceUnavailable {
                        day,
                        reason: err.to_string(),
                    })?;
            let rows =
                self.decoder
                    .decode(&bytes)
                    .map_err(|err| ExtractError::ResourceUnavailable {
                        day,
                        reason: format!("'{}': {err}", object.path),
                    })?;
            let harvest = extract_raw(rows, only_indexes, self.config.record_cap);
            combined.records.extend(harvest.records);
            combined.keys.extend(harvest.keys);
        }
        Ok(combined)
    }

    /// Extract the window sequentially, one day at a time.
    ///
    /// The current window is extracted in full; the next window contributes
    /// identity keys only. A day whose raw data cannot be listed or opened
    /// aborts the whole run.
    pub fn extract(&self) -> Result<WindowExtract, ExtractError> {
        let started = Instant::now();
        let (window, next_window) = self.windows()?;

        let mut window_days = Vec::with_capacity(window.len());
        for day in window {
            debug!(%day, "extracting window day");
            window_days.push(self.extract_day(day, false)?);
        }
        let mut next_window_days = Vec::with_capacity(next_window.len());
        for day in next_window {
            debug!(%day, "extracting next-window day");
            next_window_days.push(self.extract_day(day, true)?);
        }

        let (records, _window_keys, next_window_keys) = merge_days(window_days, next_window_days);
        self.finalize(records, next_window_keys, started)
    }

    /// Extract the window across a bounded worker pool.
    ///
    /// Produces the same aggregated result as `extract` regardless of worker
    /// completion order. Any failed task aborts the run with a descriptive
    /// error; no partial dataset survives.
    pub fn extract_parallel(&self) -> Result<WindowExtract, ExtractError> {
        let started = Instant::now();
        let (window, next_window) = self.windows()?;

        let mut tasks = Vec::new();
        for day in window {
            for object in self.provider.list_day(day)? {
                tasks.push(ExtractionTask {
                    day,
                    object,
                    only_indexes: false,
                });
            }
        }
        for day in next_window {
            for object in self.provider.list_day(day)? {
                tasks.push(ExtractionTask {
                    day,
                    object,
                    only_indexes: true,
                });
            }
        }

        let total = tasks.len();
        let harvest = run_tasks(
            &self.provider,
            &self.decoder,
            tasks,
            self.config.worker_budget,
            self.config.record_cap,
        );
        if !harvest.failures.is_empty() {
            let first = &harvest.failures[0];
            return Err(ExtractError::TasksFailed {
                failed: harvest.failures.len(),
                total,
                first: format!("{} '{}': {}", first.day, first.object.path, first.reason),
            });
        }
        self.finalize(harvest.records, harvest.next_window_keys, started)
    }

    fn finalize(
        &self,
        records: Vec<RawRecord>,
        next_window_keys: HashSet<FileName>,
        started: Instant,
    ) -> Result<WindowExtract, ExtractError> {
        let mut support = self
            .config
            .extract_support_tables
            .then(SupportTable::new);
        let merged = aggregate(&records, &next_window_keys, support.as_mut())?;
        if let Some(table) = support.as_mut() {
            table.reduce_categories(FEATURES_DOMAIN, PROCESS_FEATURE, process_family)?;
            table.gen_indexes()?;
        }
        let stats = ExtractStats {
            record_count: merged.len(),
            extraction_secs: started.elapsed().as_secs_f64(),
        };
        info!(
            record_count = stats.record_count,
            extraction_secs = stats.extraction_secs,
            "window extraction finished"
        );
        Ok(WindowExtract {
            records: merged,
            support,
            stats,
        })
    }

    /// Serialize an extraction: metadata header, then one record per line.
    ///
    /// Records are written in aggregator iteration order, each carrying its
    /// encoded feature tensor when a support table is present.
    pub fn save<W: Write>(&self, extract: &WindowExtract, out: &mut W) -> Result<(), ExtractError> {
        let metadata = DatasetMetadata {
            start_date: self.config.start_date,
            window_size: self.config.window_size,
            support_tables: extract
                .support
                .as_ref()
                .map(|table| table.to_dict())
                .unwrap_or(serde_json::Value::Bool(false)),
            record_count: extract.records.len(),
            extraction_time_seconds: extract.stats.extraction_secs,
        };
        write_line(out, &metadata)?;

        let sorted_features = extract
            .support
            .as_ref()
            .map(|table| table.get_sorted_keys(FEATURES_DOMAIN));
        for record in extract.records.values() {
            match (&extract.support, &sorted_features) {
                (Some(table), Some(features)) => {
                    let mut tensor = Vec::with_capacity(features.len());
                    for feature in features {
                        let value = record
                            .features
                            .get(feature)
                            .map(String::as_str)
                            .unwrap_or_default();
                        tensor.push(f64::from(table.get_close_value(
                            FEATURES_DOMAIN,
                            feature,
                            value,
                        )?));
                    }
                    write_line(out, &record.clone().with_tensor(tensor))?;
                }
                _ => write_line(out, record)?,
            }
        }
        Ok(())
    }

    /// Conventional output file name for this configuration.
    pub fn default_outfile_name(&self) -> String {
        format!(
            "popularity_{}_{}.jsonl",
            self.config.start_date.format("%Y-%m-%d"),
            self.config.window_size
        )
    }
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> Result<(), ExtractError> {
    serde_json::to_writer(&mut *out, value)
        .map_err(|err| ExtractError::Decode(err.to_string()))?;
    out.write_all(b"\n")?;
    Ok(())
}

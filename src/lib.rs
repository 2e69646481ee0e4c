#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Extraction configuration types.
pub mod config;
/// Centralized constants used across extraction, encoding, and providers.
pub mod constants;
/// Windowed extraction orchestration and dataset serialization.
pub mod dataset;
/// Raw-record extraction from decoded collections.
pub mod extractor;
/// Window-level merging and key-based record aggregation.
pub mod merge;
/// Raw and aggregated record types.
pub mod record;
/// Bounded-concurrency extraction task runner.
pub mod runner;
/// Optional publishing sinks (indexing services).
#[cfg(feature = "elastic")]
pub mod sink;
/// Resource provider traits and built-in backends.
pub mod source;
/// Categorical-feature support table.
pub mod support;
/// Shared type aliases.
pub mod types;
/// Date-window generation.
pub mod window;

mod errors;

pub use config::DatasetConfig;
pub use dataset::{DatasetMetadata, ExtractStats, WindowDataset, WindowExtract};
pub use errors::ExtractError;
pub use extractor::{extract_raw, DayHarvest};
pub use merge::{aggregate, merge_days};
pub use record::{merge, RawRecord, WindowRecord};
pub use runner::{run_tasks, ExtractionTask, TaskFailure, TaskHarvest};
#[cfg(feature = "elastic")]
pub use sink::BulkIndexSink;
#[cfg(feature = "httpfs")]
pub use source::{HttpFsConfig, HttpFsProvider};
pub use source::{
    InMemoryProvider, JsonLinesDecoder, LocalDayProvider, ObjectDescriptor, ResourceProvider,
    ResourceSpec, RowDecoder,
};
pub use support::{process_family, SupportTable, TableState};
pub use types::{CategoryCode, CategoryValue, DomainName, FeatureName, FileName, RawRow};
pub use window::{gen_window_dates, DateTriple};

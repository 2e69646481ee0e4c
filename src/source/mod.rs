//! Resource provider interfaces and built-in backends.
//!
//! Ownership model:
//! - `ResourceProvider` lists and opens per-day raw objects; the extraction
//!   core consumes it and never assumes a specific transport.
//! - `RowDecoder` turns one raw byte blob into rows; the on-disk binary
//!   schema stays behind this seam.
//! - `ResourceSpec` is the closed set of built-in backends; the backend is
//!   chosen once at construction and never re-inspected.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Deserializer;

use crate::errors::ExtractError;
use crate::types::RawRow;
use crate::window::DateTriple;

/// Local filesystem backend.
pub mod local;
pub use local::LocalDayProvider;

#[cfg(feature = "httpfs")]
/// Hadoop HttpFS REST gateway backend.
pub mod httpfs;
#[cfg(feature = "httpfs")]
pub use httpfs::{HttpFsConfig, HttpFsProvider};

/// Handle naming one raw-data object on the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectDescriptor {
    /// Backend-specific path of the object.
    pub path: String,
}

impl ObjectDescriptor {
    /// Wrap a backend path.
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// Read-only access to per-day raw-data objects.
///
/// Providers are treated as externally rate-limited; the core implements no
/// retries or backpressure toward them.
pub trait ResourceProvider: Send + Sync {
    /// List the raw objects available for `day`. An empty list is a valid
    /// answer (no data that day); a listing failure is fatal for the run.
    fn list_day(&self, day: DateTriple) -> Result<Vec<ObjectDescriptor>, ExtractError>;
    /// Fetch the full contents of one object. An object that cannot be
    /// fetched surfaces as [`ExtractError::ObjectUnavailable`].
    fn open(&self, object: &ObjectDescriptor) -> Result<Vec<u8>, ExtractError>;
}

/// Decodes one raw byte blob into rows.
pub trait RowDecoder: Send + Sync {
    /// Decode `bytes` into the rows it contains.
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>, ExtractError>;
}

/// Reference decoder for JSON-lines blobs (one JSON object per line).
pub struct JsonLinesDecoder;

impl RowDecoder for JsonLinesDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Vec<RawRow>, ExtractError> {
        Deserializer::from_slice(bytes)
            .into_iter::<RawRow>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| ExtractError::Decode(err.to_string()))
    }
}

/// Closed set of built-in resource backends.
///
/// Selection happens exactly once, in `into_provider`; nothing downstream
/// re-inspects which backend is active.
#[derive(Clone, Debug)]
pub enum ResourceSpec {
    /// Day-partitioned folders under a local root.
    Local {
        /// Root folder holding `year=Y/month=M/day=D` partitions.
        folder: String,
    },
    /// Hadoop HttpFS REST gateway.
    #[cfg(feature = "httpfs")]
    HttpFs(HttpFsConfig),
}

impl ResourceSpec {
    /// Construct the provider for this backend.
    pub fn into_provider(self) -> Result<Arc<dyn ResourceProvider>, ExtractError> {
        match self {
            Self::Local { folder } => Ok(Arc::new(LocalDayProvider::new(folder))),
            #[cfg(feature = "httpfs")]
            Self::HttpFs(config) => Ok(Arc::new(HttpFsProvider::new(config)?)),
        }
    }
}

/// In-memory provider with scripted per-day blobs, for tests and small runs.
pub struct InMemoryProvider {
    days: HashMap<DateTriple, Vec<(ObjectDescriptor, Vec<u8>)>>,
}

impl InMemoryProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self {
            days: HashMap::new(),
        }
    }

    /// Register one raw blob for `day`.
    pub fn add_object(&mut self, day: DateTriple, path: impl Into<String>, bytes: Vec<u8>) {
        self.days
            .entry(day)
            .or_default()
            .push((ObjectDescriptor::new(path), bytes));
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceProvider for InMemoryProvider {
    fn list_day(&self, day: DateTriple) -> Result<Vec<ObjectDescriptor>, ExtractError> {
        Ok(self
            .days
            .get(&day)
            .map(|objects| {
                objects
                    .iter()
                    .map(|(descriptor, _)| descriptor.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    fn open(&self, object: &ObjectDescriptor) -> Result<Vec<u8>, ExtractError> {
        self.days
            .values()
            .flatten()
            .find(|(descriptor, _)| descriptor == object)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| ExtractError::ObjectUnavailable {
                path: object.path.clone(),
                reason: "not registered".into(),
            })
    }
}

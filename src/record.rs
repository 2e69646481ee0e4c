use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::fields;
use crate::types::{CategoryValue, FeatureName, FileName, RawRow};

/// One validated file-access observation for a single day.
///
/// Immutable once constructed; rows that fail validation never become a
/// `RawRecord`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Identity key: the logical file name.
    pub file_name: FileName,
    /// Site at which the access happened.
    pub site_name: CategoryValue,
    /// Name of the process that read the file.
    pub process: CategoryValue,
    /// Data-tier/file-type label.
    pub file_type: CategoryValue,
    /// Accesses reported by this row.
    pub num_accesses: u64,
}

impl RawRecord {
    /// Validate one decoded row into a record.
    ///
    /// Returns `None` when the identity key or any categorical field is
    /// missing or empty; such rows are skipped at extraction time.
    pub fn from_row(row: &RawRow) -> Option<Self> {
        let file_name = non_empty_str(row, fields::FILE_NAME)?;
        let site_name = non_empty_str(row, fields::SITE_NAME)?;
        let process = non_empty_str(row, fields::PROCESS)?;
        let file_type = non_empty_str(row, fields::FILE_TYPE)?;
        let num_accesses = row
            .get(fields::NUM_ACCESSES)
            .and_then(|value| value.as_u64())
            .unwrap_or(1);
        Some(Self {
            file_name,
            site_name,
            process,
            file_type,
            num_accesses,
        })
    }

    /// Categorical feature name/value pairs carried by this record.
    pub fn features(&self) -> [(&'static str, &str); 3] {
        [
            ("site_name", self.site_name.as_str()),
            ("process", self.process.as_str()),
            ("file_type", self.file_type.as_str()),
        ]
    }
}

fn non_empty_str(row: &RawRow, field: &str) -> Option<String> {
    row.get(field)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Accumulation of every `RawRecord` sharing an identity key in one window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Identity key shared by all merged rows.
    pub file_name: FileName,
    /// Number of raw rows merged into this record (summed on merge).
    pub tot_requests: u64,
    /// Total accesses across merged rows (summed on merge).
    pub num_accesses: u64,
    /// Categorical features; on merge the most recent row wins per field.
    pub features: IndexMap<FeatureName, CategoryValue>,
    /// Whether the identity key also appears in the next window.
    pub recurs_in_next_window: bool,
    /// Encoded feature tensor, attached once at serialization time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tensor: Option<Vec<f64>>,
}

impl WindowRecord {
    /// Build the initial window record for a raw observation.
    pub fn from_raw(raw: &RawRecord) -> Self {
        let mut features = IndexMap::new();
        for (name, value) in raw.features() {
            features.insert(name.to_string(), value.to_string());
        }
        Self {
            file_name: raw.file_name.clone(),
            tot_requests: 1,
            num_accesses: raw.num_accesses,
            features,
            recurs_in_next_window: false,
            tensor: None,
        }
    }

    /// Attach the encoded feature tensor (serialization step).
    pub fn with_tensor(mut self, tensor: Vec<f64>) -> Self {
        self.tensor = Some(tensor);
        self
    }
}

/// Pure merge of two window records sharing an identity key.
///
/// Counters (`tot_requests`, `num_accesses`) sum; categorical features take
/// the right operand (most recent wins); recurrence flags OR. Counter merging
/// is associative and commutative, which keeps aggregation order-insensitive.
pub fn merge(a: &WindowRecord, b: &WindowRecord) -> WindowRecord {
    let mut features = a.features.clone();
    for (name, value) in &b.features {
        features.insert(name.clone(), value.clone());
    }
    WindowRecord {
        file_name: a.file_name.clone(),
        tot_requests: a.tot_requests + b.tot_requests,
        num_accesses: a.num_accesses + b.num_accesses,
        features,
        recurs_in_next_window: a.recurs_in_next_window || b.recurs_in_next_window,
        tensor: None,
    }
}

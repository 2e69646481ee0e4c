use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::errors::ExtractError;
use crate::source::{ObjectDescriptor, ResourceProvider};
use crate::window::DateTriple;

/// Provider over day-partitioned local folders.
///
/// Expects the layout `root/year=Y/month=M/day=D/part-*` where each `part-*`
/// file is one raw collection. A missing day folder lists as empty rather
/// than erroring, so sparse local mirrors stay usable.
pub struct LocalDayProvider {
    root: PathBuf,
}

impl LocalDayProvider {
    /// Create a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn day_dir(&self, day: DateTriple) -> PathBuf {
        self.root
            .join(format!("year={}", day.year))
            .join(format!("month={}", day.month))
            .join(format!("day={}", day.day))
    }
}

impl ResourceProvider for LocalDayProvider {
    fn list_day(&self, day: DateTriple) -> Result<Vec<ObjectDescriptor>, ExtractError> {
        let dir = self.day_dir(day);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut objects = Vec::new();
        for entry in WalkDir::new(&dir).max_depth(1) {
            let entry = entry.map_err(|err| ExtractError::ResourceUnavailable {
                day,
                reason: err.to_string(),
            })?;
            if entry.file_type().is_file() && is_part_file(entry.path()) {
                objects.push(ObjectDescriptor::new(entry.path().to_string_lossy()));
            }
        }
        // Deterministic listing order regardless of directory iteration.
        objects.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(objects)
    }

    fn open(&self, object: &ObjectDescriptor) -> Result<Vec<u8>, ExtractError> {
        fs::read(&object.path).map_err(|err| ExtractError::ObjectUnavailable {
            path: object.path.clone(),
            reason: err.to_string(),
        })
    }
}

fn is_part_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with("part-"))
        .unwrap_or(false)
}

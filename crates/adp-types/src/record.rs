//! Record and sink summary types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use serde_json::Value;

/// One self-describing unit of data flowing through a pipeline.
///
/// Field order is preserved in insertion order. Records in one run need not
/// share a schema.
pub type Record = serde_json::Map<String, Value>;

/// Outcome of a successful sink write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteSummary {
    /// Number of records durably written.
    pub count: u64,
    /// Artifacts produced under the output directory.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathBuf>,
}

impl WriteSummary {
    #[must_use]
    pub fn new(count: u64) -> Self {
        Self {
            count,
            paths: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }
}

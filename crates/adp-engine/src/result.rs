//! Pipeline execution result types.

use std::path::PathBuf;

use adp_types::{PipelineId, PluginName, StageRef, StateBlob};
use serde::Serialize;

use crate::bind::StageDescriptor;

/// Records that left one stage during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutcome {
    pub stage: StageRef,
    pub plugin: PluginName,
    /// Records the stage emitted; for the sink, records it consumed.
    pub records: u64,
}

/// Result of a successful pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pipeline: PipelineId,
    pub source: PluginName,
    pub stages: Vec<StageOutcome>,
    pub records_read: u64,
    /// Count reported by the sink.
    pub records_written: u64,
    pub paths: Vec<PathBuf>,
    /// State the source returned for this run, if any.
    pub state: Option<StateBlob>,
    /// Whether `state` was persisted.
    pub state_advanced: bool,
    pub duration_secs: f64,
}

/// Result of a pipeline check: everything bound, no stage code ran.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub pipeline: PipelineId,
    pub stages: Vec<StageDescriptor>,
    pub outdir: PathBuf,
    pub state_ok: bool,
}

//! State backend trait definition.
//!
//! [`StateBackend`] defines the storage contract for per-source incremental
//! state and run history. Model types live in [`adp_types::state`].

use adp_types::{PipelineId, PluginName, RunStats, RunStatus, StateBlob, StateEntry};

use crate::error;

/// Storage contract for incremental pipeline state.
///
/// Implementations must be `Send + Sync` for use behind `Arc<dyn StateBackend>`
/// and must not corrupt concurrent writes to different keys. Concurrent
/// read-modify-write of the same key is not coordinated.
pub trait StateBackend: Send + Sync {
    /// Read the stored entry for a (pipeline, source) pair.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet; a first run
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn load_entry(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
    ) -> error::Result<Option<StateEntry>>;

    /// Read just the blob for a (pipeline, source) pair.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn load(&self, pipeline: &PipelineId, source: &PluginName) -> error::Result<Option<StateBlob>> {
        Ok(self.load_entry(pipeline, source)?.map(|entry| entry.blob))
    }

    /// Overwrite the blob for a (pipeline, source) pair. No history is kept.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn save(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
        blob: &StateBlob,
    ) -> error::Result<()>;

    /// Begin a run, returning its unique ID.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn start_run(&self, pipeline: &PipelineId, source: &PluginName) -> error::Result<i64>;

    /// Finalize a run with status and aggregate stats.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`](crate::error::StateError) on storage failure.
    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()>;
}

//! Incremental state hand-off between the store and the source.

use adp_state::{StateBackend, StateError};
use adp_types::{PipelineId, PluginName, StateBlob};

/// Load the state to hand to the source.
///
/// A stored blob whose schema version differs from `expected_version` is
/// withheld: the source starts from scratch and the stale blob stays in the
/// store until a successful run replaces it.
pub(crate) fn load_incoming(
    state_backend: &dyn StateBackend,
    pipeline: &PipelineId,
    source: &PluginName,
    expected_version: u32,
) -> Result<Option<StateBlob>, StateError> {
    let Some(entry) = state_backend.load_entry(pipeline, source)? else {
        tracing::debug!(
            pipeline = pipeline.as_str(),
            source = source.as_str(),
            "No stored state, first run"
        );
        return Ok(None);
    };

    if entry.blob.version != expected_version {
        tracing::warn!(
            pipeline = pipeline.as_str(),
            source = source.as_str(),
            stored_version = entry.blob.version,
            expected_version,
            updated_at = entry.updated_at.as_str(),
            "Ignoring stored state with a different schema version"
        );
        return Ok(None);
    }

    tracing::debug!(
        pipeline = pipeline.as_str(),
        source = source.as_str(),
        updated_at = entry.updated_at.as_str(),
        "Loaded incremental state"
    );
    Ok(Some(entry.blob))
}

/// Persist the state returned by the source. Call only after the sink has
/// durably written the run's records. Returns whether anything was written.
pub(crate) fn commit_state(
    state_backend: &dyn StateBackend,
    pipeline: &PipelineId,
    source: &PluginName,
    outgoing: Option<&StateBlob>,
) -> Result<bool, StateError> {
    let Some(blob) = outgoing else {
        tracing::debug!(
            pipeline = pipeline.as_str(),
            source = source.as_str(),
            "Source returned no state, store left untouched"
        );
        return Ok(false);
    };
    state_backend.save(pipeline, source, blob)?;
    tracing::info!(
        pipeline = pipeline.as_str(),
        source = source.as_str(),
        version = blob.version,
        "State advanced after sink confirmed write"
    );
    Ok(true)
}

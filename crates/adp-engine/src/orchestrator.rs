//! Load → bind → run entry points used by the CLI.

use crate::bind::bind;
use crate::config::PipelineSpec;
use crate::errors::PipelineError;
use crate::registry::PluginRegistry;
use crate::resolve;
use crate::result::{CheckResult, RunSummary};

/// Bind `spec`, open its state store and run it once.
///
/// Binding happens first, so an unresolvable pipeline fails before the
/// state store is touched.
///
/// # Errors
///
/// Returns a bind, state store, or stage error.
pub fn run_pipeline(
    spec: &PipelineSpec,
    registry: &PluginRegistry,
) -> Result<RunSummary, PipelineError> {
    let mut bound = bind(spec, registry)?;
    let state = resolve::create_state_backend(&spec.state)?;
    bound.run(state.as_ref())
}

/// Bind `spec` and verify its state store opens. No stage code runs beyond
/// plugin construction.
///
/// # Errors
///
/// Returns the bind error if any stage cannot be resolved or constructed.
pub fn check_pipeline(
    spec: &PipelineSpec,
    registry: &PluginRegistry,
) -> Result<CheckResult, PipelineError> {
    let bound = bind(spec, registry)?;
    let state_ok = resolve::check_state_backend(&spec.state);
    Ok(CheckResult {
        pipeline: bound.name().clone(),
        stages: bound.stages(),
        outdir: bound.outdir().to_path_buf(),
        state_ok,
    })
}

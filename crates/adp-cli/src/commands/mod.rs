pub mod check;
pub mod plugins;
pub mod run;
pub mod state;

use std::path::Path;

use adp_engine::{load_pipeline, PipelineSpec, PluginRegistry};
use anyhow::{Context, Result};

/// Registry holding every built-in plugin.
pub(crate) fn registry() -> Result<PluginRegistry> {
    PluginRegistry::with_bundles(adp_plugins::BUNDLES)
        .context("Failed to register built-in plugins")
}

pub(crate) fn load(pipeline_path: &Path) -> Result<PipelineSpec> {
    load_pipeline(pipeline_path)
        .with_context(|| format!("Failed to load pipeline: {}", pipeline_path.display()))
}

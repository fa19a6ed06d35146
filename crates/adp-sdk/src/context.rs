//! Stage execution context.
//!
//! `StageContext` bundles the pipeline identity and the directories a stage
//! may touch, so plugins never need access to the full pipeline document.

use std::path::{Path, PathBuf};

use adp_types::{PipelineId, PluginName, StageRef};

/// Context handed to every stage invocation.
#[derive(Debug, Clone)]
pub struct StageContext {
    pipeline: PipelineId,
    stage: StageRef,
    plugin: PluginName,
    outdir: PathBuf,
    workdir: PathBuf,
}

impl StageContext {
    pub fn new(
        pipeline: PipelineId,
        stage: StageRef,
        plugin: PluginName,
        outdir: impl Into<PathBuf>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pipeline,
            stage,
            plugin,
            outdir: outdir.into(),
            workdir: workdir.into(),
        }
    }

    pub fn pipeline(&self) -> &PipelineId {
        &self.pipeline
    }

    pub fn stage(&self) -> StageRef {
        self.stage
    }

    pub fn plugin(&self) -> &PluginName {
        &self.plugin
    }

    /// Directory sinks write their artifacts into.
    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Path of an artifact named `filename` inside the output directory.
    pub fn output_path(&self, filename: impl AsRef<Path>) -> PathBuf {
        self.outdir.join(filename)
    }

    /// Resolve a user-supplied input path against the working directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }
}

//! Validated pipeline description produced by the loader.

use std::path::{Path, PathBuf};

use adp_sdk::params::Params;
use adp_types::{PipelineId, PluginName, StageRef};
use serde::{Deserialize, Serialize};

/// One stage declaration: qualified plugin name plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSpec {
    pub class: PluginName,
    #[serde(default)]
    pub params: Params,
}

impl StageSpec {
    pub fn new(class: impl Into<PluginName>) -> Self {
        Self {
            class: class.into(),
            params: Params::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }
}

/// State backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateBackendKind {
    #[default]
    Sqlite,
    Json,
}

impl StateBackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Json => "json",
        }
    }

    /// File name used when no explicit `state.path` is configured.
    pub fn default_file_name(self) -> &'static str {
        match self {
            Self::Sqlite => "state.db",
            Self::Json => "state.json",
        }
    }
}

/// Incremental state store configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default)]
    pub backend: StateBackendKind,
    /// Store location. `None` selects `$HOME/.adp/<default file>`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// A loaded and validated pipeline document.
///
/// Exactly one source, zero or more transforms applied left to right, and
/// exactly one sink.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub name: PipelineId,
    pub outdir: PathBuf,
    /// Directory relative input paths are resolved against. `None` means
    /// the process working directory.
    pub workdir: Option<PathBuf>,
    pub source: StageSpec,
    pub transforms: Vec<StageSpec>,
    pub sink: StageSpec,
    pub state: StateConfig,
}

impl PipelineSpec {
    /// Every stage in execution order, labelled with its position.
    pub fn stages(&self) -> impl Iterator<Item = (StageRef, &StageSpec)> + '_ {
        std::iter::once((StageRef::Source, &self.source))
            .chain(
                self.transforms
                    .iter()
                    .enumerate()
                    .map(|(i, t)| (StageRef::Transform(i), t)),
            )
            .chain(std::iter::once((StageRef::Sink, &self.sink)))
    }

    /// Resolve relative `outdir`, `workdir` and `state.path` against `base`
    /// (the directory of the pipeline document).
    pub(crate) fn anchor_paths(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.outdir);
        if let Some(workdir) = self.workdir.as_mut() {
            anchor(workdir);
        }
        if let Some(path) = self.state.path.as_mut() {
            anchor(path);
        }
    }
}

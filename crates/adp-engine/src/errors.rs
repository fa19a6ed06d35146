//! Pipeline error model.
//!
//! Errors are grouped by the phase that produced them: loading the pipeline
//! document, resolving plugins, binding stages, and running. Run-time stage
//! errors always name the stage and plugin, and carry the record position
//! where one is known.

use std::fmt;
use std::path::PathBuf;

use adp_state::StateError;
use adp_types::{PluginError, PluginName, StageRef};

use crate::bind::BindError;
use crate::registry::RegistryError;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// One problem found in a pipeline document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Field path of the offending value, e.g. `transforms[1].class`.
    pub path: String,
    pub message: String,
}

impl ConfigIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Failure to turn a pipeline document into a [`PipelineSpec`].
///
/// [`PipelineSpec`]: crate::config::PipelineSpec
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read pipeline file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("missing environment variable(s): {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("failed to parse pipeline document: {0}")]
    Syntax(#[from] serde_yaml::Error),

    #[error("pipeline validation failed:\n  - {}", join_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

impl ConfigError {
    /// Validation issues, if this is a validation failure.
    pub fn issues(&self) -> &[ConfigIssue] {
        match self {
            Self::Invalid(issues) => issues,
            _ => &[],
        }
    }
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n  - ")
}

// ---------------------------------------------------------------------------
// PipelineError
// ---------------------------------------------------------------------------

/// Any failure while loading, binding or running a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed pipeline document; nothing was bound.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registry population failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A stage could not be resolved or constructed; nothing ran.
    #[error("cannot bind {stage} ({plugin}): {source}")]
    Bind {
        stage: StageRef,
        plugin: PluginName,
        #[source]
        source: BindError,
    },

    #[error("source {plugin} failed after {records_emitted} record(s): {source}")]
    Source {
        plugin: PluginName,
        records_emitted: u64,
        #[source]
        source: PluginError,
    },

    #[error("transforms[{index}] {plugin} failed{}: {source}", fmt_position(.position))]
    Transform {
        index: usize,
        plugin: PluginName,
        /// Zero-based position of the input record being processed.
        position: Option<u64>,
        #[source]
        source: PluginError,
    },

    #[error("sink {plugin} failed after {records_flowed} record(s): {source}")]
    Sink {
        plugin: PluginName,
        records_flowed: u64,
        #[source]
        source: PluginError,
    },

    #[error("state store error: {0}")]
    State(#[from] StateError),

    /// Host-side failure outside any stage (opening the state store, etc.)
    #[error(transparent)]
    Infrastructure(#[from] anyhow::Error),
}

fn fmt_position(position: &Option<u64>) -> String {
    position.map_or_else(String::new, |p| format!(" at record {p}"))
}

impl PipelineError {
    /// Stage the error is attributed to, for run-time and bind errors.
    pub fn stage(&self) -> Option<StageRef> {
        match self {
            Self::Bind { stage, .. } => Some(*stage),
            Self::Source { .. } => Some(StageRef::Source),
            Self::Transform { index, .. } => Some(StageRef::Transform(*index)),
            Self::Sink { .. } => Some(StageRef::Sink),
            _ => None,
        }
    }

    /// Underlying plugin error for run-time stage failures.
    pub fn as_plugin_error(&self) -> Option<&PluginError> {
        match self {
            Self::Source { source, .. }
            | Self::Transform { source, .. }
            | Self::Sink { source, .. } => Some(source),
            _ => None,
        }
    }
}

//! Structured error model for plugin operations.
//!
//! [`PluginError`] carries a classification, a stable code, and optional
//! diagnostic details. Construct via category-specific factory methods.
//! The engine attaches an [`ErrorOrigin`] the first time an error crosses a
//! stage boundary so it can be attributed after travelling downstream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::stage::{PluginName, StageRef};

/// Broad classification of a plugin error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Invalid stage parameters.
    Config,
    /// Network or remote service failure.
    Network,
    /// Local file-system failure.
    Io,
    /// Malformed or unexpected record content.
    Data,
    /// Record shape incompatible with what the stage requires.
    Schema,
    /// Bug or invariant violation inside the plugin.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Network => "network",
            Self::Io => "io",
            Self::Data => "data",
            Self::Schema => "schema",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Where in a pipeline an error was first observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorOrigin {
    pub stage: StageRef,
    pub plugin: PluginName,
    /// For sources: records emitted before the failure. For transforms: the
    /// zero-based position of the input record being processed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
}

/// Structured error from a plugin operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("[{category}] {code}: {message}")]
pub struct PluginError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<ErrorOrigin>,
}

impl PluginError {
    fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            details: None,
            origin: None,
        }
    }

    /// Invalid parameters.
    #[must_use]
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Config, code, message)
    }

    /// Network or remote service failure.
    #[must_use]
    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, code, message)
    }

    /// File-system failure.
    #[must_use]
    pub fn io(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Io, code, message)
    }

    /// Malformed record content.
    #[must_use]
    pub fn data(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Data, code, message)
    }

    /// Record shape mismatch.
    #[must_use]
    pub fn schema(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Schema, code, message)
    }

    /// Internal plugin error.
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Internal, code, message)
    }

    /// Attach structured diagnostic details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attribute the error to a stage, unless it already is.
    ///
    /// The first attribution wins: an error raised upstream keeps its origin
    /// while it flows through later stages.
    #[must_use]
    pub fn with_origin(mut self, origin: ErrorOrigin) -> Self {
        if self.origin.is_none() {
            self.origin = Some(origin);
        }
        self
    }

    #[must_use]
    pub fn is_attributed(&self) -> bool {
        self.origin.is_some()
    }
}

impl From<std::io::Error> for PluginError {
    fn from(err: std::io::Error) -> Self {
        Self::io("IO", err.to_string())
    }
}

impl From<serde_json::Error> for PluginError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            Self::io("IO", err.to_string())
        } else {
            Self::data("INVALID_JSON", err.to_string())
        }
    }
}

//! Capability kinds, plugin names, and stage positions within a pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role a plugin implementation fulfils in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Produces the initial record sequence from external data.
    Source,
    /// Maps one record sequence to another.
    Transform,
    /// Durably writes a record sequence.
    Sink,
}

impl CapabilityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Transform => "transform",
            Self::Sink => "sink",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualified plugin name (e.g. `"file:ndjson"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginName(String);

impl PluginName {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace part before the first `:`, if any.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.0.split_once(':').map(|(ns, _)| ns)
    }
}

impl fmt::Display for PluginName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<S: Into<String>> From<S> for PluginName {
    fn from(value: S) -> Self {
        Self(value.into())
    }
}

/// Position of a stage in a pipeline.
///
/// Displays as the configuration field path of the stage, so error messages
/// point straight at the offending section of the pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageRef {
    Source,
    Transform(usize),
    Sink,
}

impl StageRef {
    /// Capability the stage must implement.
    #[must_use]
    pub fn kind(self) -> CapabilityKind {
        match self {
            Self::Source => CapabilityKind::Source,
            Self::Transform(_) => CapabilityKind::Transform,
            Self::Sink => CapabilityKind::Sink,
        }
    }
}

impl fmt::Display for StageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Transform(i) => write!(f, "transforms[{i}]"),
            Self::Sink => f.write_str("sink"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ref_displays_field_path() {
        assert_eq!(StageRef::Source.to_string(), "source");
        assert_eq!(StageRef::Transform(2).to_string(), "transforms[2]");
        assert_eq!(StageRef::Sink.to_string(), "sink");
    }

    #[test]
    fn stage_ref_kind() {
        assert_eq!(StageRef::Transform(0).kind(), CapabilityKind::Transform);
        assert_eq!(StageRef::Sink.kind(), CapabilityKind::Sink);
    }

    #[test]
    fn plugin_name_namespace() {
        assert_eq!(PluginName::new("mem:collect").namespace(), Some("mem"));
        assert_eq!(PluginName::new("plain").namespace(), None);
    }

    #[test]
    fn capability_kind_serde() {
        let json = serde_json::to_string(&CapabilityKind::Transform).unwrap();
        assert_eq!(json, "\"transform\"");
    }
}

//! Convenience re-exports for plugin authors.
//!
//! ```ignore
//! use adp_sdk::prelude::*;
//! ```

// Capability traits
pub use crate::connector::{Fetched, Sink, Source, Transform};

// Context and parameters
pub use crate::context::StageContext;
pub use crate::params::{decode, Params};

// Streams and artifacts
pub use crate::artifact::AtomicArtifact;
pub use crate::stream::RecordStream;

// Data model
pub use adp_types::{
    ErrorCategory, PluginError, PluginName, Record, StageRef, StateBlob, Value, WriteSummary,
};

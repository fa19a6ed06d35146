//! Shared adp data model types.
//!
//! Dependency-light so both the engine and plugin crates can share them
//! without pulling in storage or runtime concerns.

pub mod error;
pub mod record;
pub mod stage;
pub mod state;

pub use error::{ErrorCategory, ErrorOrigin, PluginError};
pub use record::{Record, Value, WriteSummary};
pub use stage::{CapabilityKind, PluginName, StageRef};
pub use state::{PipelineId, RunStats, RunStatus, StateBlob, StateEntry};

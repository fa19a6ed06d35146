//! Pipeline assembly and execution for adp.
//!
//! The flow is load ([`config`]) → bind ([`bind()`], using a
//! [`PluginRegistry`]) → run ([`BoundPipeline::run`], using a
//! [`StateBackend`](adp_state::StateBackend)).

pub mod bind;
pub(crate) mod checkpoint;
pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod registry;
pub mod resolve;
pub mod result;
pub(crate) mod runner;

pub use bind::{bind, BindError, BoundPipeline, StageDescriptor};
pub use config::{load_pipeline, parse_pipeline_str, PipelineSpec, StageSpec};
pub use errors::{ConfigError, ConfigIssue, PipelineError};
pub use orchestrator::{check_pipeline, run_pipeline};
pub use registry::{Constructor, PluginBundle, PluginRegistry, Registration, RegistryError};
pub use result::{CheckResult, RunSummary, StageOutcome};

//! Pipeline document loading: parsing, env substitution and validation.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{load_pipeline, parse_pipeline_str};
pub use types::{PipelineSpec, StageSpec, StateBackendKind, StateConfig};

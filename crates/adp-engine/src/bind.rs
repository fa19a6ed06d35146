//! Pipeline compiler: resolves every stage through the registry and
//! instantiates it with its parameters.

use std::path::{Path, PathBuf};

use adp_sdk::params::Params;
use adp_sdk::{Sink, Source, Transform};
use adp_state::StateBackend;
use adp_types::{CapabilityKind, PipelineId, PluginError, PluginName, StageRef};
use serde_json::Value;

use crate::config::{PipelineSpec, StageSpec};
use crate::errors::PipelineError;
use crate::registry::{Constructor, PluginRegistry, Registration, RegistryError};
use crate::result::RunSummary;
use crate::runner;

/// Why a single stage failed to bind.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("invalid params:\n  - {}", .0.join("\n  - "))]
    InvalidParams(Vec<String>),

    #[error("construction failed: {0}")]
    Construct(#[from] PluginError),
}

/// An instantiated stage together with its identity.
pub struct BoundStage<T: ?Sized> {
    pub(crate) stage: StageRef,
    pub(crate) plugin: PluginName,
    pub(crate) inner: Box<T>,
}

impl<T: ?Sized> BoundStage<T> {
    pub fn stage(&self) -> StageRef {
        self.stage
    }

    pub fn plugin(&self) -> &PluginName {
        &self.plugin
    }
}

/// Identity of one bound stage, for reporting.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StageDescriptor {
    pub stage: StageRef,
    pub plugin: PluginName,
    pub kind: CapabilityKind,
}

/// A pipeline whose stages are all instantiated.
///
/// Owns its stage objects. Running it again reuses the same instances; the
/// registry is never consulted after [`bind`] returns.
pub struct BoundPipeline {
    pub(crate) name: PipelineId,
    pub(crate) outdir: PathBuf,
    pub(crate) workdir: PathBuf,
    pub(crate) source: BoundStage<dyn Source>,
    pub(crate) transforms: Vec<BoundStage<dyn Transform>>,
    pub(crate) sink: BoundStage<dyn Sink>,
}

impl BoundPipeline {
    pub fn name(&self) -> &PipelineId {
        &self.name
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn source_plugin(&self) -> &PluginName {
        &self.source.plugin
    }

    /// Stage descriptors in execution order.
    pub fn stages(&self) -> Vec<StageDescriptor> {
        let describe = |stage: StageRef, plugin: &PluginName| StageDescriptor {
            stage,
            plugin: plugin.clone(),
            kind: stage.kind(),
        };
        std::iter::once(describe(self.source.stage, &self.source.plugin))
            .chain(self.transforms.iter().map(|t| describe(t.stage, &t.plugin)))
            .chain(std::iter::once(describe(self.sink.stage, &self.sink.plugin)))
            .collect()
    }

    /// Execute the pipeline once against `state`.
    ///
    /// # Errors
    ///
    /// Returns the first stage error, or a state store failure. Incremental
    /// state is only advanced when the run succeeds.
    pub fn run(&mut self, state: &dyn StateBackend) -> Result<RunSummary, PipelineError> {
        runner::run(self, state)
    }
}

impl std::fmt::Debug for BoundPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundPipeline")
            .field("name", &self.name)
            .field("outdir", &self.outdir)
            .field("stages", &self.stages())
            .finish()
    }
}

/// Validate stage params against the registration's JSON Schema.
fn check_params(registration: &Registration, params: &Params) -> Result<(), BindError> {
    let Some(schema) = registration.schema() else {
        return Ok(());
    };
    let validator = jsonschema::validator_for(schema)
        .map_err(|e| BindError::InvalidParams(vec![format!("schema does not compile: {e}")]))?;
    let instance = Value::Object(params.clone());
    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let at = e.instance_path.to_string();
            if at.is_empty() {
                e.to_string()
            } else {
                format!("{at}: {e}")
            }
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BindError::InvalidParams(errors))
    }
}

fn bind_stage<'r>(
    registry: &'r PluginRegistry,
    stage: StageRef,
    spec: &StageSpec,
) -> Result<&'r Constructor, PipelineError> {
    let wrap = |source: BindError| PipelineError::Bind {
        stage,
        plugin: spec.class.clone(),
        source,
    };
    let registration = registry
        .resolve(&spec.class, stage.kind())
        .map_err(|e| wrap(e.into()))?;
    check_params(registration, &spec.params).map_err(wrap)?;
    Ok(registration.constructor())
}

fn construct<T: ?Sized>(
    stage: StageRef,
    spec: &StageSpec,
    build: impl FnOnce(&Params) -> Result<Box<T>, PluginError>,
) -> Result<BoundStage<T>, PipelineError> {
    let inner = build(&spec.params).map_err(|e| PipelineError::Bind {
        stage,
        plugin: spec.class.clone(),
        source: BindError::Construct(e),
    })?;
    tracing::debug!(stage = %stage, plugin = spec.class.as_str(), "Stage bound");
    Ok(BoundStage {
        stage,
        plugin: spec.class.clone(),
        inner,
    })
}

fn unexpected(stage: StageRef, spec: &StageSpec, actual: CapabilityKind) -> PipelineError {
    PipelineError::Bind {
        stage,
        plugin: spec.class.clone(),
        source: BindError::Registry(RegistryError::KindMismatch {
            name: spec.class.clone(),
            expected: stage.kind(),
            actual,
        }),
    }
}

/// Resolve and construct every stage of `spec`.
///
/// All stages are resolved and their params checked before any constructor
/// runs; the first failure aborts the bind and no partial pipeline is
/// returned.
///
/// # Errors
///
/// Returns [`PipelineError::Bind`] naming the failing stage.
pub fn bind(spec: &PipelineSpec, registry: &PluginRegistry) -> Result<BoundPipeline, PipelineError> {
    let source_ctor = bind_stage(registry, StageRef::Source, &spec.source)?;
    let transform_ctors = spec
        .transforms
        .iter()
        .enumerate()
        .map(|(i, t)| bind_stage(registry, StageRef::Transform(i), t))
        .collect::<Result<Vec<_>, _>>()?;
    let sink_ctor = bind_stage(registry, StageRef::Sink, &spec.sink)?;

    let source = match source_ctor {
        Constructor::Source(f) => construct(StageRef::Source, &spec.source, f)?,
        other => return Err(unexpected(StageRef::Source, &spec.source, other.kind())),
    };
    let mut transforms = Vec::with_capacity(transform_ctors.len());
    for (i, (ctor, t)) in transform_ctors.into_iter().zip(&spec.transforms).enumerate() {
        let stage = StageRef::Transform(i);
        transforms.push(match ctor {
            Constructor::Transform(f) => construct(stage, t, f)?,
            other => return Err(unexpected(stage, t, other.kind())),
        });
    }
    let sink = match sink_ctor {
        Constructor::Sink(f) => construct(StageRef::Sink, &spec.sink, f)?,
        other => return Err(unexpected(StageRef::Sink, &spec.sink, other.kind())),
    };

    let workdir = spec.workdir.clone().unwrap_or_else(|| PathBuf::from("."));
    tracing::info!(
        pipeline = spec.name.as_str(),
        transforms = transforms.len(),
        "Pipeline bound"
    );
    Ok(BoundPipeline {
        name: spec.name.clone(),
        outdir: spec.outdir.clone(),
        workdir,
        source,
        transforms,
        sink,
    })
}

//! Pipeline runner: one lazy source → transforms → sink pass.
//!
//! Every stage's output is wrapped in a counting adapter, so when an error
//! surfaces at the sink it can be attributed to the stage that produced it
//! and to the record position where it happened. Incremental state is
//! committed only after the sink reports success, read its input to the
//! end, and no stream error was observed.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::time::Instant;

use adp_sdk::stream::RecordResult;
use adp_sdk::{Fetched, RecordStream, StageContext};
use adp_state::StateBackend;
use adp_types::{
    ErrorOrigin, PipelineId, PluginError, PluginName, RunStats, RunStatus, StageRef, StateBlob,
    WriteSummary,
};

use crate::bind::BoundPipeline;
use crate::checkpoint;
use crate::errors::PipelineError;
use crate::result::{RunSummary, StageOutcome};

/// Counts records leaving a stage and attributes errors raised by it.
struct Tracked<'a> {
    inner: RecordStream<'a>,
    stage: StageRef,
    plugin: PluginName,
    emitted: Rc<Cell<u64>>,
    /// Records pulled from the previous stage; `None` for the source.
    upstream: Option<Rc<Cell<u64>>>,
}

impl Iterator for Tracked<'_> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<RecordResult> {
        match self.inner.next()? {
            Ok(record) => {
                self.emitted.set(self.emitted.get() + 1);
                Some(Ok(record))
            }
            Err(err) => {
                // Sources report how many records they emitted; transforms
                // report the zero-based position of the input being processed.
                let position = match &self.upstream {
                    None => Some(self.emitted.get()),
                    Some(pulled) => pulled.get().checked_sub(1),
                };
                Some(Err(err.with_origin(ErrorOrigin {
                    stage: self.stage,
                    plugin: self.plugin.clone(),
                    position,
                })))
            }
        }
    }
}

/// Sits in front of the sink: counts delivered records, remembers the
/// first stream error and whether the stream was read to the end, so a
/// sink that drops an error or stops early cannot turn it into success.
struct Guard<'a> {
    inner: RecordStream<'a>,
    flowed: Rc<Cell<u64>>,
    first_error: Rc<RefCell<Option<PluginError>>>,
    exhausted: Rc<Cell<bool>>,
}

impl Iterator for Guard<'_> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<RecordResult> {
        let Some(item) = self.inner.next() else {
            self.exhausted.set(true);
            return None;
        };
        match &item {
            Ok(_) => self.flowed.set(self.flowed.get() + 1),
            Err(err) => {
                let mut first = self.first_error.borrow_mut();
                if first.is_none() {
                    *first = Some(err.clone());
                }
            }
        }
        Some(item)
    }
}

#[derive(Default)]
struct Counters {
    read: Rc<Cell<u64>>,
    flowed: Rc<Cell<u64>>,
}

struct Driven {
    stages: Vec<StageOutcome>,
    written: WriteSummary,
    outgoing: Option<StateBlob>,
}

fn stage_context(
    name: &PipelineId,
    stage: StageRef,
    plugin: &PluginName,
    outdir: &Path,
    workdir: &Path,
) -> StageContext {
    StageContext::new(name.clone(), stage, plugin.clone(), outdir, workdir)
}

/// Turn a stream error into a stage-attributed pipeline error.
fn attribute(err: PluginError, sink: &PluginName, records_flowed: u64) -> PipelineError {
    match err.origin.clone() {
        Some(ErrorOrigin {
            stage: StageRef::Source,
            plugin,
            position,
        }) => PipelineError::Source {
            plugin,
            records_emitted: position.unwrap_or(0),
            source: err,
        },
        Some(ErrorOrigin {
            stage: StageRef::Transform(index),
            plugin,
            position,
        }) => PipelineError::Transform {
            index,
            plugin,
            position,
            source: err,
        },
        Some(ErrorOrigin {
            stage: StageRef::Sink,
            ..
        })
        | None => PipelineError::Sink {
            plugin: sink.clone(),
            records_flowed,
            source: err,
        },
    }
}

fn drive(
    pipeline: &mut BoundPipeline,
    incoming: Option<&StateBlob>,
    counters: &Counters,
) -> Result<Driven, PipelineError> {
    let BoundPipeline {
        name,
        outdir,
        workdir,
        source,
        transforms,
        sink,
    } = pipeline;

    let source_ctx = stage_context(name, StageRef::Source, &source.plugin, outdir, workdir);
    let Fetched {
        records,
        state: outgoing,
    } = source
        .inner
        .fetch(&source_ctx, incoming)
        .map_err(|e| PipelineError::Source {
            plugin: source.plugin.clone(),
            records_emitted: 0,
            source: e.with_origin(ErrorOrigin {
                stage: StageRef::Source,
                plugin: source.plugin.clone(),
                position: Some(0),
            }),
        })?;
    tracing::debug!(
        plugin = source.plugin.as_str(),
        state = outgoing.is_some(),
        "Source fetch started"
    );

    let mut emitted: Vec<(StageRef, &PluginName, Rc<Cell<u64>>)> =
        vec![(StageRef::Source, &source.plugin, Rc::clone(&counters.read))];
    let mut stream = RecordStream::new(Tracked {
        inner: records,
        stage: StageRef::Source,
        plugin: source.plugin.clone(),
        emitted: Rc::clone(&counters.read),
        upstream: None,
    });

    for transform in transforms.iter() {
        let ctx = stage_context(name, transform.stage, &transform.plugin, outdir, workdir);
        let upstream = emitted
            .last()
            .map_or_else(|| Rc::clone(&counters.read), |(_, _, c)| Rc::clone(c));
        let count = Rc::new(Cell::new(0));
        stream = RecordStream::new(Tracked {
            inner: transform.inner.apply(&ctx, stream),
            stage: transform.stage,
            plugin: transform.plugin.clone(),
            emitted: Rc::clone(&count),
            upstream: Some(upstream),
        });
        emitted.push((transform.stage, &transform.plugin, count));
    }

    let first_error = Rc::new(RefCell::new(None));
    let exhausted = Rc::new(Cell::new(false));
    let guarded = RecordStream::new(Guard {
        inner: stream,
        flowed: Rc::clone(&counters.flowed),
        first_error: Rc::clone(&first_error),
        exhausted: Rc::clone(&exhausted),
    });
    let sink_ctx = stage_context(name, StageRef::Sink, &sink.plugin, outdir, workdir);
    let written = sink.inner.write(&sink_ctx, guarded);
    let flowed = counters.flowed.get();

    // An upstream failure takes precedence over whatever the sink reported.
    let upstream_error = first_error.borrow_mut().take();
    let written = match (written, upstream_error) {
        (Ok(_), Some(err)) => {
            tracing::warn!(
                plugin = sink.plugin.as_str(),
                "Sink reported success despite an upstream error"
            );
            return Err(attribute(err, &sink.plugin, flowed));
        }
        (Err(_), Some(err)) | (Err(err), None) => return Err(attribute(err, &sink.plugin, flowed)),
        (Ok(_), None) if !exhausted.get() => {
            tracing::warn!(
                plugin = sink.plugin.as_str(),
                records_flowed = flowed,
                "Sink returned before reading its whole input"
            );
            return Err(PipelineError::Sink {
                plugin: sink.plugin.clone(),
                records_flowed: flowed,
                source: PluginError::internal(
                    "SINK_INPUT_NOT_CONSUMED",
                    format!("sink returned after reading {flowed} records of an undrained input"),
                ),
            });
        }
        (Ok(written), None) => written,
    };

    let mut stages: Vec<StageOutcome> = emitted
        .into_iter()
        .map(|(stage, plugin, count)| StageOutcome {
            stage,
            plugin: plugin.clone(),
            records: count.get(),
        })
        .collect();
    stages.push(StageOutcome {
        stage: StageRef::Sink,
        plugin: sink.plugin.clone(),
        records: flowed,
    });
    for outcome in &stages {
        tracing::info!(
            stage = %outcome.stage,
            plugin = outcome.plugin.as_str(),
            records = outcome.records,
            "Stage finished"
        );
    }

    Ok(Driven {
        stages,
        written,
        outgoing,
    })
}

fn finish_run(state: &dyn StateBackend, run_id: i64, status: RunStatus, stats: &RunStats) {
    if let Err(e) = state.complete_run(run_id, status, stats) {
        tracing::warn!(run_id, error = %e, "Failed to record run completion");
    }
}

/// Execute `pipeline` once. See [`BoundPipeline::run`].
pub(crate) fn run(
    pipeline: &mut BoundPipeline,
    state: &dyn StateBackend,
) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();
    let name = pipeline.name.clone();
    let source = pipeline.source.plugin.clone();
    let span = tracing::info_span!("pipeline", pipeline = name.as_str());
    let _enter = span.enter();

    let incoming = checkpoint::load_incoming(
        state,
        &name,
        &source,
        pipeline.source.inner.state_version(),
    )?;
    let run_id = state.start_run(&name, &source)?;
    tracing::info!(
        run_id,
        source = source.as_str(),
        transforms = pipeline.transforms.len(),
        sink = pipeline.sink.plugin.as_str(),
        resumed = incoming.is_some(),
        "Pipeline run started"
    );

    let counters = Counters::default();
    let driven = match drive(pipeline, incoming.as_ref(), &counters) {
        Ok(driven) => driven,
        Err(err) => {
            tracing::error!(error = %err, "Pipeline run failed, state not advanced");
            let stats = RunStats {
                records_read: counters.read.get(),
                records_written: 0,
                error_message: Some(err.to_string()),
            };
            finish_run(state, run_id, RunStatus::Failed, &stats);
            return Err(err);
        }
    };

    let state_advanced =
        match checkpoint::commit_state(state, &name, &source, driven.outgoing.as_ref()) {
            Ok(advanced) => advanced,
            Err(e) => {
                let stats = RunStats {
                    records_read: counters.read.get(),
                    records_written: driven.written.count,
                    error_message: Some(format!("state commit failed: {e}")),
                };
                finish_run(state, run_id, RunStatus::Failed, &stats);
                return Err(e.into());
            }
        };

    let stats = RunStats {
        records_read: counters.read.get(),
        records_written: driven.written.count,
        error_message: None,
    };
    finish_run(state, run_id, RunStatus::Completed, &stats);

    let duration_secs = start.elapsed().as_secs_f64();
    tracing::info!(
        records_read = stats.records_read,
        records_written = stats.records_written,
        state_advanced,
        duration_secs,
        "Pipeline run completed"
    );

    Ok(RunSummary {
        pipeline: name,
        source,
        stages: driven.stages,
        records_read: stats.records_read,
        records_written: stats.records_written,
        paths: driven.written.paths,
        state: driven.outgoing,
        state_advanced,
        duration_secs,
    })
}

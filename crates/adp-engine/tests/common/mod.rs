//! In-memory `mem:` plugins shared by the engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use adp_engine::{PipelineSpec, PluginRegistry, Registration, StageSpec};
use adp_sdk::prelude::*;
use adp_types::PipelineId;
use serde::Deserialize;
use serde_json::json;

pub fn rec(v: Value) -> Record {
    v.as_object().cloned().expect("record literal must be an object")
}

pub fn params(v: Value) -> Params {
    v.as_object().cloned().expect("params literal must be an object")
}

pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn spec(name: &str, source: StageSpec, transforms: Vec<StageSpec>, sink: StageSpec) -> PipelineSpec {
    PipelineSpec {
        name: PipelineId::new(name),
        outdir: PathBuf::from("out"),
        workdir: None,
        source,
        transforms,
        sink,
        state: adp_engine::config::StateConfig::default(),
    }
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

struct TwoRows;

impl Source for TwoRows {
    fn fetch<'a>(
        &'a mut self,
        _ctx: &StageContext,
        _incoming: Option<&StateBlob>,
    ) -> Result<Fetched<'a>, PluginError> {
        Ok(Fetched::new(RecordStream::from_records(vec![
            rec(json!({"a": 1})),
            rec(json!({"a": 2})),
        ])))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CursorParams {
    #[serde(default = "default_count")]
    count: u64,
    #[serde(default = "default_version")]
    version: u32,
}

fn default_count() -> u64 {
    2
}

fn default_version() -> u32 {
    1
}

/// Emits `count` records starting at the stored cursor and advances it.
struct CursorSource {
    count: u64,
    version: u32,
    seen: Arc<Mutex<Vec<Option<StateBlob>>>>,
    fetches: Arc<AtomicUsize>,
}

impl Source for CursorSource {
    fn fetch<'a>(
        &'a mut self,
        _ctx: &StageContext,
        incoming: Option<&StateBlob>,
    ) -> Result<Fetched<'a>, PluginError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(incoming.cloned());
        let start = incoming
            .and_then(|b| b.get("cursor"))
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let end = start + self.count;
        let records = (start..end).map(|id| rec(json!({ "id": id, "a": id })));
        Ok(Fetched::new(RecordStream::from_records(records))
            .with_state(StateBlob::new(json!({ "cursor": end })).with_version(self.version)))
    }

    fn state_version(&self) -> u32 {
        self.version
    }
}

/// Emits one record, then fails.
struct FlakySource;

impl Source for FlakySource {
    fn fetch<'a>(
        &'a mut self,
        _ctx: &StageContext,
        _incoming: Option<&StateBlob>,
    ) -> Result<Fetched<'a>, PluginError> {
        Ok(Fetched::new(RecordStream::new(vec![
            Ok(rec(json!({"a": 1}))),
            Err(PluginError::network("HTTP_503", "service unavailable")),
            Ok(rec(json!({"a": 3}))),
        ]))
        .with_state(StateBlob::new(json!({"etag": "never-saved"}))))
    }
}

// ---------------------------------------------------------------------------
// Transforms
// ---------------------------------------------------------------------------

struct DoubleA;

impl Transform for DoubleA {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(|mut r| {
            let a = r
                .get("a")
                .and_then(Value::as_i64)
                .ok_or_else(|| PluginError::schema("MISSING_A", "field `a` must be an integer"))?;
            r.insert("a".into(), json!(a * 2));
            Ok(r)
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ArithParams {
    n: i64,
}

/// `a + n` or `a * n`.
struct Arith {
    n: i64,
    multiply: bool,
}

impl Transform for Arith {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(move |mut r| {
            let a = r.get("a").and_then(Value::as_i64).unwrap_or(0);
            let out = if self.multiply {
                a.wrapping_mul(self.n)
            } else {
                a.wrapping_add(self.n)
            };
            r.insert("a".into(), json!(out));
            Ok(r)
        })
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FailAtParams {
    a: i64,
}

/// Fails on the record whose `a` equals the configured value.
struct FailAt {
    a: i64,
}

impl Transform for FailAt {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(move |r| {
            if r.get("a").and_then(Value::as_i64) == Some(self.a) {
                Err(PluginError::data("POISON", format!("a == {}", self.a)))
            } else {
                Ok(r)
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

struct Collect {
    out: Arc<Mutex<Vec<Record>>>,
}

impl Sink for Collect {
    fn write(
        &mut self,
        _ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let records = input.collect_records()?;
        let count = records.len() as u64;
        self.out.lock().unwrap().extend(records);
        Ok(WriteSummary::new(count))
    }
}

/// Consumes everything, then fails.
struct FullDisk;

impl Sink for FullDisk {
    fn write(
        &mut self,
        _ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        for item in input {
            item?;
        }
        Err(PluginError::io("DISK_FULL", "no space left on device"))
    }
}

/// Ignores stream errors and reports success.
struct Swallow;

impl Sink for Swallow {
    fn write(
        &mut self,
        _ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let count = input.filter_map(Result::ok).count();
        Ok(WriteSummary::new(count as u64))
    }
}

/// Writes the first record and reports success without reading the rest.
struct TakeOne;

impl Sink for TakeOne {
    fn write(
        &mut self,
        _ctx: &StageContext,
        mut input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let count = match input.next() {
            Some(item) => {
                item?;
                1
            }
            None => 0,
        };
        Ok(WriteSummary::new(count))
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Registry of `mem:` plugins plus handles to observe them.
pub struct Harness {
    pub registry: PluginRegistry,
    pub collected: Arc<Mutex<Vec<Record>>>,
    pub seen_states: Arc<Mutex<Vec<Option<StateBlob>>>>,
    pub fetches: Arc<AtomicUsize>,
}

impl Harness {
    pub fn new() -> Self {
        let collected = Arc::new(Mutex::new(Vec::new()));
        let seen_states = Arc::new(Mutex::new(Vec::new()));
        let fetches = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();

        registry
            .register(Registration::source("mem:two_rows", |_| {
                Ok(Box::new(TwoRows) as Box<dyn Source>)
            }))
            .unwrap();
        {
            let seen = Arc::clone(&seen_states);
            let fetches = Arc::clone(&fetches);
            registry
                .register(Registration::source("mem:cursor", move |p| {
                    let cfg: CursorParams = decode(p)?;
                    Ok(Box::new(CursorSource {
                        count: cfg.count,
                        version: cfg.version,
                        seen: Arc::clone(&seen),
                        fetches: Arc::clone(&fetches),
                    }) as Box<dyn Source>)
                }))
                .unwrap();
        }
        registry
            .register(Registration::source("mem:flaky", |_| {
                Ok(Box::new(FlakySource) as Box<dyn Source>)
            }))
            .unwrap();

        registry
            .register(Registration::transform("mem:double_a", |_| {
                Ok(Box::new(DoubleA) as Box<dyn Transform>)
            }))
            .unwrap();
        registry
            .register(Registration::transform("mem:add", |p| {
                let cfg: ArithParams = decode(p)?;
                Ok(Box::new(Arith {
                    n: cfg.n,
                    multiply: false,
                }) as Box<dyn Transform>)
            }))
            .unwrap();
        registry
            .register(Registration::transform("mem:mul", |p| {
                let cfg: ArithParams = decode(p)?;
                Ok(Box::new(Arith {
                    n: cfg.n,
                    multiply: true,
                }) as Box<dyn Transform>)
            }))
            .unwrap();
        registry
            .register(Registration::transform("mem:fail_at", |p| {
                let cfg: FailAtParams = decode(p)?;
                Ok(Box::new(FailAt { a: cfg.a }) as Box<dyn Transform>)
            }))
            .unwrap();

        {
            let out = Arc::clone(&collected);
            registry
                .register(Registration::sink("mem:collect", move |_| {
                    Ok(Box::new(Collect {
                        out: Arc::clone(&out),
                    }) as Box<dyn Sink>)
                }))
                .unwrap();
        }
        registry
            .register(Registration::sink("mem:full_disk", |_| {
                Ok(Box::new(FullDisk) as Box<dyn Sink>)
            }))
            .unwrap();
        registry
            .register(Registration::sink("mem:swallow", |_| {
                Ok(Box::new(Swallow) as Box<dyn Sink>)
            }))
            .unwrap();
        registry
            .register(Registration::sink("mem:take_one", |_| {
                Ok(Box::new(TakeOne) as Box<dyn Sink>)
            }))
            .unwrap();

        Self {
            registry,
            collected,
            seen_states,
            fetches,
        }
    }

    pub fn collected(&self) -> Vec<Record> {
        self.collected.lock().unwrap().clone()
    }
}

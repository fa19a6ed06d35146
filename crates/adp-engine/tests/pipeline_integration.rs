//! End-to-end tests for load → bind → run over in-memory plugins.

mod common;

use std::sync::atomic::Ordering;

use adp_engine::config::StateBackendKind;
use adp_engine::{bind, load_pipeline, BindError, ConfigError, PipelineError, RegistryError, StageSpec};
use adp_state::{JsonFileStateBackend, SqliteStateBackend, StateBackend};
use adp_types::{PipelineId, PluginName, StageRef, StateBlob};
use serde_json::json;

use common::{fixture, params, rec, spec, Harness};

#[test]
fn test_two_rows_doubled_end_to_end() {
    let harness = Harness::new();
    let pipeline = load_pipeline(&fixture("two_rows.yaml")).expect("fixture must load");
    assert_eq!(pipeline.state.backend, StateBackendKind::Json);
    assert_eq!(pipeline.outdir, fixture("out"));

    let mut bound = bind(&pipeline, &harness.registry).unwrap();
    let state = SqliteStateBackend::in_memory().unwrap();
    let summary = bound.run(&state).unwrap();

    assert_eq!(harness.collected(), vec![rec(json!({"a": 2})), rec(json!({"a": 4}))]);
    assert_eq!(summary.records_written, 2);
    assert_eq!(summary.records_read, 2);
    assert_eq!(summary.pipeline.as_str(), "two_rows_doubled");
    let counts: Vec<(String, u64)> = summary
        .stages
        .iter()
        .map(|s| (s.stage.to_string(), s.records))
        .collect();
    assert_eq!(
        counts,
        vec![
            ("source".to_string(), 2),
            ("transforms[0]".to_string(), 2),
            ("sink".to_string(), 2),
        ]
    );
    assert!(summary.state.is_none());
    assert!(!summary.state_advanced);
}

#[test]
fn test_invalid_fixture_reports_every_issue() {
    let err = load_pipeline(&fixture("invalid.yaml")).unwrap_err();
    let paths: Vec<&str> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "name",
            "outdir",
            "source.params",
            "transforms[0].class",
            "sink.parms",
            "state.backend",
        ]
    );
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_second_run_receives_first_runs_state() {
    let harness = Harness::new();
    let pipeline = spec(
        "cursor_pipe",
        StageSpec::new("mem:cursor").with_params(params(json!({"count": 3}))),
        vec![],
        StageSpec::new("mem:collect"),
    );
    let state = SqliteStateBackend::in_memory().unwrap();
    let mut bound = bind(&pipeline, &harness.registry).unwrap();

    let first = bound.run(&state).unwrap();
    assert!(first.state_advanced);
    assert_eq!(first.state, Some(StateBlob::new(json!({"cursor": 3}))));

    let second = bound.run(&state).unwrap();
    let seen = harness.seen_states.lock().unwrap().clone();
    assert_eq!(seen, vec![None, first.state.clone()]);
    assert_eq!(second.state, Some(StateBlob::new(json!({"cursor": 6}))));

    let stored = state
        .load(&PipelineId::new("cursor_pipe"), &PluginName::new("mem:cursor"))
        .unwrap();
    assert_eq!(stored, second.state);

    let ids: Vec<u64> = harness
        .collected()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_sink_failure_leaves_state_untouched() {
    let harness = Harness::new();
    let state = SqliteStateBackend::in_memory().unwrap();
    let source = StageSpec::new("mem:cursor").with_params(params(json!({"count": 2})));

    let ok = spec("pipe", source.clone(), vec![], StageSpec::new("mem:collect"));
    let before = bind(&ok, &harness.registry).unwrap().run(&state).unwrap().state;

    let failing = spec("pipe", source, vec![], StageSpec::new("mem:full_disk"));
    let err = bind(&failing, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap_err();
    match &err {
        PipelineError::Sink {
            plugin,
            records_flowed,
            source,
        } => {
            assert_eq!(plugin.as_str(), "mem:full_disk");
            assert_eq!(*records_flowed, 2);
            assert_eq!(source.code, "DISK_FULL");
        }
        other => panic!("expected sink error, got {other:?}"),
    }

    let stored = state
        .load(&PipelineId::new("pipe"), &PluginName::new("mem:cursor"))
        .unwrap();
    assert_eq!(stored, before);
}

#[test]
fn test_transform_error_names_stage_and_position() {
    let harness = Harness::new();
    let pipeline = spec(
        "poisoned",
        StageSpec::new("mem:cursor").with_params(params(json!({"count": 5}))),
        vec![
            StageSpec::new("mem:add").with_params(params(json!({"n": 0}))),
            StageSpec::new("mem:fail_at").with_params(params(json!({"a": 3}))),
        ],
        StageSpec::new("mem:collect"),
    );
    let state = SqliteStateBackend::in_memory().unwrap();
    let err = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap_err();

    match &err {
        PipelineError::Transform {
            index,
            plugin,
            position,
            source,
        } => {
            assert_eq!(*index, 1);
            assert_eq!(plugin.as_str(), "mem:fail_at");
            assert_eq!(*position, Some(3));
            assert_eq!(source.code, "POISON");
        }
        other => panic!("expected transform error, got {other:?}"),
    }
    assert_eq!(err.stage(), Some(StageRef::Transform(1)));
    assert!(state
        .load(&PipelineId::new("poisoned"), &PluginName::new("mem:cursor"))
        .unwrap()
        .is_none());
}

#[test]
fn test_source_stream_error_is_attributed_to_source() {
    let harness = Harness::new();
    let pipeline = spec(
        "flaky",
        StageSpec::new("mem:flaky"),
        vec![StageSpec::new("mem:double_a")],
        StageSpec::new("mem:collect"),
    );
    let state = SqliteStateBackend::in_memory().unwrap();
    let err = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap_err();
    match err {
        PipelineError::Source {
            plugin,
            records_emitted,
            source,
        } => {
            assert_eq!(plugin.as_str(), "mem:flaky");
            assert_eq!(records_emitted, 1);
            assert_eq!(source.code, "HTTP_503");
        }
        other => panic!("expected source error, got {other:?}"),
    }
    assert!(harness.collected().is_empty());
}

#[test]
fn test_sink_swallowing_errors_still_fails_run() {
    let harness = Harness::new();
    let state = SqliteStateBackend::in_memory().unwrap();
    let pipeline = spec(
        "swallowed",
        StageSpec::new("mem:flaky"),
        vec![],
        StageSpec::new("mem:swallow"),
    );
    let err = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Source { .. }));
    assert!(state
        .load(&PipelineId::new("swallowed"), &PluginName::new("mem:flaky"))
        .unwrap()
        .is_none());
}

#[test]
fn test_sink_stopping_early_fails_run_and_keeps_state() {
    let harness = Harness::new();
    let state = SqliteStateBackend::in_memory().unwrap();
    let pipeline = spec(
        "partial",
        StageSpec::new("mem:cursor").with_params(params(json!({"count": 3}))),
        vec![],
        StageSpec::new("mem:take_one"),
    );
    let err = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap_err();
    match &err {
        PipelineError::Sink {
            plugin,
            records_flowed,
            source,
        } => {
            assert_eq!(plugin.as_str(), "mem:take_one");
            assert_eq!(*records_flowed, 1);
            assert_eq!(source.code, "SINK_INPUT_NOT_CONSUMED");
        }
        other => panic!("expected sink error, got {other:?}"),
    }
    assert!(state
        .load(&PipelineId::new("partial"), &PluginName::new("mem:cursor"))
        .unwrap()
        .is_none());
}

#[test]
fn test_bind_fails_fast_on_unknown_plugin() {
    let harness = Harness::new();
    let pipeline = spec(
        "broken",
        StageSpec::new("mem:cursor"),
        vec![StageSpec::new("mem:double_a")],
        StageSpec::new("mem:nowhere"),
    );
    let err = bind(&pipeline, &harness.registry).unwrap_err();
    match err {
        PipelineError::Bind {
            stage: StageRef::Sink,
            source: BindError::Registry(RegistryError::UnknownPlugin(name)),
            ..
        } => assert_eq!(name.as_str(), "mem:nowhere"),
        other => panic!("expected unknown plugin bind error, got {other:?}"),
    }
    assert_eq!(harness.fetches.load(Ordering::SeqCst), 0);
}

#[test]
fn test_bind_rejects_unknown_params() {
    let harness = Harness::new();
    let pipeline = spec(
        "typo",
        StageSpec::new("mem:cursor").with_params(params(json!({"cuont": 3}))),
        vec![],
        StageSpec::new("mem:collect"),
    );
    let err = bind(&pipeline, &harness.registry).unwrap_err();
    assert_eq!(err.stage(), Some(StageRef::Source));
    assert!(err.to_string().contains("cuont"));
}

#[test]
fn test_state_schema_drift_starts_fresh() {
    let harness = Harness::new();
    let state = SqliteStateBackend::in_memory().unwrap();
    let pid = PipelineId::new("drift");
    let source = PluginName::new("mem:cursor");
    state
        .save(&pid, &source, &StateBlob::new(json!({"cursor": 100})))
        .unwrap();

    let pipeline = spec(
        "drift",
        StageSpec::new("mem:cursor").with_params(params(json!({"count": 1, "version": 2}))),
        vec![],
        StageSpec::new("mem:collect"),
    );
    let summary = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&state)
        .unwrap();

    assert_eq!(harness.seen_states.lock().unwrap().clone(), vec![None]);
    let stored = state.load(&pid, &source).unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.data, json!({"cursor": 1}));
    assert_eq!(summary.state, Some(stored));
}

#[test]
fn test_json_state_backend_round_trip_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let pipeline = spec(
        "json_state",
        StageSpec::new("mem:cursor"),
        vec![],
        StageSpec::new("mem:collect"),
    );
    let path = dir.path().join("state.json");

    {
        let state = JsonFileStateBackend::open(&path).unwrap();
        bind(&pipeline, &harness.registry)
            .unwrap()
            .run(&state)
            .unwrap();
    }
    let reopened = JsonFileStateBackend::open(&path).unwrap();
    let summary = bind(&pipeline, &harness.registry)
        .unwrap()
        .run(&reopened)
        .unwrap();
    assert_eq!(summary.state, Some(StateBlob::new(json!({"cursor": 4}))));
}

#[test]
fn test_run_pipeline_opens_configured_store() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let mut pipeline = spec(
        "orchestrated",
        StageSpec::new("mem:cursor"),
        vec![],
        StageSpec::new("mem:collect"),
    );
    pipeline.state.backend = StateBackendKind::Json;
    pipeline.state.path = Some(dir.path().join("state.json"));

    let summary = adp_engine::run_pipeline(&pipeline, &harness.registry).unwrap();
    assert_eq!(summary.records_written, 2);

    let store = JsonFileStateBackend::open(dir.path().join("state.json")).unwrap();
    let stored = store
        .load(&PipelineId::new("orchestrated"), &PluginName::new("mem:cursor"))
        .unwrap();
    assert_eq!(stored, Some(StateBlob::new(json!({"cursor": 2}))));
}

#[test]
fn test_check_pipeline_lists_stages_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::new();
    let mut pipeline = spec(
        "checked",
        StageSpec::new("mem:cursor"),
        vec![StageSpec::new("mem:double_a")],
        StageSpec::new("mem:collect"),
    );
    pipeline.state.path = Some(dir.path().join("state.db"));

    let check = adp_engine::check_pipeline(&pipeline, &harness.registry).unwrap();
    assert!(check.state_ok);
    let stages: Vec<String> = check.stages.iter().map(|s| s.stage.to_string()).collect();
    assert_eq!(stages, vec!["source", "transforms[0]", "sink"]);
    assert_eq!(harness.fetches.load(Ordering::SeqCst), 0);
}

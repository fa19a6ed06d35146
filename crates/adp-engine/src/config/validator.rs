//! Structural validation of a parsed pipeline document.
//!
//! Works on the untyped document so that every problem can be reported with
//! its field path in one pass, instead of stopping at the first serde error.

use std::path::PathBuf;

use adp_sdk::params::Params;
use adp_types::{PipelineId, PluginName};
use serde_json::{Map, Value};

use crate::config::types::{PipelineSpec, StageSpec, StateBackendKind, StateConfig};
use crate::errors::{ConfigError, ConfigIssue};

const STAGE_KEYS: &[&str] = &["class", "params"];

#[derive(Default)]
struct Issues(Vec<ConfigIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ConfigIssue::new(path, message));
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

/// Required non-blank string field.
fn required_string(
    root: &Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Issues,
) -> Option<String> {
    match root.get(key) {
        None | Some(Value::Null) => {
            issues.push(path, "is required");
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            issues.push(path, "must be a non-empty string");
            None
        }
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => {
            issues.push(path, format!("must be a string, found {}", describe(other)));
            None
        }
    }
}

/// Optional non-blank string field.
fn optional_string(
    root: &Map<String, Value>,
    key: &str,
    path: &str,
    issues: &mut Issues,
) -> Option<String> {
    match root.get(key) {
        None | Some(Value::Null) => None,
        Some(_) => required_string(root, key, path, issues),
    }
}

fn validate_stage(value: Option<&Value>, path: &str, issues: &mut Issues) -> Option<StageSpec> {
    let stage = match value {
        None | Some(Value::Null) => {
            issues.push(path, "is required");
            return None;
        }
        Some(Value::Object(stage)) => stage,
        Some(other) => {
            issues.push(
                path,
                format!("must be a mapping with `class` and optional `params`, found {}", describe(other)),
            );
            return None;
        }
    };

    for key in stage.keys() {
        if !STAGE_KEYS.contains(&key.as_str()) {
            issues.push(
                format!("{path}.{key}"),
                "unknown key (expected `class` or `params`)",
            );
        }
    }

    let class = required_string(stage, "class", &format!("{path}.class"), issues);
    if let Some(class) = &class {
        if class.chars().any(char::is_whitespace) {
            issues.push(format!("{path}.class"), "must not contain whitespace");
        }
    }

    let params = match stage.get("params") {
        None | Some(Value::Null) => Some(Params::new()),
        Some(Value::Object(params)) => Some(params.clone()),
        Some(other) => {
            issues.push(
                format!("{path}.params"),
                format!("must be a mapping, found {}", describe(other)),
            );
            None
        }
    };

    Some(StageSpec {
        class: PluginName::new(class?),
        params: params?,
    })
}

fn validate_transforms(value: Option<&Value>, issues: &mut Issues) -> Vec<Option<StageSpec>> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| validate_stage(Some(item), &format!("transforms[{i}]"), issues))
            .collect(),
        Some(other) => {
            issues.push(
                "transforms",
                format!("must be a sequence of stages, found {}", describe(other)),
            );
            vec![None]
        }
    }
}

fn validate_state(value: Option<&Value>, issues: &mut Issues) -> Option<StateConfig> {
    let state = match value {
        None | Some(Value::Null) => return Some(StateConfig::default()),
        Some(Value::Object(state)) => state,
        Some(other) => {
            issues.push("state", format!("must be a mapping, found {}", describe(other)));
            return None;
        }
    };

    let backend = match optional_string(state, "backend", "state.backend", issues).as_deref() {
        None => Some(StateBackendKind::default()),
        Some("sqlite") => Some(StateBackendKind::Sqlite),
        Some("json") => Some(StateBackendKind::Json),
        Some(other) => {
            issues.push(
                "state.backend",
                format!("unknown backend '{other}' (expected `sqlite` or `json`)"),
            );
            None
        }
    };
    let path = optional_string(state, "path", "state.path", issues).map(PathBuf::from);

    Some(StateConfig {
        backend: backend?,
        path,
    })
}

/// Validate a parsed document and build the typed [`PipelineSpec`].
///
/// Unknown top-level keys are ignored.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] listing every problem found.
pub fn validate_document(document: &Value) -> Result<PipelineSpec, ConfigError> {
    let Value::Object(root) = document else {
        return Err(ConfigError::Invalid(vec![ConfigIssue::new(
            "(root)",
            format!("pipeline document must be a mapping, found {}", describe(document)),
        )]));
    };

    let mut issues = Issues::default();

    let name = required_string(root, "name", "name", &mut issues);
    let outdir = required_string(root, "outdir", "outdir", &mut issues);
    let workdir = optional_string(root, "workdir", "workdir", &mut issues);
    let source = validate_stage(root.get("source"), "source", &mut issues);
    let transforms = validate_transforms(root.get("transforms"), &mut issues);
    let sink = validate_stage(root.get("sink"), "sink", &mut issues);
    let state = validate_state(root.get("state"), &mut issues);

    if !issues.0.is_empty() {
        return Err(ConfigError::Invalid(issues.0));
    }

    // Every piece is present once no issue was recorded.
    match (name, outdir, source, sink, state) {
        (Some(name), Some(outdir), Some(source), Some(sink), Some(state)) => Ok(PipelineSpec {
            name: PipelineId::new(name),
            outdir: PathBuf::from(outdir),
            workdir: workdir.map(PathBuf::from),
            source,
            transforms: transforms.into_iter().flatten().collect(),
            sink,
            state,
        }),
        _ => Err(ConfigError::Invalid(vec![ConfigIssue::new(
            "(root)",
            "incomplete pipeline document",
        )])),
    }
}

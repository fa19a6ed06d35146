//! Pipeline document parsing with environment variable substitution.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::types::PipelineSpec;
use crate::config::validator;
use crate::errors::ConfigError;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid env var regex"));

/// Substitute `${VAR_NAME}` patterns with environment variable values.
///
/// # Errors
///
/// Returns [`ConfigError::MissingEnv`] naming every referenced variable
/// that is not set.
pub fn substitute_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut missing = Vec::new();
    let result = ENV_VAR_RE.replace_all(input, |cap: &regex::Captures<'_>| {
        std::env::var(&cap[1]).unwrap_or_else(|_| {
            if !missing.iter().any(|m| m == &cap[1]) {
                missing.push(cap[1].to_string());
            }
            String::new()
        })
    });

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnv(missing));
    }
    Ok(result.into_owned())
}

/// Parse and validate a pipeline document (YAML, or JSON as a YAML subset).
///
/// Relative paths are left as written.
///
/// # Errors
///
/// Returns a [`ConfigError`] if substitution, parsing or validation fails.
pub fn parse_pipeline_str(text: &str) -> Result<PipelineSpec, ConfigError> {
    let substituted = substitute_env_vars(text)?;
    let document: serde_json::Value = serde_yaml::from_str(&substituted)?;
    validator::validate_document(&document)
}

/// Parse a pipeline file. Relative `outdir`, `workdir` and `state.path`
/// are resolved against the directory containing the file.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or is invalid.
pub fn load_pipeline(path: &Path) -> Result<PipelineSpec, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut spec = parse_pipeline_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    spec.anchor_paths(base);
    tracing::debug!(
        pipeline = spec.name.as_str(),
        path = %path.display(),
        transforms = spec.transforms.len(),
        "Pipeline document loaded"
    );
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ADP_TEST_OUTDIR", "/data/out");
        let input = "outdir: ${ADP_TEST_OUTDIR}\nname: p";
        let result = substitute_env_vars(input).unwrap();
        assert!(result.contains("/data/out"));
        assert!(!result.contains("${ADP_TEST_OUTDIR}"));
        std::env::remove_var("ADP_TEST_OUTDIR");
    }

    #[test]
    fn test_multiple_env_vars() {
        std::env::set_var("ADP_TEST_A", "alpha");
        std::env::set_var("ADP_TEST_B", "beta");
        let result = substitute_env_vars("${ADP_TEST_A} and ${ADP_TEST_B}").unwrap();
        assert_eq!(result, "alpha and beta");
        std::env::remove_var("ADP_TEST_A");
        std::env::remove_var("ADP_TEST_B");
    }

    #[test]
    fn test_no_env_vars_passthrough() {
        let input = "name: p\noutdir: out";
        assert_eq!(substitute_env_vars(input).unwrap(), input);
    }

    #[test]
    fn test_multiple_missing_env_vars_all_reported() {
        let err = substitute_env_vars("${ADP_MISSING_X} ${ADP_MISSING_Y} ${ADP_MISSING_X}")
            .unwrap_err();
        match err {
            ConfigError::MissingEnv(vars) => {
                assert_eq!(vars, vec!["ADP_MISSING_X", "ADP_MISSING_Y"]);
            }
            other => panic!("expected MissingEnv, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_pipeline_from_string() {
        std::env::set_var("ADP_TEST_INPUT", "rows.ndjson");
        let yaml = r#"
name: alerts
outdir: out
source:
  class: file:ndjson
  params:
    path: ${ADP_TEST_INPUT}
transforms:
  - class: record:select
    params:
      fields: [id, title]
sink:
  class: file:csv
"#;
        let spec = parse_pipeline_str(yaml).unwrap();
        assert_eq!(spec.name.as_str(), "alerts");
        assert_eq!(spec.source.params["path"], "rows.ndjson");
        assert_eq!(spec.transforms.len(), 1);
        assert!(spec.sink.params.is_empty());
        std::env::remove_var("ADP_TEST_INPUT");
    }

    #[test]
    fn test_json_document_accepted() {
        let json = r#"{"name": "p", "outdir": "o",
            "source": {"class": "mem:two_rows"}, "sink": {"class": "mem:collect"}}"#;
        let spec = parse_pipeline_str(json).unwrap();
        assert_eq!(spec.source.class.as_str(), "mem:two_rows");
    }

    #[test]
    fn test_parse_invalid_yaml_errors() {
        let err = parse_pipeline_str("this is not: [valid: yaml: {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax(_)));
    }

    #[test]
    fn test_parse_pipeline_file_not_found() {
        let err = load_pipeline(Path::new("/nonexistent/pipeline.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read pipeline file"));
    }

    #[test]
    fn test_load_anchors_relative_outdir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "name: p\noutdir: out\nsource: {class: \"a:b\"}\nsink: {class: \"c:d\"}\n",
        )
        .unwrap();
        let spec = load_pipeline(&path).unwrap();
        assert_eq!(spec.outdir, dir.path().join("out"));
        assert_eq!(spec.workdir, None::<PathBuf>);
    }
}

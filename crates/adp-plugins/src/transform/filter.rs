//! `record:filter`: keep records whose field matches a regular expression.

use adp_sdk::prelude::*;
use regex::Regex;
use serde::Deserialize;

use crate::config::PluginConfig;

pub const NAME: &str = "record:filter";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub field: String,
    pub pattern: String,
    /// Keep non-matching records instead.
    #[serde(default)]
    pub invert: bool,
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Regex Filter Config",
  "type": "object",
  "required": ["field", "pattern"],
  "properties": {
    "field": { "type": "string", "minLength": 1 },
    "pattern": { "type": "string", "minLength": 1 },
    "invert": { "type": "boolean" }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        compile(&self.pattern).map(|_| ())
    }
}

fn compile(pattern: &str) -> Result<Regex, PluginError> {
    Regex::new(pattern).map_err(|e| {
        PluginError::config("INVALID_PATTERN", format!("invalid pattern '{pattern}': {e}"))
    })
}

pub struct Filter {
    field: String,
    pattern: Regex,
    invert: bool,
}

impl Filter {
    pub fn new(config: Config) -> Result<Self, PluginError> {
        Ok(Self {
            pattern: compile(&config.pattern)?,
            field: config.field,
            invert: config.invert,
        })
    }

    /// Strings match on their contents, other values on their JSON text.
    /// Missing and null fields never match.
    fn matches(&self, record: &Record) -> bool {
        match record.get(&self.field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => self.pattern.is_match(s),
            Some(other) => self.pattern.is_match(&other.to_string()),
        }
    }
}

impl Transform for Filter {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.filter_records(move |record| Ok(self.matches(record) != self.invert))
    }
}

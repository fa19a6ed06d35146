//! `file:json`: a single JSON array.

use adp_sdk::prelude::*;
use serde::Deserialize;

use super::{write_framed, Framing};
use crate::config::{validate_filename, PluginConfig};

pub const NAME: &str = "file:json";

const FRAMING: Framing = Framing {
    open: "[",
    first: "\n  ",
    separator: ",\n  ",
    tail: "\n",
    close: "]\n",
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_filename() -> String {
    "out.json".to_string()
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "JSON Array File Sink Config",
  "type": "object",
  "properties": {
    "filename": { "type": "string", "minLength": 1, "default": "out.json" }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        validate_filename(&self.filename)
    }
}

/// One record per line inside the array, so large outputs stay diffable.
pub struct JsonArraySink {
    config: Config,
}

impl JsonArraySink {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Sink for JsonArraySink {
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        write_framed(ctx, &self.config.filename, input, &FRAMING, Value::Object)
    }
}

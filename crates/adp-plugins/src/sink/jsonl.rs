//! `file:jsonl`: newline-delimited JSON.

use adp_sdk::prelude::*;
use serde::Deserialize;

use super::{write_framed, Framing};
use crate::config::{validate_filename, PluginConfig};

pub const NAME: &str = "file:jsonl";

const FRAMING: Framing = Framing {
    open: "",
    first: "",
    separator: "\n",
    tail: "\n",
    close: "",
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_filename() -> String {
    "out.ndjson".to_string()
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "NDJSON File Sink Config",
  "type": "object",
  "properties": {
    "filename": { "type": "string", "minLength": 1, "default": "out.ndjson" }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        validate_filename(&self.filename)
    }
}

pub struct JsonLinesSink {
    config: Config,
}

impl JsonLinesSink {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Sink for JsonLinesSink {
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        write_framed(ctx, &self.config.filename, input, &FRAMING, Value::Object)
    }
}

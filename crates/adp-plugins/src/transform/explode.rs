//! `record:explode`: one output record per element of a sequence field.

use adp_sdk::prelude::*;
use serde::Deserialize;

use crate::config::PluginConfig;

pub const NAME: &str = "record:explode";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub field: String,
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Explode Config",
  "type": "object",
  "required": ["field"],
  "properties": {
    "field": { "type": "string", "minLength": 1 }
  },
  "additionalProperties": false
}"##;
}

/// Records whose field is not a sequence pass through unchanged; an empty
/// sequence drops the record.
pub struct Explode {
    field: String,
}

impl Explode {
    pub fn new(config: Config) -> Self {
        Self {
            field: config.field,
        }
    }
}

impl Transform for Explode {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.flat_map_records(move |mut record| {
            let items = match record.get_mut(&self.field) {
                Some(Value::Array(items)) => std::mem::take(items),
                _ => return Ok(vec![record]),
            };
            Ok(items
                .into_iter()
                .map(|item| {
                    let mut out = record.clone();
                    out.insert(self.field.clone(), item);
                    out
                })
                .collect())
        })
    }
}

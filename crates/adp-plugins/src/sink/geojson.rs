//! `file:geojson`: a GeoJSON FeatureCollection.
//!
//! The geometry field is lifted out of each record; the remaining fields
//! become the feature's properties.

use adp_sdk::prelude::*;
use serde::Deserialize;
use serde_json::json;

use super::{write_framed, Framing};
use crate::config::{validate_filename, PluginConfig};

pub const NAME: &str = "file:geojson";

const FRAMING: Framing = Framing {
    open: "{\"type\":\"FeatureCollection\",\"features\":[",
    first: "\n",
    separator: ",\n",
    tail: "\n",
    close: "]}\n",
};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_geometry_field")]
    pub geometry_field: String,
}

fn default_filename() -> String {
    "out.geojson".to_string()
}

fn default_geometry_field() -> String {
    "_geometry".to_string()
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "GeoJSON File Sink Config",
  "type": "object",
  "properties": {
    "filename": { "type": "string", "minLength": 1, "default": "out.geojson" },
    "geometry_field": { "type": "string", "minLength": 1, "default": "_geometry" }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        validate_filename(&self.filename)
    }
}

pub struct GeoJsonSink {
    config: Config,
}

impl GeoJsonSink {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

/// Records without a geometry get `"geometry": null`.
fn to_feature(mut record: Record, geometry_field: &str) -> Value {
    let geometry = record.get(geometry_field).cloned().unwrap_or(Value::Null);
    record.retain(|key, _| key != geometry_field);
    json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": Value::Object(record),
    })
}

impl Sink for GeoJsonSink {
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let field = self.config.geometry_field.as_str();
        write_framed(ctx, &self.config.filename, input, &FRAMING, |record| {
            to_feature(record, field)
        })
    }
}

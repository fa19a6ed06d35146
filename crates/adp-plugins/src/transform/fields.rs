//! Field-shaping transforms: `record:rename`, `record:select`, `record:drop`.

use std::collections::{BTreeMap, BTreeSet};

use adp_sdk::prelude::*;
use serde::Deserialize;

use crate::config::PluginConfig;

pub const RENAME: &str = "record:rename";
pub const SELECT: &str = "record:select";
pub const DROP: &str = "record:drop";

const FIELD_LIST_SCHEMA: &str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "type": "object",
  "required": ["fields"],
  "properties": {
    "fields": {
      "type": "array",
      "minItems": 1,
      "items": { "type": "string", "minLength": 1 }
    }
  },
  "additionalProperties": false
}"##;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameConfig {
    /// Old name → new name.
    pub fields: BTreeMap<String, String>,
}

impl PluginConfig for RenameConfig {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Rename Fields Config",
  "type": "object",
  "required": ["fields"],
  "properties": {
    "fields": {
      "type": "object",
      "minProperties": 1,
      "additionalProperties": { "type": "string", "minLength": 1 }
    }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        let mut targets = BTreeSet::new();
        for target in self.fields.values() {
            if !targets.insert(target) {
                return Err(PluginError::config(
                    "DUPLICATE_TARGET",
                    format!("more than one field is renamed to '{target}'"),
                ));
            }
        }
        Ok(())
    }
}

/// Renames fields in place. A renamed field replaces any existing field of
/// the same name and takes the position of the field it was renamed from.
pub struct Rename {
    fields: BTreeMap<String, String>,
    /// New name → old name.
    sources: BTreeMap<String, String>,
}

impl Rename {
    pub fn new(config: RenameConfig) -> Self {
        let sources = config
            .fields
            .iter()
            .map(|(from, to)| (to.clone(), from.clone()))
            .collect();
        Self {
            fields: config.fields,
            sources,
        }
    }

    /// Fields of `record` that a rename will replace.
    fn shadowed(&self, record: &Record) -> BTreeSet<String> {
        self.sources
            .iter()
            .filter(|(to, from)| !self.fields.contains_key(*to) && record.contains_key(*from))
            .map(|(to, _)| to.clone())
            .collect()
    }
}

impl Transform for Rename {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(move |record| {
            let shadowed = self.shadowed(&record);
            Ok(record
                .into_iter()
                .filter(|(key, _)| !shadowed.contains(key))
                .map(|(key, value)| match self.fields.get(&key) {
                    Some(renamed) => (renamed.clone(), value),
                    None => (key, value),
                })
                .collect())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldList {
    pub fields: Vec<String>,
}

impl PluginConfig for FieldList {
    const SCHEMA_JSON: &'static str = FIELD_LIST_SCHEMA;
}

/// Projects records onto `fields`. Absent fields are omitted.
pub struct Select {
    fields: Vec<String>,
}

impl Select {
    pub fn new(config: FieldList) -> Self {
        Self {
            fields: config.fields,
        }
    }
}

impl Transform for Select {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(move |mut record| {
            let mut out = Record::new();
            for field in &self.fields {
                if let Some(value) = record.remove(field) {
                    out.insert(field.clone(), value);
                }
            }
            Ok(out)
        })
    }
}

pub struct DropFields {
    fields: BTreeSet<String>,
}

impl DropFields {
    pub fn new(config: FieldList) -> Self {
        Self {
            fields: config.fields.into_iter().collect(),
        }
    }
}

impl Transform for DropFields {
    fn apply<'a>(&'a self, _ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a> {
        input.map_records(move |mut record| {
            record.retain(|key, _| !self.fields.contains(key));
            Ok(record)
        })
    }
}

//! `file:csv`: delimited text with a header row.
//!
//! The header is the union of all record keys in first-seen order, so the
//! whole stream is buffered before anything is written.

use adp_sdk::prelude::*;
use serde::Deserialize;

use super::union_columns;
use crate::config::{validate_filename, PluginConfig};

pub const NAME: &str = "file:csv";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

fn default_filename() -> String {
    "out.csv".to_string()
}

fn default_delimiter() -> String {
    ",".to_string()
}

impl Config {
    fn delimiter_byte(&self) -> Result<u8, PluginError> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(PluginError::config(
                "INVALID_DELIMITER",
                format!(
                    "delimiter must be a single ASCII character, got '{}'",
                    self.delimiter
                ),
            )),
        }
    }
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "CSV File Sink Config",
  "type": "object",
  "properties": {
    "filename": { "type": "string", "minLength": 1, "default": "out.csv" },
    "delimiter": { "type": "string", "minLength": 1, "maxLength": 1, "default": "," }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        validate_filename(&self.filename)?;
        self.delimiter_byte().map(|_| ())
    }
}

pub struct CsvSink {
    config: Config,
}

impl CsvSink {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

/// Strings verbatim, null/missing empty, everything else as JSON text.
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn csv_error(e: csv::Error) -> PluginError {
    PluginError::io("CSV_WRITE_FAILED", e.to_string())
}

impl Sink for CsvSink {
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let records = input.collect_records()?;
        let columns = union_columns(&records);

        let mut artifact = AtomicArtifact::create(ctx.output_path(&self.config.filename))?;
        {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(self.config.delimiter_byte()?)
                .from_writer(&mut artifact);
            if !columns.is_empty() {
                writer.write_record(&columns).map_err(csv_error)?;
            }
            for record in &records {
                writer
                    .write_record(columns.iter().map(|c| cell(record.get(c))))
                    .map_err(csv_error)?;
            }
            writer.flush()?;
        }

        let path = artifact.commit()?;
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            columns = columns.len(),
            "Wrote CSV"
        );
        Ok(WriteSummary::new(records.len() as u64).with_path(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::testing::{ctx, failing_stream, out_entries, stream};
    use serde_json::json;
    use tempfile::TempDir;

    fn sink(delimiter: &str) -> CsvSink {
        CsvSink::new(Config {
            filename: default_filename(),
            delimiter: delimiter.into(),
        })
    }

    #[test]
    fn header_is_union_of_keys() {
        let dir = TempDir::new().unwrap();
        let summary = sink(",")
            .write(
                &ctx(&dir, NAME),
                stream(vec![
                    json!({"id": 1, "name": "a, b"}),
                    json!({"id": 2, "tags": ["x", "y"], "ok": true}),
                    json!({"name": null}),
                ]),
            )
            .unwrap();
        assert_eq!(summary.count, 3);
        let text = std::fs::read_to_string(&summary.paths[0]).unwrap();
        assert_eq!(
            text,
            "id,name,tags,ok\n\
             1,\"a, b\",,\n\
             2,,\"[\"\"x\"\",\"\"y\"\"]\",true\n\
             ,,,\n"
        );
    }

    #[test]
    fn custom_delimiter() {
        let dir = TempDir::new().unwrap();
        let summary = sink(";")
            .write(&ctx(&dir, NAME), stream(vec![json!({"a": 1, "b": 2.5})]))
            .unwrap();
        let text = std::fs::read_to_string(&summary.paths[0]).unwrap();
        assert_eq!(text, "a;b\n1;2.5\n");
    }

    #[test]
    fn multi_char_delimiter_is_rejected() {
        let config = Config {
            filename: default_filename(),
            delimiter: "||".into(),
        };
        assert_eq!(config.validate().unwrap_err().code, "INVALID_DELIMITER");
    }

    #[test]
    fn upstream_error_writes_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(sink(",").write(&ctx(&dir, NAME), failing_stream()).is_err());
        assert!(out_entries(&dir).is_empty());
    }
}

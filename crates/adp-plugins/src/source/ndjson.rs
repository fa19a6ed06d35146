//! `file:ndjson` source.
//!
//! Reads one JSON object per line. In incremental mode the outgoing state
//! is the byte length of the file at fetch time, so the next run only sees
//! lines appended since.

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Take};
use std::path::PathBuf;

use adp_sdk::prelude::*;
use serde::Deserialize;
use serde_json::json;

use crate::config::PluginConfig;

pub const NAME: &str = "file:ndjson";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub path: String,
    #[serde(default = "default_incremental")]
    pub incremental: bool,
}

fn default_incremental() -> bool {
    true
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "NDJSON File Source Config",
  "type": "object",
  "required": ["path"],
  "properties": {
    "path": { "type": "string", "minLength": 1 },
    "incremental": { "type": "boolean" }
  },
  "additionalProperties": false
}"##;
}

pub struct NdjsonSource {
    config: Config,
}

impl NdjsonSource {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl Source for NdjsonSource {
    fn fetch<'a>(
        &'a mut self,
        ctx: &StageContext,
        incoming: Option<&StateBlob>,
    ) -> Result<Fetched<'a>, PluginError> {
        let path = ctx.resolve_path(&self.config.path);
        let mut file = File::open(&path).map_err(|e| {
            PluginError::io(
                "FILE_OPEN_FAILED",
                format!("cannot open {}: {e}", path.display()),
            )
        })?;
        let len = file.metadata()?.len();

        let mut start = if self.config.incremental {
            incoming
                .and_then(|blob| blob.get("offset"))
                .and_then(Value::as_u64)
                .unwrap_or(0)
        } else {
            0
        };
        if start > len {
            tracing::warn!(
                path = %path.display(),
                offset = start,
                len,
                "File is shorter than the stored offset, reading from the start"
            );
            start = 0;
        }
        file.seek(SeekFrom::Start(start))?;
        tracing::debug!(path = %path.display(), from = start, to = len, "Reading NDJSON");

        let lines = Lines {
            reader: BufReader::new(file.take(len - start)),
            path,
            offset: start,
            buf: String::new(),
            done: false,
        };
        let fetched = Fetched::new(RecordStream::new(lines));
        Ok(if self.config.incremental {
            fetched.with_state(StateBlob::new(json!({ "offset": len })))
        } else {
            fetched
        })
    }
}

/// Lazily parsed lines of a bounded byte range.
struct Lines {
    reader: BufReader<Take<File>>,
    path: PathBuf,
    /// Absolute byte offset of the next unread line.
    offset: u64,
    buf: String,
    done: bool,
}

impl Iterator for Lines {
    type Item = Result<Record, PluginError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            let line_offset = self.offset;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => self.done = true,
                Ok(n) => {
                    self.offset += n as u64;
                    let text = self.buf.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(parse_line(text).map_err(|e| {
                        e.with_details(json!({
                            "path": self.path.display().to_string(),
                            "offset": line_offset,
                        }))
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(PluginError::io(
                        "READ_FAILED",
                        format!("cannot read {}: {e}", self.path.display()),
                    )));
                }
            }
        }
        None
    }
}

fn parse_line(text: &str) -> Result<Record, PluginError> {
    match serde_json::from_str(text)? {
        Value::Object(record) => Ok(record),
        other => Err(PluginError::data(
            "NOT_AN_OBJECT",
            format!("expected a JSON object per line, got {other}"),
        )),
    }
}

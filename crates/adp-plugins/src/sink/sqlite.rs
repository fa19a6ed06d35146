//! `file:sqlite`: write records into a table of an SQLite database.
//!
//! All statements run in one transaction. Other tables in the database are
//! left alone.

use std::path::Path;

use adp_sdk::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Transaction};
use serde::Deserialize;

use super::union_columns;
use crate::config::{validate_filename, PluginConfig};

pub const NAME: &str = "file:sqlite";

/// What to do when the table already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Replace,
    Append,
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_filename")]
    pub filename: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub if_exists: IfExists,
}

fn default_filename() -> String {
    "data.db".to_string()
}

fn default_table() -> String {
    "data".to_string()
}

impl PluginConfig for Config {
    const SCHEMA_JSON: &'static str = r##"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "SQLite Sink Config",
  "type": "object",
  "properties": {
    "filename": { "type": "string", "minLength": 1, "default": "data.db" },
    "table": { "type": "string", "minLength": 1, "default": "data" },
    "if_exists": { "type": "string", "enum": ["replace", "append", "fail"], "default": "replace" }
  },
  "additionalProperties": false
}"##;

    fn validate(&self) -> Result<(), PluginError> {
        validate_filename(&self.filename)
    }
}

pub struct SqliteSink {
    config: Config,
}

impl SqliteSink {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

fn sql_error(e: rusqlite::Error) -> PluginError {
    PluginError::io("SQLITE_WRITE_FAILED", e.to_string())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite storage class for a JSON value; nested values are stored as JSON
/// text.
fn to_sql(value: Option<&Value>) -> SqlValue {
    match value {
        None | Some(Value::Null) => SqlValue::Null,
        Some(Value::Bool(b)) => SqlValue::Integer(i64::from(*b)),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Some(Value::String(s)) => SqlValue::Text(s.clone()),
        Some(other) => SqlValue::Text(other.to_string()),
    }
}

fn existing_columns(tx: &Transaction<'_>, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = tx.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

impl SqliteSink {
    /// Prepare the table and insert every record. Runs inside `tx`.
    fn write_rows(
        &self,
        tx: &Transaction<'_>,
        records: &[Record],
        columns: &[String],
    ) -> Result<(), PluginError> {
        let table = quote_ident(&self.config.table);
        let existing = existing_columns(tx, &self.config.table).map_err(sql_error)?;
        let exists = !existing.is_empty();

        match self.config.if_exists {
            IfExists::Fail if exists => {
                return Err(PluginError::data(
                    "TABLE_EXISTS",
                    format!("table '{}' already exists", self.config.table),
                ));
            }
            IfExists::Replace if exists => {
                tx.execute(&format!("DROP TABLE {table}"), [])
                    .map_err(sql_error)?;
            }
            _ => {}
        }

        if columns.is_empty() {
            return Ok(());
        }
        if exists && self.config.if_exists == IfExists::Append {
            for column in columns.iter().filter(|c| !existing.contains(*c)) {
                tx.execute(
                    &format!("ALTER TABLE {table} ADD COLUMN {}", quote_ident(column)),
                    [],
                )
                .map_err(sql_error)?;
            }
        } else {
            let defs: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            tx.execute(&format!("CREATE TABLE {table} ({})", defs.join(", ")), [])
                .map_err(sql_error)?;
        }

        let names: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {table} ({}) VALUES ({})",
                names.join(", "),
                placeholders.join(", ")
            ))
            .map_err(sql_error)?;
        for record in records {
            stmt.execute(params_from_iter(columns.iter().map(|c| to_sql(record.get(c)))))
                .map_err(sql_error)?;
        }
        Ok(())
    }
}

fn open(path: &Path) -> Result<Connection, PluginError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            PluginError::io(
                "OUTDIR_CREATE_FAILED",
                format!("cannot create {}: {e}", parent.display()),
            )
        })?;
    }
    Connection::open(path).map_err(sql_error)
}

impl Sink for SqliteSink {
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError> {
        let records = input.collect_records()?;
        let columns = union_columns(&records);
        let path = ctx.output_path(&self.config.filename);
        let created = !path.exists();

        let mut conn = open(&path)?;
        let result = conn
            .transaction()
            .map_err(sql_error)
            .and_then(|tx| {
                self.write_rows(&tx, &records, &columns)?;
                tx.commit().map_err(sql_error)
            });
        drop(conn);

        if let Err(e) = result {
            if created {
                let _ = std::fs::remove_file(&path);
            }
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            table = %self.config.table,
            records = records.len(),
            "Wrote SQLite table"
        );
        Ok(WriteSummary::new(records.len() as u64).with_path(path))
    }
}

//! SQLite state store.
//!
//! One row per (pipeline, source) in `source_state`, one row per run in
//! `pipeline_runs`. Access is serialized through a `Mutex<Connection>`;
//! other processes sharing the file wait on the busy timeout.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use adp_types::{PipelineId, PluginName, RunStats, RunStatus, StateBlob, StateEntry};
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::backend::StateBackend;
use crate::error::{self, StateError};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS source_state (
    pipeline   TEXT    NOT NULL,
    source     TEXT    NOT NULL,
    version    INTEGER NOT NULL,
    data       TEXT    NOT NULL,
    updated_at TEXT    NOT NULL,
    PRIMARY KEY (pipeline, source)
);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    pipeline        TEXT    NOT NULL,
    source          TEXT    NOT NULL,
    status          TEXT    NOT NULL,
    started_at      TEXT    NOT NULL,
    finished_at     TEXT,
    records_read    INTEGER NOT NULL DEFAULT 0,
    records_written INTEGER NOT NULL DEFAULT 0,
    error_message   TEXT
);
";

/// RFC 3339 UTC timestamp, second precision.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct SqliteStateBackend {
    conn: Mutex<Connection>,
}

impl SqliteStateBackend {
    /// Open the database at `path`, creating it and its directory if needed.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the database cannot be
    /// opened and initialized.
    pub fn open(path: &Path) -> error::Result<Self> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)?,
            _ => {}
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %path.display(), "Opened SQLite state store");
        Self::init(conn)
    }

    /// Private in-memory database, gone when dropped.
    ///
    /// # Errors
    ///
    /// Fails if the schema cannot be created.
    pub fn in_memory() -> error::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> error::Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> error::Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StateError::LockPoisoned)
    }
}

impl StateBackend for SqliteStateBackend {
    fn load_entry(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
    ) -> error::Result<Option<StateEntry>> {
        let row: Option<(u32, String, String)> = self
            .conn()?
            .query_row(
                "SELECT version, data, updated_at FROM source_state \
                 WHERE pipeline = ?1 AND source = ?2",
                params![pipeline.as_str(), source.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        row.map(|(version, data, updated_at)| -> error::Result<StateEntry> {
            Ok(StateEntry {
                blob: StateBlob {
                    version,
                    data: serde_json::from_str(&data)?,
                },
                updated_at,
            })
        })
        .transpose()
    }

    fn save(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
        blob: &StateBlob,
    ) -> error::Result<()> {
        let data = serde_json::to_string(&blob.data)?;
        self.conn()?.execute(
            "INSERT INTO source_state (pipeline, source, version, data, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT (pipeline, source) DO UPDATE SET \
             version = excluded.version, data = excluded.data, updated_at = excluded.updated_at",
            params![pipeline.as_str(), source.as_str(), blob.version, data, timestamp()],
        )?;
        Ok(())
    }

    fn start_run(&self, pipeline: &PipelineId, source: &PluginName) -> error::Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pipeline_runs (pipeline, source, status, started_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                pipeline.as_str(),
                source.as_str(),
                RunStatus::Running.as_str(),
                timestamp()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        let read = i64::try_from(stats.records_read).unwrap_or(i64::MAX);
        let written = i64::try_from(stats.records_written).unwrap_or(i64::MAX);
        let changed = self.conn()?.execute(
            "UPDATE pipeline_runs SET status = ?2, finished_at = ?3, \
             records_read = ?4, records_written = ?5, error_message = ?6 \
             WHERE id = ?1",
            params![
                run_id,
                status.as_str(),
                timestamp(),
                read,
                written,
                stats.error_message
            ],
        )?;
        match changed {
            0 => Err(StateError::UnknownRun(run_id)),
            _ => Ok(()),
        }
    }
}

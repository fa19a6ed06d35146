//! JSON-document implementation of [`StateBackend`].
//!
//! The whole store is one human-readable JSON file. Every write re-reads the
//! file, applies the change, and atomically replaces it (temp file + rename),
//! so concurrent writers in one process never corrupt it. Writers in
//! separate processes may lose each other's updates; use the `SQLite`
//! backend for that.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use adp_types::{PipelineId, PluginName, RunStats, RunStatus, StateBlob, StateEntry};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::backend::StateBackend;
use crate::error::{self, StateError};

/// Run history entries kept in the document.
const MAX_RUN_HISTORY: usize = 50;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    states: BTreeMap<String, BTreeMap<String, StateEntry>>,
    #[serde(default)]
    runs: Vec<RunRecord>,
    #[serde(default)]
    next_run_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RunRecord {
    id: i64,
    pipeline: String,
    source: String,
    status: RunStatus,
    started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finished_at: Option<String>,
    #[serde(default)]
    stats: RunStats,
}

/// File-backed JSON state store.
pub struct JsonFileStateBackend {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStateBackend {
    /// Use `path` as the state document, creating its directory if needed.
    /// The file itself is created on the first write.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::Io`] if the directory can't be created.
    pub fn open(path: impl Into<PathBuf>) -> error::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> error::Result<MutexGuard<'_, ()>> {
        self.lock.lock().map_err(|_| StateError::LockPoisoned)
    }

    /// Read the document. A missing file is an empty store; an unreadable
    /// one is logged and treated as empty so a corrupt file never blocks a
    /// run (the next successful write replaces it).
    fn read_document(&self) -> error::Result<StateDocument> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(StateDocument::default())
            }
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file is corrupt, starting from empty state"
                );
                Ok(StateDocument::default())
            }
        }
    }

    fn write_document(&self, doc: &StateDocument) -> error::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, doc)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| StateError::Io(e.error))?;
        Ok(())
    }

    fn update<T>(&self, f: impl FnOnce(&mut StateDocument) -> error::Result<T>) -> error::Result<T> {
        let _guard = self.guard()?;
        let mut doc = self.read_document()?;
        let out = f(&mut doc)?;
        self.write_document(&doc)?;
        Ok(out)
    }

    fn now_iso() -> String {
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
    }
}

impl StateBackend for JsonFileStateBackend {
    fn load_entry(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
    ) -> error::Result<Option<StateEntry>> {
        let _guard = self.guard()?;
        let mut doc = self.read_document()?;
        Ok(doc
            .states
            .get_mut(pipeline.as_str())
            .and_then(|sources| sources.remove(source.as_str())))
    }

    fn save(
        &self,
        pipeline: &PipelineId,
        source: &PluginName,
        blob: &StateBlob,
    ) -> error::Result<()> {
        self.update(|doc| {
            doc.states
                .entry(pipeline.as_str().to_string())
                .or_default()
                .insert(
                    source.as_str().to_string(),
                    StateEntry {
                        blob: blob.clone(),
                        updated_at: Self::now_iso(),
                    },
                );
            Ok(())
        })
    }

    fn start_run(&self, pipeline: &PipelineId, source: &PluginName) -> error::Result<i64> {
        self.update(|doc| {
            doc.next_run_id += 1;
            let id = doc.next_run_id;
            doc.runs.push(RunRecord {
                id,
                pipeline: pipeline.as_str().to_string(),
                source: source.as_str().to_string(),
                status: RunStatus::Running,
                started_at: Self::now_iso(),
                finished_at: None,
                stats: RunStats::default(),
            });
            if doc.runs.len() > MAX_RUN_HISTORY {
                let excess = doc.runs.len() - MAX_RUN_HISTORY;
                doc.runs.drain(..excess);
            }
            Ok(id)
        })
    }

    fn complete_run(&self, run_id: i64, status: RunStatus, stats: &RunStats) -> error::Result<()> {
        self.update(|doc| {
            let run = doc
                .runs
                .iter_mut()
                .find(|r| r.id == run_id)
                .ok_or(StateError::UnknownRun(run_id))?;
            run.status = status;
            run.finished_at = Some(Self::now_iso());
            run.stats = stats.clone();
            Ok(())
        })
    }
}

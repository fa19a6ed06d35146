//! State backend creation from pipeline configuration.

use std::path::PathBuf;
use std::sync::Arc;

use adp_state::{JsonFileStateBackend, SqliteStateBackend, StateBackend};
use anyhow::{Context, Result};

use crate::config::{StateBackendKind, StateConfig};

/// Location of the store when `state.path` is not set:
/// `$HOME/.adp/state.db` or `$HOME/.adp/state.json`.
pub fn default_state_path(kind: StateBackendKind) -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home)
        .join(".adp")
        .join(kind.default_file_name())
}

/// Open the configured state store.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or initialized.
pub fn create_state_backend(config: &StateConfig) -> Result<Arc<dyn StateBackend>> {
    let path = config
        .path
        .clone()
        .unwrap_or_else(|| default_state_path(config.backend));
    let backend: Arc<dyn StateBackend> = match config.backend {
        StateBackendKind::Sqlite => Arc::new(
            SqliteStateBackend::open(&path)
                .with_context(|| format!("Failed to open state DB {}", path.display()))?,
        ),
        StateBackendKind::Json => Arc::new(
            JsonFileStateBackend::open(&path)
                .with_context(|| format!("Failed to open state file {}", path.display()))?,
        ),
    };
    tracing::debug!(
        backend = config.backend.as_str(),
        path = %path.display(),
        "State backend opened"
    );
    Ok(backend)
}

/// Whether the configured store can be opened; logs the outcome.
pub(crate) fn check_state_backend(config: &StateConfig) -> bool {
    match create_state_backend(config) {
        Ok(_) => {
            tracing::info!("State backend: OK");
            true
        }
        Err(e) => {
            tracing::error!("State backend: FAILED: {:#}", e);
            false
        }
    }
}

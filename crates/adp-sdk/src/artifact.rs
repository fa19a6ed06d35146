//! Atomic output artifacts.
//!
//! Sinks write into a temporary file created next to the target and rename
//! it into place on [`AtomicArtifact::commit`]. Dropping an uncommitted
//! artifact removes the temporary file, so a failed write never leaves a
//! truncated artifact in the output directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use adp_types::PluginError;

/// Temporary file that becomes `target` when committed.
#[derive(Debug)]
pub struct AtomicArtifact {
    target: PathBuf,
    temp: NamedTempFile,
}

impl AtomicArtifact {
    /// Create the staging file in the target's directory, creating the
    /// directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if the directory or temp file can't be created.
    pub fn create(target: impl Into<PathBuf>) -> Result<Self, PluginError> {
        let target = target.into();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            PluginError::io(
                "OUTDIR_CREATE_FAILED",
                format!("cannot create {}: {e}", dir.display()),
            )
        })?;
        let temp = tempfile::Builder::new()
            .prefix(".adp-")
            .suffix(".partial")
            .tempfile_in(&dir)
            .map_err(|e| {
                PluginError::io(
                    "TEMPFILE_FAILED",
                    format!("cannot stage artifact in {}: {e}", dir.display()),
                )
            })?;
        Ok(Self { target, temp })
    }

    /// Final location of the artifact.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the staging file, for writers that need to open it by name.
    pub fn staging_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn file(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    /// Flush to disk and rename the staging file over the target.
    ///
    /// # Errors
    ///
    /// Returns an `Io` error if syncing or renaming fails; the staging file
    /// is removed in that case.
    pub fn commit(self) -> Result<PathBuf, PluginError> {
        self.temp.as_file().sync_all()?;
        let Self { target, temp } = self;
        temp.persist(&target).map_err(|e| {
            PluginError::io(
                "PERSIST_FAILED",
                format!("cannot move artifact into {}: {}", target.display(), e.error),
            )
        })?;
        tracing::debug!(path = %target.display(), "Artifact committed");
        Ok(target)
    }
}

impl Write for AtomicArtifact {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.temp.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.temp.flush()
    }
}

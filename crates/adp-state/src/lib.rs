//! Incremental state persistence for adp pipelines.
//!
//! Provides the [`StateBackend`] trait plus a [`SqliteStateBackend`] and a
//! [`JsonFileStateBackend`] implementation. State is keyed by
//! (pipeline name, source plugin name) and overwritten last-write-wins.

#![warn(clippy::pedantic)]

pub mod backend;
pub mod error;
pub mod json_file;
pub mod sqlite;

pub use backend::StateBackend;
pub use error::StateError;
pub use json_file::JsonFileStateBackend;
pub use sqlite::SqliteStateBackend;

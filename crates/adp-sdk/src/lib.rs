//! Plugin authoring SDK for adp pipelines.
//!
//! Plugins implement one of the three capability traits in [`connector`]
//! and exchange records through single-pass [`RecordStream`]s.

pub mod artifact;
pub mod connector;
pub mod context;
pub mod params;
pub mod prelude;
pub mod stream;

pub use adp_types as types;
pub use stream::RecordStream;
pub use connector::{Fetched, Sink, Source, Transform};
pub use context::StageContext;

//! Capability traits implemented by plugins.
//!
//! Parameters are bound when a plugin is constructed, so the trait methods
//! only receive the per-run inputs.

use adp_types::{PluginError, StateBlob, WriteSummary};

use crate::context::StageContext;
use crate::stream::RecordStream;

/// Records produced by a source plus the state it wants persisted.
#[derive(Debug)]
pub struct Fetched<'a> {
    pub records: RecordStream<'a>,
    /// Outgoing incremental state. `None` leaves the stored state untouched.
    pub state: Option<StateBlob>,
}

impl<'a> Fetched<'a> {
    pub fn new(records: RecordStream<'a>) -> Self {
        Self {
            records,
            state: None,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: StateBlob) -> Self {
        self.state = Some(state);
        self
    }
}

/// Produces the initial record sequence of a pipeline.
pub trait Source: Send {
    /// Start fetching. `incoming` is the state persisted by the last
    /// successful run, or `None` on the first run.
    ///
    /// The returned state must be either a complete new state or the
    /// unchanged incoming one; it is persisted only after the sink succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`PluginError`] if fetching cannot start. Failures while
    /// the stream is being consumed are yielded as `Err` items.
    fn fetch<'a>(
        &'a mut self,
        ctx: &StageContext,
        incoming: Option<&StateBlob>,
    ) -> Result<Fetched<'a>, PluginError>;

    /// Schema version of the state blobs this source writes.
    ///
    /// A stored blob with a different version is not handed to [`fetch`].
    ///
    /// [`fetch`]: Source::fetch
    fn state_version(&self) -> u32 {
        1
    }
}

/// Maps one record sequence to another (1:0, 1:1 or 1:N per input record).
///
/// Takes `&self` so output depends only on the input and the bound
/// parameters.
pub trait Transform: Send {
    fn apply<'a>(&'a self, ctx: &StageContext, input: RecordStream<'a>) -> RecordStream<'a>;
}

/// Consumes a record sequence and durably writes it.
pub trait Sink: Send {
    /// Write every record of `input`.
    ///
    /// Either the declared artifact is fully written and a summary returned,
    /// or an error is returned and no partial artifact is left behind.
    /// `Err` items from `input` must be propagated, not skipped.
    ///
    /// # Errors
    ///
    /// Returns the first upstream error, or the sink's own failure.
    fn write(
        &mut self,
        ctx: &StageContext,
        input: RecordStream<'_>,
    ) -> Result<WriteSummary, PluginError>;
}

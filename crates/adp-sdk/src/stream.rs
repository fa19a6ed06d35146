//! Single-pass lazy record sequences.
//!
//! A [`RecordStream`] is consumed by value: once a stage hands its output to
//! the next stage it cannot iterate it again. Errors travel inside the
//! stream as `Err` items so a failure deep in a lazy chain still surfaces at
//! the point where the sink pulls the offending record.

use std::fmt;

use adp_types::{PluginError, Record};

/// Item yielded by a [`RecordStream`].
pub type RecordResult = Result<Record, PluginError>;

/// Finite, single-pass, non-restartable lazy sequence of records.
pub struct RecordStream<'a> {
    inner: Box<dyn Iterator<Item = RecordResult> + 'a>,
}

impl<'a> RecordStream<'a> {
    /// Wrap any iterator of record results.
    pub fn new<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = RecordResult>,
        I::IntoIter: 'a,
    {
        Self {
            inner: Box::new(iter.into_iter()),
        }
    }

    /// Stream over records that cannot fail.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        Self::new(records.into_iter().map(Ok))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    /// 1:1 mapping. Upstream errors pass through untouched.
    #[must_use]
    pub fn map_records<F>(self, mut f: F) -> Self
    where
        F: FnMut(Record) -> RecordResult + 'a,
    {
        Self::new(self.inner.map(move |item| item.and_then(&mut f)))
    }

    /// 1:0-or-1 filtering. Upstream errors pass through untouched.
    #[must_use]
    pub fn filter_records<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&Record) -> Result<bool, PluginError> + 'a,
    {
        Self::new(self.inner.filter_map(move |item| match item {
            Ok(record) => match keep(&record) {
                Ok(true) => Some(Ok(record)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        }))
    }

    /// 1:N expansion. Upstream errors pass through untouched.
    #[must_use]
    pub fn flat_map_records<F, I>(self, mut f: F) -> Self
    where
        F: FnMut(Record) -> Result<I, PluginError> + 'a,
        I: IntoIterator<Item = Record>,
        I::IntoIter: 'a,
    {
        Self::new(self.inner.flat_map(
            move |item| -> Box<dyn Iterator<Item = RecordResult> + 'a> {
                match item.and_then(&mut f) {
                    Ok(records) => Box::new(records.into_iter().map(Ok)),
                    Err(e) => Box::new(std::iter::once(Err(e))),
                }
            },
        ))
    }

    /// Drain the stream, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first `Err` item encountered.
    pub fn collect_records(self) -> Result<Vec<Record>, PluginError> {
        self.collect()
    }
}

impl Iterator for RecordStream<'_> {
    type Item = RecordResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl fmt::Debug for RecordStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordStream").finish_non_exhaustive()
    }
}

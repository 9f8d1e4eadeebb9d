//!
//! A single node's own timeline: a strictly time-ordered sequence of entries.
//!
//! This is the storage behind one node of a [`TimelineTree`](crate::tree::TimelineTree).
//! Times are strictly increasing and unique within one timeline; ordering is
//! enforced on every insertion. Positions within a timeline are expressed by
//! [`Position`], whose `End` value doubles as the fork-point sentinel meaning
//! "after the last currently-known entry".

use thiserror::Error;

use crate::entry::TimelineEntry;

/// A location within one node's own timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    /// The entry at this index.
    At(usize),
    /// One past the last entry. As a fork reference this is the sentinel for
    /// "forked after the last currently-known entry of the parent".
    End,
}

impl Position {
    /// Whether this is the end position.
    pub fn is_end(&self) -> bool {
        matches!(self, Position::End)
    }
}

/// Ordering errors raised when inserting into a timeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum TimelineError {
    /// The entry does not come strictly after the relevant bound
    /// (the last entry for appends, the fork time for a first entry).
    #[error("entry time {time} is not after {bound}")]
    NotAfter {
        /// The bound the entry had to exceed.
        bound: String,
        /// The offending entry time.
        time: String,
    },

    /// The entry does not come strictly before the first entry.
    #[error("entry time {time} is not before {bound}")]
    NotBefore {
        /// The bound the entry had to precede.
        bound: String,
        /// The offending entry time.
        time: String,
    },
}

impl From<TimelineError> for crate::Error {
    fn from(err: TimelineError) -> Self {
        crate::Error::Timeline(err)
    }
}

/// One node's own ordered sequence of entries.
#[derive(Debug, Clone)]
pub struct Timeline<E> {
    entries: Vec<E>,
}

impl<E: TimelineEntry> Timeline<E> {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&E> {
        self.entries.get(index)
    }

    /// The first entry, if any.
    pub fn first(&self) -> Option<&E> {
        self.entries.first()
    }

    /// The last entry, if any.
    pub fn last(&self) -> Option<&E> {
        self.entries.last()
    }

    /// All entries, in time order.
    pub fn entries(&self) -> &[E] {
        &self.entries
    }

    /// Iterates over the entries in time order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Appends an entry. Its time must come strictly after the last entry.
    pub fn push(&mut self, entry: E) -> Result<(), TimelineError> {
        if let Some(last) = self.entries.last() {
            if entry.time() <= last.time() {
                return Err(TimelineError::NotAfter {
                    bound: format!("{:?}", last.time()),
                    time: format!("{:?}", entry.time()),
                });
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Inserts an entry before the first one. Its time must come strictly
    /// before the current first entry.
    pub fn push_front(&mut self, entry: E) -> Result<(), TimelineError> {
        if let Some(first) = self.entries.first() {
            if entry.time() >= first.time() {
                return Err(TimelineError::NotBefore {
                    bound: format!("{:?}", first.time()),
                    time: format!("{:?}", entry.time()),
                });
            }
        }
        self.entries.insert(0, entry);
        Ok(())
    }

    /// Removes and returns the first entry.
    pub fn pop_front(&mut self) -> Option<E> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Drops every entry strictly after `time`.
    pub fn truncate_after(&mut self, time: E::Time) {
        let keep = self.entries.partition_point(|e| e.time() <= time);
        self.entries.truncate(keep);
    }

    /// Drops every entry strictly before `time`. Returns how many were
    /// removed.
    pub fn truncate_before(&mut self, time: E::Time) -> usize {
        let drop = self.entries.partition_point(|e| e.time() < time);
        self.entries.drain(..drop);
        drop
    }

    /// The position of the entry at exactly `time`, or `End` if absent.
    pub fn find(&self, time: E::Time) -> Position {
        match self
            .entries
            .binary_search_by(|e| e.time().cmp(&time))
        {
            Ok(index) => Position::At(index),
            Err(_) => Position::End,
        }
    }

    /// The position of the first entry with time at or after `time`, or
    /// `End` if there is none.
    pub fn lower_bound(&self, time: E::Time) -> Position {
        let index = self.entries.partition_point(|e| e.time() < time);
        if index == self.entries.len() {
            Position::End
        } else {
            Position::At(index)
        }
    }

    /// The time at `position`, if it denotes an entry.
    pub fn time_at(&self, position: Position) -> Option<E::Time> {
        match position {
            Position::At(index) => self.entries.get(index).map(|e| e.time()),
            Position::End => None,
        }
    }
}

impl<E: TimelineEntry> Default for Timeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

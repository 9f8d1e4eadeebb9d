//!
//! The element contract for timelines, and a ready-made element type.
//!
//! A timeline stores opaque entries; the tree never interprets their
//! contents. The only thing it requires is a totally ordered time key,
//! expressed by the [`TimelineEntry`] trait. Callers with their own element
//! types implement the trait; everyone else can use [`Event`].

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// Contract for the elements stored in a timeline.
///
/// The tree orders, stores, and branches entries purely by their time key.
/// Payload contents are never inspected.
pub trait TimelineEntry {
    /// The totally ordered time key of an entry.
    type Time: Copy + Ord + Debug;

    /// The time at which this entry occurs.
    fn time(&self) -> Self::Time;
}

/// A minimal `(time, payload)` entry.
///
/// # Example
///
/// ```
/// use chronotree::{Event, TimelineEntry};
///
/// let event = Event::new(3, "ignition");
/// assert_eq!(event.time(), 3);
/// assert_eq!(event.payload, "ignition");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event<T, P> {
    /// The time key.
    pub time: T,
    /// The payload carried at that time.
    pub payload: P,
}

impl<T, P> Event<T, P> {
    /// Creates an entry occurring at `time` carrying `payload`.
    pub fn new(time: T, payload: P) -> Self {
        Self { time, payload }
    }
}

impl<T: Copy + Ord + Debug, P> TimelineEntry for Event<T, P> {
    type Time = T;

    fn time(&self) -> T {
        self.time
    }
}

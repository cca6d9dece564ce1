//! Log-level coordination of writers, readers and archivers.
//!
//! This module wraps the range algebra in the three client roles a
//! timeseries log serves:
//!
//! - **writers** extend the log through [`TimeseriesLog::append`] without
//!   being blocked by readers or archivers;
//! - **readers** take a [`TimeseriesLog::snapshot`], a sorted deduplicated
//!   view of everything accepted before the call;
//! - **archivers** call [`TimeseriesLog::archive`] to carve off a sorted
//!   prefix for persistent storage elsewhere and truncate it from the
//!   in-memory view, recovering its memory.
//!
//! Writes land in a mutable head range. When the head reaches the
//! configured snapshot threshold (or a snapshot is requested) it is frozen
//! and merged into the accumulated view; the merge is lazy, so rolling the
//! head is cheap regardless of how much of the view readers have
//! materialized.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::error::Result;
use crate::range::{empty, merge, Element, MutableRange, Order, Range, SortedRangeRef};

/// Default number of elements accepted into the head before `append`
/// rolls it into the view.
pub const DEFAULT_SNAPSHOT_THRESHOLD: usize = 4096;

/// Configuration for a timeseries log.
#[derive(Debug, Clone)]
pub struct TslConfig {
    /// Number of elements accepted into the writable head before `append`
    /// rolls it into the sorted view. Default: 4096.
    pub snapshot_threshold: usize,
}

impl Default for TslConfig {
    fn default() -> Self {
        Self {
            snapshot_threshold: DEFAULT_SNAPSHOT_THRESHOLD,
        }
    }
}

impl TslConfig {
    /// Creates a configuration with a custom snapshot threshold.
    pub fn with_snapshot_threshold(mut self, threshold: usize) -> Self {
        self.snapshot_threshold = threshold;
        self
    }
}

/// Activity counters for a timeseries log.
#[derive(Debug, Default)]
pub struct TslStats {
    /// Total elements accepted.
    pub appended: AtomicU64,
    /// Number of head ranges frozen and merged into the view.
    pub snapshots: AtomicU64,
    /// Number of archive truncations.
    pub archives: AtomicU64,
}

impl TslStats {
    /// Total elements accepted.
    pub fn appended(&self) -> u64 {
        self.appended.load(Ordering::Relaxed)
    }

    /// Number of head ranges frozen and merged into the view.
    pub fn snapshots(&self) -> u64 {
        self.snapshots.load(Ordering::Relaxed)
    }

    /// Number of archive truncations.
    pub fn archives(&self) -> u64 {
        self.archives.load(Ordering::Relaxed)
    }
}

/// An in-memory timeseries log with decoupled writer, reader and archiver
/// roles.
pub struct TimeseriesLog<T: Element> {
    config: TslConfig,
    stats: TslStats,
    inner: Mutex<LogState<T>>,
}

struct LogState<T: Element> {
    head: MutableRange<T>,
    view: SortedRangeRef<T>,
}

impl<T: Element> TimeseriesLog<T> {
    /// Creates an empty log with the given configuration.
    pub fn new(config: TslConfig) -> Self {
        Self {
            config,
            stats: TslStats::default(),
            inner: Mutex::new(LogState {
                head: MutableRange::new(),
                view: empty(),
            }),
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &TslConfig {
        &self.config
    }

    /// Returns the activity counters.
    pub fn stats(&self) -> &TslStats {
        &self.stats
    }

    fn lock(&self) -> MutexGuard<'_, LogState<T>> {
        self.inner.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Freezes the head and merges it into the view. No-op for an empty
    /// head.
    fn roll(&self, state: &mut LogState<T>) {
        if state.head.limit() == 0 {
            return;
        }
        let head = std::mem::replace(&mut state.head, MutableRange::new());
        let frozen = head.freeze();
        state.view = merge(state.view.clone(), frozen);
        self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
        debug!(view_limit = state.view.limit(), "rolled head into view");
    }

    /// Appends elements to the log.
    ///
    /// The head is rolled into the view automatically once it reaches the
    /// configured snapshot threshold.
    ///
    /// # Errors
    ///
    /// Propagates [`crate::TslError::AlreadyFrozen`] from the head range;
    /// this cannot occur through this interface because the head is
    /// replaced under the same lock that freezes it.
    pub fn append(&self, elements: &[T]) -> Result<()> {
        let mut state = self.lock();
        state.head.add(elements)?;
        self.stats
            .appended
            .fetch_add(elements.len() as u64, Ordering::Relaxed);
        if state.head.limit() >= self.config.snapshot_threshold {
            self.roll(&mut state);
        }
        Ok(())
    }

    /// Returns a sorted, deduplicated view of everything appended before
    /// this call, rolling the head if it holds any elements.
    pub fn snapshot(&self) -> SortedRangeRef<T> {
        let mut state = self.lock();
        self.roll(&mut state);
        state.view.clone()
    }

    /// Returns the view as of the last roll, without freezing the current
    /// head. Elements still in the head are not visible.
    pub fn view(&self) -> SortedRangeRef<T> {
        self.lock().view.clone()
    }

    /// Splits the log at `pivot` under `order`: the left part is returned
    /// for archiving and truncated from the in-memory view, the right part
    /// is retained. Includes the current head contents.
    pub fn archive(&self, pivot: &T, order: Order<T>) -> SortedRangeRef<T> {
        let mut state = self.lock();
        self.roll(&mut state);
        let (archived, retained) = state.view.partition(pivot, order);
        state.view = retained;
        self.stats.archives.fetch_add(1, Ordering::Relaxed);
        debug!(
            archived_limit = archived.limit(),
            retained_limit = state.view.limit(),
            "archived log prefix"
        );
        archived
    }
}

impl<T: Element> Default for TimeseriesLog<T> {
    fn default() -> Self {
        Self::new(TslConfig::default())
    }
}

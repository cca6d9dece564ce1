//! Tslog - an in-memory timeseries log.
//!
//! A timeseries log lets writers extend the log without being blocked by
//! readers who need a sorted, deduplicated view of everything accepted
//! before their read began, or by archivers who copy and truncate portions
//! of the log to recover memory.
//!
//! The heart of the crate is a small algebra of immutable, composable,
//! lazily-evaluated sorted ranges:
//!
//! - [`MutableRange`]: the writable head; a sorted tail plus a spillover
//!   buffer for out-of-order arrivals, frozen once into a sorted range
//! - [`merge`]: combines two sorted ranges, streaming non-overlapping
//!   extents directly and lazily merging only the overlap
//! - [`SortedRange::partition`]: O(log n) split at a pivot under a
//!   caller-chosen total order, sharing storage with the original
//! - [`TimeseriesLog`]: coordination of the writer, reader and archiver
//!   roles on top of the algebra
//!
//! # Example
//!
//! ```rust,ignore
//! use tslog::{as_vec, MutableRange};
//!
//! let range = MutableRange::new();
//! range.add(&[2i64, 0, 1])?;
//!
//! // Freezing yields a sorted, deduplicated view.
//! let sorted = range.freeze();
//! assert_eq!(as_vec(sorted.as_ref()), vec![0, 1, 2]);
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod log;
pub mod range;

pub use error::{Result, TslError};
pub use log::{TimeseriesLog, TslConfig, TslStats};
pub use range::{
    as_vec, empty, less, less_or_equal, merge, Cursor, Element, MutableRange, Order, Range,
    SortedRange, SortedRangeRef,
};

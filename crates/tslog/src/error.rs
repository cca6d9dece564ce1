//! Error and Result types for timeseries log operations.

use thiserror::Error;

/// A convenience `Result` type for timeseries log operations.
pub type Result<T> = std::result::Result<T, TslError>;

/// The error type for timeseries log operations.
///
/// The taxonomy is deliberately small: the only recoverable failure in the
/// log is an attempt to extend a range that has already been frozen. Broken
/// internal invariants are enforced with assertions instead of surfacing
/// here.
#[derive(Debug, Error)]
pub enum TslError {
    /// Elements were added to a range that has already been frozen.
    #[error("cannot add elements to a frozen range")]
    AlreadyFrozen,
}

//! Error taxonomy for the resampling engine.
//!
//! Two tiers: [`ResampleError`] covers programmer errors that fail the call
//! immediately (no silent defaulting), while [`SourceError`] covers
//! transport and payload problems that the session absorbs and retries at
//! the scheduler's cadence.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors from the policy table and bucketizer. These indicate misuse by
/// the caller and are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResampleError {
    /// The interval id is outside the enumerated set.
    #[error("unknown interval id: {0:?}, expected one of live, 5m, 30m, 1h, 6h, 12h, 1d, 1w, 1m")]
    UnknownInterval(String),

    /// The requested range is empty or inverted, or the bucket width is
    /// non-positive.
    #[error("invalid range: end ({end}) must be after start ({start})")]
    InvalidRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Errors surfaced by a sample source. Recoverable: the session records
/// them and the scheduler retries on its next tick.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network-level failure reaching the sample source.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response arrived but is not an array of samples. Treated as
    /// empty data downstream, not as a fatal error.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

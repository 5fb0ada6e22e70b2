//! Resampling and live-window aggregation engine for timestamped sensor
//! telemetry.
//!
//! This crate converts an irregular stream of timestamped numeric readings
//! (wind speed, battery voltage, ...) into fixed-length bucketed series
//! suitable for plotting, at user-selectable granularities from sub-second
//! live windows up to month-long rollups.
//!
//! ## Architecture
//!
//! 1. **Interval Policy Table** (`policy`) - maps each selectable interval
//!    to lookback, bucket width, label format/stride, and re-fetch cadence.
//!
//! 2. **Bucketizer** (`bucketize`) - partitions samples into fixed-width
//!    buckets, averages each, and carry-forward-fills the gaps.
//!
//! 3. **Label Thinner** (`label`) - keeps chart axes readable by labeling
//!    only every stride'th bucket.
//!
//! 4. **Live Window** (`live`) - bounded recency buffer for continuously
//!    arriving samples, separate from the batch path.
//!
//! 5. **Resampling Session** (`session`) - the per-screen state machine:
//!    owns the selected policy, sequences fetch responses by token so stale
//!    responses can never clobber newer ones, and publishes finalized
//!    series to a chart sink.
//!
//! 6. **Scheduler + Driver** (`scheduler`, `driver`) - the async shell that
//!    re-fetches at the policy's cadence on a single-threaded event loop.
//!
//! Transport and rendering stay outside: samples come in through
//! [`driver::SampleSource`], finalized series go out through
//! [`session::ChartSink`].

pub mod bucketize;
pub mod data;
pub mod driver;
pub mod error;
pub mod label;
pub mod live;
pub mod policy;
pub mod scheduler;
pub mod session;

pub use data::{Bucket, ChartSeries, FieldMap, Sample};
pub use driver::{SampleSource, SessionDriver, SessionHandle};
pub use error::{ResampleError, SourceError};
pub use live::{LiveWindow, DEFAULT_LIVE_CAPACITY};
pub use policy::{Interval, IntervalPolicy, LabelFormat};
pub use session::{ChartSink, FetchPlan, FetchToken, Session, SessionState};

//! Interval policy table.
//!
//! Every selectable chart range maps to one statically defined
//! [`IntervalPolicy`]: how far to look back, how wide each bucket is, how
//! labels are formatted and thinned, and how often the scheduler re-fetches.
//! Differences between ranges are data in this table, not code forks.

use std::str::FromStr;
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Deserializer};

use crate::error::ResampleError;
use crate::label;

/// Upper bound on the number of buckets any policy may produce, so charts
/// stay readable on small screens.
pub const MAX_SERIES_LEN: usize = 64;

/// Selectable chart interval.
///
/// String forms match the dashboard range buttons: `live`, `5m`, `30m`,
/// `1h`, `6h`, `12h`, `1d`, `1w`, `1m`. Note that `1m` is one month; the
/// minute-scale ranges only occur as `5m` and `30m`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interval {
    Live,
    #[default]
    Min5,
    Min30,
    Hour1,
    Hour6,
    Hour12,
    Day1,
    Week1,
    Month1,
}

/// Axis label rendering for batch series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelFormat {
    /// `HH:MM`, for intraday ranges.
    Time,
    /// `MM-DD`, for ranges spanning multiple days.
    Date,
}

/// Everything the session and scheduler need to serve one interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalPolicy {
    pub id: Interval,
    /// How far back from "now" the fetch range starts.
    pub lookback: Duration,
    /// Fixed width of each aggregation bucket.
    pub bucket_width: Duration,
    pub label_format: LabelFormat,
    /// Every `label_stride`'th bucket carries a visible label.
    pub label_stride: usize,
    /// Live policies bypass the bucketizer and feed the live window.
    pub live_mode: bool,
    /// Re-fetch cadence for the scheduler. Strictly non-decreasing as
    /// lookback grows, to bound request volume.
    pub cadence: StdDuration,
}

impl Interval {
    /// All selectable intervals, ordered by lookback.
    pub const ALL: [Interval; 9] = [
        Interval::Live,
        Interval::Min5,
        Interval::Min30,
        Interval::Hour1,
        Interval::Hour6,
        Interval::Hour12,
        Interval::Day1,
        Interval::Week1,
        Interval::Month1,
    ];

    /// Short string representation, as used by range buttons and APIs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Live => "live",
            Interval::Min5 => "5m",
            Interval::Min30 => "30m",
            Interval::Hour1 => "1h",
            Interval::Hour6 => "6h",
            Interval::Hour12 => "12h",
            Interval::Day1 => "1d",
            Interval::Week1 => "1w",
            Interval::Month1 => "1m",
        }
    }

    /// The policy for this interval. Total over the enum: the fallible
    /// boundary for unknown ids is [`Interval::from_str`].
    pub fn policy(&self) -> IntervalPolicy {
        match self {
            // Live polls the most recent samples at a short cadence; the
            // lookback only needs to cover one cadence worth of data.
            Interval::Live => self.build(
                Duration::seconds(2),
                Duration::seconds(1),
                LabelFormat::Time,
                true,
                StdDuration::from_secs(1),
            ),
            Interval::Min5 => self.build(
                Duration::minutes(5),
                Duration::seconds(10),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(5),
            ),
            Interval::Min30 => self.build(
                Duration::minutes(30),
                Duration::minutes(1),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(10),
            ),
            Interval::Hour1 => self.build(
                Duration::hours(1),
                Duration::minutes(2),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(15),
            ),
            Interval::Hour6 => self.build(
                Duration::hours(6),
                Duration::minutes(12),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(30),
            ),
            Interval::Hour12 => self.build(
                Duration::hours(12),
                Duration::minutes(24),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(30),
            ),
            Interval::Day1 => self.build(
                Duration::days(1),
                Duration::minutes(48),
                LabelFormat::Time,
                false,
                StdDuration::from_secs(60),
            ),
            Interval::Week1 => self.build(
                Duration::weeks(1),
                Duration::hours(6),
                LabelFormat::Date,
                false,
                StdDuration::from_secs(60),
            ),
            Interval::Month1 => self.build(
                Duration::days(30),
                Duration::days(1),
                LabelFormat::Date,
                false,
                StdDuration::from_secs(90),
            ),
        }
    }

    fn build(
        &self,
        lookback: Duration,
        bucket_width: Duration,
        label_format: LabelFormat,
        live_mode: bool,
        cadence: StdDuration,
    ) -> IntervalPolicy {
        let count = bucket_count(lookback, bucket_width);
        IntervalPolicy {
            id: *self,
            lookback,
            bucket_width,
            label_format,
            label_stride: label::stride_for(count),
            live_mode,
            cadence,
        }
    }
}

impl IntervalPolicy {
    /// Number of buckets this policy produces over one full lookback.
    pub fn bucket_count(&self) -> usize {
        bucket_count(self.lookback, self.bucket_width)
    }
}

fn bucket_count(lookback: Duration, bucket_width: Duration) -> usize {
    let span = lookback.num_milliseconds();
    let width = bucket_width.num_milliseconds().max(1);
    (((span + width - 1) / width).max(1)) as usize
}

impl FromStr for Interval {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(Interval::Live),
            "5m" => Ok(Interval::Min5),
            "30m" => Ok(Interval::Min30),
            "1h" => Ok(Interval::Hour1),
            "6h" => Ok(Interval::Hour6),
            "12h" => Ok(Interval::Hour12),
            "1d" => Ok(Interval::Day1),
            "1w" => Ok(Interval::Week1),
            "1m" => Ok(Interval::Month1),
            other => Err(ResampleError::UnknownInterval(other.to_string())),
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Custom deserialize for the short format: "live", "5m", ..., "1m".
impl<'de> Deserialize<'de> for Interval {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Interval::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Interval {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

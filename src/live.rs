//! Bounded live window for continuously arriving samples.
//!
//! Distinct from batch resampling: no aggregation happens here. The window
//! keeps the most recent K raw samples and maps them one-to-one onto chart
//! points, with the bucket width implicitly the inter-sample gap.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::data::{Bucket, ChartSeries, Sample};

/// Default per-screen capacity, matching the densest observed screen.
pub const DEFAULT_LIVE_CAPACITY: usize = 20;

#[derive(Debug)]
pub struct LiveWindow {
    buf: VecDeque<Sample>,
    capacity: usize,
}

impl LiveWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    /// Append a sample, evicting the oldest once over capacity.
    pub fn push(&mut self, sample: Sample) {
        self.buf.push_back(sample);
        if self.buf.len() > self.capacity {
            self.buf.pop_front();
        }
    }

    /// Drop all buffered samples. Required when the authoritative live
    /// source switches between push and poll, and on interval changes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Timestamp of the newest buffered sample. Poll-driven feeds use this
    /// to drop samples an overlapping earlier fetch already delivered.
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.buf.back().map(|s| s.timestamp)
    }

    /// One bucket per buffered sample, in arrival order. Each bucket ends
    /// where the next sample begins; the newest bucket is degenerate since
    /// its successor has not arrived yet.
    pub fn snapshot(&self) -> Vec<Bucket> {
        let mut buckets = Vec::with_capacity(self.buf.len());
        for (i, sample) in self.buf.iter().enumerate() {
            let end = self
                .buf
                .get(i + 1)
                .map_or(sample.timestamp, |next| next.timestamp);
            buckets.push(Bucket {
                start: sample.timestamp,
                end,
                value: sample.value,
                label: String::new(),
            });
        }
        buckets
    }

    /// Snapshot as a finalized chart series. Live points are few enough
    /// that every one carries a label, seconds included.
    pub fn snapshot_series(&self, legend: impl Into<String>) -> ChartSeries {
        let labels = self
            .buf
            .iter()
            .map(|s| s.timestamp.format("%H:%M:%S").to_string())
            .collect();
        let values = self.buf.iter().map(|s| s.value).collect();
        ChartSeries {
            labels,
            values,
            legend: legend.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn sample(ms: i64, value: f64) -> Sample {
        let timestamp: DateTime<Utc> = Utc.timestamp_millis_opt(ms).unwrap();
        Sample { timestamp, value }
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut window = LiveWindow::new(5);
        for i in 0..50 {
            window.push(sample(i * 1000, i as f64));
            assert!(window.len() <= 5);
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut window = LiveWindow::new(3);
        for i in 0..4 {
            window.push(sample(i * 1000, i as f64));
        }
        let series = window.snapshot_series("wind");
        // The first pushed sample (value 0) is gone after K+1 pushes.
        assert_eq!(series.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn snapshot_is_one_bucket_per_sample() {
        let mut window = LiveWindow::new(10);
        window.push(sample(0, 1.0));
        window.push(sample(1200, 2.0));
        window.push(sample(2000, 3.0));

        let buckets = window.snapshot();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[0].end, buckets[1].start);
        assert_eq!(buckets[1].end, buckets[2].start);
        // Newest bucket is degenerate until its successor arrives.
        assert_eq!(buckets[2].start, buckets[2].end);
    }

    #[test]
    fn live_labels_carry_seconds() {
        let mut window = LiveWindow::new(5);
        let at = Utc.with_ymd_and_hms(2026, 8, 23, 10, 15, 42).unwrap();
        window.push(Sample {
            timestamp: at,
            value: 3.2,
        });
        let series = window.snapshot_series("wind");
        assert_eq!(series.labels, vec!["10:15:42".to_string()]);
        assert_eq!(series.labels.len(), series.values.len());
    }

    #[test]
    fn latest_timestamp_tracks_the_newest_sample() {
        let mut window = LiveWindow::new(3);
        assert!(window.latest_timestamp().is_none());
        window.push(sample(1000, 1.0));
        window.push(sample(2000, 2.0));
        assert_eq!(
            window.latest_timestamp(),
            Some(Utc.timestamp_millis_opt(2000).unwrap())
        );
    }

    #[test]
    fn clear_empties_the_window() {
        let mut window = LiveWindow::new(5);
        window.push(sample(0, 1.0));
        window.clear();
        assert!(window.is_empty());
        assert!(window.snapshot_series("wind").is_empty());
    }
}

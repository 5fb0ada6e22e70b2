//! Axis label thinning.
//!
//! Charts stay readable by labeling only every stride'th bucket; the rest
//! receive an empty placeholder that still occupies a slot, so the label
//! array never goes out of alignment with the value array.

use chrono::{DateTime, Utc};

use crate::data::Bucket;
use crate::policy::LabelFormat;

/// Most labels a chart axis can show without crowding.
pub const MAX_VISIBLE_LABELS: usize = 5;

/// Stride so at most [`MAX_VISIBLE_LABELS`] buckets carry a label.
pub fn stride_for(bucket_count: usize) -> usize {
    bucket_count.div_ceil(MAX_VISIBLE_LABELS).max(1)
}

/// The label for one bucket position.
///
/// Labels land on the stride'th bucket (position `stride - 1`), not the
/// first, so a dense series does not open with a label crammed against the
/// axis. Off-stride positions get an empty string.
pub fn label_for(
    index: usize,
    stride: usize,
    instant: DateTime<Utc>,
    format: LabelFormat,
) -> String {
    let stride = stride.max(1);
    if (index + 1) % stride == 0 {
        format_instant(instant, format)
    } else {
        String::new()
    }
}

/// Fill in labels across a freshly bucketized series.
pub fn annotate(buckets: &mut [Bucket], stride: usize, format: LabelFormat) {
    for (index, bucket) in buckets.iter_mut().enumerate() {
        bucket.label = label_for(index, stride, bucket.start, format);
    }
}

fn format_instant(instant: DateTime<Utc>, format: LabelFormat) -> String {
    match format {
        LabelFormat::Time => instant.format("%H:%M").to_string(),
        LabelFormat::Date => instant.format("%m-%d").to_string(),
    }
}

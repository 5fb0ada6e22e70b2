//! Core data types shared across the engine.
//!
//! These types flow between the bucketizer, the live window, the session,
//! and the chart sink.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::SourceError;

/// A single timestamped sensor reading. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// One fixed-width time window with its aggregated value.
///
/// `end` is exclusive; for batch-resampled series `end - start` equals the
/// policy's bucket width. The label is blank until the thinner runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub value: f64,
    pub label: String,
}

/// The finalized payload handed to a chart sink: equal-length label and
/// value arrays plus a legend line.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub legend: String,
}

impl ChartSeries {
    /// An empty series; sinks render this as a "no data" state.
    pub fn empty(legend: impl Into<String>) -> Self {
        Self {
            labels: Vec::new(),
            values: Vec::new(),
            legend: legend.into(),
        }
    }

    pub fn from_buckets(buckets: Vec<Bucket>, legend: impl Into<String>) -> Self {
        let mut labels = Vec::with_capacity(buckets.len());
        let mut values = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            labels.push(bucket.label);
            values.push(bucket.value);
        }
        Self {
            labels,
            values,
            legend: legend.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Field-name mapping for raw sample payloads.
///
/// Endpoints disagree on field names (`date` vs `timestamp`,
/// `windSpeedmsData` vs `value`), so the mapping is configuration rather
/// than code.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMap {
    pub timestamp: String,
    pub value: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            timestamp: "timestamp".to_string(),
            value: "value".to_string(),
        }
    }
}

/// Parse a raw sample-source payload into samples.
///
/// The payload must be a JSON array of objects. Entries whose timestamp is
/// unparsable or whose value is non-numeric are discarded before
/// aggregation; they never reach a bucket as "no data".
pub fn parse_samples(
    payload: &serde_json::Value,
    map: &FieldMap,
) -> Result<Vec<Sample>, SourceError> {
    let rows = payload.as_array().ok_or_else(|| {
        SourceError::MalformedPayload(format!(
            "expected an array of samples, got {}",
            json_kind(payload)
        ))
    })?;

    let mut samples = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(timestamp) = row.get(map.timestamp.as_str()).and_then(parse_instant) else {
            tracing::warn!(field = %map.timestamp, row = %row, "Discarding sample with unparsable timestamp");
            continue;
        };
        let Some(value) = row.get(map.value.as_str()).and_then(serde_json::Value::as_f64) else {
            tracing::warn!(field = %map.value, row = %row, "Discarding sample with non-numeric value");
            continue;
        };
        samples.push(Sample { timestamp, value });
    }
    Ok(samples)
}

/// Accept RFC 3339 strings or integer epoch milliseconds.
fn parse_instant(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a bool",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

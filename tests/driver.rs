//! End-to-end tests for the session driver: select, supersede, live push,
//! and shutdown, against a fake transport.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use telemetry_resampler::{
    ChartSeries, ChartSink, FieldMap, Interval, Sample, SampleSource, SessionDriver,
    SourceError,
};
use tokio::sync::mpsc;

/// Forwards every published series and error to the test.
struct ChannelSink {
    series_tx: mpsc::UnboundedSender<ChartSeries>,
    error_tx: mpsc::UnboundedSender<String>,
}

impl ChartSink for ChannelSink {
    fn publish(&mut self, series: ChartSeries) {
        let _ = self.series_tx.send(series);
    }
    fn publish_error(&mut self, message: &str) {
        let _ = self.error_tx.send(message.to_string());
    }
    fn set_loading(&mut self, _loading: bool) {}
}

fn channel_sink() -> (
    ChannelSink,
    mpsc::UnboundedReceiver<ChartSeries>,
    mpsc::UnboundedReceiver<String>,
) {
    let (series_tx, series_rx) = mpsc::unbounded_channel();
    let (error_tx, error_rx) = mpsc::unbounded_channel();
    (
        ChannelSink {
            series_tx,
            error_tx,
        },
        series_rx,
        error_rx,
    )
}

/// Responds with one sample near the end of the requested range, valued at
/// the range's span in minutes, after a span-dependent delay. Long ranges
/// answer slowly, which lets tests race a stale fetch against a fresh one.
struct SpanTaggedSource {
    slow_span_minutes: i64,
    slow_delay: Duration,
}

impl SampleSource for SpanTaggedSource {
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'static, Result<serde_json::Value, SourceError>> {
        let span_minutes = (end - start).num_minutes();
        let delay = if span_minutes >= self.slow_span_minutes {
            self.slow_delay
        } else {
            Duration::from_millis(5)
        };
        let at = end - chrono::Duration::seconds(1);
        Box::pin(async move {
            tokio::time::sleep(delay).await;
            Ok(serde_json::json!([
                { "date": at.to_rfc3339(), "windSpeedmsData": span_minutes as f64 }
            ]))
        })
    }
}

/// Always returns an empty array, so live polls publish nothing of note.
struct EmptySource;

impl SampleSource for EmptySource {
    fn fetch_range(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> BoxFuture<'static, Result<serde_json::Value, SourceError>> {
        Box::pin(async { Ok(serde_json::json!([])) })
    }
}

fn field_map() -> FieldMap {
    FieldMap {
        timestamp: "date".to_string(),
        value: "windSpeedmsData".to_string(),
    }
}

async fn next_non_empty(
    rx: &mut mpsc::UnboundedReceiver<ChartSeries>,
) -> Option<ChartSeries> {
    loop {
        let series = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .ok()??;
        if !series.is_empty() {
            return Some(series);
        }
    }
}

#[tokio::test]
async fn select_publishes_a_full_series() {
    let source = SpanTaggedSource {
        slow_span_minutes: i64::MAX,
        slow_delay: Duration::ZERO,
    };
    let (sink, mut series_rx, _error_rx) = channel_sink();
    let handle = SessionDriver::spawn(source, sink, "Wind Speed (m/s)", field_map(), 20);

    handle.select_interval(Interval::Min5).await;

    let series = next_non_empty(&mut series_rx).await.expect("a series");
    let expected = Interval::Min5.policy().bucket_count();
    assert_eq!(series.values.len(), expected);
    assert_eq!(series.labels.len(), expected);
    assert_eq!(series.legend, "Wind Speed (m/s)");
    // The sample sits in the final bucket; earlier buckets are gap-filled 0.
    assert_eq!(*series.values.last().unwrap(), 5.0);

    handle.shutdown().await;
}

#[tokio::test]
async fn fast_reselect_never_publishes_the_stale_interval() {
    // The 1h fetch answers slowly; the 5m fetch answers almost instantly.
    let source = SpanTaggedSource {
        slow_span_minutes: 60,
        slow_delay: Duration::from_millis(200),
    };
    let (sink, mut series_rx, _error_rx) = channel_sink();
    let handle = SessionDriver::spawn(source, sink, "wind", field_map(), 20);

    handle.select_interval(Interval::Hour1).await;
    handle.select_interval(Interval::Min5).await;

    // Wait long enough for the superseded 1h response to have resolved.
    tokio::time::sleep(Duration::from_millis(400)).await;
    handle.shutdown().await;

    let mut non_empty = Vec::new();
    while let Some(series) = series_rx.recv().await {
        if !series.is_empty() {
            non_empty.push(series);
        }
    }
    assert!(!non_empty.is_empty(), "the 5m series should publish");
    for series in &non_empty {
        // Source tags each response with the span in minutes, so a leaked
        // stale 1h response would show up as a 60-valued bucket.
        assert_eq!(
            *series.values.last().unwrap(),
            5.0,
            "stale 1h response was published"
        );
    }
}

#[tokio::test]
async fn pushed_samples_drive_the_live_view() {
    let (sink, mut series_rx, _error_rx) = channel_sink();
    let handle = SessionDriver::spawn(EmptySource, sink, "wind", field_map(), 20);

    handle.select_interval(Interval::Live).await;
    let base = Utc::now();
    for (i, value) in [7.0, 8.0, 9.0].into_iter().enumerate() {
        handle
            .push_sample(Sample {
                timestamp: base + chrono::Duration::seconds(i as i64),
                value,
            })
            .await;
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut latest = None;
    while tokio::time::Instant::now() < deadline {
        match tokio::time::timeout(Duration::from_millis(200), series_rx.recv()).await {
            Ok(Some(series)) => {
                let done = series.values == vec![7.0, 8.0, 9.0];
                latest = Some(series);
                if done {
                    break;
                }
            }
            Ok(None) => break,
            Err(_) => break,
        }
    }
    let latest = latest.expect("live series published");
    assert_eq!(latest.values, vec![7.0, 8.0, 9.0]);
    assert_eq!(latest.labels.len(), 3);

    handle.shutdown().await;
}

#[tokio::test]
async fn shutdown_drops_the_sink() {
    let (sink, mut series_rx, _error_rx) = channel_sink();
    let handle = SessionDriver::spawn(EmptySource, sink, "wind", field_map(), 20);

    handle.select_interval(Interval::Min5).await;
    handle.shutdown().await;

    // Drain: the channel must close once the driver task ends.
    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        while series_rx.recv().await.is_some() {}
    })
    .await;
    assert!(closed.is_ok(), "sink channel should close after shutdown");
}

#[tokio::test]
async fn unknown_interval_ids_are_rejected_at_the_parse_boundary() {
    assert!(Interval::from_str("2h").is_err());
    assert!(Interval::from_str("1w").is_ok());
}

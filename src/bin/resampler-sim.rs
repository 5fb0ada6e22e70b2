//! Demo harness for the resampling engine.
//!
//! Wires a synthetic sine-wave sample source and a logging chart sink to a
//! session driver, selects an interval, lets the scheduler re-fetch for a
//! while, then switches to the live view before shutting down:
//!
//! ```bash
//! resampler-sim --interval 5m --run-seconds 20
//! ```

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use futures::future::BoxFuture;
use telemetry_resampler::{
    ChartSeries, ChartSink, FieldMap, Interval, SampleSource, SessionDriver, SourceError,
    DEFAULT_LIVE_CAPACITY,
};

/// Simulate a sensor screen against a synthetic sample source
#[derive(Parser, Debug)]
#[command(name = "resampler-sim")]
struct Args {
    /// Interval to select first (live, 5m, 30m, 1h, 6h, 12h, 1d, 1w, 1m)
    #[arg(short, long, default_value = "5m")]
    interval: String,

    /// Chart legend line
    #[arg(long, env = "SENSOR_LEGEND", default_value = "Wind Speed (m/s)")]
    legend: String,

    /// Seconds to run before switching to the live view
    #[arg(long, default_value = "15")]
    run_seconds: u64,

    /// Seconds to stay on the live view before exiting
    #[arg(long, default_value = "10")]
    live_seconds: u64,

    /// Simulated sample spacing in milliseconds
    #[arg(long, default_value = "2000")]
    sample_spacing_ms: u64,

    /// Live window capacity for this screen
    #[arg(long, default_value_t = DEFAULT_LIVE_CAPACITY)]
    live_capacity: usize,
}

/// Produces a sine-wave wind-speed signal over any requested range.
struct SyntheticSource {
    spacing_ms: i64,
}

impl SampleSource for SyntheticSource {
    fn fetch_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> BoxFuture<'static, Result<serde_json::Value, SourceError>> {
        let spacing = self.spacing_ms;
        Box::pin(async move {
            let mut rows = Vec::new();
            let mut at = start.timestamp_millis();
            let end_ms = end.timestamp_millis();
            while at < end_ms {
                let value = 6.0 + 4.0 * ((at as f64) / 60_000.0).sin();
                rows.push(serde_json::json!({
                    "date": DateTime::from_timestamp_millis(at)
                        .unwrap_or(start)
                        .to_rfc3339(),
                    "windSpeedmsData": value,
                }));
                at += spacing;
            }
            Ok(serde_json::Value::Array(rows))
        })
    }
}

/// Publishes every accepted series to the log.
struct LogSink;

impl ChartSink for LogSink {
    fn publish(&mut self, series: ChartSeries) {
        if series.is_empty() {
            tracing::info!(legend = %series.legend, "Published empty series (no data)");
            return;
        }
        let visible: Vec<&String> = series.labels.iter().filter(|l| !l.is_empty()).collect();
        tracing::info!(
            legend = %series.legend,
            points = series.values.len(),
            visible_labels = ?visible,
            first = ?series.values.first(),
            last = ?series.values.last(),
            "Published series"
        );
    }

    fn publish_error(&mut self, message: &str) {
        tracing::warn!(error = message, "Chart error slot updated");
    }

    fn set_loading(&mut self, loading: bool) {
        tracing::debug!(loading, "Loading indicator");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let interval = Interval::from_str(&args.interval)?;

    tracing::info!(
        interval = %interval,
        run_seconds = args.run_seconds,
        live_seconds = args.live_seconds,
        "Starting resampler-sim"
    );

    let source = SyntheticSource {
        spacing_ms: args.sample_spacing_ms as i64,
    };
    let field_map = FieldMap {
        timestamp: "date".to_string(),
        value: "windSpeedmsData".to_string(),
    };
    let handle = SessionDriver::spawn(source, LogSink, args.legend, field_map, args.live_capacity);

    handle.select_interval(interval).await;
    tokio::time::sleep(Duration::from_secs(args.run_seconds)).await;

    if interval != Interval::Live {
        tracing::info!("Switching to live view");
        handle.select_interval(Interval::Live).await;
        tokio::time::sleep(Duration::from_secs(args.live_seconds)).await;
    }

    handle.shutdown().await;
    tracing::info!("Done");
    Ok(())
}

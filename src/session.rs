//! Resampling session state machine.
//!
//! One session per sensor screen. The session owns the selected policy, the
//! live window, and the fetch-token sequence, and publishes finalized series
//! to its chart sink. It is a plain synchronous struct: all mutation happens
//! on its driver's single event sequence, so no locking is needed. The async
//! shell lives in [`crate::driver`].
//!
//! State machine: `Idle -> Fetching -> (Ready | Failed)`, with `Fetching`
//! re-entrant. Issuing a new fetch bumps the token and supersedes the old
//! request; a superseded response is discarded on arrival, never applied.

use chrono::{DateTime, Utc};

use crate::bucketize;
use crate::data::{parse_samples, ChartSeries, FieldMap, Sample};
use crate::error::SourceError;
use crate::label;
use crate::live::LiveWindow;
use crate::policy::{Interval, IntervalPolicy};

/// Monotonically increasing id for one outstanding fetch. Only the response
/// matching the most recently issued token may update visible state.
pub type FetchToken = u64;

/// Everything the transport needs to serve one fetch, plus the token the
/// session will check the response against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub token: FetchToken,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub policy: IntervalPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Fetching,
    Ready,
    Failed,
}

/// Which kind of source currently feeds the live window. Push and poll must
/// never feed the same window at once; switching kinds clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveSourceKind {
    Push,
    Poll,
}

/// Consumer of finalized series. Rendering, transport framing, and styling
/// all live behind this seam.
pub trait ChartSink {
    /// A new finalized series. An empty series means "no data".
    fn publish(&mut self, series: ChartSeries);
    /// A recoverable failure to surface; the schedule keeps retrying.
    fn publish_error(&mut self, message: &str);
    /// Loading indicator around fetches.
    fn set_loading(&mut self, loading: bool);
}

pub struct Session<S: ChartSink> {
    sink: S,
    legend: String,
    field_map: FieldMap,
    policy: Option<IntervalPolicy>,
    state: SessionState,
    next_token: FetchToken,
    /// The most recently issued fetch; anything older is stale.
    in_flight: Option<FetchPlan>,
    live: LiveWindow,
    live_source: Option<LiveSourceKind>,
    /// Live window capacity K, fixed per sensor screen (the dense push
    /// screen uses 20, the sparse analog screen 5).
    live_capacity: usize,
}

impl<S: ChartSink> Session<S> {
    pub fn new(
        sink: S,
        legend: impl Into<String>,
        field_map: FieldMap,
        live_capacity: usize,
    ) -> Self {
        Self {
            sink,
            legend: legend.into(),
            field_map,
            policy: None,
            state: SessionState::Idle,
            next_token: 1,
            in_flight: None,
            live: LiveWindow::new(live_capacity),
            live_source: None,
            live_capacity,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn policy(&self) -> Option<&IntervalPolicy> {
        self.policy.as_ref()
    }

    /// Switch to a new interval. Clears the current series and live window,
    /// supersedes any outstanding fetch, and returns the plan for the new
    /// policy's `[now - lookback, now)` range.
    pub fn select_interval(&mut self, id: Interval, now: DateTime<Utc>) -> FetchPlan {
        let policy = id.policy();
        self.live = LiveWindow::new(self.live_capacity);
        self.live_source = None;
        self.sink.publish(ChartSeries::empty(self.legend.clone()));
        self.sink.set_loading(true);
        self.policy = Some(policy.clone());
        tracing::info!(interval = %id, "Interval selected");
        self.issue(policy, now)
    }

    /// Scheduler tick. Re-fetches only when a policy is active and no fetch
    /// is outstanding; failures are not fatal to the schedule, so `Failed`
    /// retries here too.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<FetchPlan> {
        if !matches!(self.state, SessionState::Ready | SessionState::Failed) {
            return None;
        }
        let policy = self.policy.clone()?;
        Some(self.issue(policy, now))
    }

    /// Apply a fetch response. Responses are applied strictly in token
    /// order: anything but the most recently issued token is a no-op,
    /// regardless of arrival order.
    pub fn apply_response(
        &mut self,
        token: FetchToken,
        result: Result<serde_json::Value, SourceError>,
    ) {
        let plan = match self.in_flight.take() {
            Some(plan) if plan.token == token => plan,
            newer => {
                self.in_flight = newer;
                tracing::debug!(token, "Discarding stale fetch response");
                return;
            }
        };

        self.sink.set_loading(false);

        let payload = match result {
            Ok(payload) => payload,
            Err(error) => {
                tracing::warn!(token, error = %error, "Fetch failed, will retry on next tick");
                self.state = SessionState::Failed;
                self.sink.publish_error(&error.to_string());
                return;
            }
        };

        let samples = match parse_samples(&payload, &self.field_map) {
            Ok(samples) => samples,
            Err(error) => {
                // Not an array of samples: render as "no data", not as a
                // failure.
                tracing::warn!(token, error = %error, "Treating malformed payload as empty data");
                self.publish_empty();
                return;
            }
        };

        if samples.is_empty() {
            if plan.policy.live_mode && self.live_source == Some(LiveSourceKind::Push) {
                // A push source is authoritative; an empty poll must not
                // wipe the live view it is feeding.
                self.state = SessionState::Ready;
                return;
            }
            self.publish_empty();
            return;
        }

        if plan.policy.live_mode {
            self.apply_live_poll(samples);
        } else {
            self.apply_batch(&plan, &samples);
        }
    }

    /// Entry point for a push-based live source (e.g. a streaming
    /// connection). Takes over as the authoritative source, clearing
    /// anything a poll fetch buffered earlier. Samples pushed while no
    /// live policy is active are ignored, so the window's contents always
    /// correspond to the current view.
    pub fn push_live(&mut self, sample: Sample) {
        let Some(policy) = self.policy.as_ref() else {
            tracing::debug!("Ignoring pushed sample: no active policy");
            return;
        };
        if !policy.live_mode {
            tracing::debug!(interval = %policy.id, "Ignoring pushed sample: batch policy active");
            return;
        }

        if self.live_source == Some(LiveSourceKind::Poll) {
            tracing::debug!("Live source switched from poll to push, clearing window");
            self.live.clear();
        }
        self.live_source = Some(LiveSourceKind::Push);
        self.live.push(sample);

        let series = self.live.snapshot_series(self.legend.clone());
        self.state = SessionState::Ready;
        self.sink.publish(series);
    }

    /// Unmount. Invalidates the outstanding token (a late response becomes
    /// a no-op) and drops the active policy.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.policy = None;
        self.live.clear();
        self.live_source = None;
        self.state = SessionState::Idle;
    }

    fn issue(&mut self, policy: IntervalPolicy, now: DateTime<Utc>) -> FetchPlan {
        let token = self.next_token;
        self.next_token += 1;
        let plan = FetchPlan {
            token,
            start: now - policy.lookback,
            end: now,
            policy,
        };
        tracing::debug!(
            token,
            interval = %plan.policy.id,
            start = %plan.start,
            end = %plan.end,
            "Issuing fetch"
        );
        self.in_flight = Some(plan.clone());
        self.state = SessionState::Fetching;
        plan
    }

    fn apply_live_poll(&mut self, mut samples: Vec<Sample>) {
        if self.live_source == Some(LiveSourceKind::Push) {
            // A push source is authoritative; polled samples would double
            // up in the window.
            tracing::debug!(
                count = samples.len(),
                "Push source active, discarding polled live samples"
            );
            self.state = SessionState::Ready;
            return;
        }
        self.live_source = Some(LiveSourceKind::Poll);

        // Consecutive poll ranges overlap (the lookback exceeds the
        // cadence, so a slow beat never drops a sample), which means the
        // same reading comes back from two successive fetches. Only
        // samples strictly newer than the window's newest entry go in.
        samples.sort_by_key(|s| s.timestamp);
        let mut appended = 0_usize;
        for sample in samples {
            if self
                .live
                .latest_timestamp()
                .is_some_and(|newest| sample.timestamp <= newest)
            {
                continue;
            }
            self.live.push(sample);
            appended += 1;
        }
        tracing::debug!(appended, "Applied live poll response");

        let series = self.live.snapshot_series(self.legend.clone());
        self.state = SessionState::Ready;
        self.sink.publish(series);
    }

    fn apply_batch(&mut self, plan: &FetchPlan, samples: &[Sample]) {
        match bucketize::resample(samples, plan.start, plan.end, plan.policy.bucket_width) {
            Ok(mut buckets) => {
                label::annotate(&mut buckets, plan.policy.label_stride, plan.policy.label_format);
                tracing::debug!(
                    token = plan.token,
                    buckets = buckets.len(),
                    "Publishing resampled series"
                );
                self.state = SessionState::Ready;
                self.sink
                    .publish(ChartSeries::from_buckets(buckets, self.legend.clone()));
            }
            Err(error) => {
                // Plans are built from positive lookbacks, so this indicates
                // a bug rather than bad data.
                tracing::error!(token = plan.token, error = %error, "Resample failed");
                self.state = SessionState::Failed;
                self.sink.publish_error(&error.to_string());
            }
        }
    }

    fn publish_empty(&mut self) {
        self.state = SessionState::Ready;
        self.sink.publish(ChartSeries::empty(self.legend.clone()));
    }
}

//! Async shell around the session state machine.
//!
//! The driver owns one session, one sample source, and one scheduler, and
//! runs them on a single `tokio::select!` event loop: commands from the
//! handle, scheduler ticks, and fetch completions all arrive on the same
//! logical queue, so the session is never touched concurrently.
//!
//! Superseded fetches are not cancelled mid-flight. They stay in the
//! in-flight set, complete whenever the transport answers, and are dropped
//! by the session's token check. Ordering is enforced explicitly rather than
//! assumed from delivery order.

use chrono::Utc;
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;

use crate::data::{FieldMap, Sample};
use crate::error::SourceError;
use crate::policy::Interval;
use crate::scheduler::Scheduler;
use crate::session::{ChartSink, FetchPlan, FetchToken, Session};

/// Producer of raw samples for a time range. Transport framing (REST,
/// WebSocket polling, test fakes) lives behind this seam; the engine only
/// sees the returned JSON payload.
pub trait SampleSource: Send + 'static {
    fn fetch_range(
        &self,
        start: chrono::DateTime<Utc>,
        end: chrono::DateTime<Utc>,
    ) -> BoxFuture<'static, Result<serde_json::Value, SourceError>>;
}

enum Command {
    SelectInterval(Interval),
    PushSample(Sample),
    Shutdown,
}

/// Cloneable handle to a running driver. Dropping every handle shuts the
/// driver down, which is the unmount path: the pending timer dies with the
/// task and the outstanding token is never applied.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<Command>,
}

impl SessionHandle {
    pub async fn select_interval(&self, id: Interval) {
        let _ = self.tx.send(Command::SelectInterval(id)).await;
    }

    /// Feed one sample from a push-based live source.
    pub async fn push_sample(&self, sample: Sample) {
        let _ = self.tx.send(Command::PushSample(sample)).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown).await;
    }
}

pub struct SessionDriver<S: ChartSink, R: SampleSource> {
    session: Session<S>,
    source: R,
    scheduler: Scheduler,
    rx: mpsc::Receiver<Command>,
    in_flight: FuturesUnordered<BoxFuture<'static, (FetchToken, Result<serde_json::Value, SourceError>)>>,
}

impl<S, R> SessionDriver<S, R>
where
    S: ChartSink + Send + 'static,
    R: SampleSource,
{
    /// Spawn a driver task for one sensor screen and return its handle.
    /// `live_capacity` is the screen's live window bound K.
    pub fn spawn(
        source: R,
        sink: S,
        legend: impl Into<String>,
        field_map: FieldMap,
        live_capacity: usize,
    ) -> SessionHandle {
        let (tx, rx) = mpsc::channel(32);
        let driver = SessionDriver {
            session: Session::new(sink, legend, field_map, live_capacity),
            source,
            scheduler: Scheduler::new(),
            rx,
            in_flight: FuturesUnordered::new(),
        };
        tokio::spawn(driver.run());
        SessionHandle { tx }
    }

    async fn run(mut self) {
        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(Command::SelectInterval(id)) => {
                            let plan = self.session.select_interval(id, Utc::now());
                            self.scheduler.start(plan.policy.cadence);
                            self.issue(plan);
                        }
                        Some(Command::PushSample(sample)) => {
                            self.session.push_live(sample);
                        }
                        Some(Command::Shutdown) | None => {
                            tracing::info!("Session driver shutting down");
                            break;
                        }
                    }
                }
                _ = self.scheduler.tick() => {
                    if let Some(plan) = self.session.tick(Utc::now()) {
                        self.issue(plan);
                    }
                }
                Some((token, result)) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    self.session.apply_response(token, result);
                }
            }
        }
        self.scheduler.stop();
        self.session.reset();
    }

    fn issue(&mut self, plan: FetchPlan) {
        let token = plan.token;
        let fetch = self.source.fetch_range(plan.start, plan.end);
        self.in_flight
            .push(Box::pin(async move { (token, fetch.await) }));
    }
}

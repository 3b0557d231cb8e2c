//! Monitor worker
//!
//! A worker owns a rolling baseline snapshot and multiplexes three event
//! sources: control signals, a regular timer and a burst timer. Events are
//! processed one at a time. The worker runs behind a recovery barrier that
//! turns protocol defects and panics into a single notification carrying
//! the worker's id.


use std::any::Any;
use std::time::Duration;

use netpulse_common::{MonitorReport, Snapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::control::ControlSignal;
use crate::probe::StateProbe;
use crate::report::{diff_report, full_report};

/// Identifier of a monitor worker, one per monitored target
pub type MonitorId = u32;

/// Default regular sampling interval
pub const DEFAULT_REGULAR_INTERVAL_MS: u64 = 3000;
/// Default burst sampling interval
pub const DEFAULT_BURST_INTERVAL_MS: u64 = 1200;
/// Default number of burst ticks granted per Burst signal
pub const DEFAULT_BURST_TICKS: u32 = 9;

/// Timing configuration of a monitor worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Regular sampling interval in milliseconds
    pub regular_interval_ms: u64,
    /// Burst sampling interval in milliseconds
    pub burst_interval_ms: u64,
    /// Burst ticks granted per Burst signal
    pub burst_ticks: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            regular_interval_ms: DEFAULT_REGULAR_INTERVAL_MS,
            burst_interval_ms: DEFAULT_BURST_INTERVAL_MS,
            burst_ticks: DEFAULT_BURST_TICKS,
        }
    }
}

impl MonitorConfig {
    pub fn regular_interval(&self) -> Duration {
        Duration::from_millis(self.regular_interval_ms.max(1))
    }

    pub fn burst_interval(&self) -> Duration {
        Duration::from_millis(self.burst_interval_ms.max(1))
    }
}

/// Reasons a worker stops
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("First control code never arrives")]
    ControlClosedBeforeStart,

    #[error("Invalid first control code: {0}")]
    UnexpectedFirstSignal(i32),

    #[error("Invalid monitor control code: {0}")]
    InvalidSignal(i32),

    #[error("Monitor task panicked: {0}")]
    Panicked(String),

    #[error("Report consumer went away")]
    ReportSinkClosed,
}

impl MonitorError {
    /// Whether the error is a defect the supervisor must hear about
    pub fn is_defect(&self) -> bool {
        !matches!(self, Self::ReportSinkClosed)
    }
}

/// How a worker ended
#[derive(Debug, PartialEq, Eq)]
pub enum Termination {
    /// Control source closed after a lawful Start, or the consumer left
    Normal,
    /// Protocol defect or panic; the supervisor was notified
    Abnormal {
        error: MonitorError,
        /// Codes queued on the control source that the worker never read
        unread: Vec<i32>,
    },
}

/// Spawn a monitor worker under a recovery barrier
///
/// The worker waits for [`ControlSignal::Start`] on `control` and then
/// publishes reports on `reports` until `control` closes. On abnormal exit
/// `id` is sent once on `notify`. The returned handle resolves to how the
/// worker ended. After a defect the control source is closed and drained, so
/// every code sent to the worker was either read by it, listed in
/// `unread`, or refused at the sender.
pub fn spawn_monitor(
    id: MonitorId,
    probe: StateProbe,
    config: MonitorConfig,
    control: mpsc::Receiver<i32>,
    reports: mpsc::Sender<MonitorReport>,
    notify: mpsc::Sender<MonitorId>,
) -> JoinHandle<Termination> {
    tokio::spawn(async move {
        let worker = Worker {
            id,
            probe,
            config,
            reports,
        };

        // Timers live inside the worker task and drop with it, panics included
        let task = tokio::spawn(async move {
            let mut control = control;
            let result = worker.run(&mut control).await;
            (result, control)
        });

        let (outcome, control) = match task.await {
            Ok((result, control)) => (result, Some(control)),
            Err(e) => (Err(MonitorError::Panicked(join_error_message(e))), None),
        };

        match outcome {
            Ok(()) => {
                debug!(monitor_id = id, "Monitor terminates normally");
                Termination::Normal
            }
            Err(e) if !e.is_defect() => {
                warn!(monitor_id = id, "Monitor terminates: {}", e);
                Termination::Normal
            }
            Err(e) => {
                let unread = control.map(drain_unread).unwrap_or_default();
                if notify.send(id).await.is_err() {
                    warn!(monitor_id = id, "Supervisor gone, termination not delivered");
                }
                error!(
                    monitor_id = id,
                    error = %e,
                    unread = unread.len(),
                    "Monitor terminates due to defect"
                );
                Termination::Abnormal { error: e, unread }
            }
        }
    })
}

/// Refuse further codes and collect the ones already queued
fn drain_unread(mut control: mpsc::Receiver<i32>) -> Vec<i32> {
    control.close();
    let mut unread = Vec::new();
    while let Ok(code) = control.try_recv() {
        unread.push(code);
    }
    unread
}

fn join_error_message(e: JoinError) -> String {
    if e.is_cancelled() {
        return "task cancelled".to_string();
    }
    panic_message(e.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Resources shared by every state of the worker
struct Worker {
    id: MonitorId,
    probe: StateProbe,
    config: MonitorConfig,
    reports: mpsc::Sender<MonitorReport>,
}

/// Mutable state once the first Start has been processed
struct Running {
    baseline: Snapshot,
    active: bool,
    bursts_left: u32,
}

impl Worker {
    async fn run(self, control: &mut mpsc::Receiver<i32>) -> Result<(), MonitorError> {
        let first = control
            .recv()
            .await
            .ok_or(MonitorError::ControlClosedBeforeStart)?;

        if ControlSignal::try_from(first) != Ok(ControlSignal::Start) {
            return Err(MonitorError::UnexpectedFirstSignal(first));
        }

        info!(
            monitor_id = self.id,
            platform = self.probe.platform_name(),
            "Monitor started"
        );

        let mut state = Running {
            baseline: self.start().await?,
            active: true,
            bursts_left: 0,
        };

        let mut regular = ticker(self.config.regular_interval());
        let mut burst = ticker(self.config.burst_interval());

        loop {
            tokio::select! {
                signal = control.recv() => match signal {
                    Some(code) => self.on_signal(&mut state, code).await?,
                    None => {
                        debug!(monitor_id = self.id, "Control source closed");
                        return Ok(());
                    }
                },
                _ = regular.tick() => {
                    if state.active {
                        self.sample(&mut state).await?;
                    }
                }
                _ = burst.tick() => {
                    if state.active && state.bursts_left > 0 {
                        state.bursts_left -= 1;
                        debug!(
                            monitor_id = self.id,
                            bursts_left = state.bursts_left,
                            "Burst tick"
                        );
                        self.sample(&mut state).await?;
                    }
                }
            }
        }
    }

    async fn on_signal(&self, state: &mut Running, code: i32) -> Result<(), MonitorError> {
        let signal = ControlSignal::try_from(code).map_err(MonitorError::InvalidSignal)?;
        debug!(monitor_id = self.id, %signal, "Control signal");

        match signal {
            ControlSignal::Start => {
                state.baseline = self.start().await?;
                state.active = true;
            }
            ControlSignal::Burst => state.bursts_left = self.config.burst_ticks,
            ControlSignal::Stop => {
                state.bursts_left = 0;
                state.active = false;
            }
        }

        Ok(())
    }

    /// Capture a new baseline and publish it in full
    async fn start(&self) -> Result<Snapshot, MonitorError> {
        let snapshot = self.probe.capture().await;
        self.emit(full_report(&snapshot)).await?;
        Ok(snapshot)
    }

    /// Capture, publish what changed and advance the baseline
    async fn sample(&self, state: &mut Running) -> Result<(), MonitorError> {
        let snapshot = self.probe.capture().await;
        let report = diff_report(&snapshot, &state.baseline);
        state.baseline = snapshot;

        match report {
            Some(report) => self.emit(report).await,
            None => Ok(()),
        }
    }

    async fn emit(&self, report: MonitorReport) -> Result<(), MonitorError> {
        debug!(
            monitor_id = self.id,
            full = report.full,
            interfaces = report.interfaces.len(),
            services = report.services.len(),
            "Publishing report"
        );
        self.reports
            .send(report)
            .await
            .map_err(|_| MonitorError::ReportSinkClosed)
    }
}

/// Interval whose first tick fires one period from now
fn ticker(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

//! Worker supervision
//!
//! Forwards control signals to the current monitor worker and replaces the
//! worker when it reports an abnormal termination. Codes the failed worker
//! never read are handed to its replacement in arrival order.

use std::collections::VecDeque;

use anyhow::bail;
use netpulse_common::MonitorReport;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::monitor::{spawn_monitor, MonitorId, Termination};
use crate::probe::StateProbe;

/// Live worker and the sender feeding its control source
struct WorkerHandle {
    id: MonitorId,
    control: mpsc::Sender<i32>,
    handle: JoinHandle<Termination>,
}

/// Owns one monitor worker at a time and restarts it on failure
pub struct Supervisor {
    probe: StateProbe,
    config: AgentConfig,
    reports: mpsc::Sender<MonitorReport>,
    notify_tx: mpsc::Sender<MonitorId>,
    notify_rx: mpsc::Receiver<MonitorId>,
    next_id: MonitorId,
    current: Option<WorkerHandle>,
    /// Codes refused by a failed worker, replayed to the next one
    pending: VecDeque<i32>,
}

impl Supervisor {
    /// Create a supervisor and the stream its workers publish reports on
    pub fn new(probe: StateProbe, config: AgentConfig) -> (Self, mpsc::Receiver<MonitorReport>) {
        let (reports_tx, reports_rx) = mpsc::channel(config.channel_capacity);
        let (notify_tx, notify_rx) = mpsc::channel(config.channel_capacity);

        let supervisor = Self {
            probe,
            config,
            reports: reports_tx,
            notify_tx,
            notify_rx,
            next_id: 1,
            current: None,
            pending: VecDeque::new(),
        };

        (supervisor, reports_rx)
    }

    fn spawn_worker(&mut self) {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let (control_tx, control_rx) = mpsc::channel(self.config.channel_capacity);
        let handle = spawn_monitor(
            id,
            self.probe.clone(),
            self.config.monitor,
            control_rx,
            self.reports.clone(),
            self.notify_tx.clone(),
        );

        info!(monitor_id = id, "Monitor worker spawned");
        self.current = Some(WorkerHandle {
            id,
            control: control_tx,
            handle,
        });
    }

    /// Run until `control` closes
    ///
    /// Returns an error when a worker fails and restarts are disabled.
    pub async fn run(mut self, mut control: mpsc::Receiver<i32>) -> anyhow::Result<()> {
        self.spawn_worker();

        loop {
            tokio::select! {
                biased;

                Some(id) = self.notify_rx.recv() => self.on_failure(id).await?,
                code = control.recv() => match code {
                    Some(code) => {
                        // A failure already reported takes effect before the code
                        if let Ok(id) = self.notify_rx.try_recv() {
                            self.on_failure(id).await?;
                        }
                        self.forward(code).await;
                    }
                    None => {
                        self.shutdown().await;
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Retire the failed worker and start its replacement
    async fn on_failure(&mut self, id: MonitorId) -> anyhow::Result<()> {
        warn!(monitor_id = id, "Monitor worker failed");
        if self.current.as_ref().map(|w| w.id) != Some(id) {
            debug!(monitor_id = id, "Ignoring failure of retired worker");
            return Ok(());
        }
        let Some(worker) = self.current.take() else {
            return Ok(());
        };

        let mut replay = match worker.handle.await {
            Ok(Termination::Abnormal { unread, .. }) => VecDeque::from(unread),
            Ok(Termination::Normal) => VecDeque::new(),
            Err(e) => {
                warn!(monitor_id = id, error = %e, "Monitor worker lost");
                VecDeque::new()
            }
        };
        replay.append(&mut self.pending);

        if !self.config.restart_on_failure {
            bail!("Monitor worker {} terminated abnormally", id);
        }

        tokio::time::sleep(self.config.restart_delay()).await;
        self.spawn_worker();

        if !replay.is_empty() {
            debug!(codes = replay.len(), "Replaying control codes to new worker");
        }
        for code in replay {
            self.forward(code).await;
        }
        Ok(())
    }

    async fn forward(&mut self, code: i32) {
        match &self.current {
            Some(worker) => {
                if worker.control.send(code).await.is_err() {
                    debug!(monitor_id = worker.id, code, "Worker closed, control code held");
                    self.pending.push_back(code);
                }
            }
            None => debug!(code, "No worker running, control code dropped"),
        }
    }

    /// Close the current worker's control source and wait for it to finish
    async fn shutdown(&mut self) {
        let Some(worker) = self.current.take() else {
            return;
        };

        drop(worker.control);
        match worker.handle.await {
            Ok(termination) => info!(monitor_id = worker.id, ?termination, "Monitor worker stopped"),
            Err(e) => warn!(monitor_id = worker.id, error = %e, "Monitor worker lost"),
        }
    }
}

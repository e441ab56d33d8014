//! Scheduler module for running check cycles.

mod recorder;
mod tracker;

pub use recorder::*;
pub use tracker::*;

use crate::config::MonitorTarget;
use crate::db::{ProbeResult, RecordStore};
use crate::notify::Notifier;
use crate::probe::Prober;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{JoinHandle, JoinSet};

/// Delay before the first cycle so collaborating services can finish starting.
pub const WARMUP_DELAY: Duration = Duration::from_secs(2);

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Cancelled,
}

/// Everything one check needs, shared by the concurrent checks of a cycle.
struct Checker {
    prober: Prober,
    recorder: Recorder,
    tracker: Arc<StatusTracker>,
    notifier: Arc<dyn Notifier>,
}

impl Checker {
    /// Probe, record, update the tracker, then notify on a transition.
    ///
    /// Tracker and notifier see the same result that was recorded.
    async fn check_target(&self, target: &MonitorTarget) -> ProbeResult {
        let result = self.prober.check(target).await;

        self.recorder.record(&result);

        let transitioned = self.tracker.observe(&result.target_name, result.is_up);
        if transitioned && target.webhook_url().is_some() {
            if let Err(e) = self.notifier.notify(target, &result).await {
                tracing::warn!("Notification failed for {}: {}", target.name, e);
            }
        }

        result
    }
}

/// Drives one check cycle over every monitor, then sleeps for the shared
/// cycle interval, until stopped.
pub struct Scheduler {
    targets: Vec<Arc<MonitorTarget>>,
    checker: Arc<Checker>,
    interval: Duration,
    warmup: Duration,
    state: Mutex<SchedulerState>,
    stop_tx: broadcast::Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Create a scheduler over a read-only snapshot of `targets`.
    pub fn new(
        targets: Vec<MonitorTarget>,
        interval: Duration,
        prober: Prober,
        store: Arc<dyn RecordStore>,
        tracker: Arc<StatusTracker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (stop_tx, _) = broadcast::channel(1);

        Self {
            targets: targets.into_iter().map(Arc::new).collect(),
            checker: Arc::new(Checker {
                prober,
                recorder: Recorder::new(store),
                tracker,
                notifier,
            }),
            interval,
            warmup: WARMUP_DELAY,
            state: Mutex::new(SchedulerState::Idle),
            stop_tx,
            handle: Mutex::new(None),
        }
    }

    /// Override the delay before the first cycle.
    #[cfg(test)]
    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: SchedulerState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = state;
    }

    /// Start the background cycle loop. Does nothing unless the scheduler is idle.
    pub fn start(self: &Arc<Self>) {
        if self.state() != SchedulerState::Idle {
            return;
        }
        self.set_state(SchedulerState::Running);

        tracing::info!(
            "Starting scheduler with {} monitors, cycle interval {:?}",
            self.targets.len(),
            self.interval
        );

        let stop_rx = self.stop_tx.subscribe();
        let scheduler = self.clone();
        let handle = tokio::spawn(async move { scheduler.run(stop_rx).await });

        *self.handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
    }

    /// Cancel the loop. Checks in flight are dropped and may go unrecorded.
    pub async fn stop(&self) {
        let _ = self.stop_tx.send(());
        self.set_state(SchedulerState::Cancelled);

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!("Scheduler task ended abnormally: {}", e);
            }
        }

        tracing::info!("Scheduler stopped");
    }

    async fn run(&self, mut stop_rx: broadcast::Receiver<()>) {
        tokio::select! {
            _ = stop_rx.recv() => return,
            _ = tokio::time::sleep(self.warmup) => {}
        }

        loop {
            tokio::select! {
                _ = stop_rx.recv() => break,
                _ = self.cycle() => {}
            }
        }
    }

    async fn cycle(&self) {
        self.run_tick().await;
        tokio::time::sleep(self.interval).await;
    }

    /// Check every monitor concurrently and wait until all have finished.
    pub async fn run_tick(&self) -> Vec<ProbeResult> {
        let mut checks = JoinSet::new();

        for target in &self.targets {
            let checker = self.checker.clone();
            let target = target.clone();
            checks.spawn(async move { checker.check_target(&target).await });
        }

        let mut results = Vec::with_capacity(self.targets.len());
        while let Some(joined) = checks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!("Check task failed: {}", e),
            }
        }

        tracing::debug!("Cycle complete: {} checks", results.len());
        results
    }
}

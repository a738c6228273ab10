//! Background alert detector
//!
//! Every tick evaluates all definitions in sequence. A failure (or panic)
//! while evaluating one alert is logged and the tick moves on to the next
//! alert; a tick that dies outright is logged and the loop waits for the
//! next interval. Ticks never overlap.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::Notify;
use tokio::time::{self, MissedTickBehavior};

use super::fanout::{FanoutError, NotificationFanout};
use super::source::AlertSource;
use super::tracker::{FiringTracker, Transition};
use super::window::{WindowCounter, WindowError};
use crate::data::AlertDefinition;
use crate::storage::StoreError;

/// Default interval between evaluation ticks
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_secs(60);

/// Periodic evaluator of alert definitions
pub struct AlertDetector {
    alerts: Arc<dyn AlertSource>,
    counter: WindowCounter,
    tracker: Arc<dyn FiringTracker>,
    fanout: NotificationFanout,
    interval: Duration,
    running: Arc<AtomicBool>,
    in_tick: AtomicBool,
    shutdown: Notify,
}

/// Result of evaluating one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub count: u64,
    pub transition: Transition,
    pub notifications: usize,
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Set when the tick was dropped because another was still running
    pub overlapped: bool,
    pub evaluated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub triggered: usize,
    pub resolved: usize,
    pub notifications: usize,
}

impl TickReport {
    fn record(&mut self, evaluation: &Evaluation) {
        self.evaluated += 1;
        self.notifications += evaluation.notifications;
        match evaluation.transition {
            Transition::Triggered => self.triggered += 1,
            Transition::Resolved => self.resolved += 1,
            Transition::StillFiring | Transition::Quiet => {}
        }
    }
}

/// Clears the in-tick flag on drop, including while unwinding
struct TickGuard<'a>(&'a AtomicBool);

impl<'a> TickGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| TickGuard(flag))
    }
}

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AlertDetector {
    pub fn new(
        alerts: Arc<dyn AlertSource>,
        counter: WindowCounter,
        tracker: Arc<dyn FiringTracker>,
        fanout: NotificationFanout,
        interval: Duration,
    ) -> Self {
        Self {
            alerts,
            counter,
            tracker,
            fanout,
            interval,
            running: Arc::new(AtomicBool::new(false)),
            in_tick: AtomicBool::new(false),
            shutdown: Notify::new(),
        }
    }

    /// Start the background loop
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Alert detector started with interval {:?}", self.interval);

            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while self.running.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = self.shutdown.notified() => break,
                }

                // Run the tick on its own task so a panic surfaces as a JoinError
                let detector = Arc::clone(&self);
                let tick = tokio::spawn(async move { detector.run_tick(Utc::now()).await });
                if let Err(e) = tick.await {
                    tracing::error!(error = %e, "Alert evaluation tick aborted");
                }
            }

            tracing::info!("Alert detector stopped");
        })
    }

    /// Stop the loop after the current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Evaluate every definition once, as of `now`
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        let Some(_guard) = TickGuard::acquire(&self.in_tick) else {
            tracing::warn!("Previous alert evaluation still running, skipping tick");
            return TickReport {
                overlapped: true,
                ..TickReport::default()
            };
        };

        let mut report = TickReport::default();

        tracing::info!("Starting alert evaluation job");
        let alerts = match self.alerts.list_all().await {
            Ok(alerts) => alerts,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load alert definitions");
                return report;
            }
        };
        tracing::info!("Found {} alerts to evaluate", alerts.len());

        for alert in &alerts {
            if !alert.is_evaluable() {
                if !alert.active {
                    tracing::debug!(alert_id = alert.id, "Skipping inactive alert");
                } else {
                    tracing::debug!(
                        alert_id = alert.id,
                        application = %alert.application.name,
                        "Skipping alert for inactive application"
                    );
                }
                self.disarm(alert).await;
                report.skipped += 1;
                continue;
            }

            match AssertUnwindSafe(self.evaluate(alert, now)).catch_unwind().await {
                Ok(Ok(evaluation)) => report.record(&evaluation),
                Ok(Err(e)) => {
                    report.failed += 1;
                    tracing::error!(alert_id = alert.id, error = %e, "Alert evaluation failed");
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::error!(alert_id = alert.id, "Alert evaluation panicked");
                }
            }
        }

        tracing::info!(
            evaluated = report.evaluated,
            failed = report.failed,
            triggered = report.triggered,
            resolved = report.resolved,
            "Finished alert evaluation job"
        );
        report
    }

    /// Drop firing state for a skipped alert, so a breach that is still
    /// ongoing when it is re-enabled starts a new episode
    async fn disarm(&self, alert: &AlertDefinition) {
        match self.tracker.clear(alert.id).await {
            Ok(Some(since)) => {
                tracing::info!(
                    alert_id = alert.id,
                    firing_since = %since,
                    "Cleared firing state of disabled alert"
                );
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    alert_id = alert.id,
                    error = %e,
                    "Failed to clear firing state of disabled alert"
                );
            }
        }
    }

    /// Evaluate a single alert and apply its state transition
    pub async fn evaluate(
        &self,
        alert: &AlertDefinition,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, EvaluationError> {
        let count = self.counter.count(alert, now).await?;
        let firing = self
            .tracker
            .is_firing(alert.id)
            .await
            .map_err(EvaluationError::Tracker)?;

        let transition = Transition::decide(count, alert.threshold, firing);
        let mut notifications = 0;

        match transition {
            Transition::Triggered => {
                tracing::warn!(
                    alert_id = alert.id,
                    count,
                    threshold = alert.threshold,
                    "ALERT TRIGGERED"
                );
                // Only a delivered round moves the alert to Firing; a failed
                // fanout leaves it Idle so the next tick tries again
                notifications = self.fanout.dispatch(alert, count).await?;
                self.tracker
                    .mark_firing(alert.id, now)
                    .await
                    .map_err(EvaluationError::Tracker)?;
            }
            Transition::Resolved => {
                let since = self
                    .tracker
                    .clear(alert.id)
                    .await
                    .map_err(EvaluationError::Tracker)?;
                tracing::info!(
                    alert_id = alert.id,
                    count,
                    firing_since = ?since,
                    "ALERT RESOLVED"
                );
            }
            Transition::StillFiring | Transition::Quiet => {
                tracing::debug!(
                    alert_id = alert.id,
                    count,
                    threshold = alert.threshold,
                    firing,
                    "No action needed"
                );
            }
        }

        Ok(Evaluation {
            count,
            transition,
            notifications,
        })
    }
}

/// Per-alert evaluation errors
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Count(#[from] WindowError),

    #[error(transparent)]
    Fanout(#[from] FanoutError),

    #[error("Firing state unavailable: {0}")]
    Tracker(#[source] StoreError),
}

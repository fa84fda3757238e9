// Live polling controller
use crate::domain::error::TelemetryError;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CADENCE: Duration = Duration::from_millis(2000);

/// Something the poller re-fetches on every tick.
#[async_trait]
pub trait PollTarget: Send + Sync + 'static {
    type Reading: Send + 'static;

    async fn poll(&self) -> Result<Self::Reading, TelemetryError>;

    /// Called with each reading that settled while the poller was still running.
    fn apply(&self, reading: Self::Reading);

    /// Called once per outage, on its first failed tick.
    fn report(&self, _error: &TelemetryError) {}

    /// Called on the first successful tick after an outage.
    fn recovered(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PollState {
    Idle,
    Polling,
}

type Slot = Arc<Mutex<Option<CancellationToken>>>;

/// Runs one tick loop at a time. Ticks are sequential: the next one is
/// scheduled only after the previous poll settled, and a restarted loop waits
/// for a poll left in flight by the stopped one. Dropping the poller stops it.
pub struct LivePoller {
    device_id: String,
    cadence: Duration,
    running: Slot,
    /// Held by a poll for as long as it is in flight
    gate: Arc<tokio::sync::Mutex<()>>,
}

impl LivePoller {
    pub fn new(device_id: impl Into<String>, cadence: Duration) -> Self {
        Self {
            device_id: device_id.into(),
            cadence,
            running: Arc::new(Mutex::new(None)),
            gate: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn state(&self) -> PollState {
        if self.slot().is_some() {
            PollState::Polling
        } else {
            PollState::Idle
        }
    }

    /// `Idle -> Polling`. Returns false, doing nothing, if already polling.
    pub fn start<T: PollTarget>(&self, target: Arc<T>) -> bool {
        let mut slot = self.slot();
        if slot.is_some() {
            tracing::debug!(device_id = %self.device_id, "live polling already running");
            return false;
        }

        let token = CancellationToken::new();
        tokio::spawn(run_ticks(
            self.device_id.clone(),
            self.cadence,
            target,
            token.clone(),
            self.running.clone(),
            self.gate.clone(),
        ));
        *slot = Some(token);

        tracing::info!(
            device_id = %self.device_id,
            cadence_ms = self.cadence.as_millis() as u64,
            "Started live polling"
        );
        true
    }

    /// `Polling -> Idle`. Idempotent; an in-flight poll is left to settle and
    /// its result is dropped.
    pub fn stop(&self) -> bool {
        match self.slot().take() {
            Some(token) => {
                token.cancel();
                tracing::info!(device_id = %self.device_id, "Stopped live polling");
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        lock_slot(&self.running)
    }
}

fn lock_slot(running: &Mutex<Option<CancellationToken>>) -> MutexGuard<'_, Option<CancellationToken>> {
    running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_ticks<T: PollTarget>(
    device_id: String,
    cadence: Duration,
    target: Arc<T>,
    token: CancellationToken,
    running: Slot,
    gate: Arc<tokio::sync::Mutex<()>>,
) {
    let mut in_outage = false;
    let mut tick: u64 = 0;

    loop {
        tick += 1;

        let permit = tokio::select! {
            permit = gate.clone().lock_owned() => permit,
            _ = token.cancelled() => break,
        };
        tracing::debug!(device_id = %device_id, tick, "Live poll tick");

        // Spawned so that stopping never aborts a request mid-flight. The
        // permit is released when the request settles.
        let poll = tokio::spawn({
            let target = target.clone();
            async move {
                let _permit = permit;
                target.poll().await
            }
        });
        let outcome = match poll.await {
            Ok(outcome) => outcome,
            Err(e) => Err(TelemetryError::Transport(format!("poll task failed: {}", e))),
        };

        // stop() cancels under this lock, so nothing is applied once it returned
        {
            let _slot = lock_slot(&running);
            if token.is_cancelled() {
                tracing::debug!(device_id = %device_id, tick, "Discarding poll result that settled after stop");
                break;
            }

            match outcome {
                Ok(reading) => {
                    target.apply(reading);
                    if in_outage {
                        in_outage = false;
                        tracing::info!(device_id = %device_id, tick, "Live polling recovered");
                        target.recovered();
                    }
                }
                Err(err) if !in_outage => {
                    in_outage = true;
                    tracing::warn!(device_id = %device_id, tick, error = %err, "Live poll failed");
                    target.report(&err);
                }
                Err(err) => {
                    tracing::debug!(device_id = %device_id, tick, error = %err, "Live poll still failing");
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(cadence) => {}
            _ = token.cancelled() => break,
        }
    }

    tracing::debug!(device_id = %device_id, "Live poll loop finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct ScriptedTarget {
        delay: Duration,
        failures: Mutex<VecDeque<bool>>,
        started: AtomicUsize,
        applied: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        reports: AtomicUsize,
        recoveries: AtomicUsize,
    }

    impl ScriptedTarget {
        fn with_delay(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                ..Self::default()
            })
        }

        fn with_failures(script: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                failures: Mutex::new(script.iter().copied().collect()),
                ..Self::default()
            })
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        fn applied(&self) -> usize {
            self.applied.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PollTarget for ScriptedTarget {
        type Reading = usize;

        async fn poll(&self) -> Result<usize, TelemetryError> {
            let n = self.started.fetch_add(1, Ordering::SeqCst) + 1;
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let fail = self.failures.lock().unwrap().pop_front().unwrap_or(false);
            if fail {
                Err(TelemetryError::Transport("connection refused".into()))
            } else {
                Ok(n)
            }
        }

        fn apply(&self, _reading: usize) {
            self.applied.fetch_add(1, Ordering::SeqCst);
        }

        fn report(&self, _error: &TelemetryError) {
            self.reports.fetch_add(1, Ordering::SeqCst);
        }

        fn recovered(&self) {
            self.recoveries.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_at_cadence() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(0));

        assert!(poller.start(target.clone()));
        assert_eq!(poller.state(), PollState::Polling);

        tokio::time::sleep(ms(4_500)).await;
        assert_eq!(target.started(), 3);
        assert_eq!(target.applied(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_is_noop() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(0));

        assert!(poller.start(target.clone()));
        assert!(!poller.start(target.clone()));

        tokio::time::sleep(ms(100)).await;
        assert_eq!(target.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_poll_never_overlaps() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(3_000));

        poller.start(target.clone());
        tokio::time::sleep(ms(9_000)).await;

        // polls at 0..3000 and 5000..8000, next one due at 10000
        assert_eq!(target.started(), 2);
        assert_eq!(target.applied(), 2);
        assert_eq!(target.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_between_ticks() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(0));

        poller.start(target.clone());
        tokio::time::sleep(ms(1_000)).await;
        assert!(poller.stop());
        assert!(!poller.stop());
        assert_eq!(poller.state(), PollState::Idle);

        tokio::time::sleep(ms(10_000)).await;
        assert_eq!(target.started(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_flight_discards_result() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(3_000));

        poller.start(target.clone());
        tokio::time::sleep(ms(1_000)).await;
        poller.stop();

        tokio::time::sleep(ms(10_000)).await;
        assert_eq!(target.started(), 1);
        assert_eq!(target.applied(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(0));

        poller.start(target.clone());
        tokio::time::sleep(ms(500)).await;
        poller.stop();
        assert!(poller.start(target.clone()));

        tokio::time::sleep(ms(500)).await;
        assert_eq!(target.started(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_waits_for_in_flight_poll() {
        let poller = LivePoller::new("dev-1", ms(2_000));
        let target = ScriptedTarget::with_delay(ms(10_000));

        for _ in 0..5 {
            assert!(poller.start(target.clone()));
            tokio::time::sleep(ms(100)).await;
            assert!(poller.stop());
        }
        assert!(poller.start(target.clone()));

        // the first request settles at 10000, the restarted loop polls 10000..20000
        tokio::time::sleep(ms(20_500)).await;
        assert_eq!(target.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(target.started(), 2);
        assert_eq!(target.applied(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_nothing_applied_after_stop_returns() {
        let poller = LivePoller::new("dev-1", ms(1));
        let target = ScriptedTarget::with_delay(ms(0));

        for _ in 0..50 {
            poller.start(target.clone());
            tokio::time::sleep(ms(3)).await;
            poller.stop();

            let applied = target.applied();
            tokio::time::sleep(ms(3)).await;
            assert_eq!(target.applied(), applied);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_reported_once_per_outage() {
        let poller = LivePoller::new("dev-1", ms(1_000));
        let target = ScriptedTarget::with_failures(&[true, true, true, false, true]);

        poller.start(target.clone());
        tokio::time::sleep(ms(4_500)).await;

        assert_eq!(poller.state(), PollState::Polling);
        assert_eq!(target.started(), 5);
        assert_eq!(target.applied(), 1);
        assert_eq!(target.reports.load(Ordering::SeqCst), 2);
        assert_eq!(target.recoveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let target = ScriptedTarget::with_delay(ms(0));
        {
            let poller = LivePoller::new("dev-1", ms(1_000));
            poller.start(target.clone());
            tokio::time::sleep(ms(10)).await;
        }

        tokio::time::sleep(ms(10_000)).await;
        assert_eq!(target.started(), 1);
    }
}

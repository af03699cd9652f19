//! Rolling-window request gate.
//!
//! Every outbound call to the football data API must be preceded by a grant
//! from [`RequestGate::acquire`]. The gate admits at most `limit` requests in
//! any trailing 60-second window and suspends callers (rather than failing
//! them) while the window is saturated.
//!
//! Window convention: an entry is inside the window while `now - entry < 60s`.
//! An entry exactly 60 seconds old has expired.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::GateError;
use crate::metrics;
use crate::utils::Shutdown;

/// Length of the rolling window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Timestamps of granted requests, oldest first.
#[derive(Debug, Default)]
struct RequestLog {
    entries: VecDeque<Instant>,
}

impl RequestLog {
    /// Drop entries that have left the window ending at `now`.
    fn evict(&mut self, now: Instant, window: Duration) {
        while let Some(&front) = self.entries.front() {
            if now.saturating_duration_since(front) >= window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn record(&mut self, now: Instant) {
        self.entries.push_back(now);
    }

    /// Time until the oldest entry expires. Zero for an empty log.
    fn time_until_slot(&self, now: Instant, window: Duration) -> Duration {
        self.entries
            .front()
            .map(|&oldest| window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }
}

/// Logical gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    /// Below the limit: `acquire` returns immediately.
    Open,
    /// At the limit: `acquire` waits for the oldest entry to expire.
    Saturated,
}

impl fmt::Display for GateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateState::Open => write!(f, "open"),
            GateState::Saturated => write!(f, "saturated"),
        }
    }
}

/// Snapshot of gate utilisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateUsage {
    /// Requests granted within the current window.
    pub used: usize,
    /// Configured requests per window.
    pub limit: usize,
}

impl GateUsage {
    /// Open or saturated.
    pub fn state(&self) -> GateState {
        if self.used < self.limit {
            GateState::Open
        } else {
            GateState::Saturated
        }
    }
}

impl fmt::Display for GateUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.used, self.limit)
    }
}

/// Record of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Total time spent suspended before the grant.
    pub waited: Duration,
    /// Entries in the window after this grant, including it.
    pub in_window: usize,
}

/// Process-wide throttle for outbound API requests.
///
/// Share it by `Arc` between the HTTP client and anything that reports usage.
#[derive(Debug)]
pub struct RequestGate {
    limit: usize,
    window: Duration,
    log: Mutex<RequestLog>,
    shutdown: Shutdown,
}

impl RequestGate {
    /// Default requests per window.
    pub const DEFAULT_LIMIT: i64 = 10;

    /// Create a gate admitting `limit` requests per 60 seconds.
    pub fn new(limit: i64) -> Result<Self, GateError> {
        Self::with_shutdown(limit, Shutdown::never())
    }

    /// Create a gate whose waits are abandoned when `shutdown` fires.
    pub fn with_shutdown(limit: i64, shutdown: Shutdown) -> Result<Self, GateError> {
        let limit = usize::try_from(limit)
            .ok()
            .filter(|l| *l > 0)
            .ok_or(GateError::InvalidConfiguration { limit })?;

        Ok(Self {
            limit,
            window: WINDOW,
            log: Mutex::new(RequestLog::default()),
            shutdown,
        })
    }

    /// Configured requests per window.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait for a free slot in the window and claim it.
    ///
    /// Returns immediately while the gate is open. When saturated, sleeps
    /// until the oldest entry expires and then re-checks, since another caller
    /// may have taken the slot first. Fails only with
    /// [`GateError::Cancelled`] when shutdown fires during a wait.
    #[instrument(skip(self), level = "debug")]
    pub async fn acquire(&self) -> Result<Admission, GateError> {
        let started = Instant::now();
        let mut shutdown = self.shutdown.clone();

        loop {
            let wait = {
                let mut log = self.log.lock().await;
                let now = Instant::now();
                log.evict(now, self.window);

                if log.len() < self.limit {
                    log.record(now);
                    let admission = Admission {
                        waited: now.saturating_duration_since(started),
                        in_window: log.len(),
                    };
                    metrics::set_gate_in_window(admission.in_window);
                    debug!(
                        used = admission.in_window,
                        limit = self.limit,
                        "Request admitted"
                    );
                    return Ok(admission);
                }

                log.time_until_slot(now, self.window)
            };

            if shutdown.is_triggered() {
                metrics::inc_gate_cancellations();
                return Err(GateError::Cancelled);
            }

            info!(
                wait_secs = wait.as_secs_f64(),
                limit = self.limit,
                "Rate limit reached, waiting for a free slot"
            );
            metrics::record_gate_wait(wait);

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = shutdown.cancelled() => {
                    debug!("Gate wait interrupted by shutdown");
                    metrics::inc_gate_cancellations();
                    return Err(GateError::Cancelled);
                }
            }
        }
    }

    /// Current utilisation, after evicting expired entries.
    pub async fn usage(&self) -> GateUsage {
        let mut log = self.log.lock().await;
        log.evict(Instant::now(), self.window);
        GateUsage {
            used: log.len(),
            limit: self.limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tokio::time::advance;
    use tokio_test::{assert_pending, assert_ready, task};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn rejects_non_positive_limits() {
        assert_eq!(
            RequestGate::new(0).unwrap_err(),
            GateError::InvalidConfiguration { limit: 0 }
        );
        assert_eq!(
            RequestGate::new(-5).unwrap_err(),
            GateError::InvalidConfiguration { limit: -5 }
        );
        assert_eq!(RequestGate::new(1).unwrap().limit(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_call_waits_for_oldest_entry() {
        let gate = RequestGate::new(3).unwrap();

        gate.acquire().await.unwrap();
        advance(secs(1)).await;
        gate.acquire().await.unwrap();
        advance(secs(1)).await;
        gate.acquire().await.unwrap();
        advance(secs(1)).await;

        let start = Instant::now();
        let admission = gate.acquire().await.unwrap();
        let waited = start.elapsed();

        assert!(waited >= secs(57), "waited {:?}", waited);
        assert!(waited < secs(58), "waited {:?}", waited);
        assert!(admission.waited >= secs(57));
        assert_eq!(admission.in_window, 3);
        assert!(gate.usage().await.used <= 3);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_immediate_then_eleventh_waits_then_twelfth_is_free() {
        let gate = RequestGate::new(10).unwrap();
        let origin = Instant::now();

        for _ in 0..10 {
            let admission = gate.acquire().await.unwrap();
            assert_eq!(admission.waited, Duration::ZERO);
        }
        assert_eq!(gate.usage().await.state(), GateState::Saturated);

        let admission = gate.acquire().await.unwrap();
        assert!(admission.waited >= secs(60));
        assert!(origin.elapsed() < secs(61));
        // The ten t=0 entries expired; only the 11th remains.
        assert_eq!(admission.in_window, 1);

        let until_61 = secs(61).saturating_sub(origin.elapsed());
        advance(until_61).await;

        let admission = gate.acquire().await.unwrap();
        assert_eq!(admission.waited, Duration::ZERO);
        assert_eq!(gate.usage().await.used, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn entry_exactly_sixty_seconds_old_is_evicted() {
        let gate = RequestGate::new(1).unwrap();
        gate.acquire().await.unwrap();

        advance(Duration::from_millis(59_999)).await;
        assert_eq!(gate.usage().await.used, 1);

        advance(Duration::from_millis(1)).await;
        assert_eq!(gate.usage().await.used, 0);

        let admission = gate.acquire().await.unwrap();
        assert_eq!(admission.waited, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn usage_is_stable_without_time_passing() {
        let gate = RequestGate::new(5).unwrap();
        for _ in 0..3 {
            gate.acquire().await.unwrap();
        }

        let first = gate.usage().await;
        let second = gate.usage().await;
        let third = gate.usage().await;

        assert_eq!(first, GateUsage { used: 3, limit: 5 });
        assert_eq!(first, second);
        assert_eq!(second, third);
        assert_eq!(first.state(), GateState::Open);
        assert_eq!(first.to_string(), "3/5");
    }

    #[tokio::test(start_paused = true)]
    async fn usage_reflects_only_trailing_window() {
        let gate = RequestGate::new(4).unwrap();
        gate.acquire().await.unwrap();
        advance(secs(30)).await;
        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();

        assert_eq!(gate.usage().await.used, 3);
        advance(secs(30)).await;
        assert_eq!(gate.usage().await.used, 2);
        advance(secs(30)).await;
        assert_eq!(gate.usage().await.used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn saturated_acquire_stays_pending_until_slot_frees() {
        let gate = RequestGate::new(2).unwrap();
        gate.acquire().await.unwrap();
        gate.acquire().await.unwrap();

        let mut blocked = task::spawn(gate.acquire());
        assert_pending!(blocked.poll());

        advance(secs(30)).await;
        assert_pending!(blocked.poll());

        advance(secs(30)).await;
        let admission = assert_ready!(blocked.poll()).unwrap();
        assert!(admission.waited >= secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_never_overshoot() {
        const LIMIT: usize = 5;
        let gate = Arc::new(RequestGate::new(LIMIT as i64).unwrap());

        let handles: Vec<_> = (0..17)
            .map(|_| {
                let gate = Arc::clone(&gate);
                tokio::spawn(async move {
                    gate.acquire().await.unwrap();
                    Instant::now()
                })
            })
            .collect();

        let mut grants = Vec::new();
        for handle in handles {
            grants.push(handle.await.unwrap());
        }
        grants.sort();

        for pair in grants.windows(LIMIT + 1) {
            let span = pair[LIMIT].duration_since(pair[0]);
            assert!(span >= WINDOW, "{} grants within {:?}", LIMIT + 1, span);
        }
        assert!(gate.usage().await.used <= LIMIT);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_waiting_caller() {
        let (trigger, shutdown) = Shutdown::channel();
        let gate = RequestGate::with_shutdown(1, shutdown).unwrap();
        gate.acquire().await.unwrap();

        let mut blocked = task::spawn(gate.acquire());
        assert_pending!(blocked.poll());

        advance(secs(10)).await;
        trigger.trigger();

        assert!(blocked.is_woken());
        assert_eq!(assert_ready!(blocked.poll()), Err(GateError::Cancelled));
        assert_eq!(gate.usage().await.used, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fired_shutdown_cancels_before_waiting() {
        let (trigger, shutdown) = Shutdown::channel();
        let gate = RequestGate::with_shutdown(1, shutdown).unwrap();
        trigger.trigger();

        // An open gate has nothing to wait for.
        assert!(gate.acquire().await.is_ok());

        let start = Instant::now();
        assert_eq!(gate.acquire().await, Err(GateError::Cancelled));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[test]
    fn time_until_slot_is_clamped() {
        let now = Instant::now();
        let mut log = RequestLog::default();
        assert_eq!(log.time_until_slot(now, WINDOW), Duration::ZERO);

        log.record(now);
        assert_eq!(log.time_until_slot(now, WINDOW), WINDOW);
        assert_eq!(log.time_until_slot(now + secs(90), WINDOW), Duration::ZERO);
    }
}

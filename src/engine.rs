//! The poll loop tying goal detection, signals and trading together.

use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::api::AppState;
use crate::config::Config;
use crate::error::ApiError;
use crate::football::{FootballApi, MatchTracker};
use crate::metrics;
use crate::signal::{Signal, UnderdogDetector};
use crate::trading::{ExecutorStats, Order, Position, TradingExecutor};
use crate::utils::Shutdown;

/// What happened during one poll.
#[derive(Debug, Default)]
pub struct TickReport {
    /// In-play fixtures seen.
    pub live_matches: usize,
    /// Signals generated, one per goal analysed.
    pub signals: Vec<Signal>,
    /// Orders filled.
    pub orders: Vec<Order>,
    /// Positions settled.
    pub settled: Vec<Position>,
}

/// Drives the bot: scan, analyse, trade, settle.
#[derive(Debug)]
pub struct Engine<A: FootballApi> {
    api: A,
    tracker: MatchTracker,
    detector: UnderdogDetector,
    executor: TradingExecutor,
    poll_interval: Duration,
    state: Option<AppState>,
}

impl<A: FootballApi> Engine<A> {
    /// Create an engine from config.
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            tracker: MatchTracker::new(),
            detector: UnderdogDetector::from_config(config),
            executor: TradingExecutor::from_config(config),
            poll_interval: Duration::from_secs(config.poll_interval),
            state: None,
        }
    }

    /// Publish readiness and stats to the status API.
    pub fn with_state(mut self, state: AppState) -> Self {
        self.state = Some(state);
        self
    }

    /// API the engine polls.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Score tracker.
    pub fn tracker(&self) -> &MatchTracker {
        &self.tracker
    }

    /// Underdog detector.
    pub fn detector(&self) -> &UnderdogDetector {
        &self.detector
    }

    /// Trading account.
    pub fn executor(&self) -> &TradingExecutor {
        &self.executor
    }

    /// Run one poll cycle.
    ///
    /// Fails if the live scan fails, or if a gate wait is cancelled. Other
    /// per-goal odds errors are logged and the goal is skipped.
    #[instrument(skip(self))]
    pub async fn tick(&mut self) -> Result<TickReport, ApiError> {
        let _timer = metrics::timer_engine_tick();
        let scan = self.tracker.scan_for_goals(&self.api).await?;

        let mut report = TickReport {
            live_matches: scan.live_count,
            ..TickReport::default()
        };

        for goal in &scan.goals {
            let signal = match self.detector.analyze_goal(&self.api, goal).await {
                Ok(signal) => signal,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(fixture_id = goal.fixture_id, error = %e, "Odds lookup failed, skipping goal");
                    continue;
                }
            };

            if let Signal::Buy(buy) = &signal {
                if let Ok(order) = self.executor.execute(buy) {
                    report.orders.push(order);
                }
            }
            report.signals.push(signal);
        }

        for score in &scan.finished {
            report.settled.extend(self.executor.settle_fixture(score));
        }
        for &fixture_id in &scan.dropped {
            let stranded = self
                .executor
                .open_positions()
                .filter(|p| p.fixture_id == fixture_id)
                .count();
            if stranded > 0 {
                warn!(fixture_id, stranded, "Fixture dropped with open positions");
            }
        }

        let purged = self.detector.cache().purge_expired();
        if purged > 0 {
            debug!(purged, "Expired odds evicted");
        }

        self.publish().await;

        debug!(
            live = report.live_matches,
            goals = scan.goals.len(),
            orders = report.orders.len(),
            settled = report.settled.len(),
            "Tick complete"
        );
        Ok(report)
    }

    /// Poll until shutdown or a cancelled gate wait. Returns final stats.
    pub async fn run(&mut self, mut shutdown: Shutdown) -> ExecutorStats {
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            threshold = %self.detector.threshold(),
            "Engine started"
        );

        loop {
            if shutdown.is_triggered() {
                break;
            }

            match self.tick().await {
                Ok(report) => {
                    if report.live_matches == 0 {
                        debug!("No live matches");
                    }
                }
                Err(e) if e.is_cancelled() => {
                    info!("Gate wait cancelled, stopping");
                    break;
                }
                Err(e) => error!(error = %e, "Poll failed, retrying next interval"),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown.cancelled() => break,
            }
        }

        if let Some(state) = &self.state {
            state.set_ready(false);
        }

        let stats = self.executor.stats();
        info!(
            trades = stats.total_trades,
            open = stats.open_positions,
            wins = stats.wins,
            losses = stats.losses,
            balance = %stats.balance,
            pnl = %stats.realized_pnl,
            win_rate = %stats.win_rate(),
            roi = %stats.roi(),
            "Engine stopped"
        );
        stats
    }

    async fn publish(&self) {
        if let Some(state) = &self.state {
            state.set_tracked_matches(self.tracker.tracked());
            state.publish_stats(self.executor.stats()).await;
            state.set_ready(true);
        }
    }
}

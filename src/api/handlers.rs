//! HTTP API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::gate::{GateState, RequestGate};
use crate::trading::ExecutorStats;

/// Application state shared with handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Whether the engine has completed a poll.
    pub ready: Arc<AtomicBool>,
    /// Live fixtures currently tracked.
    pub tracked_matches: Arc<AtomicUsize>,
    /// Executor stats.
    pub stats: Arc<tokio::sync::RwLock<ExecutorStats>>,
    /// Request gate shared with the API client.
    pub gate: Arc<RequestGate>,
}

impl AppState {
    /// Create new app state around the shared gate.
    pub fn new(gate: Arc<RequestGate>) -> Self {
        Self {
            ready: Arc::new(AtomicBool::new(false)),
            tracked_matches: Arc::new(AtomicUsize::new(0)),
            stats: Arc::new(tokio::sync::RwLock::new(ExecutorStats::default())),
            gate,
        }
    }

    /// Set ready state.
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if ready.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Publish the number of tracked fixtures.
    pub fn set_tracked_matches(&self, count: usize) {
        self.tracked_matches.store(count, Ordering::SeqCst);
    }

    /// Replace the published executor stats.
    pub async fn publish_stats(&self, stats: ExecutorStats) {
        *self.stats.write().await = stats;
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Status: "ok".
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Whether service is ready.
    pub ready: bool,
    /// Live fixtures being tracked.
    pub tracked_matches: usize,
}

/// Status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Service status.
    pub status: &'static str,
    /// Statistics.
    pub stats: StatsResponse,
    /// Request gate utilisation.
    pub gate: GateResponse,
}

/// Statistics in status response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Starting balance.
    pub initial_balance: String,
    /// Current balance.
    pub balance: String,
    /// Orders filled.
    pub total_trades: u64,
    /// Open positions.
    pub open_positions: usize,
    /// Closed positions.
    pub closed_positions: usize,
    /// Winning positions.
    pub wins: u64,
    /// Losing positions.
    pub losses: u64,
    /// Sum of stakes.
    pub total_staked: String,
    /// Realized P&L.
    pub realized_pnl: String,
    /// Win rate in percent.
    pub win_rate: String,
    /// ROI in percent.
    pub roi: String,
}

impl From<&ExecutorStats> for StatsResponse {
    fn from(stats: &ExecutorStats) -> Self {
        Self {
            initial_balance: stats.initial_balance.to_string(),
            balance: stats.balance.to_string(),
            total_trades: stats.total_trades,
            open_positions: stats.open_positions,
            closed_positions: stats.closed_positions,
            wins: stats.wins,
            losses: stats.losses,
            total_staked: stats.total_staked.to_string(),
            realized_pnl: stats.realized_pnl.to_string(),
            win_rate: stats.win_rate().to_string(),
            roi: stats.roi().to_string(),
        }
    }
}

/// Gate section of the status response.
#[derive(Debug, Serialize)]
pub struct GateResponse {
    /// Requests in the current window.
    pub used: usize,
    /// Requests allowed per window.
    pub limit: usize,
    /// Open or saturated.
    pub state: GateState,
}

/// Health check handler - always returns 200.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if ready, 503 otherwise.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let is_ready = state.is_ready();
    let response = ReadyResponse {
        ready: is_ready,
        tracked_matches: state.tracked_matches.load(Ordering::SeqCst),
    };

    if is_ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Status handler - returns engine status, statistics and gate usage.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let usage = state.gate.usage().await;
    let stats = StatsResponse::from(&*state.stats.read().await);

    let status = if state.is_ready() { "running" } else { "starting" };

    Json(StatusResponse {
        status,
        stats,
        gate: GateResponse {
            used: usage.used,
            limit: usage.limit,
            state: usage.state(),
        },
    })
}

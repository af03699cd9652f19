//! Prometheus metrics for API usage, gate pressure and trading.
//!
//! This module provides metrics for:
//! - Outbound API request counts and latency
//! - Request gate waits and cancellations
//! - Goals, signals, orders and settlements
//! - Engine tick latency

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::{debug, info};

// === Metric Name Constants ===

/// Outbound API requests counter metric name.
pub const METRIC_API_REQUESTS: &str = "api_requests_total";
/// Outbound API request latency metric name.
pub const METRIC_API_REQUEST_LATENCY: &str = "api_request_latency_ms";
/// Requests admitted in the current window gauge metric name.
pub const METRIC_GATE_IN_WINDOW: &str = "gate_requests_in_window";
/// Gate waits counter metric name.
pub const METRIC_GATE_WAITS: &str = "gate_waits_total";
/// Gate wait duration metric name.
pub const METRIC_GATE_WAIT_SECONDS: &str = "gate_wait_seconds";
/// Gate cancellations counter metric name.
pub const METRIC_GATE_CANCELLATIONS: &str = "gate_cancellations_total";
/// Goals detected counter metric name.
pub const METRIC_GOALS_DETECTED: &str = "goals_detected_total";
/// Signals counter metric name.
pub const METRIC_SIGNALS: &str = "signals_total";
/// Orders filled counter metric name.
pub const METRIC_ORDERS_FILLED: &str = "orders_filled_total";
/// Orders rejected counter metric name.
pub const METRIC_ORDERS_REJECTED: &str = "orders_rejected_total";
/// Positions settled counter metric name.
pub const METRIC_POSITIONS_SETTLED: &str = "positions_settled_total";
/// Engine tick latency metric name.
pub const METRIC_ENGINE_TICK_LATENCY: &str = "engine_tick_latency_ms";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_API_REQUEST_LATENCY,
        "Football API request latency in milliseconds"
    );
    describe_histogram!(
        METRIC_GATE_WAIT_SECONDS,
        "Time spent waiting for a free request slot in seconds"
    );
    describe_histogram!(
        METRIC_ENGINE_TICK_LATENCY,
        "Duration of one engine poll cycle in milliseconds"
    );

    describe_gauge!(
        METRIC_GATE_IN_WINDOW,
        "Requests admitted in the current rolling window"
    );

    // Counters
    describe_counter!(METRIC_API_REQUESTS, "Total football API requests sent");
    describe_counter!(METRIC_GATE_WAITS, "Total waits for a request slot");
    describe_counter!(
        METRIC_GATE_CANCELLATIONS,
        "Total gate waits abandoned on shutdown"
    );
    describe_counter!(METRIC_GOALS_DETECTED, "Total goals detected");
    describe_counter!(METRIC_SIGNALS, "Total signals generated, by action");
    describe_counter!(METRIC_ORDERS_FILLED, "Total simulated orders filled");
    describe_counter!(METRIC_ORDERS_REJECTED, "Total simulated orders rejected");
    describe_counter!(METRIC_POSITIONS_SETTLED, "Total positions settled");

    debug!("Metrics initialized");
}

/// Install the Prometheus exporter with an HTTP listener on `port`.
pub fn install_exporter(port: u16) -> Result<(), BuildError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

/// Increment API requests counter.
pub fn inc_api_requests(endpoint: &str) {
    counter!(METRIC_API_REQUESTS, "endpoint" => endpoint.to_string()).increment(1);
}

/// Record API request latency.
pub fn record_api_latency(start: Instant, endpoint: &str) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_API_REQUEST_LATENCY, "endpoint" => endpoint.to_string()).record(latency_ms);
}

/// Set the number of requests in the current window.
pub fn set_gate_in_window(count: usize) {
    gauge!(METRIC_GATE_IN_WINDOW).set(count as f64);
}

/// Record one gate wait and its planned duration.
pub fn record_gate_wait(wait: Duration) {
    counter!(METRIC_GATE_WAITS).increment(1);
    histogram!(METRIC_GATE_WAIT_SECONDS).record(wait.as_secs_f64());
}

/// Increment gate cancellations counter.
pub fn inc_gate_cancellations() {
    counter!(METRIC_GATE_CANCELLATIONS).increment(1);
}

/// Increment goals detected counter.
pub fn inc_goals_detected() {
    counter!(METRIC_GOALS_DETECTED).increment(1);
}

/// Increment signals counter for an action.
pub fn inc_signals(action: &'static str) {
    counter!(METRIC_SIGNALS, "action" => action).increment(1);
}

/// Increment orders filled counter.
pub fn inc_orders_filled() {
    counter!(METRIC_ORDERS_FILLED).increment(1);
}

/// Increment orders rejected counter.
pub fn inc_orders_rejected() {
    counter!(METRIC_ORDERS_REJECTED).increment(1);
}

/// Increment positions settled counter.
pub fn inc_positions_settled() {
    counter!(METRIC_POSITIONS_SETTLED).increment(1);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for an engine tick.
pub fn timer_engine_tick() -> LatencyTimer {
    LatencyTimer::new(METRIC_ENGINE_TICK_LATENCY)
}

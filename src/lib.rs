//! Live football underdog trading simulator.
//!
//! Polls API-Football for in-play matches, detects goals, and paper-trades
//! goals scored by the pre-match underdog.
//!
//! # Strategy
//!
//! A team priced at or above the underdog threshold (2.5 by default) that
//! scores is backed at its pre-match odds. Stake scales with the odds:
//!
//! ```text
//! Away odds:   6.0  (underdog)
//! Strength:    min(6.0 / 5, 1) = 1.0
//! Stake:       max_position_size × 1.0 = $100
//! Win payout:  $100 × 6.0 = $600
//! ```
//!
//! Every API request passes through a shared [`gate::RequestGate`], which
//! admits at most `API_RATE_LIMIT` requests in any trailing 60 seconds.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from environment
//! - [`error`]: Unified error types
//! - [`gate`]: Rolling-window request rate limiting
//! - [`football`]: API client, score tracking and mock API
//! - [`signal`]: Odds cache and underdog detection
//! - [`trading`]: Simulated orders, positions and settlement
//! - [`engine`]: The poll loop
//! - [`api`]: HTTP API for health/status
//! - [`metrics`]: Prometheus metrics
//! - [`utils`]: Shutdown signalling

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod football;
pub mod gate;
pub mod metrics;
pub mod signal;
pub mod trading;
pub mod utils;

pub use config::Config;
pub use engine::Engine;
pub use error::{BotError, Result};
pub use gate::RequestGate;

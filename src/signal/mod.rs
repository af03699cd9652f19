//! Signal module.
//!
//! This module handles:
//! - Caching pre-match odds
//! - Classifying scorers as underdogs
//! - Turning goal events into BUY/PASS signals

pub mod detector;
pub mod odds;

pub use detector::{implied_probability, signal_strength, BuySignal, Signal, UnderdogDetector};
pub use odds::{OddsCache, DEFAULT_ODDS_TTL};

//! Trading module for simulated order management.
//!
//! This module handles:
//! - Order records
//! - Position sizing and settlement
//! - Account statistics

pub mod executor;
pub mod order;
pub mod position;

pub use executor::{ExecutorStats, TradingExecutor};
pub use order::{Order, OrderStatus};
pub use position::{Position, PositionStatus};

//! Unified error types for the underdog engine.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::football::TeamSide;

/// Unified error type for the underdog engine.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Configuration loaded but failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Request gate error.
    #[error("request gate error: {0}")]
    Gate(#[from] GateError),

    /// Football data API error.
    #[error("football api error: {0}")]
    Api(#[from] ApiError),

    /// Simulated trading error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request gate errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// Limit must be a positive number of requests per window.
    #[error("invalid rate limit {limit}: must be at least 1 request per window")]
    InvalidConfiguration {
        /// The rejected limit.
        limit: i64,
    },

    /// Shutdown was signalled while waiting for a slot.
    #[error("request gate wait cancelled by shutdown")]
    Cancelled,
}

/// Football data API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request was not admitted by the gate.
    #[error("request not admitted: {0}")]
    Gate(#[from] GateError),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status.
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint path.
        endpoint: String,
        /// HTTP status code.
        status: u16,
    },

    /// API envelope carried errors.
    #[error("{endpoint} reported errors: {errors}")]
    Api {
        /// Endpoint path.
        endpoint: String,
        /// Raw error payload.
        errors: String,
    },

    /// Failed to parse a response.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl ApiError {
    /// True when the request was abandoned because of shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Gate(GateError::Cancelled))
    }
}

/// Simulated trading errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TradingError {
    /// Computed stake is not positive.
    #[error("invalid order size: {0}")]
    InvalidSize(Decimal),

    /// Account balance too low.
    #[error("insufficient balance: need {required}, have {available}")]
    InsufficientBalance {
        /// Required balance.
        required: Decimal,
        /// Available balance.
        available: Decimal,
    },

    /// A position on this fixture and side is already open.
    #[error("position already open on fixture {fixture_id} ({side})")]
    DuplicatePosition {
        /// Fixture ID.
        fixture_id: u64,
        /// Team side.
        side: TeamSide,
    },

    /// No open position to settle.
    #[error("no open position on fixture {fixture_id} ({side})")]
    PositionNotFound {
        /// Fixture ID.
        fixture_id: u64,
        /// Team side.
        side: TeamSide,
    },
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;

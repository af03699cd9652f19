//! Position tracking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;

use crate::football::TeamSide;

/// Lifecycle of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PositionStatus {
    /// Awaiting the final whistle.
    Open,
    /// Settled.
    Closed,
}

/// Position on one side of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Position {
    /// Fixture ID.
    pub fixture_id: u64,
    /// Team backed.
    pub team: String,
    /// Side backed.
    pub side: TeamSide,
    /// Amount staked.
    pub stake: Decimal,
    /// Odds at entry.
    pub entry_odds: Decimal,
    /// Order that opened the position.
    pub order_id: String,
    /// Current status.
    pub status: PositionStatus,
    /// Realized P&L once closed.
    pub realized_pnl: Option<Decimal>,
    /// When the position was opened.
    pub opened_at: DateTime<Utc>,
    /// When the position was closed.
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Gross payout if the backed side wins.
    pub fn payout_if_won(&self) -> Decimal {
        self.stake * self.entry_odds
    }

    /// Approximate cash-out P&L at the current odds.
    ///
    /// Shortening odds mean the position is worth more than the stake.
    /// Non-positive odds yield zero.
    pub fn unrealized_pnl(&self, current_odds: Decimal) -> Decimal {
        if current_odds <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.stake * self.entry_odds / current_odds - self.stake
    }

    /// Close the position, returning the amount credited back.
    pub(crate) fn close(&mut self, won: bool) -> Decimal {
        let credit = if won { self.payout_if_won() } else { Decimal::ZERO };
        self.realized_pnl = Some(credit - self.stake);
        self.status = PositionStatus::Closed;
        self.closed_at = Some(Utc::now());
        credit
    }

    /// Whether the position is still open.
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }
}

//! Paper-trading account that fills BUY signals and settles them.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::order::{sim_order_id, Order, OrderStatus};
use super::position::{Position, PositionStatus};
use crate::config::Config;
use crate::error::TradingError;
use crate::football::{FinalScore, TeamSide};
use crate::metrics;
use crate::signal::BuySignal;

/// Snapshot of account performance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutorStats {
    /// Starting balance.
    pub initial_balance: Decimal,
    /// Current balance.
    pub balance: Decimal,
    /// Orders filled.
    pub total_trades: u64,
    /// Positions awaiting settlement.
    pub open_positions: usize,
    /// Settled positions.
    pub closed_positions: usize,
    /// Settled positions that won.
    pub wins: u64,
    /// Settled positions that lost.
    pub losses: u64,
    /// Sum of all stakes.
    pub total_staked: Decimal,
    /// Realized P&L across settled positions.
    pub realized_pnl: Decimal,
}

impl ExecutorStats {
    /// Percentage of settled positions that won.
    pub fn win_rate(&self) -> Decimal {
        let settled = self.wins + self.losses;
        if settled == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.wins) * Decimal::ONE_HUNDRED / Decimal::from(settled)).round_dp(2)
    }

    /// Realized return on the starting balance, in percent.
    pub fn roi(&self) -> Decimal {
        if self.initial_balance <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (self.realized_pnl * Decimal::ONE_HUNDRED / self.initial_balance).round_dp(2)
    }
}

/// Simulated executor.
#[derive(Debug)]
pub struct TradingExecutor {
    initial_balance: Decimal,
    balance: Decimal,
    max_position_size: Decimal,
    open: HashMap<(u64, TeamSide), Position>,
    closed: Vec<Position>,
    orders: Vec<Order>,
    wins: u64,
    losses: u64,
    total_staked: Decimal,
    realized_pnl: Decimal,
}

impl TradingExecutor {
    /// Create an executor with a starting balance and stake cap.
    pub fn new(initial_balance: Decimal, max_position_size: Decimal) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
            max_position_size,
            open: HashMap::new(),
            closed: Vec::new(),
            orders: Vec::new(),
            wins: 0,
            losses: 0,
            total_staked: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
        }
    }

    /// Create an executor from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.initial_balance, config.max_position_size)
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Stake for a signal of the given strength.
    pub fn position_size(&self, signal_strength: Decimal) -> Decimal {
        (self.max_position_size * signal_strength).round_dp(2)
    }

    /// Open position on a fixture side.
    pub fn position(&self, fixture_id: u64, side: TeamSide) -> Option<&Position> {
        self.open.get(&(fixture_id, side))
    }

    /// Open positions.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.open.values()
    }

    /// Settled positions, oldest first.
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed
    }

    /// Filled orders, oldest first.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Fill a BUY signal.
    #[instrument(skip(self, signal), fields(fixture_id = signal.fixture_id, side = %signal.side))]
    pub fn execute(&mut self, signal: &BuySignal) -> Result<Order, TradingError> {
        let result = self.try_fill(signal);
        match &result {
            Ok(order) => {
                metrics::inc_orders_filled();
                info!(
                    order_id = %order.order_id,
                    team = %order.team,
                    stake = %order.stake,
                    odds = %order.odds,
                    balance = %self.balance,
                    "Simulated order filled"
                );
            }
            Err(e) => {
                metrics::inc_orders_rejected();
                warn!(error = %e, "Order rejected");
            }
        }
        result
    }

    fn try_fill(&mut self, signal: &BuySignal) -> Result<Order, TradingError> {
        let stake = self.position_size(signal.signal_strength);
        if stake <= Decimal::ZERO {
            return Err(TradingError::InvalidSize(stake));
        }

        let key = (signal.fixture_id, signal.side);
        if self.open.contains_key(&key) {
            return Err(TradingError::DuplicatePosition {
                fixture_id: signal.fixture_id,
                side: signal.side,
            });
        }

        if stake > self.balance {
            return Err(TradingError::InsufficientBalance {
                required: stake,
                available: self.balance,
            });
        }

        let now = Utc::now();
        let order = Order {
            order_id: sim_order_id(self.orders.len() as u64 + 1),
            fixture_id: signal.fixture_id,
            team: signal.team.clone(),
            side: signal.side,
            stake,
            odds: signal.odds,
            status: OrderStatus::Filled,
            placed_at: now,
        };

        self.balance -= stake;
        self.total_staked += stake;
        self.open.insert(
            key,
            Position {
                fixture_id: signal.fixture_id,
                team: signal.team.clone(),
                side: signal.side,
                stake,
                entry_odds: signal.odds,
                order_id: order.order_id.clone(),
                status: PositionStatus::Open,
                realized_pnl: None,
                opened_at: now,
                closed_at: None,
            },
        );
        self.orders.push(order.clone());

        Ok(order)
    }

    /// Settle an open position. Returns its realized P&L.
    pub fn settle(
        &mut self,
        fixture_id: u64,
        side: TeamSide,
        won: bool,
    ) -> Result<Decimal, TradingError> {
        let mut position = self
            .open
            .remove(&(fixture_id, side))
            .ok_or(TradingError::PositionNotFound { fixture_id, side })?;

        let credit = position.close(won);
        let pnl = position.realized_pnl.unwrap_or_default();

        self.balance += credit;
        self.realized_pnl += pnl;
        if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
        metrics::inc_positions_settled();

        info!(
            fixture_id,
            side = %side,
            won,
            pnl = %pnl,
            balance = %self.balance,
            "Position settled"
        );

        self.closed.push(position);
        Ok(pnl)
    }

    /// Settle every open position on a finished fixture.
    ///
    /// A draw loses both sides. Returns the positions closed.
    pub fn settle_fixture(&mut self, score: &FinalScore) -> Vec<Position> {
        let winner = score.winner();
        let mut settled = Vec::new();

        for side in [TeamSide::Home, TeamSide::Away] {
            if !self.open.contains_key(&(score.fixture_id, side)) {
                continue;
            }
            if self
                .settle(score.fixture_id, side, winner == Some(side))
                .is_ok()
            {
                if let Some(position) = self.closed.last() {
                    settled.push(position.clone());
                }
            }
        }

        settled
    }

    /// Current performance snapshot.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            initial_balance: self.initial_balance,
            balance: self.balance,
            total_trades: self.orders.len() as u64,
            open_positions: self.open.len(),
            closed_positions: self.closed.len(),
            wins: self.wins,
            losses: self.losses,
            total_staked: self.total_staked,
            realized_pnl: self.realized_pnl,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn signal(fixture_id: u64, side: TeamSide, odds: Decimal) -> BuySignal {
        BuySignal {
            fixture_id,
            team: "Underdog FC".to_string(),
            side,
            odds,
            signal_strength: crate::signal::signal_strength(odds),
            reason: "test".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn executor() -> TradingExecutor {
        TradingExecutor::new(dec!(10000), dec!(100))
    }

    #[test]
    fn stake_scales_with_strength() {
        let exec = executor();
        assert_eq!(exec.position_size(dec!(0.8)), dec!(80));
        assert_eq!(exec.position_size(dec!(1)), dec!(100));
        assert_eq!(exec.position_size(dec!(0.123456)), dec!(12.35));
    }

    #[test]
    fn fill_debits_balance_and_opens_position() {
        let mut exec = executor();
        let order = exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();

        assert_eq!(order.order_id, "SIM-000001");
        assert_eq!(order.stake, dec!(80));
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(exec.balance(), dec!(9920));
        assert!(exec.position(1, TeamSide::Away).unwrap().is_open());
    }

    #[test]
    fn order_ids_increment() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();
        let second = exec.execute(&signal(2, TeamSide::Home, dec!(3.0))).unwrap();
        assert_eq!(second.order_id, "SIM-000002");
        assert_eq!(exec.orders().len(), 2);
    }

    #[test]
    fn duplicate_position_rejected() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();
        let err = exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap_err();

        assert_eq!(
            err,
            TradingError::DuplicatePosition {
                fixture_id: 1,
                side: TeamSide::Away
            }
        );
        assert_eq!(exec.balance(), dec!(9920));
    }

    #[test]
    fn opposite_side_is_a_separate_position() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();
        assert!(exec.execute(&signal(1, TeamSide::Home, dec!(3.0))).is_ok());
    }

    #[test]
    fn insufficient_balance_rejected() {
        let mut exec = TradingExecutor::new(dec!(50), dec!(100));
        let err = exec.execute(&signal(1, TeamSide::Away, dec!(5.0))).unwrap_err();
        assert_eq!(
            err,
            TradingError::InsufficientBalance {
                required: dec!(100),
                available: dec!(50)
            }
        );
        assert_eq!(exec.stats().total_trades, 0);
    }

    #[test]
    fn zero_stake_rejected() {
        let mut exec = executor();
        let mut zero = signal(1, TeamSide::Away, dec!(4.0));
        zero.signal_strength = dec!(0);
        assert_eq!(
            exec.execute(&zero).unwrap_err(),
            TradingError::InvalidSize(dec!(0))
        );
    }

    #[test]
    fn settle_win_and_loss() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();
        exec.execute(&signal(2, TeamSide::Home, dec!(2.5))).unwrap();

        assert_eq!(exec.settle(1, TeamSide::Away, true).unwrap(), dec!(240));
        assert_eq!(exec.settle(2, TeamSide::Home, false).unwrap(), dec!(-50));

        let stats = exec.stats();
        assert_eq!(stats.balance, dec!(10190));
        assert_eq!(stats.realized_pnl, dec!(190));
        assert_eq!((stats.wins, stats.losses), (1, 1));
        assert_eq!(stats.win_rate(), dec!(50));
        assert_eq!(stats.roi(), dec!(1.9));
        assert_eq!(stats.open_positions, 0);
        assert_eq!(stats.closed_positions, 2);
    }

    #[test]
    fn settling_unknown_position_fails() {
        let mut exec = executor();
        assert_eq!(
            exec.settle(9, TeamSide::Home, true).unwrap_err(),
            TradingError::PositionNotFound {
                fixture_id: 9,
                side: TeamSide::Home
            }
        );
    }

    #[test]
    fn settle_fixture_uses_final_score() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();

        let settled = exec.settle_fixture(&FinalScore {
            fixture_id: 1,
            home: 1,
            away: 2,
        });

        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].realized_pnl, Some(dec!(240)));
        assert_eq!(exec.balance(), dec!(10240));
    }

    #[test]
    fn draw_loses_both_sides() {
        let mut exec = executor();
        exec.execute(&signal(1, TeamSide::Away, dec!(4.0))).unwrap();
        exec.execute(&signal(1, TeamSide::Home, dec!(3.0))).unwrap();

        let settled = exec.settle_fixture(&FinalScore {
            fixture_id: 1,
            home: 1,
            away: 1,
        });

        assert_eq!(settled.len(), 2);
        assert_eq!(exec.stats().losses, 2);
        assert_eq!(exec.balance(), dec!(9860));
    }

    #[test]
    fn settle_fixture_without_positions_is_noop() {
        let mut exec = executor();
        assert!(exec
            .settle_fixture(&FinalScore {
                fixture_id: 3,
                home: 0,
                away: 0
            })
            .is_empty());
    }

    #[test]
    fn empty_stats_have_zero_rates() {
        let stats = executor().stats();
        assert_eq!(stats.win_rate(), dec!(0));
        assert_eq!(stats.roi(), dec!(0));
    }
}

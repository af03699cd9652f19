//! Simulated order records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::football::TeamSide;

/// Order status. Simulated orders fill immediately; rejections surface as
/// [`crate::error::TradingError`] instead of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order is filled.
    #[strum(to_string = "filled", serialize = "FILLED")]
    Filled,
}

/// A simulated back order on one side of a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    /// Order ID, `SIM-000001` style.
    pub order_id: String,
    /// Fixture ID.
    pub fixture_id: u64,
    /// Team backed.
    pub team: String,
    /// Side backed.
    pub side: TeamSide,
    /// Amount staked.
    pub stake: Decimal,
    /// Decimal odds taken.
    pub odds: Decimal,
    /// Current status.
    pub status: OrderStatus,
    /// When the order was placed.
    pub placed_at: DateTime<Utc>,
}

impl Order {
    /// Gross return if the backed side wins.
    pub fn potential_return(&self) -> Decimal {
        self.stake * self.odds
    }
}

/// Format a sequential simulated order ID.
pub fn sim_order_id(sequence: u64) -> String {
    format!("SIM-{:06}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    #[test]
    fn order_ids_are_zero_padded() {
        assert_eq!(sim_order_id(1), "SIM-000001");
        assert_eq!(sim_order_id(123456), "SIM-123456");
        assert_eq!(sim_order_id(1234567), "SIM-1234567");
    }

    #[test]
    fn potential_return_is_stake_times_odds() {
        let order = Order {
            order_id: sim_order_id(1),
            fixture_id: 1,
            team: "Underdog FC".to_string(),
            side: TeamSide::Away,
            stake: dec!(80),
            odds: dec!(4.0),
            status: OrderStatus::Filled,
            placed_at: Utc::now(),
        };
        assert_eq!(order.potential_return(), dec!(320));
    }

    #[test]
    fn order_status_displays_lowercase() {
        assert_eq!(OrderStatus::from_str("FILLED").unwrap(), OrderStatus::Filled);
        assert_eq!(OrderStatus::from_str("filled").unwrap(), OrderStatus::Filled);
        assert_eq!(OrderStatus::Filled.to_string(), "filled");
        assert_eq!(serde_json::to_string(&OrderStatus::Filled).unwrap(), "\"filled\"");
    }
}

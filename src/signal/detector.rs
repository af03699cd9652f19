//! Underdog detection and trading signal generation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::odds::OddsCache;
use crate::config::Config;
use crate::error::ApiError;
use crate::football::{FootballApi, GoalEvent, MatchOdds, TeamSide};
use crate::metrics;

/// Odds at which signal strength saturates at 1.0.
const FULL_STRENGTH_ODDS: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// A recommendation to back the scoring underdog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuySignal {
    /// Fixture ID.
    pub fixture_id: u64,
    /// Scoring team.
    pub team: String,
    /// Scoring side.
    pub side: TeamSide,
    /// Pre-match odds of the scoring side.
    pub odds: Decimal,
    /// Strength in `[0, 1]`, higher for longer odds.
    pub signal_strength: Decimal,
    /// Human-readable reason.
    pub reason: String,
    /// When the goal was observed.
    pub timestamp: DateTime<Utc>,
}

/// Decision for a goal event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Signal {
    /// Back the scorer.
    Buy(BuySignal),
    /// Do nothing.
    Pass {
        /// Fixture ID.
        fixture_id: u64,
        /// Scoring team.
        team: String,
        /// Why no trade.
        reason: String,
    },
}

impl Signal {
    /// Label for logs and metrics.
    pub fn action(&self) -> &'static str {
        match self {
            Signal::Buy(_) => "BUY",
            Signal::Pass { .. } => "PASS",
        }
    }
}

/// Classifies scorers by pre-match odds.
#[derive(Debug)]
pub struct UnderdogDetector {
    threshold: Decimal,
    cache: OddsCache,
}

impl UnderdogDetector {
    /// Create a detector with a threshold and an odds cache.
    pub fn new(threshold: Decimal, cache: OddsCache) -> Self {
        Self { threshold, cache }
    }

    /// Create a detector from config.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.underdog_threshold,
            OddsCache::new(std::time::Duration::from_secs(config.odds_cache_ttl_secs)),
        )
    }

    /// Underdog threshold.
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// Odds cache.
    pub fn cache(&self) -> &OddsCache {
        &self.cache
    }

    /// Odds for a fixture, from cache when fresh, otherwise from the API.
    #[instrument(skip(self, api))]
    pub async fn fetch_match_odds<A: FootballApi>(
        &self,
        api: &A,
        fixture_id: u64,
    ) -> Result<Option<MatchOdds>, ApiError> {
        if let Some(odds) = self.cache.get(fixture_id) {
            debug!(fixture_id, "Odds cache hit");
            return Ok(Some(odds));
        }

        let odds = api.match_odds(fixture_id).await?;
        if let Some(odds) = odds {
            self.cache.insert(fixture_id, odds);
            info!(
                fixture_id,
                home = ?odds.home,
                draw = ?odds.draw,
                away = ?odds.away,
                "Fetched odds"
            );
        }
        Ok(odds)
    }

    /// Whether `side` is priced at or above the threshold.
    pub fn is_underdog(&self, odds: &MatchOdds, side: TeamSide) -> bool {
        match odds.for_side(side) {
            Some(price) if price > Decimal::ZERO => price >= self.threshold,
            _ => false,
        }
    }

    /// Decide what to do about a goal given the fixture's odds.
    pub fn evaluate(&self, goal: &GoalEvent, odds: Option<&MatchOdds>) -> Signal {
        let pass = |reason: String| Signal::Pass {
            fixture_id: goal.fixture_id,
            team: goal.scoring_team.clone(),
            reason,
        };

        let Some(odds) = odds else {
            return pass("No odds available".to_string());
        };

        if !self.is_underdog(odds, goal.side) {
            return pass("Scoring team is not underdog".to_string());
        }

        let price = odds.for_side(goal.side).unwrap_or_default();
        Signal::Buy(BuySignal {
            fixture_id: goal.fixture_id,
            team: goal.scoring_team.clone(),
            side: goal.side,
            odds: price,
            signal_strength: signal_strength(price),
            reason: format!("Underdog scored (odds: {})", price),
            timestamp: goal.timestamp,
        })
    }

    /// Fetch odds for the goal's fixture and evaluate it.
    #[instrument(skip(self, api, goal), fields(fixture_id = goal.fixture_id, side = %goal.side))]
    pub async fn analyze_goal<A: FootballApi>(
        &self,
        api: &A,
        goal: &GoalEvent,
    ) -> Result<Signal, ApiError> {
        let odds = self.fetch_match_odds(api, goal.fixture_id).await?;
        let signal = self.evaluate(goal, odds.as_ref());

        metrics::inc_signals(signal.action());
        match &signal {
            Signal::Buy(buy) => info!(
                team = %buy.team,
                odds = %buy.odds,
                strength = %buy.signal_strength,
                "Underdog goal: BUY signal"
            ),
            Signal::Pass { reason, .. } => info!(%reason, "No trade"),
        }

        Ok(signal)
    }
}

/// Convert decimal odds to implied probability. Zero for non-positive odds.
pub fn implied_probability(odds: Decimal) -> Decimal {
    if odds <= Decimal::ZERO {
        Decimal::ZERO
    } else {
        Decimal::ONE / odds
    }
}

/// Normalise odds to a `[0, 1]` strength, saturating at 5.0.
pub fn signal_strength(odds: Decimal) -> Decimal {
    (odds / FULL_STRENGTH_ODDS).min(Decimal::ONE).max(Decimal::ZERO)
}

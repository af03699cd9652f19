//! Football data module.
//!
//! This module handles:
//! - API-Football wire and domain types
//! - The gated HTTP client and the `FootballApi` seam
//! - Live score tracking and goal detection
//! - Mock API for testing and offline simulation

pub mod client;
pub mod mock;
pub mod tracker;
pub mod types;

pub use client::{ApiFootballClient, FootballApi};
pub use mock::{MockFixtureBuilder, MockFootballApi};
pub use tracker::{MatchTracker, ScanReport, ScoreSnapshot};
pub use types::{
    league_name, FinalScore, Fixture, FixtureStatus, GoalEvent, MatchOdds, TeamSide,
};

//! In-memory football API for tests and offline simulation.
//!
//! This module provides a mock that can stand in for [`ApiFootballClient`]
//! without making real network requests. When given a gate it acquires a slot
//! per call exactly like the real client, so throttling is observable.
//!
//! [`ApiFootballClient`]: super::client::ApiFootballClient

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;

use crate::error::ApiError;
use crate::gate::RequestGate;

use super::client::FootballApi;
use super::types::{
    Fixture, FixtureInfo, Goals, LeagueInfo, MatchOdds, StatusInfo, Team, Teams,
};

/// Builder for fixture rows.
#[derive(Debug, Clone)]
pub struct MockFixtureBuilder {
    fixture: Fixture,
}

impl MockFixtureBuilder {
    /// Start a fixture between two teams, not yet kicked off.
    pub fn new(id: u64, home: &str, away: &str) -> Self {
        Self {
            fixture: Fixture {
                fixture: FixtureInfo {
                    id,
                    date: None,
                    status: StatusInfo {
                        long: "Not Started".to_string(),
                        short: "NS".to_string(),
                        elapsed: None,
                    },
                },
                league: LeagueInfo {
                    id: 39,
                    name: "Premier League".to_string(),
                    country: Some("England".to_string()),
                },
                teams: Teams {
                    home: Team {
                        id: id * 10 + 1,
                        name: home.to_string(),
                    },
                    away: Team {
                        id: id * 10 + 2,
                        name: away.to_string(),
                    },
                },
                goals: Goals::default(),
            },
        }
    }

    /// Set the league.
    pub fn league(mut self, id: u32) -> Self {
        self.fixture.league.id = id;
        self.fixture.league.name = super::types::league_name(id)
            .unwrap_or("Unknown League")
            .to_string();
        self
    }

    /// Set status code and elapsed minutes.
    pub fn status(mut self, short: &str, elapsed: Option<u32>) -> Self {
        self.fixture.fixture.status.short = short.to_string();
        self.fixture.fixture.status.long = short.to_string();
        self.fixture.fixture.status.elapsed = elapsed;
        self
    }

    /// Mark as in play at a minute.
    pub fn live(self, minute: u32) -> Self {
        let short = if minute <= 45 { "1H" } else { "2H" };
        self.status(short, Some(minute))
    }

    /// Mark as full time.
    pub fn finished(self) -> Self {
        self.status("FT", Some(90))
    }

    /// Set the score.
    pub fn score(mut self, home: u32, away: u32) -> Self {
        self.fixture.goals = Goals {
            home: Some(home),
            away: Some(away),
        };
        self
    }

    /// Build the fixture.
    pub fn build(self) -> Fixture {
        self.fixture
    }
}

/// Mock football API.
#[derive(Debug, Clone, Default)]
pub struct MockFootballApi {
    /// Fixtures returned by the date lookup.
    scheduled: Arc<Mutex<Vec<Fixture>>>,
    /// Fixtures returned by the live lookup.
    live: Arc<Mutex<Vec<Fixture>>>,
    /// Rows served by the ID lookup ahead of the live and date lists.
    results: Arc<Mutex<HashMap<u64, Fixture>>>,
    /// Odds by fixture ID.
    odds: Arc<Mutex<HashMap<u64, MatchOdds>>>,
    /// Calls made through the API surface.
    requests: Arc<AtomicUsize>,
    /// Optional gate acquired per call.
    gate: Option<Arc<RequestGate>>,
    /// Fail every live lookup.
    fail_live: bool,
}

impl MockFootballApi {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that acquires from `gate` before each call.
    pub fn with_gate(gate: Arc<RequestGate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    /// Make live lookups fail with an API error.
    pub fn failing_live(mut self) -> Self {
        self.fail_live = true;
        self
    }

    /// Replace the day's fixture list.
    pub fn set_scheduled(&self, fixtures: Vec<Fixture>) {
        *lock(&self.scheduled) = fixtures;
    }

    /// Replace the live fixture list.
    pub fn set_live(&self, fixtures: Vec<Fixture>) {
        *lock(&self.live) = fixtures;
    }

    /// Serve `fixture` from the ID lookup, e.g. a full-time row for a match
    /// that has left the live list.
    pub fn set_result(&self, fixture: Fixture) {
        lock(&self.results).insert(fixture.id(), fixture);
    }

    /// Set odds for a fixture.
    pub fn set_odds(&self, fixture_id: u64, odds: MatchOdds) {
        lock(&self.odds).insert(fixture_id, odds);
    }

    /// Number of calls made so far.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    async fn admit(&self) -> Result<(), ApiError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await?;
        }
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FootballApi for MockFootballApi {
    async fn fixtures_by_date(&self, _date: NaiveDate) -> Result<Vec<Fixture>, ApiError> {
        self.admit().await?;
        Ok(lock(&self.scheduled).clone())
    }

    async fn live_fixtures(&self) -> Result<Vec<Fixture>, ApiError> {
        self.admit().await?;
        if self.fail_live {
            return Err(ApiError::Api {
                endpoint: "fixtures".to_string(),
                errors: "mock failure".to_string(),
            });
        }
        Ok(lock(&self.live).clone())
    }

    async fn fixtures_by_ids(&self, ids: &[u64]) -> Result<Vec<Fixture>, ApiError> {
        self.admit().await?;
        let results = lock(&self.results);
        let live = lock(&self.live);
        let scheduled = lock(&self.scheduled);

        Ok(ids
            .iter()
            .filter_map(|id| {
                results
                    .get(id)
                    .or_else(|| live.iter().find(|f| f.id() == *id))
                    .or_else(|| scheduled.iter().find(|f| f.id() == *id))
                    .cloned()
            })
            .collect())
    }

    async fn match_odds(&self, fixture_id: u64) -> Result<Option<MatchOdds>, ApiError> {
        self.admit().await?;
        Ok(lock(&self.odds).get(&fixture_id).copied())
    }
}

//! Live score tracking and goal detection.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::metrics;

use super::client::FootballApi;
use super::types::{FinalScore, Fixture, GoalEvent, TeamSide};

/// Last observed score of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreSnapshot {
    /// Home goals.
    pub home: u32,
    /// Away goals.
    pub away: u32,
}

/// Outcome of ingesting one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Goals scored since the previous poll.
    pub goals: Vec<GoalEvent>,
    /// Tracked fixtures that have finished.
    pub finished: Vec<FinalScore>,
    /// Tracked fixtures forgotten because they will not be played out.
    pub dropped: Vec<u64>,
    /// Tracked fixtures absent from the poll, in ascending ID order.
    pub missing: Vec<u64>,
    /// In-play fixtures seen in this poll.
    pub live_count: usize,
}

impl ScanReport {
    /// Fold in the outcome of an ID lookup. `missing` and `live_count` stay
    /// as the live poll left them.
    pub fn merge(&mut self, other: ScanReport) {
        self.goals.extend(other.goals);
        self.finished.extend(other.finished);
        self.dropped.extend(other.dropped);
    }
}

/// Tracks scores across polls and reports goals as they happen.
///
/// The first sighting of a fixture only records a baseline, so goals scored
/// before tracking started never produce events. The live feed only lists
/// fixtures in play, so a tracked fixture that leaves it is looked up by ID
/// to learn whether it finished.
#[derive(Debug, Default)]
pub struct MatchTracker {
    snapshots: HashMap<u64, ScoreSnapshot>,
}

impl MatchTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of fixtures being tracked.
    pub fn tracked(&self) -> usize {
        self.snapshots.len()
    }

    /// Last snapshot of a fixture.
    pub fn snapshot(&self, fixture_id: u64) -> Option<ScoreSnapshot> {
        self.snapshots.get(&fixture_id).copied()
    }

    /// Compare a live poll against the stored snapshots.
    pub fn ingest(&mut self, fixtures: &[Fixture]) -> ScanReport {
        let mut report = ScanReport::default();
        let mut seen = HashSet::with_capacity(fixtures.len());

        for fixture in fixtures {
            seen.insert(fixture.id());
            if fixture.status().is_in_play() {
                report.live_count += 1;
            }
            self.observe(fixture, true, &mut report);
        }

        report.missing = self
            .snapshots
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();
        report.missing.sort_unstable();

        report
    }

    /// Apply rows fetched by ID for fixtures missing from the live poll.
    ///
    /// Finished fixtures are reported and forgotten, fixtures that will not
    /// be played out are dropped, and rows still in play are compared as
    /// usual. Untracked rows never start tracking here.
    pub fn reconcile(&mut self, fixtures: &[Fixture]) -> ScanReport {
        let mut report = ScanReport::default();
        for fixture in fixtures {
            self.observe(fixture, false, &mut report);
        }
        report
    }

    fn observe(&mut self, fixture: &Fixture, baseline: bool, report: &mut ScanReport) {
        let id = fixture.id();
        let status = fixture.status();
        let (home, away) = fixture.score();
        let current = ScoreSnapshot { home, away };

        if status.is_finished() {
            if self.snapshots.remove(&id).is_some() {
                info!(fixture_id = id, home, away, "Tracked fixture finished");
                report.finished.push(FinalScore {
                    fixture_id: id,
                    home,
                    away,
                });
            }
            return;
        }

        if status.is_off() {
            if self.snapshots.remove(&id).is_some() {
                warn!(fixture_id = id, %status, "Tracked fixture will not finish, dropped");
                report.dropped.push(id);
            }
            return;
        }

        if !status.is_in_play() {
            return;
        }

        let previous = match self.snapshots.get(&id).copied() {
            Some(previous) => previous,
            None if baseline => {
                self.snapshots.insert(id, current);
                debug!(fixture_id = id, home, away, "Baseline recorded");
                return;
            }
            None => return,
        };
        self.snapshots.insert(id, current);

        if home > previous.home {
            report_goal(report, goal_event(fixture, TeamSide::Home, current));
        }
        if away > previous.away {
            report_goal(report, goal_event(fixture, TeamSide::Away, current));
        }
        if home < previous.home || away < previous.away {
            debug!(fixture_id = id, "Score went down, goal overturned");
        }
    }

    /// Poll live fixtures and report goals since the previous poll.
    ///
    /// Tracked fixtures missing from the live feed cost one extra gated
    /// lookup per batch. A failed lookup keeps them tracked for the next
    /// poll; a cancelled gate wait is returned.
    #[instrument(skip(self, api))]
    pub async fn scan_for_goals<A: FootballApi>(
        &mut self,
        api: &A,
    ) -> Result<ScanReport, ApiError> {
        let fixtures = api.live_fixtures().await?;
        let mut report = self.ingest(&fixtures);

        if report.missing.is_empty() {
            return Ok(report);
        }

        debug!(missing = ?report.missing, "Tracked fixtures left the live feed");
        match api.fixtures_by_ids(&report.missing).await {
            Ok(rows) => report.merge(self.reconcile(&rows)),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => warn!(error = %e, "Fixture lookup failed, retrying next poll"),
        }
        Ok(report)
    }

    /// Today's fixtures in the tracked leagues.
    pub async fn fixtures_today<A: FootballApi>(api: &A) -> Result<Vec<Fixture>, ApiError> {
        api.fixtures_by_date(today()).await
    }
}

fn report_goal(report: &mut ScanReport, goal: GoalEvent) {
    metrics::inc_goals_detected();
    info!(
        fixture_id = goal.fixture_id,
        team = %goal.scoring_team,
        side = %goal.side,
        minute = ?goal.minute,
        score = %format!("{}-{}", goal.home_score, goal.away_score),
        "Goal detected"
    );
    report.goals.push(goal);
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn goal_event(fixture: &Fixture, side: TeamSide, score: ScoreSnapshot) -> GoalEvent {
    GoalEvent {
        fixture_id: fixture.id(),
        scoring_team: fixture.team_name(side).to_string(),
        side,
        minute: fixture.fixture.status.elapsed,
        home_score: score.home,
        away_score: score.away,
        timestamp: Utc::now(),
    }
}

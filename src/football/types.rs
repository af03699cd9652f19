//! API-Football wire types and domain types derived from them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString};

/// Which team in a fixture.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    /// Home team.
    #[default]
    #[strum(to_string = "home", serialize = "HOME", serialize = "Home")]
    Home,
    /// Away team.
    #[strum(to_string = "away", serialize = "AWAY", serialize = "Away")]
    Away,
}

impl TeamSide {
    /// Get the other side.
    pub fn opposite(&self) -> Self {
        match self {
            TeamSide::Home => TeamSide::Away,
            TeamSide::Away => TeamSide::Home,
        }
    }
}

/// Fixture status, parsed from the API short code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString)]
pub enum FixtureStatus {
    /// Time to be defined.
    #[strum(serialize = "TBD")]
    ToBeDefined,
    /// Not started.
    #[strum(serialize = "NS")]
    NotStarted,
    /// First half.
    #[strum(serialize = "1H")]
    FirstHalf,
    /// Half time.
    #[strum(serialize = "HT")]
    HalfTime,
    /// Second half.
    #[strum(serialize = "2H")]
    SecondHalf,
    /// Extra time.
    #[strum(serialize = "ET")]
    ExtraTime,
    /// Break before extra time.
    #[strum(serialize = "BT")]
    BreakTime,
    /// Penalty shootout in progress.
    #[strum(serialize = "P")]
    Penalties,
    /// Suspended.
    #[strum(serialize = "SUSP")]
    Suspended,
    /// Interrupted.
    #[strum(serialize = "INT")]
    Interrupted,
    /// In progress, phase unknown.
    #[strum(serialize = "LIVE")]
    Live,
    /// Full time.
    #[strum(serialize = "FT")]
    FullTime,
    /// Finished after extra time.
    #[strum(serialize = "AET")]
    AfterExtraTime,
    /// Finished after penalties.
    #[strum(serialize = "PEN")]
    AfterPenalties,
    /// Postponed.
    #[strum(serialize = "PST")]
    Postponed,
    /// Cancelled.
    #[strum(serialize = "CANC")]
    Cancelled,
    /// Abandoned.
    #[strum(serialize = "ABD")]
    Abandoned,
    /// Technical loss.
    #[strum(serialize = "AWD")]
    Awarded,
    /// Walkover.
    #[strum(serialize = "WO")]
    Walkover,
    /// Unrecognised code.
    #[strum(default)]
    Unknown(String),
}

impl FixtureStatus {
    /// Ball in play or a scheduled break inside the match.
    pub fn is_in_play(&self) -> bool {
        matches!(
            self,
            FixtureStatus::FirstHalf
                | FixtureStatus::HalfTime
                | FixtureStatus::SecondHalf
                | FixtureStatus::ExtraTime
                | FixtureStatus::BreakTime
                | FixtureStatus::Penalties
                | FixtureStatus::Suspended
                | FixtureStatus::Interrupted
                | FixtureStatus::Live
        )
    }

    /// Match completed with a result.
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            FixtureStatus::FullTime | FixtureStatus::AfterExtraTime | FixtureStatus::AfterPenalties
        )
    }

    /// Match will not be played out: postponed, cancelled, abandoned or decided off the pitch.
    pub fn is_off(&self) -> bool {
        matches!(
            self,
            FixtureStatus::Postponed
                | FixtureStatus::Cancelled
                | FixtureStatus::Abandoned
                | FixtureStatus::Awarded
                | FixtureStatus::Walkover
        )
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Either `[]` or an object keyed by field when the request failed.
    #[serde(default)]
    pub errors: Value,
    /// Result rows.
    #[serde(default = "Vec::new")]
    pub response: Vec<T>,
}

impl<T> ApiEnvelope<T> {
    /// Errors rendered as a string, if any were reported.
    pub fn error_message(&self) -> Option<String> {
        match &self.errors {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

/// A fixture row from `/fixtures`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Fixture {
    /// Fixture metadata.
    pub fixture: FixtureInfo,
    /// League metadata.
    pub league: LeagueInfo,
    /// Both teams.
    pub teams: Teams,
    /// Current score.
    pub goals: Goals,
}

impl Fixture {
    /// Fixture ID.
    pub fn id(&self) -> u64 {
        self.fixture.id
    }

    /// Parsed status.
    pub fn status(&self) -> FixtureStatus {
        self.fixture.status.parsed()
    }

    /// Team name for a side.
    pub fn team_name(&self, side: TeamSide) -> &str {
        match side {
            TeamSide::Home => &self.teams.home.name,
            TeamSide::Away => &self.teams.away.name,
        }
    }

    /// Current score as (home, away), treating missing goals as 0.
    pub fn score(&self) -> (u32, u32) {
        (self.goals.home.unwrap_or(0), self.goals.away.unwrap_or(0))
    }
}

/// Fixture metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureInfo {
    /// Fixture ID.
    pub id: u64,
    /// Kick-off time.
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    /// Status block.
    pub status: StatusInfo,
}

/// Status block.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusInfo {
    /// Human-readable status.
    #[serde(default)]
    pub long: String,
    /// Short code, e.g. `1H` or `FT`.
    #[serde(default)]
    pub short: String,
    /// Minutes played.
    #[serde(default)]
    pub elapsed: Option<u32>,
}

impl StatusInfo {
    /// Parse the short code.
    pub fn parsed(&self) -> FixtureStatus {
        self.short
            .parse()
            .unwrap_or_else(|_| FixtureStatus::Unknown(self.short.clone()))
    }
}

/// League metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeagueInfo {
    /// League ID.
    pub id: u32,
    /// League name.
    #[serde(default)]
    pub name: String,
    /// Country.
    #[serde(default)]
    pub country: Option<String>,
}

/// Both teams.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Teams {
    /// Home team.
    pub home: Team,
    /// Away team.
    pub away: Team,
}

/// A team.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Team {
    /// Team ID.
    pub id: u64,
    /// Team name.
    pub name: String,
}

/// Score block. Null before kick-off.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Goals {
    /// Home goals.
    pub home: Option<u32>,
    /// Away goals.
    pub away: Option<u32>,
}

/// An odds row from `/odds`.
#[derive(Debug, Clone, Deserialize)]
pub struct OddsResponse {
    /// Bookmakers quoting this fixture.
    #[serde(default)]
    pub bookmakers: Vec<Bookmaker>,
}

/// A bookmaker's markets.
#[derive(Debug, Clone, Deserialize)]
pub struct Bookmaker {
    /// Bookmaker ID.
    pub id: u32,
    /// Bookmaker name.
    #[serde(default)]
    pub name: String,
    /// Markets.
    #[serde(default)]
    pub bets: Vec<Bet>,
}

/// A market and its selections.
#[derive(Debug, Clone, Deserialize)]
pub struct Bet {
    /// Market ID (1 = Match Winner).
    pub id: u32,
    /// Market name.
    #[serde(default)]
    pub name: String,
    /// Selections.
    #[serde(default)]
    pub values: Vec<BetValue>,
}

/// A selection with decimal odds.
#[derive(Debug, Clone, Deserialize)]
pub struct BetValue {
    /// Label, e.g. `Home`.
    pub value: String,
    /// Decimal odds as a string.
    pub odd: String,
}

/// Pre-match match-winner odds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchOdds {
    /// Home win.
    pub home: Option<Decimal>,
    /// Draw.
    pub draw: Option<Decimal>,
    /// Away win.
    pub away: Option<Decimal>,
}

impl MatchOdds {
    /// Odds for a side's win.
    pub fn for_side(&self, side: TeamSide) -> Option<Decimal> {
        match side {
            TeamSide::Home => self.home,
            TeamSide::Away => self.away,
        }
    }

    /// Extract the first bookmaker's first market from an odds response.
    pub fn from_response(response: &OddsResponse) -> Option<Self> {
        let bet = response.bookmakers.first()?.bets.first()?;

        let mut odds = MatchOdds::default();
        for selection in &bet.values {
            let Ok(price) = selection.odd.parse::<Decimal>() else {
                continue;
            };
            match selection.value.as_str() {
                "Home" => odds.home = Some(price),
                "Draw" => odds.draw = Some(price),
                "Away" => odds.away = Some(price),
                _ => {}
            }
        }
        Some(odds)
    }
}

/// A goal detected between two polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoalEvent {
    /// Fixture ID.
    pub fixture_id: u64,
    /// Scoring team name.
    pub scoring_team: String,
    /// Scoring side.
    pub side: TeamSide,
    /// Match minute when observed.
    pub minute: Option<u32>,
    /// Home score after the goal.
    pub home_score: u32,
    /// Away score after the goal.
    pub away_score: u32,
    /// When the goal was observed.
    pub timestamp: DateTime<Utc>,
}

/// Result of a finished fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalScore {
    /// Fixture ID.
    pub fixture_id: u64,
    /// Home goals.
    pub home: u32,
    /// Away goals.
    pub away: u32,
}

impl FinalScore {
    /// Winning side, `None` for a draw.
    pub fn winner(&self) -> Option<TeamSide> {
        match self.home.cmp(&self.away) {
            std::cmp::Ordering::Greater => Some(TeamSide::Home),
            std::cmp::Ordering::Less => Some(TeamSide::Away),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// Display name of a known league.
pub fn league_name(id: u32) -> Option<&'static str> {
    match id {
        39 => Some("Premier League"),
        140 => Some("La Liga"),
        135 => Some("Serie A"),
        78 => Some("Bundesliga"),
        61 => Some("Ligue 1"),
        2 => Some("UEFA Champions League"),
        3 => Some("UEFA Europa League"),
        _ => None,
    }
}

//! API-Football HTTP client.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::gate::RequestGate;
use crate::metrics;

use super::types::{ApiEnvelope, Fixture, MatchOdds, OddsResponse};

/// Bet ID of the match-winner (1X2) market.
pub const MATCH_WINNER_BET_ID: u32 = 1;

/// Most fixture IDs the `ids` filter accepts per request.
pub const MAX_IDS_PER_REQUEST: usize = 20;

/// Fixture and odds lookups the engine depends on.
pub trait FootballApi: Send + Sync {
    /// Fixtures on a date, in the tracked leagues.
    fn fixtures_by_date(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<Fixture>, ApiError>> + Send;

    /// Fixtures currently in play, in the tracked leagues.
    fn live_fixtures(&self) -> impl Future<Output = Result<Vec<Fixture>, ApiError>> + Send;

    /// Current rows for specific fixtures, whatever their status. IDs the
    /// API does not know are absent from the result.
    fn fixtures_by_ids(
        &self,
        ids: &[u64],
    ) -> impl Future<Output = Result<Vec<Fixture>, ApiError>> + Send;

    /// Match-winner odds for a fixture. `None` when no bookmaker quotes it.
    fn match_odds(
        &self,
        fixture_id: u64,
    ) -> impl Future<Output = Result<Option<MatchOdds>, ApiError>> + Send;
}

/// API-Football v3 client. Every request passes through the shared gate.
#[derive(Debug, Clone)]
pub struct ApiFootballClient {
    /// HTTP client for API requests.
    http: reqwest::Client,
    /// Base URL without trailing slash.
    base_url: String,
    /// Shared request gate.
    gate: Arc<RequestGate>,
    /// Tracked league IDs.
    leagues: Vec<u32>,
    /// Bookmaker for odds.
    bookmaker_id: u32,
}

impl ApiFootballClient {
    /// Create a new client from config.
    pub fn new(config: &Config, gate: Arc<RequestGate>) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_football_key)
            .map_err(|e| ApiError::Parse(format!("API key is not a valid header value: {}", e)))?;
        headers.insert("x-apisports-key", key);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base().to_string(),
            gate,
            leagues: config.leagues.clone(),
            bookmaker_id: config.bookmaker_id,
        })
    }

    /// Get the shared gate.
    pub fn gate(&self) -> &Arc<RequestGate> {
        &self.gate
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Value for the `live` filter, e.g. `39-140-135`.
    fn live_filter(&self) -> String {
        self.leagues
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Values for the `ids` filter, one per request, e.g. `101-102-103`.
    fn ids_filters(ids: &[u64]) -> Vec<String> {
        ids.chunks(MAX_IDS_PER_REQUEST)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect()
    }

    /// Issue one gated GET and unwrap the response envelope.
    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, ApiError> {
        self.gate.acquire().await?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let start = Instant::now();
        metrics::inc_api_requests(endpoint);

        let response = self.http.get(&url).query(query).send().await?;
        metrics::record_api_latency(start, endpoint);

        if !response.status().is_success() {
            return Err(ApiError::Status {
                endpoint: endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("{}: {}", endpoint, e)))?;

        if let Some(errors) = envelope.error_message() {
            warn!(endpoint, %errors, "API reported errors");
            return Err(ApiError::Api {
                endpoint: endpoint.to_string(),
                errors,
            });
        }

        debug!(endpoint, rows = envelope.response.len(), "API response");
        Ok(envelope.response)
    }

    /// Connectivity check. Returns the number of timezones the API knows.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<usize, ApiError> {
        let zones: Vec<String> = self.get("timezone", &[]).await?;
        Ok(zones.len())
    }
}

impl FootballApi for ApiFootballClient {
    #[instrument(skip(self))]
    async fn fixtures_by_date(&self, date: NaiveDate) -> Result<Vec<Fixture>, ApiError> {
        let fixtures: Vec<Fixture> = self
            .get("fixtures", &[("date", date.format("%Y-%m-%d").to_string())])
            .await?;

        Ok(fixtures
            .into_iter()
            .filter(|f| self.leagues.contains(&f.league.id))
            .collect())
    }

    #[instrument(skip(self))]
    async fn live_fixtures(&self) -> Result<Vec<Fixture>, ApiError> {
        self.get("fixtures", &[("live", self.live_filter())]).await
    }

    #[instrument(skip(self))]
    async fn fixtures_by_ids(&self, ids: &[u64]) -> Result<Vec<Fixture>, ApiError> {
        let mut fixtures = Vec::with_capacity(ids.len());
        for filter in Self::ids_filters(ids) {
            let rows: Vec<Fixture> = self.get("fixtures", &[("ids", filter)]).await?;
            fixtures.extend(rows);
        }
        Ok(fixtures)
    }

    #[instrument(skip(self))]
    async fn match_odds(&self, fixture_id: u64) -> Result<Option<MatchOdds>, ApiError> {
        let rows: Vec<OddsResponse> = self
            .get(
                "odds",
                &[
                    ("fixture", fixture_id.to_string()),
                    ("bookmaker", self.bookmaker_id.to_string()),
                    ("bet", MATCH_WINNER_BET_ID.to_string()),
                ],
            )
            .await?;

        let odds = rows.first().and_then(MatchOdds::from_response);
        if odds.is_none() {
            debug!(fixture_id, "No odds available");
        }
        Ok(odds)
    }
}

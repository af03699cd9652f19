//! Application configuration loaded from environment variables.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === API-Football ===
    /// API-Football key, sent as `x-apisports-key`.
    pub api_football_key: String,

    /// API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Outbound requests allowed per rolling 60-second window.
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: i64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    // === Trading Parameters ===
    /// Starting balance of the simulated account.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,

    /// Stake for a full-strength signal.
    #[serde(default = "default_max_position_size")]
    pub max_position_size: Decimal,

    /// Minimum pre-match odds for a team to count as the underdog.
    #[serde(default = "default_underdog_threshold")]
    pub underdog_threshold: Decimal,

    // === Polling ===
    /// Seconds between live scans.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// League IDs to track (comma-separated in the environment).
    #[serde(default = "default_leagues", deserialize_with = "deserialize_leagues")]
    pub leagues: Vec<u32>,

    /// Bookmaker used for odds (8 = Bet365).
    #[serde(default = "default_bookmaker_id")]
    pub bookmaker_id: u32,

    /// How long fetched odds stay cached.
    #[serde(default = "default_odds_cache_ttl")]
    pub odds_cache_ttl_secs: u64,

    // === Server Configuration ===
    /// HTTP server port for health/status endpoints.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prometheus exporter port. Exporter is off when unset.
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

fn default_api_base_url() -> String {
    "https://v3.football.api-sports.io".to_string()
}

fn default_api_rate_limit() -> i64 {
    10
}

fn default_http_timeout() -> u64 {
    10
}

fn default_initial_balance() -> Decimal {
    Decimal::new(10_000, 0)
}

fn default_max_position_size() -> Decimal {
    Decimal::new(100, 0)
}

fn default_underdog_threshold() -> Decimal {
    Decimal::new(25, 1) // 2.5
}

fn default_poll_interval() -> u64 {
    30
}

fn default_leagues() -> Vec<u32> {
    vec![39, 140, 135, 78, 61]
}

/// Parse a comma-separated league list, e.g. `"39, 140 ,61"`.
pub fn parse_leagues(raw: &str) -> Result<Vec<u32>, std::num::ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::parse)
        .collect()
}

fn deserialize_leagues<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_leagues(&raw)
        .map_err(|e| serde::de::Error::custom(format!("invalid league id in {:?}: {}", raw, e)))
}

fn default_bookmaker_id() -> u32 {
    8
}

fn default_odds_cache_ttl() -> u64 {
    3600
}

fn default_port() -> u16 {
    8080
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Build a config with defaults for everything but the API key.
    pub fn with_api_key(api_football_key: impl Into<String>) -> Self {
        Self {
            api_football_key: api_football_key.into(),
            api_base_url: default_api_base_url(),
            api_rate_limit: default_api_rate_limit(),
            http_timeout_secs: default_http_timeout(),
            initial_balance: default_initial_balance(),
            max_position_size: default_max_position_size(),
            underdog_threshold: default_underdog_threshold(),
            poll_interval: default_poll_interval(),
            leagues: default_leagues(),
            bookmaker_id: default_bookmaker_id(),
            odds_cache_ttl_secs: default_odds_cache_ttl(),
            port: default_port(),
            metrics_port: None,
        }
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.api_football_key.trim().is_empty() {
            return Err("API_FOOTBALL_KEY is required".to_string());
        }

        if let Err(e) = Url::parse(&self.api_base_url) {
            return Err(format!("API_BASE_URL is not a valid URL: {}", e));
        }

        if self.api_rate_limit <= 0 {
            return Err("API_RATE_LIMIT must be at least 1".to_string());
        }

        if self.initial_balance <= Decimal::ZERO {
            return Err("INITIAL_BALANCE must be positive".to_string());
        }

        if self.max_position_size <= Decimal::ZERO {
            return Err("MAX_POSITION_SIZE must be positive".to_string());
        }

        if self.underdog_threshold <= Decimal::ONE {
            return Err("UNDERDOG_THRESHOLD must be greater than 1.0".to_string());
        }

        if self.poll_interval == 0 {
            return Err("POLL_INTERVAL must be at least 1 second".to_string());
        }

        if self.leagues.is_empty() {
            return Err("LEAGUES must list at least one league".to_string());
        }

        Ok(())
    }

    /// Base URL without a trailing slash.
    pub fn api_base(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_values_are_sensible() {
        let config = Config::with_api_key("key");
        assert_eq!(config.api_rate_limit, 10);
        assert_eq!(config.underdog_threshold, dec!(2.5));
        assert_eq!(config.initial_balance, dec!(10000));
        assert_eq!(config.max_position_size, dec!(100));
        assert_eq!(config.leagues, vec![39, 140, 135, 78, 61]);
        assert_eq!(config.bookmaker_id, 8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = Config::with_api_key("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_rate_limit() {
        let mut config = Config::with_api_key("key");
        config.api_rate_limit = 0;
        assert!(config.validate().is_err());

        config.api_rate_limit = -1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_base_url() {
        let mut config = Config::with_api_key("key");
        config.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_threshold_at_or_below_evens() {
        let mut config = Config::with_api_key("key");
        config.underdog_threshold = dec!(1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn leagues_tolerate_spaces_and_trailing_commas() {
        assert_eq!(parse_leagues(" 39, 140 ,61").unwrap(), vec![39, 140, 61]);
        assert_eq!(parse_leagues("78,").unwrap(), vec![78]);
        assert!(parse_leagues("").unwrap().is_empty());
        assert!(parse_leagues("39, EPL").is_err());
    }

    #[test]
    fn leagues_with_spaces_load_from_environment() {
        let env = [
            ("API_FOOTBALL_KEY".to_string(), "key".to_string()),
            ("LEAGUES".to_string(), "39, 140, 135".to_string()),
        ];
        let config: Config = envy::from_iter(env).unwrap();
        assert_eq!(config.leagues, vec![39, 140, 135]);
        assert_eq!(config.api_rate_limit, 10);

        let config: Config =
            envy::from_iter([("API_FOOTBALL_KEY".to_string(), "key".to_string())]).unwrap();
        assert_eq!(config.leagues, vec![39, 140, 135, 78, 61]);

        let bad = [
            ("API_FOOTBALL_KEY".to_string(), "key".to_string()),
            ("LEAGUES".to_string(), "39, x".to_string()),
        ];
        assert!(envy::from_iter::<_, Config>(bad).is_err());
    }

    #[test]
    fn api_base_trims_trailing_slash() {
        let mut config = Config::with_api_key("key");
        config.api_base_url = "https://example.test/".to_string();
        assert_eq!(config.api_base(), "https://example.test");
    }
}

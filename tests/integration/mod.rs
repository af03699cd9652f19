//! Integration tests for the underdog engine.
//!
//! Offline tests drive the engine through the mock API with a paused clock.
//! Network tests require a valid API_FOOTBALL_KEY environment variable.
//! Run with: cargo test --test integration -- --ignored

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use tokio::time::Instant;

use underdog_engine::api::AppState;
use underdog_engine::config::Config;
use underdog_engine::engine::Engine;
use underdog_engine::football::{
    ApiFootballClient, FootballApi, MatchOdds, MatchTracker, MockFixtureBuilder,
    MockFootballApi, TeamSide,
};
use underdog_engine::gate::{GateState, RequestGate, WINDOW};
use underdog_engine::signal::UnderdogDetector;
use underdog_engine::utils::Shutdown;

fn offline_config(limit: i64) -> Config {
    let mut config = Config::with_api_key("offline");
    config.api_rate_limit = limit;
    config
}

/// Get a live config from environment.
fn live_config() -> Option<Config> {
    dotenvy::dotenv().ok();
    let key = std::env::var("API_FOOTBALL_KEY").ok()?;
    if key.is_empty() || key == "your_api_key_here" {
        return None;
    }
    Some(Config::with_api_key(key))
}

fn odds(home: rust_decimal::Decimal, away: rust_decimal::Decimal) -> MatchOdds {
    MatchOdds {
        home: Some(home),
        draw: Some(dec!(3.6)),
        away: Some(away),
    }
}

/// Full cycle through a gated mock: baseline, goal, trade, settlement.
#[tokio::test(start_paused = true)]
async fn test_underdog_goal_round_trip() {
    let config = offline_config(10);
    let gate = Arc::new(RequestGate::new(config.api_rate_limit).unwrap());
    let api = MockFootballApi::with_gate(Arc::clone(&gate));
    let state = AppState::new(Arc::clone(&gate));
    api.set_odds(7, odds(dec!(1.3), dec!(8.5)));

    let mut engine = Engine::new(api.clone(), &config).with_state(state.clone());

    let live = |minute, away| {
        MockFixtureBuilder::new(7, "Man City", "Luton")
            .live(minute)
            .score(0, away)
            .build()
    };

    api.set_live(vec![live(5, 0)]);
    engine.tick().await.unwrap();
    api.set_live(vec![live(61, 1)]);
    let report = engine.tick().await.unwrap();
    assert_eq!(report.orders.len(), 1);
    assert_eq!(report.orders[0].order_id, "SIM-000001");
    assert_eq!(report.orders[0].side, TeamSide::Away);

    api.set_live(vec![MockFixtureBuilder::new(7, "Man City", "Luton")
        .finished()
        .score(0, 1)
        .build()]);
    let report = engine.tick().await.unwrap();
    assert_eq!(report.settled.len(), 1);

    let stats = state.stats.read().await.clone();
    assert_eq!(stats.wins, 1);
    assert_eq!(stats.realized_pnl, dec!(750));
    assert_eq!(stats.balance, dec!(10750));

    // Three live polls and one odds lookup.
    assert_eq!(gate.usage().await.used, 4);
}

/// The live feed drops a finished match; settlement comes from the ID lookup.
#[tokio::test(start_paused = true)]
async fn test_finished_match_leaving_live_feed_is_settled() {
    let config = offline_config(10);
    let gate = Arc::new(RequestGate::new(config.api_rate_limit).unwrap());
    let api = MockFootballApi::with_gate(Arc::clone(&gate));
    api.set_odds(12, odds(dec!(1.5), dec!(5.0)));
    let mut engine = Engine::new(api.clone(), &config);

    let fixture = MockFixtureBuilder::new(12, "Liverpool", "Burnley");
    api.set_live(vec![fixture.clone().live(30).score(0, 0).build()]);
    engine.tick().await.unwrap();
    api.set_live(vec![fixture.clone().live(75).score(0, 1).build()]);
    engine.tick().await.unwrap();

    api.set_live(vec![]);
    api.set_result(fixture.finished().score(1, 1).build());
    let report = engine.tick().await.unwrap();

    // A draw loses the away back.
    assert_eq!(report.settled.len(), 1);
    let stats = engine.executor().stats();
    assert_eq!(stats.losses, 1);
    assert_eq!(stats.open_positions, 0);
    assert_eq!(engine.tracker().tracked(), 0);

    // Three live polls, one odds lookup, one ID lookup.
    assert_eq!(gate.usage().await.used, 5);
}

/// Eleven calls against a limit of ten: the eleventh waits for the window.
#[tokio::test(start_paused = true)]
async fn test_gate_throttles_api_calls() {
    let gate = Arc::new(RequestGate::new(10).unwrap());
    let api = MockFootballApi::with_gate(Arc::clone(&gate));

    let start = Instant::now();
    for _ in 0..10 {
        api.live_fixtures().await.unwrap();
    }
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(gate.usage().await.state(), GateState::Saturated);

    api.live_fixtures().await.unwrap();
    assert!(start.elapsed() >= WINDOW);
    assert_eq!(api.request_count(), 11);
}

/// Cached odds never consume a slot, even with the gate saturated.
#[tokio::test(start_paused = true)]
async fn test_cache_hits_bypass_saturated_gate() {
    let gate = Arc::new(RequestGate::new(1).unwrap());
    let api = MockFootballApi::with_gate(Arc::clone(&gate));
    api.set_odds(3, odds(dec!(2.0), dec!(3.8)));
    let detector = UnderdogDetector::from_config(&offline_config(1));

    detector.fetch_match_odds(&api, 3).await.unwrap();
    assert_eq!(gate.usage().await.state(), GateState::Saturated);

    let start = Instant::now();
    let cached = detector.fetch_match_odds(&api, 3).await.unwrap();
    assert_eq!(cached.and_then(|o| o.away), Some(dec!(3.8)));
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(api.request_count(), 1);
}

/// Shutdown during a gate wait ends the engine loop promptly.
#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_engine_waiting_on_gate() {
    let (trigger, shutdown) = Shutdown::channel();
    let gate = Arc::new(RequestGate::with_shutdown(1, shutdown.clone()).unwrap());
    let api = MockFootballApi::with_gate(Arc::clone(&gate));

    let mut config = offline_config(1);
    config.poll_interval = 1;
    let mut engine = Engine::new(api.clone(), &config);

    let handle = tokio::spawn(async move { engine.run(shutdown).await });
    tokio::time::sleep(Duration::from_secs(10)).await;

    let stopped_at = Instant::now();
    trigger.trigger();
    handle.await.unwrap();

    assert_eq!(stopped_at.elapsed(), Duration::ZERO);
    assert_eq!(api.request_count(), 1);
}

/// Goals already on the board when tracking starts are never traded.
#[tokio::test]
async fn test_pre_existing_goals_are_ignored() {
    let api = MockFootballApi::new();
    api.set_odds(9, odds(dec!(1.2), dec!(11.0)));
    api.set_live(vec![MockFixtureBuilder::new(9, "Arsenal", "Sheffield Utd")
        .live(70)
        .score(0, 2)
        .build()]);

    let mut engine = Engine::new(api.clone(), &offline_config(10));
    engine.tick().await.unwrap();
    let report = engine.tick().await.unwrap();

    assert!(report.signals.is_empty());
    assert_eq!(engine.executor().stats().total_trades, 0);
}

/// Test that today's fixtures can be fetched.
#[tokio::test]
#[ignore = "requires API_FOOTBALL_KEY"]
async fn test_fixtures_today() {
    let config = match live_config() {
        Some(c) => c,
        None => {
            println!("Skipping: API_FOOTBALL_KEY not set");
            return;
        }
    };

    let gate = Arc::new(RequestGate::new(config.api_rate_limit).unwrap());
    let client = ApiFootballClient::new(&config, Arc::clone(&gate)).unwrap();
    let fixtures = MatchTracker::fixtures_today(&client).await.unwrap();

    println!("Fixtures today: {}", fixtures.len());
    for fixture in fixtures.iter().take(5) {
        println!(
            "  {} vs {} ({})",
            fixture.team_name(TeamSide::Home),
            fixture.team_name(TeamSide::Away),
            fixture.fixture.status.short
        );
        assert!(config.leagues.contains(&fixture.league.id));
    }
    assert_eq!(gate.usage().await.used, 1);
}

/// Test that the API answers a ping through the gate.
#[tokio::test]
#[ignore = "requires API_FOOTBALL_KEY"]
async fn test_ping() {
    let config = match live_config() {
        Some(c) => c,
        None => {
            println!("Skipping: API_FOOTBALL_KEY not set");
            return;
        }
    };

    let gate = Arc::new(RequestGate::new(config.api_rate_limit).unwrap());
    let client = ApiFootballClient::new(&config, gate).unwrap();
    let zones = client.ping().await.unwrap();
    println!("Timezones: {}", zones);
    assert!(zones > 0);
}

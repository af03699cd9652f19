//! Football underdog trading engine entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use underdog_engine::api::{create_router, AppState};
use underdog_engine::config::Config;
use underdog_engine::engine::{Engine, TickReport};
use underdog_engine::football::{
    ApiFootballClient, FootballApi, MatchOdds, MatchTracker, MockFixtureBuilder,
    MockFootballApi, TeamSide,
};
use underdog_engine::gate::RequestGate;
use underdog_engine::metrics;
use underdog_engine::signal::{Signal, UnderdogDetector};
use underdog_engine::trading::{ExecutorStats, TradingExecutor};
use underdog_engine::utils::install_shutdown_handler;

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

/// Paper-trades goals scored by pre-match underdogs.
#[derive(Parser, Debug)]
#[command(name = "underdog-engine")]
#[command(about = "Live football underdog trading simulator on API-Football")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the polling engine until Ctrl-C (default).
    Run {
        /// HTTP server port for health/status.
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between live polls.
        #[arg(long)]
        poll_interval: Option<u64>,
    },

    /// Check configuration validity.
    CheckConfig {
        /// Also ping the API with one request.
        #[arg(long)]
        ping: bool,
    },

    /// One-shot live scan: today's fixtures, odds and goals.
    Scan,

    /// Fetch odds for several matches and show the request gate at work.
    RateLimitDemo {
        /// Number of matches to fetch odds for.
        #[arg(long, default_value = "5")]
        matches: usize,
    },

    /// Offline walkthrough against a mock API, no key needed.
    Simulate {
        /// Pre-match odds of the scoring team.
        #[arg(long, default_value = "4.0")]
        odds: Decimal,

        /// Side that scores.
        #[arg(long, default_value = "away")]
        side: TeamSide,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("underdog_engine=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    match args.command {
        Some(Command::Run {
            port,
            poll_interval,
        }) => cmd_run(port, poll_interval).await,
        Some(Command::CheckConfig { ping }) => cmd_check_config(ping).await,
        Some(Command::Scan) => cmd_scan().await,
        Some(Command::RateLimitDemo { matches }) => cmd_rate_limit_demo(matches).await,
        Some(Command::Simulate { odds, side }) => cmd_simulate(odds, side).await,
        None => cmd_run(None, None).await,
    }
}

/// Load and validate configuration.
fn load_config() -> anyhow::Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

fn banner(title: &str) {
    println!("{}", RULE);
    println!("{}", title);
    println!("{}", RULE);
}

fn fmt_odds(odds: Option<Decimal>) -> String {
    odds.map_or_else(|| "N/A".to_string(), |o| o.to_string())
}

fn print_stats(stats: &ExecutorStats) {
    println!("{}", THIN_RULE);
    println!("Trading Statistics:");
    println!("  Initial Balance: ${}", stats.initial_balance);
    println!("  Current Balance: ${}", stats.balance);
    println!("  Total Trades:    {}", stats.total_trades);
    println!("  Open Positions:  {}", stats.open_positions);
    println!("  Wins / Losses:   {} / {}", stats.wins, stats.losses);
    println!("  Total Staked:    ${}", stats.total_staked);
    println!("  Realized P&L:    ${}", stats.realized_pnl);
    println!("  Win Rate:        {}%", stats.win_rate());
    println!("  ROI:             {}%", stats.roi());
    println!("{}", THIN_RULE);
}

fn print_signal(signal: &Signal) {
    match signal {
        Signal::Buy(buy) => {
            println!("  TRADING SIGNAL: BUY {} ({})", buy.team, buy.side);
            println!("     Odds: {}", buy.odds);
            println!(
                "     Signal Strength: {}%",
                (buy.signal_strength * Decimal::ONE_HUNDRED).round_dp(0)
            );
        }
        Signal::Pass { team, reason, .. } => {
            println!("  No trade on {}: {}", team, reason);
        }
    }
}

fn print_tick(report: &TickReport) {
    for signal in &report.signals {
        print_signal(signal);
    }
    for order in &report.orders {
        println!(
            "  ORDER {} FILLED: ${} on {} @ {}",
            order.order_id, order.stake, order.team, order.odds
        );
    }
    for position in &report.settled {
        println!(
            "  SETTLED {} ({}): P&L ${}",
            position.team,
            position.side,
            position.realized_pnl.unwrap_or_default()
        );
    }
}

/// Run the polling engine with the status server.
async fn cmd_run(port: Option<u16>, poll_interval: Option<u64>) -> anyhow::Result<()> {
    info!("Loading configuration...");
    let mut config = load_config()?;

    // Override with CLI args if provided
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(poll_interval) = poll_interval {
        config.poll_interval = poll_interval;
    }

    info!("Configuration loaded successfully");
    info!("Leagues: {:?}", config.leagues);
    info!("Underdog threshold: {}", config.underdog_threshold);
    info!("Rate limit: {} requests/min", config.api_rate_limit);

    let (_trigger, shutdown) = install_shutdown_handler();
    let gate = Arc::new(RequestGate::with_shutdown(
        config.api_rate_limit,
        shutdown.clone(),
    )?);
    let client = ApiFootballClient::new(&config, Arc::clone(&gate))?;

    if let Some(metrics_port) = config.metrics_port {
        metrics::install_exporter(metrics_port)?;
    }

    // Start HTTP server
    let app_state = AppState::new(Arc::clone(&gate));
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let mut server_shutdown = shutdown.clone();
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    info!("========================================");
    info!("UNDERDOG ENGINE STARTED");
    info!("========================================");

    let mut engine = Engine::new(client, &config).with_state(app_state);
    engine.run(shutdown).await;

    match server_handle.await {
        Ok(Err(e)) => warn!("HTTP server error: {}", e),
        Err(e) => warn!("HTTP server task failed: {}", e),
        Ok(Ok(())) => {}
    }

    info!("Shutdown complete");
    Ok(())
}

/// Check configuration validity.
async fn cmd_check_config(ping: bool) -> anyhow::Result<()> {
    banner("UNDERDOG ENGINE - CONFIGURATION CHECK");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    if ping {
        print!("Probing API... ");
        let gate = Arc::new(RequestGate::new(config.api_rate_limit)?);
        let client = ApiFootballClient::new(&config, gate)?;
        match client.ping().await {
            Ok(zones) => println!("OK ({} timezones)", zones),
            Err(e) => {
                println!("FAILED");
                println!("  Error: {}", e);
                return Err(anyhow::anyhow!("API ping failed"));
            }
        }
    }

    // Show configuration summary
    println!("{}", THIN_RULE);
    println!("Configuration Summary:");
    println!("  API Base URL: {}", config.api_base());
    println!("  Leagues: {:?}", config.leagues);
    println!("  Bookmaker: {}", config.bookmaker_id);
    println!("  Rate Limit: {} requests/min", config.api_rate_limit);
    println!("  Poll Interval: {}s", config.poll_interval);
    println!("  Underdog Threshold: {}", config.underdog_threshold);
    println!("  Initial Balance: ${}", config.initial_balance);
    println!("  Max Position Size: ${}", config.max_position_size);
    println!("  Odds Cache TTL: {}s", config.odds_cache_ttl_secs);
    println!(
        "  Metrics Exporter: {}",
        config
            .metrics_port
            .map_or_else(|| "Disabled".to_string(), |p| format!("port {}", p))
    );
    banner("CONFIGURATION CHECK PASSED");

    Ok(())
}

/// One-shot scan of today's fixtures and live goals.
async fn cmd_scan() -> anyhow::Result<()> {
    let config = load_config()?;
    let gate = Arc::new(RequestGate::new(config.api_rate_limit)?);
    let client = ApiFootballClient::new(&config, gate)?;
    let detector = UnderdogDetector::from_config(&config);
    let mut executor = TradingExecutor::from_config(&config);
    let mut tracker = MatchTracker::new();

    banner(&format!(
        "UNDERDOG ENGINE - LIVE SCAN ({})",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));

    let fixtures = MatchTracker::fixtures_today(&client).await?;
    if fixtures.is_empty() {
        println!("No fixtures found for today in tracked leagues {:?}.", config.leagues);
    } else {
        println!("Found {} fixture(s) today\n", fixtures.len());
    }

    for (i, fixture) in fixtures.iter().take(5).enumerate() {
        let (home_goals, away_goals) = fixture.score();
        println!("{}. [{}]", i + 1, fixture.league.name);
        println!(
            "   {} vs {}",
            fixture.team_name(TeamSide::Home),
            fixture.team_name(TeamSide::Away)
        );
        println!("   Status: {}", fixture.fixture.status.long);
        println!("   Score: {} - {}", home_goals, away_goals);

        match detector.fetch_match_odds(&client, fixture.id()).await {
            Ok(Some(odds)) => {
                println!(
                    "   Odds - Home: {}, Draw: {}, Away: {}",
                    fmt_odds(odds.home),
                    fmt_odds(odds.draw),
                    fmt_odds(odds.away)
                );
                for side in [TeamSide::Home, TeamSide::Away] {
                    if detector.is_underdog(&odds, side) {
                        println!("   Underdog: {} ({})", fixture.team_name(side), side);
                    }
                }
            }
            Ok(None) => println!("   No odds available"),
            Err(e) => println!("   Odds lookup failed: {}", e),
        }
        println!();
    }

    println!("Scanning for live matches...");
    let baseline = tracker.scan_for_goals(&client).await?;
    println!("  {} live match(es), baselines recorded", baseline.live_count);

    tokio::time::sleep(Duration::from_secs(config.poll_interval)).await;
    let report = tracker.scan_for_goals(&client).await?;

    if report.goals.is_empty() {
        println!("  No live goals detected at this moment.\n");
    }
    for goal in &report.goals {
        println!("Goal in fixture {}", goal.fixture_id);
        println!("  Scoring team: {} ({})", goal.scoring_team, goal.side);
        println!("  Score: {}-{}", goal.home_score, goal.away_score);
        if let Some(minute) = goal.minute {
            println!("  Minute: {}'", minute);
        }

        let signal = detector.analyze_goal(&client, goal).await?;
        print_signal(&signal);
        if let Signal::Buy(buy) = &signal {
            match executor.execute(buy) {
                Ok(order) => println!("  ORDER {} FILLED: ${}", order.order_id, order.stake),
                Err(e) => println!("  Order rejected: {}", e),
            }
        }
        println!();
    }

    print_stats(&executor.stats());
    Ok(())
}

/// Fetch odds for several fixtures and report gate usage around each call.
async fn cmd_rate_limit_demo(matches: usize) -> anyhow::Result<()> {
    let config = load_config()?;
    let (_trigger, shutdown) = install_shutdown_handler();
    let gate = Arc::new(RequestGate::with_shutdown(config.api_rate_limit, shutdown)?);
    let client = ApiFootballClient::new(&config, Arc::clone(&gate))?;

    banner("UNDERDOG ENGINE - RATE LIMITING DEMO");
    println!("  API Rate Limit: {} requests per minute", gate.limit());
    println!("  Requests in window: {}\n", gate.usage().await);

    println!("1. Fetching today's fixtures...");
    let start = Instant::now();
    let fixtures = MatchTracker::fixtures_today(&client).await?;
    println!(
        "   Fetched {} fixtures in {:.2}s",
        fixtures.len(),
        start.elapsed().as_secs_f64()
    );
    println!("   Requests used: {}\n", gate.usage().await);

    if fixtures.is_empty() {
        println!("No fixtures available for demo.");
        return Ok(());
    }

    let count = matches.min(fixtures.len());
    println!("2. Fetching odds for {} matches...\n", count);

    for (i, fixture) in fixtures.iter().take(count).enumerate() {
        println!(
            "   Match {}: {} vs {}",
            i + 1,
            fixture.team_name(TeamSide::Home),
            fixture.team_name(TeamSide::Away)
        );
        println!("   Before: {} requests", gate.usage().await);

        let start = Instant::now();
        match client.match_odds(fixture.id()).await {
            Ok(Some(odds)) => println!(
                "   Odds fetched in {:.2}s (Home: {}, Away: {})",
                start.elapsed().as_secs_f64(),
                fmt_odds(odds.home),
                fmt_odds(odds.away)
            ),
            Ok(None) => println!(
                "   No odds available (took {:.2}s)",
                start.elapsed().as_secs_f64()
            ),
            Err(e) if e.is_cancelled() => {
                println!("   Interrupted while waiting for a request slot");
                break;
            }
            Err(e) => println!("   Odds lookup failed: {}", e),
        }

        println!("   After: {} requests\n", gate.usage().await);
    }

    let usage = gate.usage().await;
    banner("RATE LIMITING SUMMARY");
    println!("Requests in window: {}", usage);
    println!("Gate state: {}", usage.state());
    println!("{}", RULE);
    Ok(())
}

/// Offline walkthrough: one match, one goal, one decision.
async fn cmd_simulate(odds: Decimal, side: TeamSide) -> anyhow::Result<()> {
    const FIXTURE_ID: u64 = 1001;

    let config = Config::with_api_key("offline");
    let gate = Arc::new(RequestGate::new(config.api_rate_limit)?);
    let api = MockFootballApi::with_gate(Arc::clone(&gate));

    let (home, away) = match side {
        TeamSide::Home => ("Underdog Town", "Favourite City"),
        TeamSide::Away => ("Favourite City", "Underdog Town"),
    };
    let other = side.opposite();
    let mut match_odds = MatchOdds {
        home: None,
        draw: Some(dec!(4.0)),
        away: None,
    };
    match side {
        TeamSide::Home => match_odds.home = Some(odds),
        TeamSide::Away => match_odds.away = Some(odds),
    }
    match other {
        TeamSide::Home => match_odds.home = Some(dec!(1.5)),
        TeamSide::Away => match_odds.away = Some(dec!(1.5)),
    }
    api.set_odds(FIXTURE_ID, match_odds);

    let fixture = |minute: u32, score: (u32, u32)| {
        MockFixtureBuilder::new(FIXTURE_ID, home, away)
            .live(minute)
            .score(score.0, score.1)
            .build()
    };
    let goal_score = match side {
        TeamSide::Home => (1, 0),
        TeamSide::Away => (0, 1),
    };

    let mut engine = Engine::new(api.clone(), &config);

    banner("UNDERDOG ENGINE - OFFLINE SIMULATION");
    println!("  {} vs {}", home, away);
    println!(
        "  Odds - Home: {}, Draw: {}, Away: {}",
        fmt_odds(match_odds.home),
        fmt_odds(match_odds.draw),
        fmt_odds(match_odds.away)
    );
    println!("  Underdog threshold: {}\n", config.underdog_threshold);

    println!("10' Kick-off watched, 0-0");
    api.set_live(vec![fixture(10, (0, 0))]);
    print_tick(&engine.tick().await?);

    println!(
        "23' GOAL {} ({}), {}-{}",
        if side == TeamSide::Home { home } else { away },
        side,
        goal_score.0,
        goal_score.1
    );
    api.set_live(vec![fixture(23, goal_score)]);
    print_tick(&engine.tick().await?);

    println!("FT {}-{}", goal_score.0, goal_score.1);
    api.set_live(vec![MockFixtureBuilder::new(FIXTURE_ID, home, away)
        .finished()
        .score(goal_score.0, goal_score.1)
        .build()]);
    print_tick(&engine.tick().await?);

    print_stats(&engine.executor().stats());
    println!("API calls made: {} ({} in window)", api.request_count(), gate.usage().await);
    Ok(())
}

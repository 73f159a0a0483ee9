//! Under/Over price projection CLI and HTTP server entry point.

use std::net::SocketAddr;

use anyhow::Context;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use under_over::analysis::EntryCandidate;
use under_over::api::{create_router, AppState};
use under_over::config::Config;
use under_over::market::{LiveObservation, Trajectory};
use under_over::metrics;
use under_over::projection::validate_minute;
use under_over::report::{LiveReport, MatchAnalyzer, PreMatchReport};
use under_over::utils::{format_side_a, format_side_b, format_signed_pct, shutdown_signal};

const RULE: &str = "======================================================================";

/// Under/Over total-goals price projection.
#[derive(Parser, Debug)]
#[command(name = "under-over")]
#[command(about = "Project Under/Over market prices across a 90-minute match")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project the full match from the opening Under price.
    Project {
        /// Opening Under (side A) price.
        initial: Decimal,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Analyse an in-play match and project the remaining minutes.
    Live {
        /// Opening Under (side A) price.
        #[arg(long)]
        initial: Decimal,

        /// Current Under (side A) price.
        #[arg(long)]
        current: Decimal,

        /// Current match minute (1-90).
        #[arg(long)]
        minute: u32,

        /// Current Over (side B) price, if quoted.
        #[arg(long)]
        current_over: Option<Decimal>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Classify a live Under price against a projected one.
    Divergence {
        /// Current Under price.
        #[arg(long)]
        current: Decimal,

        /// Projected Under price.
        #[arg(long)]
        expected: Decimal,

        /// Current match minute (1-90).
        #[arg(long)]
        minute: u32,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP API.
    Serve {
        /// HTTP server port (defaults to PORT from the environment).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging; configuration errors are reported by the command itself
    let log_config = Config::load().unwrap_or_default();
    let filter = EnvFilter::try_new(log_config.log_directive(args.verbose))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (plain, json) = if args.log_json {
        (None, Some(fmt::layer().json().with_writer(std::io::stderr)))
    } else {
        (Some(fmt::layer().with_writer(std::io::stderr)), None)
    };

    tracing_subscriber::registry()
        .with(plain)
        .with(json)
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Command::Project { initial, json } => cmd_project(initial, json),
        Command::Live {
            initial,
            current,
            minute,
            current_over,
            json,
        } => cmd_live(
            LiveObservation {
                initial_side_a: initial,
                initial_side_b: None,
                current_side_a: current,
                current_side_b: current_over,
                minute,
            },
            json,
        ),
        Command::Divergence {
            current,
            expected,
            minute,
            json,
        } => cmd_divergence(current, expected, minute, json),
        Command::Serve { port } => cmd_serve(port).await,
        Command::CheckConfig => cmd_check_config(),
    }
}

/// Load and validate configuration, then build the analyzer from it.
fn load_analyzer() -> anyhow::Result<(Config, MatchAnalyzer)> {
    let config = Config::load_validated().context("failed to load configuration")?;
    let analyzer = MatchAnalyzer::from_config(&config)?;
    Ok((config, analyzer))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Project a full match.
fn cmd_project(initial: Decimal, json: bool) -> anyhow::Result<()> {
    let (_, analyzer) = load_analyzer()?;
    let report = analyzer.pre_match(initial);

    if json {
        return print_json(&report);
    }

    print_pre_match(&report);
    Ok(())
}

/// Analyse a live match.
fn cmd_live(observation: LiveObservation, json: bool) -> anyhow::Result<()> {
    let (_, analyzer) = load_analyzer()?;
    let report = analyzer.live(&observation)?;

    if json {
        return print_json(&report);
    }

    print_live(&observation, &report);
    Ok(())
}

/// Classify a single divergence.
fn cmd_divergence(current: Decimal, expected: Decimal, minute: u32, json: bool) -> anyhow::Result<()> {
    validate_minute(minute)?;
    let (_, analyzer) = load_analyzer()?;
    let result = analyzer.divergence().analyze(current, expected, minute);

    if json {
        return print_json(&result);
    }

    println!("{RULE}");
    println!("DIVERGENCE - MINUTE {}", result.minute);
    println!("{RULE}");
    println!("  Expected Under: {}", format_side_a(result.expected_side_a));
    println!("  Current Under:  {}", format_side_a(result.current_side_a));
    println!("  Divergence:     {}", format_signed_pct(result.percent_gap));
    println!("  Tier:           {}", result.tier);
    println!("  Rationale:      {}", result.rationale);
    println!("  Recommendation: {}", result.recommendation);
    println!("  Risk:           {}", result.risk_level);
    println!("{RULE}");
    Ok(())
}

/// Run the HTTP API until a shutdown signal arrives.
async fn cmd_serve(port: Option<u16>) -> anyhow::Result<()> {
    let (config, analyzer) = load_analyzer()?;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;

    // Initialize metrics
    metrics::init_metrics();

    let app_state = AppState::with_analyzer(analyzer).with_metrics(handle);
    let router = create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(config.port)));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("{RULE}");
    println!("UNDER/OVER PROJECTION - CONFIGURATION CHECK");
    println!("{RULE}");

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

    // Build tables
    print!("Building projection tables... ");
    match MatchAnalyzer::from_config(&config) {
        Ok(_) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Projection tables are invalid"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Price Ceiling: {}", config.price_ceiling);
    println!("  Degenerate Epsilon: {}", config.degenerate_epsilon);
    println!("  Interpolation: {:?}", config.interpolation());
    println!("  Repair Factor: {}", config.repair_factor);
    println!("  Entry Min Decline: {}%", config.entry_min_decline_pct);
    println!("  Entry Max Reversal Risk: {}%", config.entry_max_reversal_pct);
    println!("  Port: {}", config.port);
    println!("{RULE}");
    println!("CONFIGURATION CHECK PASSED");
    println!("{RULE}");

    Ok(())
}

fn print_trajectory(trajectory: &Trajectory) {
    println!("| Min | Under | Over   |");
    println!("|-----|-------|--------|");
    for point in trajectory {
        println!(
            "| {:>3} | {:>5} | {:>6} |",
            point.minute,
            format_side_a(point.side_a),
            format_side_b(point.side_b)
        );
    }
}

fn print_entries(title: &str, entries: &[EntryCandidate]) {
    println!("{title}");
    if entries.is_empty() {
        println!("  none found");
        return;
    }
    for (i, entry) in entries.iter().enumerate() {
        let stability = entry
            .stability()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        println!(
            "  {}. Min {:>2}: {} -> {} ({:.1}%){}",
            i + 1,
            entry.minute,
            format_side_b(entry.price_at_entry),
            format_side_b(entry.reference_price),
            entry.metric_pct.round_dp(1),
            stability
        );
    }
}

fn print_pre_match(report: &PreMatchReport) {
    println!("{RULE}");
    println!("PRE-MATCH PROJECTION");
    println!("{RULE}");
    println!(
        "  Opening: Under {} / Over {}",
        format_side_a(report.opening.side_a),
        format_side_b(report.opening.side_b)
    );
    println!(
        "  Closing: Under {} / Over {}",
        format_side_a(report.closing.side_a),
        format_side_b(report.closing.side_b)
    );
    println!("----------------------------------------------------------------------");
    println!("Milestones:");
    for point in &report.milestones {
        println!(
            "  Min {:>2}: Under {:>5} | Over {:>6}",
            point.minute,
            format_side_a(point.side_a),
            format_side_b(point.side_b)
        );
    }
    println!("----------------------------------------------------------------------");
    print_entries("Under entries (decline over window):", &report.side_a_entries);
    print_entries("Over entries (reversal risk):", &report.side_b_entries);
    println!("----------------------------------------------------------------------");
    print_trajectory(&report.trajectory);
    println!("{RULE}");
}

fn print_live(observation: &LiveObservation, report: &LiveReport) {
    println!("{RULE}");
    println!("LIVE ANALYSIS - MINUTE {}", report.minute);
    println!("{RULE}");
    println!(
        "  Under: {} -> {}",
        format_side_a(observation.initial_side_a),
        format_side_a(observation.current_side_a)
    );
    println!("----------------------------------------------------------------------");
    println!("Divergence:");
    println!("  Expected Under: {}", format_side_a(report.expected.side_a));
    println!("  Current Under:  {}", format_side_a(report.divergence.current_side_a));
    println!("  Expected Over:  {}", format_side_b(report.expected.side_b));
    println!("  Current Over:   {}", format_side_b(report.current_side_b));
    println!("  Divergence:     {}", format_signed_pct(report.divergence.percent_gap));
    println!("  Tier:           {}", report.divergence.tier);
    println!("  Rationale:      {}", report.divergence.rationale);
    println!("  Recommendation: {}", report.divergence.recommendation);
    println!("  Risk:           {}", report.divergence.risk_level);
    println!("----------------------------------------------------------------------");
    println!("Pace:");
    println!("  Rate of decline: {:.4}/min", report.rate_of_decline.round_dp(4));
    println!("  Profile:         {} ({})", report.pace.label(), report.pace.description());
    println!("----------------------------------------------------------------------");
    println!("Full time:");
    println!("  Expected Under:    {}", format_side_a(report.expected_final.side_a));
    println!("  Expected Over:     {}", format_side_b(report.expected_final.side_b));
    println!("  Remaining decline: {:.1}%", report.remaining_decline_pct.round_dp(1));
    println!("  Under potential:   {}", report.potential);
    println!("----------------------------------------------------------------------");
    if report.continuation.is_empty() {
        println!("Match is at full time; nothing left to project.");
    } else {
        print_trajectory(&report.continuation);
    }
    println!("{RULE}");
}

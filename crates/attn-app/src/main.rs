//! Attention dashboard client - entry point.

use anyhow::Result;
use attn_app::{AppConfig, Application, ViewReport};
use attn_core::Timeframe;
use clap::{Parser, Subcommand};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Attention dashboard client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via ATTN_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a dashboard view progressively and print what arrived
    View {
        symbol: String,
        #[arg(short, long, default_value = "1h")]
        timeframe: Timeframe,
    },
    /// Follow live price/attention updates
    Watch {
        /// Defaults to realtime.symbol
        symbol: Option<String>,
        #[arg(short, long)]
        timeframe: Option<Timeframe>,
        #[arg(short, long, default_value_t = 60)]
        seconds: u64,
    },
    /// Manage saved backtest presets
    Presets {
        #[command(subcommand)]
        action: PresetCommand,
    },
    /// List symbols known to the backend
    Symbols,
}

#[derive(Subcommand, Debug)]
enum PresetCommand {
    /// Presets ranked by last cumulative return
    List,
    /// Print one preset and its last result
    Show { name: String },
    /// Delete a preset and its result
    Delete { name: String },
    /// Import records stored under the legacy key layout
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before any WS connections
    attn_realtime::init_crypto();

    let args = Args::parse();

    let config_path = AppConfig::resolve_path(args.config);
    let config = AppConfig::load(&config_path)?;

    attn_telemetry::init_logging_with(config.telemetry.log_level.as_deref())?;
    info!(config_path = %config_path, "Starting attn-app v{}", env!("CARGO_PKG_VERSION"));

    let app = Application::new(config)?;
    let migrated = app.init();

    match args.command {
        Command::View { symbol, timeframe } => {
            let cancel = CancellationToken::new();
            let report = tokio::select! {
                report = app.view(&symbol, timeframe, cancel.clone()) => report?,
                _ = tokio::signal::ctrl_c() => {
                    cancel.cancel();
                    info!("Shutdown signal received");
                    return Ok(());
                }
            };
            print_view(&report);
        }
        Command::Watch {
            symbol,
            timeframe,
            seconds,
        } => {
            let symbol = symbol.unwrap_or_else(|| app.config().realtime.symbol.clone());
            let timeframe = timeframe.unwrap_or(app.config().realtime.timeframe);

            let shutdown = CancellationToken::new();
            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal_token.cancel();
                }
            });

            let summary = app
                .watch(&symbol, timeframe, Duration::from_secs(seconds), shutdown)
                .await?;
            println!(
                "push updates: {}  poll updates: {}  status changes: {}  last status: {}",
                summary.push_updates,
                summary.poll_updates,
                summary.status_changes,
                summary.last_pair_status.as_str()
            );
        }
        Command::Presets { action } => run_presets(&app, action, migrated)?,
        Command::Symbols => {
            for symbol in app.api().symbols().await? {
                println!("{symbol}");
            }
        }
    }

    Ok(())
}

fn run_presets(app: &Application, action: PresetCommand, migrated: usize) -> Result<()> {
    let presets = app.presets();
    match action {
        PresetCommand::List => {
            for entry in presets.overview() {
                match &entry.summary {
                    Some(summary) => println!(
                        "{:<24} return {:>8.2}%  win {:>5.1}%  trades {:>4}{}",
                        entry.name,
                        summary.cumulative_return * 100.0,
                        summary.win_rate * 100.0,
                        summary.total_trades,
                        if entry.has_preset { "" } else { "  (no params)" }
                    ),
                    None => println!("{:<24} needs run", entry.name),
                }
            }
        }
        PresetCommand::Show { name } => {
            match presets.get(&name) {
                Some(preset) => println!("{}", serde_json::to_string_pretty(&preset)?),
                None => println!("{name}: no saved parameters"),
            }
            if let Some(result) = presets.result(&name) {
                println!(
                    "last result: return {:.2}%, max drawdown {:.2}%, {} equity points",
                    result.summary.cumulative_return * 100.0,
                    result.summary.max_drawdown * 100.0,
                    result.equity_curve.len()
                );
            }
        }
        PresetCommand::Delete { name } => {
            if presets.delete(&name) {
                println!("deleted {name}");
            } else {
                anyhow::bail!("failed to delete preset {name}");
            }
        }
        PresetCommand::Migrate => {
            // Includes what init() already moved.
            let total = migrated + presets.migrate_legacy();
            println!("migrated {total} legacy presets");
        }
    }
    Ok(())
}

fn print_view(report: &ViewReport) {
    println!(
        "{} {}: {} candles",
        report.symbol,
        report.timeframe,
        report.critical.candles.len()
    );
    if let Some(last) = report.critical.candles.last() {
        println!("  last close {} at {}", last.close, last.timestamp);
    }
    match &report.secondary {
        Ok(data) => println!(
            "  attention points {}, news {}, events {}",
            data.attention.len(),
            data.news.len(),
            data.events.len()
        ),
        Err(e) => println!("  secondary: {e}"),
    }
    match &report.background {
        Ok(data) => println!("  overview candles {}", data.overview.len()),
        Err(e) => println!("  background: {e}"),
    }
}

//! `slides` - BTC Slides console
//!
//! Runs the reveal core headless. `replay` feeds a JSON-lines message script
//! through the driver; `live` follows a real authority over WebSocket. Both
//! print one line per visible-state revision and every outbound request.
//!
//! ```text
//! slides --profile studio --seed 7 replay crates/sl-console/scripts/demo.jsonl
//! slides --address player@speed.app live --url ws://localhost:3001 --spin 100
//! ```

mod script;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use sl_connector::{ConnectorBuilder, HeadlessSurface, RevealDriver, WsTransport};
use sl_protocol::OutboundRequest;
use sl_reveal::{RevealConfig, RevealController, RevealProfile, SessionContext, VisibleState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::script::ScriptStep;

#[derive(Parser)]
#[command(name = "slides", version, about = "BTC Slides reveal console")]
struct Cli {
    /// Timing profile: normal, turbo or studio
    #[arg(long, global = true, default_value = "normal")]
    profile: String,

    /// Reveal configuration file (.yaml, .yml or .json); overrides --profile
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for the reel generator (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Initially selected bet (sats)
    #[arg(long, global = true)]
    bet: Option<u64>,

    /// Lightning address of the player
    #[arg(long, global = true)]
    address: Option<String>,

    /// Last known wallet balance (sats)
    #[arg(long, global = true)]
    balance: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON-lines message script through the headless driver
    Replay {
        /// Script file, one frame per line
        script: PathBuf,

        /// Multiplier on animation durations (0 = instant transits)
        #[arg(long, default_value_t = 1.0)]
        time_scale: f64,

        /// Print the final visible state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Connect to a live authority and follow the session
    Live {
        /// Authority WebSocket URL
        #[arg(long, default_value = "ws://localhost:3001")]
        url: String,

        /// Request a spin with this bet once the session starts
        #[arg(long)]
        spin: Option<u64>,

        /// Give up instead of reconnecting when the connection drops
        #[arg(long)]
        no_reconnect: bool,
    },

    /// Print the resolved reveal configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Replay {
            script,
            time_scale,
            json,
        } => replay(&cli, script, *time_scale, *json).await,
        Commands::Live {
            url,
            spin,
            no_reconnect,
        } => live(&cli, url, *spin, !*no_reconnect).await,
        Commands::Config => {
            println!("{}", load_config(&cli)?.to_json()?);
            Ok(())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION SETUP
// ═══════════════════════════════════════════════════════════════════════════════

fn load_config(cli: &Cli) -> Result<RevealConfig> {
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            RevealConfig::from_yaml_str(&text)
        } else {
            RevealConfig::from_json_str(&text)
        };
        return config.with_context(|| format!("Invalid config {}", path.display()));
    }

    let Some(profile) = RevealProfile::from_name(&cli.profile) else {
        bail!("Unknown profile '{}' (expected normal, turbo or studio)", cli.profile);
    };
    Ok(RevealConfig::from_profile(profile))
}

fn build_controller(cli: &Cli, connected: bool) -> Result<RevealController> {
    let config = load_config(cli)?;

    let mut context = SessionContext::new().connected(connected);
    if let Some(address) = &cli.address {
        context = context.with_lightning_address(address.clone());
    }
    if let Some(bet) = cli.bet {
        context = context.with_bet(bet);
    }
    if let Some(balance) = cli.balance {
        context = context.with_balance(balance);
    }

    let seed = cli.seed.unwrap_or_else(rand::random);
    log::info!("[Console] {} profile, seed {}", config.profile.display_name(), seed);

    RevealController::seeded(config, context, seed).context("Failed to create reveal controller")
}

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

fn stamp(started: Instant) -> String {
    format!("{:>7.1}s", started.elapsed().as_secs_f64())
}

/// Print every published revision until the driver goes away
fn print_states(mut visible: watch::Receiver<VisibleState>, started: Instant) -> JoinHandle<()> {
    tokio::spawn(async move {
        while visible.changed().await.is_ok() {
            let line = {
                let state = visible.borrow_and_update();
                let mut line = state.summary();
                if let Some(payout) = state.payout_text() {
                    line.push_str(&format!(" payout=\"{}\"", payout));
                }
                line
            };
            println!("{} {}", stamp(started), line);
        }
    })
}

fn print_request(request: &OutboundRequest, started: Instant) {
    match serde_json::to_string(request) {
        Ok(json) => println!("{} -> {}", stamp(started), json),
        Err(e) => log::warn!("[Console] Could not encode {}: {}", request.name(), e),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMANDS
// ═══════════════════════════════════════════════════════════════════════════════

async fn replay(cli: &Cli, path: &Path, time_scale: f64, json: bool) -> Result<()> {
    let steps = script::load(path)?;
    let controller = build_controller(cli, true)?;

    let started = Instant::now();
    let (driver, handle, mut requests) =
        RevealDriver::new(controller, HeadlessSurface::with_time_scale(time_scale));
    let driver_task = tokio::spawn(driver.run());
    let states = print_states(handle.subscribe(), started);
    let outbound = tokio::spawn(async move {
        while let Some(request) = requests.recv().await {
            print_request(&request, started);
        }
    });

    for step in steps {
        match step {
            ScriptStep::Wait(delay) => tokio::time::sleep(delay).await,
            ScriptStep::Deliver(event) => {
                log::debug!("[Console] Delivering {}", event.name());
                handle.send(event).await?;
            }
        }
    }

    // Let the last reveal land before stopping
    let mut visible = handle.subscribe();
    let landed = tokio::time::timeout(
        Duration::from_secs(60),
        visible.wait_for(|v| !v.animation.stage.is_in_flight()),
    )
    .await
    .is_ok();
    if !landed {
        log::warn!("[Console] Reveal still in flight after 60s, stopping anyway");
    }

    handle.shutdown().await?;
    let controller = driver_task.await.context("Driver task panicked")??;
    drop(handle);
    states.await.context("State printer panicked")?;
    outbound.abort();

    let stats = controller.stats();
    println!(
        "{} done: {} started, {} landed, {} cancelled, {} stale signals",
        stamp(started),
        stats.spins_started,
        stats.spins_landed,
        stats.spins_cancelled,
        stats.stale_signals
    );
    if json {
        println!("{}", serde_json::to_string_pretty(controller.visible())?);
    }
    Ok(())
}

async fn live(cli: &Cli, url: &str, spin: Option<u64>, auto_reconnect: bool) -> Result<()> {
    let config = ConnectorBuilder::websocket(url)
        .auto_reconnect(auto_reconnect)
        .build();
    let controller = build_controller(cli, false)?;

    let started = Instant::now();
    let (driver, handle, requests) =
        RevealDriver::with_capacity(controller, HeadlessSurface::new(), config.queue_capacity);

    // Requests go to the socket; echo them through a relay so they are printed too
    let (relay_tx, relay_rx) = mpsc::channel(config.queue_capacity);
    let outbound = tokio::spawn(async move {
        let mut requests = requests;
        while let Some(request) = requests.recv().await {
            print_request(&request, started);
            if relay_tx.send(request).await.is_err() {
                break;
            }
        }
    });

    let mut transport = WsTransport::new(config);
    transport.start(handle.events(), relay_rx)?;
    let driver_task = tokio::spawn(driver.run());
    let states = print_states(handle.subscribe(), started);

    if let Some(bet) = spin {
        let Some(address) = cli.address.clone() else {
            bail!("--spin needs --address");
        };
        handle
            .request(OutboundRequest::StartSpin {
                lightning_address: address,
                bet_amount: bet,
            })
            .await?;
    }

    log::info!("[Console] Following {} (Ctrl-C to stop)", url);
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    transport.stop();
    handle.shutdown().await?;
    let controller = driver_task.await.context("Driver task panicked")??;
    drop(handle);
    states.await.context("State printer panicked")?;
    outbound.abort();

    log::info!("[Console] Stopped ({:?})", controller.stats());
    Ok(())
}

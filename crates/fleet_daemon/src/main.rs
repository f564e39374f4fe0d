mod routes;
mod state;
mod tick_loop;

use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fleet_control::FleetAutopilot;
use fleet_core::{EventLevel, FleetState, PrincipalId};
use fleet_world::{build_initial_state, load_content, load_state, rng_for};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::routes::make_router_with_cors;
use crate::state::{AppState, SimState};
use crate::tick_loop::run_tick_loop;

#[derive(Parser)]
#[command(name = "fleet_daemon", about = "Fleet Simulation HTTP daemon")]
struct Cli {
    /// Generate the world procedurally with this seed. Mutually exclusive with --state.
    #[arg(long, conflicts_with = "state_file")]
    seed: Option<u64>,
    /// Load the initial FleetState from a JSON file. Mutually exclusive with --seed.
    #[arg(long = "state", conflicts_with = "seed")]
    state_file: Option<String>,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long, default_value_t = 3001)]
    port: u16,
    /// Ticks per wall-clock second. 0 runs as fast as possible.
    #[arg(long, default_value_t = 10.0)]
    ticks_per_sec: f64,
    /// Stop the tick loop after this many ticks.
    #[arg(long)]
    max_ticks: Option<u64>,
    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0)]
    dt: f32,
    #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
    event_level: String,
    /// Factions flown by the autopilot. Defaults to every faction in the world.
    #[arg(long = "autopilot")]
    autopilot_factions: Vec<String>,
    #[arg(long, default_value = "http://localhost:5173")]
    cors_origin: String,
    /// Start with the tick loop paused.
    #[arg(long)]
    paused: bool,
}

fn world_factions(fleet: &FleetState) -> BTreeSet<PrincipalId> {
    fleet
        .combat
        .roster()
        .registry()
        .iter()
        .chain(fleet.exploration.roster().registry().iter())
        .map(|ship| ship.faction.clone())
        .collect()
}

fn build_sim(cli: &Cli) -> Result<SimState> {
    let content = load_content(&cli.content_dir)?;
    let (fleet, rng) = if let Some(path) = &cli.state_file {
        let loaded = load_state(path)?;
        let rng = rng_for(loaded.meta.seed);
        (loaded, rng)
    } else {
        let seed = cli.seed.unwrap_or_else(rand::random);
        let mut rng = rng_for(seed);
        let fleet = build_initial_state(&content, seed, &mut rng).context("building initial state")?;
        (fleet, rng)
    };

    let factions: Vec<PrincipalId> = if cli.autopilot_factions.is_empty() {
        world_factions(&fleet).into_iter().collect()
    } else {
        cli.autopilot_factions.iter().map(PrincipalId::new).collect()
    };
    let event_level = match cli.event_level.as_str() {
        "debug" => EventLevel::Debug,
        _ => EventLevel::Normal,
    };

    Ok(SimState {
        fleet,
        content,
        rng,
        autopilots: factions.into_iter().map(FleetAutopilot::new).collect(),
        next_command_id: 0,
        inbox: Vec::new(),
        event_level,
        dt: cli.dt,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    anyhow::ensure!(cli.dt > 0.0, "--dt must be positive, got {}", cli.dt);
    let sim = build_sim(&cli)?;
    tracing::info!(
        seed = sim.fleet.meta.seed,
        tick = sim.fleet.meta.tick,
        autopilots = sim.autopilots.len(),
        content_version = %sim.content.content_version,
        "simulation ready"
    );

    let (event_tx, _) = broadcast::channel(256);
    let app_state = AppState {
        sim: Arc::new(Mutex::new(sim)),
        event_tx,
        ticks_per_sec: cli.ticks_per_sec,
        paused: Arc::new(AtomicBool::new(cli.paused)),
    };

    tokio::spawn(run_tick_loop(
        app_state.sim.clone(),
        app_state.event_tx.clone(),
        cli.ticks_per_sec,
        cli.max_ticks,
        app_state.paused.clone(),
    ));

    let router = make_router_with_cors(app_state, &cli.cors_origin);
    let addr = format!("0.0.0.0:{}", cli.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router).await.context("serving http")?;
    Ok(())
}

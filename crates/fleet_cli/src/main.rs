use std::collections::BTreeMap;

use anyhow::{ensure, Result};
use clap::{Args, Parser, Subcommand};
use fleet_control::{CommandSource, FleetAutopilot};
use fleet_core::{Event, EventEnvelope, EventLevel, FleetState, PrincipalId, ShipStatus};
use fleet_world::{build_initial_state, load_content, load_state, rng_for};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "fleet_cli", about = "Fleet Simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation for a fixed number of ticks.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    ticks: u64,
    /// Generate the world procedurally with this seed. Mutually exclusive with --state.
    #[arg(long, conflicts_with = "state_file")]
    seed: Option<u64>,
    /// Load the initial FleetState from a JSON file. Mutually exclusive with --seed.
    #[arg(long = "state", conflicts_with = "seed")]
    state_file: Option<String>,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0)]
    dt: f32,
    #[arg(long, default_value_t = 50)]
    print_every: u64,
    #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
    event_level: String,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn initial_state(args: &RunArgs, content: &fleet_core::GameContent) -> Result<(FleetState, ChaCha8Rng)> {
    if let Some(path) = &args.state_file {
        let loaded = load_state(path)?;
        let rng = rng_for(loaded.meta.seed);
        return Ok((loaded, rng));
    }
    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = rng_for(seed);
    let state = build_initial_state(content, seed, &mut rng)?;
    Ok((state, rng))
}

/// One autopilot per faction that has ships, ordered by faction id.
fn autopilots(state: &FleetState) -> Vec<FleetAutopilot> {
    factions(state)
        .into_keys()
        .map(FleetAutopilot::new)
        .collect()
}

fn run(args: &RunArgs, level: EventLevel) -> Result<()> {
    ensure!(args.dt > 0.0, "--dt must be positive, got {}", args.dt);
    ensure!(args.print_every > 0, "--print-every must be positive");
    let content = load_content(&args.content_dir)?;
    let (mut state, mut rng) = initial_state(args, &content)?;

    let mut pilots = autopilots(&state);
    let mut next_command_id = 0u64;

    tracing::info!(
        ticks = args.ticks,
        seed = state.meta.seed,
        sectors = state.exploration.sectors().len(),
        factions = pilots.len(),
        content_version = %content.content_version,
        "starting simulation"
    );
    println!("{}", "-".repeat(80));

    for _ in 0..args.ticks {
        let mut commands = Vec::new();
        for pilot in &mut pilots {
            commands.extend(pilot.generate_commands(&state, &content, &mut next_command_id));
        }

        let events = fleet_core::tick(&mut state, &commands, &content, &mut rng, args.dt, level);

        // Notable events print regardless of print_every.
        for envelope in &events {
            print_notable(envelope);
        }

        if state.meta.tick % args.print_every == 0 {
            print_status(&state);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", state.meta.tick);
    print_status(&state);
    Ok(())
}

fn print_notable(envelope: &EventEnvelope) {
    let tick = envelope.tick;
    match &envelope.event {
        Event::SpecializationUnlocked {
            weapon_id,
            specialization_id,
        } => {
            println!("*** SPECIALIZATION {specialization_id} unlocked on {weapon_id} at tick={tick:04} ***");
        }
        Event::CoordinatedScanCompleted {
            sector_id, ship_ids, ..
        } => {
            println!(
                "*** COORDINATED SCAN of {sector_id} completed by {} ships at tick={tick:04} ***",
                ship_ids.len()
            );
        }
        Event::StatusChanged {
            ship_id,
            status: ShipStatus::Retreating,
            ..
        } => {
            println!("*** {ship_id} RETREATING at tick={tick:04} ***");
        }
        _ => {}
    }
}

/// Ship count and operational count per faction.
fn factions(state: &FleetState) -> BTreeMap<PrincipalId, (usize, usize)> {
    let mut counts: BTreeMap<PrincipalId, (usize, usize)> = BTreeMap::new();
    let ships = state
        .combat
        .roster()
        .registry()
        .iter()
        .chain(state.exploration.roster().registry().iter());
    for ship in ships {
        let entry = counts.entry(ship.faction.clone()).or_default();
        entry.0 += 1;
        if ship.status != ShipStatus::Disabled {
            entry.1 += 1;
        }
    }
    counts
}

fn print_status(state: &FleetState) {
    let sectors = state.exploration.sectors();
    let explored = sectors.iter().filter(|sector| sector.explored).count();
    let tasks = state.combat.roster().tasks().len() + state.exploration.roster().tasks().len();
    let formations =
        state.combat.roster().formations().len() + state.exploration.roster().formations().len();
    let fleets: Vec<String> = factions(state)
        .into_iter()
        .map(|(faction, (total, active))| format!("{faction}={active}/{total}"))
        .collect();

    println!(
        "[tick={tick:04}  t={time:.0}s]  tasks={tasks:3}  formations={formations:2}  \
         explored={explored}/{total}  fleets=[{fleets}]",
        tick = state.meta.tick,
        time = state.meta.time,
        total = sectors.len(),
        fleets = fleets.join(", "),
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => {
            let level = match args.event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            run(&args, level)?;
        }
    }
    Ok(())
}

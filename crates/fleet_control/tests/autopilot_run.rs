//! Autopilot regression tests.
//!
//! Two autopilots fly a generated world against each other through the full
//! tick loop and check that formations form, weapons fire and sectors get
//! surveyed within a fixed tick window.

use std::collections::HashSet;

use fleet_control::{CommandSource, FleetAutopilot};
use fleet_core::test_fixtures::{base_content, hostile, player};
use fleet_core::*;
use fleet_world::{build_initial_state, rng_for};

const SEED: u64 = 7;
const TICKS: u64 = 300;

fn run(ticks: u64) -> (FleetState, Vec<EventEnvelope>, Vec<CommandEnvelope>) {
    let content = base_content();
    let mut rng = rng_for(SEED);
    let mut state = build_initial_state(&content, SEED, &mut rng).expect("world builds");
    let mut pilots = [FleetAutopilot::new(player()), FleetAutopilot::new(hostile())];
    let mut next_command_id = 0u64;
    let mut events = Vec::new();
    let mut issued = Vec::new();

    for _ in 0..ticks {
        let mut commands = Vec::new();
        for pilot in &mut pilots {
            commands.extend(pilot.generate_commands(&state, &content, &mut next_command_id));
        }
        events.extend(tick(&mut state, &commands, &content, &mut rng, 1.0, EventLevel::Normal));
        issued.extend(commands);
    }
    (state, events, issued)
}

#[test]
fn autopilots_fight_and_survey() {
    let (state, events, _) = run(TICKS);

    let formed = events
        .iter()
        .any(|e| matches!(&e.event, Event::FormationCreated { .. }));
    assert!(formed, "player autopilot raises a formation from three frigates");

    let shooters: HashSet<&str> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::WeaponFired { ship_id, .. } => Some(ship_id.0.as_str()),
            _ => None,
        })
        .collect();
    assert!(!shooters.is_empty(), "no weapon fired in {TICKS} ticks");

    let explored = state
        .exploration
        .sectors()
        .iter()
        .filter(|sector| sector.explored)
        .count();
    assert!(explored > 0, "no sector surveyed in {TICKS} ticks");
}

#[test]
fn autopilot_commands_are_well_formed() {
    let (_, _, issued) = run(60);

    let ids: HashSet<&CommandId> = issued.iter().map(|cmd| &cmd.id).collect();
    assert_eq!(ids.len(), issued.len(), "command ids are unique");
    assert!(issued
        .iter()
        .all(|cmd| cmd.issued_tick == cmd.execute_at_tick));
    assert!(issued
        .iter()
        .all(|cmd| cmd.issued_by == player() || cmd.issued_by == hostile()));
}

#[test]
fn autopilot_runs_are_deterministic() {
    let (first_state, first, _) = run(80);
    let (second_state, second, _) = run(80);

    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
    for ship in first_state.fleet(&player()) {
        let twin = second_state.ship(&ship.id).expect("same fleet");
        assert!(ship.position.distance(twin.position) < 1e-4, "{}", ship.id);
    }
}

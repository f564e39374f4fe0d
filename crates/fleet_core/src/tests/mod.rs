use super::*;
use crate::test_fixtures::{base_content, base_state, clock_at, make_rng, player};

mod formation;
mod properties;
mod upgrades;

// --- Shared test helpers ------------------------------------------------

const DT: f32 = 1.0;

fn test_content() -> GameContent {
    base_content()
}

fn test_state(content: &GameContent) -> FleetState {
    base_state(content)
}

fn ship_id(id: &str) -> ShipId {
    ShipId(id.to_string())
}

fn sector_id(id: &str) -> SectorId {
    SectorId(id.to_string())
}

/// Envelope issued by `issued_by` for execution on the current tick.
fn command_from(state: &FleetState, issued_by: &PrincipalId, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{:06}", state.meta.tick)),
        issued_by: issued_by.clone(),
        issued_tick: state.meta.tick,
        execute_at_tick: state.meta.tick,
        command,
    }
}

fn player_command(state: &FleetState, command: Command) -> CommandEnvelope {
    command_from(state, &player(), command)
}

fn attack_command(state: &FleetState, attacker: &str, target: &str) -> CommandEnvelope {
    let position = state
        .ship(&ship_id(target))
        .map_or(glam::Vec2::ZERO, |ship| ship.position);
    let issued_by = state
        .ship(&ship_id(attacker))
        .map_or_else(player, |ship| ship.faction.clone());
    command_from(
        state,
        &issued_by,
        Command::AssignCombatTask {
            ship_id: ship_id(attacker),
            kind: TaskKind::Attack,
            target_id: Some(target.to_string()),
            position,
            formation: None,
        },
    )
}

/// Run `n` empty ticks, collecting every event.
fn run_ticks(
    state: &mut FleetState,
    content: &GameContent,
    rng: &mut rand_chacha::ChaCha8Rng,
    n: u64,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..n {
        events.extend(tick(state, &[], content, rng, DT, EventLevel::Normal));
    }
    events
}

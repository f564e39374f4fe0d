use std::collections::HashSet;

use fleet_core::{
    Command, CommandEnvelope, CommandId, FleetState, FormationKind, GameContent, PrincipalId,
    SectorId, Ship, ShipId, ShipStatus, TaskKind,
};
use serde::{Deserialize, Serialize};

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &FleetState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

pub const AUTOPILOT_OWNER: &str = "principal_autopilot";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotConfig {
    pub formation_kind: FormationKind,
    pub formation_spacing: f32,
    /// Idle, unformed warships needed before a formation is raised.
    pub min_formation_size: usize,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            formation_kind: FormationKind::Balanced,
            formation_spacing: 50.0,
            min_formation_size: 3,
        }
    }
}

/// Drives one faction's fleet:
/// 1. Raise a single formation from idle, unformed warships.
/// 2. Send idle warships (not flying a wing slot) at the nearest hostile.
/// 3. Spread idle exploration ships over the hottest untargeted sectors.
pub struct FleetAutopilot {
    faction: PrincipalId,
    config: AutopilotConfig,
}

impl Default for FleetAutopilot {
    fn default() -> Self {
        Self::new(PrincipalId(AUTOPILOT_OWNER.to_string()))
    }
}

impl FleetAutopilot {
    pub fn new(faction: PrincipalId) -> Self {
        Self::with_config(faction, AutopilotConfig::default())
    }

    pub fn with_config(faction: PrincipalId, config: AutopilotConfig) -> Self {
        Self { faction, config }
    }

    pub fn faction(&self) -> &PrincipalId {
        &self.faction
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// Allocates a command ID and builds a `CommandEnvelope`.
fn make_cmd(owner: &PrincipalId, tick: u64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_by: owner.clone(),
        issued_tick: tick,
        execute_at_tick: tick,
        command,
    }
}

/// Idle warships of `faction` with no live task, sorted by ID.
fn idle_warships<'a>(state: &'a FleetState, faction: &PrincipalId) -> Vec<&'a Ship> {
    let roster = state.combat.roster();
    let mut ships: Vec<&Ship> = roster
        .registry()
        .iter()
        .filter(|ship| &ship.faction == faction && roster.is_available(&ship.id))
        .collect();
    ships.sort_by(|a, b| a.id.cmp(&b.id));
    ships
}

fn has_formation(state: &FleetState, faction: &PrincipalId) -> bool {
    let formations = state.combat.roster().formations();
    formations.ids().iter().any(|id| {
        formations
            .get(id)
            .and_then(|formation| state.ship(&formation.leader_id))
            .is_some_and(|leader| &leader.faction == faction)
    })
}

/// Closest operational ship of another faction.
fn nearest_hostile<'a>(state: &'a FleetState, ship: &Ship) -> Option<&'a Ship> {
    state
        .combat
        .roster()
        .registry()
        .iter()
        .filter(|other| other.faction != ship.faction && other.status != ShipStatus::Disabled)
        .min_by(|a, b| {
            ship.position
                .distance_squared(a.position)
                .total_cmp(&ship.position.distance_squared(b.position))
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Sectors some exploration task is already heading for.
fn targeted_sectors(state: &FleetState) -> HashSet<SectorId> {
    state
        .exploration
        .roster()
        .tasks()
        .iter()
        .filter_map(|task| task.target.id.clone().map(SectorId))
        .collect()
}

fn available_explorers(state: &FleetState, faction: &PrincipalId) -> usize {
    let roster = state.exploration.roster();
    roster
        .registry()
        .iter()
        .filter(|ship| &ship.faction == faction && roster.is_available(&ship.id))
        .count()
}

// ---------------------------------------------------------------------------
// FleetAutopilot
// ---------------------------------------------------------------------------

impl FleetAutopilot {
    /// Returns the command (if any) and the ships that will fly wing slots.
    fn formation_command(
        &self,
        state: &FleetState,
        idle: &[&Ship],
        next_id: &mut u64,
    ) -> (Option<CommandEnvelope>, HashSet<ShipId>) {
        let unformed: Vec<ShipId> = idle
            .iter()
            .filter(|ship| ship.formation.is_none())
            .map(|ship| ship.id.clone())
            .collect();
        if unformed.len() < self.config.min_formation_size || has_formation(state, &self.faction) {
            return (None, HashSet::new());
        }
        tracing::debug!(faction = %self.faction, ships = unformed.len(), "autopilot raising formation");
        let wings: HashSet<ShipId> = unformed.iter().skip(1).cloned().collect();
        let cmd = make_cmd(
            &self.faction,
            state.meta.tick,
            next_id,
            Command::CreateFormation {
                kind: self.config.formation_kind,
                ship_ids: unformed,
                spacing: self.config.formation_spacing,
            },
        );
        (Some(cmd), wings)
    }

    fn attack_commands(
        &self,
        state: &FleetState,
        idle: &[&Ship],
        new_wings: &HashSet<ShipId>,
        next_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let mut commands = Vec::new();
        for ship in idle {
            if ship.is_wingman() || new_wings.contains(&ship.id) {
                continue;
            }
            let Some(target) = nearest_hostile(state, ship) else {
                continue;
            };
            commands.push(make_cmd(
                &self.faction,
                state.meta.tick,
                next_id,
                Command::AssignCombatTask {
                    ship_id: ship.id.clone(),
                    kind: TaskKind::Attack,
                    target_id: Some(target.id.0.clone()),
                    position: target.position,
                    formation: None,
                },
            ));
        }
        commands
    }

    fn exploration_command(
        &self,
        state: &FleetState,
        content: &GameContent,
        next_id: &mut u64,
    ) -> Option<CommandEnvelope> {
        let free = available_explorers(state, &self.faction);
        if free == 0 {
            return None;
        }
        let targeted = targeted_sectors(state);
        let sector_ids: Vec<SectorId> = state
            .exploration
            .hottest_sectors(state.meta.time, &content.constants)
            .into_iter()
            .map(|(sector_id, _)| sector_id)
            .filter(|sector_id| !targeted.contains(sector_id))
            .take(free)
            .collect();
        if sector_ids.is_empty() {
            return None;
        }
        Some(make_cmd(
            &self.faction,
            state.meta.tick,
            next_id,
            Command::DistributeExploration { sector_ids },
        ))
    }
}

impl CommandSource for FleetAutopilot {
    fn generate_commands(
        &mut self,
        state: &FleetState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let idle = idle_warships(state, &self.faction);
        let (formation, new_wings) = self.formation_command(state, &idle, next_command_id);
        let mut commands: Vec<CommandEnvelope> = formation.into_iter().collect();
        commands.extend(self.attack_commands(state, &idle, &new_wings, next_command_id));
        commands.extend(self.exploration_command(state, content, next_command_id));
        commands
    }
}

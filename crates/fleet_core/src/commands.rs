use crate::exploration::SurveyTarget;
use crate::{Clock, Command, CommandEnvelope, FleetState, GameContent, ShipId, TaskTarget};

pub(crate) fn apply_commands(
    state: &mut FleetState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    clock: Clock,
) {
    for envelope in commands {
        if envelope.execute_at_tick != clock.tick {
            continue;
        }
        if !is_authorized(state, envelope) {
            tracing::warn!(
                command = %envelope.id,
                issued_by = %envelope.issued_by,
                "command dropped: issuer does not own its target"
            );
            continue;
        }
        if matches!(envelope.command, Command::RegisterShip { .. } | Command::UnregisterShip { .. }) {
            apply_registration(state, envelope, content);
        } else if is_combat_command(&envelope.command) {
            apply_combat_command(state, &envelope.command, content, clock);
        } else {
            apply_fleet_command(state, envelope, content, clock);
        }
    }
}

/// Ship-targeted commands require the issuer to own every ship, weapon or
/// formation they name.
fn is_authorized(state: &FleetState, envelope: &CommandEnvelope) -> bool {
    let issuer = &envelope.issued_by;
    let owns = |ship_id: &ShipId| state.ship(ship_id).is_some_and(|ship| &ship.faction == issuer);
    match &envelope.command {
        Command::RegisterShip { ship } => &ship.faction == issuer,
        Command::UnregisterShip { ship_id }
        | Command::AssignCombatTask { ship_id, .. }
        | Command::AssignExplorationTask { ship_id, .. }
        | Command::Retreat { ship_id }
        | Command::RepairShip { ship_id, .. }
        | Command::DamageShip { ship_id, .. } => owns(ship_id),
        Command::StartCoordinatedScan { ship_ids, .. } | Command::CreateFormation { ship_ids, .. } => {
            !ship_ids.is_empty() && ship_ids.iter().all(owns)
        }
        Command::DisbandFormation { formation_id } => state.formation_owner(formation_id) == Some(issuer),
        Command::ApplyUpgrade { weapon_id, .. } | Command::AddExperience { weapon_id, .. } => {
            state.weapon_owner(weapon_id) == Some(issuer)
        }
        Command::DistributeExploration { .. }
        | Command::ReportThreat { .. }
        | Command::ClearThreat { .. }
        | Command::AddSector { .. } => true,
    }
}

fn is_combat_command(command: &Command) -> bool {
    matches!(
        command,
        Command::AssignCombatTask { .. }
            | Command::Retreat { .. }
            | Command::RepairShip { .. }
            | Command::DamageShip { .. }
    )
}

fn apply_registration(state: &mut FleetState, envelope: &CommandEnvelope, content: &GameContent) {
    match &envelope.command {
        Command::RegisterShip { ship } => {
            // Rejections are logged by the registry.
            let _ = state.register_ship(ship.as_ref().clone(), content);
        }
        Command::UnregisterShip { ship_id } => {
            state.unregister_ship(ship_id);
        }
        _ => {}
    }
}

fn apply_combat_command(state: &mut FleetState, command: &Command, content: &GameContent, clock: Clock) {
    match command {
        Command::AssignCombatTask {
            ship_id,
            kind,
            target_id,
            position,
            formation,
        } => {
            let target = TaskTarget {
                id: target_id.clone(),
                position: *position,
            };
            state
                .combat
                .assign_task(ship_id, kind.clone(), target, formation.as_ref(), clock);
        }
        Command::Retreat { ship_id } => {
            state.combat.retreat(ship_id, clock);
        }
        Command::RepairShip { ship_id, amount } => {
            state.combat.repair(ship_id, *amount, &content.constants, clock);
        }
        Command::DamageShip { ship_id, amount } => {
            state.combat.damage_ship(ship_id, *amount, clock);
        }
        _ => {}
    }
}

fn apply_fleet_command(state: &mut FleetState, envelope: &CommandEnvelope, content: &GameContent, clock: Clock) {
    match &envelope.command {
        Command::AssignExplorationTask {
            ship_id,
            sector_id,
            position,
            specialization,
        } => {
            let target = SurveyTarget {
                sector_id: sector_id.clone(),
                position: *position,
            };
            state.assign_exploration_task(ship_id, target, *specialization, content);
        }
        Command::StartCoordinatedScan { sector_id, ship_ids } => {
            state
                .exploration
                .start_coordinated_scan(sector_id, ship_ids, &content.constants, clock);
        }
        Command::DistributeExploration { sector_ids } => {
            state.distribute_exploration(&envelope.issued_by, sector_ids, content);
        }
        Command::CreateFormation {
            kind,
            ship_ids,
            spacing,
        } => {
            state.create_formation(*kind, ship_ids, *spacing);
        }
        Command::DisbandFormation { formation_id } => {
            state.disband_formation(formation_id);
        }
        Command::ApplyUpgrade {
            weapon_id,
            upgrade_id,
        } => {
            state.apply_upgrade(weapon_id, upgrade_id, content);
        }
        Command::AddExperience { weapon_id, amount } => {
            state.add_weapon_experience(weapon_id, *amount, content);
        }
        Command::ReportThreat { threat } => {
            state.exploration.report_threat(threat.clone());
        }
        Command::ClearThreat { threat_id } => {
            state.exploration.clear_threat(threat_id);
        }
        Command::AddSector {
            sector_id,
            position,
        } => {
            state.exploration.add_sector(sector_id.clone(), *position, clock);
        }
        _ => {}
    }
}

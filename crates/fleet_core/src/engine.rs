use rand::Rng;

use crate::commands::apply_commands;
use crate::exploration::{Assignment, SurveyTarget};
use crate::registry::RegistryError;
use crate::{
    Clock, CommandEnvelope, EventEnvelope, EventLevel, FleetState, FormationId, FormationKind,
    GameContent, MetaState, PrincipalId, SectorId, Ship, ShipId, Specialization, TaskId,
    UpgradeId, WeaponCategory, WeaponId, WeaponStats,
};

pub const SCHEMA_VERSION: u32 = 1;

/// Advance the simulation by one tick of `dt` seconds.
///
/// Order of operations:
/// 1. Apply commands scheduled for this tick.
/// 2. Exploration update (formations, task starts, surveys, coordinated scans).
/// 3. Combat update (formations, approach, fire, shields, retreat, task progress).
/// 4. Grant weapon experience for every shot and push changed stats to mounts.
/// 5. Advance tick counter and simulation time.
///
/// Returns all events produced this tick.
pub fn tick(
    state: &mut FleetState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    rng: &mut impl Rng,
    dt: f32,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let clock = state.clock();

    apply_commands(state, commands, content, clock);
    state
        .exploration
        .update(clock, dt, &content.constants, rng, event_level);
    let report = state
        .combat
        .update(clock, dt, &content.constants, event_level);
    for shot in &report.shots {
        state.add_weapon_experience(
            &shot.weapon_id,
            content.constants.weapon_experience_per_shot,
            content,
        );
    }

    state.meta.tick += 1;
    state.meta.time += f64::from(dt);
    state.drain_events()
}

impl FleetState {
    pub fn new(seed: u64, content: &GameContent) -> Self {
        Self {
            meta: MetaState {
                tick: 0,
                time: 0.0,
                seed,
                schema_version: SCHEMA_VERSION,
                content_version: content.content_version.clone(),
            },
            combat: crate::CombatManager::new(),
            exploration: crate::ExplorationManager::new(),
            armory: crate::UpgradeLedger::new(),
        }
    }

    pub fn clock(&self) -> Clock {
        Clock {
            tick: self.meta.tick,
            time: self.meta.time,
        }
    }

    /// Looks the ship up in whichever manager owns it.
    pub fn ship(&self, ship_id: &ShipId) -> Option<&Ship> {
        self.combat
            .ship(ship_id)
            .or_else(|| self.exploration.ship(ship_id))
    }

    /// Every ship of `faction` across both managers, sorted by id.
    pub fn fleet(&self, faction: &PrincipalId) -> Vec<&Ship> {
        let mut ships: Vec<&Ship> = self
            .combat
            .roster()
            .registry()
            .iter()
            .chain(self.exploration.roster().registry().iter())
            .filter(|ship| &ship.faction == faction)
            .collect();
        ships.sort_by(|a, b| a.id.cmp(&b.id));
        ships
    }

    pub fn weapon_owner(&self, weapon_id: &WeaponId) -> Option<&PrincipalId> {
        self.combat
            .roster()
            .registry()
            .iter()
            .chain(self.exploration.roster().registry().iter())
            .find(|ship| ship.weapons.iter().any(|m| &m.weapon_id == weapon_id))
            .map(|ship| &ship.faction)
    }

    pub fn formation_owner(&self, formation_id: &FormationId) -> Option<&PrincipalId> {
        let formation = self
            .combat
            .roster()
            .formation(formation_id)
            .or_else(|| self.exploration.roster().formation(formation_id))?;
        self.ship(&formation.leader_id).map(|ship| &ship.faction)
    }

    /// Route the ship to the manager that covers its category and track its
    /// weapons in the upgrade ledger. Nothing changes when the ship is rejected.
    pub fn register_ship(&mut self, ship: Ship, content: &GameContent) -> Result<(), RegistryError> {
        let clock = self.clock();
        let combat_domain = self.combat.roster().registry().accepts(ship.category);
        let (here, claimed) = if combat_domain {
            (self.combat.contains(&ship.id), self.exploration.contains(&ship.id))
        } else {
            (self.exploration.contains(&ship.id), self.combat.contains(&ship.id))
        };
        if claimed {
            let err = RegistryError::ClaimedElsewhere(ship.id);
            tracing::warn!(error = %err, "ship registration rejected");
            return Err(err);
        }
        // A repeat registration falls through to the manager's duplicate check.
        if let Some(weapon_id) = self.shared_weapon(&ship).filter(|_| !here) {
            let err = RegistryError::WeaponClaimed {
                ship_id: ship.id,
                weapon_id,
            };
            tracing::warn!(error = %err, "ship registration rejected");
            return Err(err);
        }
        let mounts: Vec<(WeaponId, WeaponCategory, WeaponStats)> = ship
            .weapons
            .iter()
            .map(|mount| (mount.weapon_id.clone(), mount.category, mount.stats))
            .collect();
        if combat_domain {
            self.combat.register(ship, clock)?;
        } else {
            self.exploration.register(ship, clock)?;
        }
        // A returning ship picks its old ledger record back up.
        for (weapon_id, category, base) in mounts {
            self.armory.track(&weapon_id, category, base, content);
            self.sync_weapon(&weapon_id);
        }
        Ok(())
    }

    /// First mount id that a registered ship already carries, or that the
    /// ship itself mounts twice.
    fn shared_weapon(&self, ship: &Ship) -> Option<WeaponId> {
        let mut seen: Vec<&WeaponId> = Vec::with_capacity(ship.weapons.len());
        for mount in &ship.weapons {
            if seen.contains(&&mount.weapon_id) || self.weapon_owner(&mount.weapon_id).is_some() {
                return Some(mount.weapon_id.clone());
            }
            seen.push(&mount.weapon_id);
        }
        None
    }

    pub fn unregister_ship(&mut self, ship_id: &ShipId) -> bool {
        let clock = self.clock();
        if self.combat.contains(ship_id) {
            return self.combat.unregister(ship_id, clock).is_some();
        }
        self.exploration.unregister(ship_id, clock).is_some()
    }

    /// Formations never span managers; mixed or unknown ship lists are
    /// ignored.
    pub fn create_formation(&mut self, kind: FormationKind, ship_ids: &[ShipId], spacing: f32) -> Option<FormationId> {
        let clock = self.clock();
        if !ship_ids.is_empty() && ship_ids.iter().all(|id| self.combat.contains(id)) {
            return self.combat.create_formation(kind, ship_ids, spacing, clock);
        }
        if !ship_ids.is_empty() && ship_ids.iter().all(|id| self.exploration.contains(id)) {
            return self.exploration.create_formation(kind, ship_ids, spacing, clock);
        }
        tracing::debug!(?kind, "formation ignored: ships unknown or in different domains");
        None
    }

    pub fn disband_formation(&mut self, formation_id: &FormationId) -> bool {
        let clock = self.clock();
        self.combat.disband_formation(formation_id, clock)
            || self.exploration.disband_formation(formation_id, clock)
    }

    /// Exploration assignment that also sees hostile combat ships as threats.
    pub fn assign_exploration_task(
        &mut self,
        ship_id: &ShipId,
        target: SurveyTarget,
        specialization: Specialization,
        content: &GameContent,
    ) -> Option<TaskId> {
        let faction = self.exploration.ship(ship_id)?.faction.clone();
        let hostiles = self.combat.hostile_contacts(&faction, &content.constants);
        let clock = self.clock();
        self.exploration
            .assign_task(ship_id, target, specialization, &hostiles, &content.constants, clock)
    }

    pub fn distribute_exploration(
        &mut self,
        faction: &PrincipalId,
        sector_ids: &[SectorId],
        content: &GameContent,
    ) -> Vec<Assignment> {
        let hostiles = self.combat.hostile_contacts(faction, &content.constants);
        let clock = self.clock();
        self.exploration.distribute_tasks(
            sector_ids,
            Some(faction),
            &hostiles,
            &content.constants,
            clock,
        )
    }

    pub fn apply_upgrade(&mut self, weapon_id: &WeaponId, upgrade_id: &UpgradeId, content: &GameContent) -> bool {
        let applied = self
            .armory
            .apply_upgrade(weapon_id, upgrade_id, content, self.clock());
        if applied {
            self.sync_weapon(weapon_id);
        }
        applied
    }

    pub fn add_weapon_experience(&mut self, weapon_id: &WeaponId, amount: f32, content: &GameContent) -> bool {
        let granted = self
            .armory
            .add_experience(weapon_id, amount, content, self.clock());
        if granted {
            self.sync_weapon(weapon_id);
        }
        granted
    }

    /// Pushes ledger stats to the mount, whichever manager holds it.
    fn sync_weapon(&mut self, weapon_id: &WeaponId) {
        if let Some(stats) = self.armory.stats(weapon_id) {
            if !self.combat.refresh_weapon(weapon_id, stats) {
                self.exploration.refresh_weapon(weapon_id, stats);
            }
        }
    }

    /// Journaled events from every manager: exploration, combat, armory.
    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        let mut events = self.exploration.drain_events();
        events.extend(self.combat.drain_events());
        events.extend(self.armory.drain_events());
        events
    }
}

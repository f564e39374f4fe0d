//! Combat manager: weapon cooldowns, firing, shields, forced retreat and
//! combat task progress.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::events::EventSource;
use crate::formation::step_towards;
use crate::registry::RegistryError;
use crate::roster::Roster;
use crate::tasks::{progress_step, TaskDraft};
use crate::{
    Clock, Constants, DamageModel, Event, EventEnvelope, EventLevel, FailureReason, FormationId,
    FormationKind, PrincipalId, Ship, ShipCategory, ShipId, ShipStatus, SubscriptionId, TaskId,
    TaskKind, TaskOutcome, TaskStatus, TaskTarget, Threat, ThreatId, WeaponId, WeaponStats,
    WeaponStatus,
};

pub const COMBAT_SCOPE: &[ShipCategory] = &[ShipCategory::Combat];

/// A single weapon discharge during an update.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub ship_id: ShipId,
    pub weapon_id: WeaponId,
    pub target_id: Option<String>,
    pub damage: f32,
}

#[derive(Debug, Default)]
pub struct CombatReport {
    pub shots: Vec<Shot>,
}

/// Damage gathered during the firing pass, applied after every ship fired.
#[derive(Default)]
struct DamageLedger {
    incoming: AHashMap<ShipId, f32>,
    last_attacker: AHashMap<ShipId, ShipId>,
}

impl DamageLedger {
    fn record(&mut self, shot: &Shot) {
        let Some(target) = &shot.target_id else {
            return;
        };
        let target = ShipId(target.clone());
        *self.incoming.entry(target.clone()).or_insert(0.0) += shot.damage;
        self.last_attacker.insert(target, shot.ship_id.clone());
    }
}

fn task_priority(kind: &TaskKind) -> i32 {
    match kind {
        TaskKind::Attack => 3,
        TaskKind::Defend => 2,
        _ => 1,
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CombatManager {
    roster: Roster,
}

impl Default for CombatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CombatManager {
    pub fn new() -> Self {
        Self {
            roster: Roster::new(COMBAT_SCOPE, EventSource::Combat),
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ship(&self, ship_id: &ShipId) -> Option<&Ship> {
        self.roster.ship(ship_id)
    }

    pub fn contains(&self, ship_id: &ShipId) -> bool {
        self.roster.registry().contains(ship_id)
    }

    pub fn ships_by_status(&self, status: ShipStatus) -> Vec<&Ship> {
        self.roster.registry().by_status(status)
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EventEnvelope) + Send + 'static,
    {
        self.roster.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.roster.unsubscribe(id)
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.roster.drain_events()
    }

    pub fn register(&mut self, ship: Ship, clock: Clock) -> Result<(), RegistryError> {
        self.roster.register(ship, clock)
    }

    pub fn unregister(&mut self, ship_id: &ShipId, clock: Clock) -> Option<Ship> {
        self.roster.unregister(ship_id, clock)
    }

    // --- Commands ---------------------------------------------------------

    /// Queue an attack, defend or patrol task. Passing a formation enrols the
    /// ship in it first.
    pub fn assign_task(
        &mut self,
        ship_id: &ShipId,
        kind: TaskKind,
        target: TaskTarget,
        formation: Option<&FormationId>,
        clock: Clock,
    ) -> Option<TaskId> {
        if !kind.is_combat() {
            tracing::debug!(%ship_id, kind = kind.label(), "not a combat task");
            return None;
        }
        if let Some(formation_id) = formation {
            self.roster.join_formation(formation_id, ship_id, clock);
        }
        let priority = task_priority(&kind);
        self.roster
            .assign_task(ship_id, TaskDraft::new(kind, target, priority), clock)
    }

    pub fn create_formation(
        &mut self,
        kind: FormationKind,
        ship_ids: &[ShipId],
        spacing: f32,
        clock: Clock,
    ) -> Option<FormationId> {
        self.roster.create_formation(kind, ship_ids, spacing, clock)
    }

    pub fn disband_formation(&mut self, formation_id: &FormationId, clock: Clock) -> bool {
        self.roster.disband_formation(formation_id, clock)
    }

    /// Order a retreat, failing the live task.
    pub fn retreat(&mut self, ship_id: &ShipId, clock: Clock) -> bool {
        let Some(ship) = self.roster.ship(ship_id) else {
            return false;
        };
        if matches!(ship.status, ShipStatus::Disabled | ShipStatus::Retreating) {
            return false;
        }
        self.roster.fail_task(ship_id, FailureReason::Retreat, clock);
        self.roster.set_status(ship_id, ShipStatus::Retreating, clock);
        true
    }

    /// Restore health. A retreating or disabled ship back above the retreat
    /// threshold becomes idle again.
    pub fn repair(&mut self, ship_id: &ShipId, amount: f32, constants: &Constants, clock: Clock) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let Some(ship) = self.roster.ship_mut(ship_id) else {
            return false;
        };
        ship.stats.health = (ship.stats.health + amount).min(ship.stats.max_health);
        let health = ship.stats.health;
        let recovered = matches!(ship.status, ShipStatus::Retreating | ShipStatus::Disabled | ShipStatus::Damaged)
            && ship.stats.health_fraction() >= constants.retreat_health_fraction;
        self.roster.emit(
            clock,
            Event::ShipRepaired {
                ship_id: ship_id.clone(),
                amount,
                health,
            },
        );
        if recovered {
            self.roster.set_status(ship_id, ShipStatus::Idle, clock);
        }
        true
    }

    /// Shield absorbs first, then health. A ship at zero health is disabled.
    pub fn damage_ship(&mut self, ship_id: &ShipId, amount: f32, clock: Clock) -> bool {
        if amount <= 0.0 {
            return false;
        }
        let Some(ship) = self.roster.ship_mut(ship_id) else {
            return false;
        };
        let absorbed = amount.min(ship.stats.shield);
        ship.stats.shield -= absorbed;
        ship.stats.health = (ship.stats.health - (amount - absorbed)).max(0.0);
        ship.combat_stats.damage_received += amount;
        let (health, shield) = (ship.stats.health, ship.stats.shield);
        let disabled = health <= 0.0 && ship.status != ShipStatus::Disabled;
        self.roster.emit(
            clock,
            Event::ShipDamaged {
                ship_id: ship_id.clone(),
                amount,
                health,
                shield,
            },
        );
        if disabled {
            tracing::info!(%ship_id, "ship disabled");
            self.roster.fail_task(ship_id, FailureReason::ShipDisabled, clock);
            self.roster.set_status(ship_id, ShipStatus::Disabled, clock);
        }
        true
    }

    /// Publish new effective stats for every mount carrying `weapon_id`.
    pub fn refresh_weapon(&mut self, weapon_id: &WeaponId, stats: WeaponStats) -> bool {
        self.roster.refresh_weapon(weapon_id, stats)
    }

    /// Operational ships of other factions, rated by firepower and health.
    pub fn hostile_contacts(&self, faction: &PrincipalId, constants: &Constants) -> Vec<Threat> {
        let reference = constants.threat_damage_reference.max(f32::EPSILON);
        let mut threats: Vec<Threat> = self
            .roster
            .registry()
            .iter()
            .filter(|ship| &ship.faction != faction && ship.status != ShipStatus::Disabled)
            .map(|ship| {
                let firepower: f32 = ship.weapons.iter().map(|m| m.stats.damage).sum();
                Threat {
                    id: ThreatId(ship.id.0.clone()),
                    position: ship.position,
                    severity: (firepower / reference).min(1.0) * ship.stats.health_fraction(),
                }
            })
            .collect();
        threats.sort_by(|a, b| a.id.cmp(&b.id));
        threats
    }

    // --- Update -----------------------------------------------------------

    pub fn update(&mut self, clock: Clock, dt: f32, constants: &Constants, level: EventLevel) -> CombatReport {
        self.roster.advance_formations(dt);
        self.roster.start_ready_tasks(clock);
        self.track_targets(clock);
        self.approach_targets(dt);

        let mut report = CombatReport::default();
        let mut ledger = DamageLedger::default();
        for ship_id in self.roster.registry().ids() {
            self.resolve_cooldowns(&ship_id, clock.time);
            if let Some(shot) = self.resolve_fire(&ship_id, clock) {
                ledger.record(&shot);
                report.shots.push(shot);
            }
            self.regenerate(&ship_id, dt, constants);
            self.check_retreat(&ship_id, constants, clock);
            self.advance_task(&ship_id, dt, constants, clock, level);
        }
        if constants.damage_model == DamageModel::Duplex {
            self.apply_damage(&ledger, clock);
        }
        report
    }

    /// Attack targets that are registered ships follow the target's position.
    /// An attack on a disabled ship is over.
    fn track_targets(&mut self, clock: Clock) {
        let mut finished = Vec::new();
        for ship_id in self.roster.tasks().ships_with(TaskStatus::InProgress) {
            let Some(task) = self.roster.task(&ship_id) else {
                continue;
            };
            let Some(target_id) = task.target.id.as_ref() else {
                continue;
            };
            let Some(target) = self.roster.ship(&ShipId(target_id.clone())) else {
                continue;
            };
            if task.kind == TaskKind::Attack && target.status == ShipStatus::Disabled {
                finished.push((ship_id, task.damage_dealt));
                continue;
            }
            let position = target.position;
            if let Some(task) = self.roster.task_mut(&ship_id) {
                task.target.position = position;
            }
        }
        for (ship_id, damage_dealt) in finished {
            tracing::debug!(%ship_id, damage_dealt, "attack target disabled");
            self.roster
                .complete_task(&ship_id, TaskOutcome::Combat { damage_dealt }, clock);
        }
    }

    /// Ships that are not flying a wing slot close to weapon range.
    fn approach_targets(&mut self, dt: f32) {
        for ship_id in self.roster.tasks().ships_with(TaskStatus::InProgress) {
            let Some(task) = self.roster.task(&ship_id) else {
                continue;
            };
            let target = task.target.position;
            let hostile = task.kind.is_hostile();
            let Some(ship) = self.roster.ship_mut(&ship_id) else {
                continue;
            };
            if ship.is_wingman() || matches!(ship.status, ShipStatus::Disabled | ShipStatus::Retreating) {
                continue;
            }
            let stand_off = if hostile { ship.max_weapon_range() } else { 0.0 };
            let distance = ship.position.distance(target);
            if distance <= stand_off {
                continue;
            }
            let step = (distance - stand_off).min(ship.stats.speed * dt);
            ship.position = step_towards(ship.position, target, step);
        }
    }

    fn resolve_cooldowns(&mut self, ship_id: &ShipId, now: f64) {
        let Some(ship) = self.roster.ship_mut(ship_id) else {
            return;
        };
        for mount in &mut ship.weapons {
            if !matches!(mount.state.status, WeaponStatus::Cooling | WeaponStatus::Charging) {
                continue;
            }
            let ready = mount
                .state
                .last_fired
                .is_none_or(|fired| now - fired >= f64::from(mount.stats.cooldown));
            if ready {
                mount.state.status = WeaponStatus::Ready;
            }
        }
    }

    /// Fire the first ready mount (in mount order) that reaches the target.
    fn resolve_fire(&mut self, ship_id: &ShipId, clock: Clock) -> Option<Shot> {
        let task = self.roster.task(ship_id)?;
        if task.status != TaskStatus::InProgress || !task.kind.is_hostile() {
            return None;
        }
        let target = task.target.clone();
        let ship = self.roster.ship_mut(ship_id)?;
        if matches!(ship.status, ShipStatus::Disabled | ShipStatus::Retreating) {
            return None;
        }
        let distance = ship.position.distance(target.position);
        let index = ship
            .weapons
            .iter()
            .position(|m| m.state.status == WeaponStatus::Ready && m.stats.range >= distance)?;
        let energy_cost = ship.weapons[index].stats.energy_cost * ship.tech_bonuses.energy_efficiency;
        if ship.stats.energy < energy_cost {
            tracing::trace!(%ship_id, "insufficient energy to fire");
            return None;
        }
        ship.stats.energy = (ship.stats.energy - energy_cost).max(0.0);
        let damage = ship.weapons[index].stats.damage * ship.tech_bonuses.weapon_efficiency;
        ship.combat_stats.damage_dealt += damage;
        let mount = &mut ship.weapons[index];
        mount.state.status = WeaponStatus::Cooling;
        mount.state.last_fired = Some(clock.time);
        let weapon_id = mount.weapon_id.clone();

        if let Some(task) = self.roster.task_mut(ship_id) {
            task.damage_dealt += damage;
        }
        self.roster.emit(
            clock,
            Event::WeaponFired {
                ship_id: ship_id.clone(),
                weapon_id: weapon_id.clone(),
                target_id: target.id.clone(),
                damage,
            },
        );
        Some(Shot {
            ship_id: ship_id.clone(),
            weapon_id,
            target_id: target.id,
            damage,
        })
    }

    fn regenerate(&mut self, ship_id: &ShipId, dt: f32, constants: &Constants) {
        let Some(ship) = self.roster.ship_mut(ship_id) else {
            return;
        };
        if ship.status == ShipStatus::Disabled {
            return;
        }
        let stats = &mut ship.stats;
        let shield_gain = constants.shield_regen_per_sec * ship.tech_bonuses.shield_regen * dt;
        stats.shield = (stats.shield + shield_gain).min(stats.max_shield);
        stats.energy = (stats.energy + constants.energy_regen_per_sec * dt).min(stats.max_energy);
    }

    fn check_retreat(&mut self, ship_id: &ShipId, constants: &Constants, clock: Clock) {
        let Some(ship) = self.roster.ship(ship_id) else {
            return;
        };
        if matches!(ship.status, ShipStatus::Retreating | ShipStatus::Disabled) {
            return;
        }
        if ship.stats.health >= constants.retreat_health_fraction * ship.stats.max_health {
            return;
        }
        tracing::info!(%ship_id, health = ship.stats.health, "hull critical, retreating");
        self.roster.fail_task(ship_id, FailureReason::Retreat, clock);
        self.roster.set_status(ship_id, ShipStatus::Retreating, clock);
    }

    fn advance_task(&mut self, ship_id: &ShipId, dt: f32, constants: &Constants, clock: Clock, level: EventLevel) {
        let Some(ship) = self.roster.ship(ship_id) else {
            return;
        };
        let efficiency = ship.tech_bonuses.weapon_efficiency * ship.coordination_bonus();
        let step = progress_step(dt, constants.combat_task_rate, efficiency);
        let Some(progress) = self.roster.record_progress(ship_id, step, clock, level) else {
            return;
        };
        if progress < 1.0 {
            return;
        }
        let damage_dealt = self.roster.task(ship_id).map_or(0.0, |task| task.damage_dealt);
        self.roster
            .complete_task(ship_id, TaskOutcome::Combat { damage_dealt }, clock);
    }

    /// Duplex model: land gathered damage on registered targets.
    fn apply_damage(&mut self, ledger: &DamageLedger, clock: Clock) {
        let mut targets: Vec<&ShipId> = ledger.incoming.keys().collect();
        targets.sort();
        for target in targets {
            let was_operational = self
                .roster
                .ship(target)
                .is_some_and(|ship| ship.status != ShipStatus::Disabled);
            if !self.damage_ship(target, ledger.incoming[target], clock) {
                continue;
            }
            let now_disabled = self
                .roster
                .ship(target)
                .is_some_and(|ship| ship.status == ShipStatus::Disabled);
            if was_operational && now_disabled {
                if let Some(attacker) = ledger
                    .last_attacker
                    .get(target)
                    .and_then(|id| self.roster.ship_mut(id))
                {
                    attacker.combat_stats.kill_count += 1;
                }
            }
        }
    }
}

//! Shared manager model: registry, task book, formations and event channel.
//!
//! Combat and exploration each own one roster and layer their own rules on
//! top. Every state change that callers can observe is published through the
//! roster's channel.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::events::{EventChannel, EventSource};
use crate::formation::{
    centroid, compute_bonuses, facing_towards, slot_position, step_towards, FormationBook,
    MembershipChange,
};
use crate::registry::{Registry, RegistryError};
use crate::tasks::{TaskBook, TaskDraft};
use crate::{
    Clock, Event, EventEnvelope, EventLevel, FailureReason, Formation, FormationId,
    FormationKind, FormationMembership, FormationRole, FormationSnapshot, Ship, ShipCategory,
    ShipId, ShipStatus, SubscriptionId, Task, TaskId, TaskOutcome, TaskStatus, WeaponId,
    WeaponStats,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct Roster {
    registry: Registry,
    tasks: TaskBook,
    formations: FormationBook,
    channel: EventChannel,
}

impl Roster {
    pub fn new(scope: &[ShipCategory], source: EventSource) -> Self {
        Self {
            registry: Registry::new(scope),
            tasks: TaskBook::default(),
            formations: FormationBook::new(&format!("{}_formation", source.prefix())),
            channel: EventChannel::new(source),
        }
    }

    // --- Read access ------------------------------------------------------

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tasks(&self) -> &TaskBook {
        &self.tasks
    }

    pub fn formations(&self) -> &FormationBook {
        &self.formations
    }

    pub fn ship(&self, ship_id: &ShipId) -> Option<&Ship> {
        self.registry.get(ship_id)
    }

    pub(crate) fn ship_mut(&mut self, ship_id: &ShipId) -> Option<&mut Ship> {
        self.registry.get_mut(ship_id)
    }

    /// Writes `stats` to every mount carrying `weapon_id`.
    pub(crate) fn refresh_weapon(&mut self, weapon_id: &WeaponId, stats: WeaponStats) -> bool {
        let mut touched = false;
        for ship_id in self.registry.ids() {
            let Some(ship) = self.registry.get_mut(&ship_id) else {
                continue;
            };
            for mount in ship.weapons.iter_mut().filter(|m| &m.weapon_id == weapon_id) {
                mount.stats = stats;
                touched = true;
            }
        }
        touched
    }

    pub fn task(&self, ship_id: &ShipId) -> Option<&Task> {
        self.tasks.get(ship_id)
    }

    pub(crate) fn task_mut(&mut self, ship_id: &ShipId) -> Option<&mut Task> {
        self.tasks.get_mut(ship_id)
    }

    pub fn formation(&self, formation_id: &FormationId) -> Option<&Formation> {
        self.formations.get(formation_id)
    }

    /// Idle and without a live task.
    pub fn is_available(&self, ship_id: &ShipId) -> bool {
        self.registry
            .get(ship_id)
            .is_some_and(|ship| ship.status.is_idle() && self.tasks.get(ship_id).is_none())
    }

    // --- Events -----------------------------------------------------------

    pub(crate) fn emit(&mut self, clock: Clock, event: Event) {
        self.channel.emit(clock, event);
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EventEnvelope) + Send + 'static,
    {
        self.channel.bus_mut().subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.bus_mut().unsubscribe(id)
    }

    pub fn pending_events(&self) -> &[EventEnvelope] {
        self.channel.bus().pending()
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.channel.bus_mut().drain()
    }

    // --- Registration -----------------------------------------------------

    pub fn register(&mut self, mut ship: Ship, clock: Clock) -> Result<(), RegistryError> {
        ship.stats.clamp_pools();
        ship.formation = None;
        let ship_id = ship.id.clone();
        let category = ship.category;
        if let Err(err) = self.registry.insert(ship) {
            tracing::warn!(%ship_id, error = %err, "ship registration rejected");
            return Err(err);
        }
        tracing::debug!(%ship_id, ?category, "ship registered");
        self.emit(clock, Event::ShipRegistered { ship_id, category });
        Ok(())
    }

    /// Removes the ship, failing its live task and leaving any formation.
    /// Unknown ids are a silent no-op.
    pub fn unregister(&mut self, ship_id: &ShipId, clock: Clock) -> Option<Ship> {
        if !self.registry.contains(ship_id) {
            tracing::debug!(%ship_id, "unregister ignored: unknown ship");
            return None;
        }
        self.fail_task(ship_id, FailureReason::ShipLost, clock);
        self.leave_formation(ship_id, clock);
        let ship = self.registry.remove(ship_id)?;
        self.emit(
            clock,
            Event::ShipUnregistered {
                ship_id: ship_id.clone(),
            },
        );
        Some(ship)
    }

    /// Emits `StatusChanged` only when the status actually changes.
    pub fn set_status(&mut self, ship_id: &ShipId, status: ShipStatus, clock: Clock) -> bool {
        let Some(ship) = self.registry.get_mut(ship_id) else {
            return false;
        };
        let previous = ship.status;
        if previous == status {
            return false;
        }
        ship.status = status;
        self.emit(
            clock,
            Event::StatusChanged {
                ship_id: ship_id.clone(),
                previous,
                status,
            },
        );
        true
    }

    // --- Task lifecycle ---------------------------------------------------

    /// Queue a task, silently replacing any live one.
    pub fn assign_task(&mut self, ship_id: &ShipId, mut draft: TaskDraft, clock: Clock) -> Option<TaskId> {
        let ship = self.registry.get(ship_id)?;
        if draft.formation.is_none() {
            draft.formation = self.snapshot_for(ship);
        }
        let (task, replaced) = self.tasks.assign(ship_id, draft, clock.time);
        if let Some(previous) = replaced {
            tracing::debug!(%ship_id, replaced = %previous.id, "task overwritten");
        }
        let task_id = task.id.clone();
        self.emit(
            clock,
            Event::TaskAssigned {
                ship_id: ship_id.clone(),
                task: Box::new(task),
            },
        );
        Some(task_id)
    }

    fn snapshot_for(&self, ship: &Ship) -> Option<FormationSnapshot> {
        let membership = ship.formation.as_ref()?;
        let formation = self.formations.get(&membership.formation_id)?;
        Some(FormationSnapshot {
            formation_id: formation.id.clone(),
            leader_id: formation.leader_id.clone(),
            role: membership.role,
            member_count: formation.ship_ids.len(),
        })
    }

    /// Start every queued task whose ship currently accepts work.
    pub fn start_ready_tasks(&mut self, clock: Clock) {
        for ship_id in self.tasks.ships_with(TaskStatus::Queued) {
            let accepts = self
                .registry
                .get(&ship_id)
                .is_some_and(|ship| ship.status.accepts_tasks());
            if !accepts || !self.tasks.start(&ship_id) {
                continue;
            }
            let Some(task) = self.tasks.get(&ship_id) else {
                continue;
            };
            let task_id = task.id.clone();
            let status = task.kind.active_status();
            self.emit(
                clock,
                Event::TaskStarted {
                    ship_id: ship_id.clone(),
                    task_id,
                },
            );
            self.set_status(&ship_id, status, clock);
        }
    }

    pub(crate) fn record_progress(
        &mut self,
        ship_id: &ShipId,
        amount: f32,
        clock: Clock,
        level: EventLevel,
    ) -> Option<f32> {
        let progress = self.tasks.advance(ship_id, amount)?;
        self.emit_progress(ship_id, progress, clock, level);
        Some(progress)
    }

    pub(crate) fn mirror_progress(
        &mut self,
        ship_id: &ShipId,
        progress: f32,
        clock: Clock,
        level: EventLevel,
    ) -> Option<f32> {
        let progress = self.tasks.raise_to(ship_id, progress)?;
        self.emit_progress(ship_id, progress, clock, level);
        Some(progress)
    }

    fn emit_progress(&mut self, ship_id: &ShipId, progress: f32, clock: Clock, level: EventLevel) {
        if level != EventLevel::Debug {
            return;
        }
        let Some(task) = self.tasks.get(ship_id) else {
            return;
        };
        let task_id = task.id.clone();
        self.emit(
            clock,
            Event::TaskProgress {
                ship_id: ship_id.clone(),
                task_id,
                progress,
            },
        );
    }

    /// Completes the live task and returns the ship to idle.
    pub fn complete_task(&mut self, ship_id: &ShipId, outcome: TaskOutcome, clock: Clock) -> Option<Task> {
        let task = self.tasks.finish(ship_id, TaskStatus::Completed)?;
        tracing::debug!(%ship_id, task = %task.id, kind = task.kind.label(), "task completed");
        self.emit(
            clock,
            Event::TaskCompleted {
                ship_id: ship_id.clone(),
                task: Box::new(task.clone()),
                outcome: Box::new(outcome),
            },
        );
        self.set_status(ship_id, ShipStatus::Idle, clock);
        Some(task)
    }

    /// Fails the live task. Leaves the ship status to the caller.
    pub fn fail_task(&mut self, ship_id: &ShipId, reason: FailureReason, clock: Clock) -> Option<Task> {
        let task = self.tasks.finish(ship_id, TaskStatus::Failed)?;
        tracing::debug!(%ship_id, task = %task.id, ?reason, "task failed");
        self.emit(
            clock,
            Event::TaskFailed {
                ship_id: ship_id.clone(),
                task: Box::new(task.clone()),
                reason,
            },
        );
        Some(task)
    }

    pub fn cancel_task(&mut self, ship_id: &ShipId, clock: Clock) -> Option<Task> {
        let task = self.fail_task(ship_id, FailureReason::Cancelled, clock)?;
        let busy = self
            .registry
            .get(ship_id)
            .is_some_and(|ship| ship.status == task.kind.active_status());
        if busy {
            self.set_status(ship_id, ShipStatus::Idle, clock);
        }
        Some(task)
    }

    // --- Formations -------------------------------------------------------

    /// Unknown and duplicate ids are dropped; the first remaining ship leads.
    pub fn create_formation(
        &mut self,
        kind: FormationKind,
        ship_ids: &[ShipId],
        spacing: f32,
        clock: Clock,
    ) -> Option<FormationId> {
        let mut members: Vec<ShipId> = Vec::with_capacity(ship_ids.len());
        for ship_id in ship_ids {
            if self.registry.contains(ship_id) && !members.contains(ship_id) {
                members.push(ship_id.clone());
            }
        }
        if members.is_empty() {
            tracing::debug!(?kind, "formation not created: no registered members");
            return None;
        }
        for ship_id in &members {
            self.leave_formation(ship_id, clock);
        }
        let formation_id = self.formations.create(kind, members.clone(), spacing, clock.time);
        self.refresh_formation(&formation_id);
        tracing::info!(%formation_id, ?kind, members = members.len(), "formation created");
        self.emit(
            clock,
            Event::FormationCreated {
                formation_id: formation_id.clone(),
                kind,
                leader_id: members[0].clone(),
                ship_ids: members,
            },
        );
        Some(formation_id)
    }

    pub fn disband_formation(&mut self, formation_id: &FormationId, clock: Clock) -> bool {
        let Some(formation) = self.formations.remove(formation_id) else {
            return false;
        };
        for ship_id in &formation.ship_ids {
            if let Some(ship) = self.registry.get_mut(ship_id) {
                ship.formation = None;
            }
        }
        tracing::info!(%formation_id, "formation disbanded");
        self.emit(
            clock,
            Event::FormationDisbanded {
                formation_id: formation_id.clone(),
            },
        );
        true
    }

    pub fn join_formation(&mut self, formation_id: &FormationId, ship_id: &ShipId, clock: Clock) -> bool {
        if !self.registry.contains(ship_id) || self.formations.get(formation_id).is_none() {
            return false;
        }
        let already_member = self
            .registry
            .get(ship_id)
            .and_then(|ship| ship.formation.as_ref())
            .is_some_and(|m| &m.formation_id == formation_id);
        if already_member {
            return false;
        }
        self.leave_formation(ship_id, clock);
        if !self.formations.add_member(formation_id, ship_id) {
            return false;
        }
        self.refresh_formation(formation_id);
        self.emit_membership(formation_id, clock);
        true
    }

    /// Drop the ship from its formation, disbanding it when it empties.
    pub fn leave_formation(&mut self, ship_id: &ShipId, clock: Clock) {
        let Some(membership) = self.registry.get_mut(ship_id).and_then(|ship| ship.formation.take()) else {
            return;
        };
        let formation_id = membership.formation_id;
        match self.formations.remove_member(&formation_id, ship_id) {
            MembershipChange::NotMember => {}
            MembershipChange::Emptied(_) => {
                tracing::info!(%formation_id, "formation disbanded: last member left");
                self.emit(clock, Event::FormationDisbanded { formation_id });
            }
            MembershipChange::Updated { leader_changed } => {
                if leader_changed {
                    tracing::debug!(%formation_id, "formation leader reassigned");
                }
                self.refresh_formation(&formation_id);
                self.emit_membership(&formation_id, clock);
            }
        }
    }

    fn emit_membership(&mut self, formation_id: &FormationId, clock: Clock) {
        let Some(formation) = self.formations.get(formation_id) else {
            return;
        };
        let event = Event::FormationMembershipChanged {
            formation_id: formation_id.clone(),
            ship_ids: formation.ship_ids.clone(),
            leader_id: formation.leader_id.clone(),
        };
        self.emit(clock, event);
    }

    /// Recompute bonuses and push roles and coordination onto members.
    fn refresh_formation(&mut self, formation_id: &FormationId) {
        let Some(formation) = self.formations.get(formation_id) else {
            return;
        };
        let members: Vec<&Ship> = formation
            .ship_ids
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();
        let bonuses = compute_bonuses(formation.kind, &members);
        let positions: Vec<Vec2> = members.iter().map(|ship| ship.position).collect();
        let ship_ids = formation.ship_ids.clone();
        let leader_id = formation.leader_id.clone();

        if let Some(formation) = self.formations.get_mut(formation_id) {
            formation.bonuses = bonuses;
            formation.position = centroid(&positions);
        }
        for ship_id in &ship_ids {
            if let Some(ship) = self.registry.get_mut(ship_id) {
                let role = if *ship_id == leader_id {
                    FormationRole::Leader
                } else {
                    FormationRole::Wing
                };
                ship.formation = Some(FormationMembership {
                    formation_id: formation_id.clone(),
                    role,
                    coordination_bonus: bonuses.coordination,
                });
            }
        }
    }

    /// Sorted ids of members that are idle and have no live task.
    pub fn available_members(&self, formation_id: &FormationId) -> Vec<ShipId> {
        let Some(formation) = self.formations.get(formation_id) else {
            return Vec::new();
        };
        let mut ids: Vec<ShipId> = formation
            .ship_ids
            .iter()
            .filter(|id| self.is_available(id))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Turn each formation towards its leader's target and move wings
    /// towards their slots.
    pub fn advance_formations(&mut self, dt: f32) {
        for formation_id in self.formations.ids() {
            let Some(formation) = self.formations.get(&formation_id) else {
                continue;
            };
            let Some(leader) = self.registry.get(&formation.leader_id) else {
                continue;
            };
            let leader_pos = leader.position;
            let facing = self
                .tasks
                .get(&formation.leader_id)
                .and_then(|task| facing_towards(leader_pos, task.target.position))
                .unwrap_or(formation.facing);
            let spacing = formation.spacing;
            let ship_ids = formation.ship_ids.clone();

            for (index, ship_id) in ship_ids.iter().enumerate().skip(1) {
                let Some(ship) = self.registry.get_mut(ship_id) else {
                    continue;
                };
                if matches!(ship.status, ShipStatus::Disabled | ShipStatus::Retreating) {
                    continue;
                }
                let slot = slot_position(leader_pos, facing, spacing, index);
                ship.position = step_towards(ship.position, slot, ship.stats.speed * dt);
            }

            let positions: Vec<Vec2> = ship_ids
                .iter()
                .filter_map(|id| self.registry.get(id).map(|ship| ship.position))
                .collect();
            if let Some(formation) = self.formations.get_mut(&formation_id) {
                formation.facing = facing;
                formation.position = centroid(&positions);
            }
        }
    }
}

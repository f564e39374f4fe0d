use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    FormationSnapshot, ShipId, Specialization, Task, TaskId, TaskKind, TaskStatus, TaskTarget,
};

/// Everything a manager decides about a task before the roster stamps it.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub kind: TaskKind,
    pub target: TaskTarget,
    pub priority: i32,
    pub formation: Option<FormationSnapshot>,
    pub threat_level: Option<f32>,
    pub specialization: Option<Specialization>,
}

impl TaskDraft {
    pub fn new(kind: TaskKind, target: TaskTarget, priority: i32) -> Self {
        Self {
            kind,
            target,
            priority,
            formation: None,
            threat_level: None,
            specialization: None,
        }
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        match self {
            Self::Queued => matches!(next, Self::InProgress | Self::Failed),
            Self::InProgress => next.is_terminal(),
            Self::Completed | Self::Failed => false,
        }
    }
}

/// Progress earned over `dt` seconds at `rate` per second scaled by `efficiency`.
pub(crate) fn progress_step(dt: f32, rate: f32, efficiency: f32) -> f32 {
    (dt * rate * efficiency).max(0.0)
}

/// At most one live task per ship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskBook {
    tasks: HashMap<ShipId, Task>,
    next_task_id: u64,
}

impl TaskBook {
    /// Store a new queued task, returning the one it replaced (if any).
    pub fn assign(&mut self, ship_id: &ShipId, draft: TaskDraft, now: f64) -> (Task, Option<Task>) {
        let id = TaskId(format!("task_{:05}", self.next_task_id));
        self.next_task_id += 1;
        let task = Task {
            id,
            ship_id: ship_id.clone(),
            kind: draft.kind,
            target: draft.target,
            priority: draft.priority,
            assigned_at: now,
            status: TaskStatus::Queued,
            formation: draft.formation,
            progress: 0.0,
            threat_level: draft.threat_level,
            specialization: draft.specialization,
            damage_dealt: 0.0,
        };
        let replaced = self.tasks.insert(ship_id.clone(), task.clone());
        (task, replaced)
    }

    pub fn get(&self, ship_id: &ShipId) -> Option<&Task> {
        self.tasks.get(ship_id)
    }

    pub fn get_mut(&mut self, ship_id: &ShipId) -> Option<&mut Task> {
        self.tasks.get_mut(ship_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    /// Sorted ids of ships whose task is in `status`.
    pub fn ships_with(&self, status: TaskStatus) -> Vec<ShipId> {
        let mut ids: Vec<ShipId> = self
            .tasks
            .values()
            .filter(|task| task.status == status)
            .map(|task| task.ship_id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Queued → in-progress. Returns false for any other starting status.
    pub fn start(&mut self, ship_id: &ShipId) -> bool {
        let Some(task) = self.tasks.get_mut(ship_id) else {
            return false;
        };
        if !task.status.can_transition_to(TaskStatus::InProgress) {
            return false;
        }
        task.status = TaskStatus::InProgress;
        true
    }

    /// Add progress to an in-progress task, saturating at 1.0.
    pub fn advance(&mut self, ship_id: &ShipId, amount: f32) -> Option<f32> {
        let task = self.tasks.get_mut(ship_id)?;
        if task.status != TaskStatus::InProgress {
            return None;
        }
        task.progress = (task.progress + amount.max(0.0)).min(1.0);
        Some(task.progress)
    }

    /// Raise progress to `progress` without ever moving it backwards.
    pub fn raise_to(&mut self, ship_id: &ShipId, progress: f32) -> Option<f32> {
        let task = self.tasks.get_mut(ship_id)?;
        if task.status != TaskStatus::InProgress {
            return None;
        }
        task.progress = task.progress.max(progress.min(1.0));
        Some(task.progress)
    }

    /// Remove the task, stamping its terminal status.
    pub fn finish(&mut self, ship_id: &ShipId, status: TaskStatus) -> Option<Task> {
        let current = self.tasks.get(ship_id)?;
        if !current.status.can_transition_to(status) {
            return None;
        }
        let mut task = self.tasks.remove(ship_id)?;
        task.status = status;
        Some(task)
    }
}

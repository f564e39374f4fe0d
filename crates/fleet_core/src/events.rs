//! Event payloads and the in-process publish/subscribe bus.
//!
//! Every manager owns an [`EventChannel`]: a per-source id sequence plus an
//! [`EventBus`] that fans each envelope out to subscribers synchronously and
//! keeps it in a journal until the caller drains it.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    Anomaly, Clock, EventId, FailureReason, FormationId, FormationKind, ScanId, ScanReport,
    SectorId, ShipCategory, ShipId, ShipStatus, SpecializationId, Task, TaskId, TaskOutcome,
    UpgradeId, WeaponId, WeaponStats,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    /// Simulation time in seconds.
    pub time: f64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    ShipRegistered {
        ship_id: ShipId,
        category: ShipCategory,
    },
    ShipUnregistered {
        ship_id: ShipId,
    },
    StatusChanged {
        ship_id: ShipId,
        previous: ShipStatus,
        status: ShipStatus,
    },
    TaskAssigned {
        ship_id: ShipId,
        task: Box<Task>,
    },
    TaskStarted {
        ship_id: ShipId,
        task_id: TaskId,
    },
    /// Emitted only at [`crate::EventLevel::Debug`].
    TaskProgress {
        ship_id: ShipId,
        task_id: TaskId,
        progress: f32,
    },
    TaskCompleted {
        ship_id: ShipId,
        task: Box<Task>,
        outcome: Box<TaskOutcome>,
    },
    TaskFailed {
        ship_id: ShipId,
        task: Box<Task>,
        reason: FailureReason,
    },
    FormationCreated {
        formation_id: FormationId,
        kind: FormationKind,
        ship_ids: Vec<ShipId>,
        leader_id: ShipId,
    },
    FormationMembershipChanged {
        formation_id: FormationId,
        ship_ids: Vec<ShipId>,
        leader_id: ShipId,
    },
    FormationDisbanded {
        formation_id: FormationId,
    },
    WeaponFired {
        ship_id: ShipId,
        weapon_id: WeaponId,
        target_id: Option<String>,
        damage: f32,
    },
    ShipDamaged {
        ship_id: ShipId,
        amount: f32,
        health: f32,
        shield: f32,
    },
    ShipRepaired {
        ship_id: ShipId,
        amount: f32,
        health: f32,
    },
    AnomalyDiscovered {
        sector_id: SectorId,
        anomaly: Anomaly,
    },
    SectorScanned {
        sector_id: SectorId,
        report: Box<ScanReport>,
    },
    SectorAdded {
        sector_id: SectorId,
        position: Vec2,
    },
    CoordinatedScanStarted {
        scan_id: ScanId,
        sector_id: SectorId,
        ship_ids: Vec<ShipId>,
    },
    CoordinatedScanCompleted {
        scan_id: ScanId,
        sector_id: SectorId,
        ship_ids: Vec<ShipId>,
    },
    CoordinatedScanFailed {
        scan_id: ScanId,
        sector_id: SectorId,
    },
    UpgradeApplied {
        weapon_id: WeaponId,
        upgrade_id: UpgradeId,
    },
    StatsUpdated {
        weapon_id: WeaponId,
        stats: WeaponStats,
    },
    ExperienceGained {
        weapon_id: WeaponId,
        amount: f32,
        total: f32,
    },
    SpecializationUnlocked {
        weapon_id: WeaponId,
        specialization_id: SpecializationId,
    },
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

type Handler<E> = Box<dyn FnMut(&E) + Send>;

/// Synchronous fan-out to subscribers plus a drainable journal.
pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Handler<E>)>,
    next_subscription: u64,
    journal: Vec<E>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            next_subscription: 0,
            journal: Vec::new(),
        }
    }
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .field("journal", &self.journal.len())
            .finish()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(handler)));
        id
    }

    /// Returns false when the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Handlers run in subscription order before the event is journaled.
    pub fn publish(&mut self, event: E) {
        for (_, handler) in &mut self.subscribers {
            handler(&event);
        }
        self.journal.push(event);
    }

    pub fn drain(&mut self) -> Vec<E> {
        std::mem::take(&mut self.journal)
    }

    pub fn pending(&self) -> &[E] {
        &self.journal
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Combat,
    Exploration,
    Armory,
}

impl EventSource {
    pub(crate) fn prefix(self) -> &'static str {
        match self {
            Self::Combat => "cmb",
            Self::Exploration => "exp",
            Self::Armory => "arm",
        }
    }
}

/// Stamps ids onto a manager's events and publishes them.
#[derive(Debug, Serialize, Deserialize)]
pub struct EventChannel {
    source: EventSource,
    next_event_id: u64,
    #[serde(skip)]
    bus: EventBus<EventEnvelope>,
}

impl EventChannel {
    pub fn new(source: EventSource) -> Self {
        Self {
            source,
            next_event_id: 0,
            bus: EventBus::new(),
        }
    }

    pub fn emit(&mut self, clock: Clock, event: Event) {
        let id = EventId(format!("{}_{:06}", self.source.prefix(), self.next_event_id));
        self.next_event_id += 1;
        self.bus.publish(EventEnvelope {
            id,
            tick: clock.tick,
            time: clock.time,
            event,
        });
    }

    pub fn bus(&self) -> &EventBus<EventEnvelope> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus<EventEnvelope> {
        &mut self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn clock() -> Clock {
        Clock { tick: 3, time: 1.5 }
    }

    #[test]
    fn subscribers_see_events_in_publish_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::<u32>::new();
        let sink = Arc::clone(&seen);
        bus.subscribe(move |value| sink.lock().unwrap().push(*value));

        bus.publish(1);
        bus.publish(2);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(bus.drain(), vec![1, 2]);
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn unsubscribed_handler_stops_receiving() {
        let seen = Arc::new(Mutex::new(0_u32));
        let mut bus = EventBus::<u32>::new();
        let sink = Arc::clone(&seen);
        let id = bus.subscribe(move |_| *sink.lock().unwrap() += 1);

        bus.publish(1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id), "second unsubscribe is a no-op");
        bus.publish(2);

        assert_eq!(*seen.lock().unwrap(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn channel_ids_are_prefixed_and_sequential() {
        let mut channel = EventChannel::new(EventSource::Exploration);
        let ship_id = ShipId("ship_0001".to_string());
        channel.emit(clock(), Event::ShipUnregistered { ship_id: ship_id.clone() });
        channel.emit(clock(), Event::ShipUnregistered { ship_id });

        let events = channel.bus_mut().drain();
        assert_eq!(events[0].id.0, "exp_000000");
        assert_eq!(events[1].id.0, "exp_000001");
        assert_eq!(events[1].tick, 3);
    }
}

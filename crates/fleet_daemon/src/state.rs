use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use fleet_control::FleetAutopilot;
use fleet_core::{
    Command, CommandEnvelope, CommandId, EventEnvelope, EventLevel, FleetState, GameContent,
    PrincipalId,
};
use parking_lot::Mutex;
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tokio::sync::broadcast;

/// Body of `POST /api/v1/command`. The daemon stamps id and ticks.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    pub issued_by: PrincipalId,
    pub command: Command,
}

pub struct SimState {
    pub fleet: FleetState,
    pub content: GameContent,
    pub rng: ChaCha8Rng,
    pub autopilots: Vec<FleetAutopilot>,
    pub next_command_id: u64,
    /// Commands received over HTTP, executed on the next tick.
    pub inbox: Vec<CommandRequest>,
    pub event_level: EventLevel,
    pub dt: f32,
}

impl SimState {
    /// Stamps queued requests for the current tick and empties the inbox.
    pub fn take_inbox(&mut self) -> Vec<CommandEnvelope> {
        let tick = self.fleet.meta.tick;
        let requests = std::mem::take(&mut self.inbox);
        requests
            .into_iter()
            .map(|request| {
                let id = CommandId(format!("cmd_{:06}", self.next_command_id));
                self.next_command_id += 1;
                CommandEnvelope {
                    id,
                    issued_by: request.issued_by,
                    issued_tick: tick,
                    execute_at_tick: tick,
                    command: request.command,
                }
            })
            .collect()
    }
}

pub type SharedSim = Arc<Mutex<SimState>>;
pub type EventTx = broadcast::Sender<Vec<EventEnvelope>>;

#[derive(Clone)]
pub struct AppState {
    pub sim: SharedSim,
    pub event_tx: EventTx,
    pub ticks_per_sec: f64,
    pub paused: Arc<AtomicBool>,
}

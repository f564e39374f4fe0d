use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_control::CommandSource;

use crate::state::{EventTx, SharedSim, SimState};

const PAUSED_POLL: Duration = Duration::from_millis(50);

/// Runs one tick: HTTP inbox first, then every autopilot, then the core tick.
fn step(sim: &mut SimState) -> Vec<fleet_core::EventEnvelope> {
    let mut commands = sim.take_inbox();
    let SimState {
        ref fleet,
        ref content,
        ref mut autopilots,
        ref mut next_command_id,
        ..
    } = *sim;
    for autopilot in autopilots.iter_mut() {
        commands.extend(autopilot.generate_commands(fleet, content, next_command_id));
    }
    let SimState {
        ref mut fleet,
        ref content,
        ref mut rng,
        event_level,
        dt,
        ..
    } = *sim;
    fleet_core::tick(fleet, &commands, content, rng, dt, event_level)
}

pub async fn run_tick_loop(
    sim: SharedSim,
    event_tx: EventTx,
    ticks_per_sec: f64,
    max_ticks: Option<u64>,
    paused: Arc<AtomicBool>,
) {
    let mut interval = if ticks_per_sec > 0.0 {
        let mut iv = tokio::time::interval(Duration::from_secs_f64(1.0 / ticks_per_sec));
        iv.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Burst);
        Some(iv)
    } else {
        None
    };

    loop {
        if paused.load(Ordering::Relaxed) {
            tokio::time::sleep(PAUSED_POLL).await;
            continue;
        }

        let (events, done) = {
            let mut guard = sim.lock();
            let events = step(&mut guard);
            let done = max_ticks.is_some_and(|max| guard.fleet.meta.tick >= max);
            (events, done)
        };

        // No subscribers is not an error.
        let _ = event_tx.send(events);

        if done {
            tracing::info!("tick loop reached max ticks");
            break;
        }

        if let Some(ref mut iv) = interval {
            iv.tick().await;
        } else {
            tokio::task::yield_now().await;
        }
    }
}

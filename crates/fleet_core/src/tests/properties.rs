use std::collections::{HashMap, HashSet};

use super::*;

fn assert_pools_bounded(state: &FleetState) {
    for faction in [player(), crate::test_fixtures::hostile()] {
        for ship in state.fleet(&faction) {
            let stats = &ship.stats;
            assert!(stats.health >= 0.0 && stats.health <= stats.max_health, "{}", ship.id);
            assert!(stats.shield >= 0.0 && stats.shield <= stats.max_shield, "{}", ship.id);
            assert!(stats.energy >= 0.0 && stats.energy <= stats.max_energy, "{}", ship.id);
        }
    }
}

fn assert_leaders_are_members(state: &FleetState) {
    let books = [state.combat.roster().formations(), state.exploration.roster().formations()];
    for book in books {
        for formation_id in book.ids() {
            let formation = book.get(&formation_id).unwrap();
            assert!(!formation.ship_ids.is_empty());
            assert_eq!(formation.ship_ids[0], formation.leader_id);
        }
    }
}

fn brawl_commands(state: &FleetState) -> Vec<CommandEnvelope> {
    vec![
        attack_command(state, "ship_0001", "ship_0101"),
        attack_command(state, "ship_0002", "ship_0101"),
        attack_command(state, "ship_0101", "ship_0001"),
        player_command(
            state,
            Command::CreateFormation {
                kind: FormationKind::Survey,
                ship_ids: vec![ship_id("scout_0001"), ship_id("scout_0002")],
                spacing: 40.0,
            },
        ),
        player_command(
            state,
            Command::DistributeExploration {
                sector_ids: vec![sector_id("sector_0001"), sector_id("sector_0002")],
            },
        ),
    ]
}

fn run_brawl(seed_content: &GameContent, ticks: u64) -> (FleetState, Vec<EventEnvelope>) {
    let mut state = test_state(seed_content);
    let mut rng = make_rng();
    let commands = brawl_commands(&state);
    let mut events = tick(&mut state, &commands, seed_content, &mut rng, DT, EventLevel::Debug);
    for _ in 1..ticks {
        events.extend(tick(&mut state, &[], seed_content, &mut rng, DT, EventLevel::Debug));
        assert_pools_bounded(&state);
        assert_leaders_are_members(&state);
    }
    (state, events)
}

fn duplex_content() -> GameContent {
    let mut content = test_content();
    content.constants.damage_model = DamageModel::Duplex;
    content
}

#[test]
fn brawl_keeps_pools_and_leaders_consistent() {
    let content = duplex_content();
    let (state, events) = run_brawl(&content, 60);

    let target = state.ship(&ship_id("ship_0101")).unwrap();
    assert!(target.stats.health < target.stats.max_health, "duplex damage landed");
    assert!(events
        .iter()
        .any(|e| matches!(&e.event, Event::CoordinatedScanStarted { .. })));
}

#[test]
fn task_progress_never_decreases() {
    let content = duplex_content();
    let (_, events) = run_brawl(&content, 40);

    // task ids are per manager; ship ids are global
    let mut last: HashMap<(ShipId, TaskId), f32> = HashMap::new();
    let mut reports = 0;
    for envelope in &events {
        if let Event::TaskProgress { ship_id, task_id, progress } = &envelope.event {
            reports += 1;
            assert!((0.0..=1.0).contains(progress));
            let previous = last
                .insert((ship_id.clone(), task_id.clone()), *progress)
                .unwrap_or(0.0);
            assert!(*progress >= previous, "{task_id}: {previous} -> {progress}");
        }
    }
    assert!(reports > 0, "debug level reports progress");
}

#[test]
fn normal_level_suppresses_progress_events() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let cmd = attack_command(&state, "ship_0001", "ship_0101");
    let mut events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);
    events.extend(run_ticks(&mut state, &content, &mut rng, 5));

    assert!(!events.iter().any(|e| matches!(&e.event, Event::TaskProgress { .. })));
}

#[test]
fn terminal_tasks_leave_the_book() {
    let content = duplex_content();
    let (state, events) = run_brawl(&content, 60);

    let finished: HashSet<(ShipId, TaskId)> = events
        .iter()
        .filter_map(|e| match &e.event {
            Event::TaskCompleted { ship_id, task, .. } | Event::TaskFailed { ship_id, task, .. } => {
                Some((ship_id.clone(), task.id.clone()))
            }
            _ => None,
        })
        .collect();
    assert!(!finished.is_empty());
    for roster in [state.combat.roster(), state.exploration.roster()] {
        for task in roster.tasks().iter() {
            let key = (task.ship_id.clone(), task.id.clone());
            assert!(!finished.contains(&key), "{} still live", task.id);
        }
    }
}

#[test]
fn event_ids_are_unique() {
    let content = duplex_content();
    let (_, events) = run_brawl(&content, 30);
    let ids: HashSet<&EventId> = events.iter().map(|e| &e.id).collect();
    assert_eq!(ids.len(), events.len());
}

#[test]
fn same_seed_same_history() {
    let content = duplex_content();
    let (_, first) = run_brawl(&content, 30);
    let (_, second) = run_brawl(&content, 30);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn unregister_twice_is_a_no_op() {
    let content = test_content();
    let mut state = test_state(&content);

    assert!(state.unregister_ship(&ship_id("scout_0001")));
    state.drain_events();
    assert!(!state.unregister_ship(&ship_id("scout_0001")));
    assert!(state.drain_events().is_empty());
    assert!(!state.unregister_ship(&ship_id("never_registered")));
}

#[test]
fn state_survives_a_json_round_trip() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let cmd = attack_command(&state, "ship_0001", "ship_0101");
    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let json = serde_json::to_string(&state).unwrap();
    let mut restored: FleetState = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.meta.tick, state.meta.tick);
    assert_eq!(
        restored.combat.roster().task(&ship_id("ship_0001")).map(|t| t.id.clone()),
        state.combat.roster().task(&ship_id("ship_0001")).map(|t| t.id.clone())
    );
    let events = tick(&mut restored, &[], &content, &mut rng, DT, EventLevel::Normal);
    assert!(events.iter().all(|e| e.tick == state.meta.tick));
}

use super::*;
use crate::test_fixtures::combat_ship;
use glam::Vec2;
use std::f32::consts::FRAC_PI_4;

const MEMBERS: [&str; 4] = ["ship_a", "ship_b", "ship_c", "ship_d"];

fn squadron(content: &GameContent) -> (FleetState, FormationId) {
    let mut state = FleetState::new(7, content);
    for id in MEMBERS {
        state.register_ship(combat_ship(id, Vec2::ZERO), content).unwrap();
    }
    let ids: Vec<ShipId> = MEMBERS.iter().map(|id| ship_id(id)).collect();
    let formation_id = state
        .create_formation(FormationKind::Offensive, &ids, 100.0)
        .unwrap();
    state.drain_events();
    (state, formation_id)
}

#[test]
fn wings_settle_on_their_slots() {
    let content = test_content();
    let (mut state, formation_id) = squadron(&content);
    let mut rng = make_rng();

    run_ticks(&mut state, &content, &mut rng, 10);

    let leader = state.ship(&ship_id("ship_a")).unwrap();
    assert!(leader.position.length() < 1e-5, "leader holds without a task");
    let first_wing = state.ship(&ship_id("ship_b")).unwrap();
    let expected = Vec2::new(100.0 * FRAC_PI_4.cos(), 100.0 * FRAC_PI_4.sin());
    assert!((first_wing.position - expected).length() < 1e-3);
    let second_wing = state.ship(&ship_id("ship_c")).unwrap();
    assert!((second_wing.position - Vec2::new(0.0, 100.0)).length() < 1e-3);

    let formation = state.combat.roster().formation(&formation_id).unwrap();
    assert_eq!(formation.leader_id, ship_id("ship_a"));
    assert!(formation.facing.abs() < 1e-6);
}

#[test]
fn wings_move_no_faster_than_their_speed() {
    let content = test_content();
    let (mut state, _) = squadron(&content);
    let mut rng = make_rng();

    run_ticks(&mut state, &content, &mut rng, 1);

    let wing = state.ship(&ship_id("ship_b")).unwrap();
    assert!((wing.position.length() - wing.stats.speed).abs() < 1e-3);
}

#[test]
fn members_carry_roles_and_coordination() {
    let content = test_content();
    let (state, formation_id) = squadron(&content);

    let leader = state.ship(&ship_id("ship_a")).unwrap();
    let membership = leader.formation.as_ref().unwrap();
    assert_eq!(membership.formation_id, formation_id);
    assert_eq!(membership.role, FormationRole::Leader);
    for id in &MEMBERS[1..] {
        let membership = state.ship(&ship_id(id)).unwrap().formation.clone().unwrap();
        assert_eq!(membership.role, FormationRole::Wing);
        // offensive profile 1.2 at four ships (factor 0.9)
        assert!((membership.coordination_bonus - 1.18).abs() < 1e-5);
    }
}

#[test]
fn leader_loss_promotes_next_member() {
    let content = test_content();
    let (mut state, formation_id) = squadron(&content);

    assert!(state.unregister_ship(&ship_id("ship_a")));

    let formation = state.combat.roster().formation(&formation_id).unwrap();
    assert_eq!(formation.leader_id, ship_id("ship_b"));
    assert_eq!(formation.ship_ids.len(), 3);
    let promoted = state.ship(&ship_id("ship_b")).unwrap();
    assert_eq!(promoted.formation.as_ref().unwrap().role, FormationRole::Leader);

    let events = state.drain_events();
    assert!(events.iter().any(|e| matches!(
        &e.event,
        Event::FormationMembershipChanged { leader_id, .. } if leader_id.0 == "ship_b"
    )));
}

#[test]
fn joining_through_a_task_recomputes_bonuses() {
    let content = test_content();
    let mut state = FleetState::new(7, &content);
    let mut rng = make_rng();
    for id in ["ship_a", "ship_b", "ship_c"] {
        state.register_ship(combat_ship(id, Vec2::ZERO), &content).unwrap();
    }
    let formation_id = state
        .create_formation(FormationKind::Offensive, &[ship_id("ship_a"), ship_id("ship_b")], 50.0)
        .unwrap();
    let before = state.combat.roster().formation(&formation_id).unwrap().bonuses;

    let cmd = player_command(
        &state,
        Command::AssignCombatTask {
            ship_id: ship_id("ship_c"),
            kind: TaskKind::Patrol,
            target_id: None,
            position: Vec2::new(0.0, 500.0),
            formation: Some(formation_id.clone()),
        },
    );
    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let formation = state.combat.roster().formation(&formation_id).unwrap();
    assert_eq!(formation.ship_ids.len(), 3);
    assert!(formation.bonuses.coordination > before.coordination);
    let task = state.combat.roster().task(&ship_id("ship_c")).unwrap();
    let snapshot = task.formation.as_ref().unwrap();
    assert_eq!(snapshot.member_count, 3);
    assert_eq!(snapshot.leader_id, ship_id("ship_a"));
}

#[test]
fn formation_turns_towards_leader_target() {
    let content = test_content();
    let (mut state, formation_id) = squadron(&content);
    let mut rng = make_rng();
    let cmd = player_command(
        &state,
        Command::AssignCombatTask {
            ship_id: ship_id("ship_a"),
            kind: TaskKind::Patrol,
            target_id: None,
            position: Vec2::new(0.0, 1000.0),
            formation: None,
        },
    );
    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);
    tick(&mut state, &[], &content, &mut rng, DT, EventLevel::Normal);

    let formation = state.combat.roster().formation(&formation_id).unwrap();
    assert!((formation.facing - std::f32::consts::FRAC_PI_2).abs() < 1e-4);
}

#[test]
fn mixed_domain_formation_is_refused() {
    let content = test_content();
    let mut state = test_state(&content);
    let created = state.create_formation(
        FormationKind::Balanced,
        &[ship_id("ship_0001"), ship_id("scout_0001")],
        50.0,
    );
    assert!(created.is_none());
    assert!(state.ship(&ship_id("ship_0001")).unwrap().formation.is_none());
}

#[test]
fn disband_clears_memberships() {
    let content = test_content();
    let (mut state, formation_id) = squadron(&content);

    assert!(state.disband_formation(&formation_id));
    assert!(!state.disband_formation(&formation_id));
    for id in MEMBERS {
        assert!(state.ship(&ship_id(id)).unwrap().formation.is_none());
    }
}

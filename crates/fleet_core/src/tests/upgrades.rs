use super::*;
use crate::test_fixtures::{combat_ship, recon_ship};

fn weapon(id: &str) -> WeaponId {
    WeaponId(id.to_string())
}

fn upgrade(id: &str) -> UpgradeId {
    UpgradeId(id.to_string())
}

fn upgrade_command(state: &FleetState, weapon_id: &str, upgrade_id: &str) -> CommandEnvelope {
    player_command(
        state,
        Command::ApplyUpgrade {
            weapon_id: weapon(weapon_id),
            upgrade_id: upgrade(upgrade_id),
        },
    )
}

fn experience_command(state: &FleetState, weapon_id: &str, amount: f32) -> CommandEnvelope {
    player_command(
        state,
        Command::AddExperience {
            weapon_id: weapon(weapon_id),
            amount,
        },
    )
}

fn mount_stats(state: &FleetState, ship: &str) -> WeaponStats {
    state.ship(&ship_id(ship)).unwrap().weapons[0].stats
}

#[test]
fn applied_upgrade_reaches_the_mount() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();

    let cmd = upgrade_command(&state, "ship_0001_rail", "rail_capacitors");
    let events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let stats = mount_stats(&state, "ship_0001");
    assert!((stats.damage - 12.0).abs() < 1e-4);
    assert!((stats.energy_cost - 5.5).abs() < 1e-4);
    assert!(events.iter().any(|e| matches!(&e.event, Event::UpgradeApplied { .. })));
    assert!(events.iter().any(|e| matches!(&e.event, Event::StatsUpdated { .. })));

    let record = state.armory.record(&weapon("ship_0001_rail")).unwrap();
    assert_eq!(record.derived.effects, vec!["overcharge".to_string()]);
}

#[test]
fn upgrade_reaches_mounts_on_exploration_ships() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let mut scout = recon_ship("scout_0009", glam::Vec2::ZERO, Specialization::Anomaly);
    scout.weapons = combat_ship("scout_0009", glam::Vec2::ZERO).weapons;
    state.register_ship(scout, &content).unwrap();
    assert!(state.exploration.contains(&ship_id("scout_0009")));

    let cmd = upgrade_command(&state, "scout_0009_rail", "rail_capacitors");
    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let stats = mount_stats(&state, "scout_0009");
    assert!((stats.damage - 12.0).abs() < 1e-4);
    assert!((stats.energy_cost - 5.5).abs() < 1e-4);
}

#[test]
fn upgraded_weapon_fires_harder() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let cmd = upgrade_command(&state, "ship_0001_rail", "rail_capacitors");
    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let cmd = attack_command(&state, "ship_0001", "ship_0101");
    let events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let damage = events.iter().find_map(|e| match &e.event {
        Event::WeaponFired { damage, .. } => Some(*damage),
        _ => None,
    });
    assert!((damage.unwrap() - 12.0).abs() < 1e-4);
}

#[test]
fn shots_grant_weapon_experience() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let cmd = attack_command(&state, "ship_0001", "ship_0101");
    let mut events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);
    events.extend(run_ticks(&mut state, &content, &mut rng, 2));

    let record = state.armory.record(&weapon("ship_0001_rail")).unwrap();
    assert!((record.experience - 2.0).abs() < 1e-5, "two shots in three ticks");
    let gained = events
        .iter()
        .filter(|e| matches!(&e.event, Event::ExperienceGained { .. }))
        .count();
    assert_eq!(gained, 2);
}

#[test]
fn locked_upgrade_is_refused_without_events() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();

    let cmd = upgrade_command(&state, "ship_0001_rail", "rail_focusing");
    let events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    assert!(!events.iter().any(|e| matches!(&e.event, Event::UpgradeApplied { .. })));
    assert!((mount_stats(&state, "ship_0001").range - 200.0).abs() < 1e-5);
}

#[test]
fn experience_unlocks_upgrade_path_and_specialization() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();

    let cmds = [
        upgrade_command(&state, "ship_0002_rail", "rail_capacitors"),
        experience_command(&state, "ship_0002_rail", 50.0),
        upgrade_command(&state, "ship_0002_rail", "rail_focusing"),
    ];
    tick(&mut state, &cmds, &content, &mut rng, DT, EventLevel::Normal);
    assert!((mount_stats(&state, "ship_0002").range - 250.0).abs() < 1e-3);

    let cmd = experience_command(&state, "ship_0002_rail", 50.0);
    let events = tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    assert!(events.iter().any(|e| matches!(
        &e.event,
        Event::SpecializationUnlocked { specialization_id, .. } if specialization_id.0 == "rail_sniper"
    )));
    assert!((mount_stats(&state, "ship_0002").range - 275.0).abs() < 1e-3);
    let record = state.armory.record(&weapon("ship_0002_rail")).unwrap();
    assert_eq!(
        record.derived.special.get("pierce"),
        Some(&SpecialValue::Number(2.0)),
        "later upgrade wins"
    );
}

#[test]
fn recomputing_twice_yields_identical_stats() {
    let content = test_content();
    let tree = content.upgrade_trees.get(&WeaponCategory::Railgun);
    let applied = [upgrade("rail_capacitors"), upgrade("rail_cooling")];
    let base = crate::test_fixtures::railgun_stats();

    let first = derive_stats(&base, tree, &applied, &[]);
    let second = derive_stats(&base, tree, &applied, &[]);

    assert_eq!(first, second);
    assert!((first.stats.cooldown - 1.6).abs() < 1e-5);
}

#[test]
fn foreign_weapon_commands_are_dropped() {
    let content = test_content();
    let mut state = test_state(&content);
    let mut rng = make_rng();
    let cmd = upgrade_command(&state, "ship_0101_rail", "rail_capacitors");

    tick(&mut state, &[cmd], &content, &mut rng, DT, EventLevel::Normal);

    let record = state.armory.record(&weapon("ship_0101_rail")).unwrap();
    assert!(record.applied.is_empty());
}

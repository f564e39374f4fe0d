//! Content validation tests for the shipped `content/*.json` files.
//!
//! These load the real content directory and check:
//! 1. Schema validity and cross-references (via `load_content`)
//! 2. Range constraints on stats and modifiers
//! 3. Playability: both sides field ships, every weapon has an upgrade path

use fleet_core::{GameContent, ShipCategory, Specialization, WeaponCategory};
use fleet_world::{build_initial_state, load_content, rng_for};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Integration tests run from the crate directory, so go up two levels.
fn content_dir() -> String {
    let manifest = std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set");
    format!("{manifest}/../../content")
}

fn load_test_content() -> &'static GameContent {
    static CONTENT: OnceLock<GameContent> = OnceLock::new();
    CONTENT.get_or_init(|| load_content(&content_dir()).expect("shipped content should load"))
}

#[test]
fn content_loads_successfully() {
    let content = load_test_content();
    assert!(!content.content_version.is_empty());
}

#[test]
fn weapon_stats_are_positive() {
    let content = load_test_content();
    for template in &content.ship_templates {
        for loadout in &template.weapons {
            let s = loadout.stats;
            assert!(
                s.damage > 0.0 && s.range > 0.0 && s.cooldown > 0.0,
                "template '{}' has a weapon with non-positive damage/range/cooldown",
                template.id,
            );
            assert!(
                (0.0..=1.0).contains(&s.accuracy),
                "template '{}' weapon accuracy {} outside [0, 1]",
                template.id,
                s.accuracy,
            );
        }
    }
}

#[test]
fn modifiers_are_positive_multipliers() {
    let content = load_test_content();
    for (category, tree) in &content.upgrade_trees {
        let all = tree
            .upgrades
            .iter()
            .map(|u| (u.id.0.as_str(), u.modifiers))
            .chain(tree.specializations.iter().map(|s| (s.id.0.as_str(), s.modifiers)));
        for (id, m) in all {
            for value in [m.damage, m.range, m.cooldown, m.accuracy, m.energy_cost]
                .into_iter()
                .flatten()
            {
                assert!(value > 0.0, "{category:?} '{id}' has non-positive modifier {value}");
            }
        }
    }
}

#[test]
fn every_mounted_weapon_category_has_a_tree() {
    let content = load_test_content();
    let mounted: HashSet<WeaponCategory> = content
        .ship_templates
        .iter()
        .flat_map(|t| t.weapons.iter().map(|w| w.category))
        .collect();
    for category in mounted {
        assert!(
            content.upgrade_trees.contains_key(&category),
            "{category:?} is mounted but has no upgrade tree",
        );
    }
}

#[test]
fn each_tree_has_an_entry_upgrade() {
    let content = load_test_content();
    for (category, tree) in &content.upgrade_trees {
        assert!(
            tree.upgrades
                .iter()
                .any(|u| u.requires.is_empty() && u.required_experience <= 0.0),
            "{category:?} tree has no upgrade available from the start",
        );
    }
}

#[test]
fn templates_cover_every_survey_specialization() {
    let content = load_test_content();
    let covered: HashSet<Specialization> = content
        .ship_templates
        .iter()
        .filter(|t| t.category != ShipCategory::Combat)
        .map(|t| t.survey.specialization)
        .collect();
    for spec in Specialization::ALL {
        assert!(covered.contains(&spec), "no template specializes in {spec:?}");
    }
}

#[test]
fn world_has_at_least_two_factions_with_warships() {
    let content = load_test_content();
    let state = build_initial_state(content, 1, &mut rng_for(1)).unwrap();
    let armed_factions: HashSet<String> = state
        .combat
        .roster()
        .registry()
        .iter()
        .map(|ship| ship.faction.0.clone())
        .collect();
    assert!(armed_factions.len() >= 2, "need opponents: {armed_factions:?}");
    assert_eq!(
        state.exploration.sectors().len(),
        content.world.sector_count as usize
    );
}

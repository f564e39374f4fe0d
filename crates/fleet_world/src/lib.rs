//! Content loading and world generation shared between fleet_cli and fleet_daemon.

use anyhow::{Context, Result};
use fleet_core::{
    CombatStats, Constants, FleetState, GameContent, PrincipalId, SectorId, Ship, ShipId,
    ShipStatus, ShipTemplate, UpgradeTree, WeaponCategory, WeaponId, WeaponMount, WorldDef,
};
use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Ships of one fleet spawn within this distance of the fleet origin.
const SPAWN_SPREAD: f32 = 60.0;

#[derive(Deserialize)]
struct UpgradesFile {
    content_version: String,
    trees: HashMap<WeaponCategory, UpgradeTree>,
}

#[derive(Deserialize)]
struct TemplatesFile {
    templates: Vec<ShipTemplate>,
}

/// Validates cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a fleet entry naming an unknown template, an upgrade
/// prerequisite missing from its tree, or evasion thresholds in the wrong order.
pub fn validate_content(content: &GameContent) {
    validate_constants(&content.constants);

    let mut template_ids: HashSet<&str> = HashSet::new();
    for template in &content.ship_templates {
        assert!(!template.id.is_empty(), "ship template with empty id");
        assert!(
            template_ids.insert(template.id.as_str()),
            "ship template '{}' is defined twice",
            template.id,
        );
        assert!(
            template.stats.max_health > 0.0,
            "ship template '{}' has non-positive max_health",
            template.id,
        );
    }

    for (category, tree) in &content.upgrade_trees {
        let upgrade_ids: HashSet<&str> = tree.upgrades.iter().map(|u| u.id.0.as_str()).collect();
        assert_eq!(
            upgrade_ids.len(),
            tree.upgrades.len(),
            "{category:?} upgrade tree has duplicate upgrade ids",
        );
        for upgrade in &tree.upgrades {
            for required in &upgrade.requires {
                assert!(
                    upgrade_ids.contains(required.0.as_str()),
                    "{category:?} upgrade '{}' requires '{}', which is not in the tree",
                    upgrade.id,
                    required,
                );
            }
        }
        for spec in &tree.specializations {
            for required in &spec.required_upgrades {
                assert!(
                    upgrade_ids.contains(required.0.as_str()),
                    "{category:?} specialization '{}' requires '{}', which is not in the tree",
                    spec.id,
                    required,
                );
            }
        }
    }

    validate_world(&content.world, &template_ids);
}

fn validate_constants(c: &Constants) {
    assert!(
        (0.0..=1.0).contains(&c.retreat_health_fraction),
        "retreat_health_fraction must lie in [0, 1], got {}",
        c.retreat_health_fraction,
    );
    assert!(
        c.caution_threshold < c.evasion_threshold,
        "caution_threshold ({}) must be below evasion_threshold ({})",
        c.caution_threshold,
        c.evasion_threshold,
    );
    assert!(
        c.resource_amount_min <= c.resource_amount_max,
        "resource_amount_min ({}) exceeds resource_amount_max ({})",
        c.resource_amount_min,
        c.resource_amount_max,
    );
    assert!(
        c.combat_task_rate > 0.0 && c.scan_rate > 0.0 && c.evade_rate > 0.0,
        "task rates must be positive",
    );
}

fn validate_world(world: &WorldDef, template_ids: &HashSet<&str>) {
    assert!(
        world.sector_extent > 0.0,
        "world sector_extent must be positive, got {}",
        world.sector_extent,
    );
    for fleet in &world.fleets {
        for entry in &fleet.ships {
            assert!(
                template_ids.contains(entry.template.as_str()),
                "fleet '{}' references unknown ship template '{}'",
                fleet.faction,
                entry.template,
            );
        }
    }
}

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let text = std::fs::read_to_string(dir.join(file)).with_context(|| format!("reading {file}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {file}"))
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = read_json(dir, "constants.json")?;
    let upgrades: UpgradesFile = read_json(dir, "upgrades.json")?;
    let templates: TemplatesFile = read_json(dir, "ship_templates.json")?;
    let world: WorldDef = read_json(dir, "world.json")?;
    let content = GameContent {
        content_version: upgrades.content_version,
        constants,
        upgrade_trees: upgrades.trees,
        ship_templates: templates.templates,
        world,
    };
    validate_content(&content);
    Ok(content)
}

/// Loads a JSON snapshot previously written from a `FleetState`.
pub fn load_state(path: &str) -> Result<FleetState> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading state file {path}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing state file {path}"))
}

pub fn rng_for(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// A fresh ship built from `template`. Weapon ids are `<ship_id>_w<n>`.
pub fn ship_from_template(template: &ShipTemplate, id: ShipId, faction: PrincipalId, position: Vec2) -> Ship {
    let weapons = template
        .weapons
        .iter()
        .enumerate()
        .map(|(index, loadout)| WeaponMount {
            weapon_id: WeaponId(format!("{id}_w{index}")),
            category: loadout.category,
            stats: loadout.stats,
            state: fleet_core::WeaponState::default(),
        })
        .collect();
    Ship {
        name: format!("{} {}", template.name, id),
        id,
        faction,
        category: template.category,
        status: ShipStatus::Idle,
        position,
        stats: template.stats,
        weapons,
        formation: None,
        tech_bonuses: template.tech_bonuses,
        combat_stats: CombatStats::default(),
        sensors: template.sensors,
        survey: template.survey,
    }
}

/// Scatter the world's sectors and spawn every fleet around its origin.
pub fn build_initial_state(content: &GameContent, seed: u64, rng: &mut impl Rng) -> Result<FleetState> {
    let mut state = FleetState::new(seed, content);
    let world = &content.world;
    let clock = state.clock();
    for index in 0..world.sector_count {
        let position = Vec2::new(
            rng.gen_range(-world.sector_extent..=world.sector_extent),
            rng.gen_range(-world.sector_extent..=world.sector_extent),
        );
        state
            .exploration
            .add_sector(SectorId(format!("sector_{index:04}")), position, clock);
    }

    let templates: HashMap<&str, &ShipTemplate> = content
        .ship_templates
        .iter()
        .map(|t| (t.id.as_str(), t))
        .collect();
    let mut next_ship = 1_u32;
    for fleet in &world.fleets {
        for entry in &fleet.ships {
            let template = templates
                .get(entry.template.as_str())
                .with_context(|| format!("unknown ship template '{}'", entry.template))?;
            for _ in 0..entry.count {
                let id = ShipId(format!("ship_{next_ship:04}"));
                next_ship += 1;
                let offset = Vec2::new(
                    rng.gen_range(-SPAWN_SPREAD..=SPAWN_SPREAD),
                    rng.gen_range(-SPAWN_SPREAD..=SPAWN_SPREAD),
                );
                let ship = ship_from_template(template, id.clone(), fleet.faction.clone(), fleet.origin + offset);
                state
                    .register_ship(ship, content)
                    .with_context(|| format!("registering {id}"))?;
            }
        }
    }
    state.drain_events();
    Ok(state)
}

//! Shared test fixtures for `fleet_core` and downstream crates.
//!
//! `base_content()` provides complete content (constants, railgun and machine
//! gun upgrade trees, three ship templates, a small two-faction world).
//! `base_state()` registers two player frigates, one hostile frigate and two
//! player scouts, and records two sectors far from the fighting.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smallvec::smallvec;

use crate::{
    Clock, Constants, DamageModel, FleetDef, FleetEntry, FleetState, GameContent, PrincipalId,
    SectorId, SensorProfile, Ship, ShipCategory, ShipId, ShipStats, ShipStatus, ShipTemplate,
    SpecialValue, Specialization, SpecializationDef, SpecializationId, StatModifiers,
    SurveyProfile, TechBonuses, Threat, ThreatId, UpgradeDef, UpgradeId, UpgradeTree,
    WeaponCategory, WeaponId, WeaponLoadout, WeaponMount, WeaponStats, WorldDef,
};

pub fn player() -> PrincipalId {
    PrincipalId("principal_player".to_string())
}

pub fn hostile() -> PrincipalId {
    PrincipalId("principal_hostile".to_string())
}

pub fn clock_at(tick: u64) -> Clock {
    Clock {
        tick,
        time: tick as f64,
    }
}

pub fn base_constants() -> Constants {
    Constants {
        retreat_health_fraction: 0.3,
        shield_regen_per_sec: 2.0,
        energy_regen_per_sec: 1.0,
        combat_task_rate: 0.05,
        scan_rate: 0.1,
        evade_rate: 0.5,
        evasion_threshold: 0.7,
        caution_threshold: 0.3,
        evade_safe_distance: 300.0,
        evade_priority: 10,
        coordinated_scan_priority: 5,
        scan_experience: 10.0,
        scan_accuracy_cap: 0.95,
        weapon_experience_per_shot: 1.0,
        sector_heat_half_life_secs: 600.0,
        unexplored_sector_heat: 4.0,
        threat_damage_reference: 100.0,
        resource_amount_min: 50.0,
        resource_amount_max: 500.0,
        damage_model: DamageModel::AttackerLocal,
    }
}

pub fn railgun_stats() -> WeaponStats {
    WeaponStats {
        damage: 10.0,
        range: 200.0,
        cooldown: 2.0,
        accuracy: 0.8,
        energy_cost: 5.0,
    }
}

pub fn machine_gun_stats() -> WeaponStats {
    WeaponStats {
        damage: 2.0,
        range: 80.0,
        cooldown: 0.5,
        accuracy: 0.6,
        energy_cost: 1.0,
    }
}

fn modifiers() -> StatModifiers {
    StatModifiers::default()
}

fn railgun_tree() -> UpgradeTree {
    UpgradeTree {
        upgrades: vec![
            UpgradeDef {
                id: UpgradeId("rail_capacitors".to_string()),
                name: "Overcharged Capacitors".to_string(),
                required_experience: 0.0,
                requires: vec![],
                modifiers: StatModifiers {
                    damage: Some(1.2),
                    energy_cost: Some(1.1),
                    ..modifiers()
                },
                effects: vec!["overcharge".to_string()],
                special: BTreeMap::from([
                    ("pierce".to_string(), SpecialValue::Number(1.0)),
                    ("overheat".to_string(), SpecialValue::Flag(true)),
                ]),
            },
            UpgradeDef {
                id: UpgradeId("rail_focusing".to_string()),
                name: "Focusing Rails".to_string(),
                required_experience: 50.0,
                requires: vec![UpgradeId("rail_capacitors".to_string())],
                modifiers: StatModifiers {
                    range: Some(1.25),
                    accuracy: Some(1.1),
                    ..modifiers()
                },
                effects: vec!["focused_beam".to_string()],
                special: BTreeMap::from([("pierce".to_string(), SpecialValue::Number(2.0))]),
            },
            UpgradeDef {
                id: UpgradeId("rail_cooling".to_string()),
                name: "Cryo Cooling".to_string(),
                required_experience: 20.0,
                requires: vec![],
                modifiers: StatModifiers {
                    cooldown: Some(0.8),
                    ..modifiers()
                },
                effects: vec![],
                special: BTreeMap::new(),
            },
        ],
        specializations: vec![SpecializationDef {
            id: SpecializationId("rail_sniper".to_string()),
            name: "Sniper".to_string(),
            required_experience: 100.0,
            required_upgrades: vec![UpgradeId("rail_focusing".to_string())],
            modifiers: StatModifiers {
                range: Some(1.1),
                ..modifiers()
            },
        }],
    }
}

fn machine_gun_tree() -> UpgradeTree {
    UpgradeTree {
        upgrades: vec![
            UpgradeDef {
                id: UpgradeId("mg_extended_belt".to_string()),
                name: "Extended Belt".to_string(),
                required_experience: 0.0,
                requires: vec![],
                modifiers: StatModifiers {
                    cooldown: Some(0.75),
                    ..modifiers()
                },
                effects: vec![],
                special: BTreeMap::new(),
            },
            UpgradeDef {
                id: UpgradeId("mg_tracers".to_string()),
                name: "Tracer Rounds".to_string(),
                required_experience: 10.0,
                requires: vec![],
                modifiers: StatModifiers {
                    accuracy: Some(1.15),
                    ..modifiers()
                },
                effects: vec!["tracers".to_string()],
                special: BTreeMap::new(),
            },
        ],
        specializations: vec![SpecializationDef {
            id: SpecializationId("mg_suppressor".to_string()),
            name: "Suppressor".to_string(),
            required_experience: 30.0,
            required_upgrades: vec![],
            modifiers: StatModifiers {
                damage: Some(1.1),
                ..modifiers()
            },
        }],
    }
}

fn frigate_stats() -> ShipStats {
    ShipStats {
        health: 100.0,
        max_health: 100.0,
        shield: 50.0,
        max_shield: 50.0,
        energy: 100.0,
        max_energy: 100.0,
        speed: 20.0,
        turn_rate: 1.0,
    }
}

fn scout_stats() -> ShipStats {
    ShipStats {
        health: 60.0,
        max_health: 60.0,
        shield: 20.0,
        max_shield: 20.0,
        energy: 80.0,
        max_energy: 80.0,
        speed: 30.0,
        turn_rate: 2.0,
    }
}

fn templates() -> Vec<ShipTemplate> {
    vec![
        ShipTemplate {
            id: "frigate".to_string(),
            name: "Frigate".to_string(),
            category: ShipCategory::Combat,
            stats: frigate_stats(),
            weapons: vec![WeaponLoadout {
                category: WeaponCategory::Railgun,
                stats: railgun_stats(),
            }],
            sensors: SensorProfile::default(),
            survey: SurveyProfile::default(),
            tech_bonuses: TechBonuses::default(),
        },
        ShipTemplate {
            id: "scout".to_string(),
            name: "Scout".to_string(),
            category: ShipCategory::Recon,
            stats: scout_stats(),
            weapons: vec![],
            sensors: SensorProfile::default(),
            survey: SurveyProfile::default(),
            tech_bonuses: TechBonuses::default(),
        },
        ShipTemplate {
            id: "prospector".to_string(),
            name: "Prospector".to_string(),
            category: ShipCategory::Mining,
            stats: scout_stats(),
            weapons: vec![],
            sensors: SensorProfile {
                range: 300.0,
                accuracy: 0.7,
            },
            survey: SurveyProfile {
                specialization: Specialization::Resource,
                ..SurveyProfile::default()
            },
            tech_bonuses: TechBonuses::default(),
        },
    ]
}

/// Complete content with fast rates for tests.
pub fn base_content() -> GameContent {
    GameContent {
        content_version: "test".to_string(),
        constants: base_constants(),
        upgrade_trees: HashMap::from([
            (WeaponCategory::Railgun, railgun_tree()),
            (WeaponCategory::MachineGun, machine_gun_tree()),
        ]),
        ship_templates: templates(),
        world: WorldDef {
            sector_count: 6,
            sector_extent: 2000.0,
            fleets: vec![
                FleetDef {
                    faction: player(),
                    origin: Vec2::ZERO,
                    ships: vec![
                        FleetEntry {
                            template: "frigate".to_string(),
                            count: 3,
                        },
                        FleetEntry {
                            template: "scout".to_string(),
                            count: 2,
                        },
                    ],
                },
                FleetDef {
                    faction: hostile(),
                    origin: Vec2::new(1500.0, 0.0),
                    ships: vec![FleetEntry {
                        template: "frigate".to_string(),
                        count: 2,
                    }],
                },
            ],
        },
    }
}

/// Player frigate with a single railgun mount `<id>_rail`.
pub fn combat_ship(id: &str, position: Vec2) -> Ship {
    Ship {
        id: ShipId(id.to_string()),
        name: format!("Frigate {id}"),
        faction: player(),
        category: ShipCategory::Combat,
        status: ShipStatus::Idle,
        position,
        stats: frigate_stats(),
        weapons: smallvec![WeaponMount {
            weapon_id: WeaponId(format!("{id}_rail")),
            category: WeaponCategory::Railgun,
            stats: railgun_stats(),
            state: crate::WeaponState::default(),
        }],
        formation: None,
        tech_bonuses: TechBonuses::default(),
        combat_stats: crate::CombatStats::default(),
        sensors: SensorProfile::default(),
        survey: SurveyProfile::default(),
    }
}

/// Unarmed player scout.
pub fn recon_ship(id: &str, position: Vec2, specialization: Specialization) -> Ship {
    Ship {
        id: ShipId(id.to_string()),
        name: format!("Scout {id}"),
        faction: player(),
        category: ShipCategory::Recon,
        status: ShipStatus::Idle,
        position,
        stats: scout_stats(),
        weapons: smallvec![],
        formation: None,
        tech_bonuses: TechBonuses::default(),
        combat_stats: crate::CombatStats::default(),
        sensors: SensorProfile::default(),
        survey: SurveyProfile {
            specialization,
            ..SurveyProfile::default()
        },
    }
}

pub fn threat_at(id: &str, position: Vec2, severity: f32) -> Threat {
    Threat {
        id: ThreatId(id.to_string()),
        position,
        severity,
    }
}

/// Two player frigates near the origin, a hostile frigate 150 units east,
/// two player scouts far north and two unexplored sectors.
pub fn base_state(content: &GameContent) -> FleetState {
    let mut state = FleetState::new(42, content);
    let mut enemy = combat_ship("ship_0101", Vec2::new(150.0, 0.0));
    enemy.faction = hostile();
    let ships = [
        combat_ship("ship_0001", Vec2::ZERO),
        combat_ship("ship_0002", Vec2::new(0.0, 40.0)),
        enemy,
        recon_ship("scout_0001", Vec2::new(0.0, 3000.0), Specialization::Mapping),
        recon_ship("scout_0002", Vec2::new(40.0, 3000.0), Specialization::Anomaly),
    ];
    for ship in ships {
        state
            .register_ship(ship, content)
            .expect("fixture ships register cleanly");
    }
    let clock = state.clock();
    state
        .exploration
        .add_sector(SectorId("sector_0001".to_string()), Vec2::new(500.0, 3500.0), clock);
    state
        .exploration
        .add_sector(SectorId("sector_0002".to_string()), Vec2::new(-500.0, 3500.0), clock);
    state.drain_events();
    state
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

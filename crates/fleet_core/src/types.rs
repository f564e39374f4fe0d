//! Type definitions for `fleet_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::combat::CombatManager;
use crate::exploration::ExplorationManager;
use crate::upgrades::UpgradeLedger;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(ShipId);
string_id!(TaskId);
string_id!(FormationId);
string_id!(SectorId);
string_id!(AnomalyId);
string_id!(WeaponId);
string_id!(UpgradeId);
string_id!(SpecializationId);
string_id!(ScanId);
string_id!(ThreatId);
string_id!(CommandId);
string_id!(EventId);
string_id!(PrincipalId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

/// Returned when an external label does not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognised {kind} label '{label}'")]
pub struct UnknownLabel {
    pub kind: &'static str,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipCategory {
    Combat,
    Recon,
    Mining,
}

impl FromStr for ShipCategory {
    type Err = UnknownLabel;

    /// Normalises the loose hull labels used by spawners and UI payloads.
    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().as_str() {
            "combat" | "warship" | "fighter" | "frigate" | "destroyer" | "cruiser"
            | "battleship" | "carrier" => Ok(Self::Combat),
            "recon" | "scout" | "explorer" | "surveyor" => Ok(Self::Recon),
            "mining" | "miner" | "harvester" | "prospector" => Ok(Self::Mining),
            _ => Err(UnknownLabel {
                kind: "ship category",
                label: label.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipStatus {
    #[default]
    Idle,
    Ready,
    Engaging,
    Patrolling,
    Scanning,
    Investigating,
    Evading,
    Retreating,
    Returning,
    Damaged,
    Disabled,
}

impl ShipStatus {
    /// Whether a queued task may start while the ship is in this status.
    pub fn accepts_tasks(self) -> bool {
        !matches!(self, Self::Retreating | Self::Returning | Self::Disabled)
    }

    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle | Self::Ready)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Engaging => "engaging",
            Self::Patrolling => "patrolling",
            Self::Scanning => "scanning",
            Self::Investigating => "investigating",
            Self::Evading => "evading",
            Self::Retreating => "retreating",
            Self::Returning => "returning",
            Self::Damaged => "damaged",
            Self::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShipStatus {
    type Err = UnknownLabel;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        match label.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "idle" => Ok(Self::Idle),
            "ready" | "standby" => Ok(Self::Ready),
            "engaging" | "attacking" | "in_combat" => Ok(Self::Engaging),
            "patrolling" | "patrol" => Ok(Self::Patrolling),
            "scanning" | "exploring" | "surveying" => Ok(Self::Scanning),
            "investigating" => Ok(Self::Investigating),
            "evading" => Ok(Self::Evading),
            "retreating" | "withdrawing" => Ok(Self::Retreating),
            "returning" | "returning_to_base" => Ok(Self::Returning),
            "damaged" => Ok(Self::Damaged),
            "disabled" | "destroyed" => Ok(Self::Disabled),
            _ => Err(UnknownLabel {
                kind: "ship status",
                label: label.to_string(),
            }),
        }
    }
}

/// Survey specialization of an exploration ship.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialization {
    #[default]
    Mapping,
    Anomaly,
    Resource,
}

impl Specialization {
    pub const ALL: [Specialization; 3] = [Self::Mapping, Self::Anomaly, Self::Resource];

    /// Task priority for explore/investigate assignments.
    pub fn priority(self) -> i32 {
        match self {
            Self::Anomaly => 3,
            Self::Resource => 2,
            Self::Mapping => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponCategory {
    MachineGun,
    GaussCannon,
    Railgun,
    Rockets,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponStatus {
    #[default]
    Ready,
    Charging,
    Cooling,
    Disabled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    #[default]
    Normal,
    Debug,
}

// ---------------------------------------------------------------------------
// Ship records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShipStats {
    pub health: f32,
    pub max_health: f32,
    pub shield: f32,
    pub max_shield: f32,
    pub energy: f32,
    pub max_energy: f32,
    pub speed: f32,
    pub turn_rate: f32,
}

impl ShipStats {
    pub fn health_fraction(&self) -> f32 {
        if self.max_health > 0.0 {
            (self.health / self.max_health).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Pull every pool back inside `[0, max]`.
    pub fn clamp_pools(&mut self) {
        self.max_health = self.max_health.max(0.0);
        self.max_shield = self.max_shield.max(0.0);
        self.max_energy = self.max_energy.max(0.0);
        self.health = self.health.clamp(0.0, self.max_health);
        self.shield = self.shield.clamp(0.0, self.max_shield);
        self.energy = self.energy.clamp(0.0, self.max_energy);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage: f32,
    pub range: f32,
    /// Seconds between shots.
    pub cooldown: f32,
    pub accuracy: f32,
    pub energy_cost: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeaponState {
    pub status: WeaponStatus,
    /// Simulation time (seconds) of the last shot.
    pub last_fired: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponMount {
    pub weapon_id: WeaponId,
    pub category: WeaponCategory,
    /// Effective stats as published by the upgrade ledger.
    pub stats: WeaponStats,
    #[serde(default)]
    pub state: WeaponState,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TechBonuses {
    pub weapon_efficiency: f32,
    pub energy_efficiency: f32,
    pub shield_regen: f32,
    pub scan: f32,
    pub sensor: f32,
}

impl Default for TechBonuses {
    fn default() -> Self {
        Self {
            weapon_efficiency: 1.0,
            energy_efficiency: 1.0,
            shield_regen: 1.0,
            scan: 1.0,
            sensor: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatStats {
    pub damage_dealt: f32,
    pub damage_received: f32,
    pub kill_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    pub range: f32,
    pub accuracy: f32,
}

impl Default for SensorProfile {
    fn default() -> Self {
        Self {
            range: 500.0,
            accuracy: 0.8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurveyProfile {
    pub efficiency: f32,
    pub experience: f32,
    pub specialization: Specialization,
}

impl Default for SurveyProfile {
    fn default() -> Self {
        Self {
            efficiency: 1.0,
            experience: 0.0,
            specialization: Specialization::Mapping,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationRole {
    Leader,
    Wing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationMembership {
    pub formation_id: FormationId,
    pub role: FormationRole,
    pub coordination_bonus: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub id: ShipId,
    pub name: String,
    pub faction: PrincipalId,
    pub category: ShipCategory,
    #[serde(default)]
    pub status: ShipStatus,
    pub position: Vec2,
    pub stats: ShipStats,
    #[serde(default)]
    pub weapons: SmallVec<[WeaponMount; 4]>,
    /// Owned by the formation engine; ignored on registration.
    #[serde(default)]
    pub formation: Option<FormationMembership>,
    #[serde(default)]
    pub tech_bonuses: TechBonuses,
    #[serde(default)]
    pub combat_stats: CombatStats,
    #[serde(default)]
    pub sensors: SensorProfile,
    #[serde(default)]
    pub survey: SurveyProfile,
}

impl Ship {
    pub fn coordination_bonus(&self) -> f32 {
        self.formation
            .as_ref()
            .map_or(1.0, |membership| membership.coordination_bonus)
    }

    pub fn max_weapon_range(&self) -> f32 {
        self.weapons
            .iter()
            .map(|mount| mount.stats.range)
            .fold(0.0, f32::max)
    }

    pub fn is_wingman(&self) -> bool {
        matches!(&self.formation, Some(m) if m.role == FormationRole::Wing)
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    Attack,
    Defend,
    Patrol,
    Explore,
    Investigate,
    Evade,
    CoordinatedScan { scan: ScanId },
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Attack => "Attack",
            Self::Defend => "Defend",
            Self::Patrol => "Patrol",
            Self::Explore => "Explore",
            Self::Investigate => "Investigate",
            Self::Evade => "Evade",
            Self::CoordinatedScan { .. } => "CoordinatedScan",
        }
    }

    pub fn is_combat(&self) -> bool {
        matches!(self, Self::Attack | Self::Defend | Self::Patrol)
    }

    /// Tasks during which weapons are allowed to fire at the target.
    pub fn is_hostile(&self) -> bool {
        matches!(self, Self::Attack | Self::Defend)
    }

    /// Ship status while the task is in progress.
    pub fn active_status(&self) -> ShipStatus {
        match self {
            Self::Attack | Self::Defend => ShipStatus::Engaging,
            Self::Patrol => ShipStatus::Patrolling,
            Self::Explore | Self::CoordinatedScan { .. } => ShipStatus::Scanning,
            Self::Investigate => ShipStatus::Investigating,
            Self::Evade => ShipStatus::Evading,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTarget {
    pub id: Option<String>,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormationSnapshot {
    pub formation_id: FormationId,
    pub leader_id: ShipId,
    pub role: FormationRole,
    pub member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub ship_id: ShipId,
    pub kind: TaskKind,
    pub target: TaskTarget,
    pub priority: i32,
    pub assigned_at: f64,
    pub status: TaskStatus,
    pub formation: Option<FormationSnapshot>,
    pub progress: f32,
    pub threat_level: Option<f32>,
    pub specialization: Option<Specialization>,
    /// Damage dealt by the ship while this task was active.
    pub damage_dealt: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Combat { damage_dealt: f32 },
    Survey { sector_id: SectorId, report: ScanReport },
    Evaded { position: Vec2 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Cancelled,
    Retreat,
    ShipLost,
    ShipDisabled,
}

// ---------------------------------------------------------------------------
// Formations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormationKind {
    Offensive,
    Defensive,
    Balanced,
    Exploration,
    Survey,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FormationBonuses {
    pub scan: f32,
    pub detection: f32,
    pub stealth: f32,
    pub coordination: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formation {
    pub id: FormationId,
    pub kind: FormationKind,
    /// Leader first; slot index is the position in this list.
    pub ship_ids: Vec<ShipId>,
    pub leader_id: ShipId,
    pub spacing: f32,
    /// Radians.
    pub facing: f32,
    /// Centroid of the members.
    pub position: Vec2,
    pub bonuses: FormationBonuses,
    pub created_at: f64,
}

// ---------------------------------------------------------------------------
// Sectors and threats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn weight(self) -> f32 {
        match self {
            Self::Low => 1.0,
            Self::Medium => 2.0,
            Self::High => 3.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    GravitationalRift,
    Derelict,
    RadiationBurst,
    SubspaceEcho,
    AncientRelay,
}

impl AnomalyKind {
    pub const ALL: [AnomalyKind; 5] = [
        Self::GravitationalRift,
        Self::Derelict,
        Self::RadiationBurst,
        Self::SubspaceEcho,
        Self::AncientRelay,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: AnomalyId,
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub investigated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Minerals,
    Gas,
    Energy,
    Exotic,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [Self::Minerals, Self::Gas, Self::Energy, Self::Exotic];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDeposit {
    pub kind: ResourceKind,
    pub amount: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub position: Vec2,
    pub explored: bool,
    pub anomalies: Vec<Anomaly>,
    pub resources: Vec<ResourceDeposit>,
    pub habitability: Option<f32>,
    pub last_scanned: Option<f64>,
}

impl Sector {
    pub fn unexplored(id: SectorId, position: Vec2) -> Self {
        Self {
            id,
            position,
            explored: false,
            anomalies: Vec::new(),
            resources: Vec::new(),
            habitability: None,
            last_scanned: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub resources: Vec<ResourceDeposit>,
    pub anomalies: Vec<Anomaly>,
    pub habitability: Option<f32>,
    pub accuracy: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: ThreatId,
    pub position: Vec2,
    /// 0..1
    pub severity: f32,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

/// Tick number and simulation time (seconds) stamped onto events and tasks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Clock {
    pub tick: u64,
    pub time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FleetState {
    pub meta: MetaState,
    pub combat: CombatManager,
    pub exploration: ExplorationManager,
    pub armory: UpgradeLedger,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_by: PrincipalId,
    pub issued_tick: u64,
    pub execute_at_tick: u64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Command {
    RegisterShip {
        ship: Box<Ship>,
    },
    UnregisterShip {
        ship_id: ShipId,
    },
    AssignCombatTask {
        ship_id: ShipId,
        kind: TaskKind,
        target_id: Option<String>,
        position: Vec2,
        formation: Option<FormationId>,
    },
    AssignExplorationTask {
        ship_id: ShipId,
        sector_id: SectorId,
        position: Vec2,
        specialization: Specialization,
    },
    StartCoordinatedScan {
        sector_id: SectorId,
        ship_ids: Vec<ShipId>,
    },
    DistributeExploration {
        sector_ids: Vec<SectorId>,
    },
    CreateFormation {
        kind: FormationKind,
        ship_ids: Vec<ShipId>,
        spacing: f32,
    },
    DisbandFormation {
        formation_id: FormationId,
    },
    Retreat {
        ship_id: ShipId,
    },
    RepairShip {
        ship_id: ShipId,
        amount: f32,
    },
    DamageShip {
        ship_id: ShipId,
        amount: f32,
    },
    ApplyUpgrade {
        weapon_id: WeaponId,
        upgrade_id: UpgradeId,
    },
    AddExperience {
        weapon_id: WeaponId,
        amount: f32,
    },
    ReportThreat {
        threat: Threat,
    },
    ClearThreat {
        threat_id: ThreatId,
    },
    AddSector {
        sector_id: SectorId,
        position: Vec2,
    },
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    pub constants: Constants,
    /// Upgrade trees keyed by weapon category.
    pub upgrade_trees: HashMap<WeaponCategory, UpgradeTree>,
    pub ship_templates: Vec<ShipTemplate>,
    pub world: WorldDef,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpgradeTree {
    pub upgrades: Vec<UpgradeDef>,
    #[serde(default)]
    pub specializations: Vec<SpecializationDef>,
}

/// Multiplicative stat modifiers. `None` leaves the stat untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StatModifiers {
    #[serde(default)]
    pub damage: Option<f32>,
    #[serde(default)]
    pub range: Option<f32>,
    #[serde(default)]
    pub cooldown: Option<f32>,
    #[serde(default)]
    pub accuracy: Option<f32>,
    #[serde(default)]
    pub energy_cost: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpecialValue {
    Flag(bool),
    Number(f32),
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub id: UpgradeId,
    pub name: String,
    #[serde(default)]
    pub required_experience: f32,
    #[serde(default)]
    pub requires: Vec<UpgradeId>,
    #[serde(default)]
    pub modifiers: StatModifiers,
    #[serde(default)]
    pub effects: Vec<String>,
    #[serde(default)]
    pub special: BTreeMap<String, SpecialValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecializationDef {
    pub id: SpecializationId,
    pub name: String,
    pub required_experience: f32,
    #[serde(default)]
    pub required_upgrades: Vec<UpgradeId>,
    #[serde(default)]
    pub modifiers: StatModifiers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponLoadout {
    pub category: WeaponCategory,
    pub stats: WeaponStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipTemplate {
    pub id: String,
    pub name: String,
    pub category: ShipCategory,
    pub stats: ShipStats,
    #[serde(default)]
    pub weapons: Vec<WeaponLoadout>,
    #[serde(default)]
    pub sensors: SensorProfile,
    #[serde(default)]
    pub survey: SurveyProfile,
    #[serde(default)]
    pub tech_bonuses: TechBonuses,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldDef {
    pub sector_count: u32,
    /// Sectors are scattered uniformly in `[-extent, extent]²`.
    pub sector_extent: f32,
    pub fleets: Vec<FleetDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetDef {
    pub faction: PrincipalId,
    pub origin: Vec2,
    pub ships: Vec<FleetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetEntry {
    pub template: String,
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageModel {
    /// Shots only update the attacker's statistics.
    #[default]
    AttackerLocal,
    /// Shots also reduce the shield and health of registered targets.
    Duplex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    /// Health fraction below which a ship is forced to retreat.
    pub retreat_health_fraction: f32,
    pub shield_regen_per_sec: f32,
    pub energy_regen_per_sec: f32,
    /// Base progress per second for combat tasks.
    pub combat_task_rate: f32,
    /// Base progress per second for explore/investigate and coordinated scans.
    pub scan_rate: f32,
    pub evade_rate: f32,
    pub evasion_threshold: f32,
    pub caution_threshold: f32,
    pub evade_safe_distance: f32,
    pub evade_priority: i32,
    pub coordinated_scan_priority: i32,
    pub scan_experience: f32,
    pub scan_accuracy_cap: f32,
    pub weapon_experience_per_shot: f32,
    pub sector_heat_half_life_secs: f32,
    pub unexplored_sector_heat: f32,
    /// Summed weapon damage that makes a hostile a full-severity threat.
    pub threat_damage_reference: f32,
    pub resource_amount_min: f32,
    pub resource_amount_max: f32,
    #[serde(default)]
    pub damage_model: DamageModel,
}

//! `fleet_core`: deterministic fleet simulation.
//!
//! Combat and exploration managers over a shared roster model, a formation
//! engine, and the weapon upgrade ledger. No IO, no network. All randomness
//! via the passed-in Rng.

pub mod combat;
mod commands;
mod engine;
pub mod events;
pub mod exploration;
pub mod formation;
mod id;
pub mod registry;
pub mod roster;
pub mod tasks;
mod types;
pub mod upgrades;

pub use combat::{CombatManager, CombatReport, Shot};
pub use engine::tick;
pub use events::{Event, EventBus, EventEnvelope, SubscriptionId};
pub use exploration::{Assignment, ExplorationManager};
pub use id::generate_uuid;
pub use registry::RegistryError;
pub use upgrades::{derive_stats, DerivedStats, UpgradeLedger, WeaponRecord};
pub use types::*;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

#[cfg(test)]
mod tests;

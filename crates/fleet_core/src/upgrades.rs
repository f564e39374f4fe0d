//! Weapon progression: experience, upgrades and specializations.
//!
//! Derived stats are always rebuilt from the weapon's base stats and its
//! applied upgrade ids, never patched in place.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::events::{EventChannel, EventSource};
use crate::{
    Clock, Event, EventEnvelope, GameContent, SpecialValue, SpecializationId, StatModifiers,
    SubscriptionId, UpgradeDef, UpgradeId, UpgradeTree, WeaponCategory, WeaponId, WeaponStats,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub stats: WeaponStats,
    /// Effects of applied upgrades, in application order.
    pub effects: Vec<String>,
    pub special: BTreeMap<String, SpecialValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponRecord {
    pub weapon_id: WeaponId,
    pub category: WeaponCategory,
    pub base: WeaponStats,
    /// Ordered, duplicate-free.
    pub applied: Vec<UpgradeId>,
    pub experience: f32,
    pub specializations: Vec<SpecializationId>,
    pub derived: DerivedStats,
}

impl StatModifiers {
    pub fn apply(&self, stats: &mut WeaponStats) {
        if let Some(m) = self.damage {
            stats.damage *= m;
        }
        if let Some(m) = self.range {
            stats.range *= m;
        }
        if let Some(m) = self.cooldown {
            stats.cooldown *= m;
        }
        if let Some(m) = self.accuracy {
            stats.accuracy *= m;
        }
        if let Some(m) = self.energy_cost {
            stats.energy_cost *= m;
        }
    }
}

/// Base stats × every applied upgrade × every unlocked specialization.
/// Effects concatenate; `special` maps merge with later upgrades winning.
pub fn derive_stats(
    base: &WeaponStats,
    tree: Option<&UpgradeTree>,
    applied: &[UpgradeId],
    specializations: &[SpecializationId],
) -> DerivedStats {
    let mut derived = DerivedStats {
        stats: *base,
        effects: Vec::new(),
        special: BTreeMap::new(),
    };
    let Some(tree) = tree else {
        return derived;
    };
    for upgrade_id in applied {
        let Some(def) = tree.upgrades.iter().find(|u| &u.id == upgrade_id) else {
            continue;
        };
        def.modifiers.apply(&mut derived.stats);
        derived.effects.extend(def.effects.iter().cloned());
        for (key, value) in &def.special {
            derived.special.insert(key.clone(), value.clone());
        }
    }
    for spec_id in specializations {
        if let Some(def) = tree.specializations.iter().find(|s| &s.id == spec_id) {
            def.modifiers.apply(&mut derived.stats);
        }
    }
    derived
}

fn is_unlocked(record: &WeaponRecord, def: &UpgradeDef) -> bool {
    record.experience >= def.required_experience
        && def.requires.iter().all(|req| record.applied.contains(req))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpgradeLedger {
    weapons: HashMap<WeaponId, WeaponRecord>,
    channel: EventChannel,
}

impl Default for UpgradeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UpgradeLedger {
    pub fn new() -> Self {
        Self {
            weapons: HashMap::new(),
            channel: EventChannel::new(EventSource::Armory),
        }
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EventEnvelope) + Send + 'static,
    {
        self.channel.bus_mut().subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.bus_mut().unsubscribe(id)
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.channel.bus_mut().drain()
    }

    pub fn record(&self, weapon_id: &WeaponId) -> Option<&WeaponRecord> {
        self.weapons.get(weapon_id)
    }

    /// Effective stats for a tracked weapon.
    pub fn stats(&self, weapon_id: &WeaponId) -> Option<WeaponStats> {
        self.weapons.get(weapon_id).map(|record| record.derived.stats)
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Start tracking a weapon. Returns false if it is already tracked.
    pub fn track(
        &mut self,
        weapon_id: &WeaponId,
        category: WeaponCategory,
        base: WeaponStats,
        content: &GameContent,
    ) -> bool {
        if self.weapons.contains_key(weapon_id) {
            return false;
        }
        let derived = derive_stats(&base, content.upgrade_trees.get(&category), &[], &[]);
        self.weapons.insert(
            weapon_id.clone(),
            WeaponRecord {
                weapon_id: weapon_id.clone(),
                category,
                base,
                applied: Vec::new(),
                experience: 0.0,
                specializations: Vec::new(),
                derived,
            },
        );
        true
    }

    /// Upgrades the weapon could take right now, in tree order.
    pub fn available_upgrades<'c>(&self, weapon_id: &WeaponId, content: &'c GameContent) -> Vec<&'c UpgradeDef> {
        let Some(record) = self.weapons.get(weapon_id) else {
            return Vec::new();
        };
        let Some(tree) = content.upgrade_trees.get(&record.category) else {
            return Vec::new();
        };
        tree.upgrades
            .iter()
            .filter(|def| !record.applied.contains(&def.id) && is_unlocked(record, def))
            .collect()
    }

    /// False for unknown weapons or upgrades, locked upgrades and repeats.
    pub fn apply_upgrade(
        &mut self,
        weapon_id: &WeaponId,
        upgrade_id: &UpgradeId,
        content: &GameContent,
        clock: Clock,
    ) -> bool {
        let Some(record) = self.weapons.get_mut(weapon_id) else {
            tracing::debug!(%weapon_id, "upgrade ignored: untracked weapon");
            return false;
        };
        let Some(def) = content
            .upgrade_trees
            .get(&record.category)
            .and_then(|tree| tree.upgrades.iter().find(|u| &u.id == upgrade_id))
        else {
            tracing::debug!(%weapon_id, %upgrade_id, "upgrade ignored: not in tree");
            return false;
        };
        if record.applied.contains(upgrade_id) || !is_unlocked(record, def) {
            tracing::debug!(%weapon_id, %upgrade_id, "upgrade ignored: locked or already applied");
            return false;
        }
        record.applied.push(upgrade_id.clone());
        tracing::info!(%weapon_id, %upgrade_id, "upgrade applied");
        self.channel.emit(
            clock,
            Event::UpgradeApplied {
                weapon_id: weapon_id.clone(),
                upgrade_id: upgrade_id.clone(),
            },
        );
        self.unlock_specializations(weapon_id, content, clock);
        self.recompute(weapon_id, content, clock);
        true
    }

    /// Non-positive amounts are ignored.
    pub fn add_experience(&mut self, weapon_id: &WeaponId, amount: f32, content: &GameContent, clock: Clock) -> bool {
        if amount.is_nan() || amount <= 0.0 {
            return false;
        }
        let Some(record) = self.weapons.get_mut(weapon_id) else {
            return false;
        };
        record.experience += amount;
        let total = record.experience;
        self.channel.emit(
            clock,
            Event::ExperienceGained {
                weapon_id: weapon_id.clone(),
                amount,
                total,
            },
        );
        if self.unlock_specializations(weapon_id, content, clock) {
            self.recompute(weapon_id, content, clock);
        }
        true
    }

    fn unlock_specializations(&mut self, weapon_id: &WeaponId, content: &GameContent, clock: Clock) -> bool {
        let Some(record) = self.weapons.get_mut(weapon_id) else {
            return false;
        };
        let Some(tree) = content.upgrade_trees.get(&record.category) else {
            return false;
        };
        let mut unlocked = Vec::new();
        for spec in &tree.specializations {
            let ready = !record.specializations.contains(&spec.id)
                && record.experience >= spec.required_experience
                && spec
                    .required_upgrades
                    .iter()
                    .all(|req| record.applied.contains(req));
            if ready {
                record.specializations.push(spec.id.clone());
                unlocked.push(spec.id.clone());
            }
        }
        for specialization_id in &unlocked {
            tracing::info!(%weapon_id, %specialization_id, "specialization unlocked");
            self.channel.emit(
                clock,
                Event::SpecializationUnlocked {
                    weapon_id: weapon_id.clone(),
                    specialization_id: specialization_id.clone(),
                },
            );
        }
        !unlocked.is_empty()
    }

    fn recompute(&mut self, weapon_id: &WeaponId, content: &GameContent, clock: Clock) {
        let Some(record) = self.weapons.get_mut(weapon_id) else {
            return;
        };
        let derived = derive_stats(
            &record.base,
            content.upgrade_trees.get(&record.category),
            &record.applied,
            &record.specializations,
        );
        if derived == record.derived {
            return;
        }
        record.derived = derived;
        let stats = record.derived.stats;
        self.channel.emit(
            clock,
            Event::StatsUpdated {
                weapon_id: weapon_id.clone(),
                stats,
            },
        );
    }
}

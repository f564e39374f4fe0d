//! Canonical ship records for one manager's domain.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Ship, ShipCategory, ShipId, ShipStatus, WeaponId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("ship {ship_id} is {category:?}; this registry accepts {scope:?}")]
    OutOfScope {
        ship_id: ShipId,
        category: ShipCategory,
        scope: Vec<ShipCategory>,
    },
    #[error("ship {0} is already registered")]
    Duplicate(ShipId),
    #[error("ship {0} is already registered with another manager")]
    ClaimedElsewhere(ShipId),
    #[error("ship {ship_id} mounts weapon {weapon_id}, which is already mounted elsewhere")]
    WeaponClaimed { ship_id: ShipId, weapon_id: WeaponId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registry {
    scope: Vec<ShipCategory>,
    ships: HashMap<ShipId, Ship>,
}

impl Registry {
    pub fn new(scope: &[ShipCategory]) -> Self {
        Self {
            scope: scope.to_vec(),
            ships: HashMap::new(),
        }
    }

    pub fn accepts(&self, category: ShipCategory) -> bool {
        self.scope.contains(&category)
    }

    pub fn insert(&mut self, ship: Ship) -> Result<(), RegistryError> {
        if !self.accepts(ship.category) {
            return Err(RegistryError::OutOfScope {
                ship_id: ship.id,
                category: ship.category,
                scope: self.scope.clone(),
            });
        }
        if self.ships.contains_key(&ship.id) {
            return Err(RegistryError::Duplicate(ship.id));
        }
        self.ships.insert(ship.id.clone(), ship);
        Ok(())
    }

    pub fn remove(&mut self, ship_id: &ShipId) -> Option<Ship> {
        self.ships.remove(ship_id)
    }

    pub fn get(&self, ship_id: &ShipId) -> Option<&Ship> {
        self.ships.get(ship_id)
    }

    pub fn get_mut(&mut self, ship_id: &ShipId) -> Option<&mut Ship> {
        self.ships.get_mut(ship_id)
    }

    pub fn contains(&self, ship_id: &ShipId) -> bool {
        self.ships.contains_key(ship_id)
    }

    pub fn len(&self) -> usize {
        self.ships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }

    /// Unordered; sort ids before doing anything observable.
    pub fn iter(&self) -> impl Iterator<Item = &Ship> {
        self.ships.values()
    }

    pub fn ids(&self) -> Vec<ShipId> {
        let mut ids: Vec<ShipId> = self.ships.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn by_status(&self, status: ShipStatus) -> Vec<&Ship> {
        let mut ships: Vec<&Ship> = self
            .ships
            .values()
            .filter(|ship| ship.status == status)
            .collect();
        ships.sort_by(|a, b| a.id.cmp(&b.id));
        ships
    }
}

//! Scan rates, accuracy and coordinated scan bookkeeping.

use serde::{Deserialize, Serialize};

use crate::{ScanId, SectorId, Ship, ShipId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatedScan {
    pub id: ScanId,
    pub sector_id: SectorId,
    pub ship_ids: Vec<ShipId>,
    /// 0..1
    pub progress: f32,
    pub started_at: f64,
}

/// Per-ship survey throughput multiplier.
pub fn survey_efficiency(ship: &Ship) -> f32 {
    ship.survey.efficiency * ship.tech_bonuses.scan * ship.coordination_bonus()
}

pub fn sensor_quality(ship: &Ship) -> f32 {
    ship.sensors.accuracy * ship.tech_bonuses.sensor * ship.coordination_bonus()
}

/// Diminishing returns for `n` cooperating ships: 1.0 for one ship,
/// approaching 0.5 as the group grows.
pub fn group_factor(participants: usize) -> f32 {
    if participants == 0 {
        return 0.0;
    }
    0.5 + 0.5 / (participants as f32).sqrt()
}

pub fn combined_rate(efficiencies: &[f32]) -> f32 {
    efficiencies.iter().sum::<f32>() * group_factor(efficiencies.len())
}

/// Mean sensor quality of the scanning ships, capped.
pub fn scan_accuracy(ships: &[&Ship], cap: f32) -> f32 {
    if ships.is_empty() {
        return 0.0;
    }
    let mean = ships.iter().map(|ship| sensor_quality(ship)).sum::<f32>() / ships.len() as f32;
    mean.min(cap)
}

pub fn distinct_specializations(ships: &[&Ship]) -> usize {
    crate::Specialization::ALL
        .iter()
        .filter(|spec| ships.iter().any(|ship| ship.survey.specialization == **spec))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::recon_ship;
    use crate::Specialization;
    use glam::Vec2;

    #[test]
    fn single_ship_rate_is_its_own_efficiency() {
        assert!((combined_rate(&[0.8]) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn adding_ships_has_diminishing_returns() {
        let two = combined_rate(&[1.0, 1.0]);
        let four = combined_rate(&[1.0; 4]);
        assert!(two > 1.0 && two < 2.0);
        assert!((four - 3.0).abs() < 1e-5);
        assert!(four / 4.0 < two / 2.0);
    }

    #[test]
    fn accuracy_is_capped() {
        let mut a = recon_ship("a", Vec2::ZERO, Specialization::Mapping);
        a.sensors.accuracy = 1.0;
        a.tech_bonuses.sensor = 1.4;
        assert!((scan_accuracy(&[&a], 0.95) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn distinct_specializations_counts_kinds_not_ships() {
        let a = recon_ship("a", Vec2::ZERO, Specialization::Anomaly);
        let b = recon_ship("b", Vec2::ZERO, Specialization::Anomaly);
        let c = recon_ship("c", Vec2::ZERO, Specialization::Resource);
        assert_eq!(distinct_specializations(&[&a, &b, &c]), 2);
    }
}

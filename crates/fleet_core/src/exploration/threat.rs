//! Threat assessment and evasion geometry.

use glam::Vec2;

use crate::{Ship, Threat};

#[derive(Debug, Clone, PartialEq)]
pub struct ThreatAssessment {
    /// 0..1
    pub level: f32,
    /// Threats inside effective sensor range, sorted by id.
    pub nearby: Vec<Threat>,
}

pub fn effective_sensor_range(ship: &Ship) -> f32 {
    ship.sensors.range * ship.tech_bonuses.sensor
}

/// Sum of `severity · (1 − d/range)` over threats in range, weighted by
/// sensor accuracy and clamped to `[0, 1]`.
pub fn assess_threat(ship: &Ship, threats: &[Threat]) -> ThreatAssessment {
    let range = effective_sensor_range(ship);
    if range <= 0.0 {
        return ThreatAssessment {
            level: 0.0,
            nearby: Vec::new(),
        };
    }
    let mut nearby: Vec<Threat> = threats
        .iter()
        .filter(|threat| ship.position.distance(threat.position) <= range)
        .cloned()
        .collect();
    nearby.sort_by(|a, b| a.id.cmp(&b.id));
    let raw: f32 = nearby
        .iter()
        .map(|threat| {
            let falloff = 1.0 - ship.position.distance(threat.position) / range;
            threat.severity.clamp(0.0, 1.0) * falloff
        })
        .sum();
    ThreatAssessment {
        level: (raw * ship.sensors.accuracy).clamp(0.0, 1.0),
        nearby,
    }
}

/// Severity-weighted direction away from `threats`, or `None` when the
/// pushes cancel out.
pub fn escape_heading(origin: Vec2, threats: &[Threat]) -> Option<Vec2> {
    threats
        .iter()
        .filter_map(|threat| {
            (origin - threat.position)
                .try_normalize()
                .map(|away| away * threat.severity)
        })
        .sum::<Vec2>()
        .try_normalize()
}

/// Safe point `safe_distance` away along the escape heading. Falls back to
/// heading away from `fallback_from`, then to holding position.
pub fn evasion_point(origin: Vec2, threats: &[Threat], fallback_from: Vec2, safe_distance: f32) -> Vec2 {
    escape_heading(origin, threats)
        .or_else(|| (origin - fallback_from).try_normalize())
        .map_or(origin, |heading| origin + heading * safe_distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{recon_ship, threat_at};
    use crate::Specialization;

    #[test]
    fn threats_outside_sensor_range_are_ignored() {
        let ship = recon_ship("scout", Vec2::ZERO, Specialization::Mapping);
        let far = threat_at("far", Vec2::new(ship.sensors.range * 2.0, 0.0), 1.0);
        let assessment = assess_threat(&ship, &[far]);
        assert!(assessment.level.abs() < 1e-6);
        assert!(assessment.nearby.is_empty());
    }

    #[test]
    fn level_falls_off_linearly_with_distance() {
        let mut ship = recon_ship("scout", Vec2::ZERO, Specialization::Mapping);
        ship.sensors.accuracy = 1.0;
        let range = ship.sensors.range;
        let half = threat_at("t", Vec2::new(range * 0.5, 0.0), 0.8);
        let assessment = assess_threat(&ship, &[half]);
        assert!((assessment.level - 0.4).abs() < 1e-5);
    }

    #[test]
    fn level_is_clamped_to_one() {
        let mut ship = recon_ship("scout", Vec2::ZERO, Specialization::Mapping);
        ship.sensors.accuracy = 1.0;
        let threats: Vec<Threat> = (0..5)
            .map(|i| threat_at(&format!("t{i}"), Vec2::new(1.0, i as f32), 1.0))
            .collect();
        assert!((assess_threat(&ship, &threats).level - 1.0).abs() < 1e-6);
    }

    #[test]
    fn sensor_tech_extends_range() {
        let mut ship = recon_ship("scout", Vec2::ZERO, Specialization::Mapping);
        let threat = threat_at("t", Vec2::new(ship.sensors.range * 1.2, 0.0), 1.0);
        assert!(assess_threat(&ship, std::slice::from_ref(&threat)).nearby.is_empty());
        ship.tech_bonuses.sensor = 1.5;
        assert_eq!(assess_threat(&ship, &[threat]).nearby.len(), 1);
    }

    #[test]
    fn evasion_heads_away_from_threat() {
        let threat = threat_at("t", Vec2::new(10.0, 0.0), 1.0);
        let point = evasion_point(Vec2::ZERO, &[threat], Vec2::ZERO, 100.0);
        assert!((point - Vec2::new(-100.0, 0.0)).length() < 1e-4);
    }

    #[test]
    fn balanced_threats_fall_back_to_leaving_the_sector() {
        let threats = [
            threat_at("east", Vec2::new(10.0, 0.0), 1.0),
            threat_at("west", Vec2::new(-10.0, 0.0), 1.0),
        ];
        let point = evasion_point(Vec2::ZERO, &threats, Vec2::new(0.0, 50.0), 100.0);
        assert!((point - Vec2::new(0.0, -100.0)).length() < 1e-4);

        let held = evasion_point(Vec2::ZERO, &threats, Vec2::ZERO, 100.0);
        assert!(held.length() < 1e-6);
    }
}

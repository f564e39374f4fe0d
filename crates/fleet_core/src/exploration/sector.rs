use crate::{Constants, ScanReport, Sector};

/// Exploration value of a sector, decaying with the age of its last scan.
/// Never-scanned sectors carry a flat bonus.
#[allow(clippy::cast_possible_truncation)]
pub fn sector_heat(sector: &Sector, now: f64, constants: &Constants) -> f32 {
    let anomaly_heat: f32 = sector
        .anomalies
        .iter()
        .filter(|anomaly| !anomaly.investigated)
        .map(|anomaly| anomaly.severity.weight())
        .sum();
    let value = sector.resources.len() as f32 + anomaly_heat + sector.habitability.unwrap_or(0.0) * 5.0;
    match sector.last_scanned {
        None => value + constants.unexplored_sector_heat,
        Some(scanned_at) => {
            let age = (now - scanned_at).max(0.0) as f32;
            let half_life = constants.sector_heat_half_life_secs.max(f32::EPSILON);
            value * 0.5_f32.powf(age / half_life)
        }
    }
}

/// Merge a report into the sector. Habitability keeps the best reading.
pub fn apply_report(sector: &mut Sector, report: &ScanReport, now: f64) {
    sector.explored = true;
    sector.last_scanned = Some(now);
    sector.anomalies.extend(report.anomalies.iter().cloned());
    sector.resources.extend(report.resources.iter().cloned());
    sector.habitability = match (sector.habitability, report.habitability) {
        (Some(old), Some(new)) => Some(old.max(new)),
        (old, new) => old.or(new),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::base_content;
    use crate::{Anomaly, AnomalyId, AnomalyKind, SectorId, Severity};
    use glam::Vec2;

    fn sector_with_high_anomaly() -> Sector {
        let mut sector = Sector::unexplored(SectorId("sector_0001".to_string()), Vec2::ZERO);
        sector.last_scanned = Some(0.0);
        sector.anomalies.push(Anomaly {
            id: AnomalyId("anomaly_a".to_string()),
            kind: AnomalyKind::Derelict,
            severity: Severity::High,
            investigated: false,
        });
        sector
    }

    #[test]
    fn heat_halves_each_half_life() {
        let content = base_content();
        let half_life = f64::from(content.constants.sector_heat_half_life_secs);
        let sector = sector_with_high_anomaly();
        let fresh = sector_heat(&sector, 0.0, &content.constants);
        let aged = sector_heat(&sector, half_life, &content.constants);
        assert!((fresh - 3.0).abs() < 1e-5);
        assert!((aged - 1.5).abs() < 1e-4);
    }

    #[test]
    fn investigated_anomalies_carry_no_heat() {
        let content = base_content();
        let mut sector = sector_with_high_anomaly();
        sector.anomalies[0].investigated = true;
        assert!(sector_heat(&sector, 0.0, &content.constants).abs() < 1e-6);
    }

    #[test]
    fn unscanned_sector_gets_flat_heat() {
        let content = base_content();
        let sector = Sector::unexplored(SectorId("s".to_string()), Vec2::ZERO);
        let heat = sector_heat(&sector, 1000.0, &content.constants);
        assert!((heat - content.constants.unexplored_sector_heat).abs() < 1e-6);
    }
}

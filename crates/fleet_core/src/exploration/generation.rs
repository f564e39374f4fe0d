//! Randomized scan results. All draws come from the caller's RNG.

use rand::Rng;

use crate::{
    generate_uuid, Anomaly, AnomalyId, AnomalyKind, Constants, ResourceDeposit, ResourceKind,
    ScanReport, Severity,
};

/// Skill inputs for a single scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanSkills {
    pub accuracy: f32,
    pub detection: f32,
    pub prospecting: f32,
}

/// `ceil(roll · 3 · skill)`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn roll_count(rng: &mut impl Rng, skill: f32) -> u32 {
    (rng.gen::<f32>() * 3.0 * skill.max(0.0)).ceil() as u32
}

pub fn roll_severity(rng: &mut impl Rng) -> Severity {
    let roll: f32 = rng.gen();
    if roll < 0.2 {
        Severity::High
    } else if roll < 0.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn roll_anomaly(rng: &mut impl Rng) -> Anomaly {
    let id = AnomalyId(format!("anomaly_{}", generate_uuid(rng)));
    let kind = AnomalyKind::ALL[rng.gen_range(0..AnomalyKind::ALL.len())];
    Anomaly {
        id,
        kind,
        severity: roll_severity(rng),
        investigated: false,
    }
}

fn roll_deposit(rng: &mut impl Rng, accuracy: f32, constants: &Constants) -> ResourceDeposit {
    let kind = ResourceKind::ALL[rng.gen_range(0..ResourceKind::ALL.len())];
    let low = constants.resource_amount_min;
    let high = constants.resource_amount_max.max(low);
    let amount = if high > low { rng.gen_range(low..=high) } else { low };
    ResourceDeposit {
        kind,
        amount: amount * accuracy,
    }
}

pub fn generate_report(rng: &mut impl Rng, skills: ScanSkills, constants: &Constants) -> ScanReport {
    let anomaly_count = roll_count(rng, skills.detection);
    let anomalies = (0..anomaly_count).map(|_| roll_anomaly(rng)).collect();
    let deposit_count = roll_count(rng, skills.prospecting);
    let resources = (0..deposit_count)
        .map(|_| roll_deposit(rng, skills.accuracy, constants))
        .collect();
    let habitability = (rng.gen::<f32>() * skills.accuracy).clamp(0.0, 1.0);
    ScanReport {
        resources,
        anomalies,
        habitability: Some(habitability),
        accuracy: skills.accuracy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_rng};

    #[test]
    fn zero_skill_finds_nothing() {
        let mut rng = make_rng();
        for _ in 0..50 {
            assert_eq!(roll_count(&mut rng, 0.0), 0);
        }
    }

    #[test]
    fn count_is_bounded_by_skill() {
        let mut rng = make_rng();
        for _ in 0..200 {
            assert!(roll_count(&mut rng, 1.0) <= 3);
        }
    }

    #[test]
    fn same_seed_same_report() {
        let content = base_content();
        let skills = ScanSkills {
            accuracy: 0.8,
            detection: 1.2,
            prospecting: 0.8,
        };
        let first = generate_report(&mut make_rng(), skills, &content.constants);
        let second = generate_report(&mut make_rng(), skills, &content.constants);
        assert_eq!(first, second);
    }

    #[test]
    fn deposits_scale_with_accuracy() {
        let content = base_content();
        let skills = ScanSkills {
            accuracy: 0.5,
            detection: 0.0,
            prospecting: 3.0,
        };
        let report = generate_report(&mut make_rng(), skills, &content.constants);
        assert!(!report.resources.is_empty());
        for deposit in &report.resources {
            assert!(deposit.amount <= content.constants.resource_amount_max * 0.5 + 1e-3);
        }
        assert!(report.habitability.unwrap() <= 0.5);
    }
}

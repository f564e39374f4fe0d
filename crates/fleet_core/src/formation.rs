//! Formation geometry and bonus math.
//!
//! Slot `i` sits at `leader + spacing · (cos θ, sin θ)` with
//! `θ = facing + i · π/4`. The leader is always `ship_ids[0]`.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_4;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Formation, FormationBonuses, FormationId, FormationKind, Ship, ShipId, Specialization};

/// Added to every bonus when all three survey specializations are present.
pub const DIVERSITY_BONUS: f32 = 0.1;

/// Base multipliers for a formation kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationProfile {
    pub scan: f32,
    pub detection: f32,
    pub stealth: f32,
    pub coordination: f32,
}

impl FormationKind {
    pub fn profile(self) -> FormationProfile {
        let (scan, detection, stealth, coordination) = match self {
            Self::Offensive => (0.9, 1.0, 0.8, 1.2),
            Self::Defensive => (1.0, 1.2, 1.1, 1.1),
            Self::Balanced => (1.0, 1.1, 1.0, 1.15),
            Self::Exploration => (1.3, 1.1, 1.0, 1.1),
            Self::Survey => (1.5, 1.2, 0.9, 1.15),
        };
        FormationProfile {
            scan,
            detection,
            stealth,
            coordination,
        }
    }
}

pub fn slot_position(leader: Vec2, facing: f32, spacing: f32, index: usize) -> Vec2 {
    let theta = facing + index as f32 * FRAC_PI_4;
    leader + spacing * Vec2::new(theta.cos(), theta.sin())
}

/// Heading (radians) from `from` towards `to`; `None` when they coincide.
pub fn facing_towards(from: Vec2, to: Vec2) -> Option<f32> {
    let delta = to - from;
    if delta.length_squared() <= f32::EPSILON {
        return None;
    }
    Some(delta.y.atan2(delta.x))
}

/// Move at most `max_step` towards `to` without overshooting.
pub(crate) fn step_towards(from: Vec2, to: Vec2, max_step: f32) -> Vec2 {
    let delta = to - from;
    let distance = delta.length();
    if distance <= max_step || distance <= f32::EPSILON {
        to
    } else {
        from + delta / distance * max_step.max(0.0)
    }
}

/// Scales bonuses with formation size, saturating at six ships.
pub fn ship_count_factor(members: usize) -> f32 {
    (0.5 + 0.1 * members as f32).min(1.0)
}

fn diversity(members: &[&Ship]) -> f32 {
    let full = Specialization::ALL
        .iter()
        .all(|spec| members.iter().any(|ship| ship.survey.specialization == *spec));
    if full {
        DIVERSITY_BONUS
    } else {
        0.0
    }
}

pub fn compute_bonuses(kind: FormationKind, members: &[&Ship]) -> FormationBonuses {
    let profile = kind.profile();
    let factor = ship_count_factor(members.len());
    let diversity = diversity(members);
    FormationBonuses {
        scan: profile.scan * factor + diversity,
        detection: profile.detection * factor + diversity,
        stealth: profile.stealth * factor + diversity,
        coordination: member_coordination(profile.coordination, factor, diversity),
    }
}

/// Multiplier applied to a member's task rates. Always at least 1.0 before
/// the diversity term.
fn member_coordination(base: f32, factor: f32, diversity: f32) -> f32 {
    1.0 + (base - 1.0) * factor + diversity
}

pub fn centroid(positions: &[Vec2]) -> Vec2 {
    if positions.is_empty() {
        return Vec2::ZERO;
    }
    positions.iter().copied().sum::<Vec2>() / positions.len() as f32
}

/// Result of removing a ship from a formation.
#[derive(Debug)]
pub enum MembershipChange {
    NotMember,
    Updated { leader_changed: bool },
    Emptied(Formation),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationBook {
    formations: HashMap<FormationId, Formation>,
    next_formation_id: u64,
    /// Keeps ids from different books apart.
    prefix: String,
}

impl Default for FormationBook {
    fn default() -> Self {
        Self::new("formation")
    }
}

impl FormationBook {
    pub fn new(prefix: &str) -> Self {
        Self {
            formations: HashMap::new(),
            next_formation_id: 0,
            prefix: prefix.to_string(),
        }
    }

    /// `ship_ids` must be non-empty; the first entry leads.
    pub(crate) fn create(
        &mut self,
        kind: FormationKind,
        ship_ids: Vec<ShipId>,
        spacing: f32,
        now: f64,
    ) -> FormationId {
        let id = FormationId(format!("{}_{:04}", self.prefix, self.next_formation_id));
        self.next_formation_id += 1;
        let leader_id = ship_ids[0].clone();
        self.formations.insert(
            id.clone(),
            Formation {
                id: id.clone(),
                kind,
                ship_ids,
                leader_id,
                spacing: spacing.max(0.0),
                facing: 0.0,
                position: Vec2::ZERO,
                bonuses: compute_bonuses(kind, &[]),
                created_at: now,
            },
        );
        id
    }

    pub fn get(&self, id: &FormationId) -> Option<&Formation> {
        self.formations.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &FormationId) -> Option<&mut Formation> {
        self.formations.get_mut(id)
    }

    pub(crate) fn remove(&mut self, id: &FormationId) -> Option<Formation> {
        self.formations.remove(id)
    }

    pub fn len(&self) -> usize {
        self.formations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formations.is_empty()
    }

    pub fn ids(&self) -> Vec<FormationId> {
        let mut ids: Vec<FormationId> = self.formations.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) fn add_member(&mut self, id: &FormationId, ship_id: &ShipId) -> bool {
        let Some(formation) = self.formations.get_mut(id) else {
            return false;
        };
        if formation.ship_ids.contains(ship_id) {
            return false;
        }
        formation.ship_ids.push(ship_id.clone());
        true
    }

    /// Remove a member. The next ship in slot order takes over as leader.
    pub(crate) fn remove_member(&mut self, id: &FormationId, ship_id: &ShipId) -> MembershipChange {
        let Some(formation) = self.formations.get_mut(id) else {
            return MembershipChange::NotMember;
        };
        let before = formation.ship_ids.len();
        formation.ship_ids.retain(|member| member != ship_id);
        if formation.ship_ids.len() == before {
            return MembershipChange::NotMember;
        }
        let Some(new_leader) = formation.ship_ids.first().cloned() else {
            return self
                .formations
                .remove(id)
                .map_or(MembershipChange::NotMember, MembershipChange::Emptied);
        };
        let leader_changed = new_leader != formation.leader_id;
        formation.leader_id = new_leader;
        MembershipChange::Updated { leader_changed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::recon_ship;

    #[test]
    fn slot_zero_at_facing_zero_is_directly_ahead() {
        let slot = slot_position(Vec2::new(10.0, 10.0), 0.0, 50.0, 0);
        assert!((slot - Vec2::new(60.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn slot_two_is_rotated_a_quarter_turn() {
        let slot = slot_position(Vec2::ZERO, 0.0, 20.0, 2);
        assert!((slot - Vec2::new(0.0, 20.0)).length() < 1e-4);
    }

    #[test]
    fn slots_rotate_with_facing() {
        let facing = std::f32::consts::FRAC_PI_2;
        let slot = slot_position(Vec2::ZERO, facing, 10.0, 1);
        let expected = Vec2::new((facing + FRAC_PI_4).cos(), (facing + FRAC_PI_4).sin()) * 10.0;
        assert!((slot - expected).length() < 1e-4);
    }

    #[test]
    fn count_factor_saturates() {
        assert!((ship_count_factor(1) - 0.6).abs() < 1e-5);
        assert!((ship_count_factor(3) - 0.8).abs() < 1e-5);
        assert!((ship_count_factor(5) - 1.0).abs() < 1e-5);
        assert!((ship_count_factor(12) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn diversity_bonus_needs_all_three_specializations() {
        let mapper = recon_ship("a", Vec2::ZERO, Specialization::Mapping);
        let hunter = recon_ship("b", Vec2::ZERO, Specialization::Anomaly);
        let prospector = recon_ship("c", Vec2::ZERO, Specialization::Resource);

        let partial = compute_bonuses(FormationKind::Survey, &[&mapper, &hunter]);
        let full = compute_bonuses(FormationKind::Survey, &[&mapper, &hunter, &prospector]);

        assert!((partial.scan - 1.5 * 0.7).abs() < 1e-5);
        assert!((full.scan - (1.5 * 0.8 + DIVERSITY_BONUS)).abs() < 1e-5);
        assert!(full.coordination > partial.coordination);
    }

    #[test]
    fn step_does_not_overshoot() {
        let next = step_towards(Vec2::ZERO, Vec2::new(3.0, 4.0), 10.0);
        assert!((next - Vec2::new(3.0, 4.0)).length() < 1e-5);
        let next = step_towards(Vec2::ZERO, Vec2::new(30.0, 40.0), 5.0);
        assert!((next - Vec2::new(3.0, 4.0)).length() < 1e-4);
    }

    #[test]
    fn removing_leader_promotes_next_member() {
        let mut book = FormationBook::default();
        let ids: Vec<ShipId> = ["a", "b", "c"].iter().map(|s| ShipId((*s).to_string())).collect();
        let formation_id = book.create(FormationKind::Balanced, ids.clone(), 40.0, 0.0);

        let change = book.remove_member(&formation_id, &ids[0]);
        assert!(matches!(change, MembershipChange::Updated { leader_changed: true }));
        assert_eq!(book.get(&formation_id).unwrap().leader_id, ids[1]);

        book.remove_member(&formation_id, &ids[1]);
        let change = book.remove_member(&formation_id, &ids[2]);
        assert!(matches!(change, MembershipChange::Emptied(_)));
        assert!(book.is_empty());
    }
}

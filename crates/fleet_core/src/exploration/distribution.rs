//! Spreading a batch of sectors across idle exploration ships.

use ahash::AHashSet;

use super::{ExplorationManager, SurveyTarget};
use crate::{Clock, Constants, PrincipalId, ScanId, SectorId, Ship, ShipId, TaskId, Threat};

#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    Individual {
        sector_id: SectorId,
        ship_id: ShipId,
        task_id: TaskId,
    },
    Coordinated {
        sector_id: SectorId,
        scan_id: ScanId,
        ship_ids: Vec<ShipId>,
    },
}

impl ExplorationManager {
    /// One sector per candidate, in order. Formation members go first and
    /// scan together when at least two of them are free; the rest are
    /// ordered by survey experience. Unknown sectors are skipped.
    pub fn distribute_tasks(
        &mut self,
        sector_ids: &[SectorId],
        faction: Option<&PrincipalId>,
        external: &[Threat],
        constants: &Constants,
        clock: Clock,
    ) -> Vec<Assignment> {
        let order = self.candidate_order(faction);
        let mut pending = sector_ids
            .iter()
            .filter(|id| self.sectors.contains_key(*id))
            .cloned()
            .collect::<Vec<_>>()
            .into_iter();
        let mut claimed: AHashSet<ShipId> = AHashSet::new();
        let mut assignments = Vec::new();

        for ship_id in order {
            if claimed.contains(&ship_id) {
                continue;
            }
            let Some(sector_id) = pending.next() else {
                break;
            };
            if let Some(assignment) = self.assign_formation(&ship_id, &sector_id, &mut claimed, constants, clock) {
                assignments.push(assignment);
                continue;
            }
            let Some(specialization) = self.roster.ship(&ship_id).map(|ship| ship.survey.specialization) else {
                continue;
            };
            let Some(position) = self.sectors.get(&sector_id).map(|sector| sector.position) else {
                continue;
            };
            claimed.insert(ship_id.clone());
            let target = SurveyTarget {
                sector_id: sector_id.clone(),
                position,
            };
            if let Some(task_id) = self.assign_task(&ship_id, target, specialization, external, constants, clock) {
                assignments.push(Assignment::Individual {
                    sector_id,
                    ship_id,
                    task_id,
                });
            }
        }
        tracing::debug!(assigned = assignments.len(), "exploration tasks distributed");
        assignments
    }

    fn candidate_order(&self, faction: Option<&PrincipalId>) -> Vec<ShipId> {
        let mut ships: Vec<&Ship> = self
            .roster
            .registry()
            .iter()
            .filter(|ship| faction.is_none_or(|f| &ship.faction == f))
            .filter(|ship| self.roster.is_available(&ship.id))
            .collect();
        ships.sort_by(|a, b| {
            b.formation
                .is_some()
                .cmp(&a.formation.is_some())
                .then_with(|| b.survey.experience.total_cmp(&a.survey.experience))
                .then_with(|| a.id.cmp(&b.id))
        });
        ships.into_iter().map(|ship| ship.id.clone()).collect()
    }

    fn assign_formation(
        &mut self,
        ship_id: &ShipId,
        sector_id: &SectorId,
        claimed: &mut AHashSet<ShipId>,
        constants: &Constants,
        clock: Clock,
    ) -> Option<Assignment> {
        let formation_id = self.roster.ship(ship_id)?.formation.as_ref()?.formation_id.clone();
        let members: Vec<ShipId> = self
            .roster
            .available_members(&formation_id)
            .into_iter()
            .filter(|id| !claimed.contains(id))
            .collect();
        if members.len() < 2 {
            return None;
        }
        let scan_id = self.start_coordinated_scan(sector_id, &members, constants, clock)?;
        claimed.extend(members.iter().cloned());
        Some(Assignment::Coordinated {
            sector_id: sector_id.clone(),
            scan_id,
            ship_ids: members,
        })
    }
}

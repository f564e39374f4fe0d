//! Exploration manager: threat-aware survey tasks, coordinated scans and
//! sector knowledge.

mod distribution;
mod generation;
mod scan;
mod sector;
mod threat;

use std::collections::HashMap;

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use distribution::Assignment;
pub use generation::{generate_report, roll_count, roll_severity, ScanSkills};
pub use scan::{
    combined_rate, distinct_specializations, group_factor, scan_accuracy, sensor_quality,
    survey_efficiency, CoordinatedScan,
};
pub use sector::{apply_report, sector_heat};
pub use threat::{assess_threat, effective_sensor_range, escape_heading, evasion_point, ThreatAssessment};

use crate::events::EventSource;
use crate::registry::RegistryError;
use crate::roster::Roster;
use crate::tasks::{progress_step, TaskDraft};
use crate::{
    Clock, Constants, Event, EventEnvelope, EventLevel, FormationId, FormationKind, ScanId,
    ScanReport, Sector, SectorId, Ship, ShipCategory, ShipId, ShipStatus, Specialization,
    SubscriptionId, TaskId, TaskKind, TaskOutcome, TaskStatus, TaskTarget, Threat, ThreatId,
    WeaponId, WeaponStats,
};

pub const EXPLORATION_SCOPE: &[ShipCategory] = &[ShipCategory::Recon, ShipCategory::Mining];

/// Skill multiplier a specialist gets in its own discipline.
const SPECIALIST_SKILL: f32 = 1.25;
/// Detection multiplier when revisiting a sector to investigate.
const INVESTIGATION_SKILL: f32 = 1.5;
/// Detection bonus per additional specialization in a coordinated scan.
const DIVERSITY_SKILL: f32 = 0.1;

/// Sector an exploration task points at.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyTarget {
    pub sector_id: SectorId,
    pub position: Vec2,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExplorationManager {
    roster: Roster,
    sectors: HashMap<SectorId, Sector>,
    threats: HashMap<ThreatId, Threat>,
    scans: HashMap<ScanId, CoordinatedScan>,
    next_scan_id: u64,
}

impl Default for ExplorationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ExplorationManager {
    pub fn new() -> Self {
        Self {
            roster: Roster::new(EXPLORATION_SCOPE, EventSource::Exploration),
            sectors: HashMap::new(),
            threats: HashMap::new(),
            scans: HashMap::new(),
            next_scan_id: 0,
        }
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn ship(&self, ship_id: &ShipId) -> Option<&Ship> {
        self.roster.ship(ship_id)
    }

    pub fn contains(&self, ship_id: &ShipId) -> bool {
        self.roster.registry().contains(ship_id)
    }

    pub fn ships_by_status(&self, status: ShipStatus) -> Vec<&Ship> {
        self.roster.registry().by_status(status)
    }

    pub fn subscribe<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&EventEnvelope) + Send + 'static,
    {
        self.roster.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.roster.unsubscribe(id)
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope> {
        self.roster.drain_events()
    }

    pub fn register(&mut self, ship: Ship, clock: Clock) -> Result<(), RegistryError> {
        self.roster.register(ship, clock)
    }

    pub fn unregister(&mut self, ship_id: &ShipId, clock: Clock) -> Option<Ship> {
        let ship = self.roster.unregister(ship_id, clock)?;
        self.prune_scans(clock);
        Some(ship)
    }

    /// Recon and mining mounts follow the ledger like warship mounts.
    pub fn refresh_weapon(&mut self, weapon_id: &WeaponId, stats: WeaponStats) -> bool {
        self.roster.refresh_weapon(weapon_id, stats)
    }

    pub fn create_formation(
        &mut self,
        kind: FormationKind,
        ship_ids: &[ShipId],
        spacing: f32,
        clock: Clock,
    ) -> Option<FormationId> {
        self.roster.create_formation(kind, ship_ids, spacing, clock)
    }

    pub fn disband_formation(&mut self, formation_id: &FormationId, clock: Clock) -> bool {
        self.roster.disband_formation(formation_id, clock)
    }

    // --- Sectors and threats ---------------------------------------------

    pub fn sector(&self, sector_id: &SectorId) -> Option<&Sector> {
        self.sectors.get(sector_id)
    }

    pub fn sectors(&self) -> Vec<&Sector> {
        let mut sectors: Vec<&Sector> = self.sectors.values().collect();
        sectors.sort_by(|a, b| a.id.cmp(&b.id));
        sectors
    }

    /// Returns false when the sector is already known.
    pub fn add_sector(&mut self, sector_id: SectorId, position: Vec2, clock: Clock) -> bool {
        if self.sectors.contains_key(&sector_id) {
            return false;
        }
        self.sectors
            .insert(sector_id.clone(), Sector::unexplored(sector_id.clone(), position));
        self.roster.emit(clock, Event::SectorAdded { sector_id, position });
        true
    }

    /// Sectors by descending heat, ties broken by id.
    pub fn hottest_sectors(&self, now: f64, constants: &Constants) -> Vec<(SectorId, f32)> {
        let mut ranked: Vec<(SectorId, f32)> = self
            .sectors
            .values()
            .map(|sector| (sector.id.clone(), sector_heat(sector, now, constants)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked
    }

    pub fn report_threat(&mut self, threat: Threat) {
        self.threats.insert(threat.id.clone(), threat);
    }

    pub fn clear_threat(&mut self, threat_id: &ThreatId) -> bool {
        self.threats.remove(threat_id).is_some()
    }

    pub fn threats(&self) -> Vec<&Threat> {
        let mut threats: Vec<&Threat> = self.threats.values().collect();
        threats.sort_by(|a, b| a.id.cmp(&b.id));
        threats
    }

    fn known_threats(&self, external: &[Threat]) -> Vec<Threat> {
        let mut all: Vec<Threat> = self.threats.values().cloned().collect();
        all.extend(external.iter().cloned());
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn assess(&self, ship_id: &ShipId, external: &[Threat]) -> Option<ThreatAssessment> {
        let ship = self.roster.ship(ship_id)?;
        Some(assess_threat(ship, &self.known_threats(external)))
    }

    pub fn coordinated_scan(&self, scan_id: &ScanId) -> Option<&CoordinatedScan> {
        self.scans.get(scan_id)
    }

    // --- Tasks ------------------------------------------------------------

    /// Pick evade, investigate or explore from the ship's threat level and
    /// queue it. Unknown sectors are recorded at `target.position`.
    pub fn assign_task(
        &mut self,
        ship_id: &ShipId,
        target: SurveyTarget,
        specialization: Specialization,
        external: &[Threat],
        constants: &Constants,
        clock: Clock,
    ) -> Option<TaskId> {
        let Some(ship) = self.roster.ship(ship_id) else {
            tracing::debug!(%ship_id, "exploration task ignored: unknown ship");
            return None;
        };
        let assessment = assess_threat(ship, &self.known_threats(external));
        let origin = ship.position;
        self.add_sector(target.sector_id.clone(), target.position, clock);

        let mut draft = if assessment.level > constants.evasion_threshold {
            let safe_point = evasion_point(
                origin,
                &assessment.nearby,
                target.position,
                constants.evade_safe_distance,
            );
            tracing::info!(%ship_id, level = assessment.level, "threat too high, evading");
            TaskDraft::new(
                TaskKind::Evade,
                TaskTarget {
                    id: None,
                    position: safe_point,
                },
                constants.evade_priority,
            )
        } else {
            let kind = if assessment.level > constants.caution_threshold {
                TaskKind::Investigate
            } else {
                TaskKind::Explore
            };
            TaskDraft::new(
                kind,
                TaskTarget {
                    id: Some(target.sector_id.0.clone()),
                    position: target.position,
                },
                specialization.priority(),
            )
        };
        draft.threat_level = Some(assessment.level);
        draft.specialization = Some(specialization);
        self.roster.assign_task(ship_id, draft, clock)
    }

    /// Queue a shared scan of a known sector for every listed ship that is
    /// idle with no task.
    pub fn start_coordinated_scan(
        &mut self,
        sector_id: &SectorId,
        ship_ids: &[ShipId],
        constants: &Constants,
        clock: Clock,
    ) -> Option<ScanId> {
        let Some(sector) = self.sectors.get(sector_id) else {
            tracing::debug!(%sector_id, "coordinated scan ignored: unknown sector");
            return None;
        };
        let position = sector.position;
        let mut participants: Vec<ShipId> = Vec::new();
        for ship_id in ship_ids {
            // Busy ships keep their current task.
            if self.roster.is_available(ship_id) && !participants.contains(ship_id) {
                participants.push(ship_id.clone());
            }
        }
        if participants.is_empty() {
            return None;
        }

        let scan_id = ScanId(format!("scan_{:04}", self.next_scan_id));
        self.next_scan_id += 1;
        for ship_id in &participants {
            let mut draft = TaskDraft::new(
                TaskKind::CoordinatedScan {
                    scan: scan_id.clone(),
                },
                TaskTarget {
                    id: Some(sector_id.0.clone()),
                    position,
                },
                constants.coordinated_scan_priority,
            );
            draft.specialization = self.roster.ship(ship_id).map(|ship| ship.survey.specialization);
            self.roster.assign_task(ship_id, draft, clock);
        }
        self.scans.insert(
            scan_id.clone(),
            CoordinatedScan {
                id: scan_id.clone(),
                sector_id: sector_id.clone(),
                ship_ids: participants.clone(),
                progress: 0.0,
                started_at: clock.time,
            },
        );
        tracing::info!(%scan_id, %sector_id, ships = participants.len(), "coordinated scan started");
        self.roster.emit(
            clock,
            Event::CoordinatedScanStarted {
                scan_id: scan_id.clone(),
                sector_id: sector_id.clone(),
                ship_ids: participants,
            },
        );
        Some(scan_id)
    }

    // --- Update -----------------------------------------------------------

    pub fn update(
        &mut self,
        clock: Clock,
        dt: f32,
        constants: &Constants,
        rng: &mut impl Rng,
        level: EventLevel,
    ) {
        self.roster.advance_formations(dt);
        self.roster.start_ready_tasks(clock);
        self.advance_surveys(clock, dt, constants, rng, level);
        self.advance_scans(clock, dt, constants, rng, level);
    }

    fn advance_surveys(
        &mut self,
        clock: Clock,
        dt: f32,
        constants: &Constants,
        rng: &mut impl Rng,
        level: EventLevel,
    ) {
        for ship_id in self.roster.tasks().ships_with(TaskStatus::InProgress) {
            let Some(task) = self.roster.task(&ship_id) else {
                continue;
            };
            let step = match task.kind {
                TaskKind::CoordinatedScan { .. } => continue,
                TaskKind::Evade => progress_step(dt, constants.evade_rate, 1.0),
                _ => {
                    let Some(ship) = self.roster.ship(&ship_id) else {
                        continue;
                    };
                    progress_step(dt, constants.scan_rate, survey_efficiency(ship))
                }
            };
            let Some(progress) = self.roster.record_progress(&ship_id, step, clock, level) else {
                continue;
            };
            if progress >= 1.0 {
                self.finish_survey(&ship_id, clock, constants, rng);
            }
        }
    }

    fn finish_survey(&mut self, ship_id: &ShipId, clock: Clock, constants: &Constants, rng: &mut impl Rng) {
        let Some(task) = self.roster.task(ship_id).cloned() else {
            return;
        };
        if task.kind == TaskKind::Evade {
            let position = task.target.position;
            if let Some(ship) = self.roster.ship_mut(ship_id) {
                ship.position = position;
            }
            self.roster
                .complete_task(ship_id, TaskOutcome::Evaded { position }, clock);
            return;
        }
        let Some(sector_id) = task.target.id.clone().map(SectorId) else {
            self.roster.cancel_task(ship_id, clock);
            return;
        };
        let Some(ship) = self.roster.ship(ship_id) else {
            return;
        };
        let accuracy = scan_accuracy(&[ship], constants.scan_accuracy_cap);
        let investigating = task.kind == TaskKind::Investigate;
        let mut skills = ScanSkills {
            accuracy,
            detection: accuracy,
            prospecting: accuracy,
        };
        match task.specialization {
            Some(Specialization::Anomaly) => skills.detection *= SPECIALIST_SKILL,
            Some(Specialization::Resource) => skills.prospecting *= SPECIALIST_SKILL,
            Some(Specialization::Mapping) | None => {}
        }
        if investigating {
            skills.detection *= INVESTIGATION_SKILL;
        }

        let report = generate_report(rng, skills, constants);
        self.record_scan(&sector_id, &report, investigating, clock);
        self.grant_experience(ship_id, constants.scan_experience);
        self.roster
            .complete_task(ship_id, TaskOutcome::Survey { sector_id, report }, clock);
    }

    fn advance_scans(
        &mut self,
        clock: Clock,
        dt: f32,
        constants: &Constants,
        rng: &mut impl Rng,
        level: EventLevel,
    ) {
        let mut scan_ids: Vec<ScanId> = self.scans.keys().cloned().collect();
        scan_ids.sort();
        for scan_id in scan_ids {
            if !self.prune_scan(&scan_id, clock) {
                continue;
            }
            let active: Vec<ShipId> = self
                .scans
                .get(&scan_id)
                .map(|scan| scan.ship_ids.clone())
                .unwrap_or_default()
                .into_iter()
                .filter(|id| {
                    self.roster
                        .task(id)
                        .is_some_and(|task| task.status == TaskStatus::InProgress)
                })
                .collect();
            if active.is_empty() {
                continue;
            }
            let efficiencies: Vec<f32> = active
                .iter()
                .filter_map(|id| self.roster.ship(id))
                .map(survey_efficiency)
                .collect();
            let step = progress_step(dt, constants.scan_rate, combined_rate(&efficiencies));
            let Some(scan) = self.scans.get_mut(&scan_id) else {
                continue;
            };
            scan.progress = (scan.progress + step).min(1.0);
            let progress = scan.progress;
            for ship_id in &active {
                self.roster.mirror_progress(ship_id, progress, clock, level);
            }
            if progress >= 1.0 {
                self.finish_scan(&scan_id, clock, constants, rng);
            }
        }
    }

    fn finish_scan(&mut self, scan_id: &ScanId, clock: Clock, constants: &Constants, rng: &mut impl Rng) {
        let Some(scan) = self.scans.remove(scan_id) else {
            return;
        };
        let skills = {
            let ships: Vec<&Ship> = scan
                .ship_ids
                .iter()
                .filter_map(|id| self.roster.ship(id))
                .collect();
            let accuracy = scan_accuracy(&ships, constants.scan_accuracy_cap);
            let diversity = distinct_specializations(&ships).saturating_sub(1) as f32 * DIVERSITY_SKILL;
            ScanSkills {
                accuracy,
                detection: accuracy + diversity,
                prospecting: accuracy,
            }
        };
        let report = generate_report(rng, skills, constants);
        self.record_scan(&scan.sector_id, &report, false, clock);
        for ship_id in &scan.ship_ids {
            self.grant_experience(ship_id, constants.scan_experience);
            self.roster.complete_task(
                ship_id,
                TaskOutcome::Survey {
                    sector_id: scan.sector_id.clone(),
                    report: report.clone(),
                },
                clock,
            );
        }
        tracing::info!(%scan_id, sector_id = %scan.sector_id, "coordinated scan completed");
        self.roster.emit(
            clock,
            Event::CoordinatedScanCompleted {
                scan_id: scan_id.clone(),
                sector_id: scan.sector_id,
                ship_ids: scan.ship_ids,
            },
        );
    }

    fn is_scan_member(&self, scan_id: &ScanId, ship_id: &ShipId) -> bool {
        self.roster
            .task(ship_id)
            .is_some_and(|task| matches!(&task.kind, TaskKind::CoordinatedScan { scan } if scan == scan_id))
    }

    /// Drop participants that no longer carry this scan's task. A scan with
    /// nobody left fails. Returns whether the scan is still live.
    fn prune_scan(&mut self, scan_id: &ScanId, clock: Clock) -> bool {
        let Some(scan) = self.scans.get(scan_id) else {
            return false;
        };
        let members: Vec<ShipId> = scan
            .ship_ids
            .iter()
            .filter(|id| self.is_scan_member(scan_id, id))
            .cloned()
            .collect();
        if members.is_empty() {
            let Some(scan) = self.scans.remove(scan_id) else {
                return false;
            };
            tracing::info!(%scan_id, sector_id = %scan.sector_id, "coordinated scan lost all participants");
            self.roster.emit(
                clock,
                Event::CoordinatedScanFailed {
                    scan_id: scan_id.clone(),
                    sector_id: scan.sector_id,
                },
            );
            return false;
        }
        if let Some(scan) = self.scans.get_mut(scan_id) {
            scan.ship_ids = members;
        }
        true
    }

    fn prune_scans(&mut self, clock: Clock) {
        let mut scan_ids: Vec<ScanId> = self.scans.keys().cloned().collect();
        scan_ids.sort();
        for scan_id in scan_ids {
            self.prune_scan(&scan_id, clock);
        }
    }

    fn record_scan(&mut self, sector_id: &SectorId, report: &ScanReport, investigated: bool, clock: Clock) {
        let Some(sector) = self.sectors.get_mut(sector_id) else {
            tracing::warn!(%sector_id, "scan finished for unknown sector");
            return;
        };
        if investigated {
            for anomaly in &mut sector.anomalies {
                anomaly.investigated = true;
            }
        }
        apply_report(sector, report, clock.time);
        for anomaly in &report.anomalies {
            self.roster.emit(
                clock,
                Event::AnomalyDiscovered {
                    sector_id: sector_id.clone(),
                    anomaly: anomaly.clone(),
                },
            );
        }
        self.roster.emit(
            clock,
            Event::SectorScanned {
                sector_id: sector_id.clone(),
                report: Box::new(report.clone()),
            },
        );
    }

    fn grant_experience(&mut self, ship_id: &ShipId, amount: f32) {
        if let Some(ship) = self.roster.ship_mut(ship_id) {
            ship.survey.experience += amount;
        }
    }
}

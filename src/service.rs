//! External interface of the scheduling core.
//!
//! The service wires the optimizer, elective allocator, fairness
//! evaluator, voting coordinator and reallocation engine together
//! behind the operations an embedding application calls. Domain
//! loading and notification delivery stay outside, behind traits.

use crate::config::SolverConfig;
use crate::data::{
    BallotId, DomainData, ReallocationId, ReallocationLogEntry, Schedule, StudentId,
    UnavailabilityEvent,
};
use crate::electives::{self, AllocationReport, FairnessLedger};
use crate::error::{Result, SolverError};
use crate::fairness::{self, WorkloadReport};
use crate::realloc::{ReallocState, ReallocationEngine, SubstitutePolicy};
use crate::solver::{self, SolveOutcome};
use crate::voting::VotingCoordinator;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

/// Supplies the full domain for one (institute, semester).
pub trait DomainLoader {
    fn load(&self, institute_id: &str, semester: u8) -> Result<DomainData>;
}

/// Best-effort outbound notifications. Implementations must not fail
/// the caller; delivery problems are theirs to log and absorb.
pub trait NotificationSink {
    fn notify(&self, recipient: &str, event: &str);
}

/// Sink that records every notification in the log and nothing else.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn notify(&self, recipient: &str, event: &str) {
        info!("notify {recipient}: {event}");
    }
}

/// Elective half of the fairness report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectiveSummary {
    pub allocation_rate: f64,
    pub placed_per_round: [u32; 5],
    pub mean_preference_score: f64,
    pub unallocated_students: usize,
}

/// Fairness metrics for one institute's current schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessReport {
    pub institute_id: String,
    pub semester: u8,
    pub workload: WorkloadReport,
    pub electives: Option<ElectiveSummary>,
}

/// Current state and audit log of one reallocation case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationStatus {
    pub state: ReallocState,
    pub log: Vec<ReallocationLogEntry>,
}

struct InstituteState {
    config: SolverConfig,
    domain: DomainData,
    schedule: Schedule,
    allocation: Option<AllocationReport>,
    /// Ledger this term's allocation ran against. Re-running the same
    /// term reuses it, so a re-run never accrues carry twice.
    prior_ledger: FairnessLedger,
    /// Successor ledger the next term starts from.
    next_ledger: FairnessLedger,
}

/// Facade over the scheduling and reallocation core.
pub struct TimetableService<L: DomainLoader> {
    loader: L,
    sink: Box<dyn NotificationSink>,
    policy: Box<dyn SubstitutePolicy>,
    states: BTreeMap<(String, u8), InstituteState>,
    voting: VotingCoordinator,
    engine: ReallocationEngine,
    /// Optimization keys currently solving. One run per key at a time;
    /// a second request for the same key is rejected, not queued.
    in_flight: Mutex<BTreeSet<(String, u8)>>,
}

impl<L: DomainLoader> TimetableService<L> {
    pub fn new(
        loader: L,
        sink: Box<dyn NotificationSink>,
        policy: Box<dyn SubstitutePolicy>,
    ) -> Self {
        Self {
            loader,
            sink,
            policy,
            states: BTreeMap::new(),
            voting: VotingCoordinator::new(),
            engine: ReallocationEngine::new(),
            in_flight: Mutex::new(BTreeSet::new()),
        }
    }

    /// Loads the domain, allocates electives, solves the timetable and
    /// installs the result as the current schedule for the key.
    pub fn generate_schedule(
        &mut self,
        institute_id: &str,
        semester: u8,
        config: SolverConfig,
    ) -> Result<SolveOutcome> {
        let key = (institute_id.to_string(), semester);
        self.begin_run(&key)?;
        let outcome = self.run_pipeline(institute_id, semester, config);
        self.end_run(&key);
        outcome
    }

    fn run_pipeline(
        &mut self,
        institute_id: &str,
        semester: u8,
        config: SolverConfig,
    ) -> Result<SolveOutcome> {
        let key = (institute_id.to_string(), semester);
        let mut domain = self.loader.load(institute_id, semester)?;
        info!(
            "Loaded domain for {institute_id}/{semester}: {} students, {} faculty, {} rooms, {} courses",
            domain.students.len(),
            domain.faculty.len(),
            domain.rooms.len(),
            domain.courses.len()
        );

        // Electives first; seat counts feed the room-capacity checks.
        // The input ledger is fixed per term: a re-run of an existing
        // key replays against the same ledger, and a new term starts
        // from the latest preceding term's successor.
        let prior_ledger = match self.states.get(&key) {
            Some(state) => state.prior_ledger.clone(),
            None => self
                .states
                .iter()
                .filter(|((inst, sem), _)| *inst == key.0 && *sem < key.1)
                .max_by_key(|((_, sem), _)| *sem)
                .map(|(_, s)| s.next_ledger.clone())
                .unwrap_or_default(),
        };
        let allocation = electives::allocate(&domain.students, &domain.courses, &prior_ledger);
        let mut seats: BTreeMap<u32, u32> = BTreeMap::new();
        for course in allocation.allocations.values() {
            *seats.entry(*course).or_insert(0) += 1;
        }
        for course in domain.courses.iter_mut().filter(|c| c.is_elective) {
            course.enrolled = seats.get(&course.id).copied().unwrap_or(0);
        }

        let outcome = solver::solve(&domain, &config, Some(&allocation))?;
        let next_ledger = allocation.next_ledger.clone();
        self.states.insert(
            key,
            InstituteState {
                config,
                domain,
                schedule: outcome.schedule.clone(),
                allocation: Some(allocation),
                prior_ledger,
                next_ledger,
            },
        );
        Ok(outcome)
    }

    /// Registers a faculty-unavailability report against one
    /// institute's schedule. The key is explicit: assignment ids are
    /// only unique within a schedule. Escalation starts on the next
    /// [`poll`](Self::poll).
    pub fn report_unavailability(
        &mut self,
        institute_id: &str,
        semester: u8,
        event: UnavailabilityEvent,
    ) -> Result<ReallocationId> {
        let state = self
            .states
            .get(&(institute_id.to_string(), semester))
            .ok_or_else(|| {
                SolverError::Input(format!("no schedule for {institute_id}/{semester}"))
            })?;
        self.engine.report(&state.domain, &state.schedule, event)
    }

    /// Records a student's vote on an open ballot.
    pub fn cast_vote(
        &mut self,
        ballot: BallotId,
        voter: StudentId,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.voting.cast_vote(ballot, voter, value, now)
    }

    /// Time-driven advance of all reallocation machinery: closes due
    /// ballots and runs every pending case as far as it can go.
    pub fn poll(&mut self, now: DateTime<Utc>) -> Result<()> {
        for state in self.states.values_mut() {
            self.engine.poll(
                &state.domain,
                &mut state.schedule,
                &mut self.voting,
                self.policy.as_ref(),
                self.sink.as_ref(),
                &state.config,
                now,
            )?;
        }
        Ok(())
    }

    /// Withdraws a reallocation case; rejected once voting has opened.
    pub fn cancel_reallocation(&mut self, id: ReallocationId, now: DateTime<Utc>) -> Result<()> {
        self.engine.cancel(id, now)
    }

    pub fn get_reallocation_status(&self, id: ReallocationId) -> Result<ReallocationStatus> {
        self.engine
            .case(id)
            .map(|c| ReallocationStatus { state: c.state.clone(), log: c.log.clone() })
            .ok_or_else(|| SolverError::Input(format!("unknown reallocation {id}")))
    }

    /// Fairness metrics of the institute's most recent schedule.
    pub fn get_fairness_report(&self, institute_id: &str) -> Result<FairnessReport> {
        let ((_, semester), state) = self
            .states
            .iter()
            .filter(|((inst, _), _)| inst == institute_id)
            .max_by_key(|((_, sem), _)| *sem)
            .ok_or_else(|| {
                SolverError::Input(format!("no schedule for institute {institute_id}"))
            })?;
        let workload = fairness::evaluate(&state.schedule, &state.domain);
        let electives = state.allocation.as_ref().map(|a| ElectiveSummary {
            allocation_rate: a.allocation_rate,
            placed_per_round: a.placed_per_round,
            mean_preference_score: a.mean_preference_score(),
            unallocated_students: a.unallocated.len(),
        });
        Ok(FairnessReport {
            institute_id: institute_id.to_string(),
            semester: *semester,
            workload,
            electives,
        })
    }

    /// Current schedule for a key, if one has been generated.
    pub fn schedule(&self, institute_id: &str, semester: u8) -> Option<&Schedule> {
        self.states
            .get(&(institute_id.to_string(), semester))
            .map(|s| &s.schedule)
    }

    /// Elective seat allocation of a key's current schedule.
    pub fn elective_allocation(
        &self,
        institute_id: &str,
        semester: u8,
    ) -> Option<&AllocationReport> {
        self.states
            .get(&(institute_id.to_string(), semester))
            .and_then(|s| s.allocation.as_ref())
    }

    fn begin_run(&self, key: &(String, u8)) -> Result<()> {
        let mut in_flight = self
            .in_flight
            .lock()
            .map_err(|_| SolverError::Internal("in-flight gate poisoned".to_string()))?;
        if !in_flight.insert(key.clone()) {
            warn!("Rejecting optimization for {key:?}: already in flight");
            return Err(SolverError::Conflict(format!(
                "optimization already running for {}/{}",
                key.0, key.1
            )));
        }
        Ok(())
    }

    fn end_run(&self, key: &(String, u8)) {
        if let Ok(mut in_flight) = self.in_flight.lock() {
            in_flight.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyLoader;

    impl DomainLoader for EmptyLoader {
        fn load(&self, _institute_id: &str, _semester: u8) -> Result<DomainData> {
            Err(SolverError::Input("no data".to_string()))
        }
    }

    #[test]
    fn in_flight_gate_rejects_duplicate_key() {
        let service = TimetableService::new(
            EmptyLoader,
            Box::new(LogSink),
            Box::new(crate::realloc::AlwaysAccept),
        );
        let key = ("inst-1".to_string(), 1u8);
        service.begin_run(&key).unwrap();
        assert!(matches!(service.begin_run(&key), Err(SolverError::Conflict(_))));
        service.end_run(&key);
        service.begin_run(&key).unwrap();
    }

    #[test]
    fn failed_run_releases_the_gate() {
        let mut service = TimetableService::new(
            EmptyLoader,
            Box::new(LogSink),
            Box::new(crate::realloc::AlwaysAccept),
        );
        let cfg = SolverConfig::default();
        assert!(service.generate_schedule("inst-1", 1, cfg.clone()).is_err());
        // The loader failure must not leave the key stuck in flight.
        assert!(service.generate_schedule("inst-1", 1, cfg).is_err());
        assert!(matches!(
            service.get_fairness_report("inst-1"),
            Err(SolverError::Input(_))
        ));
    }
}

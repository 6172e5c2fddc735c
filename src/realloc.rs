//! Five-step escalation for faculty unavailability.
//!
//! A reported absence walks an ordered remedy ladder: the nominated
//! substitute, then section peers, then same-subject faculty subject
//! to a student ballot, then a reschedule before the next checkpoint,
//! then a weekend makeup ballot. Exhausting the ladder drops the
//! class, logged and explicit. Absence of a willing substitute or a
//! free slot is a normal transition, never an error; only unknown
//! faculty or assignment ids fail hard.
//!
//! The machine never blocks. Ballots stay open for hours, so a case
//! parks while voting and `poll` resumes it once the deadline passes;
//! every decision is replayed from owned state, surviving restarts.

use crate::config::SolverConfig;
use crate::data::{
    Assignment, AssignmentId, BallotId, DomainData, FacultyId, ReallocationId,
    ReallocationLogEntry, Schedule, TimeSlot, UnavailabilityEvent,
};
use crate::error::{Result, SolverError};
use crate::fairness;
use crate::service::NotificationSink;
use crate::voting::VotingCoordinator;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Terminal outcome of a reallocation case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    Reassigned { substitute: FacultyId },
    Rescheduled { slot: TimeSlot },
    WeekendScheduled { slot: TimeSlot },
    Dropped,
}

/// Where a case currently stands. Transitions move strictly forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReallocState {
    /// Reported, escalation not yet started.
    Reported,
    /// Step 3 ballot open for the named candidate.
    AwaitingSubjectVote { ballot: BallotId, candidate: FacultyId },
    /// Step 5 weekend-makeup ballot open.
    AwaitingWeekendVote { ballot: BallotId },
    Resolved(Resolution),
    /// Withdrawn by the reporter before any ballot opened.
    Cancelled,
}

impl ReallocState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(_) | Self::Cancelled)
    }
}

/// One tracked unavailability case with its append-only log. Bound to
/// the (institute, semester) schedule it was reported against;
/// assignment ids are only unique within one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationCase {
    pub id: ReallocationId,
    pub institute_id: String,
    pub semester: u8,
    pub event: UnavailabilityEvent,
    pub state: ReallocState,
    pub log: Vec<ReallocationLogEntry>,
}

impl ReallocationCase {
    fn owns(&self, schedule: &Schedule) -> bool {
        self.institute_id == schedule.institute_id && self.semester == schedule.semester
    }
}

impl ReallocationCase {
    fn append_log(
        &mut self,
        step: u8,
        action: &str,
        inputs: serde_json::Value,
        outcome: String,
        now: DateTime<Utc>,
    ) {
        debug_assert!(self.log.last().map_or(true, |e| e.step < step));
        self.log.push(ReallocationLogEntry {
            step,
            action: action.to_string(),
            inputs,
            outcome,
            at: now,
        });
    }
}

/// Answers whether a faculty member agrees to cover a class. The real
/// answer comes from outside the core (a person replying to a
/// request); tests and embedders plug in their own policy.
pub trait SubstitutePolicy {
    fn accepts(&self, faculty: FacultyId, assignment: &Assignment) -> bool;
}

/// Policy that assumes every available candidate agrees.
pub struct AlwaysAccept;

impl SubstitutePolicy for AlwaysAccept {
    fn accepts(&self, _faculty: FacultyId, _assignment: &Assignment) -> bool {
        true
    }
}

/// Drives every open reallocation case.
#[derive(Debug, Default)]
pub struct ReallocationEngine {
    cases: BTreeMap<ReallocationId, ReallocationCase>,
    next_id: ReallocationId,
}

impl ReallocationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a reported absence. Validates ids against the domain
    /// and schedule; escalation itself starts on the next `poll`.
    pub fn report(
        &mut self,
        domain: &DomainData,
        schedule: &Schedule,
        event: UnavailabilityEvent,
    ) -> Result<ReallocationId> {
        if domain.faculty_member(event.faculty).is_none() {
            return Err(SolverError::Input(format!("unknown faculty {}", event.faculty)));
        }
        let assignment = schedule
            .assignment(event.assignment)
            .ok_or_else(|| SolverError::Input(format!("unknown assignment {}", event.assignment)))?;
        if assignment.faculty != event.faculty {
            return Err(SolverError::Input(format!(
                "assignment {} is not taught by faculty {}",
                event.assignment, event.faculty
            )));
        }

        self.next_id += 1;
        let id = self.next_id;
        info!(
            "Reallocation {} opened: faculty {} out on {} for {}",
            id, event.faculty, event.date, assignment
        );
        self.cases.insert(
            id,
            ReallocationCase {
                id,
                institute_id: schedule.institute_id.clone(),
                semester: schedule.semester,
                event,
                state: ReallocState::Reported,
                log: Vec::new(),
            },
        );
        Ok(id)
    }

    pub fn case(&self, id: ReallocationId) -> Option<&ReallocationCase> {
        self.cases.get(&id)
    }

    /// Withdraws a case. Allowed only while no ballot has opened; once
    /// students are voting the case runs to its deadline.
    pub fn cancel(&mut self, id: ReallocationId, now: DateTime<Utc>) -> Result<()> {
        let case = self
            .cases
            .get_mut(&id)
            .ok_or_else(|| SolverError::Input(format!("unknown reallocation {id}")))?;
        match case.state {
            ReallocState::Reported => {
                case.state = ReallocState::Cancelled;
                case.append_log(
                    1,
                    "cancelled",
                    json!({}),
                    "withdrawn by reporter before escalation".to_string(),
                    now,
                );
                Ok(())
            }
            _ => Err(SolverError::State(format!(
                "reallocation {id} cannot be cancelled after voting opened or resolution"
            ))),
        }
    }

    /// Time-driven advance: closes due ballots and moves every
    /// non-terminal case of the given schedule as far as it can go
    /// without waiting on a ballot. Call periodically with the current
    /// time. A case that fails to advance is logged and left for the
    /// next sweep; it never blocks the other cases.
    pub fn poll(
        &mut self,
        domain: &DomainData,
        schedule: &mut Schedule,
        voting: &mut VotingCoordinator,
        policy: &dyn SubstitutePolicy,
        sink: &dyn NotificationSink,
        config: &SolverConfig,
        now: DateTime<Utc>,
    ) -> Result<()> {
        voting.close_due(now);
        let ids: Vec<ReallocationId> = self.cases.keys().copied().collect();
        for id in ids {
            let case = self.cases.get_mut(&id).expect("case exists");
            if case.state.is_terminal() || !case.owns(schedule) {
                continue;
            }
            if let Err(e) = advance_case(case, domain, schedule, voting, policy, sink, config, now)
            {
                error!("Reallocation {id} failed to advance: {e}");
            }
        }
        Ok(())
    }
}

/// Runs a case forward until it resolves or parks on an open ballot.
#[allow(clippy::too_many_arguments)]
fn advance_case(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    voting: &mut VotingCoordinator,
    policy: &dyn SubstitutePolicy,
    sink: &dyn NotificationSink,
    config: &SolverConfig,
    now: DateTime<Utc>,
) -> Result<()> {
    loop {
        match case.state.clone() {
            ReallocState::Reported => {
                if !step1_direct_substitute(case, domain, schedule, policy, config, sink, now)? {
                    if !step2_section_peers(case, domain, schedule, policy, config, sink, now)? {
                        step3_open_ballot(case, domain, schedule, policy, voting, config, sink, now)?;
                    }
                }
            }
            ReallocState::AwaitingSubjectVote { ballot, candidate } => {
                if voting.ballot(ballot).map_or(false, |b| b.closed) {
                    let tally = voting.take_tally(ballot)?;
                    let carried = tally.carries(config.majority_tie_policy);
                    let inputs = json!({
                        "candidate": candidate,
                        "tally": tally,
                    });
                    if carried {
                        // The candidate may have been claimed by a
                        // competing case while the ballot was open; a
                        // conflict here is a failed remedy, not an
                        // error, and the ladder continues.
                        match apply_reassignment(schedule, case.event.assignment, candidate, config)
                        {
                            Ok(()) => {
                                case.append_log(
                                    3,
                                    "substitute_vote",
                                    inputs,
                                    format!("majority accepted substitute {candidate}"),
                                    now,
                                );
                                case.state = ReallocState::Resolved(Resolution::Reassigned {
                                    substitute: candidate,
                                });
                                sink.notify(
                                    &format!("faculty:{candidate}"),
                                    "substitute confirmed by student vote",
                                );
                            }
                            Err(SolverError::Conflict(reason)) => {
                                case.append_log(
                                    3,
                                    "substitute_vote",
                                    inputs,
                                    format!(
                                        "majority accepted substitute {candidate}, but {reason}"
                                    ),
                                    now,
                                );
                                if !step4_reschedule(case, domain, schedule, config, sink, now)? {
                                    step5_open_weekend_ballot(
                                        case, domain, schedule, voting, config, sink, now,
                                    )?;
                                }
                            }
                            Err(e) => return Err(e),
                        }
                    } else {
                        case.append_log(
                            3,
                            "substitute_vote",
                            inputs,
                            "no majority for substitute".to_string(),
                            now,
                        );
                        if !step4_reschedule(case, domain, schedule, config, sink, now)? {
                            step5_open_weekend_ballot(case, domain, schedule, voting, config, sink, now)?;
                        }
                    }
                }
            }
            ReallocState::AwaitingWeekendVote { ballot } => {
                if voting.ballot(ballot).map_or(false, |b| b.closed) {
                    let tally = voting.take_tally(ballot)?;
                    let carried = tally.carries(config.majority_tie_policy);
                    resolve_weekend_vote(case, domain, schedule, carried, tally, sink, now);
                }
            }
            ReallocState::Resolved(_) | ReallocState::Cancelled => {}
        }
        // Park unless a fresh transition left the case runnable.
        if !matches!(case.state, ReallocState::Reported) {
            return Ok(());
        }
    }
}

/// Step 1. The reporting faculty member may nominate a substitute; a
/// nominee who is free at the slot and agrees takes the class.
fn step1_direct_substitute(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    policy: &dyn SubstitutePolicy,
    config: &SolverConfig,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Result<bool> {
    let assignment = owned_assignment(schedule, case.event.assignment)?;
    let nominee = case.event.nominated_substitute;
    let inputs = json!({ "nominated": nominee });

    let accepted = nominee.is_some_and(|sub| {
        sub != case.event.faculty
            && candidate_is_free(domain, schedule, sub, assignment.slot)
            && policy.accepts(sub, &assignment)
    });

    if accepted {
        let sub = nominee.expect("accepted implies nominee");
        apply_reassignment(schedule, case.event.assignment, sub, config)?;
        case.append_log(
            1,
            "direct_substitute",
            inputs,
            format!("nominated substitute {sub} accepted"),
            now,
        );
        case.state = ReallocState::Resolved(Resolution::Reassigned { substitute: sub });
        sink.notify(&format!("faculty:{sub}"), "direct substitution confirmed");
        return Ok(true);
    }

    let outcome = match nominee {
        Some(sub) => format!("nominated substitute {sub} unavailable or declined"),
        None => "no substitute nominated".to_string(),
    };
    case.append_log(1, "direct_substitute", inputs, outcome, now);
    Ok(false)
}

/// Step 2. Faculty already teaching the same section, offered in
/// fairness order; the first to agree takes the class.
fn step2_section_peers(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    policy: &dyn SubstitutePolicy,
    config: &SolverConfig,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Result<bool> {
    let assignment = owned_assignment(schedule, case.event.assignment)?;
    let mut peers: Vec<FacultyId> = schedule
        .assignments_for_section(assignment.section)
        .iter()
        .map(|a| a.faculty)
        .filter(|&f| f != case.event.faculty)
        .collect();
    peers.sort_unstable();
    peers.dedup();
    peers.retain(|&f| candidate_is_free(domain, schedule, f, assignment.slot));
    let ranked = fairness::rank_candidates(&peers, schedule, domain);
    let inputs = json!({ "availablePeers": &ranked });

    for &peer in &ranked {
        sink.notify(&format!("faculty:{peer}"), "section peer substitution request");
        if policy.accepts(peer, &assignment) {
            apply_reassignment(schedule, case.event.assignment, peer, config)?;
            case.append_log(
                2,
                "section_peers",
                inputs,
                format!("section peer {peer} accepted"),
                now,
            );
            case.state = ReallocState::Resolved(Resolution::Reassigned { substitute: peer });
            return Ok(true);
        }
    }

    case.append_log(
        2,
        "section_peers",
        inputs,
        "no section peer available and willing".to_string(),
        now,
    );
    Ok(false)
}

/// Step 3, first half. Picks the best-ranked willing same-subject
/// candidate and puts them to the affected students; the case parks
/// until the ballot closes. An empty pool falls straight through to
/// step 4.
#[allow(clippy::too_many_arguments)]
fn step3_open_ballot(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    policy: &dyn SubstitutePolicy,
    voting: &mut VotingCoordinator,
    config: &SolverConfig,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Result<()> {
    let assignment = owned_assignment(schedule, case.event.assignment)?;
    let pool: Vec<FacultyId> = domain
        .faculty
        .iter()
        .filter(|f| f.id != case.event.faculty && f.is_qualified(assignment.course))
        .filter(|f| candidate_is_free(domain, schedule, f.id, assignment.slot))
        .map(|f| f.id)
        .collect();
    let ranked = fairness::rank_candidates(&pool, schedule, domain);
    let candidate = ranked.iter().copied().find(|&f| policy.accepts(f, &assignment));

    match candidate {
        Some(candidate) => {
            let voters: std::collections::BTreeSet<_> = domain
                .students_in_section(assignment.section)
                .iter()
                .map(|s| s.id)
                .collect();
            let deadline = now + Duration::hours(config.voting_deadline_hours);
            let ballot = voting.open_ballot(
                case.id,
                format!("Accept substitute faculty {candidate}?"),
                voters,
                deadline,
            );
            for student in voting.ballot(ballot).map(|b| b.eligible.clone()).unwrap_or_default() {
                sink.notify(&format!("student:{student}"), "substitute ballot opened");
            }
            case.state = ReallocState::AwaitingSubjectVote { ballot, candidate };
            Ok(())
        }
        None => {
            case.append_log(
                3,
                "same_subject_vote",
                json!({ "sameSubjectPool": ranked }),
                "no qualified same-subject candidate available".to_string(),
                now,
            );
            if !step4_reschedule(case, domain, schedule, config, sink, now)? {
                step5_open_weekend_ballot(case, domain, schedule, voting, config, sink, now)?;
            }
            Ok(())
        }
    }
}

/// Step 4. Looks for a weekday slot before the next checkpoint where
/// the faculty member, the room and the whole section are free.
fn step4_reschedule(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    config: &SolverConfig,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Result<bool> {
    let assignment = owned_assignment(schedule, case.event.assignment)?;
    let faculty = domain
        .faculty_member(assignment.faculty)
        .ok_or_else(|| SolverError::Internal(format!("faculty {} vanished", assignment.faculty)))?;

    let mut slots = domain.teaching_slots();
    slots.sort_unstable();
    let found = slots.into_iter().find(|&slot| {
        slot != assignment.slot
            && first_date_for_day(case.event.date, slot.day) < domain.checkpoint
            && faculty.is_available(slot)
            && schedule.is_faculty_free(assignment.faculty, slot)
            && schedule.is_room_free(assignment.room, slot)
            && schedule.is_section_free(assignment.section, slot)
    });
    let inputs = json!({
        "checkpoint": domain.checkpoint,
        "foundSlot": found,
    });

    match found {
        Some(slot) => {
            apply_reschedule(schedule, case.event.assignment, slot, config)?;
            case.append_log(
                4,
                "reschedule",
                inputs,
                format!("rescheduled to {slot} before checkpoint"),
                now,
            );
            case.state = ReallocState::Resolved(Resolution::Rescheduled { slot });
            sink.notify(&format!("faculty:{}", assignment.faculty), "class rescheduled");
            Ok(true)
        }
        None => {
            case.append_log(
                4,
                "reschedule",
                inputs,
                "no common free slot before checkpoint".to_string(),
                now,
            );
            Ok(false)
        }
    }
}

/// Step 5, first half. Asks the section whether a weekend makeup is
/// acceptable; the case parks until the ballot closes.
fn step5_open_weekend_ballot(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &Schedule,
    voting: &mut VotingCoordinator,
    config: &SolverConfig,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) -> Result<()> {
    let section = owned_assignment(schedule, case.event.assignment)?.section;
    let voters: std::collections::BTreeSet<_> =
        domain.students_in_section(section).iter().map(|s| s.id).collect();
    let deadline = now + Duration::hours(config.voting_deadline_hours);
    let ballot =
        voting.open_ballot(case.id, "Accept a weekend makeup class?", voters.clone(), deadline);
    for student in voters {
        sink.notify(&format!("student:{student}"), "weekend makeup ballot opened");
    }
    case.state = ReallocState::AwaitingWeekendVote { ballot };
    Ok(())
}

/// Step 5, second half: the weekend ballot closed.
fn resolve_weekend_vote(
    case: &mut ReallocationCase,
    domain: &DomainData,
    schedule: &mut Schedule,
    carried: bool,
    tally: crate::voting::VoteTally,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
) {
    let inputs = json!({ "tally": tally });
    if carried {
        let slot = find_weekend_slot(case, domain, schedule);
        match slot {
            Some(slot) => {
                case.append_log(
                    5,
                    "weekend_option",
                    inputs,
                    format!("weekend makeup approved at {slot}"),
                    now,
                );
                case.state = ReallocState::Resolved(Resolution::WeekendScheduled { slot });
                return;
            }
            None => {
                case.append_log(
                    5,
                    "weekend_option",
                    inputs,
                    "weekend approved but no weekend slot free; class dropped".to_string(),
                    now,
                );
            }
        }
    } else {
        case.append_log(
            5,
            "weekend_option",
            inputs,
            "weekend makeup declined; class dropped".to_string(),
            now,
        );
    }
    case.state = ReallocState::Resolved(Resolution::Dropped);
    sink.notify("registrar", "class dropped after exhausting remedies");
}

fn find_weekend_slot(
    case: &ReallocationCase,
    domain: &DomainData,
    schedule: &Schedule,
) -> Option<TimeSlot> {
    let assignment = schedule.assignment(case.event.assignment)?;
    let mut slots = domain.weekend_slots();
    slots.sort_unstable();
    slots.into_iter().find(|&slot| {
        schedule.is_room_free(assignment.room, slot)
            && schedule.is_section_free(assignment.section, slot)
    })
}

/// First calendar date strictly after `after` that falls on weekday
/// `day` (1 = Monday).
fn first_date_for_day(after: NaiveDate, day: u8) -> NaiveDate {
    let current = after.weekday().number_from_monday() as i64;
    let mut ahead = (i64::from(day) - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    after + Duration::days(ahead)
}

fn candidate_is_free(
    domain: &DomainData,
    schedule: &Schedule,
    faculty: FacultyId,
    slot: TimeSlot,
) -> bool {
    domain
        .faculty_member(faculty)
        .is_some_and(|f| f.is_available(slot))
        && schedule.is_faculty_free(faculty, slot)
}

fn owned_assignment(schedule: &Schedule, id: AssignmentId) -> Result<Assignment> {
    schedule
        .assignment(id)
        .cloned()
        .ok_or_else(|| SolverError::Input(format!("unknown assignment {id}")))
}

/// Optimistic update: re-reads the record, verifies the version and
/// the target's freedom, then commits with a version bump. Retries a
/// bounded number of times before surfacing the conflict.
fn apply_reassignment(
    schedule: &mut Schedule,
    id: AssignmentId,
    substitute: FacultyId,
    config: &SolverConfig,
) -> Result<()> {
    for attempt in 0..=config.max_conflict_retries {
        let current = owned_assignment(schedule, id)?;
        if !schedule.is_faculty_free(substitute, current.slot) {
            return Err(SolverError::Conflict(format!(
                "faculty {substitute} no longer free at {}",
                current.slot
            )));
        }
        let record = schedule
            .assignment_mut(id)
            .ok_or_else(|| SolverError::Input(format!("unknown assignment {id}")))?;
        if record.version == current.version {
            record.faculty = substitute;
            record.version += 1;
            debug!("Assignment {id} reassigned to faculty {substitute}");
            return Ok(());
        }
        debug!("Assignment {id} version moved; retry {attempt}");
    }
    Err(SolverError::Conflict(format!(
        "assignment {id} kept changing under reassignment"
    )))
}

/// Optimistic slot move, same protocol as [`apply_reassignment`].
fn apply_reschedule(
    schedule: &mut Schedule,
    id: AssignmentId,
    slot: TimeSlot,
    config: &SolverConfig,
) -> Result<()> {
    for attempt in 0..=config.max_conflict_retries {
        let current = owned_assignment(schedule, id)?;
        if !schedule.is_room_free(current.room, slot)
            || !schedule.is_section_free(current.section, slot)
        {
            return Err(SolverError::Conflict(format!("slot {slot} no longer free")));
        }
        let record = schedule
            .assignment_mut(id)
            .ok_or_else(|| SolverError::Input(format!("unknown assignment {id}")))?;
        if record.version == current.version {
            record.slot = slot;
            record.version += 1;
            debug!("Assignment {id} rescheduled to {slot}");
            return Ok(());
        }
        debug!("Assignment {id} version moved; retry {attempt}");
    }
    Err(SolverError::Conflict(format!(
        "assignment {id} kept changing under reschedule"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Assignment;

    fn two_at_same_slot() -> Schedule {
        let mut s = Schedule::new("inst-1", 3);
        s.assignments.push(Assignment {
            id: 1,
            course: 10,
            faculty: 1,
            room: 200,
            slot: TimeSlot::new(1, 1),
            section: 1,
            version: 0,
        });
        s.assignments.push(Assignment {
            id: 2,
            course: 11,
            faculty: 2,
            room: 201,
            slot: TimeSlot::new(1, 1),
            section: 2,
            version: 0,
        });
        s
    }

    #[test]
    fn reassignment_onto_busy_faculty_is_a_conflict() {
        let mut schedule = two_at_same_slot();
        let config = SolverConfig::default();
        // Faculty 2 already teaches at the slot of assignment 1.
        let result = apply_reassignment(&mut schedule, 1, 2, &config);
        assert!(matches!(result, Err(SolverError::Conflict(_))));
        assert_eq!(schedule.assignment(1).unwrap().faculty, 1);
        assert_eq!(schedule.assignment(1).unwrap().version, 0);
    }

    #[test]
    fn reassignment_commits_with_a_version_bump() {
        let mut schedule = two_at_same_slot();
        let config = SolverConfig::default();
        apply_reassignment(&mut schedule, 1, 3, &config).unwrap();
        let updated = schedule.assignment(1).unwrap();
        assert_eq!(updated.faculty, 3);
        assert_eq!(updated.version, 1);
    }

    #[test]
    fn reschedule_rejects_an_occupied_target_slot() {
        let mut schedule = two_at_same_slot();
        let config = SolverConfig::default();
        apply_reschedule(&mut schedule, 1, TimeSlot::new(2, 1), &config).unwrap();
        assert_eq!(schedule.assignment(1).unwrap().slot, TimeSlot::new(2, 1));
        assert_eq!(schedule.assignment(1).unwrap().version, 1);

        // Assignment 2's room is taken at the slot assignment 1 now
        // occupies.
        schedule.assignment_mut(2).unwrap().room = 200;
        let result = apply_reschedule(&mut schedule, 2, TimeSlot::new(2, 1), &config);
        assert!(matches!(result, Err(SolverError::Conflict(_))));
    }
}

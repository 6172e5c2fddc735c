//! Hard-constraint auditing and soft-constraint scoring.
//!
//! Hard constraints reject a candidate schedule outright; soft
//! constraints contribute weighted penalties that the optimizer
//! minimizes and that the score report itemizes.

use crate::config::SolverConfig;
use crate::data::{
    CourseId, DomainData, FacultyId, RoomId, Schedule, SectionId, TimeSlot,
};
use crate::electives::AllocationReport;
use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A violated hard constraint. Any one of these rejects the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HardViolation {
    FacultyDoubleBooked { faculty: FacultyId, slot: TimeSlot },
    RoomDoubleBooked { room: RoomId, slot: TimeSlot },
    SectionDoubleBooked { section: SectionId, slot: TimeSlot },
    UnqualifiedFaculty { faculty: FacultyId, course: CourseId },
    FacultyUnavailable { faculty: FacultyId, slot: TimeSlot },
    RoomOverCapacity { room: RoomId, course: CourseId },
    WeeklyHoursExceeded { faculty: FacultyId, hours: u32, max: u32 },
    /// No faculty on record is qualified for the course.
    NoQualifiedFaculty { course: CourseId },
    /// No room on record fits the course's category and headcount.
    NoAdequateRoom { course: CourseId },
    /// The constraints are jointly unsatisfiable even though every
    /// course is individually servable. Carries the backend's verdict.
    Unsatisfiable { detail: String },
}

impl fmt::Display for HardViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FacultyDoubleBooked { faculty, slot } => {
                write!(f, "faculty {faculty} double-booked at {slot}")
            }
            Self::RoomDoubleBooked { room, slot } => {
                write!(f, "room {room} double-booked at {slot}")
            }
            Self::SectionDoubleBooked { section, slot } => {
                write!(f, "section {section} double-booked at {slot}")
            }
            Self::UnqualifiedFaculty { faculty, course } => {
                write!(f, "faculty {faculty} not qualified for course {course}")
            }
            Self::FacultyUnavailable { faculty, slot } => {
                write!(f, "faculty {faculty} unavailable at {slot}")
            }
            Self::RoomOverCapacity { room, course } => {
                write!(f, "room {room} too small for course {course}")
            }
            Self::WeeklyHoursExceeded { faculty, hours, max } => {
                write!(f, "faculty {faculty} assigned {hours}h, max {max}h")
            }
            Self::NoQualifiedFaculty { course } => {
                write!(f, "no qualified faculty for course {course}")
            }
            Self::NoAdequateRoom { course } => {
                write!(f, "no adequate room for course {course}")
            }
            Self::Unsatisfiable { detail } => {
                write!(f, "constraints jointly unsatisfiable: {detail}")
            }
        }
    }
}

/// Describes a soft constraint that was not met in the final schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmetSoftConstraint {
    pub constraint_type: String,
    pub description: String,
}

impl fmt::Display for UnmetSoftConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.constraint_type, self.description)
    }
}

/// Weighted penalty components of a schedule. Lower is better.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub workload_penalty: f64,
    pub elective_penalty: f64,
    pub room_waste_penalty: f64,
    pub flexibility_penalty: f64,
    pub total_penalty: f64,
    pub unmet_soft_constraints: Vec<UnmetSoftConstraint>,
}

/// Checks structural solvability before any search: every course must
/// have at least one qualified faculty member and one adequate room.
pub fn audit_domain(domain: &DomainData) -> Vec<HardViolation> {
    let mut violations = Vec::new();
    for course in &domain.courses {
        if !domain.faculty.iter().any(|f| f.is_qualified(course.id)) {
            violations.push(HardViolation::NoQualifiedFaculty { course: course.id });
        }
        if !domain.rooms.iter().any(|r| r.suits(course)) {
            violations.push(HardViolation::NoAdequateRoom { course: course.id });
        }
    }
    violations
}

/// Audits a candidate schedule against every hard constraint.
///
/// An empty result means the candidate is acceptable.
pub fn audit_schedule(schedule: &Schedule, domain: &DomainData) -> Vec<HardViolation> {
    let mut violations = Vec::new();

    // Double bookings across the three exclusive dimensions.
    let mut faculty_seen: HashMap<(FacultyId, TimeSlot), u32> = HashMap::new();
    let mut room_seen: HashMap<(RoomId, TimeSlot), u32> = HashMap::new();
    let mut section_seen: HashMap<(SectionId, TimeSlot), u32> = HashMap::new();
    for a in &schedule.assignments {
        *faculty_seen.entry((a.faculty, a.slot)).or_insert(0) += 1;
        *room_seen.entry((a.room, a.slot)).or_insert(0) += 1;
        *section_seen.entry((a.section, a.slot)).or_insert(0) += 1;
    }
    for ((faculty, slot), n) in faculty_seen.into_iter().sorted() {
        if n > 1 {
            violations.push(HardViolation::FacultyDoubleBooked { faculty, slot });
        }
    }
    for ((room, slot), n) in room_seen.into_iter().sorted() {
        if n > 1 {
            violations.push(HardViolation::RoomDoubleBooked { room, slot });
        }
    }
    for ((section, slot), n) in section_seen.into_iter().sorted() {
        if n > 1 {
            violations.push(HardViolation::SectionDoubleBooked { section, slot });
        }
    }

    // Qualification, availability and capacity per assignment.
    for a in &schedule.assignments {
        if let Some(faculty) = domain.faculty_member(a.faculty) {
            if !faculty.is_qualified(a.course) {
                violations.push(HardViolation::UnqualifiedFaculty {
                    faculty: a.faculty,
                    course: a.course,
                });
            }
            if !faculty.is_available(a.slot) {
                violations.push(HardViolation::FacultyUnavailable {
                    faculty: a.faculty,
                    slot: a.slot,
                });
            }
        }
        if let (Some(room), Some(course)) = (domain.room(a.room), domain.course(a.course)) {
            if room.capacity < course.enrolled {
                violations.push(HardViolation::RoomOverCapacity {
                    room: a.room,
                    course: a.course,
                });
            }
        }
    }

    // Weekly hour caps.
    for (faculty_id, hours) in schedule.faculty_loads() {
        if let Some(faculty) = domain.faculty_member(faculty_id) {
            if hours > faculty.max_hours_per_week {
                violations.push(HardViolation::WeeklyHoursExceeded {
                    faculty: faculty_id,
                    hours,
                    max: faculty.max_hours_per_week,
                });
            }
        }
    }

    debug!(
        "Hard audit: {} assignment(s), {} violation(s)",
        schedule.assignments.len(),
        violations.len()
    );
    violations
}

/// Scores a feasible schedule against the four soft constraints.
///
/// `electives` supplies the preference-mismatch component; passing
/// `None` scores a schedule produced without elective allocation.
pub fn score_schedule(
    schedule: &Schedule,
    domain: &DomainData,
    config: &SolverConfig,
    electives: Option<&AllocationReport>,
) -> ScoreBreakdown {
    let mut unmet = Vec::new();

    // Faculty workload imbalance: population variance of weekly loads
    // against the mean, staffed faculty only.
    let loads = schedule.faculty_loads();
    let workload_penalty = if loads.is_empty() {
        0.0
    } else {
        let mean = loads.values().sum::<u32>() as f64 / loads.len() as f64;
        let variance = loads
            .values()
            .map(|&h| (h as f64 - mean).powi(2))
            .sum::<f64>()
            / loads.len() as f64;
        for (&faculty, &hours) in &loads {
            if (hours as f64 - mean).abs() > 2.0 {
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Balanced Workload".to_string(),
                    description: format!(
                        "Faculty {} carries {}h against a mean of {:.1}h",
                        faculty, hours, mean
                    ),
                });
            }
        }
        variance
    };

    // Elective preference mismatch: one minus the mean preference
    // score of the allocation run, zero when every student got rank 1.
    let elective_penalty = match electives {
        Some(report) => {
            let p = 1.0 - report.mean_preference_score();
            if report.unallocated.len() > 0 {
                unmet.push(UnmetSoftConstraint {
                    constraint_type: "Elective Preferences".to_string(),
                    description: format!(
                        "{} student(s) received no elective seat",
                        report.unallocated.len()
                    ),
                });
            }
            p
        }
        None => 0.0,
    };

    // Room utilization: mean empty-seat fraction over all assignments.
    let mut waste_sum = 0.0;
    let mut waste_n = 0u32;
    for a in &schedule.assignments {
        if let (Some(room), Some(course)) = (domain.room(a.room), domain.course(a.course)) {
            if room.capacity > 0 {
                let waste =
                    (room.capacity.saturating_sub(course.enrolled)) as f64 / room.capacity as f64;
                if waste > 0.5 {
                    unmet.push(UnmetSoftConstraint {
                        constraint_type: "Room Utilization".to_string(),
                        description: format!(
                            "Course {} fills under half of room {} ({}/{} seats)",
                            course.name, room.id, course.enrolled, room.capacity
                        ),
                    });
                }
                waste_sum += waste;
                waste_n += 1;
            }
        }
    }
    let room_waste_penalty = if waste_n == 0 { 0.0 } else { waste_sum / waste_n as f64 };

    // Curriculum flexibility: meetings of one course should spread
    // across distinct days; each same-day repeat is penalized.
    let mut flexibility_penalty = 0.0;
    let by_course = schedule
        .assignments
        .iter()
        .map(|a| (a.course, a.slot.day))
        .into_group_map();
    for (course, days) in by_course.into_iter().sorted() {
        let distinct = days.iter().unique().count();
        let repeats = days.len() - distinct;
        if repeats > 0 {
            flexibility_penalty += repeats as f64;
            let name = domain
                .course(course)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| course.to_string());
            unmet.push(UnmetSoftConstraint {
                constraint_type: "Spread Across Days".to_string(),
                description: format!(
                    "Course {} meets {} time(s) beyond once on the same day",
                    name, repeats
                ),
            });
        }
    }

    let total_penalty = config.faculty_workload_weight * workload_penalty
        + config.student_satisfaction_weight * elective_penalty
        + config.room_utilization_weight * room_waste_penalty
        + config.curriculum_flexibility_weight * flexibility_penalty;

    ScoreBreakdown {
        workload_penalty,
        elective_penalty,
        room_waste_penalty,
        flexibility_penalty,
        total_penalty,
        unmet_soft_constraints: unmet,
    }
}

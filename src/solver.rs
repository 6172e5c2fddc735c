//! ILP timetable optimizer on the HiGHS backend.
//!
//! Decision variable x(c,f,r,t) is 1 when course c is taught by
//! faculty f in room r at grid cell t. Candidate tuples are
//! pre-filtered so qualification, availability and capacity never
//! enter the model as explicit constraints; the remaining hard
//! constraints (occupancy, weekly hour caps, one faculty per course)
//! are linear. Soft constraints enter the objective with the
//! configured weights.

use crate::config::SolverConfig;
use crate::constraints::{self, ScoreBreakdown};
use crate::data::{
    Assignment, Course, CourseId, DomainData, FacultyId, RoomId, Schedule, TimeSlot,
};
use crate::electives::AllocationReport;
use crate::error::{Result, SolverError};
use good_lp::variable;
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
};
use itertools::Itertools;
use log::{info, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub schedule: Schedule,
    pub score: ScoreBreakdown,
    /// False when the time budget ran out before optimality was proven.
    pub is_optimal: bool,
    pub elapsed_seconds: f64,
}

/// Solves the timetabling problem for one (institute, semester).
///
/// Deterministic for identical input: candidates are enumerated in
/// lexicographic (course, faculty, room, slot) order, the backend runs
/// single-threaded with a fixed seed, and the extracted assignments
/// are sorted the same way.
pub fn solve(
    domain: &DomainData,
    config: &SolverConfig,
    electives: Option<&AllocationReport>,
) -> Result<SolveOutcome> {
    let start_time = Instant::now();
    validate_input(domain)?;

    let pre_audit = constraints::audit_domain(domain);
    if !pre_audit.is_empty() {
        return Err(SolverError::Infeasible { violations: pre_audit });
    }

    let course_map: HashMap<CourseId, &Course> =
        domain.courses.iter().map(|c| (c.id, c)).collect();
    let slots = domain.teaching_slots();

    // Pre-filter; implicitly handles qualification, availability,
    // room category and capacity.
    let mut candidates: Vec<(CourseId, FacultyId, RoomId, TimeSlot)> = Vec::new();
    for course in &domain.courses {
        for faculty in &domain.faculty {
            if !faculty.is_qualified(course.id) {
                continue;
            }
            for room in &domain.rooms {
                if !room.suits(course) {
                    continue;
                }
                for &slot in &slots {
                    if faculty.is_available(slot) {
                        candidates.push((course.id, faculty.id, room.id, slot));
                    }
                }
            }
        }
    }
    candidates.sort();
    trace!(
        "Generated {} candidate tuples out of a theoretical maximum of {}",
        candidates.len(),
        domain.courses.len() * domain.faculty.len() * domain.rooms.len() * slots.len()
    );

    // A course with zero candidates can never meet its weekly hours.
    for course in &domain.courses {
        let available = candidates.iter().filter(|(c, ..)| *c == course.id).count();
        if available < usize::from(course.hours_per_week) {
            return Err(SolverError::Infeasible {
                violations: vec![crate::constraints::HardViolation::NoQualifiedFaculty {
                    course: course.id,
                }],
            });
        }
    }

    info!(
        "Setting up ILP model: {} courses, {} faculty, {} rooms, {} slots, {} candidates",
        domain.courses.len(),
        domain.faculty.len(),
        domain.rooms.len(),
        slots.len(),
        candidates.len()
    );
    let mut problem = ProblemVariables::new();
    let vars = problem.add_vector(variable().binary(), candidates.len());

    // Index maps over candidate positions.
    let mut by_course: BTreeMap<CourseId, Vec<usize>> = BTreeMap::new();
    let mut by_course_faculty: BTreeMap<(CourseId, FacultyId), Vec<usize>> = BTreeMap::new();
    let mut by_faculty: BTreeMap<FacultyId, Vec<usize>> = BTreeMap::new();
    let mut by_faculty_slot: BTreeMap<(FacultyId, TimeSlot), Vec<usize>> = BTreeMap::new();
    let mut by_room_slot: BTreeMap<(RoomId, TimeSlot), Vec<usize>> = BTreeMap::new();
    let mut by_section_slot: BTreeMap<(u32, TimeSlot), Vec<usize>> = BTreeMap::new();
    let mut by_course_day: BTreeMap<(CourseId, u8), Vec<usize>> = BTreeMap::new();
    for (i, &(c, f, r, t)) in candidates.iter().enumerate() {
        let section = course_map[&c].section;
        by_course.entry(c).or_default().push(i);
        by_course_faculty.entry((c, f)).or_default().push(i);
        by_faculty.entry(f).or_default().push(i);
        by_faculty_slot.entry((f, t)).or_default().push(i);
        by_room_slot.entry((r, t)).or_default().push(i);
        by_section_slot.entry((section, t)).or_default().push(i);
        by_course_day.entry((c, t.day)).or_default().push(i);
    }
    let sum_of = |indices: &[usize]| -> Expression { indices.iter().map(|&i| vars[i]).sum() };

    // One faculty per course: selection binaries y(c,f) linked below.
    let mut selection: BTreeMap<(CourseId, FacultyId), Variable> = BTreeMap::new();
    for &(c, f) in by_course_faculty.keys() {
        selection.insert((c, f), problem.add(variable().binary()));
    }

    // Soft term: per-faculty deviation from the target weekly load.
    let target = domain
        .courses
        .iter()
        .map(|c| f64::from(c.hours_per_week))
        .sum::<f64>()
        / domain.faculty.len() as f64;
    let deviation: BTreeMap<FacultyId, Variable> = by_faculty
        .keys()
        .map(|&f| (f, problem.add(variable().min(0.0))))
        .collect();

    // Soft term: same-day repeats of one course.
    let clustering: BTreeMap<(CourseId, u8), Variable> = by_course_day
        .keys()
        .map(|&k| (k, problem.add(variable().min(0.0))))
        .collect();

    // Soft term: empty seats, fixed waste coefficient per candidate.
    let room_map: HashMap<RoomId, u32> =
        domain.rooms.iter().map(|r| (r.id, r.capacity)).collect();
    let waste: Expression = candidates
        .iter()
        .enumerate()
        .map(|(i, &(c, _, r, _))| {
            let cap = room_map[&r];
            let coef = if cap == 0 {
                0.0
            } else {
                (cap.saturating_sub(course_map[&c].enrolled)) as f64 / cap as f64
            };
            coef * vars[i]
        })
        .sum();

    let deviation_sum: Expression = deviation.values().map(|&v| v).sum();
    let clustering_sum: Expression = clustering.values().map(|&v| v).sum();
    let objective = config.faculty_workload_weight * deviation_sum
        + config.room_utilization_weight * waste
        + config.curriculum_flexibility_weight * clustering_sum;
    info!("Objective: weighted workload deviation, room waste and same-day clustering");

    let mut model = problem
        .minimise(objective)
        .using(default_solver)
        .set_option("threads", 1) // single thread for reproducibility
        .set_option("random_seed", 1234)
        .set_option("time_limit", config.solver_time_budget)
        .set_option("log_to_console", "false");

    // Every course meets exactly its weekly hours.
    for (course, indices) in &by_course {
        let hours = f64::from(course_map[course].hours_per_week);
        model.add_constraint(constraint!(sum_of(indices) == hours));
    }

    // One faculty teaches all meetings of a course.
    for (course, _) in &by_course {
        let chosen: Expression = selection
            .iter()
            .filter(|((c, _), _)| c == course)
            .map(|(_, &y)| y)
            .sum();
        model.add_constraint(constraint!(chosen == 1));
    }
    for ((c, f), indices) in &by_course_faculty {
        let y = selection[&(*c, *f)];
        let hours = f64::from(course_map[c].hours_per_week);
        model.add_constraint(constraint!(sum_of(indices) <= hours * y));
    }

    // No double-booking of faculty, rooms or section cohorts.
    for indices in by_faculty_slot.values() {
        model.add_constraint(constraint!(sum_of(indices) <= 1));
    }
    for indices in by_room_slot.values() {
        model.add_constraint(constraint!(sum_of(indices) <= 1));
    }
    for indices in by_section_slot.values() {
        model.add_constraint(constraint!(sum_of(indices) <= 1));
    }

    // Weekly hour caps.
    for (faculty, indices) in &by_faculty {
        let max = f64::from(
            domain
                .faculty_member(*faculty)
                .map(|f| f.max_hours_per_week)
                .unwrap_or(0),
        );
        model.add_constraint(constraint!(sum_of(indices) <= max));
    }

    // Deviation variables straddle the target load:
    // dev >= load - target and dev >= target - load.
    for (faculty, indices) in &by_faculty {
        let dev = deviation[faculty];
        let load = sum_of(indices);
        model.add_constraint(constraint!(load.clone() - dev <= target));
        model.add_constraint(constraint!(load + dev >= target));
    }

    // Clustering overflow: meetings of a course beyond one per day.
    for (key, indices) in &by_course_day {
        let over = clustering[key];
        model.add_constraint(constraint!(sum_of(indices) - over <= 1));
    }

    info!("Starting ILP solver (budget {:.0}s)...", config.solver_time_budget);
    let solution = match model.solve() {
        Ok(s) => s,
        Err(e) => {
            warn!("Solver returned no solution: {e}");
            let mut violations = constraints::audit_domain(domain);
            if violations.is_empty() {
                // Every course is individually servable; the courses
                // just cannot coexist. Surface the backend's verdict.
                violations.push(constraints::HardViolation::Unsatisfiable {
                    detail: e.to_string(),
                });
            }
            return Err(SolverError::Infeasible { violations });
        }
    };
    let elapsed_seconds = start_time.elapsed().as_secs_f64();
    let is_optimal = elapsed_seconds < config.solver_time_budget;
    if !is_optimal {
        warn!(
            "Time budget exhausted after {:.2}s; returning best candidate found",
            elapsed_seconds
        );
    }
    info!("Solution found in {:.2}s", elapsed_seconds);

    // Extract chosen tuples in deterministic order.
    let mut schedule = Schedule::new(domain.institute_id.clone(), domain.semester);
    schedule.is_optimal = is_optimal;
    let chosen = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| solution.value(vars[*i]) > 0.9)
        .map(|(_, &tuple)| tuple)
        .sorted();
    for (i, (course, faculty, room, slot)) in chosen.enumerate() {
        schedule.assignments.push(Assignment {
            id: i as u32 + 1,
            course,
            faculty,
            room,
            slot,
            section: course_map[&course].section,
            version: 0,
        });
    }

    let post_audit = constraints::audit_schedule(&schedule, domain);
    if !post_audit.is_empty() {
        return Err(SolverError::Internal(format!(
            "solver produced {} hard violation(s)",
            post_audit.len()
        )));
    }

    let score = constraints::score_schedule(&schedule, domain, config, electives);
    Ok(SolveOutcome { schedule, score, is_optimal, elapsed_seconds })
}

fn validate_input(domain: &DomainData) -> Result<()> {
    let mut missing = Vec::new();
    if domain.courses.is_empty() {
        missing.push("courses");
    }
    if domain.faculty.is_empty() {
        missing.push("faculty");
    }
    if domain.rooms.is_empty() {
        missing.push("rooms");
    }
    if domain.teaching_slots().is_empty() {
        missing.push("teaching slots");
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SolverError::Input(format!("domain has no {}", missing.join(", "))))
    }
}

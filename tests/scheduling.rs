//! End-to-end generation through the service facade, plus fairness
//! regression against the round-robin baseline.

use chrono::{NaiveDate, TimeZone, Utc};
use timetable_solver::constraints::audit_schedule;
use timetable_solver::realloc::AlwaysAccept;
use timetable_solver::service::{DomainLoader, LogSink, TimetableService};
use timetable_solver::{
    fairness, solver, Course, DomainData, Faculty, Result, Room, RoomType, SolverConfig,
    SolverError, Student, TimeSlot, UnavailabilityEvent,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct FixedLoader(DomainData);

impl DomainLoader for FixedLoader {
    fn load(&self, institute_id: &str, semester: u8) -> Result<DomainData> {
        if institute_id == self.0.institute_id && semester == self.0.semester {
            Ok(self.0.clone())
        } else {
            Err(SolverError::Input(format!("unknown institute {institute_id}")))
        }
    }
}

fn weekday_grid() -> Vec<TimeSlot> {
    let mut slots: Vec<TimeSlot> = (1..=5)
        .flat_map(|day| (1..=2).map(move |period| TimeSlot::new(day, period)))
        .collect();
    slots.push(TimeSlot::new(6, 1));
    slots
}

fn course(id: u32, name: &str, elective: bool) -> Course {
    Course {
        id,
        name: name.to_string(),
        section: 1,
        credits: 3,
        hours_per_week: 2,
        room_type: RoomType::Lecture,
        is_elective: elective,
        capacity: if elective { 10 } else { 0 },
        enrolled: if elective { 0 } else { 10 },
    }
}

/// One section, three two-hour courses, a generalist and a single-
/// subject specialist sharing the load.
fn small_domain() -> DomainData {
    let weekdays: Vec<TimeSlot> =
        weekday_grid().into_iter().filter(|s| !s.is_weekend()).collect();
    DomainData {
        institute_id: "inst-1".to_string(),
        semester: 3,
        students: (1..=10)
            .map(|id| Student { id, section: 1, semester: 3, preferences: vec![3] })
            .collect(),
        faculty: vec![
            Faculty {
                id: 1,
                subjects: [1, 2, 3].into_iter().collect(),
                max_hours_per_week: 10,
                available_slots: weekdays.iter().copied().collect(),
            },
            Faculty {
                id: 2,
                subjects: [1].into_iter().collect(),
                max_hours_per_week: 10,
                available_slots: weekdays.iter().copied().collect(),
            },
        ],
        rooms: vec![
            Room {
                id: 200,
                capacity: 40,
                room_type: RoomType::Lecture,
                building: "A".to_string(),
                floor: 1,
            },
            Room {
                id: 201,
                capacity: 40,
                room_type: RoomType::Lecture,
                building: "A".to_string(),
                floor: 2,
            },
        ],
        courses: vec![
            course(1, "Algebra", false),
            course(2, "Mechanics", false),
            course(3, "Photography", true),
        ],
        timeslots: weekday_grid(),
        checkpoint: NaiveDate::from_ymd_opt(2025, 4, 15).unwrap(),
    }
}

#[test]
fn generated_schedule_covers_courses_without_clashes() {
    init_logging();
    let mut service = TimetableService::new(
        FixedLoader(small_domain()),
        Box::new(LogSink),
        Box::new(AlwaysAccept),
    );
    let outcome = service
        .generate_schedule("inst-1", 3, SolverConfig::default())
        .unwrap();

    let schedule = &outcome.schedule;
    assert_eq!(schedule.assignments.len(), 6);
    for course_id in 1..=3 {
        let meetings = schedule
            .assignments
            .iter()
            .filter(|a| a.course == course_id)
            .count();
        assert_eq!(meetings, 2, "course {course_id} must meet twice a week");
    }
    assert!(audit_schedule(schedule, &small_domain()).is_empty());
    assert!(outcome.is_optimal);
    assert!(outcome.score.total_penalty.is_finite());
}

#[test]
fn fairness_report_reflects_elective_allocation() {
    init_logging();
    let mut service = TimetableService::new(
        FixedLoader(small_domain()),
        Box::new(LogSink),
        Box::new(AlwaysAccept),
    );
    service
        .generate_schedule("inst-1", 3, SolverConfig::default())
        .unwrap();

    let report = service.get_fairness_report("inst-1").unwrap();
    assert_eq!(report.semester, 3);
    assert_eq!(report.workload.loads.len(), 2);

    // All ten students ranked the one elective first, and it has ten
    // seats, so everyone lands in round one.
    let electives = report.electives.expect("elective summary present");
    assert_eq!(electives.allocation_rate, 1.0);
    assert_eq!(electives.placed_per_round[0], 10);
    assert_eq!(electives.unallocated_students, 0);
}

#[test]
fn service_drives_a_reported_absence_forward() {
    init_logging();
    let mut service = TimetableService::new(
        FixedLoader(small_domain()),
        Box::new(LogSink),
        Box::new(AlwaysAccept),
    );
    service
        .generate_schedule("inst-1", 3, SolverConfig::default())
        .unwrap();

    let (assignment, faculty) = {
        let schedule = service.schedule("inst-1", 3).expect("schedule installed");
        let a = &schedule.assignments[0];
        (a.id, a.faculty)
    };
    let id = service
        .report_unavailability("inst-1", 3, UnavailabilityEvent {
            faculty,
            assignment,
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            reason: "conference".to_string(),
            nominated_substitute: None,
        })
        .unwrap();

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
    service.poll(now).unwrap();
    let status = service.get_reallocation_status(id).unwrap();
    assert!(!status.log.is_empty(), "first poll must conclude at least one step");
}

#[test]
fn optimizer_beats_round_robin_on_workload_gini() {
    init_logging();
    let domain = small_domain();
    let outcome = solver::solve(&domain, &SolverConfig::default(), None).unwrap();

    let optimized = fairness::evaluate(&outcome.schedule, &domain);
    let baseline_schedule = fairness::round_robin_baseline(&domain);
    let baseline = fairness::evaluate(&baseline_schedule, &domain);

    assert!(
        optimized.gini <= baseline.gini + 1e-9,
        "optimized gini {} exceeded baseline {}",
        optimized.gini,
        baseline.gini
    );
}

struct TwoInstituteLoader(DomainData, DomainData);

impl DomainLoader for TwoInstituteLoader {
    fn load(&self, institute_id: &str, semester: u8) -> Result<DomainData> {
        [&self.0, &self.1]
            .into_iter()
            .find(|d| d.institute_id == institute_id && d.semester == semester)
            .cloned()
            .ok_or_else(|| SolverError::Input(format!("unknown institute {institute_id}")))
    }
}

#[test]
fn poll_routes_each_case_to_its_own_institute() {
    init_logging();
    let mut other = small_domain();
    other.institute_id = "inst-2".to_string();
    let mut service = TimetableService::new(
        TwoInstituteLoader(small_domain(), other),
        Box::new(LogSink),
        Box::new(AlwaysAccept),
    );
    service.generate_schedule("inst-1", 3, SolverConfig::default()).unwrap();
    service.generate_schedule("inst-2", 3, SolverConfig::default()).unwrap();

    // Identical inputs, so both schedules reuse the same assignment id
    // range; only the reported institute may change.
    let untouched = service.schedule("inst-1", 3).unwrap().assignments.clone();
    let (assignment, faculty) = {
        let schedule = service.schedule("inst-2", 3).unwrap();
        let a = &schedule.assignments[0];
        (a.id, a.faculty)
    };
    let id = service
        .report_unavailability("inst-2", 3, UnavailabilityEvent {
            faculty,
            assignment,
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            reason: "conference".to_string(),
            nominated_substitute: None,
        })
        .unwrap();

    service.poll(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap()).unwrap();

    assert_eq!(service.schedule("inst-1", 3).unwrap().assignments, untouched);
    let status = service.get_reallocation_status(id).unwrap();
    assert!(!status.log.is_empty(), "the reported institute's case must advance");
}

#[test]
fn regenerating_a_term_replays_the_same_elective_ledger() {
    init_logging();
    let mut domain = small_domain();
    domain.courses[2].capacity = 4;
    let mut service = TimetableService::new(
        FixedLoader(domain),
        Box::new(LogSink),
        Box::new(AlwaysAccept),
    );

    service.generate_schedule("inst-1", 3, SolverConfig::default()).unwrap();
    let first = service.elective_allocation("inst-1", 3).unwrap().clone();
    assert_eq!(first.allocations.len(), 4);

    // A re-run of the same term is a do-over, not a new term; nobody
    // accrues carry twice, so the same four students win the seats.
    service.generate_schedule("inst-1", 3, SolverConfig::default()).unwrap();
    let second = service.elective_allocation("inst-1", 3).unwrap();
    assert_eq!(second.allocations, first.allocations);
    assert_eq!(second.next_ledger.version, first.next_ledger.version);
}

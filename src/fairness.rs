//! Faculty workload evaluation: load variance, Gini inequality, and
//! substitute-candidate ranking.
//!
//! Consumed both by the optimizer (workload balance is a soft
//! objective term) and by the reallocation machinery (substitutes are
//! offered in fairness order). Scores here rank and advise; they never
//! reject a schedule on their own.

use crate::data::{DomainData, Faculty, FacultyId, Schedule, TimeSlot};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One faculty member's standing in the workload distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyLoad {
    pub faculty: FacultyId,
    pub hours: u32,
    pub target_hours: f64,
    pub deviation: f64,
}

/// Population-wide workload metrics for one schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReport {
    pub loads: Vec<FacultyLoad>,
    pub mean_hours: f64,
    pub variance: f64,
    pub gini: f64,
}

/// Gini coefficient of a load distribution: 0 for perfect equality,
/// approaching 1 as hours concentrate on few faculty.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let abs_diff_sum: f64 = values
        .iter()
        .flat_map(|a| values.iter().map(move |b| (a - b).abs()))
        .sum();
    abs_diff_sum / (2.0 * (n * n) as f64 * mean)
}

/// Evaluates the workload distribution of a schedule over every
/// faculty member in the domain, idle ones included.
pub fn evaluate(schedule: &Schedule, domain: &DomainData) -> WorkloadReport {
    let assigned = schedule.faculty_loads();
    let hours: BTreeMap<FacultyId, u32> = domain
        .faculty
        .iter()
        .map(|f| (f.id, assigned.get(&f.id).copied().unwrap_or(0)))
        .collect();

    let n = hours.len();
    let mean_hours = if n == 0 {
        0.0
    } else {
        hours.values().sum::<u32>() as f64 / n as f64
    };
    let variance = if n == 0 {
        0.0
    } else {
        hours
            .values()
            .map(|&h| (h as f64 - mean_hours).powi(2))
            .sum::<f64>()
            / n as f64
    };
    let values: Vec<f64> = hours.values().map(|&h| h as f64).collect();
    let g = gini(&values);

    let loads = hours
        .into_iter()
        .map(|(faculty, h)| FacultyLoad {
            faculty,
            hours: h,
            target_hours: mean_hours,
            deviation: h as f64 - mean_hours,
        })
        .collect();

    debug!(
        "Workload: {} faculty, mean {:.2}h, variance {:.3}, gini {:.3}",
        n, mean_hours, variance, g
    );
    WorkloadReport { loads, mean_hours, variance, gini: g }
}

/// Orders substitute candidates: lowest current load first, ties by
/// lowest marginal Gini contribution of adding one hour, then by id.
pub fn rank_candidates(
    pool: &[FacultyId],
    schedule: &Schedule,
    domain: &DomainData,
) -> Vec<FacultyId> {
    let assigned = schedule.faculty_loads();
    let base: Vec<(FacultyId, u32)> = domain
        .faculty
        .iter()
        .map(|f| (f.id, assigned.get(&f.id).copied().unwrap_or(0)))
        .collect();

    let marginal_gini = |candidate: FacultyId| -> f64 {
        let values: Vec<f64> = base
            .iter()
            .map(|&(id, h)| if id == candidate { (h + 1) as f64 } else { h as f64 })
            .collect();
        gini(&values)
    };

    let mut ranked: Vec<FacultyId> = pool.to_vec();
    ranked.sort_by(|&a, &b| {
        let load_a = assigned.get(&a).copied().unwrap_or(0);
        let load_b = assigned.get(&b).copied().unwrap_or(0);
        load_a
            .cmp(&load_b)
            .then_with(|| {
                marginal_gini(a)
                    .partial_cmp(&marginal_gini(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then(a.cmp(&b))
    });
    ranked
}

/// Naive round-robin schedule used as the fairness reference point:
/// course meetings are dealt to qualified faculty in rotation, rooms
/// and slots cycled by index, with no regard for conflicts. Only its
/// workload distribution is meaningful.
pub fn round_robin_baseline(domain: &DomainData) -> Schedule {
    let mut schedule = Schedule::new(domain.institute_id.clone(), domain.semester);
    let slots = domain.teaching_slots();
    if domain.faculty.is_empty() || domain.rooms.is_empty() || slots.is_empty() {
        return schedule;
    }

    let mut faculty: Vec<&Faculty> = domain.faculty.iter().collect();
    faculty.sort_by_key(|f| f.id);

    let mut rotation = 0usize;
    let mut cursor = 0usize;
    let mut next_id = 1;
    for course in domain.courses.iter() {
        for _ in 0..course.hours_per_week {
            // Next qualified faculty in rotation, if any.
            let pick = (0..faculty.len()).map(|k| (rotation + k) % faculty.len()).find(
                |&idx| faculty[idx].is_qualified(course.id),
            );
            let Some(idx) = pick else { continue };
            rotation = idx + 1;

            let room = &domain.rooms[cursor % domain.rooms.len()];
            let slot: TimeSlot = slots[cursor % slots.len()];
            cursor += 1;

            schedule.assignments.push(crate::data::Assignment {
                id: next_id,
                course: course.id,
                faculty: faculty[idx].id,
                room: room.id,
                slot,
                section: course.section,
                version: 0,
            });
            next_id += 1;
        }
    }
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Assignment, Course, Room, RoomType};
    use chrono::NaiveDate;
    use std::collections::BTreeSet;

    fn domain_with_loads() -> (DomainData, Schedule) {
        let slots: BTreeSet<TimeSlot> =
            (1..=5).flat_map(|d| (1..=6).map(move |p| TimeSlot::new(d, p))).collect();
        let faculty = vec![
            Faculty {
                id: 1,
                subjects: [10, 11].into_iter().collect(),
                max_hours_per_week: 20,
                available_slots: slots.clone(),
            },
            Faculty {
                id: 2,
                subjects: [10, 11].into_iter().collect(),
                max_hours_per_week: 20,
                available_slots: slots.clone(),
            },
            Faculty {
                id: 3,
                subjects: [10, 11].into_iter().collect(),
                max_hours_per_week: 20,
                available_slots: slots,
            },
        ];
        let domain = DomainData {
            institute_id: "inst-1".into(),
            semester: 1,
            students: vec![],
            faculty,
            rooms: vec![Room {
                id: 50,
                capacity: 100,
                room_type: RoomType::Lecture,
                building: "B".into(),
                floor: 2,
            }],
            courses: vec![
                Course {
                    id: 10,
                    name: "Signals".into(),
                    section: 1,
                    credits: 4,
                    hours_per_week: 3,
                    room_type: RoomType::Lecture,
                    is_elective: false,
                    capacity: 0,
                    enrolled: 40,
                },
                Course {
                    id: 11,
                    name: "Circuits".into(),
                    section: 2,
                    credits: 3,
                    hours_per_week: 3,
                    room_type: RoomType::Lecture,
                    is_elective: false,
                    capacity: 0,
                    enrolled: 40,
                },
            ],
            timeslots: (1..=6).flat_map(|d| (1..=6).map(move |p| TimeSlot::new(d, p))).collect(),
            checkpoint: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        };

        let mut schedule = Schedule::new("inst-1", 1);
        // Faculty 1 carries 3h, faculty 2 carries 1h, faculty 3 idle.
        for (i, slot) in [(1, 1), (2, 1), (3, 1)].iter().enumerate() {
            schedule.assignments.push(Assignment {
                id: i as u32 + 1,
                course: 10,
                faculty: 1,
                room: 50,
                slot: TimeSlot::new(slot.0, slot.1),
                section: 1,
                version: 0,
            });
        }
        schedule.assignments.push(Assignment {
            id: 4,
            course: 11,
            faculty: 2,
            room: 50,
            slot: TimeSlot::new(4, 1),
            section: 2,
            version: 0,
        });
        (domain, schedule)
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini(&[]), 0.0);
        assert_eq!(gini(&[4.0, 4.0, 4.0]), 0.0);
        let skewed = gini(&[12.0, 0.0, 0.0]);
        let flat = gini(&[4.0, 4.0, 4.0]);
        assert!(skewed > flat);
        assert!(skewed < 1.0);
    }

    #[test]
    fn evaluate_counts_idle_faculty() {
        let (domain, schedule) = domain_with_loads();
        let report = evaluate(&schedule, &domain);
        assert_eq!(report.loads.len(), 3);
        let idle = report.loads.iter().find(|l| l.faculty == 3).unwrap();
        assert_eq!(idle.hours, 0);
        assert!(report.gini > 0.0);
        assert!((report.mean_hours - 4.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn ranking_prefers_lowest_load() {
        let (domain, schedule) = domain_with_loads();
        let ranked = rank_candidates(&[1, 2, 3], &schedule, &domain);
        assert_eq!(ranked, vec![3, 2, 1]);
    }

    #[test]
    fn ranking_breaks_load_ties_by_id() {
        let (domain, schedule) = domain_with_loads();
        let ranked = rank_candidates(&[2, 3], &schedule, &domain);
        assert_eq!(ranked, vec![3, 2]);
    }

    #[test]
    fn baseline_spreads_meetings_round_robin() {
        let (domain, _) = domain_with_loads();
        let baseline = round_robin_baseline(&domain);
        assert_eq!(baseline.assignments.len(), 6);
        let loads = baseline.faculty_loads();
        // 6 meetings over 3 qualified faculty: 2 each.
        assert_eq!(loads.get(&1), Some(&2));
        assert_eq!(loads.get(&2), Some(&2));
        assert_eq!(loads.get(&3), Some(&2));
    }
}

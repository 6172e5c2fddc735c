use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// Type aliases for clarity
pub type StudentId = u32;
pub type FacultyId = u32;
pub type RoomId = u32;
pub type CourseId = u32;
pub type SectionId = u32;
pub type AssignmentId = u32;
pub type ReallocationId = u32;
pub type BallotId = u32;

/// A (day, period) cell on the fixed weekly grid. Days run 1 (Monday)
/// to 7 (Sunday); periods run 1..=N within a day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TimeSlot {
    pub day: u8,
    pub period: u8,
}

impl TimeSlot {
    pub fn new(day: u8, period: u8) -> Self {
        Self { day, period }
    }

    /// Saturday and Sunday slots are reserved for makeup classes.
    pub fn is_weekend(&self) -> bool {
        self.day >= 6
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} period {}", self.day, self.period)
    }
}

/// Represents a student with their ranked elective preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: StudentId,
    pub section: SectionId,
    pub semester: u8,
    /// Elective course ids in preference order; index 0 is rank 1.
    /// At most five entries are considered.
    pub preferences: Vec<CourseId>,
}

/// Represents a faculty member with their teaching constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: FacultyId,
    /// Course ids this faculty member is qualified to teach.
    pub subjects: BTreeSet<CourseId>,
    pub max_hours_per_week: u32,
    /// Grid cells where this faculty member can be scheduled.
    pub available_slots: BTreeSet<TimeSlot>,
}

impl Faculty {
    pub fn is_qualified(&self, course: CourseId) -> bool {
        self.subjects.contains(&course)
    }

    pub fn is_available(&self, slot: TimeSlot) -> bool {
        self.available_slots.contains(&slot)
    }
}

/// Room category, matched against the category a course requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomType {
    Lecture,
    Lab,
    Seminar,
    Auditorium,
}

/// Represents a physical room.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub capacity: u32,
    pub room_type: RoomType,
    pub building: String,
    pub floor: u8,
}

impl Room {
    /// A room suits a course when the category matches and every
    /// enrolled student has a seat.
    pub fn suits(&self, course: &Course) -> bool {
        self.room_type == course.room_type && self.capacity >= course.enrolled
    }
}

/// A course offering for one section cohort. Elective offerings carry a
/// seat capacity filled by the elective allocator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub section: SectionId,
    pub credits: u8,
    pub hours_per_week: u8,
    pub room_type: RoomType,
    pub is_elective: bool,
    /// Seat cap for electives; ignored for core courses.
    pub capacity: u32,
    /// Current enrolled headcount.
    pub enrolled: u32,
}

/// A single scheduled class: the unique (course, faculty, room, slot,
/// section) tuple. The version counter guards concurrent mutation
/// during reallocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: AssignmentId,
    pub course: CourseId,
    pub faculty: FacultyId,
    pub room: RoomId,
    pub slot: TimeSlot,
    pub section: SectionId,
    pub version: u32,
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "course {} by faculty {} in room {} at {}",
            self.course, self.faculty, self.room, self.slot
        )
    }
}

/// The full set of assignments for one (institute, semester).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub institute_id: String,
    pub semester: u8,
    pub assignments: Vec<Assignment>,
    pub created_at: DateTime<Utc>,
    /// False when the solver exhausted its time budget and returned the
    /// best candidate found so far.
    pub is_optimal: bool,
}

impl Schedule {
    pub fn new(institute_id: impl Into<String>, semester: u8) -> Self {
        Self {
            institute_id: institute_id.into(),
            semester,
            assignments: Vec::new(),
            created_at: Utc::now(),
            is_optimal: true,
        }
    }

    pub fn assignment(&self, id: AssignmentId) -> Option<&Assignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    pub fn assignment_mut(&mut self, id: AssignmentId) -> Option<&mut Assignment> {
        self.assignments.iter_mut().find(|a| a.id == id)
    }

    pub fn assignments_for_faculty(&self, faculty: FacultyId) -> Vec<&Assignment> {
        self.assignments.iter().filter(|a| a.faculty == faculty).collect()
    }

    pub fn assignments_for_section(&self, section: SectionId) -> Vec<&Assignment> {
        self.assignments.iter().filter(|a| a.section == section).collect()
    }

    pub fn is_faculty_free(&self, faculty: FacultyId, slot: TimeSlot) -> bool {
        !self
            .assignments
            .iter()
            .any(|a| a.faculty == faculty && a.slot == slot)
    }

    pub fn is_room_free(&self, room: RoomId, slot: TimeSlot) -> bool {
        !self.assignments.iter().any(|a| a.room == room && a.slot == slot)
    }

    pub fn is_section_free(&self, section: SectionId, slot: TimeSlot) -> bool {
        !self
            .assignments
            .iter()
            .any(|a| a.section == section && a.slot == slot)
    }

    /// Weekly teaching hours per faculty, counting one hour per
    /// occupied grid cell. Faculty without assignments are absent.
    pub fn faculty_loads(&self) -> BTreeMap<FacultyId, u32> {
        let mut loads = BTreeMap::new();
        for a in &self.assignments {
            *loads.entry(a.faculty).or_insert(0) += 1;
        }
        loads
    }
}

/// Everything the loader supplies for one (institute, semester).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainData {
    pub institute_id: String,
    pub semester: u8,
    pub students: Vec<Student>,
    pub faculty: Vec<Faculty>,
    pub rooms: Vec<Room>,
    pub courses: Vec<Course>,
    pub timeslots: Vec<TimeSlot>,
    /// Next institution-wide checkpoint (midterm or end-term). Pending
    /// reallocations must settle before this date.
    pub checkpoint: NaiveDate,
}

impl DomainData {
    pub fn course(&self, id: CourseId) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == id)
    }

    pub fn faculty_member(&self, id: FacultyId) -> Option<&Faculty> {
        self.faculty.iter().find(|f| f.id == id)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == id)
    }

    pub fn students_in_section(&self, section: SectionId) -> Vec<&Student> {
        self.students.iter().filter(|s| s.section == section).collect()
    }

    /// Weekday grid cells available to the optimizer.
    pub fn teaching_slots(&self) -> Vec<TimeSlot> {
        self.timeslots.iter().copied().filter(|t| !t.is_weekend()).collect()
    }

    /// Weekend grid cells reserved for makeup classes.
    pub fn weekend_slots(&self) -> Vec<TimeSlot> {
        self.timeslots.iter().copied().filter(|t| t.is_weekend()).collect()
    }
}

/// A reported absence of a faculty member for one scheduled class.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnavailabilityEvent {
    pub faculty: FacultyId,
    pub assignment: AssignmentId,
    pub date: NaiveDate,
    pub reason: String,
    /// Substitute suggested by the reporting faculty member, if any.
    pub nominated_substitute: Option<FacultyId>,
}

/// One append-only record of a remedy step taken for an unavailability
/// event. Step numbers strictly increase within an event and entries
/// are never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReallocationLogEntry {
    pub step: u8,
    pub action: String,
    /// Inputs the step considered, for audit (candidate pools, tallies).
    pub inputs: serde_json::Value,
    pub outcome: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schedule() -> Schedule {
        let mut s = Schedule::new("inst-1", 3);
        s.assignments.push(Assignment {
            id: 1,
            course: 10,
            faculty: 100,
            room: 200,
            slot: TimeSlot::new(1, 1),
            section: 1,
            version: 0,
        });
        s.assignments.push(Assignment {
            id: 2,
            course: 11,
            faculty: 100,
            room: 201,
            slot: TimeSlot::new(1, 2),
            section: 1,
            version: 0,
        });
        s.assignments.push(Assignment {
            id: 3,
            course: 12,
            faculty: 101,
            room: 200,
            slot: TimeSlot::new(2, 1),
            section: 2,
            version: 0,
        });
        s
    }

    #[test]
    fn occupancy_queries() {
        let s = sample_schedule();
        assert!(!s.is_faculty_free(100, TimeSlot::new(1, 1)));
        assert!(s.is_faculty_free(101, TimeSlot::new(1, 1)));
        assert!(!s.is_room_free(200, TimeSlot::new(2, 1)));
        assert!(s.is_room_free(201, TimeSlot::new(2, 1)));
        assert!(!s.is_section_free(1, TimeSlot::new(1, 2)));
        assert!(s.is_section_free(2, TimeSlot::new(1, 2)));
    }

    #[test]
    fn faculty_loads_count_grid_cells() {
        let s = sample_schedule();
        let loads = s.faculty_loads();
        assert_eq!(loads.get(&100), Some(&2));
        assert_eq!(loads.get(&101), Some(&1));
    }

    #[test]
    fn weekend_split() {
        assert!(TimeSlot::new(6, 1).is_weekend());
        assert!(!TimeSlot::new(5, 8).is_weekend());
    }

    #[test]
    fn room_suitability() {
        let room = Room {
            id: 1,
            capacity: 30,
            room_type: RoomType::Lecture,
            building: "A".into(),
            floor: 1,
        };
        let mut course = Course {
            id: 1,
            name: "Analysis".into(),
            section: 1,
            credits: 4,
            hours_per_week: 3,
            room_type: RoomType::Lecture,
            is_elective: false,
            capacity: 0,
            enrolled: 28,
        };
        assert!(room.suits(&course));
        course.enrolled = 31;
        assert!(!room.suits(&course));
        course.enrolled = 20;
        course.room_type = RoomType::Lab;
        assert!(!room.suits(&course));
    }
}

//! Constraint-based timetable generation and dynamic reallocation for
//! academic institutes.
//!
//! The crate has two halves. The optimization half builds a weekly
//! timetable as an integer linear program over candidate
//! (course, faculty, room, slot) tuples, with hard constraints for
//! double-booking, qualification, availability and capacity, and
//! weighted soft penalties for workload balance, elective preference
//! satisfaction, room fit and curriculum flexibility. Elective seats
//! are allocated before the solve in five preference rounds against a
//! versioned fairness ledger.
//!
//! The reallocation half reacts to faculty unavailability with a fixed
//! five-step escalation: nominated substitute, section-peer faculty,
//! subject-qualified faculty ratified by student vote, reschedule
//! before the semester checkpoint, weekend makeup ratified by vote.
//! Ballots are time-boxed and the whole machine advances on
//! [`TimetableService::poll`] rather than on timers of its own.
//!
//! [`TimetableService`] ties the pieces together behind the
//! [`DomainLoader`] and [`NotificationSink`] traits.

pub mod config;
pub mod constraints;
pub mod data;
pub mod electives;
pub mod error;
pub mod fairness;
pub mod realloc;
pub mod service;
pub mod solver;
pub mod voting;

pub use config::{SolverConfig, TiePolicy};
pub use constraints::{HardViolation, ScoreBreakdown, UnmetSoftConstraint};
pub use data::{
    Assignment, Course, DomainData, Faculty, Room, RoomType, Schedule, Student, TimeSlot,
    UnavailabilityEvent,
};
pub use electives::{AllocationReport, FairnessLedger};
pub use error::{Result, SolverError};
pub use fairness::WorkloadReport;
pub use realloc::{AlwaysAccept, ReallocState, ReallocationEngine, Resolution, SubstitutePolicy};
pub use service::{
    DomainLoader, FairnessReport, LogSink, NotificationSink, ReallocationStatus, TimetableService,
};
pub use solver::SolveOutcome;
pub use voting::{VoteTally, VotingCoordinator};

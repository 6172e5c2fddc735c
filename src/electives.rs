//! Priority-round elective allocation with a cross-term fairness ledger.
//!
//! Students submit up to five ranked elective choices. Allocation runs
//! one round per rank: every still-unplaced student bids for their
//! rank-k course, and when bids exceed remaining seats the ledger
//! decides. Students short-changed in earlier terms go first, then
//! ascending student id. The run never mutates its input ledger; it
//! returns the next version to persist for the following term.

use crate::data::{Course, CourseId, Student, StudentId};
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Preference score for receiving one's rank-k choice: 1.0 for rank 1
/// down to 0.2 for rank 5. Going without scores 0.
pub fn preference_score(rank: u8) -> f64 {
    debug_assert!((1..=5).contains(&rank));
    f64::from(6 - rank.min(5)) / 5.0
}

/// Per-student carry-forward record of prior allocation outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Allocation runs this student has participated in.
    pub runs: u32,
    /// Accumulated shortfall: sum over runs of (1 - preference score).
    /// Higher carry means worse past outcomes and earlier service now.
    pub carry: f64,
}

/// Versioned fairness ledger. Read-only input to an allocation run;
/// the run emits the successor version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessLedger {
    pub version: u32,
    pub entries: BTreeMap<StudentId, LedgerEntry>,
}

impl FairnessLedger {
    pub fn carry(&self, student: StudentId) -> f64 {
        self.entries.get(&student).map(|e| e.carry).unwrap_or(0.0)
    }
}

/// Outcome of one allocation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationReport {
    /// Elective seat granted per student.
    pub allocations: BTreeMap<StudentId, CourseId>,
    /// Preference rank (1..=5) each placed student received.
    pub received_rank: BTreeMap<StudentId, u8>,
    /// Students placed in each priority round, index 0 = rank 1.
    pub placed_per_round: [u32; 5],
    /// Placed students over students who listed any preference.
    pub allocation_rate: f64,
    pub unallocated: Vec<StudentId>,
    /// Successor ledger to persist for the next term.
    pub next_ledger: FairnessLedger,
}

impl AllocationReport {
    /// Mean preference score across every student who listed
    /// preferences; unplaced students contribute zero.
    pub fn mean_preference_score(&self) -> f64 {
        let participants = self.allocations.len() + self.unallocated.len();
        if participants == 0 {
            return 1.0;
        }
        let sum: f64 = self
            .received_rank
            .values()
            .map(|&rank| preference_score(rank))
            .sum();
        sum / participants as f64
    }
}

/// Allocates elective seats over five priority rounds.
///
/// Deterministic and idempotent: identical students, capacities and
/// ledger always produce an identical report.
pub fn allocate(
    students: &[Student],
    courses: &[Course],
    ledger: &FairnessLedger,
) -> AllocationReport {
    let mut remaining: BTreeMap<CourseId, u32> = courses
        .iter()
        .filter(|c| c.is_elective)
        .map(|c| (c.id, c.capacity))
        .collect();

    let participants: Vec<&Student> = students
        .iter()
        .filter(|s| !s.preferences.is_empty())
        .sorted_by_key(|s| s.id)
        .collect();
    info!(
        "Elective allocation: {} participant(s), {} elective course(s)",
        participants.len(),
        remaining.len()
    );

    let mut allocations: BTreeMap<StudentId, CourseId> = BTreeMap::new();
    let mut received_rank: BTreeMap<StudentId, u8> = BTreeMap::new();
    let mut placed_per_round = [0u32; 5];

    for round in 1..=5u8 {
        // Bids for this round, grouped per course in id order.
        let bids = participants
            .iter()
            .filter(|s| !allocations.contains_key(&s.id))
            .filter_map(|s| {
                s.preferences
                    .get(usize::from(round) - 1)
                    .map(|&course| (course, s.id))
            })
            .filter(|(course, _)| remaining.contains_key(course))
            .into_group_map();

        for (course, mut bidders) in bids.into_iter().sorted_by_key(|(c, _)| *c) {
            let seats = remaining.get_mut(&course).expect("bid on known course");
            if *seats == 0 {
                continue;
            }
            // Contested seats go to the highest carry first, ties by
            // ascending student id.
            bidders.sort_by(|a, b| {
                ledger
                    .carry(*b)
                    .partial_cmp(&ledger.carry(*a))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(b))
            });
            for student in bidders.into_iter().take(*seats as usize) {
                allocations.insert(student, course);
                received_rank.insert(student, round);
                placed_per_round[usize::from(round) - 1] += 1;
                *seats -= 1;
            }
        }
        debug!(
            "Round {}: {} placed so far",
            round,
            allocations.len()
        );
    }

    let unallocated: Vec<StudentId> = participants
        .iter()
        .map(|s| s.id)
        .filter(|id| !allocations.contains_key(id))
        .collect();
    let allocation_rate = if participants.is_empty() {
        1.0
    } else {
        allocations.len() as f64 / participants.len() as f64
    };

    // Successor ledger: every participant accrues this run's shortfall.
    let mut next_ledger = ledger.clone();
    next_ledger.version += 1;
    for s in &participants {
        let shortfall = match received_rank.get(&s.id) {
            Some(&rank) => 1.0 - preference_score(rank),
            None => 1.0,
        };
        let entry = next_ledger.entries.entry(s.id).or_default();
        entry.runs += 1;
        entry.carry += shortfall;
    }

    info!(
        "Elective allocation done: rate {:.2}, {} unplaced",
        allocation_rate,
        unallocated.len()
    );
    AllocationReport {
        allocations,
        received_rank,
        placed_per_round,
        allocation_rate,
        unallocated,
        next_ledger,
    }
}

//! Time-boxed student ballots with majority tallying.
//!
//! Ballots never block: they close when a poll observes that the
//! deadline has passed, and each tally is consumed exactly once by the
//! reallocation machinery.

use crate::config::TiePolicy;
use crate::data::{BallotId, ReallocationId, StudentId};
use crate::error::{Result, SolverError};
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Final vote counts of a closed ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub yes: u32,
    pub no: u32,
    pub total: u32,
}

impl VoteTally {
    /// Majority means strictly more yes than no. An exact tie falls to
    /// the configured policy; a ballot nobody voted on never carries.
    pub fn carries(&self, tie_policy: TiePolicy) -> bool {
        if self.yes > self.no {
            return true;
        }
        self.yes == self.no && self.total > 0 && tie_policy == TiePolicy::Accept
    }
}

/// A single yes/no ballot put to an eligible-voter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ballot {
    pub id: BallotId,
    pub reallocation: ReallocationId,
    pub question: String,
    pub eligible: BTreeSet<StudentId>,
    pub deadline: DateTime<Utc>,
    pub votes: BTreeMap<StudentId, bool>,
    pub closed: bool,
    consumed: bool,
}

impl Ballot {
    fn tally(&self) -> VoteTally {
        let yes = self.votes.values().filter(|&&v| v).count() as u32;
        let total = self.votes.len() as u32;
        VoteTally { yes, no: total - yes, total }
    }
}

/// Owns every ballot and enforces deadlines and one-shot consumption.
#[derive(Debug, Default)]
pub struct VotingCoordinator {
    ballots: BTreeMap<BallotId, Ballot>,
    next_id: BallotId,
}

impl VotingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_ballot(
        &mut self,
        reallocation: ReallocationId,
        question: impl Into<String>,
        eligible: BTreeSet<StudentId>,
        deadline: DateTime<Utc>,
    ) -> BallotId {
        self.next_id += 1;
        let id = self.next_id;
        let question = question.into();
        info!(
            "Ballot {} opened for reallocation {}: \"{}\", {} voter(s), closes {}",
            id,
            reallocation,
            question,
            eligible.len(),
            deadline
        );
        self.ballots.insert(
            id,
            Ballot {
                id,
                reallocation,
                question,
                eligible,
                deadline,
                votes: BTreeMap::new(),
                closed: false,
                consumed: false,
            },
        );
        id
    }

    pub fn ballot(&self, id: BallotId) -> Option<&Ballot> {
        self.ballots.get(&id)
    }

    /// Records a vote. Idempotent per voter: a later vote overwrites an
    /// earlier one. Ineligible voters and votes after the deadline are
    /// rejected without affecting the ballot.
    pub fn cast_vote(
        &mut self,
        ballot_id: BallotId,
        voter: StudentId,
        value: bool,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let ballot = self
            .ballots
            .get_mut(&ballot_id)
            .ok_or_else(|| SolverError::Voting(format!("unknown ballot {ballot_id}")))?;
        if ballot.closed || now >= ballot.deadline {
            warn!("Ballot {}: late vote from student {}", ballot_id, voter);
            return Err(SolverError::Voting(format!(
                "ballot {ballot_id} closed at {}",
                ballot.deadline
            )));
        }
        if !ballot.eligible.contains(&voter) {
            return Err(SolverError::Voting(format!(
                "student {voter} not eligible on ballot {ballot_id}"
            )));
        }
        ballot.votes.insert(voter, value);
        Ok(())
    }

    /// Closes every ballot whose deadline has passed and returns their
    /// ids. Poll-driven: call with the current time, nothing sleeps.
    pub fn close_due(&mut self, now: DateTime<Utc>) -> Vec<BallotId> {
        let mut closed = Vec::new();
        for ballot in self.ballots.values_mut() {
            if !ballot.closed && now >= ballot.deadline {
                ballot.closed = true;
                closed.push(ballot.id);
                info!(
                    "Ballot {} closed: {:?}",
                    ballot.id,
                    ballot.tally()
                );
            }
        }
        closed
    }

    /// Current counts, open or closed.
    pub fn tally(&self, ballot_id: BallotId) -> Result<VoteTally> {
        self.ballots
            .get(&ballot_id)
            .map(Ballot::tally)
            .ok_or_else(|| SolverError::Voting(format!("unknown ballot {ballot_id}")))
    }

    /// Final tally of a closed ballot, handed out exactly once.
    pub fn take_tally(&mut self, ballot_id: BallotId) -> Result<VoteTally> {
        let ballot = self
            .ballots
            .get_mut(&ballot_id)
            .ok_or_else(|| SolverError::Voting(format!("unknown ballot {ballot_id}")))?;
        if !ballot.closed {
            return Err(SolverError::State(format!("ballot {ballot_id} still open")));
        }
        if ballot.consumed {
            return Err(SolverError::State(format!(
                "tally of ballot {ballot_id} already consumed"
            )));
        }
        ballot.consumed = true;
        Ok(ballot.tally())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, hour, 0, 0).unwrap()
    }

    fn coordinator_with_ballot(voters: &[StudentId]) -> (VotingCoordinator, BallotId) {
        let mut c = VotingCoordinator::new();
        let id = c.open_ballot(1, "accept substitute?", voters.iter().copied().collect(), t(12));
        (c, id)
    }

    #[test]
    fn vote_overwrite_is_idempotent() {
        let (mut c, id) = coordinator_with_ballot(&[1, 2]);
        c.cast_vote(id, 1, true, t(1)).unwrap();
        c.cast_vote(id, 1, false, t(2)).unwrap();
        let tally = c.tally(id).unwrap();
        assert_eq!(tally, VoteTally { yes: 0, no: 1, total: 1 });
    }

    #[test]
    fn ineligible_and_late_votes_rejected() {
        let (mut c, id) = coordinator_with_ballot(&[1]);
        assert!(matches!(
            c.cast_vote(id, 99, true, t(1)),
            Err(SolverError::Voting(_))
        ));
        assert!(matches!(
            c.cast_vote(id, 1, true, t(13)),
            Err(SolverError::Voting(_))
        ));
        assert_eq!(c.tally(id).unwrap().total, 0);
    }

    #[test]
    fn close_due_is_poll_driven() {
        let (mut c, id) = coordinator_with_ballot(&[1]);
        assert!(c.close_due(t(11)).is_empty());
        assert_eq!(c.close_due(t(12)), vec![id]);
        // Already closed; nothing reported twice.
        assert!(c.close_due(t(13)).is_empty());
    }

    #[test]
    fn tally_consumed_exactly_once() {
        let (mut c, id) = coordinator_with_ballot(&[1, 2, 3]);
        c.cast_vote(id, 1, true, t(1)).unwrap();
        c.cast_vote(id, 2, true, t(1)).unwrap();
        c.cast_vote(id, 3, false, t(1)).unwrap();

        assert!(matches!(c.take_tally(id), Err(SolverError::State(_))));
        c.close_due(t(12));
        let tally = c.take_tally(id).unwrap();
        assert_eq!(tally, VoteTally { yes: 2, no: 1, total: 3 });
        assert!(matches!(c.take_tally(id), Err(SolverError::State(_))));
    }

    #[test]
    fn tie_falls_to_policy() {
        let tie = VoteTally { yes: 5, no: 5, total: 10 };
        assert!(!tie.carries(TiePolicy::Reject));
        assert!(tie.carries(TiePolicy::Accept));
        // An empty ballot never carries, whatever the policy.
        let empty = VoteTally { yes: 0, no: 0, total: 0 };
        assert!(!empty.carries(TiePolicy::Accept));
    }

    proptest! {
        /// For any N voters with Y yes votes, the ballot carries under
        /// the default policy iff Y > N - Y.
        #[test]
        fn majority_iff_yes_exceeds_no(n in 0u32..200, y_seed in 0u32..200) {
            let y = if n == 0 { 0 } else { y_seed % (n + 1) };
            let tally = VoteTally { yes: y, no: n - y, total: n };
            prop_assert_eq!(tally.carries(TiePolicy::Reject), y > n - y);
        }
    }
}

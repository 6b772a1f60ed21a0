//! Candidates as reported by the election contract.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::Account;
use crate::error::TypesError;

/// Index of a candidate in the contract's registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CandidateId(u64);

impl CandidateId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }

    /// Parse user input and check it against the number of known candidates.
    ///
    /// Accepts only a plain non-negative integer (surrounding whitespace is
    /// ignored) strictly below `candidate_count`.
    pub fn parse_bounded(input: &str, candidate_count: usize) -> Result<Self, TypesError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TypesError::InvalidCandidateId("no candidate id given".into()));
        }
        let id: u64 = trimmed
            .parse()
            .map_err(|_| TypesError::InvalidCandidateId(format!("{trimmed:?} is not an integer")))?;
        if id >= candidate_count as u64 {
            return Err(TypesError::InvalidCandidateId(format!(
                "{id} is out of range, {candidate_count} candidates registered"
            )));
        }
        Ok(Self(id))
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered candidate and its current tally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: u64,
    pub candidate_address: Account,
    pub votes: u64,
}

/// Point-in-time view of the candidate list.
///
/// Always replaced as a whole; `is_loading` is set while at least one fetch
/// is outstanding.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSnapshot {
    pub candidates: Vec<Candidate>,
    pub is_loading: bool,
}

impl CandidateSnapshot {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Total number of votes across all candidates.
    pub fn total_votes(&self) -> u64 {
        self.candidates
            .iter()
            .fold(0u64, |total, c| total.saturating_add(c.votes))
    }

    /// The candidate with the most votes; ties go to the lowest id.
    pub fn leader(&self) -> Option<&Candidate> {
        self.candidates
            .iter()
            .max_by(|a, b| a.votes.cmp(&b.votes).then(b.candidate_id.cmp(&a.candidate_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64, votes: u64) -> Candidate {
        Candidate {
            candidate_id: id,
            candidate_address: Account::from_bytes([id as u8; 20]),
            votes,
        }
    }

    #[test]
    fn parse_bounded_accepts_in_range() {
        assert_eq!(CandidateId::parse_bounded("0", 3).unwrap(), CandidateId::new(0));
        assert_eq!(CandidateId::parse_bounded(" 2 ", 3).unwrap(), CandidateId::new(2));
    }

    #[test]
    fn parse_bounded_rejects_bad_input() {
        for input in ["", "   ", "-1", "1.5", "abc", "3", "5", "0x1"] {
            assert!(
                CandidateId::parse_bounded(input, 3).is_err(),
                "{input:?} should be rejected"
            );
        }
        assert!(CandidateId::parse_bounded("0", 0).is_err());
    }

    #[test]
    fn leader_prefers_lowest_id_on_tie() {
        let snapshot = CandidateSnapshot {
            candidates: vec![candidate(0, 4), candidate(1, 7), candidate(2, 7)],
            is_loading: false,
        };
        assert_eq!(snapshot.leader().unwrap().candidate_id, 1);
        assert_eq!(snapshot.total_votes(), 18);
        assert!(CandidateSnapshot::default().leader().is_none());
    }

    #[test]
    fn total_votes_saturates() {
        let snapshot = CandidateSnapshot {
            candidates: vec![candidate(0, u64::MAX), candidate(1, 1)],
            is_loading: false,
        };
        assert_eq!(snapshot.total_votes(), u64::MAX);
    }
}

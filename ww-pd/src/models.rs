//! Prediction model and lifecycle state machine

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a prediction row.
///
/// Forward-only: `predicted -> candidate -> verified`. Any state may fall to
/// `failed` when every source is exhausted; `failed` may be retried back to
/// `predicted`. A `verified` row never moves backwards without force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Predicted,
    Candidate,
    Verified,
    Failed,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionStatus::Predicted => "predicted",
            PredictionStatus::Candidate => "candidate",
            PredictionStatus::Verified => "verified",
            PredictionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "predicted" => Some(PredictionStatus::Predicted),
            "candidate" => Some(PredictionStatus::Candidate),
            "verified" => Some(PredictionStatus::Verified),
            "failed" => Some(PredictionStatus::Failed),
            _ => None,
        }
    }

    /// Transition table. `failed -> predicted` is only legal with force,
    /// handled by the caller; it is not part of the unforced table.
    pub fn can_transition_to(self, next: PredictionStatus) -> bool {
        use PredictionStatus::*;
        match (self, next) {
            (Predicted, Candidate) => true,
            (Predicted, Verified) => true,
            (Candidate, Verified) => true,
            (_, Failed) => true,
            _ => false,
        }
    }
}

/// Derived, non-authoritative hints for a known answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hints {
    pub category: Option<String>,
    /// Rough difficulty in [0,1], from letter frequency and repeats
    pub difficulty: f64,
    pub first_letter: char,
    pub last_letter: char,
    pub vowel_count: usize,
    pub clues: Vec<String>,
}

/// One prediction row, keyed by game number
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub game_number: i64,
    pub date: NaiveDate,
    pub predicted_word: Option<String>,
    pub verified_word: Option<String>,
    pub status: PredictionStatus,
    pub confidence_score: f64,
    pub verification_sources: Vec<String>,
    pub hints: Option<Hints>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prediction {
    /// The word a reader should be shown: verified if present, else predicted
    pub fn display_word(&self) -> Option<&str> {
        self.verified_word
            .as_deref()
            .or(self.predicted_word.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PredictionStatus::*;

    #[test]
    fn forward_transitions_allowed() {
        assert!(Predicted.can_transition_to(Candidate));
        assert!(Predicted.can_transition_to(Verified));
        assert!(Candidate.can_transition_to(Verified));
    }

    #[test]
    fn any_state_may_fail() {
        for s in [Predicted, Candidate, Verified, Failed] {
            assert!(s.can_transition_to(Failed));
        }
    }

    #[test]
    fn backward_transitions_rejected() {
        assert!(!Verified.can_transition_to(Predicted));
        assert!(!Verified.can_transition_to(Candidate));
        assert!(!Candidate.can_transition_to(Predicted));
        // failed -> predicted requires force, so the unforced table rejects it
        assert!(!Failed.can_transition_to(Predicted));
    }

    #[test]
    fn status_round_trips_through_text() {
        for s in [Predicted, Candidate, Verified, Failed] {
            assert_eq!(PredictionStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(PredictionStatus::parse("bogus"), None);
    }
}

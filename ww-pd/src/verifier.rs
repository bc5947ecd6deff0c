//! Verifier: consensus over collection results
//!
//! Consensus requires at least two independent sources agreeing on the same
//! word for the same game number. A single source is never enough to verify,
//! and a tie between largest groups always falls back to the
//! highest-priority source's word at lowered confidence, leaving the row a
//! candidate for the next verification cycle.

use crate::types::CollectionResult;
use serde::Serialize;
use thiserror::Error;
use std::collections::HashMap;

/// Minimum confidence for a row to be marked verified
pub const VERIFICATION_THRESHOLD: f64 = 0.5;

/// Confidence assigned when only one source produced a word
pub const SINGLE_SOURCE_CONFIDENCE: f64 = 0.4;

/// Confidence assigned when sources disagree with no majority
pub const CONFLICT_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Error, PartialEq)]
pub enum VerifyError {
    /// Every queried source failed
    #[error("no data available from any source")]
    NoDataAvailable,

    /// Sources agree on a word but disagree on the game number; a
    /// data-integrity anomaly that must be surfaced, never resolved silently
    #[error("game number mismatch for word {word}: sources reported {game_numbers:?}")]
    GameNumberMismatch {
        word: String,
        game_numbers: Vec<i64>,
    },
}

/// Verification decision for one game number
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VerificationOutcome {
    pub game_number: i64,
    pub word: String,
    pub verified: bool,
    pub confidence: f64,
    /// Sources that contributed to this outcome, chain priority order
    pub sources: Vec<String>,
}

/// Apply the consensus rule to one batch of collection results.
///
/// `results` must all refer to the same date; total queried source count is
/// the batch length, successes or not.
pub fn verify(results: &[CollectionResult]) -> Result<VerificationOutcome, VerifyError> {
    let total = results.len();
    let successes: Vec<&CollectionResult> = results
        .iter()
        .filter(|r| r.success && r.word.is_some() && r.game_number.is_some())
        .collect();

    match successes.len() {
        0 => Err(VerifyError::NoDataAvailable),
        1 => {
            let only = successes[0];
            Ok(VerificationOutcome {
                game_number: only.game_number.unwrap(),
                word: only.word.clone().unwrap(),
                verified: false,
                confidence: SINGLE_SOURCE_CONFIDENCE,
                sources: vec![only.source_id.clone()],
            })
        }
        _ => verify_multi(&successes, total),
    }
}

fn verify_multi(
    successes: &[&CollectionResult],
    total: usize,
) -> Result<VerificationOutcome, VerifyError> {
    // Group successes by word, preserving first-seen (priority) order
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&CollectionResult>> = HashMap::new();
    for r in successes {
        let word = r.word.as_deref().unwrap();
        if !groups.contains_key(word) {
            order.push(word);
        }
        groups.entry(word).or_default().push(r);
    }

    let largest = order
        .iter()
        .map(|w| groups[w].len())
        .max()
        .unwrap_or(0);
    let tied = order.iter().filter(|w| groups[**w].len() == largest).count() > 1;

    if largest >= 2 && !tied {
        let word = *order
            .iter()
            .find(|w| groups[**w].len() == largest)
            .unwrap();
        let agreeing = &groups[word];

        // Agreeing sources must also agree on the game number
        let mut numbers: Vec<i64> = agreeing
            .iter()
            .map(|r| r.game_number.unwrap())
            .collect();
        numbers.sort_unstable();
        numbers.dedup();
        if numbers.len() > 1 {
            return Err(VerifyError::GameNumberMismatch {
                word: word.to_string(),
                game_numbers: numbers,
            });
        }

        let confidence = agreeing.len() as f64 / total as f64;
        if confidence >= VERIFICATION_THRESHOLD {
            let mut sources: Vec<String> =
                agreeing.iter().map(|r| r.source_id.clone()).collect();
            sources.dedup();
            return Ok(VerificationOutcome {
                game_number: numbers[0],
                word: word.to_string(),
                verified: true,
                confidence,
                sources,
            });
        }
    }

    // Tie or no word shared by two sources: trust the highest-priority
    // success at lowered confidence; the row stays a candidate and is
    // re-verified on the next cycle.
    let top = successes[0];
    Ok(VerificationOutcome {
        game_number: top.game_number.unwrap(),
        word: top.word.clone().unwrap(),
        verified: false,
        confidence: CONFLICT_CONFIDENCE,
        sources: vec![top.source_id.clone()],
    })
}

/// Manual verification: re-run the agreement rule over previously recorded
/// results, restricted to an operator-supplied source list. No network I/O.
pub fn verify_manual(
    game_number: i64,
    source_ids: &[String],
    recorded: &[CollectionResult],
) -> Result<VerificationOutcome, VerifyError> {
    let selected: Vec<CollectionResult> = recorded
        .iter()
        .filter(|r| {
            r.game_number == Some(game_number) && source_ids.iter().any(|s| *s == r.source_id)
        })
        .cloned()
        .collect();

    if selected.is_empty() {
        return Err(VerifyError::NoDataAvailable);
    }
    verify(&selected)
}

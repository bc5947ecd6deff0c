//! Hint derivation for a known answer
//!
//! Hints are derived, never authoritative: they are recomputed from the
//! word itself and stored alongside the prediction for the presentation
//! layer to use.

use crate::models::Hints;

const VOWELS: &[char] = &['A', 'E', 'I', 'O', 'U'];

// Rough frequency rank of letters in common English words, most frequent
// first. Letters late in this string make a word harder to guess.
const FREQUENCY_ORDER: &str = "EARIOTNSLCUDPMHGBFYWKVXZJQ";

/// Derive hints for an uppercase 5-letter answer
pub fn derive_hints(word: &str) -> Hints {
    let letters: Vec<char> = word.chars().collect();
    let vowel_count = letters.iter().filter(|c| VOWELS.contains(c)).count();
    let has_repeat = (1..letters.len()).any(|i| letters[..i].contains(&letters[i]));

    let first_letter = letters.first().copied().unwrap_or('?');
    let last_letter = letters.last().copied().unwrap_or('?');

    let mut clues = vec![
        format!("Starts with the letter {}", first_letter),
        format!("Ends with the letter {}", last_letter),
        format!(
            "Contains {} vowel{}",
            vowel_count,
            if vowel_count == 1 { "" } else { "s" }
        ),
    ];
    if has_repeat {
        clues.push("Has at least one repeated letter".to_string());
    }

    Hints {
        category: None,
        difficulty: difficulty_score(&letters, has_repeat),
        first_letter,
        last_letter,
        vowel_count,
        clues,
    }
}

/// Difficulty in [0,1]: mean frequency rank of the letters, bumped for
/// repeats (repeats mislead guess allocation).
fn difficulty_score(letters: &[char], has_repeat: bool) -> f64 {
    if letters.is_empty() {
        return 0.0;
    }
    let rank_sum: f64 = letters
        .iter()
        .map(|c| {
            FREQUENCY_ORDER
                .find(*c)
                .map(|i| i as f64 / (FREQUENCY_ORDER.len() - 1) as f64)
                .unwrap_or(1.0)
        })
        .sum();
    let base = rank_sum / letters.len() as f64;
    let bumped = if has_repeat { base + 0.15 } else { base };
    bumped.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_hints_for_imbue() {
        let hints = derive_hints("IMBUE");
        assert_eq!(hints.first_letter, 'I');
        assert_eq!(hints.last_letter, 'E');
        assert_eq!(hints.vowel_count, 3);
        assert!(hints.clues.iter().any(|c| c.contains("3 vowels")));
        assert!(hints.difficulty >= 0.0 && hints.difficulty <= 1.0);
    }

    #[test]
    fn repeated_letters_raise_difficulty_and_add_clue() {
        let plain = derive_hints("NOMAD");
        let repeated = derive_hints("MAMMA");
        assert!(repeated.difficulty > plain.difficulty);
        assert!(repeated
            .clues
            .iter()
            .any(|c| c.contains("repeated letter")));
        assert!(!plain.clues.iter().any(|c| c.contains("repeated letter")));
    }

    #[test]
    fn rare_letters_are_harder_than_common_ones() {
        assert!(derive_hints("JAZZY").difficulty > derive_hints("ARISE").difficulty);
    }
}

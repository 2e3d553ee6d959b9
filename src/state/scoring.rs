//! Round and cumulative scoring rules.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::state::session::TeamId;

/// Apply a signed delta to a score, never going below zero.
pub fn apply_delta(current: u32, delta: i32) -> u32 {
    let next = i64::from(current) + i64::from(delta);
    next.clamp(0, i64::from(u32::MAX)) as u32
}

/// Canonical form of a claimed word: trimmed, inner whitespace collapsed, lower-cased.
pub fn normalize_word(word: &str) -> String {
    word.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// De-duplicate a raw word list the way claims are stored.
pub fn claim_set<I, S>(words: I) -> IndexSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    words
        .into_iter()
        .map(|word| normalize_word(word.as_ref()))
        .filter(|word| !word.is_empty())
        .collect()
}

/// Count, for every team, the claimed words no other team claimed.
///
/// The frequency table is built from all teams' de-duplicated claims before any
/// team is scored, so the result does not depend on iteration order. Teams present in
/// `claims` always get an entry, possibly zero.
pub fn unique_word_counts(claims: &IndexMap<TeamId, IndexSet<String>>) -> IndexMap<TeamId, u32> {
    let mut frequency: HashMap<&str, u32> = HashMap::new();
    for words in claims.values() {
        for word in words {
            *frequency.entry(word.as_str()).or_default() += 1;
        }
    }

    claims
        .iter()
        .map(|(team_id, words)| {
            let unique = words
                .iter()
                .filter(|word| frequency.get(word.as_str()) == Some(&1))
                .count() as u32;
            (team_id.clone(), unique)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(entries: &[(&str, &[&str])]) -> IndexMap<TeamId, IndexSet<String>> {
        entries
            .iter()
            .map(|(team, words)| (team.to_string(), claim_set(words.iter())))
            .collect()
    }

    #[test]
    fn words_shared_between_teams_score_for_nobody() {
        let claims = claims(&[
            ("T1", &["cat", "dog"]),
            ("T2", &["dog", "bird"]),
            ("T3", &["cat"]),
        ]);

        let counts = unique_word_counts(&claims);
        assert_eq!(counts["T1"], 0);
        assert_eq!(counts["T2"], 1);
        assert_eq!(counts["T3"], 0);
    }

    #[test]
    fn duplicates_within_a_team_count_once() {
        let claims = claims(&[("A", &["Cat", "cat ", "  CAT"]), ("B", &["dog"])]);
        assert_eq!(claims["A"].len(), 1);

        let counts = unique_word_counts(&claims);
        assert_eq!(counts["A"], 1);
        assert_eq!(counts["B"], 1);
    }

    #[test]
    fn teams_without_claims_score_zero() {
        let claims = claims(&[("A", &[]), ("B", &["sun", "moon"])]);
        let counts = unique_word_counts(&claims);
        assert_eq!(counts["A"], 0);
        assert_eq!(counts["B"], 2);
    }

    #[test]
    fn delta_is_floored_at_zero() {
        assert_eq!(apply_delta(2, -5), 0);
        assert_eq!(apply_delta(2, 3), 5);
        assert_eq!(apply_delta(0, -1), 0);
    }

    #[test]
    fn normalization_collapses_whitespace() {
        assert_eq!(normalize_word("  Ice   Cream "), "ice cream");
        assert!(claim_set(["   ", ""]).is_empty());
    }
}

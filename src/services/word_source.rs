//! Words handed to the active party during a round.

use std::collections::HashSet;

use dashmap::DashMap;
use rand::seq::IndexedRandom;

/// A word to explain, with the bank category it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Text shown to the active party.
    pub text: String,
    /// Bank category; `None` for room specific words.
    pub category: Option<String>,
}

/// Source of words for rooms.
pub trait WordSource: Send + Sync {
    /// Draw a word for `room`, preferring words the room has not seen yet.
    ///
    /// `custom_words` replace the bank when non-empty; otherwise `categories` filter it,
    /// falling back to the whole bank when the filter matches nothing.
    fn next_word(&self, room: &str, categories: &[String], custom_words: &[String])
    -> Option<Word>;

    /// Drop any per-room bookkeeping.
    fn forget(&self, room: &str);
}

const BUILTIN_WORDS: &[(&str, &str)] = &[
    ("cat", "animals"),
    ("dog", "animals"),
    ("elephant", "animals"),
    ("giraffe", "animals"),
    ("table", "objects"),
    ("umbrella", "objects"),
    ("computer", "technology"),
    ("phone", "technology"),
    ("pizza", "food"),
    ("hamburger", "food"),
    ("pancake", "food"),
    ("family", "family"),
    ("grandmother", "family"),
    ("vacation", "travel"),
    ("sea", "travel"),
    ("passport", "travel"),
    ("football", "sports"),
    ("basketball", "sports"),
    ("tv series", "entertainment"),
    ("movie", "entertainment"),
    ("song", "music"),
    ("guitar", "music"),
    ("forest", "nature"),
    ("desert", "nature"),
    ("passover", "holidays"),
    ("new year", "holidays"),
    ("blackboard", "school"),
    ("student", "school"),
    ("boss", "work"),
    ("office", "work"),
];

/// In-memory [`WordSource`] that avoids repeating words within a room until the pool is
/// exhausted.
pub struct WordBank {
    entries: Vec<Word>,
    used: DashMap<String, HashSet<String>>,
}

impl Default for WordBank {
    fn default() -> Self {
        Self::new(
            BUILTIN_WORDS
                .iter()
                .map(|(text, category)| Word {
                    text: (*text).to_string(),
                    category: Some((*category).to_string()),
                })
                .collect(),
        )
    }
}

impl WordBank {
    /// Bank over `entries`.
    pub fn new(entries: Vec<Word>) -> Self {
        Self {
            entries,
            used: DashMap::new(),
        }
    }

    /// Distinct categories of the bank, in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter_map(|word| word.category.clone())
            .filter(|category| seen.insert(category.clone()))
            .collect()
    }

    fn pool(&self, categories: &[String], custom_words: &[String]) -> Vec<Word> {
        let custom = custom_words
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .map(|word| Word {
                text: word.to_string(),
                category: None,
            })
            .collect::<Vec<_>>();
        if !custom.is_empty() {
            return custom;
        }

        let filtered = self
            .entries
            .iter()
            .filter(|word| {
                word.category
                    .as_ref()
                    .is_some_and(|category| categories.contains(category))
            })
            .cloned()
            .collect::<Vec<_>>();
        if filtered.is_empty() {
            self.entries.clone()
        } else {
            filtered
        }
    }
}

impl WordSource for WordBank {
    fn next_word(
        &self,
        room: &str,
        categories: &[String],
        custom_words: &[String],
    ) -> Option<Word> {
        let pool = self.pool(categories, custom_words);
        if pool.is_empty() {
            return None;
        }

        let mut used = self.used.entry(room.to_string()).or_default();
        let mut fresh = pool
            .iter()
            .filter(|word| !used.contains(&word.text))
            .collect::<Vec<_>>();
        if fresh.is_empty() {
            used.clear();
            fresh = pool.iter().collect();
        }

        let word = (*fresh.choose(&mut rand::rng())?).clone();
        used.insert(word.text.clone());
        Some(word)
    }

    fn forget(&self, room: &str) {
        self.used.remove(room);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_words_replace_the_bank() {
        let bank = WordBank::default();
        let custom = vec!["  kite ".to_string()];
        let word = bank.next_word("ABCD", &[], &custom).unwrap();
        assert_eq!(word.text, "kite");
        assert!(word.category.is_none());
    }

    #[test]
    fn categories_filter_the_bank() {
        let bank = WordBank::default();
        for _ in 0..10 {
            let word = bank.next_word("ABCD", &["music".to_string()], &[]).unwrap();
            assert_eq!(word.category.as_deref(), Some("music"));
        }
    }

    #[test]
    fn unknown_categories_fall_back_to_everything() {
        let bank = WordBank::default();
        assert!(bank.next_word("ABCD", &["astrophysics".to_string()], &[]).is_some());
    }

    #[test]
    fn words_do_not_repeat_until_the_pool_is_exhausted() {
        let bank = WordBank::default();
        let categories = vec!["sports".to_string()];
        let first = bank.next_word("ABCD", &categories, &[]).unwrap();
        let second = bank.next_word("ABCD", &categories, &[]).unwrap();
        assert_ne!(first.text, second.text);

        // Both sports words used: the pool starts over.
        assert!(bank.next_word("ABCD", &categories, &[]).is_some());
    }

    #[test]
    fn empty_bank_has_nothing_to_offer() {
        let bank = WordBank::new(Vec::new());
        assert!(bank.next_word("ABCD", &[], &[]).is_none());
        assert!(bank.categories().is_empty());
    }
}

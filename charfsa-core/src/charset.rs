//! Weighted character sets.
//!
//! A charset matches one character from a fixed, weighted set, repeated
//! within its [`RepeatBounds`]. As a grammar element it persists as:
//!
//! ```json
//! {"type":"charset","minRepeatCount":1,"maxRepeatCount":2,"characters":{"A":0.5,"B":0.5}}
//! ```
//!
//! Weights are normalized at construction so the table always sums to 1.0.

use crate::element::{Linkage, RepeatBounds};
use crate::enumerate::Completions;
use crate::error::CoreError;
use crate::persist::JsonPersist;
use crate::state::{self, RepeatTracking, State, StateKind, StateRef, Transitions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Allowed distance of a persisted table's total from 1.0.
const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// A weighted character class with repeat bounds.
#[derive(Debug, Clone)]
pub struct Charset {
    characters: BTreeMap<char, f64>,
    bounds: RepeatBounds,
    pub(crate) link: Linkage,
}

impl Charset {
    /// Creates a charset giving every character in `characters` the same
    /// weight. A character listed twice weighs twice as much.
    pub fn new(
        characters: &str,
        min: u32,
        max: impl Into<Option<u32>>,
    ) -> Result<Self, CoreError> {
        Self::from_counts(characters.chars().map(|c| (c, 1)), min, max)
    }

    /// Creates a charset from observed character counts.
    pub fn from_counts<I>(
        counts: I,
        min: u32,
        max: impl Into<Option<u32>>,
    ) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (char, u32)>,
    {
        let bounds = RepeatBounds::new(min, max)?;

        let mut totals: BTreeMap<char, u64> = BTreeMap::new();
        for (character, count) in counts {
            if count == 0 {
                return Err(CoreError::NonPositiveWeight {
                    character,
                    weight: 0.0,
                });
            }
            *totals.entry(character).or_insert(0) += u64::from(count);
        }
        if totals.is_empty() {
            return Err(CoreError::EmptyCharacterSet);
        }

        let sum: u64 = totals.values().sum();
        let characters = totals
            .into_iter()
            .map(|(c, count)| (c, count as f64 / sum as f64))
            .collect();
        Ok(Self::from_parts(characters, bounds))
    }

    /// Creates a charset from relative character frequencies.
    pub fn from_frequencies<I>(
        frequencies: I,
        min: u32,
        max: impl Into<Option<u32>>,
    ) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (char, f64)>,
    {
        let bounds = RepeatBounds::new(min, max)?;

        let mut observed: BTreeMap<char, Vec<f64>> = BTreeMap::new();
        for (character, frequency) in frequencies {
            if !(frequency > 0.0 && frequency.is_finite()) {
                return Err(CoreError::NonPositiveWeight {
                    character,
                    weight: frequency,
                });
            }
            observed.entry(character).or_default().push(frequency);
        }
        if observed.is_empty() {
            return Err(CoreError::EmptyCharacterSet);
        }

        // Summed in sorted order so input order cannot change the result.
        let mut totals: BTreeMap<char, f64> = observed
            .into_iter()
            .map(|(character, mut values)| {
                values.sort_by(f64::total_cmp);
                (character, values.into_iter().sum::<f64>())
            })
            .collect();

        let sum: f64 = totals.values().sum();
        for weight in totals.values_mut() {
            *weight /= sum;
        }
        Ok(Self::from_parts(totals, bounds))
    }

    fn from_parts(characters: BTreeMap<char, f64>, bounds: RepeatBounds) -> Self {
        Self {
            characters,
            bounds,
            link: Linkage::default(),
        }
    }

    /// Normalized weight of every admissible character.
    pub fn characters(&self) -> &BTreeMap<char, f64> {
        &self.characters
    }

    pub fn probability(&self, character: char) -> Option<f64> {
        self.characters.get(&character).copied()
    }

    pub fn contains(&self, character: char) -> bool {
        self.characters.contains_key(&character)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn bounds(&self) -> RepeatBounds {
        self.bounds
    }

    pub fn min_repeat_count(&self) -> u32 {
        self.bounds.min()
    }

    pub fn max_repeat_count(&self) -> Option<u32> {
        self.bounds.max()
    }

    /// Replaces the repeat bounds after validating them.
    pub fn set_repeat_bounds(
        &mut self,
        min: u32,
        max: impl Into<Option<u32>>,
    ) -> Result<(), CoreError> {
        self.bounds = RepeatBounds::new(min, max)?;
        Ok(())
    }

    pub fn is_tail(&self) -> bool {
        self.link.is_tail
    }

    /// Builds the entry state: nothing consumed yet, never a word end.
    pub fn initial_state(&self) -> StateRef {
        let rule = Arc::new(StepRule {
            characters: self.characters.clone(),
            bounds: self.bounds,
            is_tail: self.link.is_tail,
        });
        let tracking = RepeatTracking::new(self.bounds.admits(0), false, 0, rule);
        State::new(None, false, 0.0, 0.0, StateKind::Repeat(tracking))
    }

    pub fn enumerate(&self) -> Completions {
        self.initial_state().enumerate()
    }

    /// Returns true if `text` is a complete match of this charset.
    pub fn accepts(&self, text: &str) -> bool {
        state::walk(&self.initial_state(), text).is_some_and(|state| state.word_end())
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.bounds == other.bounds && self.characters == other.characters
    }
}

// Weights are always finite and positive.
impl Eq for Charset {}

impl Hash for Charset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Only the shape is hashed; float weights take part in equality only.
        self.bounds.hash(state);
        self.characters.len().hash(state);
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for &c in self.characters.keys() {
            if matches!(c, ']' | '[' | '\\' | '-' | '^') {
                f.write_str("\\")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]{}", self.bounds.quantifier())
    }
}

/// Persisted charset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharsetRaw {
    pub min_repeat_count: i64,
    /// Required; `null` means unbounded.
    #[serde(deserialize_with = "Option::deserialize")]
    pub max_repeat_count: Option<i64>,
    pub characters: BTreeMap<char, f64>,
}

impl JsonPersist for Charset {
    type Raw = CharsetRaw;

    fn to_raw(&self) -> CharsetRaw {
        let (min, max) = self.bounds.to_raw();
        CharsetRaw {
            min_repeat_count: min,
            max_repeat_count: max,
            characters: self.characters.clone(),
        }
    }

    fn from_raw(raw: CharsetRaw) -> Result<Self, CoreError> {
        let bounds = RepeatBounds::from_raw(raw.min_repeat_count, raw.max_repeat_count)?;

        if raw.characters.is_empty() {
            return Err(CoreError::EmptyCharacterSet);
        }
        for (&character, &weight) in &raw.characters {
            if !(weight > 0.0 && weight.is_finite()) {
                return Err(CoreError::NonPositiveWeight { character, weight });
            }
        }
        let sum: f64 = raw.characters.values().sum();
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(CoreError::InvalidProbabilities {
                reason: format!("weights sum to {sum}, expected 1.0"),
            });
        }

        Ok(Self::from_parts(raw.characters, bounds))
    }
}

/// Snapshot of a charset that its states expand from.
pub(crate) struct StepRule {
    characters: BTreeMap<char, f64>,
    bounds: RepeatBounds,
    is_tail: bool,
}

impl StepRule {
    /// Expands the states reachable after `basis` repetitions.
    pub(crate) fn successors(self: &Arc<Self>, basis: u32) -> Option<Transitions> {
        if self.bounds.is_exhausted(basis) {
            return None;
        }

        let count = basis.saturating_add(1);
        let context_word_end = self.bounds.admits(count);
        let word_end = context_word_end && self.is_tail;
        let word_end_probability = if word_end { 1.0 } else { 0.0 };
        let repeat_word_end = basis > 0 && self.bounds.admits(basis);

        tracing::trace!(basis, count, word_end, "expanding charset state");

        let next = self
            .characters
            .iter()
            .map(|(&c, &p)| {
                let tracking =
                    RepeatTracking::new(context_word_end, repeat_word_end, count, Arc::clone(self));
                let state = State::new(
                    Some(c),
                    word_end,
                    p,
                    word_end_probability,
                    StateKind::Repeat(tracking),
                );
                (c, state)
            })
            .collect();
        Some(Arc::new(next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-12,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_duplicate_characters_merge() {
        let charset = Charset::new("0AzA", 1, 1).unwrap();

        assert_eq!(charset.len(), 3);
        assert_close(charset.probability('0').unwrap(), 0.25);
        assert_close(charset.probability('A').unwrap(), 0.5);
        assert_close(charset.probability('z').unwrap(), 0.25);
        assert!(charset.probability('x').is_none());
    }

    #[test]
    fn test_counts_and_frequencies() {
        let counts = Charset::from_counts([('a', 3), ('b', 1), ('a', 4)], 1, 1).unwrap();
        assert_close(counts.probability('a').unwrap(), 7.0 / 8.0);
        assert_close(counts.probability('b').unwrap(), 1.0 / 8.0);

        let freqs = Charset::from_frequencies([('x', 0.2), ('y', 0.6)], 0, None).unwrap();
        assert_close(freqs.probability('x').unwrap(), 0.25);
        assert_close(freqs.probability('y').unwrap(), 0.75);
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            Charset::new("", 1, 1),
            Err(CoreError::EmptyCharacterSet)
        ));
        assert!(matches!(
            Charset::from_counts([('a', 1), ('q', 0)], 1, 1),
            Err(CoreError::NonPositiveWeight { character: 'q', .. })
        ));
        assert!(matches!(
            Charset::from_frequencies([('n', -0.5)], 1, 1),
            Err(CoreError::NonPositiveWeight { character: 'n', .. })
        ));
        assert!(matches!(
            Charset::from_frequencies([('n', f64::NAN)], 1, 1),
            Err(CoreError::NonPositiveWeight { character: 'n', .. })
        ));
        assert!(matches!(
            Charset::new("ab", 3, 2),
            Err(CoreError::MaxBelowMin { min: 3, max: 2 })
        ));
    }

    #[test]
    fn test_two_level_walk() {
        let charset = Charset::new("AB", 2, 2).unwrap();
        let root = charset.initial_state();

        let first = root.next_states().unwrap();
        assert_eq!(first.len(), 2);
        for state in first.values() {
            assert!(!state.word_end());
            assert_eq!(state.repeat_tracking().unwrap().repeat_count(), 1);

            let second = state.next_states().unwrap();
            assert_eq!(second.len(), 2);
            for leaf in second.values() {
                assert!(leaf.word_end());
                assert_close(leaf.word_end_probability(), 1.0);
                assert_close(leaf.char_probability(), 0.5);
                assert_eq!(leaf.repeat_tracking().unwrap().repeat_count(), 2);
                assert!(leaf.next_states().is_none());
            }
        }
    }

    #[test]
    fn test_terminal_iff_max_and_word_end_iff_min() {
        let charset = Charset::new("ab", 2, 4).unwrap();
        let mut state = charset.initial_state();
        for count in 1..=4u32 {
            state = Arc::clone(state.advance('a').unwrap());
            let tracking = state.repeat_tracking().unwrap();
            assert_eq!(tracking.repeat_count(), count);
            assert_eq!(state.word_end(), count >= 2);
            assert_eq!(tracking.context_word_end(), count >= 2);
            assert_eq!(tracking.repeat_word_end(), count > 2);
            assert_eq!(state.is_terminal(), count == 4);
        }
    }

    #[test]
    fn test_zero_max_has_no_successors() {
        let charset = Charset::new("a", 0, 0).unwrap();
        let root = charset.initial_state();
        assert!(root.is_terminal());
        assert!(root.repeat_tracking().unwrap().context_word_end());
    }

    #[test]
    fn test_non_tail_never_ends_word() {
        let mut charset = Charset::new("a", 1, 2).unwrap();
        charset.link.is_tail = false;

        let state = walk_one(&charset, 'a');
        assert!(!state.word_end());
        assert_eq!(state.word_end_probability(), 0.0);
        assert!(state.repeat_tracking().unwrap().context_word_end());
    }

    fn walk_one(charset: &Charset, c: char) -> StateRef {
        Arc::clone(charset.initial_state().advance(c).unwrap())
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Charset::new("xyz", 1, 3).unwrap();
        let b = Charset::new("zyx", 1, 3).unwrap();
        let c = Charset::new("xyz", 1, 4).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_display() {
        assert_eq!(Charset::new("BA", 1, 1).unwrap().to_string(), "[AB]");
        assert_eq!(Charset::new("0-9", 1, None).unwrap().to_string(), "[\\-09]+");
        assert_eq!(Charset::new("ab", 2, 5).unwrap().to_string(), "[ab]{2,5}");
    }

    #[test]
    fn test_set_repeat_bounds() {
        let mut charset = Charset::new("a", 1, 1).unwrap();
        charset.set_repeat_bounds(0, None).unwrap();
        assert_eq!(charset.max_repeat_count(), None);
        assert!(charset.set_repeat_bounds(2, 1).is_err());
        assert_eq!(charset.min_repeat_count(), 0);
    }

    #[test]
    fn test_from_raw_rejects_bad_tables() {
        let raw = CharsetRaw {
            min_repeat_count: 1,
            max_repeat_count: Some(1),
            characters: BTreeMap::from([('a', 0.5), ('b', 0.2)]),
        };
        assert!(matches!(
            Charset::from_raw(raw),
            Err(CoreError::InvalidProbabilities { .. })
        ));

        let raw = CharsetRaw {
            min_repeat_count: 1,
            max_repeat_count: Some(1),
            characters: BTreeMap::from([('a', 1.0), ('b', 0.0)]),
        };
        assert!(matches!(
            Charset::from_raw(raw),
            Err(CoreError::NonPositiveWeight { character: 'b', .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_weights_sum_to_one(
            counts in proptest::collection::vec((proptest::char::range('a', 'z'), 1u32..50), 1..30)
        ) {
            let charset = Charset::from_counts(counts, 1, 1).unwrap();
            let sum: f64 = charset.characters().values().sum();
            prop_assert!((sum - 1.0).abs() < 1e-9);
            prop_assert!(charset.characters().values().all(|&p| p > 0.0));
        }

        #[test]
        fn prop_equality_independent_of_order(text in "[a-f]{1,12}") {
            let reversed: String = text.chars().rev().collect();
            let forward = Charset::new(&text, 0, 3).unwrap();
            let backward = Charset::new(&reversed, 0, 3).unwrap();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_frequency_equality_independent_of_order(
            pairs in prop::collection::vec((prop::sample::select(vec!['a', 'b', 'c']), 0.01f64..10.0), 1..16)
        ) {
            let reversed: Vec<(char, f64)> = pairs.iter().rev().copied().collect();
            let forward = Charset::from_frequencies(pairs, 1, 2).unwrap();
            let backward = Charset::from_frequencies(reversed, 1, 2).unwrap();
            prop_assert_eq!(forward, backward);
        }
    }

    #[test]
    fn test_duplicate_frequencies_sum_independent_of_order() {
        let forward = [('a', 0.1), ('a', 0.2), ('a', 0.3), ('b', 0.4)];
        let mut backward = forward;
        backward.reverse();

        let forward = Charset::from_frequencies(forward, 1, 1).unwrap();
        let backward = Charset::from_frequencies(backward, 1, 1).unwrap();
        assert_eq!(forward.probability('a'), backward.probability('a'));
        assert_eq!(forward, backward);
    }
}

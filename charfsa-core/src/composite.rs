//! Composite states.
//!
//! When sibling branches of the automaton agree on the next character, their
//! target states are merged into one composite state so the successor map
//! stays deterministic. Composites never nest: merging a composite flattens
//! its constituents into the new one.
//!
//! Aggregation seeds from the first constituent; every later one ORs its
//! word-end flag in and adds its probabilities, so mass accumulates across
//! the branches that agree.

use crate::state::{State, StateKind, StateRef, Transitions};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Merges `first` with the non-`None` states in `others`.
///
/// Returns `first` itself when nothing new would be merged in. All states
/// must share the same character.
pub fn create(first: &StateRef, others: &[Option<&StateRef>]) -> StateRef {
    let mut constituents = Vec::new();
    flatten_into(first, &mut constituents);
    let seeded = constituents.len();

    for other in others.iter().flatten() {
        debug_assert_eq!(first.ch(), other.ch(), "merged states must share a character");
        flatten_into(other, &mut constituents);
    }

    if constituents.len() == seeded {
        return Arc::clone(first);
    }
    build(constituents)
}

/// Shorthand for merging exactly two states.
pub fn create_pair(a: &StateRef, b: Option<&StateRef>) -> StateRef {
    create(a, &[b])
}

/// Merges several successor maps into one.
///
/// Characters present in a single map keep their state; characters present
/// in several maps get a composite of all their states. Returns `None` when
/// given no maps.
pub fn merge<'a, I>(maps: I) -> Option<Transitions>
where
    I: IntoIterator<Item = &'a Transitions>,
{
    let maps: Vec<&Transitions> = maps.into_iter().collect();
    match maps.as_slice() {
        [] => None,
        [single] => Some(Arc::clone(single)),
        _ => {
            let mut grouped: BTreeMap<char, Vec<&StateRef>> = BTreeMap::new();
            for map in &maps {
                for (&ch, state) in map.iter() {
                    grouped.entry(ch).or_default().push(state);
                }
            }

            let mut merged = BTreeMap::new();
            for (ch, states) in grouped {
                let Some((first, rest)) = states.split_first() else {
                    continue;
                };
                let rest: Vec<Option<&StateRef>> = rest.iter().map(|&s| Some(s)).collect();
                merged.insert(ch, create(first, &rest));
            }
            Some(Arc::new(merged))
        }
    }
}

/// Successors of a composite: the merge of its constituents' successors.
pub(crate) fn successors(constituents: &[StateRef]) -> Option<Transitions> {
    merge(constituents.iter().filter_map(|state| state.next_states()))
}

fn flatten_into(state: &StateRef, out: &mut Vec<StateRef>) {
    match state.kind() {
        StateKind::Composite(inner) => {
            for s in inner {
                push_unique(s, out);
            }
        }
        _ => push_unique(state, out),
    }
}

fn push_unique(state: &StateRef, out: &mut Vec<StateRef>) {
    if !out.iter().any(|s| Arc::ptr_eq(s, state)) {
        out.push(Arc::clone(state));
    }
}

fn build(constituents: Vec<StateRef>) -> StateRef {
    let Some((first, rest)) = constituents.split_first() else {
        unreachable!("composite built without constituents");
    };

    let mut word_end = first.word_end();
    let mut char_probability = first.char_probability();
    let mut word_end_probability = first.word_end_probability();
    for state in rest {
        word_end |= state.word_end();
        char_probability += state.char_probability();
        word_end_probability += state.word_end_probability();
    }

    tracing::debug!(
        ch = ?first.ch(),
        constituents = constituents.len(),
        "merged states into composite"
    );

    let ch = first.ch();
    State::new(
        ch,
        word_end,
        char_probability,
        word_end_probability,
        StateKind::Composite(constituents),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charset::Charset;

    fn state(charset: &str, min: u32, max: u32, ch: char) -> StateRef {
        let root = Charset::new(charset, min, max).unwrap().initial_state();
        Arc::clone(root.advance(ch).unwrap())
    }

    #[test]
    fn test_create_identity() {
        let a = state("ab", 1, 1, 'a');
        assert!(Arc::ptr_eq(&create_pair(&a, None), &a));
        assert!(Arc::ptr_eq(&create_pair(&a, Some(&a)), &a));
        assert!(Arc::ptr_eq(&create(&a, &[None, Some(&a)]), &a));
    }

    #[test]
    fn test_create_aggregates() {
        // 'a' at 0.5, not yet a word end
        let a = state("ab", 2, 2, 'a');
        // 'a' at 0.25, word end
        let b = state("abcd", 1, 1, 'a');

        let merged = create_pair(&a, Some(&b));
        assert!(merged.is_composite());
        assert_eq!(merged.ch(), Some('a'));
        assert_eq!(merged.word_end(), a.word_end() || b.word_end());
        assert!(merged.word_end());
        assert!((merged.char_probability() - 0.75).abs() < 1e-12);
        assert!((merged.word_end_probability() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_composites_never_nest() {
        let a = state("a", 1, 1, 'a');
        let b = state("ab", 1, 1, 'a');
        let c = state("abc", 1, 1, 'a');

        let ab = create_pair(&a, Some(&b));
        let abc = create(&ab, &[Some(&c)]);
        let constituents = abc.constituents().unwrap();
        assert_eq!(constituents.len(), 3);
        assert!(constituents.iter().all(|s| !s.is_composite()));

        let again = create(&ab, &[Some(&a), Some(&b)]);
        assert!(Arc::ptr_eq(&again, &ab));
    }

    #[test]
    fn test_merge_maps() {
        let left = Charset::new("ab", 1, 1).unwrap().initial_state();
        let right = Charset::new("bc", 1, 2).unwrap().initial_state();
        let l = left.next_states().unwrap();
        let r = right.next_states().unwrap();

        let merged = merge([l, r]).unwrap();
        assert_eq!(merged.keys().copied().collect::<Vec<_>>(), vec!['a', 'b', 'c']);
        assert!(Arc::ptr_eq(&merged[&'a'], &l[&'a']));
        assert!(Arc::ptr_eq(&merged[&'c'], &r[&'c']));
        assert!(merged[&'b'].is_composite());

        assert!(Arc::ptr_eq(&merge([l]).unwrap(), l));
        assert!(merge(std::iter::empty()).is_none());
    }

    #[test]
    fn test_composite_successors() {
        let left = Charset::new("ab", 1, 1).unwrap().initial_state();
        let right = Charset::new("bc", 1, 2).unwrap().initial_state();
        let merged = merge([left.next_states().unwrap(), right.next_states().unwrap()]).unwrap();

        // Only the right branch continues past 'b'.
        let b = &merged[&'b'];
        let next = b.next_states().unwrap();
        assert_eq!(next.keys().copied().collect::<Vec<_>>(), vec!['b', 'c']);
        assert!(Arc::ptr_eq(next, b.next_states().unwrap()));

        // Neither branch continues past 'a' twice.
        assert!(merged[&'a'].next_states().is_none());
    }
}

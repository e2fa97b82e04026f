//! Exhaustive enumeration of admissible completions.

use crate::state::StateRef;

/// Separator between words of a multi-word completion.
///
/// A completion never ends with it, and one enumerated from an element root
/// never begins with it.
pub const WORD_SEPARATOR: char = ' ';

/// Lazy depth-first walk over every string the automaton accepts from a
/// given state.
///
/// Each item is the accumulated string and its score: the product of the
/// character probabilities along the path times the word-end probability of
/// the final state. A string is yielded before any of its extensions.
///
/// The walk is finite only if the repeat bounds are. Use
/// [`Completions::max_length`] or [`Iterator::take`] for unbounded elements.
pub struct Completions {
    stack: Vec<Frame>,
    max_length: Option<usize>,
}

struct Frame {
    state: StateRef,
    text: String,
    len: usize,
    score: f64,
}

impl Completions {
    pub(crate) fn new(root: StateRef) -> Self {
        Self {
            stack: vec![Frame {
                state: root,
                text: String::new(),
                len: 0,
                score: 1.0,
            }],
            max_length: None,
        }
    }

    /// Stops descending once completions reach `max_length` characters.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }
}

impl Iterator for Completions {
    type Item = (String, f64);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let descend = self.max_length.map_or(true, |max| frame.len < max);
            if descend {
                if let Some(next) = frame.state.next_states() {
                    // Reversed so the first child is popped first.
                    // Only an element root refuses to start with the separator.
                    let at_root = frame.len == 0 && frame.state.ch().is_none();
                    for (&ch, child) in next.iter().rev() {
                        if at_root && ch == WORD_SEPARATOR {
                            continue;
                        }
                        let mut text = String::with_capacity(frame.text.len() + ch.len_utf8());
                        text.push_str(&frame.text);
                        text.push(ch);
                        self.stack.push(Frame {
                            state: StateRef::clone(child),
                            text,
                            len: frame.len + 1,
                            score: frame.score * child.char_probability(),
                        });
                    }
                }
            }

            if frame.state.word_end() && !frame.text.ends_with(WORD_SEPARATOR) {
                let score = frame.score * frame.state.word_end_probability();
                return Some((frame.text, score));
            }
        }
        None
    }
}

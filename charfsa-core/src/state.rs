//! Automaton states.
//!
//! A [`State`] stands for "just consumed character X" (or nothing, at the
//! root of an element). Successors are computed on first access to
//! [`State::next_states`] and cached in the node, so the automaton is only
//! ever expanded along the paths a caller actually walks.
//!
//! Every node is one of three closed variants:
//!
//! - [`StateKind::Repeat`] - produced by a charset, tracks the repeat count
//! - [`StateKind::Composite`] - several states merged on a shared character
//! - [`StateKind::Null`] - a zero-width element handing over to its parent

use crate::charset::StepRule;
use crate::composite;
use crate::enumerate::Completions;
use crate::null::NullLink;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared handle to a state.
pub type StateRef = Arc<State>;

/// Successor map of a state, keyed by the next character.
pub type Transitions = Arc<BTreeMap<char, StateRef>>;

/// A node of the compiled automaton.
pub struct State {
    ch: Option<char>,
    word_end: bool,
    char_probability: f64,
    word_end_probability: f64,
    kind: StateKind,
    next: OnceLock<Option<Transitions>>,
}

/// Variant-specific part of a state.
pub enum StateKind {
    /// A charset state with repeat-count bookkeeping.
    Repeat(RepeatTracking),
    /// Deterministic merge of states sharing the same character.
    Composite(Vec<StateRef>),
    /// Entry state of a null element.
    Null(NullLink),
}

/// Repeat-count bookkeeping carried by charset states.
pub struct RepeatTracking {
    context_word_end: bool,
    repeat_word_end: bool,
    repeat_count: u32,
    rule: Arc<StepRule>,
}

impl RepeatTracking {
    pub(crate) fn new(
        context_word_end: bool,
        repeat_word_end: bool,
        repeat_count: u32,
        rule: Arc<StepRule>,
    ) -> Self {
        Self {
            context_word_end,
            repeat_word_end,
            repeat_count,
            rule,
        }
    }

    /// Whether the element alone would accept ending here.
    pub fn context_word_end(&self) -> bool {
        self.context_word_end
    }

    /// Whether the character reaching this state started another repetition
    /// after the element was already satisfied.
    pub fn repeat_word_end(&self) -> bool {
        self.repeat_word_end
    }

    /// Number of characters the element has consumed so far.
    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }
}

impl State {
    pub(crate) fn new(
        ch: Option<char>,
        word_end: bool,
        char_probability: f64,
        word_end_probability: f64,
        kind: StateKind,
    ) -> StateRef {
        Arc::new(Self {
            ch,
            word_end,
            char_probability,
            word_end_probability,
            kind,
            next: OnceLock::new(),
        })
    }

    /// Character consumed to reach this state; `None` at an element root.
    pub fn ch(&self) -> Option<char> {
        self.ch
    }

    /// Whether the whole grammar may terminate here.
    pub fn word_end(&self) -> bool {
        self.word_end
    }

    /// Weight of having produced [`State::ch`] here.
    pub fn char_probability(&self) -> f64 {
        self.char_probability
    }

    /// Weight of terminating here.
    pub fn word_end_probability(&self) -> f64 {
        self.word_end_probability
    }

    pub fn kind(&self) -> &StateKind {
        &self.kind
    }

    /// Repeat bookkeeping, for charset states only.
    pub fn repeat_tracking(&self) -> Option<&RepeatTracking> {
        match &self.kind {
            StateKind::Repeat(tracking) => Some(tracking),
            _ => None,
        }
    }

    /// Merged constituents, for composite states only.
    pub fn constituents(&self) -> Option<&[StateRef]> {
        match &self.kind {
            StateKind::Composite(states) => Some(states),
            _ => None,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.kind, StateKind::Composite(_))
    }

    /// Returns the successors of this state, or `None` when no character may
    /// follow.
    ///
    /// Computed once per node; later calls return the same map.
    pub fn next_states(&self) -> Option<&Transitions> {
        self.next.get_or_init(|| self.compute_next()).as_ref()
    }

    fn compute_next(&self) -> Option<Transitions> {
        match &self.kind {
            StateKind::Repeat(tracking) => tracking.rule.successors(tracking.repeat_count),
            StateKind::Composite(states) => composite::successors(states),
            StateKind::Null(link) => link.successors(),
        }
    }

    /// Returns true if no character may follow this state.
    pub fn is_terminal(&self) -> bool {
        self.next_states().is_none()
    }

    /// Follows the transition on `ch`, if it is admissible here.
    pub fn advance(&self, ch: char) -> Option<&StateRef> {
        self.next_states()?.get(&ch)
    }

    /// Lazily enumerates every admissible completion reachable from here.
    pub fn enumerate(self: &Arc<Self>) -> Completions {
        Completions::new(Arc::clone(self))
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = f.debug_struct("State");
        out.field("ch", &self.ch)
            .field("word_end", &self.word_end)
            .field("char_probability", &self.char_probability)
            .field("word_end_probability", &self.word_end_probability);
        match &self.kind {
            StateKind::Repeat(tracking) => out
                .field("repeat_count", &tracking.repeat_count)
                .field("context_word_end", &tracking.context_word_end),
            StateKind::Composite(states) => out.field("constituents", &states.len()),
            StateKind::Null(_) => out.field("null", &true),
        };
        out.finish()
    }
}

/// Walks `text` from `root`, returning the state reached after its last
/// character, or `None` if some character is not admissible.
pub fn walk(root: &StateRef, text: &str) -> Option<StateRef> {
    let mut current = Arc::clone(root);
    for ch in text.chars() {
        let next = Arc::clone(current.advance(ch)?);
        current = next;
    }
    Some(current)
}

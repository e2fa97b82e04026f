//! Grammar elements and their shared contract.
//!
//! Every element is repeatable within [`RepeatBounds`], may be linked into an
//! enclosing sequencing structure through a [`Parent`] handle, and produces an
//! initial [`State`](crate::state::State) for the automaton.

use crate::charset::{Charset, CharsetRaw};
use crate::enumerate::Completions;
use crate::error::CoreError;
use crate::null::{NullElement, NullElementRaw};
use crate::persist::JsonPersist;
use crate::state::{self, StateRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Enclosing structure that composes elements into sequences.
///
/// Implemented by the sequencing/alternation layer. Only null elements call
/// into it, to find out what follows them.
pub trait Parent: Send + Sync {
    /// Returns the state from which the element in `slot` is entered.
    fn initial_state(&self, slot: usize) -> StateRef;
}

/// Non-owning handle from an element to its parent and its slot there.
#[derive(Debug, Clone)]
pub struct ParentLink {
    parent: Weak<dyn Parent>,
    slot: usize,
}

impl ParentLink {
    pub fn new(parent: &Arc<dyn Parent>, slot: usize) -> Self {
        Self {
            parent: Arc::downgrade(parent),
            slot,
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Returns the parent if it is still alive.
    pub fn upgrade(&self) -> Option<Arc<dyn Parent>> {
        self.parent.upgrade()
    }
}

/// Position of an element inside its parent.
#[derive(Debug, Clone)]
pub struct Linkage {
    pub(crate) parent: Option<ParentLink>,
    pub(crate) is_tail: bool,
}

impl Default for Linkage {
    fn default() -> Self {
        Self {
            parent: None,
            is_tail: true,
        }
    }
}

/// Inclusive repeat-count range; `max` of `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RepeatBounds {
    min: u32,
    max: Option<u32>,
}

impl RepeatBounds {
    /// Exactly one repetition.
    pub const ONCE: RepeatBounds = RepeatBounds {
        min: 1,
        max: Some(1),
    };

    pub fn new(min: u32, max: impl Into<Option<u32>>) -> Result<Self, CoreError> {
        let max = max.into();
        if let Some(max) = max {
            if max < min {
                return Err(CoreError::MaxBelowMin { min, max });
            }
        }
        Ok(Self { min, max })
    }

    /// Validates bounds as they appear in persisted form.
    pub fn from_raw(min: i64, max: Option<i64>) -> Result<Self, CoreError> {
        let min = u32::try_from(min).map_err(|_| CoreError::RepeatCountOutOfRange {
            bound: "minRepeatCount",
            value: min,
        })?;
        let max = max
            .map(|value| {
                u32::try_from(value).map_err(|_| CoreError::RepeatCountOutOfRange {
                    bound: "maxRepeatCount",
                    value,
                })
            })
            .transpose()?;
        Self::new(min, max)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> Option<u32> {
        self.max
    }

    /// Returns true if `count` repetitions satisfy the lower bound.
    pub fn admits(&self, count: u32) -> bool {
        count >= self.min
    }

    /// Returns true if no repetition may follow `count`.
    pub fn is_exhausted(&self, count: u32) -> bool {
        self.max.is_some_and(|max| count >= max)
    }

    /// Renders the bounds in pattern quantifier notation.
    pub fn quantifier(&self) -> String {
        match (self.min, self.max) {
            (1, Some(1)) => String::new(),
            (0, None) => "*".to_string(),
            (1, None) => "+".to_string(),
            (0, Some(1)) => "?".to_string(),
            (n, Some(m)) if n == m => format!("{{{n}}}"),
            (0, Some(m)) => format!("{{,{m}}}"),
            (n, None) => format!("{{{n},}}"),
            (n, Some(m)) => format!("{{{n},{m}}}"),
        }
    }

    pub(crate) fn to_raw(self) -> (i64, Option<i64>) {
        (i64::from(self.min), self.max.map(i64::from))
    }
}

impl Default for RepeatBounds {
    fn default() -> Self {
        Self::ONCE
    }
}

/// A grammar element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarElement {
    Charset(Charset),
    Null(NullElement),
}

impl GrammarElement {
    pub fn bounds(&self) -> RepeatBounds {
        match self {
            GrammarElement::Charset(charset) => charset.bounds(),
            GrammarElement::Null(_) => RepeatBounds::ONCE,
        }
    }

    /// Builds the entry state of this element.
    pub fn initial_state(&self) -> StateRef {
        match self {
            GrammarElement::Charset(charset) => charset.initial_state(),
            GrammarElement::Null(null) => null.initial_state(),
        }
    }

    pub fn quantifier(&self) -> String {
        self.bounds().quantifier()
    }

    fn linkage(&self) -> &Linkage {
        match self {
            GrammarElement::Charset(charset) => &charset.link,
            GrammarElement::Null(null) => &null.link,
        }
    }

    fn linkage_mut(&mut self) -> &mut Linkage {
        match self {
            GrammarElement::Charset(charset) => &mut charset.link,
            GrammarElement::Null(null) => &mut null.link,
        }
    }

    /// Whether this is the last element of its parent sequence.
    pub fn is_tail(&self) -> bool {
        self.linkage().is_tail
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.linkage().parent.as_ref()
    }

    /// Links the element into `parent` at `slot`. For composition logic only.
    pub fn attach(&mut self, parent: &Arc<dyn Parent>, slot: usize, is_tail: bool) {
        let link = self.linkage_mut();
        link.parent = Some(ParentLink::new(parent, slot));
        link.is_tail = is_tail;
    }

    /// Removes the parent link, making the element a standalone tail again.
    pub fn detach(&mut self) {
        *self.linkage_mut() = Linkage::default();
    }

    pub fn enumerate(&self) -> Completions {
        self.initial_state().enumerate()
    }

    /// Returns true if the grammar may terminate right after `text`.
    pub fn accepts(&self, text: &str) -> bool {
        state::walk(&self.initial_state(), text).is_some_and(|state| state.word_end())
    }
}

impl Hash for GrammarElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            GrammarElement::Charset(charset) => charset.hash(state),
            GrammarElement::Null(null) => null.hash(state),
        }
    }
}

impl fmt::Display for GrammarElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarElement::Charset(charset) => fmt::Display::fmt(charset, f),
            GrammarElement::Null(null) => fmt::Display::fmt(null, f),
        }
    }
}

impl From<Charset> for GrammarElement {
    fn from(charset: Charset) -> Self {
        GrammarElement::Charset(charset)
    }
}

impl From<NullElement> for GrammarElement {
    fn from(null: NullElement) -> Self {
        GrammarElement::Null(null)
    }
}

/// Persisted form of any element, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GrammarElementRaw {
    Charset(CharsetRaw),
    Null(NullElementRaw),
}

impl JsonPersist for GrammarElement {
    type Raw = GrammarElementRaw;

    fn to_raw(&self) -> GrammarElementRaw {
        match self {
            GrammarElement::Charset(charset) => GrammarElementRaw::Charset(charset.to_raw()),
            GrammarElement::Null(null) => GrammarElementRaw::Null(null.to_raw()),
        }
    }

    fn from_raw(raw: GrammarElementRaw) -> Result<Self, CoreError> {
        Ok(match raw {
            GrammarElementRaw::Charset(raw) => GrammarElement::Charset(Charset::from_raw(raw)?),
            GrammarElementRaw::Null(raw) => GrammarElement::Null(NullElement::from_raw(raw)?),
        })
    }
}

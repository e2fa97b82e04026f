//! Zero-width grammar element.
//!
//! A null element has no characters of its own. Its entry state forwards
//! [`next_states`](crate::state::State::next_states) to whatever the parent
//! structure places after it, so automaton consumers never need to know which
//! kind of element produced a node.

use crate::element::{Linkage, ParentLink, RepeatBounds};
use crate::error::CoreError;
use crate::persist::JsonPersist;
use crate::state::{State, StateKind, StateRef, Transitions};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An element matching the empty string.
#[derive(Debug, Clone, Default)]
pub struct NullElement {
    pub(crate) link: Linkage,
}

impl NullElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bounds(&self) -> RepeatBounds {
        RepeatBounds::ONCE
    }

    pub fn is_tail(&self) -> bool {
        self.link.is_tail
    }

    /// Builds the entry state. A tail null element may end the grammar here.
    pub fn initial_state(&self) -> StateRef {
        let is_tail = self.link.is_tail;
        let link = NullLink {
            parent: self.link.parent.clone(),
        };
        State::new(
            None,
            is_tail,
            0.0,
            if is_tail { 1.0 } else { 0.0 },
            StateKind::Null(link),
        )
    }
}

impl PartialEq for NullElement {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for NullElement {}

impl Hash for NullElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bounds().hash(state);
    }
}

impl fmt::Display for NullElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("()")
    }
}

/// Delegation target of a null element's entry state.
pub struct NullLink {
    parent: Option<ParentLink>,
}

impl NullLink {
    pub(crate) fn successors(&self) -> Option<Transitions> {
        let Some(link) = &self.parent else {
            tracing::warn!("null element has no parent; treating as terminal");
            return None;
        };
        let Some(parent) = link.upgrade() else {
            tracing::warn!(slot = link.slot(), "parent of null element was dropped");
            return None;
        };

        tracing::debug!(slot = link.slot(), "null element delegating to parent");
        parent.initial_state(link.slot()).next_states().cloned()
    }
}

/// Persisted null element.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NullElementRaw {
    pub min_repeat_count: i64,
    #[serde(deserialize_with = "Option::deserialize")]
    pub max_repeat_count: Option<i64>,
}

impl JsonPersist for NullElement {
    type Raw = NullElementRaw;

    fn to_raw(&self) -> NullElementRaw {
        let (min, max) = RepeatBounds::ONCE.to_raw();
        NullElementRaw {
            min_repeat_count: min,
            max_repeat_count: max,
        }
    }

    fn from_raw(raw: NullElementRaw) -> Result<Self, CoreError> {
        let bounds = RepeatBounds::from_raw(raw.min_repeat_count, raw.max_repeat_count)?;
        if bounds != RepeatBounds::ONCE {
            return Err(CoreError::FixedRepeatBounds {
                min: bounds.min(),
                max: bounds.max(),
            });
        }
        Ok(Self::new())
    }
}

//! # charfsa-core
//!
//! Probabilistic character automata for constrained text recognition.
//!
//! This crate provides:
//! - Grammar elements (weighted charsets, null elements) with repeat bounds
//! - Lazily expanded automaton states with memoized successor maps
//! - Deterministic merging of states that agree on the next character
//! - Enumeration of every admissible completion with its score
//! - JSON persistence through strings, byte buffers, and files

pub mod charset;
pub mod composite;
pub mod element;
pub mod enumerate;
pub mod error;
pub mod null;
pub mod persist;
pub mod state;

pub use charset::Charset;
pub use element::{GrammarElement, Parent, ParentLink, RepeatBounds};
pub use enumerate::{Completions, WORD_SEPARATOR};
pub use error::CoreError;
pub use null::NullElement;
pub use persist::JsonPersist;
pub use state::{walk, State, StateKind, StateRef, Transitions};

//! Augmented transition network of a grammar.
//!
//! The automaton is the read-only input of the completion core: one start and
//! one stop state per rule, connected by typed [`Transition`]s. State kinds are
//! informational except for [`StateKind::RuleStop`], which ends a rule
//! invocation; the transitions carry the matching semantics.
//!
//! Automata are normally produced by a parser generator. [`GrammarBuilder`]
//! constructs the same shape from a small combinator description.

mod builder;
mod interval_set;
mod transition;
mod vocabulary;

use std::fmt;
use std::sync::Arc;

pub use builder::{Element, Grammar, GrammarBuilder};
pub use interval_set::{Interval, IntervalSet};
pub use transition::Transition;
pub use vocabulary::Vocabulary;

use crate::error::{GrammarError, Result};

/// Token type of the end-of-input token.
pub const EOF: i32 = -1;

/// Marker for "this rule can be passed without consuming input".
pub const EPSILON: i32 = -2;

/// Smallest token type a grammar can define.
pub const MIN_USER_TOKEN_TYPE: i32 = 1;

/// Index of a state in [`Atn::states`].
pub type StateId = usize;

/// Caller-supplied identity of a compiled grammar.
///
/// Keys the cross-request follow-set cache; two automata with the same id
/// must be identical.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrammarId(Arc<str>);

impl GrammarId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GrammarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GrammarId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Kind of an automaton state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Basic,
    RuleStart,
    BlockStart,
    PlusBlockStart,
    StarBlockStart,
    TokenStart,
    RuleStop,
    BlockEnd,
    StarLoopBack,
    StarLoopEntry,
    PlusLoopBack,
    LoopEnd,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Basic => "BASIC",
            StateKind::RuleStart => "RULE_START",
            StateKind::BlockStart => "BLOCK_START",
            StateKind::PlusBlockStart => "PLUS_BLOCK_START",
            StateKind::StarBlockStart => "STAR_BLOCK_START",
            StateKind::TokenStart => "TOKEN_START",
            StateKind::RuleStop => "RULE_STOP",
            StateKind::BlockEnd => "BLOCK_END",
            StateKind::StarLoopBack => "STAR_LOOP_BACK",
            StateKind::StarLoopEntry => "STAR_LOOP_ENTRY",
            StateKind::PlusLoopBack => "PLUS_LOOP_BACK",
            StateKind::LoopEnd => "LOOP_END",
        };
        f.write_str(name)
    }
}

/// A node of the automaton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtnState {
    pub number: StateId,
    pub rule_index: usize,
    pub kind: StateKind,
    pub transitions: Vec<Transition>,
    /// Set on the start state of a left-recursive rule.
    pub precedence_rule: bool,
}

impl AtnState {
    pub fn new(number: StateId, rule_index: usize, kind: StateKind) -> Self {
        Self {
            number,
            rule_index,
            kind,
            transitions: Vec::new(),
            precedence_rule: false,
        }
    }
}

/// The complete automaton of one grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atn {
    pub grammar: GrammarId,
    pub states: Vec<AtnState>,
    pub rule_to_start_state: Vec<StateId>,
    pub rule_to_stop_state: Vec<StateId>,
    pub max_token_type: i32,
}

impl Atn {
    pub fn state(&self, number: StateId) -> &AtnState {
        &self.states[number]
    }

    pub fn rule_count(&self) -> usize {
        self.rule_to_start_state.len()
    }

    /// Start state of `rule_index`.
    pub fn rule_start(&self, rule_index: usize) -> Result<&AtnState> {
        self.rule_to_start_state
            .get(rule_index)
            .map(|&number| self.state(number))
            .ok_or_else(|| {
                GrammarError::OutOfRange {
                    what: "rule index",
                    index: rule_index,
                }
                .into()
            })
    }

    /// Stop state of `rule_index`.
    pub fn rule_stop(&self, rule_index: usize) -> Result<&AtnState> {
        self.rule_to_stop_state
            .get(rule_index)
            .map(|&number| self.state(number))
            .ok_or_else(|| {
                GrammarError::OutOfRange {
                    what: "rule index",
                    index: rule_index,
                }
                .into()
            })
    }

    /// Every user token type of the grammar.
    pub fn user_token_types(&self) -> IntervalSet {
        IntervalSet::of(MIN_USER_TOKEN_TYPE, self.max_token_type)
    }
}

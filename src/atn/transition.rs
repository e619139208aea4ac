//! Edges of the automaton.

use std::fmt;

use super::{IntervalSet, StateId, Vocabulary};

/// Outgoing edge of an automaton state.
///
/// Every variant names its target state. Epsilon-like variants (rule calls,
/// predicates, precedence checks, actions) consume no input; the labeled
/// variants consume exactly one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Unconditional, consumes nothing.
    Epsilon { target: StateId },

    /// Matches a single token type.
    Atom { target: StateId, label: i32 },

    /// Matches any token type in `from..=to`.
    Range { target: StateId, from: i32, to: i32 },

    /// Matches any token type in the set.
    Set { target: StateId, set: IntervalSet },

    /// Matches any user token type not in the set.
    NotSet { target: StateId, set: IntervalSet },

    /// Matches any single token.
    Wildcard { target: StateId },

    /// Calls a sub-rule. `target` is the callee's start state, `follow_state`
    /// is where the caller resumes once the callee reaches its stop state.
    Rule {
        target: StateId,
        rule_index: usize,
        precedence: i32,
        follow_state: StateId,
    },

    /// Gated by a semantic predicate.
    Predicate {
        target: StateId,
        rule_index: usize,
        pred_index: usize,
        ctx_dependent: bool,
    },

    /// Gated by the precedence level of the enclosing left-recursive rule.
    Precedence { target: StateId, precedence: i32 },

    /// Embedded action; transparent to matching.
    Action {
        target: StateId,
        rule_index: usize,
        action_index: usize,
    },
}

impl Transition {
    pub fn target(&self) -> StateId {
        match self {
            Transition::Epsilon { target }
            | Transition::Atom { target, .. }
            | Transition::Range { target, .. }
            | Transition::Set { target, .. }
            | Transition::NotSet { target, .. }
            | Transition::Wildcard { target }
            | Transition::Rule { target, .. }
            | Transition::Predicate { target, .. }
            | Transition::Precedence { target, .. }
            | Transition::Action { target, .. } => *target,
        }
    }

    /// Whether following this edge consumes no input.
    pub fn is_epsilon(&self) -> bool {
        matches!(
            self,
            Transition::Epsilon { .. }
                | Transition::Rule { .. }
                | Transition::Predicate { .. }
                | Transition::Precedence { .. }
                | Transition::Action { .. }
        )
    }

    /// Token types this edge is labeled with, before any complement.
    ///
    /// `None` for wildcard and epsilon-like edges.
    pub fn label(&self) -> Option<IntervalSet> {
        match self {
            Transition::Atom { label, .. } => Some(IntervalSet::single(*label)),
            Transition::Range { from, to, .. } => Some(IntervalSet::of(*from, *to)),
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => Some(set.clone()),
            _ => None,
        }
    }

    /// Short tag used in debug output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Transition::Epsilon { .. } => "EPSILON",
            Transition::Atom { .. } => "ATOM",
            Transition::Range { .. } => "RANGE",
            Transition::Set { .. } => "SET",
            Transition::NotSet { .. } => "NOT_SET",
            Transition::Wildcard { .. } => "WILDCARD",
            Transition::Rule { .. } => "RULE",
            Transition::Predicate { .. } => "PREDICATE",
            Transition::Precedence { .. } => "PRECEDENCE",
            Transition::Action { .. } => "ACTION",
        }
    }

    /// Render the edge with token names taken from `vocabulary`.
    pub fn describe<'a>(&'a self, vocabulary: &'a Vocabulary) -> impl fmt::Display + 'a {
        TransitionDisplay {
            transition: self,
            vocabulary,
        }
    }
}

struct TransitionDisplay<'a> {
    transition: &'a Transition,
    vocabulary: &'a Vocabulary,
}

impl fmt::Display for TransitionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let transition = self.transition;
        write!(f, "{}", transition.kind_name())?;
        match transition {
            Transition::Atom { label, .. } => {
                write!(f, " {}", self.vocabulary.display_name(*label))?;
            }
            Transition::Range { from, to, .. } => write!(
                f,
                " {}..{}",
                self.vocabulary.display_name(*from),
                self.vocabulary.display_name(*to)
            )?,
            Transition::Set { set, .. } | Transition::NotSet { set, .. } => {
                let names: Vec<String> =
                    set.iter().map(|t| self.vocabulary.display_name(t)).collect();
                write!(f, " [{}]", names.join(", "))?;
            }
            Transition::Rule { rule_index, .. } => write!(f, " rule {rule_index}")?,
            _ => {}
        }
        write!(f, " -> {}", transition.target())
    }
}

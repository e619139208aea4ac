//! Per-rule follow sets and the cache that keeps them across requests.
//!
//! For a rule start state we collect, independent of any input, which token
//! types can be matched first when entering the rule, split by the path of
//! sub-rules taken to reach them. The combined set answers "can this rule
//! match here at all" in one lookup; the per-path sets let the walker
//! translate a candidate into a preferred rule on that path.
//!
//! Follow sets are computed once per grammar and rule and then shared by
//! every request made against the same [`FollowSetCache`].

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::call_stack::CallStack;
use crate::atn::{Atn, EPSILON, GrammarId, IntervalSet, StateId, StateKind, Transition};
use crate::error::Result;
use crate::recognizer::Recognizer;

/// Token types reachable along one path of sub-rule calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSetWithPath {
    /// Matchable token types; [`EPSILON`] if the path reaches the rule end
    pub intervals: IntervalSet,
    /// Sub-rules entered to get here, outermost first
    pub path: Vec<usize>,
    /// Tokens that deterministically follow a single-token match
    pub following: Vec<i32>,
}

/// Follow sets of one rule start state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowSetsHolder {
    pub sets: Vec<FollowSetWithPath>,
    /// Union of all `sets`
    pub combined: IntervalSet,
    /// A semantic predicate was evaluated while collecting the sets
    pub predicate_dependent: bool,
}

/// Follow sets by grammar and rule start state.
#[derive(Debug, Default)]
pub struct FollowSetCache {
    grammars: HashMap<GrammarId, HashMap<StateId, Arc<FollowSetsHolder>>>,
}

/// Cache shared between a provider and the requests it runs.
pub type SharedFollowSetCache = Arc<RwLock<FollowSetCache>>;

impl FollowSetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache ready to be shared
    pub fn shared() -> SharedFollowSetCache {
        Arc::new(RwLock::new(Self::new()))
    }

    pub fn get(&self, grammar: &GrammarId, state: StateId) -> Option<Arc<FollowSetsHolder>> {
        self.grammars
            .get(grammar)
            .and_then(|states| states.get(&state))
            .cloned()
    }

    /// Store `holder`, replacing any previous entry, and hand out the shared copy.
    pub fn insert(
        &mut self,
        grammar: GrammarId,
        state: StateId,
        holder: FollowSetsHolder,
    ) -> Arc<FollowSetsHolder> {
        let holder = Arc::new(holder);
        self.grammars
            .entry(grammar)
            .or_default()
            .insert(state, Arc::clone(&holder));
        holder
    }

    /// Drop everything cached for `grammar`. Returns whether anything was cached.
    pub fn invalidate(&mut self, grammar: &GrammarId) -> bool {
        self.grammars.remove(grammar).is_some()
    }

    pub fn clear(&mut self) {
        self.grammars.clear();
    }

    /// Number of cached holders for `grammar`
    pub fn holder_count(&self, grammar: &GrammarId) -> usize {
        self.grammars.get(grammar).map_or(0, HashMap::len)
    }

    /// Number of cached holders across all grammars
    pub fn len(&self) -> usize {
        self.grammars.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Depth-first follow-set collection for one rule.
pub(crate) struct FollowSetCollector<'a, R: Recognizer + ?Sized> {
    atn: &'a Atn,
    recognizer: &'a mut R,
    ignored_tokens: &'a dyn Fn(i32) -> bool,
    seen: HashSet<StateId>,
    predicate_dependent: bool,
}

impl<'a, R: Recognizer + ?Sized> FollowSetCollector<'a, R> {
    pub(crate) fn new(
        atn: &'a Atn,
        recognizer: &'a mut R,
        ignored_tokens: &'a dyn Fn(i32) -> bool,
    ) -> Self {
        Self {
            atn,
            recognizer,
            ignored_tokens,
            seen: HashSet::new(),
            predicate_dependent: false,
        }
    }

    /// Collect the follow sets between `start` and `stop` of one rule.
    pub(crate) fn determine(mut self, start: StateId, stop: StateId) -> Result<FollowSetsHolder> {
        let mut sets = Vec::new();
        let mut rule_stack = CallStack::new();
        self.collect(start, stop, &mut sets, &mut rule_stack)?;

        let mut combined = IntervalSet::new();
        for set in &sets {
            combined.add_set(&set.intervals);
        }
        debug!(
            "Follow sets for state {start}: {} path(s), combined {combined}",
            sets.len()
        );

        Ok(FollowSetsHolder {
            sets,
            combined,
            predicate_dependent: self.predicate_dependent,
        })
    }

    fn collect(
        &mut self,
        state: StateId,
        stop: StateId,
        sets: &mut Vec<FollowSetWithPath>,
        rule_stack: &mut CallStack,
    ) -> Result<()> {
        if !self.seen.insert(state) {
            return Ok(());
        }

        let atn = self.atn;
        let current = atn.state(state);
        if state == stop || current.kind == StateKind::RuleStop {
            sets.push(FollowSetWithPath {
                intervals: IntervalSet::single(EPSILON),
                path: rule_stack.as_slice().to_vec(),
                following: Vec::new(),
            });
            return Ok(());
        }

        for transition in &current.transitions {
            match transition {
                Transition::Rule {
                    target, rule_index, ..
                } => {
                    // Recursive references are not expanded a second time on the same path
                    if rule_stack.contains(*rule_index) {
                        continue;
                    }
                    let mut frame = rule_stack.enter(*rule_index);
                    self.collect(*target, stop, sets, &mut frame)?;
                }
                Transition::Predicate {
                    target,
                    rule_index,
                    pred_index,
                    ..
                } => {
                    self.predicate_dependent = true;
                    if self.recognizer.sempred(*rule_index, *pred_index)? {
                        self.collect(*target, stop, sets, rule_stack)?;
                    }
                }
                Transition::Epsilon { target }
                | Transition::Precedence { target, .. }
                | Transition::Action { target, .. } => {
                    self.collect(*target, stop, sets, rule_stack)?;
                }
                Transition::Wildcard { .. } => {
                    sets.push(FollowSetWithPath {
                        intervals: atn.user_token_types(),
                        path: rule_stack.as_slice().to_vec(),
                        following: Vec::new(),
                    });
                }
                Transition::Atom { .. }
                | Transition::Range { .. }
                | Transition::Set { .. }
                | Transition::NotSet { .. } => {
                    let Some(mut label) = transition.label() else {
                        continue;
                    };
                    if label.is_empty() {
                        continue;
                    }
                    if matches!(transition, Transition::NotSet { .. }) {
                        label = label.complement(&atn.user_token_types());
                    }
                    sets.push(FollowSetWithPath {
                        intervals: label,
                        path: rule_stack.as_slice().to_vec(),
                        following: following_tokens(atn, transition, self.ignored_tokens),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Tokens that must follow once `transition` has matched: the chain of
/// single-token atom transitions leaving its target.
pub(crate) fn following_tokens(
    atn: &Atn,
    transition: &Transition,
    ignored_tokens: &dyn Fn(i32) -> bool,
) -> Vec<i32> {
    let mut result = Vec::new();
    let mut pipeline = vec![transition.target()];
    let mut seen = HashSet::from([transition.target()]);

    while let Some(state) = pipeline.pop() {
        for next in &atn.state(state).transitions {
            if let Transition::Atom { target, label } = next {
                if !ignored_tokens(*label) && seen.insert(*target) {
                    result.push(*label);
                    pipeline.push(*target);
                }
            }
        }
    }
    result
}

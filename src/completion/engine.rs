//! Completion engine - walks the grammar automaton up to the caret
//!
//! This module provides [`CodeCompletionCore`], which simulates the parser on
//! the tokens before the caret and collects everything the grammar allows at
//! the caret position:
//! 1. Buffer the on-channel tokens from the start token up to the caret token
//! 2. Walk the start rule's automaton, entering sub-rules as they are called
//! 3. At the caret, report follow sets as token candidates, or as preferred
//!    rule candidates when a preferred rule is on the call path
//! 4. Resolve the input span of each preferred rule seen during the walk

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::call_stack::CallStack;
use super::candidates::CandidatesCollection;
use super::follow_sets::{FollowSetCache, FollowSetCollector, FollowSetsHolder, following_tokens};
use super::token_stream::{Token, TokenStream};
use crate::atn::{Atn, AtnState, EPSILON, GrammarId, StateId, StateKind, Transition};
use crate::config::{CompletionConfig, Config, DebugConfig};
use crate::error::{Result, TokenStreamError};
use crate::recognizer::Recognizer;

/// Rule and token to start the walk from, for completing inside a
/// construct whose beginning is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleContext {
    pub rule_index: usize,
    /// Stream index of the first token the rule matches
    pub start_token_index: usize,
}

impl RuleContext {
    pub fn new(rule_index: usize, start_token_index: usize) -> Self {
        Self {
            rule_index,
            start_token_index,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PipelineEntry {
    state: StateId,
    token_list_index: usize,
}

/// Rule-index -> (start position -> end positions) of finished rule walks
type ShortcutMap = HashMap<usize, BTreeMap<usize, BTreeSet<usize>>>;

/// Completion core for one recognizer.
///
/// Follow sets go to the borrowed [`FollowSetCache`] and outlive the engine;
/// everything else is reset by each [`collect_candidates`] call.
///
/// [`collect_candidates`]: CodeCompletionCore::collect_candidates
pub struct CodeCompletionCore<'a, R: Recognizer + ?Sized> {
    recognizer: &'a mut R,
    cache: &'a mut FollowSetCache,
    atn: Arc<Atn>,
    grammar: GrammarId,
    config: CompletionConfig,
    debug: DebugConfig,
    preferred_rules: Box<dyn Fn(usize) -> bool + 'a>,
    ignored_tokens: Box<dyn Fn(i32) -> bool + 'a>,

    tokens: Vec<Token>,
    shortcut_map: ShortcutMap,
    candidates: CandidatesCollection,
    states_processed: usize,
    precedence_stack: Vec<i32>,
    /// Predicate-dependent holders already recomputed in this request
    refreshed: HashSet<StateId>,
    /// (rule, position) walks not finished yet
    active_walks: HashSet<(usize, usize)>,
}

impl<'a, R: Recognizer + ?Sized> CodeCompletionCore<'a, R> {
    /// Create an engine with default configuration
    ///
    /// # Arguments
    /// * `recognizer` - Parser providing automaton, token stream and predicates
    /// * `cache` - Follow-set cache shared with other requests on the same grammar
    pub fn new(recognizer: &'a mut R, cache: &'a mut FollowSetCache) -> Self {
        let atn = recognizer.atn();
        let grammar = recognizer.grammar_id();
        let defaults = Config::default();
        Self {
            recognizer,
            cache,
            atn,
            grammar,
            config: defaults.completion,
            debug: defaults.debug,
            preferred_rules: Box::new(|_| false),
            ignored_tokens: Box::new(|_| false),
            tokens: Vec::new(),
            shortcut_map: HashMap::new(),
            candidates: CandidatesCollection::new(),
            states_processed: 0,
            precedence_stack: Vec::new(),
            refreshed: HashSet::new(),
            active_walks: HashSet::new(),
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.config = config.completion.clone();
        self.debug = config.debug.clone();
        self
    }

    /// Rules reported as candidates instead of the tokens they start with
    pub fn with_preferred_rules(mut self, preferred: impl Fn(usize) -> bool + 'a) -> Self {
        self.preferred_rules = Box::new(preferred);
        self
    }

    /// Tokens never reported as candidates
    pub fn with_ignored_tokens(mut self, ignored: impl Fn(i32) -> bool + 'a) -> Self {
        self.ignored_tokens = Box::new(ignored);
        self
    }

    /// Number of (state, position) pairs processed by the last request
    pub fn states_processed(&self) -> usize {
        self.states_processed
    }

    /// Tokens buffered by the last request, caret token last
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Collect the candidates at `caret_token_index`.
    ///
    /// # Arguments
    /// * `caret_token_index` - Stream index of the token the caret is at
    /// * `context` - Rule and token to start from; rule 0 at token 0 if `None`
    ///
    /// The token stream is left at the position it had on entry.
    pub fn collect_candidates(
        &mut self,
        caret_token_index: usize,
        context: Option<RuleContext>,
    ) -> Result<CandidatesCollection> {
        self.shortcut_map.clear();
        self.candidates.clear();
        self.states_processed = 0;
        self.precedence_stack.clear();
        self.refreshed.clear();
        self.active_walks.clear();

        let context = context.unwrap_or(RuleContext::new(0, 0));
        let atn = Arc::clone(&self.atn);
        let start_state = atn.rule_start(context.rule_index)?.number;

        let stream = self.recognizer.token_stream_mut();
        let saved_index = stream.index();
        let buffered = buffer_tokens(stream, context.start_token_index, caret_token_index);
        stream.seek(saved_index);
        self.tokens = buffered?;

        debug!(
            "Collecting candidates at token {caret_token_index}, {} token(s) buffered from rule {}",
            self.tokens.len(),
            context.rule_index
        );

        let mut call_stack = CallStack::new();
        self.process_rule(start_state, 0, &mut call_stack, 0)?;
        self.resolve_rule_positions();

        debug!(
            "Processed {} state(s): {} token and {} rule candidate(s)",
            self.states_processed,
            self.candidates.tokens.len(),
            self.candidates.rules.len()
        );
        if self.debug.show_result {
            debug!(
                "\n{}",
                self.candidates
                    .describe(self.recognizer.vocabulary(), self.recognizer.rule_names())
            );
        }

        Ok(self.candidates.clone())
    }

    /// Walk the rule starting at `start_state` from buffer position
    /// `token_list_index`; returns the positions at which the rule can end.
    fn process_rule(
        &mut self,
        start_state: StateId,
        token_list_index: usize,
        call_stack: &mut CallStack,
        precedence: i32,
    ) -> Result<BTreeSet<usize>> {
        let atn = Arc::clone(&self.atn);
        let start = atn.state(start_state);

        if let Some(ends) = self
            .shortcut_map
            .get(&start.rule_index)
            .and_then(|positions| positions.get(&token_list_index))
        {
            return Ok(ends.clone());
        }
        // Left recursion re-enters a walk that has not consumed anything yet
        if self.active_walks.contains(&(start.rule_index, token_list_index)) {
            return Ok(BTreeSet::new());
        }

        let follow_sets = self.follow_sets_for(start)?;
        let mut frame = call_stack.enter(start.rule_index);
        let mut result = BTreeSet::new();
        let caret_index = self.tokens.len().saturating_sub(1);

        if token_list_index >= caret_index {
            if (self.preferred_rules)(start.rule_index) {
                self.translate_stack_to_rule_index(frame.as_slice());
            } else {
                for set in &follow_sets.sets {
                    let full_path = frame.extended(&set.path);
                    if self.translate_stack_to_rule_index(&full_path) {
                        continue;
                    }
                    for symbol in set.intervals.iter() {
                        if symbol != EPSILON && !(self.ignored_tokens)(symbol) {
                            self.candidates.add_token(symbol, &set.following);
                        }
                    }
                }
            }
            return Ok(result);
        }

        // Rule cannot match the current token and cannot be skipped
        let current_symbol = self.tokens[token_list_index].token_type;
        if !follow_sets.combined.contains(EPSILON) && !follow_sets.combined.contains(current_symbol) {
            return Ok(result);
        }

        self.active_walks.insert((start.rule_index, token_list_index));
        if start.precedence_rule {
            self.precedence_stack.push(precedence);
        }

        let mut pipeline = vec![PipelineEntry {
            state: start_state,
            token_list_index,
        }];

        while let Some(entry) = pipeline.pop() {
            if self.states_processed >= self.config.iteration_limit {
                if !self.candidates.truncated {
                    warn!(
                        "Iteration limit of {} reached, candidates are incomplete",
                        self.config.iteration_limit
                    );
                }
                self.candidates.truncated = true;
                break;
            }
            self.states_processed += 1;

            let state = atn.state(entry.state);
            let at_caret = entry.token_list_index >= caret_index;
            let current_symbol = self.tokens[entry.token_list_index].token_type;
            if self.debug.show_debug_output {
                self.log_state(state, entry.token_list_index, frame.as_slice());
            }

            if state.kind == StateKind::RuleStop {
                result.insert(entry.token_list_index);
                continue;
            }

            for transition in &state.transitions {
                match transition {
                    Transition::Rule {
                        target,
                        precedence,
                        follow_state,
                        ..
                    } => {
                        let ends =
                            self.process_rule(*target, entry.token_list_index, &mut frame, *precedence)?;
                        for position in ends {
                            pipeline.push(PipelineEntry {
                                state: *follow_state,
                                token_list_index: position,
                            });
                        }
                    }
                    Transition::Predicate {
                        target,
                        rule_index,
                        pred_index,
                        ..
                    } => {
                        if self.recognizer.sempred(*rule_index, *pred_index)? {
                            pipeline.push(PipelineEntry {
                                state: *target,
                                token_list_index: entry.token_list_index,
                            });
                        }
                    }
                    Transition::Precedence { target, precedence } => {
                        if self
                            .precedence_stack
                            .last()
                            .is_some_and(|&top| *precedence >= top)
                        {
                            pipeline.push(PipelineEntry {
                                state: *target,
                                token_list_index: entry.token_list_index,
                            });
                        }
                    }
                    Transition::Epsilon { target } | Transition::Action { target, .. } => {
                        pipeline.push(PipelineEntry {
                            state: *target,
                            token_list_index: entry.token_list_index,
                        });
                    }
                    Transition::Wildcard { target } => {
                        if at_caret {
                            if !self.translate_stack_to_rule_index(frame.as_slice()) {
                                for symbol in atn.user_token_types().iter() {
                                    if !(self.ignored_tokens)(symbol) {
                                        self.candidates.add_token(symbol, &[]);
                                    }
                                }
                            }
                        } else {
                            pipeline.push(PipelineEntry {
                                state: *target,
                                token_list_index: entry.token_list_index + 1,
                            });
                        }
                    }
                    Transition::Atom { target, .. }
                    | Transition::Range { target, .. }
                    | Transition::Set { target, .. }
                    | Transition::NotSet { target, .. } => {
                        let Some(mut set) = transition.label() else {
                            continue;
                        };
                        if set.is_empty() {
                            continue;
                        }
                        if matches!(transition, Transition::NotSet { .. }) {
                            set = set.complement(&atn.user_token_types());
                        }

                        if at_caret {
                            if self.translate_stack_to_rule_index(frame.as_slice()) {
                                continue;
                            }
                            let following = if set.singleton().is_some() {
                                following_tokens(&atn, transition, &*self.ignored_tokens)
                            } else {
                                Vec::new()
                            };
                            for symbol in set.iter() {
                                if !(self.ignored_tokens)(symbol) {
                                    self.candidates.add_token(symbol, &following);
                                }
                            }
                        } else if set.contains(current_symbol) {
                            pipeline.push(PipelineEntry {
                                state: *target,
                                token_list_index: entry.token_list_index + 1,
                            });
                        }
                    }
                }
            }
        }

        if start.precedence_rule {
            self.precedence_stack.pop();
        }
        self.active_walks.remove(&(start.rule_index, token_list_index));

        self.shortcut_map
            .entry(start.rule_index)
            .or_default()
            .insert(token_list_index, result.clone());
        Ok(result)
    }

    /// Follow sets for a rule start state, from the cache when possible.
    fn follow_sets_for(&mut self, start: &AtnState) -> Result<Arc<FollowSetsHolder>> {
        if let Some(holder) = self.cache.get(&self.grammar, start.number) {
            let stale = holder.predicate_dependent
                && self.config.refresh_predicated_follow_sets
                && !self.refreshed.contains(&start.number);
            if !stale {
                return Ok(holder);
            }
        }

        let stop = self.atn.rule_stop(start.rule_index)?.number;
        let holder = FollowSetCollector::new(&self.atn, &mut *self.recognizer, &*self.ignored_tokens)
            .determine(start.number, stop)?;
        if holder.predicate_dependent {
            self.refreshed.insert(start.number);
        }
        Ok(self.cache.insert(self.grammar.clone(), start.number, holder))
    }

    /// Record the outermost preferred rule on `rule_stack` as a candidate.
    /// Returns whether `rule_stack` contains a preferred rule at all.
    fn translate_stack_to_rule_index(&mut self, rule_stack: &[usize]) -> bool {
        for (i, &rule) in rule_stack.iter().enumerate() {
            if (self.preferred_rules)(rule) {
                if self.candidates.add_rule(rule, &rule_stack[..i]) && self.debug.show_debug_output {
                    trace!("=====> collected rule {rule} with path {:?}", &rule_stack[..i]);
                }
                return true;
            }
        }
        false
    }

    /// Character span of every preferred rule that finished a walk.
    ///
    /// Uses the latest start position of the rule and the furthest position
    /// it ended at; with no recorded end, the span runs to the last buffered
    /// token.
    fn resolve_rule_positions(&mut self) {
        let last = self.tokens.len().saturating_sub(1);
        for (&rule, positions) in &self.shortcut_map {
            if !(self.preferred_rules)(rule) {
                continue;
            }
            let Some((&start_index, ends)) = positions.last_key_value() else {
                continue;
            };
            let end_index = ends.last().copied().unwrap_or(last);
            let (Some(start_token), Some(end_token)) =
                (self.tokens.get(start_index), self.tokens.get(end_index))
            else {
                continue;
            };

            let start_offset = start_token.start;
            let end_offset = if end_token.is_eof() {
                end_token.start
            } else if end_index > start_index {
                self.tokens[end_index - 1].end
            } else {
                start_offset
            };
            self.candidates
                .rule_positions
                .insert(rule, start_offset..end_offset.max(start_offset));
        }
    }

    fn log_state(&self, state: &AtnState, token_list_index: usize, rule_stack: &[usize]) {
        let vocabulary = self.recognizer.vocabulary();
        let rule_names = self.recognizer.rule_names();
        let rule_name = |rule: usize| {
            rule_names
                .get(rule)
                .map_or_else(|| rule.to_string(), Clone::clone)
        };
        let symbol = self
            .tokens
            .get(token_list_index)
            .map(|token| vocabulary.display_name(token.token_type))
            .unwrap_or_default();

        trace!(
            "State {} ({}) in {}, token index {token_list_index}: {symbol}",
            state.number,
            state.kind,
            rule_name(state.rule_index)
        );
        if self.debug.show_rule_stack {
            let names: Vec<String> = rule_stack.iter().map(|&rule| rule_name(rule)).collect();
            trace!("  rule stack: {}", names.join(" > "));
        }
        if self.debug.debug_output_with_transitions {
            for transition in &state.transitions {
                trace!("  {}", transition.describe(vocabulary));
            }
        }
    }

    /// Walk one rule from a buffer position without resetting request state
    #[cfg(test)]
    pub(crate) fn process_rule_at(
        &mut self,
        rule_index: usize,
        token_list_index: usize,
    ) -> Result<BTreeSet<usize>> {
        let start = self.atn.rule_start(rule_index)?.number;
        let mut call_stack = CallStack::new();
        self.process_rule(start, token_list_index, &mut call_stack, 0)
    }
}

/// Read on-channel tokens from `start_index` up to and including the first
/// token at or past `caret_token_index`, or EOF.
fn buffer_tokens(
    stream: &mut dyn TokenStream,
    start_index: usize,
    caret_token_index: usize,
) -> Result<Vec<Token>> {
    stream.seek(start_index);
    let mut tokens = Vec::new();
    let mut lookahead = 1;
    loop {
        let token = stream
            .lt(lookahead)
            .ok_or(TokenStreamError::Exhausted { position: lookahead })?;
        lookahead += 1;

        let Some(index) = token.index else {
            return Err(TokenStreamError::InvalidTokenIndex {
                token_type: token.token_type,
                position: tokens.len(),
            }
            .into());
        };
        let done = index >= caret_token_index || token.is_eof();
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

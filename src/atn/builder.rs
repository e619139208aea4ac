//! Builds an [`Atn`] from a combinator grammar description.
//!
//! The layout matches what a parser generator emits for the same rules:
//! adjacent elements chain directly (the target of one element's transition
//! is where the next element's transition leaves from), alternatives hang off
//! a block start and join at a block end, and loops get entry, loop-back and
//! loop-end states. Rule references carry the state the caller resumes in.

use std::collections::HashMap;
use std::sync::Arc;

use super::{
    Atn, AtnState, GrammarId, IntervalSet, StateId, StateKind, Transition, Vocabulary,
};
use crate::error::{GrammarError, Result};

/// Grammar element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// A single token type.
    Token(i32),
    /// Any of the listed token types.
    Set(Vec<i32>),
    /// Any user token type except the listed ones.
    NotSet(Vec<i32>),
    /// Any single token.
    Wildcard,
    /// Reference to another rule by name.
    Rule(String),
    /// Reference to a left-recursive rule with a precedence level.
    RuleWithPrecedence(String, i32),
    Seq(Vec<Element>),
    Alt(Vec<Element>),
    Optional(Box<Element>),
    Star(Box<Element>),
    Plus(Box<Element>),
    /// Semantic predicate, evaluated through the recognizer by index.
    Predicate(usize),
    /// Precedence guard of a left-recursive rule.
    Precedence(i32),
    /// Embedded action.
    Action(usize),
}

impl Element {
    pub fn token(token_type: i32) -> Self {
        Element::Token(token_type)
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Element::Rule(name.into())
    }

    pub fn seq(items: impl IntoIterator<Item = Element>) -> Self {
        Element::Seq(items.into_iter().collect())
    }

    pub fn alt(items: impl IntoIterator<Item = Element>) -> Self {
        Element::Alt(items.into_iter().collect())
    }

    pub fn opt(element: Element) -> Self {
        Element::Optional(Box::new(element))
    }

    pub fn star(element: Element) -> Self {
        Element::Star(Box::new(element))
    }

    pub fn plus(element: Element) -> Self {
        Element::Plus(Box::new(element))
    }
}

/// A built grammar: automaton, vocabulary and rule names.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub atn: Arc<Atn>,
    pub vocabulary: Arc<Vocabulary>,
    pub rule_names: Arc<[String]>,
}

impl Grammar {
    pub fn id(&self) -> &GrammarId {
        &self.atn.grammar
    }

    /// Index of the rule called `name`.
    pub fn rule_index(&self, name: &str) -> Option<usize> {
        self.rule_names.iter().position(|rule| rule == name)
    }
}

struct RuleDef {
    name: String,
    body: Element,
    precedence_rule: bool,
}

/// Collects rule definitions and lays them out as an automaton.
///
/// ```
/// use atn_completion::atn::{Element, GrammarBuilder, Vocabulary};
///
/// let vocabulary = Vocabulary::from_tokens(&[("ID", None), ("SEMI", Some("';'"))]);
/// let grammar = GrammarBuilder::new("Tiny", vocabulary)
///     .rule("stat", Element::seq([Element::token(1), Element::token(2)]))
///     .build()
///     .unwrap();
/// assert_eq!(grammar.rule_index("stat"), Some(0));
/// ```
pub struct GrammarBuilder {
    grammar: GrammarId,
    vocabulary: Vocabulary,
    rules: Vec<RuleDef>,
}

impl GrammarBuilder {
    pub fn new(grammar: impl Into<GrammarId>, vocabulary: Vocabulary) -> Self {
        Self {
            grammar: grammar.into(),
            vocabulary,
            rules: Vec::new(),
        }
    }

    /// Define the next rule. Rules are indexed in definition order.
    pub fn rule(mut self, name: impl Into<String>, body: Element) -> Self {
        self.rules.push(RuleDef {
            name: name.into(),
            body,
            precedence_rule: false,
        });
        self
    }

    /// Define a left-recursive rule whose alternatives are guarded by
    /// [`Element::Precedence`].
    pub fn precedence_rule(mut self, name: impl Into<String>, body: Element) -> Self {
        self.rules.push(RuleDef {
            name: name.into(),
            body,
            precedence_rule: true,
        });
        self
    }

    pub fn build(self) -> Result<Grammar> {
        if self.rules.is_empty() {
            return Err(GrammarError::Empty.into());
        }

        let mut rule_indices = HashMap::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule_indices.insert(rule.name.clone(), index).is_some() {
                return Err(GrammarError::DuplicateRule(rule.name.clone()).into());
            }
        }

        let mut layout = Layout {
            states: Vec::new(),
            rule_indices: &rule_indices,
            rule_to_start_state: Vec::with_capacity(self.rules.len()),
            max_label: 0,
        };

        // Start and stop states first so rule calls can target any rule.
        for (index, rule) in self.rules.iter().enumerate() {
            let start = layout.add_state(index, StateKind::RuleStart);
            layout.states[start].precedence_rule = rule.precedence_rule;
            layout.rule_to_start_state.push(start);
        }
        let rule_to_stop_state: Vec<StateId> = (0..self.rules.len())
            .map(|index| layout.add_state(index, StateKind::RuleStop))
            .collect();

        for (index, rule) in self.rules.iter().enumerate() {
            let start = layout.rule_to_start_state[index];
            let end = layout.element(&rule.body, start, index)?;
            layout.epsilon(end, rule_to_stop_state[index]);
        }

        let max_token_type = self.vocabulary.max_token_type().max(layout.max_label);
        let atn = Atn {
            grammar: self.grammar,
            states: layout.states,
            rule_to_start_state: layout.rule_to_start_state,
            rule_to_stop_state,
            max_token_type,
        };
        let rule_names: Vec<String> = self.rules.into_iter().map(|rule| rule.name).collect();

        Ok(Grammar {
            atn: Arc::new(atn),
            vocabulary: Arc::new(self.vocabulary),
            rule_names: rule_names.into(),
        })
    }
}

struct Layout<'a> {
    states: Vec<AtnState>,
    rule_indices: &'a HashMap<String, usize>,
    rule_to_start_state: Vec<StateId>,
    max_label: i32,
}

impl Layout<'_> {
    fn add_state(&mut self, rule_index: usize, kind: StateKind) -> StateId {
        let number = self.states.len();
        self.states.push(AtnState::new(number, rule_index, kind));
        number
    }

    fn add_transition(&mut self, from: StateId, transition: Transition) {
        self.states[from].transitions.push(transition);
    }

    fn epsilon(&mut self, from: StateId, target: StateId) {
        self.add_transition(from, Transition::Epsilon { target });
    }

    fn lookup(&self, name: &str) -> Result<usize> {
        self.rule_indices
            .get(name)
            .copied()
            .ok_or_else(|| GrammarError::UnknownRule(name.to_string()).into())
    }

    fn note_labels(&mut self, labels: &[i32]) {
        if let Some(max) = labels.iter().copied().max() {
            self.max_label = self.max_label.max(max);
        }
    }

    /// Lay out `element` leaving from `from`; returns the state it ends in.
    fn element(&mut self, element: &Element, from: StateId, rule: usize) -> Result<StateId> {
        let end = match element {
            Element::Token(token_type) => {
                self.note_labels(&[*token_type]);
                let target = self.add_state(rule, StateKind::Basic);
                self.add_transition(
                    from,
                    Transition::Atom {
                        target,
                        label: *token_type,
                    },
                );
                target
            }
            Element::Set(types) => {
                self.note_labels(types);
                let target = self.add_state(rule, StateKind::Basic);
                let set: IntervalSet = types.iter().copied().collect();
                self.add_transition(from, Transition::Set { target, set });
                target
            }
            Element::NotSet(types) => {
                self.note_labels(types);
                let target = self.add_state(rule, StateKind::Basic);
                let set: IntervalSet = types.iter().copied().collect();
                self.add_transition(from, Transition::NotSet { target, set });
                target
            }
            Element::Wildcard => {
                let target = self.add_state(rule, StateKind::Basic);
                self.add_transition(from, Transition::Wildcard { target });
                target
            }
            Element::Rule(name) => self.rule_call(name, 0, from, rule)?,
            Element::RuleWithPrecedence(name, precedence) => {
                self.rule_call(name, *precedence, from, rule)?
            }
            Element::Seq(items) => {
                let mut current = from;
                for item in items {
                    current = self.element(item, current, rule)?;
                }
                current
            }
            Element::Alt(alternatives) => {
                let block_start = self.add_state(rule, StateKind::BlockStart);
                self.epsilon(from, block_start);
                let block_end = self.add_state(rule, StateKind::BlockEnd);
                for alternative in alternatives {
                    let alt_end = self.element(alternative, block_start, rule)?;
                    self.epsilon(alt_end, block_end);
                }
                block_end
            }
            Element::Optional(inner) => {
                let block_start = self.add_state(rule, StateKind::BlockStart);
                self.epsilon(from, block_start);
                let block_end = self.add_state(rule, StateKind::BlockEnd);
                let inner_end = self.element(inner, block_start, rule)?;
                self.epsilon(inner_end, block_end);
                self.epsilon(block_start, block_end);
                block_end
            }
            Element::Star(inner) => {
                let entry = self.add_state(rule, StateKind::StarLoopEntry);
                self.epsilon(from, entry);
                let block_start = self.add_state(rule, StateKind::StarBlockStart);
                self.epsilon(entry, block_start);
                let inner_end = self.element(inner, block_start, rule)?;
                let loop_back = self.add_state(rule, StateKind::StarLoopBack);
                self.epsilon(inner_end, loop_back);
                self.epsilon(loop_back, entry);
                let loop_end = self.add_state(rule, StateKind::LoopEnd);
                self.epsilon(entry, loop_end);
                loop_end
            }
            Element::Plus(inner) => {
                let block_start = self.add_state(rule, StateKind::PlusBlockStart);
                self.epsilon(from, block_start);
                let inner_end = self.element(inner, block_start, rule)?;
                let loop_back = self.add_state(rule, StateKind::PlusLoopBack);
                self.epsilon(inner_end, loop_back);
                self.epsilon(loop_back, block_start);
                let loop_end = self.add_state(rule, StateKind::LoopEnd);
                self.epsilon(loop_back, loop_end);
                loop_end
            }
            Element::Predicate(pred_index) => {
                let target = self.add_state(rule, StateKind::Basic);
                self.add_transition(
                    from,
                    Transition::Predicate {
                        target,
                        rule_index: rule,
                        pred_index: *pred_index,
                        ctx_dependent: false,
                    },
                );
                target
            }
            Element::Precedence(precedence) => {
                let target = self.add_state(rule, StateKind::Basic);
                self.add_transition(
                    from,
                    Transition::Precedence {
                        target,
                        precedence: *precedence,
                    },
                );
                target
            }
            Element::Action(action_index) => {
                let target = self.add_state(rule, StateKind::Basic);
                self.add_transition(
                    from,
                    Transition::Action {
                        target,
                        rule_index: rule,
                        action_index: *action_index,
                    },
                );
                target
            }
        };
        Ok(end)
    }

    fn rule_call(
        &mut self,
        name: &str,
        precedence: i32,
        from: StateId,
        rule: usize,
    ) -> Result<StateId> {
        let callee = self.lookup(name)?;
        let follow_state = self.add_state(rule, StateKind::Basic);
        let target = self.rule_to_start_state[callee];
        self.add_transition(
            from,
            Transition::Rule {
                target,
                rule_index: callee,
                precedence,
                follow_state,
            },
        );
        Ok(follow_state)
    }
}

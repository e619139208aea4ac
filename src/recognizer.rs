//! The parser-side contract the completion core walks against.
//!
//! A [`Recognizer`] exposes a grammar's automaton, vocabulary and rule names,
//! its token stream, and evaluation of the grammar's semantic predicates.
//! [`GrammarParser`] is a ready-made recognizer for automata built with
//! [`GrammarBuilder`](crate::atn::GrammarBuilder).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::atn::{Atn, Grammar, GrammarId, Vocabulary};
use crate::completion::{BufferedTokenStream, TokenStream};
use crate::error::{PredicateError, Result};

/// Trait for the parser a completion request runs against
pub trait Recognizer {
    /// Identity of the compiled grammar, used to key cached follow sets
    fn grammar_id(&self) -> GrammarId {
        self.atn().grammar.clone()
    }

    /// The grammar's automaton
    fn atn(&self) -> Arc<Atn>;

    /// Token type names
    fn vocabulary(&self) -> &Vocabulary;

    /// Rule names, indexed by rule index
    fn rule_names(&self) -> &[String];

    /// The token stream the parser reads from
    fn token_stream_mut(&mut self) -> &mut dyn TokenStream;

    /// Evaluate semantic predicate `pred_index` of rule `rule_index`.
    ///
    /// Called with an empty rule context; predicates that need a parse
    /// context must treat its absence as "passes".
    fn sempred(&mut self, _rule_index: usize, _pred_index: usize) -> Result<bool> {
        Ok(true)
    }
}

/// Semantic predicate callback. `Err` carries a failure message.
pub type PredicateFn = Box<dyn FnMut() -> std::result::Result<bool, String> + Send>;

/// Recognizer over a built [`Grammar`] and an in-memory token stream
pub struct GrammarParser {
    grammar: Grammar,
    tokens: BufferedTokenStream,
    predicates: HashMap<(usize, usize), PredicateFn>,
}

impl GrammarParser {
    /// Create a parser reading `tokens`
    pub fn new(grammar: Grammar, tokens: BufferedTokenStream) -> Self {
        Self {
            grammar,
            tokens,
            predicates: HashMap::new(),
        }
    }

    /// Register the predicate evaluated for `(rule_index, pred_index)`.
    /// Unregistered predicates pass.
    pub fn with_predicate<F>(mut self, rule_index: usize, pred_index: usize, predicate: F) -> Self
    where
        F: FnMut() -> std::result::Result<bool, String> + Send + 'static,
    {
        self.predicates
            .insert((rule_index, pred_index), Box::new(predicate));
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn tokens(&self) -> &BufferedTokenStream {
        &self.tokens
    }

    /// Replace the input, keeping grammar and predicates
    pub fn set_tokens(&mut self, tokens: BufferedTokenStream) {
        self.tokens = tokens;
    }
}

impl fmt::Debug for GrammarParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrammarParser")
            .field("grammar", self.grammar.id())
            .field("tokens", &self.tokens.size())
            .field("predicates", &self.predicates.len())
            .finish()
    }
}

impl Recognizer for GrammarParser {
    fn atn(&self) -> Arc<Atn> {
        Arc::clone(&self.grammar.atn)
    }

    fn vocabulary(&self) -> &Vocabulary {
        &self.grammar.vocabulary
    }

    fn rule_names(&self) -> &[String] {
        &self.grammar.rule_names
    }

    fn token_stream_mut(&mut self) -> &mut dyn TokenStream {
        &mut self.tokens
    }

    fn sempred(&mut self, rule_index: usize, pred_index: usize) -> Result<bool> {
        match self.predicates.get_mut(&(rule_index, pred_index)) {
            Some(predicate) => predicate().map_err(|message| {
                PredicateError::Failed {
                    rule_index,
                    pred_index,
                    message,
                }
                .into()
            }),
            None => Ok(true),
        }
    }
}

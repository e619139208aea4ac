//! Grammar-driven code completion
//!
//! This module collects, for a caret position in a token stream, every token
//! type and every preferred grammar rule the parser could accept there. It
//! works on the grammar's automaton alone and tolerates incomplete input.
//!
//! # Architecture
//!
//! The completion system consists of several components:
//!
//! - **TokenStream**: Seekable token source with caret-to-token mapping
//! - **Follow sets**: Per-rule first-token sets, cached across requests
//! - **Engine**: Walks the automaton up to the caret and collects candidates
//! - **Candidates**: Token and rule candidates plus preferred rule spans
//! - **Provider**: Owns configuration and the shared cache, runs requests
//!
//! # Examples
//!
//! ```
//! use atn_completion::atn::{Element, GrammarBuilder, Vocabulary};
//! use atn_completion::completion::{
//!     BufferedTokenStream, CompletionProvider, CompletionRequest, Token,
//! };
//! use atn_completion::recognizer::GrammarParser;
//!
//! let vocabulary = Vocabulary::from_tokens(&[("ID", None), ("EQ", Some("'='"))]);
//! let grammar = GrammarBuilder::new("Assign", vocabulary)
//!     .rule("assign", Element::seq([Element::token(1), Element::token(2), Element::token(1)]))
//!     .build()
//!     .unwrap();
//! let tokens = BufferedTokenStream::new(vec![Token::new(1, "a", 0..1)]);
//! let mut parser = GrammarParser::new(grammar, tokens);
//!
//! // Complete "a" with the caret behind it
//! let provider = CompletionProvider::default();
//! let candidates = provider
//!     .complete_at_offset(&mut parser, 1, &CompletionRequest::new())
//!     .unwrap();
//! assert!(candidates.tokens.contains_key(&2));
//! ```

mod call_stack;
mod candidates;
mod engine;
mod follow_sets;
mod provider;
mod token_stream;

#[cfg(test)]
mod tests;

pub use call_stack::{CallStack, RuleFrame};
pub use candidates::CandidatesCollection;
pub use engine::{CodeCompletionCore, RuleContext};
pub use follow_sets::{FollowSetCache, FollowSetWithPath, FollowSetsHolder, SharedFollowSetCache};
pub use provider::{CompletionProvider, CompletionRequest};
pub use token_stream::{BufferedTokenStream, DEFAULT_CHANNEL, HIDDEN_CHANNEL, Token, TokenStream};

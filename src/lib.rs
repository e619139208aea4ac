//! Grammar-driven Code Completion Library
//!
//! This library computes code completion candidates from a grammar's
//! augmented transition network: given the tokens before a caret, it reports
//! the token types and the preferred grammar rules that could appear at the
//! caret, independent of any particular language.
//!
//! # Modules
//!
//! - `atn`: Automaton model, interval sets, vocabulary and grammar builder
//! - `completion`: Token streams, follow sets and the completion engine
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `logging`: Tracing subscriber setup for hosts
//! - `recognizer`: Parser-side contract and a ready-made implementation
//!
//! # Example
//!
//! ```
//! use atn_completion::atn::{Element, GrammarBuilder, Vocabulary};
//! use atn_completion::completion::{BufferedTokenStream, CompletionProvider, CompletionRequest};
//! use atn_completion::recognizer::GrammarParser;
//!
//! let vocabulary = Vocabulary::from_tokens(&[("SELECT", Some("'select'")), ("ID", None)]);
//! let grammar = GrammarBuilder::new("Query", vocabulary)
//!     .rule("query", Element::seq([Element::token(1), Element::rule("column")]))
//!     .rule("column", Element::token(2))
//!     .build()
//!     .unwrap();
//! let mut parser = GrammarParser::new(grammar, BufferedTokenStream::new(Vec::new()));
//!
//! let provider = CompletionProvider::default();
//! let candidates = provider
//!     .complete(&mut parser, 0, &CompletionRequest::new())
//!     .unwrap();
//! assert_eq!(candidates.tokens.get(&1), Some(&vec![]));
//! ```

pub mod atn;
pub mod completion;
pub mod config;
pub mod error;
pub mod logging;
pub mod recognizer;

// Re-export commonly used types
pub use completion::{CandidatesCollection, CodeCompletionCore, CompletionProvider, CompletionRequest};
pub use config::Config;
pub use error::{CompletionError, Result};
pub use recognizer::{GrammarParser, Recognizer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}

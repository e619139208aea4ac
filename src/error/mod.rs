//! Error handling for completion requests.
//!
//! This module provides the error types shared by the automaton model, the
//! token stream contract, configuration loading and the completion core:
//! - Precondition violations on the token stream abort a request before
//!   any automaton walk begins
//! - Semantic predicate failures propagate unchanged to the caller
//! - Configuration and grammar construction errors carry the offending value
//!
//! # Example
//!
//! ```rust
//! use atn_completion::error::{CompletionError, GrammarError, Result};
//!
//! fn lookup(name: &str) -> Result<usize> {
//!     Err(GrammarError::UnknownRule(name.to_string()).into())
//! }
//!
//! assert!(matches!(lookup("expr"), Err(CompletionError::Grammar(_))));
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{
    CompletionError, ConfigError, GrammarError, PredicateError, Result, TokenStreamError,
};

use std::{fmt, io};

/// Crate-wide `Result` type using [`CompletionError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, CompletionError>;

/// Top-level error type for completion requests and their collaborators.
#[derive(Debug)]
pub enum CompletionError {
    /// Configuration errors.
    Config(ConfigError),

    /// Grammar/automaton construction errors.
    Grammar(GrammarError),

    /// Token stream precondition violations.
    TokenStream(TokenStreamError),

    /// Semantic predicate evaluation failures.
    Predicate(PredicateError),

    /// I/O errors.
    Io(io::Error),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/// Errors raised while building an automaton from a grammar description.
#[derive(Debug)]
pub enum GrammarError {
    /// A rule references a rule name that was never defined.
    UnknownRule(String),

    /// The same rule name was defined twice.
    DuplicateRule(String),

    /// The grammar has no rules at all.
    Empty,

    /// A rule index or state number is out of range for the automaton.
    OutOfRange { what: &'static str, index: usize },
}

/// Token stream precondition violations.
#[derive(Debug)]
pub enum TokenStreamError {
    /// A buffered token carries no valid stream index.
    InvalidTokenIndex { token_type: i32, position: usize },

    /// The stream produced no token where one was required.
    Exhausted { position: usize },
}

/// Semantic predicate evaluation failures.
#[derive(Debug)]
pub enum PredicateError {
    /// The predicate itself reported a failure.
    Failed {
        rule_index: usize,
        pred_index: usize,
        message: String,
    },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Config(e) => write!(f, "Configuration error: {e}"),
            CompletionError::Grammar(e) => write!(f, "Grammar error: {e}"),
            CompletionError::TokenStream(e) => write!(f, "Token stream error: {e}"),
            CompletionError::Predicate(e) => write!(f, "Predicate error: {e}"),
            CompletionError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::UnknownRule(name) => write!(f, "Reference to undefined rule '{name}'"),
            GrammarError::DuplicateRule(name) => write!(f, "Rule '{name}' is defined twice"),
            GrammarError::Empty => write!(f, "Grammar defines no rules"),
            GrammarError::OutOfRange { what, index } => {
                write!(f, "{what} {index} is out of range")
            }
        }
    }
}

impl fmt::Display for TokenStreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenStreamError::InvalidTokenIndex {
                token_type,
                position,
            } => write!(
                f,
                "Token of type {token_type} at buffer position {position} has no valid stream index"
            ),
            TokenStreamError::Exhausted { position } => {
                write!(f, "Token stream ended unexpectedly at lookahead {position}")
            }
        }
    }
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateError::Failed {
                rule_index,
                pred_index,
                message,
            } => write!(
                f,
                "Predicate {pred_index} of rule {rule_index} failed: {message}"
            ),
        }
    }
}

impl std::error::Error for CompletionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompletionError::Io(e) => Some(e),
            _ => None,
        }
    }
}
impl std::error::Error for ConfigError {}
impl std::error::Error for GrammarError {}
impl std::error::Error for TokenStreamError {}
impl std::error::Error for PredicateError {}

/* ========================= Conversions to CompletionError ========================= */

impl From<io::Error> for CompletionError {
    fn from(err: io::Error) -> Self {
        CompletionError::Io(err)
    }
}

impl From<ConfigError> for CompletionError {
    fn from(err: ConfigError) -> Self {
        CompletionError::Config(err)
    }
}

impl From<GrammarError> for CompletionError {
    fn from(err: GrammarError) -> Self {
        CompletionError::Grammar(err)
    }
}

impl From<TokenStreamError> for CompletionError {
    fn from(err: TokenStreamError) -> Self {
        CompletionError::TokenStream(err)
    }
}

impl From<PredicateError> for CompletionError {
    fn from(err: PredicateError) -> Self {
        CompletionError::Predicate(err)
    }
}

impl From<toml::de::Error> for CompletionError {
    fn from(err: toml::de::Error) -> Self {
        CompletionError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

impl From<toml::ser::Error> for CompletionError {
    fn from(err: toml::ser::Error) -> Self {
        CompletionError::Config(ConfigError::InvalidFormat(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_kind() {
        let err: CompletionError = GrammarError::UnknownRule("expr".into()).into();
        assert_eq!(
            err.to_string(),
            "Grammar error: Reference to undefined rule 'expr'"
        );
    }

    #[test]
    fn test_invalid_token_index_message() {
        let err: CompletionError = TokenStreamError::InvalidTokenIndex {
            token_type: 4,
            position: 2,
        }
        .into();
        assert!(err.to_string().contains("no valid stream index"));
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error;

        let err = CompletionError::from(io::Error::other("boom"));
        assert!(err.source().is_some());
    }
}

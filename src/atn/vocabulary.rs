//! Token type names as shown to users.

use super::EOF;

/// Literal and symbolic names of a grammar's token types.
///
/// Index `t` of either table holds the name of token type `t`; index 0 is
/// unused because user token types start at 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    literal_names: Vec<Option<String>>,
    symbolic_names: Vec<Option<String>>,
}

impl Vocabulary {
    pub fn new(literal_names: Vec<Option<String>>, symbolic_names: Vec<Option<String>>) -> Self {
        Self {
            literal_names,
            symbolic_names,
        }
    }

    /// Build from `(symbolic, literal)` pairs for token types 1, 2, ...
    ///
    /// ```
    /// use atn_completion::atn::Vocabulary;
    ///
    /// let vocabulary = Vocabulary::from_tokens(&[("ID", None), ("COLON", Some("':'"))]);
    /// assert_eq!(vocabulary.display_name(2), "':'");
    /// assert_eq!(vocabulary.display_name(1), "ID");
    /// ```
    pub fn from_tokens(tokens: &[(&str, Option<&str>)]) -> Self {
        let mut literal_names = vec![None];
        let mut symbolic_names = vec![None];
        for (symbolic, literal) in tokens {
            symbolic_names.push(Some(symbolic.to_string()));
            literal_names.push(literal.map(str::to_string));
        }
        Self::new(literal_names, symbolic_names)
    }

    /// Highest token type with a name.
    pub fn max_token_type(&self) -> i32 {
        self.literal_names.len().max(self.symbolic_names.len()) as i32 - 1
    }

    pub fn literal_name(&self, token_type: i32) -> Option<&str> {
        usize::try_from(token_type)
            .ok()
            .and_then(|i| self.literal_names.get(i))
            .and_then(|name| name.as_deref())
    }

    pub fn symbolic_name(&self, token_type: i32) -> Option<&str> {
        if token_type == EOF {
            return Some("EOF");
        }
        usize::try_from(token_type)
            .ok()
            .and_then(|i| self.symbolic_names.get(i))
            .and_then(|name| name.as_deref())
    }

    /// Literal name if there is one, else the symbolic name, else the number.
    pub fn display_name(&self, token_type: i32) -> String {
        self.literal_name(token_type)
            .or_else(|| self.symbolic_name(token_type))
            .map(str::to_string)
            .unwrap_or_else(|| token_type.to_string())
    }
}

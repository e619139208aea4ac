//! Completion candidates
//!
//! This module defines the result of a completion request: the token types
//! that can appear at the caret, the preferred rules that can start there,
//! and the input span each preferred rule covered before the caret.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use crate::atn::Vocabulary;

/// Everything a completion request found at the caret
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatesCollection {
    /// Token type -> token types that must directly follow it
    pub tokens: BTreeMap<i32, Vec<i32>>,
    /// Preferred rule index -> rule call path from the start rule, outermost first
    pub rules: BTreeMap<usize, Vec<usize>>,
    /// Preferred rule index -> character span it matched before the caret
    pub rule_positions: BTreeMap<usize, Range<usize>>,
    /// The walk hit the iteration limit; candidates may be incomplete
    pub truncated: bool,
}

impl CandidatesCollection {
    /// Create an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
        self.rules.clear();
        self.rule_positions.clear();
        self.truncated = false;
    }

    /// No token and no rule candidates
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.rules.is_empty()
    }

    /// Record `token_type` with its following tokens.
    ///
    /// A token reached again with a different following list keeps none,
    /// since the continuation is no longer unambiguous.
    pub fn add_token(&mut self, token_type: i32, following: &[i32]) {
        match self.tokens.get_mut(&token_type) {
            Some(existing) => {
                if existing.as_slice() != following {
                    existing.clear();
                }
            }
            None => {
                self.tokens.insert(token_type, following.to_vec());
            }
        }
    }

    /// Record a preferred rule candidate. The first path seen for a rule is
    /// kept; returns whether the rule was new.
    pub fn add_rule(&mut self, rule_index: usize, path: &[usize]) -> bool {
        if self.rules.contains_key(&rule_index) {
            return false;
        }
        self.rules.insert(rule_index, path.to_vec());
        true
    }

    /// Display names of the token candidates, sorted
    pub fn token_names(&self, vocabulary: &Vocabulary) -> Vec<String> {
        let mut names: Vec<String> = self
            .tokens
            .keys()
            .map(|&token_type| vocabulary.display_name(token_type))
            .collect();
        names.sort();
        names
    }

    /// Names of the rule candidates, sorted
    pub fn rule_names(&self, rule_names: &[String]) -> Vec<String> {
        let mut names: Vec<String> = self
            .rules
            .keys()
            .map(|&rule| rule_name(rule_names, rule))
            .collect();
        names.sort();
        names
    }

    /// Render with vocabulary and rule names instead of numbers
    pub fn describe<'a>(
        &'a self,
        vocabulary: &'a Vocabulary,
        rule_names: &'a [String],
    ) -> impl fmt::Display + 'a {
        Described {
            candidates: self,
            vocabulary,
            rule_names,
        }
    }
}

fn rule_name(rule_names: &[String], rule: usize) -> String {
    rule_names
        .get(rule)
        .cloned()
        .unwrap_or_else(|| format!("<rule {rule}>"))
}

impl fmt::Display for CandidatesCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collected rules:")?;
        for (rule, path) in &self.rules {
            writeln!(f, "{rule}, path: {path:?}")?;
        }
        writeln!(f, "Collected tokens:")?;
        for (token, following) in &self.tokens {
            writeln!(f, "{token} {following:?}")?;
        }
        if self.truncated {
            writeln!(f, "(truncated)")?;
        }
        Ok(())
    }
}

struct Described<'a> {
    candidates: &'a CandidatesCollection,
    vocabulary: &'a Vocabulary,
    rule_names: &'a [String],
}

impl fmt::Display for Described<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Collected rules:")?;
        for (&rule, path) in &self.candidates.rules {
            let path: Vec<String> = path
                .iter()
                .map(|&caller| rule_name(self.rule_names, caller))
                .collect();
            write!(f, "{}, path: {}", rule_name(self.rule_names, rule), path.join(" "))?;
            if let Some(span) = self.candidates.rule_positions.get(&rule) {
                write!(f, ", span: {}..{}", span.start, span.end)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "Collected tokens:")?;
        for (&token, following) in &self.candidates.tokens {
            write!(f, "{}", self.vocabulary.display_name(token))?;
            for &next in following {
                write!(f, " {}", self.vocabulary.display_name(next))?;
            }
            writeln!(f)?;
        }
        if self.candidates.truncated {
            writeln!(f, "(truncated)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_token_merges_conflicting_following() {
        let mut candidates = CandidatesCollection::new();
        candidates.add_token(4, &[5, 6]);
        candidates.add_token(4, &[5, 6]);
        assert_eq!(candidates.tokens[&4], vec![5, 6]);

        candidates.add_token(4, &[7]);
        assert_eq!(candidates.tokens[&4], Vec::<i32>::new());

        // Once emptied it stays empty
        candidates.add_token(4, &[]);
        assert_eq!(candidates.tokens[&4], Vec::<i32>::new());
    }

    #[test]
    fn test_add_rule_keeps_first_path() {
        let mut candidates = CandidatesCollection::new();
        assert!(candidates.add_rule(2, &[0, 1]));
        assert!(!candidates.add_rule(2, &[0]));
        assert_eq!(candidates.rules[&2], vec![0, 1]);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut candidates = CandidatesCollection::new();
        candidates.add_token(1, &[]);
        candidates.add_rule(0, &[]);
        candidates.rule_positions.insert(0, 0..3);
        candidates.truncated = true;

        candidates.clear();
        assert!(candidates.is_empty());
        assert!(candidates.rule_positions.is_empty());
        assert!(!candidates.truncated);
    }

    #[test]
    fn test_describe_uses_names() {
        let vocabulary = Vocabulary::from_tokens(&[("ID", None), ("COLON", Some("':'"))]);
        let rule_names = vec!["stat".to_string(), "expr".to_string()];
        let mut candidates = CandidatesCollection::new();
        candidates.add_token(1, &[2]);
        candidates.add_rule(1, &[0]);
        candidates.rule_positions.insert(1, 4..9);

        let text = candidates.describe(&vocabulary, &rule_names).to_string();
        assert!(text.contains("expr, path: stat, span: 4..9"));
        assert!(text.contains("ID ':'"));
        assert_eq!(candidates.token_names(&vocabulary), vec!["ID".to_string()]);
        assert_eq!(candidates.rule_names(&rule_names), vec!["expr".to_string()]);
    }

    #[test]
    fn test_plain_display() {
        let mut candidates = CandidatesCollection::new();
        candidates.add_token(3, &[]);
        candidates.truncated = true;
        let text = candidates.to_string();
        assert!(text.contains("3 []"));
        assert!(text.ends_with("(truncated)\n"));
    }
}

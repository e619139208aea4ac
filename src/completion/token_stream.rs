//! Token stream with caret awareness for completion
//!
//! This module defines the seekable token stream the completion core buffers
//! its input from, plus an in-memory implementation that also maps a
//! character caret offset to the token index completion is requested at.

use std::ops::Range;

use crate::atn::EOF;

/// Channel the parser reads tokens from.
pub const DEFAULT_CHANNEL: usize = 0;

/// Channel for tokens the parser skips (whitespace, comments).
pub const HIDDEN_CHANNEL: usize = 1;

/// Token with position information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token type as defined by the grammar's vocabulary
    pub token_type: i32,
    /// Source text of the token
    pub text: String,
    /// Index in the token stream; `None` until the token is placed in one
    pub index: Option<usize>,
    /// Character offset of the first character
    pub start: usize,
    /// Character offset one past the last character
    pub end: usize,
    /// Channel the token was emitted on
    pub channel: usize,
}

impl Token {
    /// Create a new on-channel token covering `span`
    pub fn new(token_type: i32, text: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            token_type,
            text: text.into(),
            index: None,
            start: span.start,
            end: span.end,
            channel: DEFAULT_CHANNEL,
        }
    }

    /// Create an end-of-input token at `offset`
    pub fn eof(offset: usize) -> Self {
        Self::new(EOF, "<EOF>", offset..offset)
    }

    /// Move the token to another channel
    pub fn on_channel(mut self, channel: usize) -> Self {
        self.channel = channel;
        self
    }

    /// Get the span (position range) of this token
    pub fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_eof(&self) -> bool {
        self.token_type == EOF
    }
}

/// Seekable, index-addressed token source.
///
/// Indices count every token in the stream, including off-channel ones;
/// lookahead only sees tokens on [`DEFAULT_CHANNEL`].
pub trait TokenStream {
    /// Current read position
    fn index(&self) -> usize;

    /// Move the read position to `index`
    fn seek(&mut self, index: usize);

    /// The `k`-th on-channel token from the read position, `k >= 1`
    fn lt(&mut self, k: usize) -> Option<Token>;

    /// Total number of tokens, EOF included
    fn size(&self) -> usize;

    /// Token at absolute stream index `index`
    fn get(&self, index: usize) -> Option<&Token>;
}

/// In-memory token stream over a fully lexed input
#[derive(Debug, Clone)]
pub struct BufferedTokenStream {
    /// All tokens (including EOF)
    tokens: Vec<Token>,
    /// Read position
    position: usize,
}

impl BufferedTokenStream {
    /// Create a stream from lexed tokens.
    ///
    /// Stream indices are assigned in order and an EOF token is appended
    /// if the input does not end with one.
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if !tokens.last().is_some_and(Token::is_eof) {
            let offset = tokens.last().map_or(0, |token| token.end);
            tokens.push(Token::eof(offset));
        }
        for (i, token) in tokens.iter_mut().enumerate() {
            token.index = Some(i);
        }
        Self {
            tokens,
            position: 0,
        }
    }

    /// Create a stream whose tokens keep the indices they already carry.
    ///
    /// Used by hosts that manage indices themselves; the completion core
    /// rejects tokens that turn out to have none.
    pub fn from_indexed(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Find the stream index of the token completion is requested at.
    ///
    /// That is the first on-channel token the caret is strictly inside of or
    /// that starts at or after the caret. A caret right behind a token thus
    /// resolves to the next token. Falls back to the last token (EOF).
    pub fn caret_token_index(&self, offset: usize) -> usize {
        for (i, token) in self.tokens.iter().enumerate() {
            if token.channel != DEFAULT_CHANNEL {
                continue;
            }
            // If caret is strictly within this token
            if offset > token.start && offset < token.end {
                return i;
            }
            // If the token starts at or after the caret
            if token.start >= offset {
                return i;
            }
        }
        self.tokens.len().saturating_sub(1)
    }

    /// Get the current prefix being typed at `offset`: the text of the
    /// on-channel token the caret sits in or directly behind.
    pub fn prefix_at(&self, offset: usize) -> String {
        self.tokens
            .iter()
            .filter(|token| token.channel == DEFAULT_CHANNEL && !token.is_eof())
            .find(|token| offset > token.start && offset <= token.end)
            .map(|token| token.text.chars().take(offset - token.start).collect())
            .unwrap_or_default()
    }

    /// Check if the stream is empty (only EOF)
    pub fn is_empty(&self) -> bool {
        self.tokens.len() <= 1
    }

    fn next_on_channel(&self, from: usize) -> usize {
        let mut i = from;
        while i < self.tokens.len() && self.tokens[i].channel != DEFAULT_CHANNEL {
            i += 1;
        }
        i
    }
}

impl TokenStream for BufferedTokenStream {
    fn index(&self) -> usize {
        self.position
    }

    fn seek(&mut self, index: usize) {
        self.position = index.min(self.tokens.len());
    }

    fn lt(&mut self, k: usize) -> Option<Token> {
        if k == 0 {
            return None;
        }
        let mut i = self.next_on_channel(self.position);
        for _ in 1..k {
            if i >= self.tokens.len() {
                break;
            }
            i = self.next_on_channel(i + 1);
        }
        // Reading past the end keeps returning EOF
        self.tokens
            .get(i)
            .or_else(|| self.tokens.last().filter(|token| token.is_eof()))
            .cloned()
    }

    fn size(&self) -> usize {
        self.tokens.len()
    }

    fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ID: i32 = 1;
    const COLON: i32 = 2;
    const WS: i32 = 3;

    /// "x : y" with whitespace on the hidden channel
    fn stream() -> BufferedTokenStream {
        BufferedTokenStream::new(vec![
            Token::new(ID, "x", 0..1),
            Token::new(WS, " ", 1..2).on_channel(HIDDEN_CHANNEL),
            Token::new(COLON, ":", 2..3),
            Token::new(WS, " ", 3..4).on_channel(HIDDEN_CHANNEL),
            Token::new(ID, "y", 4..5),
        ])
    }

    #[test]
    fn test_new_appends_eof_and_indices() {
        let stream = stream();
        assert_eq!(stream.size(), 6);
        assert!(stream.get(5).unwrap().is_eof());
        assert_eq!(stream.get(5).unwrap().start, 5);
        assert!(
            stream
                .tokens()
                .iter()
                .enumerate()
                .all(|(i, t)| t.index == Some(i))
        );
    }

    #[test]
    fn test_lt_skips_hidden_tokens() {
        let mut stream = stream();
        assert_eq!(stream.lt(1).unwrap().text, "x");
        assert_eq!(stream.lt(2).unwrap().text, ":");
        assert_eq!(stream.lt(3).unwrap().text, "y");
        assert!(stream.lt(4).unwrap().is_eof());
        assert!(stream.lt(9).unwrap().is_eof());

        stream.seek(1);
        assert_eq!(stream.index(), 1);
        assert_eq!(stream.lt(1).unwrap().text, ":");
    }

    #[test]
    fn test_caret_token_index() {
        let stream = stream();
        // Caret before "x"
        assert_eq!(stream.caret_token_index(0), 0);
        // Caret right after "x": next on-channel token is ":"
        assert_eq!(stream.caret_token_index(1), 2);
        // Caret after the trailing "y": EOF
        assert_eq!(stream.caret_token_index(5), 5);
    }

    #[test]
    fn test_caret_inside_token() {
        let stream = BufferedTokenStream::new(vec![Token::new(ID, "value", 0..5)]);
        assert_eq!(stream.caret_token_index(3), 0);
        assert_eq!(stream.prefix_at(3), "val");
        assert_eq!(stream.prefix_at(5), "value");
        assert_eq!(stream.prefix_at(0), "");
    }

    #[test]
    fn test_empty_stream() {
        let mut stream = BufferedTokenStream::new(Vec::new());
        assert!(stream.is_empty());
        assert_eq!(stream.caret_token_index(0), 0);
        assert!(stream.lt(1).unwrap().is_eof());
    }

    #[test]
    fn test_from_indexed_keeps_missing_indices() {
        let stream = BufferedTokenStream::from_indexed(vec![Token::new(ID, "x", 0..1)]);
        assert_eq!(stream.get(0).unwrap().index, None);
    }
}

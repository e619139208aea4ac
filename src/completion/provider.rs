//! Completion provider with a shared follow-set cache
//!
//! This module provides the entry point most hosts use: a provider owns the
//! configuration and the follow-set cache, and runs one
//! [`CodeCompletionCore`] per request against any [`Recognizer`].

use std::collections::HashSet;
use std::sync::{Arc, PoisonError};

use tracing::debug;

use super::candidates::CandidatesCollection;
use super::engine::{CodeCompletionCore, RuleContext};
use super::follow_sets::{FollowSetCache, SharedFollowSetCache};
use crate::atn::GrammarId;
use crate::config::Config;
use crate::error::Result;
use crate::recognizer::{GrammarParser, Recognizer};

type RulePredicate = Arc<dyn Fn(usize) -> bool + Send + Sync>;
type TokenPredicate = Arc<dyn Fn(i32) -> bool + Send + Sync>;

/// Parameters of one completion request
#[derive(Clone, Default)]
pub struct CompletionRequest {
    /// Rule and token to start from; rule 0 at token 0 if `None`
    pub context: Option<RuleContext>,
    preferred_rules: Option<RulePredicate>,
    ignored_tokens: Option<TokenPredicate>,
}

impl CompletionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_context(mut self, context: RuleContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Report these rules instead of the tokens they start with
    pub fn preferred_rules(self, rules: impl IntoIterator<Item = usize>) -> Self {
        let rules: HashSet<usize> = rules.into_iter().collect();
        self.preferred_rules_where(move |rule| rules.contains(&rule))
    }

    pub fn preferred_rules_where(
        mut self,
        preferred: impl Fn(usize) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.preferred_rules = Some(Arc::new(preferred));
        self
    }

    /// Never report these token types
    pub fn ignored_tokens(self, tokens: impl IntoIterator<Item = i32>) -> Self {
        let tokens: HashSet<i32> = tokens.into_iter().collect();
        self.ignored_tokens_where(move |token| tokens.contains(&token))
    }

    pub fn ignored_tokens_where(
        mut self,
        ignored: impl Fn(i32) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.ignored_tokens = Some(Arc::new(ignored));
        self
    }
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("context", &self.context)
            .field("preferred_rules", &self.preferred_rules.is_some())
            .field("ignored_tokens", &self.ignored_tokens.is_some())
            .finish()
    }
}

/// Completion provider with cross-request caching
#[derive(Debug, Clone)]
pub struct CompletionProvider {
    /// Follow sets by grammar, shared by every clone of the provider
    cache: SharedFollowSetCache,
    config: Config,
}

impl Default for CompletionProvider {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl CompletionProvider {
    /// Create a provider with its own empty cache
    pub fn new(config: Config) -> Self {
        Self::with_cache(FollowSetCache::shared(), config)
    }

    /// Create a provider on an existing cache
    ///
    /// # Arguments
    /// * `cache` - Cache shared with other providers
    /// * `config` - Completion and debug settings for requests
    pub fn with_cache(cache: SharedFollowSetCache, config: Config) -> Self {
        Self { cache, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the follow-set cache
    pub fn cache(&self) -> SharedFollowSetCache {
        Arc::clone(&self.cache)
    }

    /// Collect candidates at `caret_token_index`.
    ///
    /// The cache stays locked for the whole request; concurrent requests on
    /// the same provider run one after another.
    pub fn complete<R: Recognizer + ?Sized>(
        &self,
        recognizer: &mut R,
        caret_token_index: usize,
        request: &CompletionRequest,
    ) -> Result<CandidatesCollection> {
        // The cache only memoizes pure data, so a poisoned lock is still usable
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let mut core = CodeCompletionCore::new(recognizer, &mut cache).with_config(&self.config);
        if let Some(preferred) = &request.preferred_rules {
            core = core.with_preferred_rules(move |rule| preferred(rule));
        }
        if let Some(ignored) = &request.ignored_tokens {
            core = core.with_ignored_tokens(move |token| ignored(token));
        }
        core.collect_candidates(caret_token_index, request.context)
    }

    /// Collect candidates at character offset `offset` of the parser's input
    pub fn complete_at_offset(
        &self,
        parser: &mut GrammarParser,
        offset: usize,
        request: &CompletionRequest,
    ) -> Result<CandidatesCollection> {
        let caret_token_index = parser.tokens().caret_token_index(offset);
        debug!("Caret offset {offset} resolved to token {caret_token_index}");
        self.complete(parser, caret_token_index, request)
    }

    /// Forget the cached follow sets of `grammar`, e.g. after it was rebuilt
    pub fn invalidate(&self, grammar: &GrammarId) -> bool {
        let removed = self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(grammar);
        if removed {
            debug!("Invalidated follow sets of grammar {grammar}");
        }
        removed
    }

    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of follow-set holders cached for `grammar`
    pub fn cached_holders(&self, grammar: &GrammarId) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .holder_count(grammar)
    }
}

//! Tests for the completion engine
//!
//! End-to-end requests against small grammars lexed from text, covering
//! caret handling, preferred rules, caching and the walk's limits.

#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashSet};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::super::{
        BufferedTokenStream, CandidatesCollection, CodeCompletionCore, FollowSetCache,
        HIDDEN_CHANNEL, RuleContext, Token,
    };
    use crate::atn::{Element, Grammar, GrammarBuilder, Vocabulary};
    use crate::config::Config;
    use crate::error::{CompletionError, TokenStreamError};
    use crate::recognizer::{GrammarParser, Recognizer};

    const ID: i32 = 1;
    const COLON: i32 = 2;
    const SEMI: i32 = 3;
    const PLUS: i32 = 4;
    const STAR: i32 = 5;
    const INT: i32 = 6;
    const WS: i32 = 7;
    const KW: i32 = 8;

    const STAT: usize = 0;
    const EXPR: usize = 1;
    const TERM: usize = 2;

    fn vocabulary() -> Vocabulary {
        Vocabulary::from_tokens(&[
            ("ID", None),
            ("COLON", Some("':'")),
            ("SEMI", Some("';'")),
            ("PLUS", Some("'+'")),
            ("STAR", Some("'*'")),
            ("INT", None),
            ("WS", None),
            ("KW", Some("'kw'")),
        ])
    }

    /// Split ASCII input into tokens, whitespace on the hidden channel
    fn lex(input: &str) -> BufferedTokenStream {
        let bytes = input.as_bytes();
        let mut tokens = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let start = pos;
            let c = bytes[pos];
            pos += 1;
            let token_type = match c {
                b':' => COLON,
                b';' => SEMI,
                b'+' => PLUS,
                b'*' => STAR,
                c if c.is_ascii_whitespace() => {
                    while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                        pos += 1;
                    }
                    WS
                }
                c if c.is_ascii_digit() => {
                    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                        pos += 1;
                    }
                    INT
                }
                _ => {
                    while pos < bytes.len() && bytes[pos].is_ascii_alphanumeric() {
                        pos += 1;
                    }
                    ID
                }
            };
            let token = Token::new(token_type, &input[start..pos], start..pos);
            tokens.push(if token_type == WS {
                token.on_channel(HIDDEN_CHANNEL)
            } else {
                token
            });
        }
        BufferedTokenStream::new(tokens)
    }

    /// stat : ID ':' expr ';' ;  expr : term ('+' term)* ;  term : INT ;
    fn stat_grammar() -> Grammar {
        GrammarBuilder::new("Stat", vocabulary())
            .rule(
                "stat",
                Element::seq([
                    Element::token(ID),
                    Element::token(COLON),
                    Element::rule("expr"),
                    Element::token(SEMI),
                ]),
            )
            .rule(
                "expr",
                Element::seq([
                    Element::rule("term"),
                    Element::star(Element::seq([Element::token(PLUS), Element::rule("term")])),
                ]),
            )
            .rule("term", Element::token(INT))
            .build()
            .unwrap()
    }

    fn parser(input: &str) -> GrammarParser {
        GrammarParser::new(stat_grammar(), lex(input))
    }

    fn complete(parser: &mut GrammarParser, offset: usize, preferred: &[usize]) -> CandidatesCollection {
        let caret = parser.tokens().caret_token_index(offset);
        let preferred: HashSet<usize> = preferred.iter().copied().collect();
        let mut cache = FollowSetCache::new();
        CodeCompletionCore::new(parser, &mut cache)
            .with_preferred_rules(move |rule| preferred.contains(&rule))
            .collect_candidates(caret, None)
            .unwrap()
    }

    fn token_types(candidates: &CandidatesCollection) -> Vec<i32> {
        candidates.tokens.keys().copied().collect()
    }

    #[test]
    fn test_caret_after_plus_offers_expression_rule() {
        let mut parser = parser("x : 1 + ;");
        let candidates = complete(&mut parser, 7, &[EXPR]);

        assert_eq!(candidates.rules.get(&EXPR), Some(&vec![STAT]));
        assert_eq!(candidates.rules.len(), 1);
        assert!(candidates.tokens.is_empty());
        assert!(!candidates.truncated);
    }

    #[test]
    fn test_caret_after_plus_without_preferred_rules() {
        let mut parser = parser("x : 1 + ;");
        let candidates = complete(&mut parser, 7, &[]);

        assert_eq!(token_types(&candidates), vec![INT]);
        assert_eq!(candidates.tokens[&INT], Vec::<i32>::new());
        assert!(candidates.rules.is_empty());
    }

    #[test]
    fn test_caret_after_identifier_offers_colon() {
        let mut parser = parser("x : 1 + ;");
        let candidates = complete(&mut parser, 1, &[]);

        assert_eq!(token_types(&candidates), vec![COLON]);
        assert_eq!(candidates.tokens[&COLON], Vec::<i32>::new());
    }

    #[test]
    fn test_empty_input_offers_first_tokens() {
        let mut parser = parser("");
        let candidates = complete(&mut parser, 0, &[]);

        assert_eq!(token_types(&candidates), vec![ID]);
        assert_eq!(candidates.tokens[&ID], vec![COLON]);
    }

    #[rstest]
    #[case::outer_shadows_inner(&[EXPR, TERM], EXPR, vec![STAT])]
    #[case::inner_alone(&[TERM], TERM, vec![STAT, EXPR])]
    fn test_outermost_preferred_rule_wins(
        #[case] preferred: &[usize],
        #[case] expected_rule: usize,
        #[case] expected_path: Vec<usize>,
    ) {
        let mut parser = parser("x : 1 + ;");
        let candidates = complete(&mut parser, 7, preferred);

        assert_eq!(candidates.rules.len(), 1);
        assert_eq!(candidates.rules.get(&expected_rule), Some(&expected_path));
    }

    #[test]
    fn test_rule_span_excludes_trailing_whitespace() {
        let input = "x : 1 + 2 ; ";
        let mut parser = parser(input);
        let candidates = complete(&mut parser, input.len(), &[EXPR]);

        let span = candidates.rule_positions[&EXPR].clone();
        assert_eq!(span, 4..9);
        assert_eq!(&input[span], "1 + 2");
    }

    #[test]
    fn test_rule_span_for_rule_open_at_caret() {
        let mut parser = parser("x : 1 + ;");
        let candidates = complete(&mut parser, 7, &[EXPR]);

        // expr matched "1" before the caret
        assert_eq!(candidates.rule_positions[&EXPR], 4..5);
    }

    #[test]
    fn test_memoized_rule_is_not_walked_again() {
        let mut parser = parser("x : 1 + ;");
        let caret = parser.tokens().caret_token_index(7);
        let mut cache = FollowSetCache::new();
        let mut core = CodeCompletionCore::new(&mut parser, &mut cache);
        core.collect_candidates(caret, None).unwrap();

        let before = core.states_processed();
        let first = core.process_rule_at(EXPR, 2).unwrap();
        let second = core.process_rule_at(EXPR, 2).unwrap();
        assert_eq!(first, BTreeSet::from([3]));
        assert_eq!(first, second);
        assert_eq!(core.states_processed(), before);
    }

    #[test]
    fn test_rule_that_cannot_match_is_pruned() {
        let mut parser = parser("x : 1 + ;");
        let caret = parser.tokens().caret_token_index(7);
        let mut cache = FollowSetCache::new();
        let mut core = CodeCompletionCore::new(&mut parser, &mut cache);
        core.collect_candidates(caret, None).unwrap();

        // term starts with INT, position 0 holds ID
        let before = core.states_processed();
        assert!(core.process_rule_at(TERM, 0).unwrap().is_empty());
        assert_eq!(core.states_processed(), before);
    }

    #[test]
    fn test_follow_sets_reused_across_requests() {
        let mut parser = parser("x : 1 + ;");
        let caret = parser.tokens().caret_token_index(7);
        let expr_start = parser.grammar().atn.rule_start(EXPR).unwrap().number;
        let grammar = parser.grammar_id();
        let mut cache = FollowSetCache::new();

        CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(caret, None)
            .unwrap();
        let first = cache.get(&grammar, expr_start).unwrap();
        let holders = cache.len();

        CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(caret, None)
            .unwrap();
        let second = cache.get(&grammar, expr_start).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), holders);
    }

    #[test]
    fn test_repeated_requests_are_deterministic() {
        let mut parser = parser("x : 1 + ;");
        let first = complete(&mut parser, 7, &[TERM]);
        let second = complete(&mut parser, 7, &[TERM]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_start_context() {
        let mut parser = parser("x : 1 + ;");
        let caret = parser.tokens().caret_token_index(7);
        let mut cache = FollowSetCache::new();

        // Start at expr on the "1" token
        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .with_preferred_rules(|rule| rule == TERM)
            .collect_candidates(caret, Some(RuleContext::new(EXPR, 4)))
            .unwrap();

        assert_eq!(candidates.rules.get(&TERM), Some(&vec![EXPR]));
    }

    #[test]
    fn test_unknown_start_rule() {
        let mut parser = parser("x");
        let mut cache = FollowSetCache::new();
        let result = CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(1, Some(RuleContext::new(9, 0)));
        assert!(matches!(result, Err(CompletionError::Grammar(_))));
    }

    #[test]
    fn test_token_without_index_is_rejected() {
        let mut parser = parser("");
        parser.set_tokens(BufferedTokenStream::from_indexed(vec![Token::new(
            ID,
            "x",
            0..1,
        )]));
        parser.token_stream_mut().seek(1);

        let mut cache = FollowSetCache::new();
        let result = CodeCompletionCore::new(&mut parser, &mut cache).collect_candidates(0, None);

        assert!(matches!(
            result,
            Err(CompletionError::TokenStream(
                TokenStreamError::InvalidTokenIndex { position: 0, .. }
            ))
        ));
        // Read position restored even on failure
        assert_eq!(parser.token_stream_mut().index(), 1);
    }

    #[test]
    fn test_stream_position_restored() {
        let mut parser = parser("x : 1 + ;");
        parser.token_stream_mut().seek(3);
        complete(&mut parser, 7, &[]);
        assert_eq!(parser.token_stream_mut().index(), 3);
    }

    #[test]
    fn test_iteration_limit_truncates() {
        let input = "x : 1 + 1 + 1 ;";
        let mut parser = parser(input);
        let caret = parser.tokens().caret_token_index(input.len());
        let mut config = Config::default();
        config.completion.iteration_limit = 3;

        let mut cache = FollowSetCache::new();
        let mut core = CodeCompletionCore::new(&mut parser, &mut cache).with_config(&config);
        let candidates = core.collect_candidates(caret, None).unwrap();

        assert!(candidates.truncated);
        assert_eq!(core.states_processed(), 3);
    }

    #[test]
    fn test_debug_output_does_not_change_result() {
        let mut config = Config::default();
        config.debug.show_result = true;
        config.debug.show_debug_output = true;
        config.debug.debug_output_with_transitions = true;
        config.debug.show_rule_stack = true;

        let mut parser = parser("x : 1 + ;");
        let caret = parser.tokens().caret_token_index(7);
        let mut cache = FollowSetCache::new();
        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .with_config(&config)
            .collect_candidates(caret, None)
            .unwrap();

        assert_eq!(token_types(&candidates), vec![INT]);
    }

    #[test]
    fn test_wildcard_offers_every_token_but_ignored() {
        let grammar = GrammarBuilder::new("Any", vocabulary())
            .rule("any", Element::seq([Element::token(ID), Element::Wildcard]))
            .build()
            .unwrap();
        let mut parser = GrammarParser::new(grammar, lex("x "));
        let caret = parser.tokens().caret_token_index(2);
        let mut cache = FollowSetCache::new();

        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .with_ignored_tokens(|token| token == WS)
            .collect_candidates(caret, None)
            .unwrap();

        assert_eq!(
            token_types(&candidates),
            vec![ID, COLON, SEMI, PLUS, STAR, INT, KW]
        );
    }

    /// cmd : {gate}? 'kw' | ID ;
    fn gated_parser(gate: Arc<AtomicBool>) -> GrammarParser {
        let grammar = GrammarBuilder::new("Gated", vocabulary())
            .rule(
                "cmd",
                Element::alt([
                    Element::seq([Element::Predicate(0), Element::token(KW)]),
                    Element::token(ID),
                ]),
            )
            .build()
            .unwrap();
        GrammarParser::new(grammar, lex("")).with_predicate(0, 0, move || {
            Ok(gate.load(Ordering::SeqCst))
        })
    }

    #[rstest]
    #[case::cached(false, vec![ID])]
    #[case::refreshed(true, vec![ID, KW])]
    fn test_predicated_follow_sets(#[case] refresh: bool, #[case] expected: Vec<i32>) {
        let gate = Arc::new(AtomicBool::new(false));
        let mut parser = gated_parser(Arc::clone(&gate));
        let mut config = Config::default();
        config.completion.refresh_predicated_follow_sets = refresh;
        let mut cache = FollowSetCache::new();

        let first = CodeCompletionCore::new(&mut parser, &mut cache)
            .with_config(&config)
            .collect_candidates(0, None)
            .unwrap();
        assert_eq!(token_types(&first), vec![ID]);

        gate.store(true, Ordering::SeqCst);
        let second = CodeCompletionCore::new(&mut parser, &mut cache)
            .with_config(&config)
            .collect_candidates(0, None)
            .unwrap();
        assert_eq!(token_types(&second), expected);
    }

    #[test]
    fn test_left_recursive_rule_terminates() {
        // stat : list ';' ;  list : ID | list ':' ID ;
        let grammar = GrammarBuilder::new("List", vocabulary())
            .rule("stat", Element::seq([Element::rule("list"), Element::token(SEMI)]))
            .rule(
                "list",
                Element::alt([
                    Element::token(ID),
                    Element::seq([Element::rule("list"), Element::token(COLON), Element::token(ID)]),
                ]),
            )
            .build()
            .unwrap();
        let mut parser = GrammarParser::new(grammar, lex("x"));
        let mut cache = FollowSetCache::new();

        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(1, None)
            .unwrap();
        assert!(candidates.tokens.contains_key(&SEMI));
        assert!(!candidates.truncated);
    }

    #[test]
    fn test_failing_predicate_aborts_request() {
        let grammar = GrammarBuilder::new("Failing", vocabulary())
            .rule(
                "cmd",
                Element::alt([
                    Element::seq([Element::Predicate(0), Element::token(KW)]),
                    Element::token(ID),
                ]),
            )
            .build()
            .unwrap();
        let mut parser = GrammarParser::new(grammar, lex(""))
            .with_predicate(0, 0, || Err("no parse context".to_string()));
        let mut cache = FollowSetCache::new();

        let result = CodeCompletionCore::new(&mut parser, &mut cache).collect_candidates(0, None);
        assert!(matches!(result, Err(CompletionError::Predicate(_))));
    }

    /// low : e[0] ';' ;  high : e[3] ';' ;
    /// e : INT ( {2 >= _p}? '*' e[3] | {1 >= _p}? '+' e[2] )* ;
    fn calc_parser(input: &str) -> GrammarParser {
        let grammar = GrammarBuilder::new("Calc", vocabulary())
            .rule(
                "low",
                Element::seq([
                    Element::RuleWithPrecedence("e".to_string(), 0),
                    Element::token(SEMI),
                ]),
            )
            .rule(
                "high",
                Element::seq([
                    Element::RuleWithPrecedence("e".to_string(), 3),
                    Element::token(SEMI),
                ]),
            )
            .precedence_rule(
                "e",
                Element::seq([
                    Element::token(INT),
                    Element::star(Element::alt([
                        Element::seq([
                            Element::Precedence(2),
                            Element::token(STAR),
                            Element::RuleWithPrecedence("e".to_string(), 3),
                        ]),
                        Element::seq([
                            Element::Precedence(1),
                            Element::token(PLUS),
                            Element::RuleWithPrecedence("e".to_string(), 2),
                        ]),
                    ])),
                ]),
            )
            .build()
            .unwrap();
        GrammarParser::new(grammar, lex(input))
    }

    #[rstest]
    #[case::lowest_precedence(0, vec![SEMI, PLUS, STAR])]
    #[case::above_all_operators(1, vec![SEMI])]
    fn test_precedence_filters_operators(#[case] start_rule: usize, #[case] expected: Vec<i32>) {
        let mut parser = calc_parser("1 ");
        let caret = parser.tokens().caret_token_index(2);
        let mut cache = FollowSetCache::new();

        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(caret, Some(RuleContext::new(start_rule, 0)))
            .unwrap();

        assert_eq!(token_types(&candidates), expected);
    }

    #[test]
    fn test_operand_expected_after_operator() {
        let mut parser = calc_parser("1 *");
        let caret = parser.tokens().caret_token_index(3);
        let mut cache = FollowSetCache::new();

        let candidates = CodeCompletionCore::new(&mut parser, &mut cache)
            .collect_candidates(caret, None)
            .unwrap();

        assert_eq!(token_types(&candidates), vec![INT]);
    }
}

//! Regex-rule tokenizer for command-line style input
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.1.0: Rest capture evaluated before generic args so a bare `--` is never a word
//! - 1.0.0: Initial ordered rule table

use regex::Regex;
use std::sync::OnceLock;

/// Kind of a lexical token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `-abc`, value holds the letters
    ShortFlagCluster,
    /// `--name`, value holds the name
    LongFlag,
    /// Everything after a bare `--`, verbatim
    Rest,
    /// A shell-like word with quotes and escapes resolved
    Arg,
    /// Separator, never emitted
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

struct Rule {
    kind: TokenKind,
    pattern: Regex,
}

/// Rule table in priority order, built once per process
static RULES: OnceLock<Vec<Rule>> = OnceLock::new();

fn rules() -> &'static [Rule] {
    RULES.get_or_init(|| {
        let rule = |kind, pattern: &str| Rule {
            kind,
            pattern: Regex::new(pattern).expect("tokenizer rule must compile"),
        };

        vec![
            rule(TokenKind::ShortFlagCluster, r"^-([a-zA-Z]+)"),
            rule(TokenKind::LongFlag, r"^--([a-zA-Z][-a-zA-Z]*)"),
            rule(TokenKind::Rest, r"(?s)^--(?:\s+|$)(.*)"),
            rule(
                TokenKind::Arg,
                r#"(?s)^(?:\\.|'(?:[^'\\]|\\.)*'|"(?:[^"\\]|\\.)*"|\S)+"#,
            ),
            rule(TokenKind::Whitespace, r"^\s+"),
        ]
    })
}

/// Split `input` into tokens, dropping whitespace
pub fn tokenize(input: &str) -> Vec<Token> {
    let rules = rules();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < input.len() {
        let remainder = &input[pos..];

        let (rule, captures) = rules
            .iter()
            .find_map(|rule| rule.pattern.captures(remainder).map(|caps| (rule, caps)))
            .unwrap_or_else(|| unreachable!("no tokenizer rule matched at offset {pos}"));

        let whole = captures.get(0).map(|m| m.as_str()).unwrap_or_default();
        if whole.is_empty() {
            unreachable!("tokenizer rule {:?} matched empty input at offset {pos}", rule.kind);
        }
        pos += whole.len();

        let value = match rule.kind {
            TokenKind::Whitespace => continue,
            TokenKind::Arg => unquote(whole),
            _ => captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        };

        tokens.push(Token::new(rule.kind, value));
    }

    tokens
}

/// Unwrap quote pairs and resolve backslash escapes in a matched word
///
/// A quote only opens a pair when a matching unescaped closing quote follows;
/// otherwise it is kept as a literal character.
pub fn unquote(word: &str) -> String {
    let chars: Vec<char> = word.chars().collect();
    let mut out = String::with_capacity(word.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                out.push(chars[i + 1]);
                i += 2;
            }
            quote @ ('\'' | '"') => match closing_quote(&chars, i + 1, quote) {
                Some(end) => {
                    out.push_str(&unescape(&chars[i + 1..end]));
                    i = end + 1;
                }
                None => {
                    out.push(quote);
                    i += 1;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

fn closing_quote(chars: &[char], mut i: usize, quote: char) -> Option<usize> {
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    let mut iter = chars.iter();
    while let Some(&c) = iter.next() {
        if c == '\\' {
            match iter.next() {
                Some(&escaped) => out.push(escaped),
                None => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .into_iter()
            .map(|t| (t.kind, t.value))
            .collect()
    }

    #[test]
    fn test_empty_and_whitespace_inputs() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t\n  ").is_empty());
    }

    #[test]
    fn test_quoted_word_keeps_inner_space() {
        assert_eq!(
            values(r#"a "b c" d"#),
            vec![
                (TokenKind::Arg, "a".to_string()),
                (TokenKind::Arg, "b c".to_string()),
                (TokenKind::Arg, "d".to_string()),
            ]
        );
    }

    #[test]
    fn test_escaped_space_joins_word() {
        assert_eq!(values(r"a\ b"), vec![(TokenKind::Arg, "a b".to_string())]);
    }

    #[test]
    fn test_single_quotes_and_escaped_quotes() {
        assert_eq!(
            values(r#"'it\'s here' "say \"hi\"""#),
            vec![
                (TokenKind::Arg, "it's here".to_string()),
                (TokenKind::Arg, r#"say "hi""#.to_string()),
            ]
        );
    }

    #[test]
    fn test_quotes_glued_to_text() {
        assert_eq!(
            values(r#"pre"fix mid"post"#),
            vec![(TokenKind::Arg, "prefix midpost".to_string())]
        );
    }

    #[test]
    fn test_unterminated_quote_is_literal() {
        assert_eq!(
            values("'open word"),
            vec![
                (TokenKind::Arg, "'open".to_string()),
                (TokenKind::Arg, "word".to_string()),
            ]
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            values("-abc --long-name --x"),
            vec![
                (TokenKind::ShortFlagCluster, "abc".to_string()),
                (TokenKind::LongFlag, "long-name".to_string()),
                (TokenKind::LongFlag, "x".to_string()),
            ]
        );
    }

    #[test]
    fn test_dash_number_is_an_arg() {
        assert_eq!(values("-5"), vec![(TokenKind::Arg, "-5".to_string())]);
    }

    #[test]
    fn test_cluster_followed_by_digits() {
        assert_eq!(
            values("-n10"),
            vec![
                (TokenKind::ShortFlagCluster, "n".to_string()),
                (TokenKind::Arg, "10".to_string()),
            ]
        );
    }

    #[test]
    fn test_rest_capture_is_not_retokenized() {
        assert_eq!(
            values("foo -- --bar baz"),
            vec![
                (TokenKind::Arg, "foo".to_string()),
                (TokenKind::Rest, "--bar baz".to_string()),
            ]
        );
    }

    #[test]
    fn test_rest_at_end_of_input() {
        assert_eq!(
            values("foo --"),
            vec![
                (TokenKind::Arg, "foo".to_string()),
                (TokenKind::Rest, String::new()),
            ]
        );
    }

    #[test]
    fn test_rest_keeps_newlines() {
        assert_eq!(
            values("-- line one\nline two"),
            vec![(TokenKind::Rest, "line one\nline two".to_string())]
        );
    }

    #[test]
    fn test_unquote_escaped_backslash_before_quote() {
        assert_eq!(unquote(r#"\\"x""#), r"\x");
    }
}

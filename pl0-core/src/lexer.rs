//! Lexer for PL/0 source text.
//!
//! Tokenization is table driven: a lexicon is an ordered list of
//! lexical rules, each able to say how many bytes of the remaining
//! input it matches. At every position all rules are tried and the
//! longest match wins; ties go to the rule listed first. Keywords are
//! listed before identifiers, so `begin` is a keyword while `beginning`
//! is an identifier.

use std::fmt;

use crate::error::CompileError;
use crate::span::Position;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Delimiter,
    AdditiveOp,
    MultiplicativeOp,
    AssignOp,
    RelationalOp,
    Identifier,
    Number,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Delimiter => "delimiter",
            TokenKind::AdditiveOp => "additive operator",
            TokenKind::MultiplicativeOp => "multiplicative operator",
            TokenKind::AssignOp => "assignment operator",
            TokenKind::RelationalOp => "relational operator",
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
        };
        f.write_str(name)
    }
}

/// A single token with its category, text and starting position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub position: Position,
}

impl Token {
    /// True if this token is exactly `text` and not an identifier.
    pub fn is(&self, text: &str) -> bool {
        self.kind != TokenKind::Identifier && self.text == text
    }
}

/// One entry of a lexicon.
///
/// `scan` returns the byte length of the longest prefix of its input the
/// rule accepts, or 0. A rule with `kind: None` matches text that is
/// consumed but never yielded (whitespace).
#[derive(Debug, Clone, Copy)]
pub struct LexicalRule {
    pub kind: Option<TokenKind>,
    pub scan: fn(&str) -> usize,
}

pub const KEYWORDS: &[&str] = &[
    "const",
    "var",
    "procedure",
    "if",
    "then",
    "else",
    "while",
    "do",
    "call",
    "begin",
    "end",
    "repeat",
    "until",
    "read",
    "write",
    "odd",
];

const RELATIONAL_OPS: &[&str] = &["=", "<>", "<", "<=", ">", ">="];

/// The PL/0 lexicon, in tie-breaking order.
pub const DEFAULT_LEXICON: &[LexicalRule] = &[
    LexicalRule {
        kind: Some(TokenKind::Keyword),
        scan: scan_keyword,
    },
    LexicalRule {
        kind: Some(TokenKind::Delimiter),
        scan: |rest| scan_one_of(rest, &['.', '(', ')', ',', ';']),
    },
    LexicalRule {
        kind: Some(TokenKind::AdditiveOp),
        scan: |rest| scan_one_of(rest, &['+', '-']),
    },
    LexicalRule {
        kind: Some(TokenKind::MultiplicativeOp),
        scan: |rest| scan_one_of(rest, &['*', '/']),
    },
    LexicalRule {
        kind: Some(TokenKind::AssignOp),
        scan: |rest| longest_prefix(rest, &[":="]),
    },
    LexicalRule {
        kind: Some(TokenKind::RelationalOp),
        scan: |rest| longest_prefix(rest, RELATIONAL_OPS),
    },
    LexicalRule {
        kind: Some(TokenKind::Identifier),
        scan: scan_identifier,
    },
    LexicalRule {
        kind: Some(TokenKind::Number),
        scan: |rest| scan_while(rest, |ch| ch.is_ascii_digit()),
    },
    LexicalRule {
        kind: None,
        scan: |rest| scan_while(rest, char::is_whitespace),
    },
];

fn scan_keyword(rest: &str) -> usize {
    longest_prefix(rest, KEYWORDS)
}

fn scan_identifier(rest: &str) -> usize {
    match rest.chars().next() {
        Some(ch) if ch.is_ascii_alphabetic() => scan_while(rest, |ch| ch.is_ascii_alphanumeric()),
        _ => 0,
    }
}

fn scan_one_of(rest: &str, chars: &[char]) -> usize {
    match rest.chars().next() {
        Some(ch) if chars.contains(&ch) => ch.len_utf8(),
        _ => 0,
    }
}

fn longest_prefix(rest: &str, candidates: &[&str]) -> usize {
    candidates
        .iter()
        .filter(|candidate| rest.starts_with(**candidate))
        .map(|candidate| candidate.len())
        .max()
        .unwrap_or(0)
}

fn scan_while(rest: &str, accept: impl Fn(char) -> bool) -> usize {
    rest.char_indices()
        .find(|(_, ch)| !accept(*ch))
        .map_or(rest.len(), |(index, _)| index)
}

/// A lazy, forward-only token stream over one source string.
///
/// After the first error the stream is exhausted.
pub struct Lexer<'src> {
    source: &'src str,
    lexicon: &'src [LexicalRule],
    offset: usize,
    position: Position,
    failed: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self::with_lexicon(source, DEFAULT_LEXICON)
    }

    pub fn with_lexicon(source: &'src str, lexicon: &'src [LexicalRule]) -> Self {
        Lexer {
            source,
            lexicon,
            offset: 0,
            position: Position::start(),
            failed: false,
        }
    }

    /// Position of the next unread character.
    pub fn position(&self) -> Position {
        self.position
    }

    fn longest_match(&self, rest: &str) -> Option<(Option<TokenKind>, usize)> {
        let mut best: Option<(Option<TokenKind>, usize)> = None;
        for rule in self.lexicon {
            let len = (rule.scan)(rest);
            if len > 0 && best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((rule.kind, len));
            }
        }
        best
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, CompileError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.failed || self.offset >= self.source.len() {
                return None;
            }

            let rest = &self.source[self.offset..];
            let Some((kind, len)) = self.longest_match(rest) else {
                self.failed = true;
                let found = rest.chars().next().unwrap_or('\0');
                return Some(Err(CompileError::Lexer {
                    found,
                    position: self.position,
                }));
            };

            let text = &rest[..len];
            let start = self.position;
            self.offset += len;
            self.position = start.advanced_over(text);

            if let Some(kind) = kind {
                return Some(Ok(Token {
                    kind,
                    text: text.to_string(),
                    position: start,
                }));
            }
        }
    }
}

/// Lex a whole source string eagerly.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_texts(source: &str) -> Vec<(TokenKind, String)> {
        tokenize(source)
            .expect("lex")
            .into_iter()
            .map(|token| (token.kind, token.text))
            .collect()
    }

    #[test]
    fn prefers_longest_relational_operator() {
        let tokens = tokenize("<=").expect("lex");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::RelationalOp);
        assert_eq!(tokens[0].text, "<=");

        let tokens = kinds_and_texts("a<>b>=c");
        assert_eq!(tokens[1], (TokenKind::RelationalOp, "<>".to_string()));
        assert_eq!(tokens[3], (TokenKind::RelationalOp, ">=".to_string()));
    }

    #[test]
    fn keyword_wins_ties_but_longer_identifier_wins() {
        let tokens = kinds_and_texts("do dog odd oddity");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Keyword, "do".to_string()),
                (TokenKind::Identifier, "dog".to_string()),
                (TokenKind::Keyword, "odd".to_string()),
                (TokenKind::Identifier, "oddity".to_string()),
            ]
        );
    }

    #[test]
    fn classifies_operators_and_delimiters() {
        let tokens = kinds_and_texts("x := (a+1)*b-2/c;.");
        let kinds: Vec<_> = tokens.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::AssignOp,
                TokenKind::Delimiter,
                TokenKind::Identifier,
                TokenKind::AdditiveOp,
                TokenKind::Number,
                TokenKind::Delimiter,
                TokenKind::MultiplicativeOp,
                TokenKind::Identifier,
                TokenKind::AdditiveOp,
                TokenKind::Number,
                TokenKind::MultiplicativeOp,
                TokenKind::Identifier,
                TokenKind::Delimiter,
                TokenKind::Delimiter,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("var x;\n  begin\n\tx := 10 end.").expect("lex");
        let begin = tokens.iter().find(|t| t.text == "begin").expect("begin");
        assert_eq!(begin.position, Position::new(2, 3));
        let ten = tokens.iter().find(|t| t.text == "10").expect("10");
        assert_eq!(ten.position, Position::new(3, 7));
    }

    #[test]
    fn reports_unrecognized_character_and_stops() {
        let mut lexer = Lexer::new("x\n  @ y");
        assert!(matches!(lexer.next(), Some(Ok(_))));
        let err = lexer.next().expect("item").unwrap_err();
        assert_eq!(
            err,
            CompileError::Lexer {
                found: '@',
                position: Position::new(2, 3),
            }
        );
        assert!(lexer.next().is_none());
    }

    #[test]
    fn lone_colon_is_not_a_token() {
        let err = tokenize("x : 1").unwrap_err();
        assert!(matches!(err, CompileError::Lexer { found: ':', .. }));
    }

    #[test]
    fn accepts_a_custom_lexicon() {
        const DIGITS_ONLY: &[LexicalRule] = &[
            LexicalRule {
                kind: Some(TokenKind::Number),
                scan: |rest| scan_while(rest, |ch| ch.is_ascii_digit()),
            },
            LexicalRule {
                kind: None,
                scan: |rest| scan_while(rest, |ch| ch == ' '),
            },
        ];
        let tokens: Vec<_> = Lexer::with_lexicon("12 34", DIGITS_ONLY)
            .collect::<Result<_, _>>()
            .expect("lex");
        assert_eq!(tokens.len(), 2);
        assert!(Lexer::with_lexicon("x", DIGITS_ONLY).next().expect("item").is_err());
    }
}

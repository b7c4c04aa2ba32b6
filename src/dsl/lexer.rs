//! Lexer/tokenizer for filter domains.

use super::FilterError;
use super::ast::is_comparison_operator;
use winnow::ascii::{digit1, multispace1};
use winnow::combinator::{alt, not, opt, terminated};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

/// Token classes produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Placeholder, // %s, %(name)s, $1, ?
    Str,         // quoted, quotes kept in the text
    Number,
    Operator, // =, !=, &, ...
    Keyword,  // like, not in, CHILD_OF, ...
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Whitespace,
    Eof,
}

/// A token and the source text it was lexed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, offset: usize) -> Self {
        Token {
            kind,
            text: text.into(),
            offset,
        }
    }

    pub fn eof(offset: usize) -> Self {
        Token::new(TokenKind::Eof, "", offset)
    }
}

type PResult<T> = Result<T, winnow::error::ErrMode<winnow::error::ContextError>>;

fn is_word_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Field paths may be dotted (`partner_id.name`) or namespaced (`addr:city`).
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == ':'
}

/// Anything that cannot start another token. Unquoted values such as `x%`
/// lex as one identifier.
fn is_bare_char(c: char) -> bool {
    !c.is_whitespace()
        && !matches!(
            c,
            '(' | ')' | '[' | ']' | ',' | '\'' | '"' | '=' | '!' | '<' | '>' | '&' | '|'
        )
}

fn lex_word<'i>(input: &mut &'i str) -> PResult<&'i str> {
    (one_of(is_word_start), take_while(0.., is_word_char))
        .take()
        .parse_next(input)
}

/// Lex a quoted string. Backslash escapes the next character.
fn lex_string(input: &mut &str) -> PResult<TokenKind> {
    let quote = one_of(['\'', '"']).parse_next(input)?;
    loop {
        let c = any.parse_next(input)?;
        if c == '\\' {
            any.parse_next(input)?;
        } else if c == quote {
            return Ok(TokenKind::Str);
        }
    }
}

/// Lex a query placeholder: `%s`, `%d`, `%(name)s`, `$1` or `?`.
fn lex_placeholder(input: &mut &str) -> PResult<TokenKind> {
    alt((
        ("%(", take_while(1.., is_word_char), ")", one_of(['s', 'd'])).void(),
        ("%", one_of(['s', 'd'])).void(),
        ("$", digit1).void(),
        "?".void(),
    ))
    .value(TokenKind::Placeholder)
    .parse_next(input)
}

/// Lex an integer or decimal number.
fn lex_number(input: &mut &str) -> PResult<TokenKind> {
    (opt("-"), digit1, opt((".", digit1)))
        .value(TokenKind::Number)
        .parse_next(input)
}

/// Lex a symbolic operator. `=like` style operators must not run into a word.
fn lex_operator(input: &mut &str) -> PResult<TokenKind> {
    alt((
        // Multi-char operators first
        "!=",
        "<=",
        ">=",
        "=?",
        terminated("=ilike", not(one_of(is_word_char))),
        terminated("=like", not(one_of(is_word_char))),
        terminated("=ILIKE", not(one_of(is_word_char))),
        terminated("=LIKE", not(one_of(is_word_char))),
        // Single-char operators
        "=",
        "<",
        ">",
        "&",
        "|",
        "!",
    ))
    .value(TokenKind::Operator)
    .parse_next(input)
}

/// Lex an alphabetic comparison operator, including `not like` style pairs.
fn lex_keyword(input: &mut &str) -> PResult<TokenKind> {
    terminated(
        alt((
            (lex_word, multispace1, lex_word)
                .take()
                .verify(|text: &str| is_comparison_operator(&collapse_whitespace(text))),
            lex_word.verify(|word: &str| is_comparison_operator(word)),
        )),
        not(one_of(is_bare_char)),
    )
    .value(TokenKind::Keyword)
    .parse_next(input)
}

fn lex_bare<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(1.., is_bare_char).parse_next(input)
}

/// Lex a single token, returning its kind and source slice.
fn lex_token<'i>(input: &mut &'i str) -> PResult<(TokenKind, &'i str)> {
    alt((
        multispace1.value(TokenKind::Whitespace),
        "(".value(TokenKind::LParen),
        ")".value(TokenKind::RParen),
        "[".value(TokenKind::LBracket),
        "]".value(TokenKind::RBracket),
        ",".value(TokenKind::Comma),
        lex_string,
        lex_placeholder,
        lex_number,
        lex_operator,
        lex_keyword,
        lex_bare.value(TokenKind::Ident),
    ))
    .with_taken()
    .parse_next(input)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokenize the entire input. The last token is always [`TokenKind::Eof`].
pub fn tokenize(input: &str) -> Result<Vec<Token>, FilterError> {
    let mut remaining = input;
    let mut tokens = Vec::new();

    while !remaining.is_empty() {
        let before = remaining;
        let offset = input.len() - remaining.len();
        match lex_token(&mut remaining) {
            Ok((TokenKind::Keyword, text)) => {
                tokens.push(Token::new(TokenKind::Keyword, collapse_whitespace(text), offset));
            }
            Ok((kind, text)) => tokens.push(Token::new(kind, text, offset)),
            Err(_) => {
                return Err(FilterError::Lex {
                    offset,
                    fragment: before.chars().take(16).collect(),
                });
            }
        }
    }

    tokens.push(Token::eof(input.len()));
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn test_tuple_tokens() {
        assert_eq!(
            kinds("[('a', '=', 1)]"),
            vec![
                (TokenKind::LBracket, "[".into()),
                (TokenKind::LParen, "(".into()),
                (TokenKind::Str, "'a'".into()),
                (TokenKind::Comma, ",".into()),
                (TokenKind::Str, "'='".into()),
                (TokenKind::Comma, ",".into()),
                (TokenKind::Number, "1".into()),
                (TokenKind::RParen, ")".into()),
                (TokenKind::RBracket, "]".into()),
                (TokenKind::Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_infix_tokens() {
        assert_eq!(
            kinds("partner_id.name != -2.5 and x is not y"),
            vec![
                (TokenKind::Ident, "partner_id.name".into()),
                (TokenKind::Operator, "!=".into()),
                (TokenKind::Number, "-2.5".into()),
                (TokenKind::Ident, "and".into()),
                (TokenKind::Ident, "x".into()),
                (TokenKind::Ident, "is".into()),
                (TokenKind::Ident, "not".into()),
                (TokenKind::Ident, "y".into()),
                (TokenKind::Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("a not  like b IN c index"),
            vec![
                (TokenKind::Ident, "a".into()),
                (TokenKind::Keyword, "not like".into()),
                (TokenKind::Ident, "b".into()),
                (TokenKind::Keyword, "IN".into()),
                (TokenKind::Ident, "c".into()),
                (TokenKind::Ident, "index".into()),
                (TokenKind::Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_operators() {
        let ops: Vec<String> = kinds("=? =like <= & | ! =ILIKE")
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Operator)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(ops, vec!["=?", "=like", "<=", "&", "|", "!", "=ILIKE"]);
    }

    #[test]
    fn test_like_prefix_does_not_swallow_words() {
        assert_eq!(
            kinds("a=likely"),
            vec![
                (TokenKind::Ident, "a".into()),
                (TokenKind::Operator, "=".into()),
                (TokenKind::Ident, "likely".into()),
                (TokenKind::Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_placeholders() {
        let found: Vec<String> = kinds("%s %(user)s $2 ?")
            .into_iter()
            .filter(|(kind, _)| *kind == TokenKind::Placeholder)
            .map(|(_, text)| text)
            .collect();
        assert_eq!(found, vec!["%s", "%(user)s", "$2", "?"]);
    }

    #[test]
    fn test_escaped_quote_in_string() {
        let tokens = kinds(r#"'it\'s' "a""#);
        assert_eq!(tokens[0], (TokenKind::Str, r"'it\'s'".into()));
        assert_eq!(tokens[1], (TokenKind::Str, "\"a\"".into()));
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("a = 1").unwrap();
        let offsets: Vec<usize> = tokens.iter().map(|t| t.offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_unterminated_string_is_lex_error() {
        let err = tokenize("[('a', '=").unwrap_err();
        assert_eq!(
            err,
            FilterError::Lex {
                offset: 7,
                fragment: "'=".into()
            }
        );
    }

    #[test]
    fn test_bare_values() {
        assert_eq!(
            kinds("x% %foo% like% #tag"),
            vec![
                (TokenKind::Ident, "x%".into()),
                (TokenKind::Ident, "%foo%".into()),
                (TokenKind::Ident, "like%".into()),
                (TokenKind::Ident, "#tag".into()),
                (TokenKind::Eof, "".into()),
            ]
        );
    }

    #[test]
    fn test_lone_quote_is_lex_error() {
        assert!(matches!(
            tokenize("a = 'x' \""),
            Err(FilterError::Lex { offset: 8, .. })
        ));
    }
}

//! Parser for filter domains.
//!
//! Accepts the tuple form (`[('a','=',1), ...]` with optional prefix `&`, `|`,
//! `!`) and the keyword form (`a = 1 and b is not 2`). Each bracket or paren
//! opens a new level. A level collects items into `pending`; the infix words
//! `and`/`or` flush `pending` into `group` and prepend the prefix operator.
//!
//! "is" / "is not" become `=` / `!=`. A single-element grouping collapses to
//! its element.

use super::FilterError;
use super::ast::{AND_OPERATOR, FilterNode, Item, OR_OPERATOR};
use super::lexer::{Token, TokenKind, tokenize};
use crate::utils::{coerce_scalar, strip_quotes};
use serde::{Deserialize, Serialize};

/// Per-parser options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ParserConfig {
    /// Log every consumed token at debug level.
    #[serde(default)]
    pub trace_tokens: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Collecting,
    Closed,
}

/// Accumulator for one nesting level.
#[derive(Debug)]
struct Frame {
    group: FilterNode,
    pending: FilterNode,
    state: FrameState,
}

impl Frame {
    fn new() -> Self {
        Frame {
            group: FilterNode::new(),
            pending: FilterNode::new(),
            state: FrameState::Collecting,
        }
    }

    fn is_open(&self) -> bool {
        self.state != FrameState::Closed
    }

    fn push(&mut self, item: impl Into<Item>) {
        self.pending.push(item);
    }

    /// Handle an infix `and`/`or`.
    fn boundary(&mut self, operator: &str) {
        self.flush();
        self.group.insert(0, operator);
    }

    /// Move `pending` into `group`: as one nested group when it holds several
    /// items, spliced in directly otherwise.
    fn flush(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        if pending.count() > 1 {
            self.group.push(pending);
        } else {
            self.group.merge(pending);
        }
    }

    fn close(&mut self) {
        self.state = FrameState::Closed;
    }

    fn finish(mut self) -> FilterNode {
        if self.group.is_value_node() && self.pending.is_value_node() {
            let mut group = self.group;
            group.push(self.pending);
            return group;
        }
        if !self.group.is_empty() {
            self.flush();
            return self.group;
        }
        if self.pending.count() == 1 {
            return self.pending.into_children().remove(0);
        }
        self.pending
    }
}

/// Parser state.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    config: ParserConfig,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser::with_config(tokens, ParserConfig::default())
    }

    pub fn with_config(mut tokens: Vec<Token>, config: ParserConfig) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let end = tokens.last().map_or(0, |t| t.offset + t.text.len());
            tokens.push(Token::eof(end));
        }
        Parser {
            tokens,
            pos: 0,
            config,
        }
    }

    fn peek(&self) -> &Token {
        // The token list always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    /// Index of the next token after the current one that is not whitespace.
    fn next_significant(&self) -> usize {
        let mut idx = self.pos + 1;
        while idx < self.tokens.len() - 1 && self.tokens[idx].kind == TokenKind::Whitespace {
            idx += 1;
        }
        idx.min(self.tokens.len() - 1)
    }

    /// Parse the whole token stream.
    pub fn parse(&mut self) -> FilterNode {
        let node = self.parse_level(0);
        if self.peek().kind != TokenKind::Eof {
            let rest = &self.tokens[self.pos..];
            tracing::warn!(
                "Ignoring {} token(s) after unmatched closer at offset {}",
                rest.len() - 1,
                rest[0].offset
            );
        }
        node
    }

    fn parse_level(&mut self, level: usize) -> FilterNode {
        let mut frame = Frame::new();

        while frame.is_open() {
            let token = self.peek().clone();
            if self.config.trace_tokens {
                tracing::debug!(level, kind = ?token.kind, text = %token.text, "token");
            }

            match token.kind {
                TokenKind::Eof => frame.close(),
                TokenKind::LParen | TokenKind::LBracket => {
                    self.advance();
                    if self.peek().kind == TokenKind::Eof {
                        frame.close();
                    } else {
                        let nested = self.parse_level(level + 1);
                        frame.push(nested);
                    }
                }
                TokenKind::RParen | TokenKind::RBracket => {
                    self.advance();
                    frame.close();
                }
                TokenKind::Ident
                | TokenKind::Placeholder
                | TokenKind::Str
                | TokenKind::Number => {
                    self.parse_word(&mut frame, &token);
                    self.advance();
                }
                TokenKind::Operator | TokenKind::Keyword => {
                    frame.push(strip_quotes(&token.text));
                    self.advance();
                }
                TokenKind::Comma | TokenKind::Whitespace => self.advance(),
            }
        }

        frame.finish()
    }

    fn parse_word(&mut self, frame: &mut Frame, token: &Token) {
        match token.text.to_lowercase().as_str() {
            "is" => {
                let next = self.next_significant();
                if self.tokens[next].text.to_lowercase() == "not" {
                    frame.push("!=");
                    // Skip to `not`; the caller advances past it.
                    self.pos = next;
                } else {
                    frame.push("=");
                }
            }
            "and" => frame.boundary(AND_OPERATOR),
            "or" => frame.boundary(OR_OPERATOR),
            _ => frame.push(coerce_scalar(strip_quotes(&token.text))),
        }
    }
}

/// Parse a filter domain string into an AST.
pub fn parse_filter(input: &str) -> Result<FilterNode, FilterError> {
    parse_filter_with(input, ParserConfig::default())
}

pub fn parse_filter_with(input: &str, config: ParserConfig) -> Result<FilterNode, FilterError> {
    let tokens = tokenize(input)?;
    let mut parser = Parser::with_config(tokens, config);
    Ok(parser.parse())
}

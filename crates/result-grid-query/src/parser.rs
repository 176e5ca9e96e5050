// crates/result-grid-query/src/parser.rs
// ============================================================================
// Module: Query Parser
// Description: Lexer and recursive-descent parser for the query grammar.
// Purpose: Turn untrusted query strings into `Query` trees with positions.
// Dependencies: crate::ast, result-grid-core, thiserror
// ============================================================================

//! ## Overview
//! The grammar layers four precedence levels, tightest first: `not`/`!`,
//! juxtaposition (two atoms side by side mean AND), explicit `and`/`&`, and
//! `or`/`|`. Atoms are either name substrings or `RUN=STATUS` probes.
//! Keywords and status tokens match case-insensitively; input must be
//! consumed entirely. Input size and nesting depth are capped, failing
//! closed on untrusted queries.

use result_grid_core::RunId;
use result_grid_core::TestStatus;
use thiserror::Error;

use crate::ast::Query;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed query size in bytes.
const MAX_QUERY_BYTES: usize = 1024 * 1024;
/// Maximum supported nesting depth for parentheses and negation.
const MAX_NESTING: usize = 32;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while parsing a query string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Input was empty or contained only whitespace.
    #[error("query is empty")]
    EmptyInput,
    /// Input exceeded the configured size limit.
    #[error("query exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Input exceeded the configured nesting depth.
    #[error("query nesting exceeds limit (max {max_depth}) at {position}")]
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected token encountered during parsing.
    #[error("unexpected token `{found}` at {position}, expected {expected}")]
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// The run part of a `RUN=STATUS` atom is not a 64-bit integer.
    #[error("invalid run id `{raw}` at {position}")]
    InvalidRunId {
        /// The raw run text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// The status part of a `RUN=STATUS` atom names no known status.
    #[error("unknown status `{raw}` at {position}")]
    UnknownStatus {
        /// The raw status text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected trailing input after a complete expression.
    #[error("unexpected trailing input at {position}")]
    TrailingInput {
        /// Byte offset where unexpected input begins.
        position: usize,
    },
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from the query input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Name-character word (names, run ids, status tokens).
    Word(&'a str),
    /// The `and` keyword or `&`.
    And,
    /// The `or` keyword or `|`.
    Or,
    /// The `not` keyword or `!`.
    Not,
    /// The `=` in a `RUN=STATUS` atom.
    Eq,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// End-of-input marker.
    Eof,
}

/// Token paired with its byte offset.
#[derive(Debug, Clone, Copy)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for the query grammar.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

/// Returns true for bytes allowed anywhere in a word.
const fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'/' | b'.' | b'_' | b'-')
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens.
    fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, ParseError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let byte = bytes[self.offset];
            match byte {
                b' ' | b'\t' | b'\n' | b'\r' | 0x0b => {
                    self.offset += 1;
                }
                b'(' => {
                    tokens.push(self.simple(Token::LParen));
                    self.offset += 1;
                }
                b')' => {
                    tokens.push(self.simple(Token::RParen));
                    self.offset += 1;
                }
                b'&' => {
                    tokens.push(self.simple(Token::And));
                    self.offset += 1;
                }
                b'|' => {
                    tokens.push(self.simple(Token::Or));
                    self.offset += 1;
                }
                b'!' => {
                    tokens.push(self.simple(Token::Not));
                    self.offset += 1;
                }
                b'=' => {
                    tokens.push(self.simple(Token::Eq));
                    self.offset += 1;
                }
                _ if is_word_byte(byte) => {
                    let start = self.offset;
                    while self.offset < bytes.len() && is_word_byte(bytes[self.offset]) {
                        self.offset += 1;
                    }
                    let slice = &self.input[start .. self.offset];
                    tokens.push(SpannedToken {
                        token: Self::keyword_or_word(slice),
                        position: start,
                    });
                }
                _ => {
                    let found = self.input[self.offset ..]
                        .chars()
                        .next()
                        .map_or_else(String::new, |ch| ch.to_string());
                    return Err(ParseError::UnexpectedToken {
                        expected: "name, operator, or parenthesis",
                        found,
                        position: self.offset,
                    });
                }
            }
        }

        if tokens.is_empty() {
            return Err(ParseError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Builds a token at the current offset.
    const fn simple(&self, token: Token<'a>) -> SpannedToken<'a> {
        SpannedToken {
            token,
            position: self.offset,
        }
    }

    /// Maps a word to a keyword token, matching case-insensitively.
    fn keyword_or_word(slice: &'a str) -> Token<'a> {
        if slice.eq_ignore_ascii_case("and") {
            Token::And
        } else if slice.eq_ignore_ascii_case("or") {
            Token::Or
        } else if slice.eq_ignore_ascii_case("not") {
            Token::Not
        } else {
            Token::Word(slice)
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Parses a query string into a [`Query`] tree.
///
/// # Errors
///
/// Returns [`ParseError`] for syntax issues, malformed `RUN=STATUS` atoms,
/// oversized or over-nested input, and unconsumed trailing input.
pub fn parse(input: &str) -> Result<Query, ParseError> {
    if input.len() > MAX_QUERY_BYTES {
        return Err(ParseError::InputTooLarge {
            max_bytes: MAX_QUERY_BYTES,
            actual_bytes: input.len(),
        });
    }
    let tokens = Lexer::new(input).lex()?;
    let mut parser = Parser::new(tokens);
    let query = parser.parse_or()?;
    parser.expect_eof()?;
    Ok(query)
}

/// Recursive-descent parser over the token stream.
struct Parser<'a> {
    /// Token stream with source positions.
    tokens: Vec<SpannedToken<'a>>,
    /// Current token index.
    index: usize,
    /// Current nesting depth for parentheses and negation.
    nesting: usize,
}

impl<'a> Parser<'a> {
    /// Creates a parser over the token stream.
    const fn new(tokens: Vec<SpannedToken<'a>>) -> Self {
        Self {
            tokens,
            index: 0,
            nesting: 0,
        }
    }

    /// Parses OR expressions (loosest level).
    fn parse_or(&mut self) -> Result<Query, ParseError> {
        let mut parts = vec![self.parse_and()?];
        while self.matches(Token::Or) {
            parts.push(self.parse_and()?);
        }
        Ok(Query::or(parts))
    }

    /// Parses explicit AND expressions.
    fn parse_and(&mut self) -> Result<Query, ParseError> {
        let mut parts = vec![self.parse_juxtaposition()?];
        while self.matches(Token::And) {
            parts.push(self.parse_juxtaposition()?);
        }
        Ok(Query::and(parts))
    }

    /// Parses juxtaposed expressions; adjacency without an operator is AND.
    fn parse_juxtaposition(&mut self) -> Result<Query, ParseError> {
        let mut parts = vec![self.parse_not()?];
        while self.starts_operand() {
            parts.push(self.parse_not()?);
        }
        Ok(Query::and(parts))
    }

    /// Parses NOT expressions (tightest level).
    fn parse_not(&mut self) -> Result<Query, ParseError> {
        if let Some(position) = self.matches_at(Token::Not) {
            return self.with_nesting(position, |parser| {
                Ok(Query::negate(parser.parse_not()?))
            });
        }
        self.parse_primary()
    }

    /// Parses a parenthesized group or an atom.
    fn parse_primary(&mut self) -> Result<Query, ParseError> {
        let SpannedToken {
            token,
            position,
        } = *self.current();
        match token {
            Token::LParen => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let inner = parser.parse_or()?;
                    parser.expect(Token::RParen, "`)`")?;
                    Ok(inner)
                })
            }
            Token::Word(word) => {
                self.advance();
                if self.matches(Token::Eq) {
                    self.parse_result_atom(word, position)
                } else {
                    name_atom(word, position)
                }
            }
            _ => Err(ParseError::UnexpectedToken {
                expected: "test name, RUN=STATUS, `not`, or `(`",
                found: self.describe(token),
                position,
            }),
        }
    }

    /// Parses the status side of a `RUN=STATUS` atom.
    fn parse_result_atom(&mut self, run_raw: &str, position: usize) -> Result<Query, ParseError> {
        let run: i64 = run_raw.parse().map_err(|_| ParseError::InvalidRunId {
            raw: run_raw.to_string(),
            position,
        })?;
        let SpannedToken {
            token,
            position: status_position,
        } = *self.current();
        let Token::Word(status_raw) = token else {
            return Err(ParseError::UnexpectedToken {
                expected: "status token after `=`",
                found: self.describe(token),
                position: status_position,
            });
        };
        self.advance();
        let status =
            TestStatus::from_token(status_raw).ok_or_else(|| ParseError::UnknownStatus {
                raw: status_raw.to_string(),
                position: status_position,
            })?;
        Ok(Query::result_eq(RunId(run), status))
    }

    /// Returns true when the current token can begin an operand.
    fn starts_operand(&self) -> bool {
        matches!(self.current().token, Token::Word(_) | Token::Not | Token::LParen)
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        let next_depth = self.nesting + 1;
        if next_depth > MAX_NESTING {
            return Err(ParseError::NestingTooDeep {
                max_depth: MAX_NESTING,
                position,
            });
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: Token<'_>, expected: &'static str) -> Result<(), ParseError> {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(&token) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.describe(self.current().token),
                position: self.current().position,
            })
        }
    }

    /// Ensures the parser consumed the whole input.
    fn expect_eof(&self) -> Result<(), ParseError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(ParseError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: Token<'_>) -> bool {
        self.matches_at(kind).is_some()
    }

    /// Consumes the token if it matches, returning its position.
    fn matches_at(&mut self, kind: Token<'_>) -> Option<usize> {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(&kind) {
            let position = self.current().position;
            self.advance();
            Some(position)
        } else {
            None
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'a> {
        debug_assert!(self.index < self.tokens.len(), "parser index out of bounds");
        &self.tokens[self.index]
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    /// Formats a token for diagnostics.
    fn describe(&self, token: Token<'_>) -> String {
        match token {
            Token::Word(word) => word.to_string(),
            Token::And => "and".to_string(),
            Token::Or => "or".to_string(),
            Token::Not => "not".to_string(),
            Token::Eq => "=".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Validates a bare word as a name atom.
fn name_atom(word: &str, position: usize) -> Result<Query, ParseError> {
    // The lexer guarantees the word charset; only a leading `-` (reserved
    // for negative run ids) disqualifies a bare name.
    if word.starts_with('-') {
        return Err(ParseError::UnexpectedToken {
            expected: "test name or RUN=STATUS",
            found: word.to_string(),
            position,
        });
    }
    Ok(Query::name(word))
}

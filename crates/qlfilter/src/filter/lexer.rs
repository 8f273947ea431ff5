//! Lexer (tokenizer) for filter expressions.

use std::iter::Peekable;
use std::str::Chars;

/// Error encountered during lexical analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexerError {
    /// What could not be tokenized.
    pub message: String,
    /// The position (0-indexed byte offset) where the error occurred.
    pub position: usize,
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at position {}", self.message, self.position)
    }
}

impl std::error::Error for LexerError {}

/// Result of tokenizing a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LexerResult {
    /// The tokens successfully parsed, with their positions.
    pub tokens: Vec<PositionedToken>,
    /// Any errors encountered (unknown characters, unterminated strings).
    pub errors: Vec<LexerError>,
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedToken {
    /// The token.
    pub token: FilterToken,
    /// The byte position where the token starts (0-indexed).
    pub position: usize,
}

/// A token in a filter expression.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterToken {
    // ==================== Comparison Operators ====================
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Gte,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// The `in` keyword.
    In,
    /// The `not` keyword (only valid before `in` / `like`).
    Not,
    /// The `like` keyword.
    Like,

    // ==================== Logical Operators ====================
    /// `&&` or `and`.
    And,
    /// `||` or `or`.
    Or,
    /// Opening parenthesis `(`.
    OpenParen,
    /// Closing parenthesis `)`.
    CloseParen,
    /// List separator `,`.
    Comma,

    // ==================== Literals ====================
    /// An unquoted word: a field key or a bare value.
    Word(String),
    /// A quoted string, with `\\` and `\"` unescaped.
    Str(String),
    /// An integral number.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// `true` or `false`.
    Bool(bool),
    /// `null`.
    Null,
}

impl FilterToken {
    /// Short description for error messages.
    pub fn describe(&self) -> String {
        match self {
            FilterToken::Eq => "'=='".to_string(),
            FilterToken::Ne => "'!='".to_string(),
            FilterToken::Gt => "'>'".to_string(),
            FilterToken::Gte => "'>='".to_string(),
            FilterToken::Lt => "'<'".to_string(),
            FilterToken::Lte => "'<='".to_string(),
            FilterToken::In => "'in'".to_string(),
            FilterToken::Not => "'not'".to_string(),
            FilterToken::Like => "'like'".to_string(),
            FilterToken::And => "'and'".to_string(),
            FilterToken::Or => "'or'".to_string(),
            FilterToken::OpenParen => "'('".to_string(),
            FilterToken::CloseParen => "')'".to_string(),
            FilterToken::Comma => "','".to_string(),
            FilterToken::Word(w) => format!("'{}'", w),
            FilterToken::Str(s) => format!("\"{}\"", s),
            FilterToken::Int(i) => i.to_string(),
            FilterToken::Float(v) => v.to_string(),
            FilterToken::Bool(b) => b.to_string(),
            FilterToken::Null => "null".to_string(),
        }
    }
}

/// Lexer for tokenizing filter expressions.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
    /// Errors encountered during tokenization.
    errors: Vec<LexerError>,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input string.
    pub fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            position: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    fn next_char(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.peek() {
            if c.is_whitespace() {
                self.next_char();
            } else {
                break;
            }
        }
    }

    /// Characters allowed in an unquoted word.
    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '*' | '\\' | ':' | '+' | '/' | '@')
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.peek() {
            if !Self::is_word_char(c) {
                break;
            }
            word.push(c);
            self.next_char();
        }
        word
    }

    /// Reads a quoted string. `\\` and an escaped quote are unescaped; any
    /// other backslash sequence is kept as written so `\*` survives.
    fn read_quoted_string(&mut self, quote_char: char, start: usize) -> Option<String> {
        // Consume the opening quote
        self.next_char();

        let mut result = String::new();
        while let Some(c) = self.next_char() {
            if c == quote_char {
                return Some(result);
            }
            if c == '\\' {
                match self.next_char() {
                    Some(escaped) if escaped == '\\' || escaped == quote_char => result.push(escaped),
                    Some(other) => {
                        result.push('\\');
                        result.push(other);
                    }
                    None => break,
                }
            } else {
                result.push(c);
            }
        }
        self.errors.push(LexerError {
            message: "unterminated string".to_string(),
            position: start,
        });
        None
    }

    /// Consumes `second` if it is the next character.
    fn follows(&mut self, second: char) -> bool {
        if self.peek() == Some(&second) {
            self.next_char();
            true
        } else {
            false
        }
    }

    /// Classifies an unquoted word as keyword, number or plain word.
    fn classify(word: String) -> FilterToken {
        match word.to_lowercase().as_str() {
            "and" => return FilterToken::And,
            "or" => return FilterToken::Or,
            "in" => return FilterToken::In,
            "not" => return FilterToken::Not,
            "like" => return FilterToken::Like,
            "true" => return FilterToken::Bool(true),
            "false" => return FilterToken::Bool(false),
            "null" => return FilterToken::Null,
            _ => {}
        }

        let numeric_start = {
            let mut chars = word.chars();
            match chars.next() {
                Some(c) if c.is_ascii_digit() => true,
                Some('-') => chars.next().is_some_and(|c| c.is_ascii_digit()),
                _ => false,
            }
        };
        if numeric_start {
            if let Ok(i) = word.parse::<i64>() {
                return FilterToken::Int(i);
            }
            if let Ok(v) = word.parse::<f64>() {
                return FilterToken::Float(v);
            }
        }
        FilterToken::Word(word)
    }

    /// Returns the next token with its position, or None if at end of input.
    pub fn next_token(&mut self) -> Option<PositionedToken> {
        self.skip_whitespace();

        let c = *self.peek()?;
        let token_start = self.position;
        let positioned = |token| {
            Some(PositionedToken {
                token,
                position: token_start,
            })
        };

        match c {
            '(' => {
                self.next_char();
                positioned(FilterToken::OpenParen)
            }
            ')' => {
                self.next_char();
                positioned(FilterToken::CloseParen)
            }
            ',' => {
                self.next_char();
                positioned(FilterToken::Comma)
            }
            '=' => {
                self.next_char();
                if self.follows('=') {
                    positioned(FilterToken::Eq)
                } else {
                    self.unexpected('=', token_start)
                }
            }
            '!' => {
                self.next_char();
                if self.follows('=') {
                    positioned(FilterToken::Ne)
                } else {
                    self.unexpected('!', token_start)
                }
            }
            '>' => {
                self.next_char();
                if self.follows('=') {
                    positioned(FilterToken::Gte)
                } else {
                    positioned(FilterToken::Gt)
                }
            }
            '<' => {
                self.next_char();
                if self.follows('=') {
                    positioned(FilterToken::Lte)
                } else {
                    positioned(FilterToken::Lt)
                }
            }
            '&' => {
                self.next_char();
                if self.follows('&') {
                    positioned(FilterToken::And)
                } else {
                    self.unexpected('&', token_start)
                }
            }
            '|' => {
                self.next_char();
                if self.follows('|') {
                    positioned(FilterToken::Or)
                } else {
                    self.unexpected('|', token_start)
                }
            }
            '"' | '\'' => match self.read_quoted_string(c, token_start) {
                Some(s) => positioned(FilterToken::Str(s)),
                None => None,
            },
            _ if Self::is_word_char(c) => {
                let word = self.read_word();
                match Self::classify(word) {
                    FilterToken::Float(v) if !v.is_finite() => {
                        self.errors.push(LexerError {
                            message: "number out of range".to_string(),
                            position: token_start,
                        });
                        self.next_token()
                    }
                    token => positioned(token),
                }
            }

            // Unknown character - record error and continue
            _ => {
                self.next_char();
                self.unexpected(c, token_start)
            }
        }
    }

    /// Records an unexpected character and carries on with the next token.
    fn unexpected(&mut self, character: char, position: usize) -> Option<PositionedToken> {
        self.errors.push(LexerError {
            message: format!("unexpected character '{}'", character),
            position,
        });
        self.next_token()
    }

    /// Collects all tokens, discarding positions.
    pub fn tokenize(self) -> Vec<FilterToken> {
        self.tokenize_with_errors()
            .tokens
            .into_iter()
            .map(|pt| pt.token)
            .collect()
    }

    /// Collects all tokens and any errors encountered.
    pub fn tokenize_with_errors(mut self) -> LexerResult {
        let mut tokens = Vec::new();
        while let Some(positioned_token) = self.next_token() {
            tokens.push(positioned_token);
        }
        LexerResult {
            tokens,
            errors: self.errors,
        }
    }
}

//! Command-line tokenizer.
//!
//! The dispatcher only depends on the [`Tokenizer`] trait. [`DefaultTokenizer`]
//! implements a small grammar:
//!
//! ```text
//! help                  FLAG    (identifier)
//! "hello world"         STRING  (supports \" and \\ escapes)
//! `help`                WORD    (backticks force a word)
//! ./path, a.b           WORD    (any other bare token)
//! 42, -1.5              NUMBER
//! style=bold            keyword argument, value tokenized by the same rules
//! ```

use std::collections::btree_map::Entry;

use thiserror::Error;

use crate::token::{Arguments, Token};

/// Raw text that violates the token grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns a command string (prefix already stripped) into typed arguments.
pub trait Tokenizer: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Arguments, ParseError>;
}

/// The built-in tokenizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultTokenizer;

impl Tokenizer for DefaultTokenizer {
    fn parse(&self, raw: &str) -> Result<Arguments, ParseError> {
        Scanner::new(raw).run()
    }
}

/// Whether `text` is a bare identifier (`[A-Za-z_][A-Za-z0-9_-]*`).
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn new(raw: &str) -> Self {
        Self {
            chars: raw.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn run(mut self) -> Result<Arguments, ParseError> {
        let mut arguments = Arguments::default();
        loop {
            self.skip_whitespace();
            if self.peek().is_none() {
                return Ok(arguments);
            }
            if let Some(name) = self.keyword_name() {
                let value = self.value()?;
                match arguments.keyword.entry(name) {
                    Entry::Vacant(slot) => {
                        slot.insert(value);
                    }
                    Entry::Occupied(slot) => {
                        return Err(ParseError::new(format!(
                            "Keyword argument `{}` given more than once",
                            slot.key()
                        )));
                    }
                }
            } else {
                let token = self.value()?;
                arguments.positional.push(token);
            }
        }
    }

    /// Consumes `name=` if the upcoming bare token is a keyword assignment.
    fn keyword_name(&mut self) -> Option<String> {
        let start = self.pos;
        let mut end = start;
        while self
            .chars
            .get(end)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        {
            end += 1;
        }
        if self.chars.get(end) != Some(&'=') {
            return None;
        }
        let name: String = self.chars[start..end].iter().collect();
        if !is_identifier(&name) {
            return None;
        }
        self.pos = end + 1;
        Some(name)
    }

    fn value(&mut self) -> Result<Token, ParseError> {
        match self.peek() {
            Some('"') => self.quoted().map(Token::Str),
            Some('`') => self.backticked().map(Token::Word),
            Some(c) if !c.is_whitespace() => Ok(self.bare()),
            _ => Err(ParseError::new(format!(
                "Expected a value at column {}",
                self.pos + 1
            ))),
        }
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            match c {
                '"' => return Ok(text),
                '\\' => match self.peek() {
                    Some(escaped @ ('"' | '\\')) => {
                        self.pos += 1;
                        text.push(escaped);
                    }
                    _ => text.push('\\'),
                },
                _ => text.push(c),
            }
        }
        Err(ParseError::new(format!(
            "Unterminated string starting at column {}",
            start + 1
        )))
    }

    fn backticked(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '`' {
                return Ok(text);
            }
            text.push(c);
        }
        Err(ParseError::new(format!(
            "Unterminated word starting at column {}",
            start + 1
        )))
    }

    fn bare(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| !c.is_whitespace()) {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if is_identifier(&text) {
            return Token::Flag(text);
        }
        match text.parse::<f64>() {
            Ok(number) if number.is_finite() => Token::Number(number),
            _ => Token::Word(text),
        }
    }
}

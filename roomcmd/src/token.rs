//! Typed tokens produced by a [`Tokenizer`](crate::parser::Tokenizer).

use std::collections::BTreeMap;
use std::fmt;

/// A single typed token from a command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare identifier: either a tree-navigation key or an enum literal.
    Flag(String),

    /// A word that is not an identifier (or an explicitly backticked one).
    Word(String),

    /// A quoted string.
    Str(String),

    /// A numeric literal.
    Number(f64),
}

impl Token {
    /// The kind tag of this token.
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Flag(_) => TokenKind::Flag,
            Token::Word(_) => TokenKind::Word,
            Token::Str(_) => TokenKind::Str,
            Token::Number(_) => TokenKind::Number,
        }
    }

    /// The flag name, if this token is a flag.
    pub fn as_flag(&self) -> Option<&str> {
        match self {
            Token::Flag(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Flag(s) | Token::Word(s) | Token::Str(s) => write!(f, "{}", s),
            Token::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Kind tag of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Flag,
    Word,
    Str,
    Number,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Flag => "FLAG",
            TokenKind::Word => "WORD",
            TokenKind::Str => "STRING",
            TokenKind::Number => "NUMBER",
        };
        f.write_str(name)
    }
}

/// Tokenized command line: ordered positional tokens plus `name=value` keywords.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Token>,
    pub keyword: BTreeMap<String, Token>,
}

impl Arguments {
    /// Positional-only arguments.
    pub fn positional(tokens: Vec<Token>) -> Self {
        Self {
            positional: tokens,
            keyword: BTreeMap::new(),
        }
    }

    /// Add a keyword argument.
    pub fn with_keyword(mut self, name: impl Into<String>, token: Token) -> Self {
        self.keyword.insert(name.into(), token);
        self
    }
}

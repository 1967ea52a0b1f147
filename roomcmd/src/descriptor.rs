//! Statically authored parameter descriptors.
//!
//! Every handler declares its parameters up front as a list of
//! [`Parameter`]s, usually through `#[derive(CommandArgs)]` on an argument
//! struct. The binder checks user input against these descriptors and the
//! handler reads typed values back out of the resulting [`Bindings`].

use std::collections::BTreeMap;
use std::fmt;

use crate::error::CommandError;
use crate::token::{Token, TokenKind};

/// Kind of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    /// A flag naming one of the given literals. Matching is exact.
    Flag(&'static [&'static str]),
    Word,
    Str,
    Number,
}

impl ArgKind {
    /// The token kind a value of this kind must have.
    pub fn token_kind(&self) -> TokenKind {
        match self {
            ArgKind::Flag(_) => TokenKind::Flag,
            ArgKind::Word => TokenKind::Word,
            ArgKind::Str => TokenKind::Str,
            ArgKind::Number => TokenKind::Number,
        }
    }

    /// Build a token of this kind from textual default.
    ///
    /// Used by `#[arg(default = "...")]`; a number kind given text that does
    /// not parse falls back to a word so registration can reject it.
    pub fn literal_token(&self, text: &str) -> Token {
        match self {
            ArgKind::Flag(_) => Token::Flag(text.to_string()),
            ArgKind::Word => Token::Word(text.to_string()),
            ArgKind::Str => Token::Str(text.to_string()),
            ArgKind::Number => match text.parse::<f64>() {
                Ok(n) => Token::Number(n),
                Err(_) => Token::Word(text.to_string()),
            },
        }
    }

    /// Whether `token` is an acceptable value for this kind.
    pub fn accepts(&self, token: &Token) -> bool {
        match (self, token) {
            (ArgKind::Flag(literals), Token::Flag(name)) => literals.contains(&name.as_str()),
            _ => self.token_kind() == token.kind(),
        }
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token_kind())
    }
}

/// Whether a parameter must be supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
    Required,
    /// May be left unbound; the handler sees `None`.
    Optional,
    /// May be left unbound; the token is filled in before invocation.
    Default(Token),
}

/// One declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub kind: ArgKind,
    pub presence: Presence,
}

impl Parameter {
    pub fn required(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Required,
        }
    }

    pub fn optional(name: &'static str, kind: ArgKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
        }
    }

    pub fn with_default(name: &'static str, kind: ArgKind, default: Token) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Default(default),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.presence, Presence::Required)
    }
}

/// Usage form, e.g. `<name: STRING>` or `[style: plain/bold = plain]`.
impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ArgKind::Flag(literals) => literals.join("/"),
            other => other.to_string(),
        };
        match &self.presence {
            Presence::Required => write!(f, "<{}: {}>", self.name, kind),
            Presence::Optional => write!(f, "[{}: {}]", self.name, kind),
            Presence::Default(token) => write!(f, "[{}: {} = {}]", self.name, kind, token),
        }
    }
}

// ============================================================================
// Typed values
// ============================================================================

/// A Rust type that can be read out of a bound token.
///
/// Enums get an implementation from `#[derive(FlagEnum)]`.
pub trait ArgValue: Sized {
    const KIND: ArgKind;

    /// Convert a token already validated against [`ArgValue::KIND`].
    ///
    /// Returns `None` when the token is of the right kind but its value does
    /// not fit the type (a fractional number for an integer, say).
    fn from_token(token: &Token) -> Option<Self>;
}

/// A literal set of flag names backed by a unit enum.
pub trait FlagEnum: Sized {
    const LITERALS: &'static [&'static str];

    fn from_literal(literal: &str) -> Option<Self>;

    fn literal(&self) -> &'static str;
}

/// A `WORD` argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word(pub String);

impl Word {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ArgValue for Word {
    const KIND: ArgKind = ArgKind::Word;

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Word(word) => Some(Word(word.clone())),
            _ => None,
        }
    }
}

impl ArgValue for String {
    const KIND: ArgKind = ArgKind::Str;

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Str(text) => Some(text.clone()),
            _ => None,
        }
    }
}

impl ArgValue for f64 {
    const KIND: ArgKind = ArgKind::Number;

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl ArgValue for i64 {
    const KIND: ArgKind = ArgKind::Number;

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            // i64::MAX as f64 rounds up to 2^63, which is out of range.
            Token::Number(n)
                if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n < i64::MAX as f64 =>
            {
                Some(*n as i64)
            }
            _ => None,
        }
    }
}

impl ArgValue for u64 {
    const KIND: ArgKind = ArgKind::Number;

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n < u64::MAX as f64 => {
                Some(*n as u64)
            }
            _ => None,
        }
    }
}

// ============================================================================
// Bindings
// ============================================================================

/// Parameter name to bound token, produced by the binder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bindings {
    values: BTreeMap<String, Token>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, token: Token) {
        self.values.insert(name.into(), token);
    }

    pub fn get(&self, name: &str) -> Option<&Token> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Token)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fill every unbound parameter that declares a default.
    pub fn fill_defaults(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            if let Presence::Default(token) = &parameter.presence {
                self.values
                    .entry(parameter.name.to_string())
                    .or_insert_with(|| token.clone());
            }
        }
    }

    /// Read a bound value that must be present.
    pub fn required<T: ArgValue>(&self, name: &str) -> Result<T, CommandError> {
        self.optional(name)?
            .ok_or_else(|| CommandError::internal(format!("argument `{}` was not bound", name)))
    }

    /// Read a bound value that may be absent.
    pub fn optional<T: ArgValue>(&self, name: &str) -> Result<Option<T>, CommandError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(token) => T::from_token(token).map(Some).ok_or_else(|| {
                CommandError::user(format!(
                    "Invalid value supplied for argument `{}`.",
                    name
                ))
            }),
        }
    }
}

/// A handler's argument struct: its descriptor plus typed extraction.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(CommandArgs)]
/// struct EchoArgs {
///     text: String,
///     #[arg(default = "plain")]
///     style: Style,
/// }
/// ```
pub trait CommandArgs: Sized + Send + 'static {
    fn parameters() -> Vec<Parameter>;

    fn from_bindings(bindings: &Bindings) -> Result<Self, CommandError>;
}

impl CommandArgs for () {
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    fn from_bindings(_bindings: &Bindings) -> Result<Self, CommandError> {
        Ok(())
    }
}

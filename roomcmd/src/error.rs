//! Error types.
//!
//! Every [`DispatchError`] is user-visible: its `Display` output is the exact
//! chat reply sent for it. [`CommandError`] is what handlers return.

use thiserror::Error;

use crate::descriptor::ArgKind;
use crate::parser::ParseError;
use crate::store::StoreError;
use crate::token::TokenKind;

/// Result type returned by command handlers.
pub type CommandResult<T> = Result<T, CommandError>;

/// Error raised by a handler's own logic.
///
/// Mirrors the user/system split of a CLI: `User` errors are the handler
/// telling the invoker what they did wrong and are replied verbatim;
/// `Internal` errors are logged and answered with a generic message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0}")]
    User(String),

    #[error("{0}")]
    Internal(String),
}

impl CommandError {
    pub fn user(message: impl Into<String>) -> Self {
        CommandError::User(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CommandError::Internal(message.into())
    }
}

impl From<StoreError> for CommandError {
    fn from(e: StoreError) -> Self {
        CommandError::Internal(e.to_string())
    }
}

/// Every way a dispatch can fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// The command line does not start with a command name.
    #[error("No command given.")]
    NoCommand,

    #[error("There is no command named {prefix}{name}.")]
    NoSuchCommand { prefix: String, name: String },

    #[error(
        "The group {prefix}{group} has no subcommand named \"{name}\". Its subcommands are: {}",
        .subcommands.join(", ")
    )]
    NoSuchSubcommand {
        prefix: String,
        group: String,
        name: String,
        subcommands: Vec<String>,
    },

    #[error("Subcommands of {prefix}{group} are: {}", .subcommands.join(", "))]
    IncompleteGroup {
        prefix: String,
        group: String,
        subcommands: Vec<String>,
    },

    #[error("Superfluous arguments supplied starting at `{first}`.")]
    SuperfluousArguments { first: String },

    #[error("Unknown argument `{name}` supplied.")]
    UnknownArgument { name: String },

    #[error("Multiple values supplied for argument `{name}`.")]
    DuplicateArgument { name: String },

    #[error("Illegal argument `{name}` supplied.")]
    IllegalArgument { name: String },

    #[error("Argument `{name}` not provided, expected a value of type **{kind}**.")]
    MissingArgument { name: String, kind: ArgKind },

    #[error(
        "Incorrect type supplied for argument `{name}`; expected **{expected}** but got **{actual}**"
    )]
    TypeMismatch {
        name: String,
        expected: ArgKind,
        actual: TokenKind,
    },

    #[error(
        "Invalid value supplied for argument `{name}`; expected one of {}.",
        .literals.join("/")
    )]
    InvalidEnumLiteral {
        name: String,
        literals: Vec<&'static str>,
    },

    #[error("Only members of groups {} may run that command.", emphasize(.allowed))]
    PermissionDenied { allowed: Vec<String> },

    /// A handler rejected its input.
    #[error("{0}")]
    Handler(String),

    /// Anything unclassified. The detail is logged, never sent.
    #[error("An internal error occurred while running that command.")]
    Internal(String),
}

impl DispatchError {
    pub fn is_internal(&self) -> bool {
        matches!(self, DispatchError::Internal(_))
    }
}

impl From<CommandError> for DispatchError {
    fn from(e: CommandError) -> Self {
        match e {
            CommandError::User(message) => DispatchError::Handler(message),
            CommandError::Internal(detail) => DispatchError::Internal(detail),
        }
    }
}

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> Self {
        DispatchError::Internal(e.to_string())
    }
}

fn emphasize(groups: &[String]) -> String {
    groups
        .iter()
        .map(|name| format!("_{}_", name))
        .collect::<Vec<_>>()
        .join(" | ")
}

//! # roomcmd: chat-room command dispatch
//!
//! Users type a prefixed line in a chat room; roomcmd tokenizes it, walks a
//! command tree, checks group permissions, binds arguments to the handler's
//! declared parameters and runs the handler.
//!
//! ## Core Principles
//!
//! - **Static descriptors**: every handler declares its parameters up front
//!   (`#[derive(CommandArgs)]`), nothing is discovered at runtime
//! - **Exhaustive trees**: a node is a group or a command, never both
//! - **Explicit context**: the triggering event and user arrive in a
//!   [`Context`], separate from user-supplied arguments
//! - **One reply per message**: every failure becomes a chat reply
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use roomcmd::{CommandArgs, CommandResult, CommandTree, Context, Dispatcher, FlagEnum, State, Stores};
//!
//! #[derive(FlagEnum)]
//! enum Style {
//!     Plain,
//!     Bold,
//! }
//!
//! #[derive(CommandArgs)]
//! struct EchoArgs {
//!     text: String,
//!     #[arg(default = "plain")]
//!     style: Style,
//! }
//!
//! async fn echo(_ctx: Context<()>, args: EchoArgs) -> CommandResult<String> {
//!     Ok(match args.style {
//!         Style::Plain => args.text,
//!         Style::Bold => format!("**{}**", args.text),
//!     })
//! }
//!
//! let tree = CommandTree::builder().route("echo", echo).build()?;
//! let dispatcher = Dispatcher::new(tree, State::new(()), Stores::in_memory(), transport);
//! dispatcher.run(events).await;
//! ```

use std::sync::Arc;

// Lets derive output name `::roomcmd` from inside this crate's own tests.
extern crate self as roomcmd;

pub use roomcmd_macros::{CommandArgs, FlagEnum};

pub mod binder;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod handler;
pub mod parser;
pub mod permission;
pub mod store;
pub mod token;
pub mod tracing_support;
pub mod transport;
pub mod tree;
pub mod walker;

pub use descriptor::{ArgKind, ArgValue, Bindings, FlagEnum, Parameter, Presence, Word};
// The trait shares its name with the derive macro re-exported above.
pub use descriptor::CommandArgs;
pub use dispatcher::{DispatchConfig, Dispatcher};
pub use error::{CommandError, CommandResult, DispatchError};
pub use event::{MessageEvent, MessageId, User, UserId};
pub use handler::{Context, FnHandler, Handler, Reply, RESERVED_PARAMETERS};
pub use parser::{DefaultTokenizer, ParseError, Tokenizer};
pub use permission::{PermissionDecision, PermissionGate};
pub use store::{MemoryStore, PermissionStore, StoreError, Stores, TrickStore, UserStore};
pub use token::{Arguments, Token, TokenKind};
pub use transport::{RecordingTransport, SentMessage, Transport, TransportError};
pub use tree::{CommandTree, CommandTreeBuilder, Group, Leaf, Node, RegistrationError};

#[cfg(feature = "subscriber")]
pub use tracing_support::init_subscriber_with_config;
pub use tracing_support::{init_subscriber, TracingConfig, TracingFormat};

/// Shared application state wrapper.
///
/// Wraps your application state in an `Arc`; every handler invocation gets a
/// cheap clone through [`Context::state`].
///
/// # Example
///
/// ```
/// use roomcmd::State;
///
/// struct AppState {
///     greeting: String,
/// }
///
/// let state = State::new(AppState {
///     greeting: "hello".to_string(),
/// });
///
/// assert_eq!(state.get().greeting, "hello");
/// ```
pub struct State<T>(Arc<T>);

impl<T> State<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

//! Handlers, their invocation context, and their replies.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::descriptor::{Bindings, CommandArgs, Parameter};
use crate::error::CommandResult;
use crate::event::{MessageEvent, MessageId, User};
use crate::store::Stores;
use crate::tree::CommandTree;
use crate::State;

/// Parameter names that belong to the dispatch context.
///
/// Handlers may not declare them and users may not pass them as keywords.
pub const RESERVED_PARAMETERS: &[&str] = &["event", "current_user"];

/// Everything a handler gets besides its own arguments.
pub struct Context<S> {
    /// The message that triggered the command.
    pub event: MessageEvent,
    /// The invoking user, freshly upserted.
    pub current_user: User,
    pub stores: Stores,
    pub tree: Arc<CommandTree<S>>,
    pub state: State<S>,
}

impl<S> Context<S> {
    pub fn state(&self) -> &S {
        self.state.get()
    }
}

impl<S> Clone for Context<S> {
    fn clone(&self) -> Self {
        Self {
            event: self.event.clone(),
            current_user: self.current_user.clone(),
            stores: self.stores.clone(),
            tree: self.tree.clone(),
            state: self.state.clone(),
        }
    }
}

/// What a handler sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Reply to the triggering message.
    Text(String),
    /// Reply to a specific message.
    To { text: String, reply_to: MessageId },
}

impl Reply {
    pub fn text(&self) -> &str {
        match self {
            Reply::Text(text) | Reply::To { text, .. } => text,
        }
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<(String, MessageId)> for Reply {
    fn from((text, reply_to): (String, MessageId)) -> Self {
        Reply::To { text, reply_to }
    }
}

/// A command implementation.
///
/// Most handlers are plain async functions registered through
/// [`CommandTreeBuilder::route`](crate::tree::CommandTreeBuilder::route);
/// implement this directly to build the descriptor by hand.
#[async_trait]
pub trait Handler<S>: Send + Sync + 'static {
    /// The handler's declared parameters, read once at registration.
    fn parameters(&self) -> Vec<Parameter>;

    /// Run with arguments that have already been checked against
    /// [`Handler::parameters`] and had their defaults filled.
    async fn call(&self, ctx: Context<S>, bindings: Bindings) -> CommandResult<Reply>;
}

/// Adapts `async fn(Context<S>, A) -> CommandResult<R>` to [`Handler`].
pub struct FnHandler<F, A> {
    f: F,
    _args: PhantomData<fn() -> A>,
}

impl<F, A> FnHandler<F, A> {
    pub fn new(f: F) -> Self {
        Self {
            f,
            _args: PhantomData,
        }
    }
}

#[async_trait]
impl<S, F, Fut, A, R> Handler<S> for FnHandler<F, A>
where
    S: Send + Sync + 'static,
    F: Fn(Context<S>, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult<R>> + Send + 'static,
    A: CommandArgs,
    R: Into<Reply> + 'static,
{
    fn parameters(&self) -> Vec<Parameter> {
        A::parameters()
    }

    async fn call(&self, ctx: Context<S>, bindings: Bindings) -> CommandResult<Reply> {
        let args = A::from_bindings(&bindings)?;
        (self.f)(ctx, args).await.map(Into::into)
    }
}

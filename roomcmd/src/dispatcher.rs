//! The dispatch pipeline.
//!
//! ```text
//! raw text ─► tokenizer ─► tree walk ─┬─► trick lookup (unknown name)
//!                                     └─► permission gate ─► binder ─► handler ─► reply
//! ```
//!
//! Every failure along the way becomes a single reply to the triggering
//! message. Nothing is retried.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::binder::bind;
use crate::error::DispatchError;
use crate::event::{MessageEvent, MessageId, User};
use crate::handler::{Context, Reply};
use crate::parser::{DefaultTokenizer, Tokenizer};
use crate::permission::PermissionGate;
use crate::store::Stores;
use crate::token::Arguments;
use crate::transport::{Transport, TransportError};
use crate::tree::CommandTree;
use crate::walker::{walk, Walk};
use crate::State;

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Text a message must start with to be treated as a command.
    pub prefix: String,
    /// Members of this group bypass every permission rule.
    pub admin_group: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            prefix: "!!/".to_string(),
            admin_group: "admin".to_string(),
        }
    }
}

/// Runs commands from one room's event stream.
pub struct Dispatcher<S> {
    tree: Arc<CommandTree<S>>,
    state: State<S>,
    stores: Stores,
    gate: PermissionGate,
    transport: Arc<dyn Transport>,
    tokenizer: Arc<dyn Tokenizer>,
    config: DispatchConfig,
}

impl<S: Send + Sync + 'static> Dispatcher<S> {
    pub fn new(
        tree: CommandTree<S>,
        state: State<S>,
        stores: Stores,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let config = DispatchConfig::default();
        Self {
            tree: Arc::new(tree),
            gate: PermissionGate::new(stores.permissions.clone(), config.admin_group.clone()),
            state,
            stores,
            transport,
            tokenizer: Arc::new(DefaultTokenizer),
            config,
        }
    }

    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.gate = PermissionGate::new(self.stores.permissions.clone(), config.admin_group.clone());
        self.config = config;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Arc::new(tokenizer);
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn tree(&self) -> &CommandTree<S> {
        &self.tree
    }

    /// Consume events until the channel closes, one at a time.
    ///
    /// A message is handled only if its plain content starts with the
    /// prefix and has something after it. A failure to fetch or reply is
    /// logged and the loop moves on.
    pub async fn run(&self, mut events: mpsc::Receiver<MessageEvent>) {
        tracing::info!(prefix = %self.config.prefix, "Dispatcher started");
        while let Some(event) = events.recv().await {
            if !event.content.contains(&self.config.prefix) {
                continue;
            }
            let content = match self.transport.plain_content(&event).await {
                Ok(content) => content,
                Err(e) => {
                    tracing::error!(message_id = event.message_id, error = %e, "Failed to fetch message content");
                    continue;
                }
            };
            let Some(command) = content.strip_prefix(self.config.prefix.as_str()) else {
                continue;
            };
            if command.is_empty() {
                continue;
            }
            if let Err(e) = self.handle(&event, command).await {
                tracing::error!(message_id = event.message_id, error = %e, "Failed to send reply");
            }
        }
        tracing::info!("Event stream closed");
    }

    /// Handle one command (prefix already stripped) and send the reply.
    pub async fn handle(
        &self,
        event: &MessageEvent,
        command: &str,
    ) -> Result<MessageId, TransportError> {
        let span = tracing::info_span!(
            "dispatch",
            message_id = event.message_id,
            user_id = event.user_id
        );
        async {
            let outcome = match self.stores.users.upsert(event.user_id, &event.user_name).await {
                Ok(user) => self.dispatch(event, user, command).await,
                Err(e) => Err(DispatchError::from(e)),
            };
            match outcome {
                Ok(Reply::Text(text)) => self.transport.send(&text, Some(event.message_id)).await,
                Ok(Reply::To { text, reply_to }) => {
                    self.transport.send(&text, Some(reply_to)).await
                }
                Err(e) => {
                    match &e {
                        DispatchError::Internal(detail) => {
                            tracing::error!(%detail, "Command failed unexpectedly")
                        }
                        DispatchError::Handler(message) => {
                            tracing::info!(%message, "Command rejected its input")
                        }
                        other => tracing::debug!(error = %other, "Dispatch failed"),
                    }
                    self.transport
                        .send(&e.to_string(), Some(event.message_id))
                        .await
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Tokenize, resolve, check, bind and invoke. Sends nothing.
    pub async fn dispatch(
        &self,
        event: &MessageEvent,
        current_user: User,
        command: &str,
    ) -> Result<Reply, DispatchError> {
        let arguments = self.tokenizer.parse(command)?;
        tracing::debug!(?arguments, "Tokenized");
        self.invoke(event, current_user, arguments).await
    }

    async fn invoke(
        &self,
        event: &MessageEvent,
        current_user: User,
        arguments: Arguments,
    ) -> Result<Reply, DispatchError> {
        let prefix = &self.config.prefix;
        match walk(&*self.tree, &arguments.positional)? {
            Walk::Missing { group, path, name } => {
                if let Some(body) = self.stores.tricks.lookup(name).await? {
                    tracing::debug!(trick = name, "Answered with trick");
                    return Ok(Reply::Text(body));
                }
                if path.is_empty() {
                    Err(DispatchError::NoSuchCommand {
                        prefix: prefix.clone(),
                        name: name.to_string(),
                    })
                } else {
                    Err(DispatchError::NoSuchSubcommand {
                        prefix: prefix.clone(),
                        group: path.join(" "),
                        name: name.to_string(),
                        subcommands: group.names(),
                    })
                }
            }
            Walk::Incomplete { group, path } => Err(DispatchError::IncompleteGroup {
                prefix: prefix.clone(),
                group: path.join(" "),
                subcommands: group.names(),
            }),
            Walk::Leaf { leaf, rest } => {
                tracing::debug!(command = leaf.name(), "Resolved");
                self.gate.check(leaf.name(), &current_user.groups).await?;

                let mut bindings = bind(leaf.parameters(), rest, &arguments.keyword)?;
                bindings.fill_defaults(leaf.parameters());

                let ctx = Context {
                    event: event.clone(),
                    current_user,
                    stores: self.stores.clone(),
                    tree: self.tree.clone(),
                    state: self.state.clone(),
                };
                // A panicking handler fails its own message, not the loop.
                let call = AssertUnwindSafe(leaf.handler().call(ctx, bindings));
                let reply = match call.catch_unwind().await {
                    Ok(result) => result?,
                    Err(payload) => {
                        return Err(DispatchError::Internal(format!(
                            "handler for `{}` panicked: {}",
                            leaf.name(),
                            panic_message(payload.as_ref())
                        )))
                    }
                };
                tracing::debug!(command = leaf.name(), "Invoked");
                Ok(reply)
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

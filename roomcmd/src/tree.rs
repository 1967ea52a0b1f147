//! The command tree.
//!
//! Built once at startup from registered routes and read-only afterwards.
//! A route path such as `"trick add"` is split on whitespace; every segment
//! but the last names a group, the last names the leaf.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;

use thiserror::Error;

use crate::descriptor::{CommandArgs, Parameter, Presence};
use crate::error::CommandResult;
use crate::handler::{Context, FnHandler, Handler, Reply, RESERVED_PARAMETERS};
use crate::parser::is_identifier;

/// Errors detected while building a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Route path is empty")]
    EmptyPath,

    #[error("Route `{path}` has segment `{segment}` which is not a valid command name")]
    InvalidSegment { path: String, segment: String },

    #[error("Route `{0}` is registered twice")]
    Duplicate(String),

    #[error("Route `{path}` conflicts with `{existing}`: a node is either a group or a command")]
    Conflict { path: String, existing: String },

    #[error("Command `{command}` declares parameter `{parameter}` more than once")]
    DuplicateParameter { command: String, parameter: String },

    #[error("Command `{command}` declares reserved parameter `{parameter}`")]
    ReservedParameter { command: String, parameter: String },

    #[error("Command `{command}` has an invalid default for parameter `{parameter}`")]
    InvalidDefault { command: String, parameter: String },
}

/// A tree node: a group of further names or a command.
pub enum Node<S> {
    Group(Group<S>),
    Leaf(Leaf<S>),
}

/// Interior node mapping names to children.
pub struct Group<S> {
    children: BTreeMap<String, Node<S>>,
}

impl<S> Group<S> {
    fn new() -> Self {
        Self {
            children: BTreeMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Node<S>> {
        self.children.get(name)
    }

    /// Direct child names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.children.keys().cloned().collect()
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Node<S>)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A command: its canonical name, descriptor and handler.
pub struct Leaf<S> {
    name: String,
    parameters: Vec<Parameter>,
    handler: Box<dyn Handler<S>>,
}

impl<S> Leaf<S> {
    /// Canonical name, e.g. `"trick add"`. This is the permission key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn handler(&self) -> &dyn Handler<S> {
        self.handler.as_ref()
    }

    /// One-line usage, e.g. `trick add <name: STRING> <body: STRING>`.
    pub fn usage(&self) -> String {
        let mut usage = self.name.clone();
        for parameter in &self.parameters {
            usage.push(' ');
            usage.push_str(&parameter.to_string());
        }
        usage
    }
}

impl<S> fmt::Debug for Leaf<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// The root of all commands.
pub struct CommandTree<S> {
    root: Group<S>,
}

impl<S: Send + Sync + 'static> CommandTree<S> {
    pub fn builder() -> CommandTreeBuilder<S> {
        CommandTreeBuilder::new()
    }
}

impl<S> CommandTree<S> {
    pub fn root(&self) -> &Group<S> {
        &self.root
    }

    /// Follow `path` from the root.
    pub fn find<'p>(&self, path: impl IntoIterator<Item = &'p str>) -> Option<&Node<S>> {
        let mut path = path.into_iter();
        let first = path.next()?;
        let mut node = self.root.get(first)?;
        for segment in path {
            match node {
                Node::Group(group) => node = group.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// Every leaf, depth first in name order.
    pub fn leaves(&self) -> Vec<&Leaf<S>> {
        fn collect<'t, S>(group: &'t Group<S>, out: &mut Vec<&'t Leaf<S>>) {
            for node in group.children.values() {
                match node {
                    Node::Group(group) => collect(group, out),
                    Node::Leaf(leaf) => out.push(leaf),
                }
            }
        }
        let mut out = Vec::new();
        collect(&self.root, &mut out);
        out
    }
}

/// Collects routes, then validates them into a [`CommandTree`].
pub struct CommandTreeBuilder<S> {
    routes: Vec<(String, Box<dyn Handler<S>>)>,
}

impl<S: Send + Sync + 'static> CommandTreeBuilder<S> {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Register an async function taking a derived argument struct.
    ///
    /// ```ignore
    /// async fn echo(ctx: Context<AppState>, args: EchoArgs) -> CommandResult<String> { .. }
    ///
    /// let tree = CommandTree::builder().route("echo", echo).build()?;
    /// ```
    pub fn route<F, Fut, A, R>(self, path: &str, f: F) -> Self
    where
        F: Fn(Context<S>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CommandResult<R>> + Send + 'static,
        A: CommandArgs,
        R: Into<Reply> + 'static,
    {
        self.route_handler(path, FnHandler::new(f))
    }

    /// Register a hand-written [`Handler`].
    pub fn route_handler(mut self, path: &str, handler: impl Handler<S>) -> Self {
        self.routes.push((path.to_string(), Box::new(handler)));
        self
    }

    pub fn build(self) -> Result<CommandTree<S>, RegistrationError> {
        let mut root = Group::new();
        for (path, handler) in self.routes {
            let segments: Vec<&str> = path.split_whitespace().collect();
            let Some((last, groups)) = segments.split_last() else {
                return Err(RegistrationError::EmptyPath);
            };
            if let Some(segment) = segments.iter().find(|s| !is_identifier(s)) {
                return Err(RegistrationError::InvalidSegment {
                    path: path.clone(),
                    segment: segment.to_string(),
                });
            }
            let name = segments.join(" ");
            let parameters = handler.parameters();
            validate_parameters(&name, &parameters)?;

            let mut group = &mut root;
            for (depth, segment) in groups.iter().enumerate() {
                let child = group
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(|| Node::Group(Group::new()));
                group = match child {
                    Node::Group(group) => group,
                    Node::Leaf(_) => {
                        return Err(RegistrationError::Conflict {
                            path: name,
                            existing: segments[..=depth].join(" "),
                        })
                    }
                };
            }

            match group.children.entry(last.to_string()) {
                Entry::Vacant(slot) => {
                    tracing::debug!(command = %name, "Command registered");
                    slot.insert(Node::Leaf(Leaf {
                        name,
                        parameters,
                        handler,
                    }));
                }
                Entry::Occupied(slot) => {
                    return Err(match slot.get() {
                        Node::Leaf(_) => RegistrationError::Duplicate(name),
                        Node::Group(_) => RegistrationError::Conflict {
                            existing: name.clone(),
                            path: name,
                        },
                    });
                }
            }
        }
        Ok(CommandTree { root })
    }
}

impl<S: Send + Sync + 'static> Default for CommandTreeBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_parameters(command: &str, parameters: &[Parameter]) -> Result<(), RegistrationError> {
    let mut seen = HashSet::new();
    for parameter in parameters {
        if RESERVED_PARAMETERS.contains(&parameter.name) {
            return Err(RegistrationError::ReservedParameter {
                command: command.to_string(),
                parameter: parameter.name.to_string(),
            });
        }
        if !seen.insert(parameter.name) {
            return Err(RegistrationError::DuplicateParameter {
                command: command.to_string(),
                parameter: parameter.name.to_string(),
            });
        }
        if let Presence::Default(token) = &parameter.presence {
            if !parameter.kind.accepts(token) {
                return Err(RegistrationError::InvalidDefault {
                    command: command.to_string(),
                    parameter: parameter.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

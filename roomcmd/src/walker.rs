//! Resolves the leading run of flag tokens against a [`CommandTree`].

use crate::error::DispatchError;
use crate::token::Token;
use crate::tree::{CommandTree, Group, Leaf, Node};

/// Where a walk ended.
pub enum Walk<'t, 'a, S> {
    /// Reached a command. `rest` is everything after the command path,
    /// whatever its kinds; binding decides whether it is acceptable.
    Leaf {
        leaf: &'t Leaf<S>,
        rest: &'a [Token],
    },

    /// `name` is not a child of `group`. An empty `path` means `group` is
    /// the root.
    Missing {
        group: &'t Group<S>,
        path: Vec<&'a str>,
        name: &'a str,
    },

    /// The flag run ended while still on a group.
    Incomplete {
        group: &'t Group<S>,
        path: Vec<&'a str>,
    },
}

/// Walk `tokens` down `tree`.
///
/// Any flag that names a child is navigation, even if a parameter further
/// down would have accepted it as a value. Fails with
/// [`DispatchError::NoCommand`] unless the first token is a flag.
pub fn walk<'t, 'a, S>(
    tree: &'t CommandTree<S>,
    tokens: &'a [Token],
) -> Result<Walk<'t, 'a, S>, DispatchError> {
    if !matches!(tokens.first(), Some(Token::Flag(_))) {
        return Err(DispatchError::NoCommand);
    }

    let mut group = tree.root();
    let mut path = Vec::new();
    for (index, token) in tokens.iter().enumerate() {
        let Some(name) = token.as_flag() else {
            break;
        };
        match group.get(name) {
            None => return Ok(Walk::Missing { group, path, name }),
            Some(Node::Leaf(leaf)) => {
                return Ok(Walk::Leaf {
                    leaf,
                    rest: &tokens[index + 1..],
                })
            }
            Some(Node::Group(child)) => {
                path.push(name);
                group = child;
            }
        }
    }
    Ok(Walk::Incomplete { group, path })
}

//! Built-in commands.
//!
//! | Command | Arguments |
//! |---------|-----------|
//! | `ping` | |
//! | `echo` | `<text: STRING> [style: plain/bold/italic/code = plain]` |
//! | `help` | `[command: STRING]` |
//! | `whoami` | |
//! | `trick add` | `<name: STRING> <body: STRING>` |
//! | `trick remove` | `<name: STRING>` |
//! | `trick list` | |
//! | `group add` / `group remove` | `<group: WORD> <user: NUMBER>` |
//! | `group list` | `[group: WORD]` |
//! | `permission allow` / `permission revoke` | `<command: STRING> <group: WORD>` |
//! | `permission show` | `<command: STRING>` |

use chrono::{DateTime, Utc};
use roomcmd::parser::is_identifier;
use roomcmd::{
    CommandArgs, CommandError, CommandResult, CommandTree, Context, FlagEnum, Leaf, Node,
    PermissionStore, RegistrationError, StoreError, Word,
};

/// Shared state for the built-ins.
#[derive(Debug, Clone)]
pub struct BotState {
    pub prefix: String,
    pub started_at: DateTime<Utc>,
}

impl BotState {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            started_at: Utc::now(),
        }
    }
}

type Ctx = Context<BotState>;

/// Commands that only the admin group may run until someone says otherwise.
pub const ADMIN_COMMANDS: &[&str] = &[
    "group add",
    "group remove",
    "permission allow",
    "permission revoke",
    "trick add",
    "trick remove",
];

/// Every built-in command.
pub fn command_tree() -> Result<CommandTree<BotState>, RegistrationError> {
    CommandTree::builder()
        .route("ping", ping)
        .route("echo", echo)
        .route("help", help)
        .route("whoami", whoami)
        .route("trick add", trick_add)
        .route("trick remove", trick_remove)
        .route("trick list", trick_list)
        .route("group add", group_add)
        .route("group remove", group_remove)
        .route("group list", group_list)
        .route("permission allow", permission_allow)
        .route("permission revoke", permission_revoke)
        .route("permission show", permission_show)
        .build()
}

/// Restrict [`ADMIN_COMMANDS`] to `admin_group` where no rule exists yet.
pub async fn seed_permissions(
    permissions: &dyn PermissionStore,
    admin_group: &str,
) -> Result<(), StoreError> {
    for command in ADMIN_COMMANDS {
        if permissions.lookup(command).await?.is_empty() {
            permissions.allow(command, admin_group).await?;
            tracing::info!(command, group = admin_group, "Restricted command");
        }
    }
    Ok(())
}

fn emphasize<'a>(groups: impl IntoIterator<Item = &'a String>) -> String {
    groups
        .into_iter()
        .map(|g| format!("_{}_", g))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Resolve a command name typed as a string argument to its leaf.
fn find_leaf<'t>(ctx: &'t Ctx, command: &str) -> CommandResult<&'t Leaf<BotState>> {
    match ctx.tree.find(command.split_whitespace()) {
        Some(Node::Leaf(leaf)) => Ok(leaf),
        _ => Err(CommandError::user(format!(
            "There is no command named {}{}.",
            ctx.state().prefix,
            command.trim()
        ))),
    }
}

// ============================================================================
// General
// ============================================================================

async fn ping(ctx: Ctx, _args: ()) -> CommandResult<String> {
    let uptime = Utc::now().signed_duration_since(ctx.state().started_at);
    let seconds = uptime.num_seconds().max(0);
    Ok(format!(
        "Pong! Up for {}h {}m {}s.",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FlagEnum)]
pub enum Style {
    Plain,
    Bold,
    Italic,
    Code,
}

#[derive(CommandArgs)]
pub struct EchoArgs {
    text: String,
    #[arg(default = "plain")]
    style: Style,
}

async fn echo(_ctx: Ctx, args: EchoArgs) -> CommandResult<String> {
    Ok(match args.style {
        Style::Plain => args.text,
        Style::Bold => format!("**{}**", args.text),
        Style::Italic => format!("*{}*", args.text),
        Style::Code => format!("`{}`", args.text),
    })
}

#[derive(CommandArgs)]
pub struct HelpArgs {
    command: Option<String>,
}

async fn help(ctx: Ctx, args: HelpArgs) -> CommandResult<String> {
    let prefix = &ctx.state().prefix;
    let Some(command) = args.command else {
        return Ok(format!(
            "Commands: {}. Use {}help \"command\" for details.",
            ctx.tree.root().names().join(", "),
            prefix
        ));
    };
    match ctx.tree.find(command.split_whitespace()) {
        Some(Node::Leaf(leaf)) => Ok(format!("Usage: {}{}", prefix, leaf.usage())),
        Some(Node::Group(group)) => Ok(format!(
            "Subcommands of {}{} are: {}",
            prefix,
            command.split_whitespace().collect::<Vec<_>>().join(" "),
            group.names().join(", ")
        )),
        None => Err(CommandError::user(format!(
            "There is no command named {}{}.",
            prefix,
            command.trim()
        ))),
    }
}

async fn whoami(ctx: Ctx, _args: ()) -> CommandResult<String> {
    let user = &ctx.current_user;
    let groups = if user.groups.is_empty() {
        "no groups".to_string()
    } else {
        emphasize(&user.groups)
    };
    Ok(format!("You are {} (id {}), member of {}.", user.name, user.id, groups))
}

// ============================================================================
// Tricks
// ============================================================================

#[derive(CommandArgs)]
pub struct TrickAddArgs {
    name: String,
    body: String,
}

async fn trick_add(ctx: Ctx, args: TrickAddArgs) -> CommandResult<String> {
    if !is_identifier(&args.name) {
        return Err(CommandError::user(format!(
            "`{}` is not a valid trick name; use letters, digits, `_` and `-`.",
            args.name
        )));
    }
    if ctx.tree.root().get(&args.name).is_some() {
        return Err(CommandError::user(format!(
            "{}{} is already a command.",
            ctx.state().prefix,
            args.name
        )));
    }
    let previous = ctx.stores.tricks.set(&args.name, &args.body).await?;
    Ok(match previous {
        Some(_) => format!("Trick `{}` updated.", args.name),
        None => format!("Trick `{}` added.", args.name),
    })
}

#[derive(CommandArgs)]
pub struct TrickRemoveArgs {
    name: String,
}

async fn trick_remove(ctx: Ctx, args: TrickRemoveArgs) -> CommandResult<String> {
    if ctx.stores.tricks.remove(&args.name).await? {
        Ok(format!("Trick `{}` removed.", args.name))
    } else {
        Err(CommandError::user(format!(
            "There is no trick named `{}`.",
            args.name
        )))
    }
}

async fn trick_list(ctx: Ctx, _args: ()) -> CommandResult<String> {
    let names = ctx.stores.tricks.list().await?;
    if names.is_empty() {
        return Ok("No tricks defined.".to_string());
    }
    Ok(format!("Tricks: {}", names.join(", ")))
}

// ============================================================================
// Groups
// ============================================================================

#[derive(CommandArgs)]
pub struct MembershipArgs {
    group: Word,
    user: u64,
}

fn unknown_user(e: StoreError) -> CommandError {
    match e {
        StoreError::UnknownUser(id) => {
            CommandError::user(format!("User {} has never run a command here.", id))
        }
        other => other.into(),
    }
}

async fn group_add(ctx: Ctx, args: MembershipArgs) -> CommandResult<String> {
    let group = args.group.as_str();
    let added = ctx
        .stores
        .users
        .add_to_group(args.user, group)
        .await
        .map_err(unknown_user)?;
    let name = display_name(&ctx, args.user).await?;
    Ok(if added {
        format!("Added {} to _{}_.", name, group)
    } else {
        format!("{} is already in _{}_.", name, group)
    })
}

async fn group_remove(ctx: Ctx, args: MembershipArgs) -> CommandResult<String> {
    let group = args.group.as_str();
    let removed = ctx
        .stores
        .users
        .remove_from_group(args.user, group)
        .await
        .map_err(unknown_user)?;
    let name = display_name(&ctx, args.user).await?;
    Ok(if removed {
        format!("Removed {} from _{}_.", name, group)
    } else {
        format!("{} is not in _{}_.", name, group)
    })
}

async fn display_name(ctx: &Ctx, id: u64) -> CommandResult<String> {
    Ok(ctx
        .stores
        .users
        .get(id)
        .await?
        .map(|user| user.name)
        .unwrap_or_else(|| id.to_string()))
}

#[derive(CommandArgs)]
pub struct GroupListArgs {
    group: Option<Word>,
}

/// Members of a group, or the invoking user's groups.
async fn group_list(ctx: Ctx, args: GroupListArgs) -> CommandResult<String> {
    let Some(group) = args.group else {
        return Ok(if ctx.current_user.groups.is_empty() {
            "You are not in any group.".to_string()
        } else {
            format!("Your groups: {}", emphasize(&ctx.current_user.groups))
        });
    };
    let members = ctx.stores.users.members(group.as_str()).await?;
    if members.is_empty() {
        return Ok(format!("_{}_ has no members.", group));
    }
    let names: Vec<String> = members
        .iter()
        .map(|user| format!("{} ({})", user.name, user.id))
        .collect();
    Ok(format!("Members of _{}_: {}", group, names.join(", ")))
}

// ============================================================================
// Permissions
// ============================================================================

#[derive(CommandArgs)]
pub struct PermissionArgs {
    command: String,
    group: Word,
}

async fn permission_allow(ctx: Ctx, args: PermissionArgs) -> CommandResult<String> {
    let leaf = find_leaf(&ctx, &args.command)?;
    let prefix = &ctx.state().prefix;
    let added = ctx
        .stores
        .permissions
        .allow(leaf.name(), args.group.as_str())
        .await?;
    Ok(if added {
        format!("Members of _{}_ may now run {}{}.", args.group, prefix, leaf.name())
    } else {
        format!("Members of _{}_ could already run {}{}.", args.group, prefix, leaf.name())
    })
}

async fn permission_revoke(ctx: Ctx, args: PermissionArgs) -> CommandResult<String> {
    let leaf = find_leaf(&ctx, &args.command)?;
    let prefix = &ctx.state().prefix;
    let removed = ctx
        .stores
        .permissions
        .revoke(leaf.name(), args.group.as_str())
        .await?;
    if !removed {
        return Err(CommandError::user(format!(
            "_{}_ was not allowed to run {}{}.",
            args.group,
            prefix,
            leaf.name()
        )));
    }
    let remaining = ctx.stores.permissions.lookup(leaf.name()).await?;
    Ok(if remaining.is_empty() {
        format!("Anyone may now run {}{}.", prefix, leaf.name())
    } else {
        format!(
            "Members of _{}_ may no longer run {}{}.",
            args.group,
            prefix,
            leaf.name()
        )
    })
}

#[derive(CommandArgs)]
pub struct PermissionShowArgs {
    command: String,
}

async fn permission_show(ctx: Ctx, args: PermissionShowArgs) -> CommandResult<String> {
    let leaf = find_leaf(&ctx, &args.command)?;
    let prefix = &ctx.state().prefix;
    let allowed = ctx.stores.permissions.lookup(leaf.name()).await?;
    Ok(if allowed.is_empty() {
        format!("Anyone may run {}{}.", prefix, leaf.name())
    } else {
        format!(
            "Only members of groups {} may run {}{}.",
            emphasize(&allowed),
            prefix,
            leaf.name()
        )
    })
}

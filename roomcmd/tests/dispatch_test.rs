//! End-to-end dispatch tests against in-memory stores and a recording transport.

use std::sync::Arc;

use async_trait::async_trait;
use roomcmd::{
    ArgKind, CommandArgs, CommandError, CommandResult, CommandTree, Context, DispatchConfig,
    DispatchError, Dispatcher, FlagEnum, MemoryStore, MessageEvent, PermissionStore,
    RecordingTransport, Reply, State, StoreError, Stores, TokenKind, TrickStore, User, UserId,
    UserStore,
};
use tokio::sync::mpsc;

#[derive(Debug, PartialEq, FlagEnum)]
enum Style {
    Plain,
    Bold,
    #[flag(rename = "mono")]
    Code,
}

#[derive(CommandArgs)]
struct EchoArgs {
    text: String,
    #[arg(default = "plain")]
    style: Style,
}

#[derive(CommandArgs)]
struct SubArgs {
    n: f64,
}

#[derive(CommandArgs)]
struct DivideArgs {
    a: i64,
    b: i64,
    note: Option<String>,
}

async fn help(_ctx: Context<()>, _args: ()) -> CommandResult<&'static str> {
    Ok("help text")
}

async fn echo(_ctx: Context<()>, args: EchoArgs) -> CommandResult<String> {
    Ok(match args.style {
        Style::Plain => args.text,
        Style::Bold => format!("**{}**", args.text),
        Style::Code => format!("`{}`", args.text),
    })
}

async fn sub(_ctx: Context<()>, args: SubArgs) -> CommandResult<String> {
    Ok(format!("n = {}", args.n))
}

async fn divide(_ctx: Context<()>, args: DivideArgs) -> CommandResult<String> {
    if args.b == 0 {
        return Err(CommandError::user("Cannot divide by zero."));
    }
    Ok(format!(
        "{}{}",
        args.a / args.b,
        args.note.map(|n| format!(" ({})", n)).unwrap_or_default()
    ))
}

async fn whoami(ctx: Context<()>, _args: ()) -> CommandResult<(String, u64)> {
    Ok((ctx.current_user.name.clone(), 42))
}

async fn broken(_ctx: Context<()>, _args: ()) -> CommandResult<String> {
    Err(CommandError::internal("database exploded"))
}

async fn boom(_ctx: Context<()>, _args: ()) -> CommandResult<String> {
    let empty: Vec<String> = Vec::new();
    Ok(empty[0].clone())
}

/// Fails every call, as a store whose backing file has gone away would.
struct UnavailableStore;

fn unavailable() -> StoreError {
    StoreError::Corrupt("store unavailable".into())
}

#[async_trait]
impl UserStore for UnavailableStore {
    async fn upsert(&self, _id: UserId, _name: &str) -> Result<User, StoreError> {
        Err(unavailable())
    }

    async fn get(&self, _id: UserId) -> Result<Option<User>, StoreError> {
        Err(unavailable())
    }

    async fn add_to_group(&self, _id: UserId, _group: &str) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn remove_from_group(&self, _id: UserId, _group: &str) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn members(&self, _group: &str) -> Result<Vec<User>, StoreError> {
        Err(unavailable())
    }
}

#[async_trait]
impl TrickStore for UnavailableStore {
    async fn lookup(&self, _name: &str) -> Result<Option<String>, StoreError> {
        Err(unavailable())
    }

    async fn set(&self, _name: &str, _body: &str) -> Result<Option<String>, StoreError> {
        Err(unavailable())
    }

    async fn remove(&self, _name: &str) -> Result<bool, StoreError> {
        Err(unavailable())
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        Err(unavailable())
    }
}

struct Harness {
    dispatcher: Dispatcher<()>,
    store: Arc<MemoryStore>,
    transport: Arc<RecordingTransport>,
}

fn tree() -> CommandTree<()> {
    CommandTree::builder()
        .route("help", help)
        .route("echo", echo)
        .build()
        .unwrap()
}

fn harness() -> Harness {
    let tree = CommandTree::builder()
        .route("help", help)
        .route("echo", echo)
        .route("group sub", sub)
        .route("math divide", divide)
        .route("whoami", whoami)
        .route("broken", broken)
        .route("boom", boom)
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(
        tree,
        State::new(()),
        Stores::shared(store.clone()),
        transport.clone(),
    );
    Harness {
        dispatcher,
        store,
        transport,
    }
}

fn event(content: &str) -> MessageEvent {
    MessageEvent {
        message_id: 7,
        user_id: 1,
        user_name: "alice".to_string(),
        content: content.to_string(),
    }
}

impl Harness {
    async fn run(&self, command: &str) -> Result<Reply, DispatchError> {
        let user = self.store.upsert(1, "alice").await.unwrap();
        self.dispatcher
            .dispatch(&event(command), user, command)
            .await
    }
}

#[tokio::test]
async fn test_leaf_without_parameters() {
    let h = harness();
    assert_eq!(h.run("help").await, Ok(Reply::Text("help text".into())));
}

#[tokio::test]
async fn test_string_parameter_and_enum_default() {
    let h = harness();
    assert_eq!(h.run(r#"echo "hi""#).await, Ok(Reply::Text("hi".into())));
    assert_eq!(
        h.run(r#"echo "hi" bold"#).await,
        Ok(Reply::Text("**hi**".into()))
    );
    assert_eq!(
        h.run(r#"echo "hi" style=mono"#).await,
        Ok(Reply::Text("`hi`".into()))
    );
}

#[tokio::test]
async fn test_invalid_enum_literal_lists_all() {
    let h = harness();
    let err = h.run(r#"echo "hi" Bold"#).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value supplied for argument `style`; expected one of plain/bold/mono."
    );
}

#[tokio::test]
async fn test_missing_argument_in_nested_group() {
    let h = harness();
    let err = h.run("group sub").await.unwrap_err();
    assert_eq!(
        err,
        DispatchError::MissingArgument {
            name: "n".into(),
            kind: roomcmd::ArgKind::Number,
        }
    );
    assert_eq!(h.run("group sub 2.5").await, Ok(Reply::Text("n = 2.5".into())));
}

#[tokio::test]
async fn test_no_such_subcommand_lists_siblings() {
    let h = harness();
    let err = h.run("group nope").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "The group !!/group has no subcommand named \"nope\". Its subcommands are: sub"
    );
}

#[tokio::test]
async fn test_no_such_command_and_incomplete_group() {
    let h = harness();
    assert_eq!(
        h.run("nope").await.unwrap_err().to_string(),
        "There is no command named !!/nope."
    );
    assert_eq!(
        h.run("math").await.unwrap_err().to_string(),
        "Subcommands of !!/math are: divide"
    );
}

#[tokio::test]
async fn test_tricks_answer_unknown_names_at_any_depth() {
    let h = harness();
    h.store.set("nope", "a canned reply").await.unwrap();
    assert_eq!(
        h.run("nope").await,
        Ok(Reply::Text("a canned reply".into()))
    );
    assert_eq!(
        h.run("group nope 1 2 3").await,
        Ok(Reply::Text("a canned reply".into()))
    );
    // Incomplete groups never consult tricks.
    h.store.set("group", "shadowed").await.unwrap();
    assert!(matches!(
        h.run("group").await,
        Err(DispatchError::IncompleteGroup { .. })
    ));
}

#[tokio::test]
async fn test_not_starting_with_flag() {
    let h = harness();
    for command in [r#""help""#, "42", "`help`"] {
        assert_eq!(h.run(command).await, Err(DispatchError::NoCommand));
    }
}

#[tokio::test]
async fn test_parse_error() {
    let h = harness();
    let err = h.run(r#"echo "unterminated"#).await.unwrap_err();
    assert!(matches!(err, DispatchError::Parse(_)));
    assert!(err.to_string().starts_with("Parse error: "));
}

#[tokio::test]
async fn test_handler_errors() {
    let h = harness();
    assert_eq!(
        h.run("math divide 1 0").await,
        Err(DispatchError::Handler("Cannot divide by zero.".into()))
    );
    assert_eq!(
        h.run(r#"math divide 7 2 "rounded""#).await,
        Ok(Reply::Text("3 (rounded)".into()))
    );
    // Fractional value for an integer parameter
    assert_eq!(
        h.run("math divide 1.5 1").await,
        Err(DispatchError::Handler(
            "Invalid value supplied for argument `a`.".into()
        ))
    );
    let err = h.run("broken").await.unwrap_err();
    assert!(err.is_internal());
}

#[tokio::test]
async fn test_argument_count_properties() {
    let h = harness();
    // k = 2 required, m = 1 optional
    assert!(h.run("math divide 4 2").await.is_ok());
    assert_eq!(
        h.run("math divide 4").await,
        Err(DispatchError::MissingArgument {
            name: "b".into(),
            kind: roomcmd::ArgKind::Number,
        })
    );
    assert_eq!(
        h.run(r#"math divide 4 2 "x" extra"#).await,
        Err(DispatchError::SuperfluousArguments {
            first: "extra".into()
        })
    );
}

#[tokio::test]
async fn test_keyword_restrictions() {
    let h = harness();
    assert_eq!(
        h.run("math divide 4 2 a=1").await,
        Err(DispatchError::DuplicateArgument { name: "a".into() })
    );
    assert_eq!(
        h.run(r#"help current_user="bob""#).await,
        Err(DispatchError::IllegalArgument {
            name: "current_user".into()
        })
    );
    assert_eq!(
        h.run("help event=1").await,
        Err(DispatchError::IllegalArgument {
            name: "event".into()
        })
    );
}

#[tokio::test]
async fn test_explicit_reply_target() {
    let h = harness();
    assert_eq!(
        h.run("whoami").await,
        Ok(Reply::To {
            text: "alice".into(),
            reply_to: 42
        })
    );
}

#[tokio::test]
async fn test_permissions_and_admin_bypass() {
    let h = harness();
    h.store.allow("math divide", "mods").await.unwrap();
    assert_eq!(
        h.run("math divide 4 2").await.unwrap_err().to_string(),
        "Only members of groups _mods_ may run that command."
    );
    // Permission is checked before binding.
    assert!(matches!(
        h.run("math divide").await,
        Err(DispatchError::PermissionDenied { .. })
    ));

    h.store.add_to_group(1, "admin").await.unwrap();
    assert!(h.run("math divide 4 2").await.is_ok());

    h.store.remove_from_group(1, "admin").await.unwrap();
    h.store.add_to_group(1, "mods").await.unwrap();
    assert!(h.run("math divide 4 2").await.is_ok());
}

#[tokio::test]
async fn test_handle_replies_to_triggering_message() {
    let h = harness();
    h.dispatcher.handle(&event("!!/help"), "help").await.unwrap();
    h.dispatcher.handle(&event("!!/nope"), "nope").await.unwrap();
    h.dispatcher.handle(&event("!!/whoami"), "whoami").await.unwrap();
    h.dispatcher.handle(&event("!!/broken"), "broken").await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[0].text, "help text");
    assert_eq!(sent[0].reply_to, Some(7));
    assert_eq!(sent[1].text, "There is no command named !!/nope.");
    assert_eq!(sent[2].reply_to, Some(42));
    assert_eq!(
        sent[3].text,
        "An internal error occurred while running that command."
    );
}

#[tokio::test]
async fn test_handle_upserts_user() {
    let h = harness();
    h.dispatcher.handle(&event("!!/help"), "help").await.unwrap();
    let user = h.store.get(1).await.unwrap().unwrap();
    assert_eq!(user, User::new(1, "alice"));
}

#[tokio::test]
async fn test_run_filters_by_prefix() {
    let h = harness();
    let (tx, rx) = mpsc::channel(8);
    for content in ["hello", "say !!/help", "!!/", "!!/help", "!!/echo \"x\""] {
        tx.send(event(content)).await.unwrap();
    }
    drop(tx);
    h.dispatcher.run(rx).await;

    let texts: Vec<String> = h.transport.sent().into_iter().map(|m| m.text).collect();
    assert_eq!(texts, vec!["help text".to_string(), "x".to_string()]);
}

#[tokio::test]
async fn test_custom_prefix_and_admin_group() {
    let tree = CommandTree::builder().route("help", help).build().unwrap();
    let store = Arc::new(MemoryStore::new());
    store.allow("help", "mods").await.unwrap();
    store.insert_user(User::new(1, "alice").with_group("root")).await;
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(
        tree,
        State::new(()),
        Stores::shared(store.clone()),
        transport.clone(),
    )
    .with_config(DispatchConfig {
        prefix: "?".into(),
        admin_group: "root".into(),
    });

    let (tx, rx) = mpsc::channel(4);
    tx.send(event("?help")).await.unwrap();
    tx.send(event("?nope")).await.unwrap();
    drop(tx);
    dispatcher.run(rx).await;

    let texts: Vec<String> = transport.sent().into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec![
            "help text".to_string(),
            "There is no command named ?nope.".to_string()
        ]
    );
}

#[tokio::test]
async fn test_keyword_type_errors() {
    let h = harness();
    assert_eq!(
        h.run(r#"math divide 4 b="x""#).await,
        Err(DispatchError::TypeMismatch {
            name: "b".into(),
            expected: ArgKind::Number,
            actual: TokenKind::Str,
        })
    );
    assert_eq!(
        h.run(r#"echo "hi" style=loud"#).await,
        Err(DispatchError::InvalidEnumLiteral {
            name: "style".into(),
            literals: vec!["plain", "bold", "mono"],
        })
    );
    assert!(matches!(
        h.run(r#"echo "hi" style=`mono`"#).await,
        Err(DispatchError::TypeMismatch {
            expected: ArgKind::Flag(_),
            actual: TokenKind::Word,
            ..
        })
    ));
}

#[tokio::test]
async fn test_panicking_handler_does_not_stop_run() {
    let h = harness();
    let (tx, rx) = mpsc::channel(4);
    tx.send(event("!!/boom")).await.unwrap();
    tx.send(event("!!/help")).await.unwrap();
    drop(tx);
    h.dispatcher.run(rx).await;

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0].text,
        "An internal error occurred while running that command."
    );
    assert_eq!(sent[0].reply_to, Some(7));
    assert_eq!(sent[1].text, "help text");

    let err = h.run("boom").await.unwrap_err();
    assert!(err.is_internal());
}

#[tokio::test]
async fn test_trick_store_failure_is_internal() {
    let users = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(
        tree(),
        State::new(()),
        Stores::new(users.clone(), users.clone(), Arc::new(UnavailableStore)),
        transport.clone(),
    );

    let user = users.upsert(1, "alice").await.unwrap();
    let err = dispatcher
        .dispatch(&event("!!/nope"), user, "nope")
        .await
        .unwrap_err();
    assert!(err.is_internal());

    // Known commands never consult tricks.
    dispatcher.handle(&event("!!/help"), "help").await.unwrap();
    dispatcher.handle(&event("!!/nope"), "nope").await.unwrap();
    let texts: Vec<String> = transport.sent().into_iter().map(|m| m.text).collect();
    assert_eq!(
        texts,
        vec![
            "help text".to_string(),
            "An internal error occurred while running that command.".to_string()
        ]
    );
}

#[tokio::test]
async fn test_user_store_failure_is_replied() {
    let tricks = Arc::new(MemoryStore::new());
    let transport = Arc::new(RecordingTransport::default());
    let dispatcher = Dispatcher::new(
        tree(),
        State::new(()),
        Stores::new(Arc::new(UnavailableStore), tricks.clone(), tricks.clone()),
        transport.clone(),
    );

    dispatcher.handle(&event("!!/help"), "help").await.unwrap();
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].text,
        "An internal error occurred while running that command."
    );
    assert_eq!(sent[0].reply_to, Some(7));
}

#[test]
fn test_derived_descriptors() {
    use roomcmd::{ArgKind, Parameter, Token};

    assert_eq!(
        EchoArgs::parameters(),
        vec![
            Parameter::required("text", ArgKind::Str),
            Parameter::with_default(
                "style",
                ArgKind::Flag(&["plain", "bold", "mono"]),
                Token::Flag("plain".into())
            ),
        ]
    );
    assert_eq!(
        DivideArgs::parameters()[2],
        Parameter::optional("note", ArgKind::Str)
    );
    assert_eq!(Style::from_literal("mono"), Some(Style::Code));
    assert_eq!(Style::Bold.literal(), "bold");
}

use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use roomcmd::{init_subscriber_with_config, Dispatcher, State, Stores, UserStore};
use roomcmd_bot::{command_tree, seed_permissions, BotConfig, BotState, ConsoleTransport, FileStore};
use tokio::io::BufReader;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::parse();
    init_subscriber_with_config(config.tracing_config());

    let store_path = config.store_path();
    let store = Arc::new(
        FileStore::open(&store_path)
            .with_context(|| format!("failed to open store at {}", store_path.display()))?,
    );
    tracing::info!(path = %store_path.display(), "Store ready");

    seed_permissions(&*store, &config.admin_group).await?;
    if config.admin {
        store.upsert(config.user_id, &config.user_name).await?;
        store.add_to_group(config.user_id, &config.admin_group).await?;
        tracing::info!(user_id = config.user_id, group = %config.admin_group, "Granted admin");
    }

    let tree = command_tree().context("failed to register built-in commands")?;
    let console = Arc::new(ConsoleTransport::new(config.user_id, config.user_name.clone()));
    let dispatcher = Dispatcher::new(
        tree,
        State::new(BotState::new(config.prefix.clone())),
        Stores::shared(store),
        console.clone(),
    )
    .with_config(config.dispatch_config());

    let (tx, rx) = mpsc::channel(64);
    let reader = tokio::spawn(async move {
        if let Err(e) = console.feed(BufReader::new(tokio::io::stdin()), tx).await {
            tracing::error!(error = %e, "Failed to read input");
        }
    });

    tokio::select! {
        _ = dispatcher.run(rx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
        }
    }
    reader.abort();
    Ok(())
}

//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::Parser;
use roomcmd::{DispatchConfig, TracingConfig, TracingFormat, UserId};

/// Run a roomcmd bot on the console: every stdin line is a chat message.
#[derive(Debug, Clone, Parser)]
#[command(name = "roomcmd-bot", version, about)]
pub struct BotConfig {
    /// Text a message must start with to be treated as a command
    #[arg(long, env = "ROOMCMD_PREFIX", default_value = "!!/")]
    pub prefix: String,

    /// Members of this group bypass every permission rule
    #[arg(long, env = "ROOMCMD_ADMIN_GROUP", default_value = "admin")]
    pub admin_group: String,

    /// JSON store file [default: <config dir>/roomcmd/store.json]
    #[arg(long, env = "ROOMCMD_STORE")]
    pub store: Option<PathBuf>,

    /// Chat user id for console input
    #[arg(long, env = "ROOMCMD_USER_ID", default_value_t = 1)]
    pub user_id: UserId,

    /// Display name for console input
    #[arg(long, env = "ROOMCMD_USER_NAME", default_value = "console")]
    pub user_name: String,

    /// Put the console user in the admin group at startup
    #[arg(long)]
    pub admin: bool,

    /// Log output format: pretty, compact or json
    #[arg(long, env = "ROOMCMD_LOG_FORMAT", default_value_t = TracingFormat::Compact)]
    pub log_format: TracingFormat,

    /// Log filter directive, e.g. `debug` or `roomcmd=trace` (falls back to RUST_LOG)
    #[arg(long, env = "ROOMCMD_LOG")]
    pub log_level: Option<String>,
}

impl BotConfig {
    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            prefix: self.prefix.clone(),
            admin_group: self.admin_group.clone(),
        }
    }

    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            level: self.log_level.clone(),
            format: self.log_format,
            ..TracingConfig::default()
        }
    }

    /// The configured store path, or the per-user default.
    pub fn store_path(&self) -> PathBuf {
        self.store.clone().unwrap_or_else(default_store_path)
    }
}

pub fn default_store_path() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
    config_dir.join("roomcmd").join("store.json")
}

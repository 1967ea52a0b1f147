//! A console chat bot on top of roomcmd.
//!
//! Lines typed on stdin are treated as messages posted by a single configured
//! user; replies are printed to stdout. Users, permissions and tricks persist
//! in a JSON file between runs.

pub mod commands;
pub mod config;
pub mod console;
pub mod store;

pub use commands::{command_tree, seed_permissions, BotState, ADMIN_COMMANDS};
pub use config::BotConfig;
pub use console::ConsoleTransport;
pub use store::FileStore;

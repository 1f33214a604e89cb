//! Command line and environment configuration.

use clap::{Parser, Subcommand};
use flagdraw_core::{FileStorage, MemoryStorage, Storage, StorageResult};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound for `--session-ttl-hours`.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;

#[derive(Parser, Debug)]
#[command(name = "flagdraw-server")]
#[command(version, about = "REST server for saving FlagDraw designs")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, global = true, env = "FLAGDRAW_BIND", default_value = "0.0.0.0:3030")]
    pub bind: SocketAddr,

    /// Directory holding flagdraw.json; storage is in-memory when unset
    #[arg(long, global = true, env = "FLAGDRAW_DATA_DIR", value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Lifetime of issued sessions, in hours (at most ten years)
    #[arg(
        long,
        global = true,
        env = "FLAGDRAW_SESSION_TTL_HOURS",
        default_value_t = 720,
        value_parser = clap::value_parser!(u32).range(1..=MAX_SESSION_TTL_HOURS)
    )]
    pub session_ttl_hours: u32,

    /// Create this account at startup if missing and log a session token for
    /// it. Makes in-memory storage usable without admin commands.
    #[arg(long, global = true, env = "FLAGDRAW_DEV_USER", value_name = "USERNAME")]
    pub dev_user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Manage accounts
    #[command(subcommand)]
    User(UserCommand),
    /// Manage sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    /// Create an account
    Add {
        username: String,
        #[arg(long)]
        email: String,
        /// Display name, defaults to the username
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete an account with all of its flags and sessions
    Delete { username: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Print a new session token for a user
    Issue { username: String },
    /// Invalidate a session token
    Revoke { token: String },
}

/// Settings the server runs with.
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub session_ttl: chrono::Duration,
    pub dev_user: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3030)),
            data_dir: None,
            session_ttl: chrono::Duration::hours(720),
            dev_user: None,
        }
    }
}

impl Config {
    /// Open the configured storage backend.
    pub fn open_storage(&self) -> StorageResult<Arc<dyn Storage>> {
        let storage: Arc<dyn Storage> = match &self.data_dir {
            Some(dir) => Arc::new(FileStorage::new(dir.clone())?),
            None => Arc::new(MemoryStorage::new()),
        };
        Ok(storage)
    }
}

impl Cli {
    pub fn config(&self) -> Config {
        Config {
            bind: self.bind,
            data_dir: self.data_dir.clone(),
            session_ttl: chrono::Duration::hours(i64::from(self.session_ttl_hours)),
            dev_user: self.dev_user.clone(),
        }
    }
}

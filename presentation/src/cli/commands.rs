//! CLI command definitions

use clap::{Parser, ValueEnum};
use horo_domain::Role;
use std::path::PathBuf;

/// Which side of the conversation the local user is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Books and pays for a session
    Customer,
    /// Delivers the session
    Prophet,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Customer => Role::Customer,
            RoleArg::Prophet => Role::Prophet,
        }
    }
}

/// CLI arguments for horo-chat
#[derive(Parser, Debug)]
#[command(name = "horo-chat")]
#[command(author, version, about = "Live chat and order tracking for horo sessions")]
#[command(long_about = r#"
horo-chat keeps a consultation room in sync: it streams chat messages and
order notifications, merges them with the room's history, and lets you move
the room's order forward (create, pay, mark done, review).

Configuration files are loaded from (in priority order):
1. HORO_<SECTION>__<KEY>   Environment variables
2. --config <path>         Explicit config file
3. ./horo.toml             Project-level config
4. ~/.config/horo/config.toml   Global config

Example:
  horo-chat --role customer --user u123 --token-file ~/.config/horo/token
  horo-chat --room 66f1c0... --role prophet --user p42 -v
"#)]
pub struct Cli {
    /// Room to open on start
    #[arg(long, value_name = "ROOM_ID")]
    pub room: Option<String>,

    /// Your role in the conversation (overrides session.role)
    #[arg(long, value_enum)]
    pub role: Option<RoleArg>,

    /// Your user id (overrides session.user_id)
    #[arg(long, value_name = "USER_ID")]
    pub user: Option<String>,

    /// Bearer token (overrides auth.token)
    #[arg(long, env = "HORO_TOKEN", hide_env_values = true, conflicts_with = "token_file")]
    pub token: Option<String>,

    /// File holding the bearer token, re-read on rotation (overrides auth.token_file)
    #[arg(long, value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

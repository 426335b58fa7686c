//! Configuration types and constants for the moment web server.

use std::path::PathBuf;

use clap::Parser;

pub(crate) const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Web server for the moment local-first social app.
///
/// Exposes the identity session, friend graph, and feed over a REST API
/// and persists everything in a single SQLite key-value store.
///
/// Configuration can be set via CLI arguments or environment variables.
/// CLI arguments take precedence over environment variables.
#[derive(Parser, Debug)]
#[command(name = "moment", version, about)]
pub struct Cli {
    /// HTTP server bind address [env: MOMENT_BIND] [default: 127.0.0.1:3000]
    #[arg(long, short = 'b')]
    pub bind: Option<String>,

    /// Data directory for the database [env: MOMENT_HOME] [default: ~/.moment]
    #[arg(long, short = 'd')]
    pub data_dir: Option<PathBuf>,

    /// Keep all state in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

pub struct Config {
    pub bind_addr: String,
    pub data_dir: PathBuf,
    pub ephemeral: bool,
}

impl Config {
    pub fn from_cli_and_env(cli: Cli) -> Self {
        let data_dir = cli
            .data_dir
            .or_else(|| std::env::var("MOMENT_HOME").ok().map(PathBuf::from))
            .unwrap_or_else(|| {
                std::env::var("HOME")
                    .map(|h| PathBuf::from(h).join(".moment"))
                    .unwrap_or_else(|_| PathBuf::from(".moment"))
            });

        let bind_addr = cli
            .bind
            .or_else(|| std::env::var("MOMENT_BIND").ok())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        Self {
            bind_addr,
            data_dir,
            ephemeral: cli.ephemeral,
        }
    }
}

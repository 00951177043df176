//! Command-line interface for bserctl.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// bserctl - query a file-watching daemon over its BSER socket
#[derive(Debug, Parser)]
#[command(name = "bserctl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "BSERCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true, env = "BSERCTL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Daemon socket path
    #[arg(short, long, global = true, env = "BSERCTL_SOCKET")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch a directory and print the effective watch root
    WatchProject {
        /// Directory to watch
        root: PathBuf,
    },

    /// List regular files under a watched root
    Query {
        /// Watched root
        root: PathBuf,

        /// Restrict results to this directory, relative to the root
        #[arg(short, long)]
        relative_root: Option<PathBuf>,

        /// Print only the first N names in sorted order
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },

    /// Check that the daemon answers and print its version
    Ping,
}

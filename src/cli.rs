// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `filestate`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "filestate",
    version,
    about = "Inspect watchability of file hierarchies and classify file content.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `filestate.toml` in the current working directory. A missing
    /// file means all defaults.
    #[arg(long, value_name = "PATH", default_value = "filestate.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FILESTATE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List detected mounts, most specific first, with their watch verdict.
    Mounts,

    /// Check that each path can be kept under native change-watching.
    CheckWatch {
        /// Also refuse when an unwatchable mount is nested below a path.
        #[arg(long)]
        subtree: bool,

        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// Hash and classify files as text or binary, using the content-type cache.
    Classify {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

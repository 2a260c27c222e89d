// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod args;

use crate::colors;
use crate::help;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

pub use args::OutputArgs;

/// Parse a string that must not be empty or whitespace-only.
fn non_empty_string(s: &str) -> Result<String, String> {
    if s.trim().is_empty() {
        Err("cannot be empty".to_string())
    } else {
        Ok(s.to_string())
    }
}

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "stk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Offline-first stock-take scanner with a durable sync queue")]
#[command(
    long_about = "Offline-first stock-take scanner.\n\n\
    Scans and session changes are recorded locally and queued, then replayed \
    against the remote store whenever it is reachable."
)]
#[command(help_template = help::template())]
#[command(before_help = help::commands())]
#[command(after_help = help::quickstart())]
#[command(styles = help::styles())]
pub struct Cli {
    /// Run as if stk was started in <path>
    #[arg(short = 'C', long = "directory", global = true, value_name = "path")]
    pub directory: Option<String>,

    /// Log debug output to stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Setup
    // ─────────────────────────────────────────────────────────────────────────
    /// Initialize a scanner work directory
    #[command(after_help = colors::examples("\
Examples:
  stk init                                Queue-only scanner
  stk init --remote ws://hq:7890          Scanner that syncs to hq
  stk init --operator alice               Default scans to alice"))]
    Init {
        /// Remote store WebSocket URL (ws:// or wss://)
        #[arg(long)]
        remote: Option<String>,

        /// Default actor recorded on scans
        #[arg(long, value_parser = non_empty_string)]
        operator: Option<String>,

        /// Path to initialize (defaults to current directory)
        #[arg(long)]
        path: Option<String>,
    },

    /// Cache a session and its expected entities for offline use
    #[command(arg_required_else_help = true)]
    #[command(after_help = colors::examples("\
Examples:
  stk download st-42.json                 Load an exported session bundle
  stk download -                          Read the bundle from stdin"))]
    Download {
        /// Bundle file with `session` and `expected` (use - for stdin)
        bundle: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────────────────
    /// Record a scan against a cached session
    #[command(arg_required_else_help = true)]
    #[command(after_help = colors::examples("\
Examples:
  stk scan st-42 asset-17                 Scan by entity id
  stk scan st-42 0123456789 -l \"Bay 4\"    Scan by barcode with a location"))]
    Scan {
        /// Session id
        session: String,

        /// Entity id or barcode
        #[arg(value_parser = non_empty_string)]
        code: String,

        /// Actor recorded on the scan (defaults to STK_OPERATOR or config)
        #[arg(long, short)]
        actor: Option<String>,

        /// Where the entity was found
        #[arg(long, short)]
        location: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Change a session's status (in_progress, completed, cancelled)
    #[command(arg_required_else_help = true)]
    Status {
        /// Session id
        session: String,

        /// New status
        status: String,

        /// Reason recorded with the change
        #[arg(long, short)]
        reason: Option<String>,
    },

    /// Show a cached session and its scan progress
    #[command(arg_required_else_help = true)]
    Session {
        /// Session id
        session: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Remove a cached session (queued mutations are kept)
    #[command(arg_required_else_help = true)]
    Clear {
        /// Session id
        session: String,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Sync
    // ─────────────────────────────────────────────────────────────────────────
    /// Show mutations waiting to sync
    Pending {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Replay the queue against the remote store now
    Sync {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Keep syncing in the foreground until interrupted
    Watch,

    /// List mutations dropped after exhausting their retries
    Dropped {
        /// Delete the dropped mutations after listing them
        #[arg(long)]
        clear: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate shell completions
    #[command(after_help = colors::examples("\
Examples:
  stk completion bash > ~/.local/share/bash-completion/completions/stk
  stk completion zsh > ~/.zfunc/_stk"))]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! stk-remote: reference remote store for stocktake scanners.
//!
//! Applies mutations replayed by `stk sync` to an authoritative SQLite
//! database. Every write is an idempotent upsert, so redelivered mutations
//! are acknowledged without changing anything.

mod db;
mod error;
mod server;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// stk-remote: stocktake remote store
#[derive(Parser, Debug)]
#[command(name = "stk-remote")]
#[command(about = "WebSocket remote store for stocktake scanners")]
struct Args {
    /// Address to bind the server to
    #[arg(short, long, default_value = "0.0.0.0:7890")]
    bind: SocketAddr,

    /// Directory for the database
    #[arg(short, long, default_value = ".")]
    data: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting stk-remote server");
    info!("  Bind address: {}", args.bind);
    info!("  Data directory: {}", args.data.display());

    let state = state::ServerState::new(&args.data)?;
    server::run(args.bind, state).await
}

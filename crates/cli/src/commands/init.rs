// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};

use stk_core::LocalMirrorStore;

use crate::config::{get_db_path, init_work_dir, Config, RemoteConfig};
use crate::error::Result;

pub fn run(remote: Option<String>, operator: Option<String>, path: Option<String>) -> Result<()> {
    let target_path = match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir()?,
    };

    let work_dir = init(&target_path, remote, operator)?;

    println!("Initialized scanner at {}", work_dir.display());
    let config = Config::load(&work_dir)?;
    match &config.remote {
        Some(remote) => println!("Remote: {}", remote.url),
        None => println!("Remote: none (scans stay queued until one is configured)"),
    }
    if let Some(operator) = &config.operator {
        println!("Operator: {}", operator);
    }
    Ok(())
}

/// Create `.stocktake/` under `path` with a config and an empty mirror db.
pub(crate) fn init(
    path: &Path,
    remote: Option<String>,
    operator: Option<String>,
) -> Result<PathBuf> {
    let config = Config {
        operator,
        remote: remote.map(RemoteConfig::new),
        ..Config::default()
    };
    let work_dir = init_work_dir(path, &config)?;
    LocalMirrorStore::open(&get_db_path(&work_dir))?;
    Ok(work_dir)
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;

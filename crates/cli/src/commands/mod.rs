// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod init;
pub mod offline;
pub mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::config::{find_work_dir, get_db_path, Config};
use crate::error::Result;
use crate::sync::{OfflineGateway, RemoteStore, WsRemoteStore};

/// An opened `.stocktake/` directory: its config and the local mirror.
pub struct Workspace {
    pub work_dir: PathBuf,
    pub config: Config,
    pub gateway: OfflineGateway,
}

impl Workspace {
    /// Open the work directory found from the current directory.
    pub fn locate() -> Result<Self> {
        Self::open(find_work_dir()?)
    }

    pub fn open(work_dir: PathBuf) -> Result<Self> {
        let config = Config::load(&work_dir)?;
        let gateway = OfflineGateway::open(&get_db_path(&work_dir))?;
        Ok(Workspace {
            work_dir,
            config,
            gateway,
        })
    }

    /// The configured remote store. Fails if no remote is configured.
    pub fn remote_store(&self) -> Result<Arc<dyn RemoteStore>> {
        let remote = self.config.require_remote()?;
        Ok(Arc::new(WsRemoteStore::new(
            remote.url.clone(),
            remote.connect_timeout(),
        )))
    }
}

/// Print a value as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
#[path = "mod_tests.rs"]
pub mod testing;

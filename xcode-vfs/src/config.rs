use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::error::PersistenceError;
use crate::persistence::{FileStore, MemoryStore, TreeStore, DEFAULT_STORAGE_KEY};

#[derive(Parser, Debug, Clone)]
#[command(name = "xcode-vfs", about = "Virtual workspace, toy shell and script runner over NDJSON stdio")]
pub struct CliArgs {
    /// Directory holding the persisted workspace (defaults to the platform data dir)
    #[arg(long, env = "XCODE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Keep the workspace in memory only; nothing survives the process
    #[arg(long, env = "XCODE_IN_MEMORY")]
    pub in_memory: bool,

    /// Key the serialized tree is stored under
    #[arg(long, default_value = DEFAULT_STORAGE_KEY, env = "XCODE_STORAGE_KEY")]
    pub storage_key: String,

    /// Name of the root folder when a new workspace is seeded
    #[arg(long, default_value = "workspace", env = "XCODE_ROOT_NAME")]
    pub root_name: String,

    /// Python interpreter used to run scripts
    #[arg(long, default_value = "python3", env = "XCODE_PYTHON")]
    pub python: String,

    /// Wall-clock limit per script run, in seconds
    #[arg(long, default_value = "30", env = "XCODE_EXEC_TIMEOUT")]
    pub exec_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "XCODE_LOG_LEVEL")]
    pub log_level: String,
}

impl CliArgs {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout)
    }

    /// Resolved store directory: the flag, else `<data dir>/xcode`, else
    /// `.xcode` in the working directory.
    pub fn resolved_store_dir(&self) -> PathBuf {
        self.store_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join("xcode"))
                .unwrap_or_else(|| PathBuf::from(".xcode"))
        })
    }

    pub fn open_store(&self) -> Result<TreeStore, PersistenceError> {
        if self.in_memory {
            tracing::info!("Using in-memory store");
            return Ok(TreeStore::new(Box::new(MemoryStore::new()), &self.storage_key));
        }
        let dir = self.resolved_store_dir();
        tracing::info!(dir = %dir.display(), "Using file store");
        Ok(TreeStore::new(Box::new(FileStore::open(dir)?), &self.storage_key))
    }
}

use anyhow::Result;
use ledger_guard_policy::{
    Clock, LedgerGateway, PolicyEngineImpl, StorageDirectory, SystemClock,
};
use ledger_guard_storage::RocksDbStorage;
use std::sync::Arc;

use crate::config::Config;

pub type Directory = StorageDirectory<RocksDbStorage>;
pub type Engine = PolicyEngineImpl<Directory>;
pub type Gateway = LedgerGateway<Engine, Directory>;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub directory: Arc<Directory>,
    pub engine: Arc<Engine>,
    pub gateway: Gateway,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let storage = Arc::new(RocksDbStorage::open(&config.database_path)?);
        Ok(Self::with_storage(config, storage, Arc::new(SystemClock)))
    }

    /// Build the state over an already opened database
    pub fn with_storage(config: Config, storage: Arc<RocksDbStorage>, clock: Arc<dyn Clock>) -> Self {
        let directory = Arc::new(StorageDirectory::new(storage));

        let engine = Arc::new(PolicyEngineImpl::with_config(
            directory.clone(),
            config.rate_limit,
            clock,
        ));

        let gateway = LedgerGateway::new(engine.clone(), directory.clone());

        AppState {
            config,
            directory,
            engine,
            gateway,
        }
    }
}

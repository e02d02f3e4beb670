// lib/src/storage_engine/mod.rs

pub mod inmemory_storage;
pub mod sled_storage;
pub mod storage_engine;
pub mod storage_utils;

pub use inmemory_storage::InMemoryClinicStorage;
pub use sled_storage::{open_sled_db, SledClinicStorage};
pub use storage_engine::{ClinicStorageEngine, SlotIndexReport};

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{StorageConfig, StorageEngineType};

/// Creates the storage engine named by the configuration. Sled is the default.
pub fn create_storage(config: &StorageConfig) -> Result<Arc<dyn ClinicStorageEngine>> {
    let engine: Arc<dyn ClinicStorageEngine> = match config.engine_type()? {
        StorageEngineType::Sled => Arc::new(SledClinicStorage::open(&config.data_directory)?),
        StorageEngineType::InMemory => Arc::new(InMemoryClinicStorage::new()),
    };
    info!("Using {} storage engine", engine.get_type());
    Ok(engine)
}

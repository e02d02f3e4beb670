// lib/src/config/mod.rs

pub mod config_structs;

pub use config_structs::{
    load_clinic_config, AuthConfig, ClinicConfig, DocumentsConfig, EmailConfig, ScheduleConfig,
    ServerConfig, StorageConfig, StorageEngineType, DEFAULT_CONFIG_FILE, DEFAULT_SLOT_CATALOG,
};

// lib/src/config/config_structs.rs
// Service configuration: defaults, then an optional YAML file, then
// CLINIC__SECTION__KEY environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use models::errors::{ClinicError, ClinicResult};

pub const DEFAULT_CONFIG_FILE: &str = "clinic_config.yaml";
const DEFAULT_JWT_SECRET: &str = "change-me-clinic-secret";

/// Morning block 8:00 AM to 12:30 PM, evening block 4:00 PM to 8:30 PM,
/// both half-hourly.
pub const DEFAULT_SLOT_CATALOG: [&str; 20] = [
    "8:00 AM", "8:30 AM", "9:00 AM", "9:30 AM", "10:00 AM", "10:30 AM",
    "11:00 AM", "11:30 AM", "12:00 PM", "12:30 PM",
    "4:00 PM", "4:30 PM", "5:00 PM", "5:30 PM", "6:00 PM", "6:30 PM",
    "7:00 PM", "7:30 PM", "8:00 PM", "8:30 PM",
];

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("./data/clinic")
}

fn default_prescriptions_directory() -> PathBuf {
    PathBuf::from("./prescriptions")
}

fn default_from_address() -> String {
    "no-reply@dentocare.example".to_string()
}

fn default_clinic_name() -> String {
    "DentoCare+".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_hours() -> i64 {
    8
}

fn default_bcrypt_cost() -> u32 {
    12
}

fn default_slots() -> Vec<String> {
    DEFAULT_SLOT_CATALOG.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageEngineType {
    Sled,
    InMemory,
}

impl FromStr for StorageEngineType {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sled" => Ok(StorageEngineType::Sled),
            "inmemory" | "in-memory" | "memory" => Ok(StorageEngineType::InMemory),
            _ => Err(ClinicError::ConfigurationError(format!("Unknown storage engine type: {}", s))),
        }
    }
}

impl std::fmt::Display for StorageEngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageEngineType::Sled => write!(f, "sled"),
            StorageEngineType::InMemory => write!(f, "inmemory"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), cors_origins: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_engine")]
    pub engine: String,
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,
}

fn default_engine() -> String {
    StorageEngineType::Sled.to_string()
}

impl StorageConfig {
    pub fn engine_type(&self) -> ClinicResult<StorageEngineType> {
        self.engine.parse()
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { engine: default_engine(), data_directory: default_data_directory() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsConfig {
    #[serde(default = "default_prescriptions_directory")]
    pub prescriptions_directory: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self { prescriptions_directory: default_prescriptions_directory() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailConfig {
    /// HTTP mail relay endpoint. Email is disabled when unset.
    #[serde(default)]
    pub relay_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_clinic_name")]
    pub clinic_name: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl EmailConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            relay_url: None,
            api_key: None,
            from_address: default_from_address(),
            clinic_name: default_clinic_name(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Staff-only routes demand a staff bearer token when set.
    #[serde(default)]
    pub require_staff_token: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            token_ttl_hours: default_token_ttl_hours(),
            bcrypt_cost: default_bcrypt_cost(),
            require_staff_token: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_slots")]
    pub slots: Vec<String>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { slots: default_slots() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

impl ClinicConfig {
    /// Rejects settings the service cannot start with.
    pub fn validate(&self) -> ClinicResult<()> {
        let invalid = |message: &str| Err(ClinicError::ConfigurationError(message.to_string()));
        self.storage.engine_type()?;
        if self.schedule.slots.iter().all(|s| s.trim().is_empty()) {
            return invalid("schedule.slots must list at least one slot");
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            return invalid("auth.bcrypt_cost must be between 4 and 31");
        }
        if self.auth.token_ttl_hours <= 0 {
            return invalid("auth.token_ttl_hours must be positive");
        }
        if self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("auth.jwt_secret is the built-in default; set CLINIC__AUTH__JWT_SECRET in production");
        }
        Ok(())
    }
}

/// Loads the configuration. An explicitly given file must exist; the default
/// `clinic_config.yaml` is optional.
pub fn load_clinic_config(config_file_path: Option<&Path>) -> Result<ClinicConfig> {
    // A missing .env file is the normal case.
    let _ = dotenv::dotenv();

    let (path, required) = match config_file_path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    debug!("Loading clinic configuration from {:?} (required: {})", path, required);

    let settings = Config::builder()
        .add_source(File::from(path.as_path()).format(FileFormat::Yaml).required(required))
        .add_source(
            Environment::with_prefix("CLINIC")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("schedule.slots")
                .with_list_parse_key("server.cors_origins")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

    let config: ClinicConfig = settings
        .try_deserialize()
        .context("Failed to parse clinic configuration")?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ClinicConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.schedule.slots.len(), 20);
        assert_eq!(config.schedule.slots.first().map(String::as_str), Some("8:00 AM"));
        assert_eq!(config.storage.engine_type().unwrap(), StorageEngineType::Sled);
    }

    #[test]
    fn yaml_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "server:\n  port: 6100\nstorage:\n  engine: inmemory\nschedule:\n  slots: [\"9:00 AM\", \"9:30 AM\"]\n"
        )
        .unwrap();
        let config = load_clinic_config(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 6100);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.storage.engine_type().unwrap(), StorageEngineType::InMemory);
        assert_eq!(config.schedule.slots, vec!["9:00 AM".to_string(), "9:30 AM".to_string()]);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        assert!(load_clinic_config(Some(Path::new("/nonexistent/clinic.yaml"))).is_err());
    }

    #[test]
    fn unknown_engine_is_rejected() {
        let mut config = ClinicConfig::default();
        config.storage.engine = "rocksdb".to_string();
        assert!(matches!(config.validate(), Err(ClinicError::ConfigurationError(m)) if m.contains("rocksdb")));
        config.storage.engine = "sled".to_string();
        config.schedule.slots = vec![];
        assert!(matches!(config.validate(), Err(ClinicError::ConfigurationError(_))));
        config.schedule.slots = vec!["9:00 AM".to_string()];
        config.auth.bcrypt_cost = 2;
        assert!(matches!(config.validate(), Err(ClinicError::ConfigurationError(_))));
    }

    #[test]
    fn invalid_file_settings_surface_as_configuration_errors() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "storage:\n  engine: rocksdb\n").unwrap();
        let err = load_clinic_config(Some(file.path())).unwrap_err();
        assert!(matches!(err.downcast_ref::<ClinicError>(), Some(ClinicError::ConfigurationError(_))));
    }
}

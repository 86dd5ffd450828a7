use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Locations of the external update scripts and where their output goes.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub python: String,
    pub price_photo_script: PathBuf,
    pub trast_script: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub aliases_path: PathBuf,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub export_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub max_batch_items: usize,
    pub max_payload_bytes: usize,
    pub max_request_bytes: usize,
    pub jobs: JobsConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("aliases_path", &self.aliases_path)
            .field("database_url", &"[redacted]")
            .field("storage_root", &self.storage_root)
            .field("public_base_url", &self.public_base_url)
            .field("export_path", &self.export_path)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("max_batch_items", &self.max_batch_items)
            .field("max_payload_bytes", &self.max_payload_bytes)
            .field("max_request_bytes", &self.max_request_bytes)
            .field("jobs", &self.jobs)
            .finish()
    }
}

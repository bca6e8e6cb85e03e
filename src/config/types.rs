use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default)]
    pub logs: LogsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_staging_dir")]
    pub staging_dir: String,
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: String,
    #[serde(default = "default_static_url_prefix")]
    pub static_url_prefix: String,
    /// Artifacts older than this are removed by the sweeper. Unset keeps them forever.
    #[serde(default)]
    pub artifact_retention_secs: Option<u64>,
    /// Staged uploads older than this are removed by the sweeper. Unset keeps them forever.
    #[serde(default)]
    pub upload_retention_secs: Option<u64>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

/// How to launch the external analysis unit.
///
/// The staged file path and the target savings value are appended to `args`
/// as the last two positional arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_stderr_excerpt_bytes")]
    pub stderr_excerpt_bytes: usize,
    #[serde(default = "default_accepted_extensions")]
    pub accepted_extensions: Vec<String>,
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            max_upload_bytes: default_max_upload_bytes(),
            logs: LogsConfig::default(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            artifact_dir: default_artifact_dir(),
            static_url_prefix: default_static_url_prefix(),
            artifact_retention_secs: None,
            upload_retention_secs: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: None,
            env: HashMap::new(),
            timeout_secs: default_timeout_secs(),
            stderr_excerpt_bytes: default_stderr_excerpt_bytes(),
            accepted_extensions: default_accepted_extensions(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_staging_dir() -> String {
    "uploads".to_string()
}

fn default_artifact_dir() -> String {
    "static".to_string()
}

fn default_static_url_prefix() -> String {
    "/static".to_string()
}

fn default_sweep_interval_secs() -> u64 {
    300
}

fn default_program() -> String {
    "python3".to_string()
}

fn default_args() -> Vec<String> {
    vec!["transactions.py".to_string()]
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_stderr_excerpt_bytes() -> usize {
    2048
}

fn default_accepted_extensions() -> Vec<String> {
    vec!["xls".to_string(), "xlsx".to_string()]
}

mod types;

pub use types::*;

use crate::{Error, Result};
use std::env;
use tracing::debug;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub async fn load() -> Result<Config> {
    let explicit_path = env::var("CONFIG_PATH").ok();
    let config_path = explicit_path
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    debug!("Loading configuration from: {}", config_path);

    let mut config = match tokio::fs::read_to_string(&config_path).await {
        Ok(config_str) => parse(&config_str)?,
        // Only the implicit default file may be absent
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit_path.is_none() => {
            Config::default()
        }
        Err(e) => {
            return Err(Error::config(format!(
                "Failed to read {}: {}",
                config_path, e
            )));
        }
    };

    if let Ok(port) = env::var("PORT") {
        config.server.port = port
            .parse()
            .map_err(|_| Error::config(format!("Invalid PORT value: '{}'", port)))?;
    }

    Ok(config)
}

pub fn parse(config_str: &str) -> Result<Config> {
    // An empty document deserializes to unit, not an empty mapping
    if config_str.trim().is_empty() {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(config_str)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.analysis.program.trim().is_empty() {
        return Err(Error::config("analysis.program must not be empty"));
    }
    if config.analysis.timeout_secs == 0 {
        return Err(Error::config("analysis.timeout_secs must be greater than zero"));
    }
    let prefix = &config.storage.static_url_prefix;
    if !prefix.starts_with('/') || prefix.trim_end_matches('/').is_empty() {
        return Err(Error::config(format!(
            "storage.static_url_prefix must be a non-root path starting with '/': '{}'",
            prefix
        )));
    }
    if config.analysis.accepted_extensions.is_empty() {
        return Err(Error::config("analysis.accepted_extensions must not be empty"));
    }
    // The sweeper must never reclaim files of a run that can still be in flight
    let retention = [
        ("artifact_retention_secs", config.storage.artifact_retention_secs),
        ("upload_retention_secs", config.storage.upload_retention_secs),
    ];
    for (key, secs) in retention {
        if let Some(secs) = secs
            && secs <= config.analysis.timeout_secs
        {
            return Err(Error::config(format!(
                "storage.{} ({}) must exceed analysis.timeout_secs ({})",
                key, secs, config.analysis.timeout_secs
            )));
        }
    }
    Ok(())
}

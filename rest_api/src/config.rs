// rest_api/src/config.rs

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default REST API port.
pub const DEFAULT_PORT: u16 = 8082;

/// Server configuration as `server_config.yaml` carries it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_directory: String,
    pub jwt_secret: String,
    pub session_hours: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_directory: "clinic_data".to_string(),
            jwt_secret: "change_me_in_production".to_string(),
            session_hours: 8,
        }
    }
}

// Wrapper struct to match the 'server:' key in the YAML config.
#[derive(Debug, Deserialize)]
struct ServerConfigWrapper {
    server: ServerConfig,
}

/// Loads the server configuration. A missing file falls back to defaults;
/// the CLINIC_JWT_SECRET environment variable overrides the configured
/// signing key either way.
pub fn load_server_config(config_file_path: Option<PathBuf>) -> Result<ServerConfig> {
    let default_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("server_config.yaml");
    let path_to_use = config_file_path.unwrap_or(default_path);

    let mut config = if path_to_use.exists() {
        let content = fs::read_to_string(&path_to_use)
            .context(format!("Failed to read server config file {}", path_to_use.display()))?;
        let wrapper: ServerConfigWrapper = serde_yaml2::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse server config file {}: {}", path_to_use.display(), e))?;
        wrapper.server
    } else {
        ServerConfig::default()
    };

    if let Ok(secret) = std::env::var("CLINIC_JWT_SECRET") {
        config.jwt_secret = secret;
    }

    Ok(config)
}

//! Portal config loader (strict parsing).

pub mod schema;

use std::fs;

use mpportal_core::error::{PortalError, Result};

pub use schema::{AppConfig, GatewaySection, PortalConfig, ReplyTexts};

/// Default config path, overridable with `MPPORTAL_CONFIG`.
pub const DEFAULT_CONFIG_PATH: &str = "mpportal.yaml";
pub const CONFIG_PATH_ENV: &str = "MPPORTAL_CONFIG";

/// Resolve the config path from the environment.
pub fn config_path() -> String {
    std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

pub fn load_from_file(path: &str) -> Result<PortalConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| PortalError::Internal(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<PortalConfig> {
    let cfg: PortalConfig = serde_yaml::from_str(s)
        .map_err(|e| PortalError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

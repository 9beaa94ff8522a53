use std::path::{Path, PathBuf};

use portal_engine::{ConfigError, PortalConfig};
use portal_logging::{portal_debug, portal_info};

const DEFAULT_CONFIG_FILE: &str = "portal.ron";

/// Loads the configuration file (explicit path, else `./portal.ron` when it
/// exists, else built-in defaults) and applies environment overrides.
pub fn load_config(explicit: Option<&Path>) -> Result<PortalConfig, ConfigError> {
    let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
    let path = match explicit {
        Some(path) => Some(path),
        None if fallback.is_file() => Some(fallback.as_path()),
        None => None,
    };

    let config = match path {
        Some(path) => {
            portal_info!("Loading configuration from {:?}", path);
            PortalConfig::load(path)?
        }
        None => {
            portal_debug!("No configuration file, using defaults");
            PortalConfig::default()
        }
    };

    let config = config.with_process_env();
    config.validate()?;
    Ok(config)
}

//! Configuration loading
//!
//! The configuration is compiled in from `valve.toml` and parsed at boot
//! by the core parser. `build.rs` runs the same parser over the file, so
//! the fallback below is only reached if the embedded text is corrupted.

use defmt::*;

use torqvalve_core::config::parse_config;
use torqvalve_core::ValveConfig;

/// Embedded configuration (compiled into firmware)
/// Edit valve.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../../valve.toml");

/// Parse the embedded configuration, falling back to built-in defaults
pub fn load_config() -> ValveConfig {
    match parse_config(EMBEDDED_CONFIG) {
        Ok(config) => {
            info!("Parsed embedded configuration successfully");
            config
        }
        Err(e) => {
            error!("Failed to parse embedded config: {}", e);
            error!("Using built-in defaults");
            ValveConfig::default()
        }
    }
}

pub mod ask;
pub mod calc;
pub mod config_cmd;
pub mod ingest;
pub mod search;
pub mod serve;

use optimus_config::AppConfig;

/// Load configuration, with the failure phrased for the terminal.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

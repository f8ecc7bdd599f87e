use std::path::PathBuf;

use etcetera::{BaseStrategy, choose_base_strategy};

/// Name of the configuration file looked up in every config location
pub const CONFIG_FILE_NAME: &str = "r2pandas.toml";

/// Per-user configuration directory, e.g. `~/.config/r2pandas`
pub fn get_user_config_dir() -> Option<PathBuf> {
    let strategy = choose_base_strategy().ok()?;
    Some(strategy.config_dir().join("r2pandas"))
}

/// Per-user configuration file path, whether or not it exists
pub fn get_user_config_file() -> Option<PathBuf> {
    get_user_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

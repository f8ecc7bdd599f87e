//! Translation configuration
//!
//! Settings are layered, lowest precedence first: built-in defaults, the
//! per-user config file, `r2pandas.toml` in the working directory, an
//! explicit `--config` file, `R2PANDAS_*` environment variables, and finally
//! command-line flags (applied by the binary).

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::dirs::{CONFIG_FILE_NAME, get_user_config_file};

pub const ENV_AGGRESSIVE_IDENTIFIERS: &str = "R2PANDAS_AGGRESSIVE_IDENTIFIERS";
pub const ENV_NORMALIZE_LITERAL_COLUMNS: &str = "R2PANDAS_NORMALIZE_LITERAL_COLUMNS";
pub const ENV_INDENT_WIDTH: &str = "R2PANDAS_INDENT_WIDTH";

/// Options consumed by the translation pipeline
///
/// Both normalization switches default to off, which preserves the original
/// text whenever a rewrite would be ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Normalize every bare identifier, not only names in known naming contexts
    pub aggressive_identifier_normalization: bool,
    /// Normalize quoted column names in column-selection contexts
    pub normalize_literal_column_strings: bool,
    /// Spaces emitted per block level
    pub indent_width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aggressive_identifier_normalization: false,
            normalize_literal_column_strings: false,
            indent_width: 4,
        }
    }
}

/// One config file; absent keys leave lower layers untouched
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
struct ConfigLayer {
    aggressive_identifier_normalization: Option<bool>,
    normalize_literal_column_strings: Option<bool>,
    indent_width: Option<usize>,
}

impl Config {
    /// Load the fully layered configuration from disk and the process environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut candidates = Vec::new();
        if let Some(user_file) = get_user_config_file() {
            candidates.push(user_file);
        }
        candidates.push(PathBuf::from(CONFIG_FILE_NAME));

        Self::load_layers(&candidates, explicit, |key| std::env::var(key).ok())
    }

    /// Load configuration from candidate files, an optional required file and
    /// an environment lookup
    ///
    /// Candidate files that do not exist are skipped; the explicit file must
    /// exist.
    pub fn load_layers(
        candidates: &[PathBuf],
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let mut config = Self::default();

        for path in candidates {
            if path.is_file() {
                config.merge_file(path)?;
            }
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                bail!("Config file not found: {}", path.display());
            }
            config.merge_file(path)?;
        }

        config.apply_env_overrides(env)?;
        config.validate()?;
        debug!("Effective configuration: {config:?}");
        Ok(config)
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let layer: ConfigLayer = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config layer from {}", path.display());
        self.merge(layer);
        Ok(())
    }

    fn merge(&mut self, layer: ConfigLayer) {
        if let Some(value) = layer.aggressive_identifier_normalization {
            self.aggressive_identifier_normalization = value;
        }
        if let Some(value) = layer.normalize_literal_column_strings {
            self.normalize_literal_column_strings = value;
        }
        if let Some(value) = layer.indent_width {
            self.indent_width = value;
        }
    }

    /// Apply `R2PANDAS_*` overrides from an environment lookup
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = env(ENV_AGGRESSIVE_IDENTIFIERS) {
            self.aggressive_identifier_normalization =
                parse_bool(&value).with_context(|| format!("Invalid {ENV_AGGRESSIVE_IDENTIFIERS}"))?;
        }
        if let Some(value) = env(ENV_NORMALIZE_LITERAL_COLUMNS) {
            self.normalize_literal_column_strings = parse_bool(&value)
                .with_context(|| format!("Invalid {ENV_NORMALIZE_LITERAL_COLUMNS}"))?;
        }
        if let Some(value) = env(ENV_INDENT_WIDTH) {
            self.indent_width = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid {ENV_INDENT_WIDTH}: {value:?}"))?;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.indent_width == 0 {
            bail!("indent-width must be at least 1");
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use tempfile::TempDir;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_are_conservative() {
        let config = Config::default();
        assert!(!config.aggressive_identifier_normalization);
        assert!(!config.normalize_literal_column_strings);
        assert_eq!(config.indent_width, 4);
    }

    #[test]
    fn test_later_layers_override_earlier_ones() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&user, "aggressive-identifier-normalization = true\nindent-width = 2\n").unwrap();
        fs::write(&project, "indent-width = 8\n").unwrap();

        let config = Config::load_layers(&[user, project], None, no_env).unwrap();
        assert!(config.aggressive_identifier_normalization);
        assert_eq!(config.indent_width, 8);
    }

    #[test]
    fn test_missing_candidates_are_skipped_but_explicit_is_required() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");

        let config = Config::load_layers(std::slice::from_ref(&missing), None, no_env).unwrap();
        assert_eq!(config, Config::default());

        let err = Config::load_layers(&[], Some(&missing), no_env).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.toml");
        fs::write(&path, "indent = 2\n").unwrap();

        assert!(Config::load_layers(&[], Some(&path), no_env).is_err());
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r2pandas.toml");
        fs::write(&path, "normalize-literal-column-strings = false\n").unwrap();

        let env: HashMap<&str, &str> = [
            (ENV_NORMALIZE_LITERAL_COLUMNS, "yes"),
            (ENV_INDENT_WIDTH, "2"),
        ]
        .into_iter()
        .collect();
        let config = Config::load_layers(&[path], None, |key| {
            env.get(key).map(|value| (*value).to_owned())
        })
        .unwrap();
        assert!(config.normalize_literal_column_strings);
        assert_eq!(config.indent_width, 2);
    }

    #[test]
    fn test_invalid_env_values_are_errors() {
        let mut config = Config::default();
        let result = config.apply_env_overrides(|key| {
            (key == ENV_AGGRESSIVE_IDENTIFIERS).then(|| "maybe".to_owned())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_indent_is_rejected() {
        let result = Config::load_layers(&[], None, |key| {
            (key == ENV_INDENT_WIDTH).then(|| "0".to_owned())
        });
        assert!(result.is_err());
    }
}

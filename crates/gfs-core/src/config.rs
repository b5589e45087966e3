use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::cycle::Cycle;
use crate::date::DateFormat;
use crate::error::ConfigError;

/// File name looked up in the working directory when no `--config` is given.
pub const PROJECT_CONFIG_FILE: &str = "gfs.toml";

/// Retention settings read from `gfs.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// `strftime` pattern for input and output dates.
    #[serde(default)]
    pub format: Option<String>,
    /// Built-in cycle name (or alias) to number of buckets kept.
    #[serde(default)]
    pub keep: BTreeMap<String, i64>,
    #[serde(default)]
    pub custom: Vec<CustomCycleConfig>,
}

/// A user-defined cycle keyed by a `strftime` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomCycleConfig {
    pub name: String,
    pub key: String,
    pub keep: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

impl ProjectConfig {
    /// Cycles and capacities declared by this file, built-ins first.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAvailable`] for an unknown name under
    /// `[keep]` and [`ConfigError::InvalidKeyFormat`] for a bad custom key.
    pub fn cycles(&self) -> Result<Vec<(Cycle, i64)>, ConfigError> {
        let builtin = self
            .keep
            .iter()
            .map(|(name, capacity)| name.parse::<Cycle>().map(|cycle| (cycle, *capacity)));
        let custom = self.custom.iter().map(|custom| {
            Cycle::custom(custom.name.clone(), custom.key.clone()).map(|cycle| (cycle, custom.keep))
        });
        builtin.chain(custom).collect()
    }

    /// The configured date format, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDateFormat`] for an invalid pattern.
    pub fn date_format(&self) -> Result<Option<DateFormat>, ConfigError> {
        self.format.as_deref().map(DateFormat::new).transpose()
    }
}

/// Load the project config.
///
/// An explicit path must exist. Without one, `gfs.toml` in `dir` is used if
/// present and defaults apply otherwise.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML.
pub fn load_project_config(explicit: Option<&Path>, dir: &Path) -> Result<ProjectConfig> {
    let path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(PROJECT_CONFIG_FILE);
            if !candidate.exists() {
                return Ok(ProjectConfig::default());
            }
            candidate
        }
    };

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded project config");
    Ok(config)
}

/// Load `$CONFIG_DIR/gfs/config.toml`, or defaults when absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("gfs/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

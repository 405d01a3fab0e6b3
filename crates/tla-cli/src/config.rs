//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tla_core::EngineConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Cohort document used when `--input` is not given.
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Alignment and ingestion settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, `config.toml` in the platform config
    /// directory, the given file, then `TLA_*` environment variables (nested
    /// keys separated by `__`, e.g. `TLA_ENGINE__SAME_DAY_POLICY=last`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("TLA_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for tla.
///
/// On Linux: `~/.config/tla`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tla"))
}

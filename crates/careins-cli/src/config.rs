//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! max_conflict_retries: 5
//! state_dir: /var/lib/careins/rounds
//! ```
//!
//! Precedence, highest first: command-line flags, the
//! `CAREINS_MAX_CONFLICT_RETRIES` environment variable, the file, the
//! built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use careins_round::config::MAX_CONFLICT_RETRIES_VAR;
use careins_round::RoundServiceConfig;

/// Default location of round records, relative to the working directory.
pub const DEFAULT_STATE_DIR: &str = ".careins/rounds";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub max_conflict_retries: Option<u32>,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Read the YAML file at `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// The state directory: the flag if given, else the file, else
    /// [`DEFAULT_STATE_DIR`].
    pub fn state_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.state_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
    }

    /// Service configuration from the environment.
    pub fn service_config(&self) -> Result<RoundServiceConfig> {
        self.service_config_with(|var| std::env::var(var).ok())
    }

    /// Service configuration with an arbitrary variable source.
    pub fn service_config_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<RoundServiceConfig> {
        if lookup(MAX_CONFLICT_RETRIES_VAR).is_some() {
            return Ok(RoundServiceConfig::from_lookup(lookup)?);
        }
        let mut config = RoundServiceConfig::default();
        if let Some(retries) = self.max_conflict_retries {
            config.max_conflict_retries = retries;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_file_means_defaults() {
        let cfg = CliConfig::load(None).unwrap();
        assert_eq!(cfg, CliConfig::default());
        assert_eq!(cfg.state_dir(None), PathBuf::from(DEFAULT_STATE_DIR));
        assert_eq!(cfg.service_config_with(|_| None).unwrap().max_conflict_retries, 3);
    }

    #[test]
    fn file_values_apply() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careins.yaml");
        std::fs::write(&path, "max_conflict_retries: 7\nstate_dir: /srv/rounds\n").unwrap();

        let cfg = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.state_dir(None), PathBuf::from("/srv/rounds"));
        assert_eq!(cfg.service_config_with(|_| None).unwrap().max_conflict_retries, 7);
    }

    #[test]
    fn flag_and_environment_win_over_file() {
        let cfg = CliConfig {
            max_conflict_retries: Some(7),
            state_dir: Some(PathBuf::from("/srv/rounds")),
        };
        assert_eq!(
            cfg.state_dir(Some(Path::new("local"))),
            PathBuf::from("local")
        );
        let service = cfg
            .service_config_with(|var| (var == MAX_CONFLICT_RETRIES_VAR).then(|| "1".to_string()))
            .unwrap();
        assert_eq!(service.max_conflict_retries, 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("careins.yaml");
        std::fs::write(&path, "retries: 2\n").unwrap();
        assert!(CliConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliConfig::load(Some(&dir.path().join("absent.yaml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}

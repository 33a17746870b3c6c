//! Configuration — YAML file under the user config dir, with
//! `HOSTAUDIT_`-prefixed environment overrides
//! (e.g. `HOSTAUDIT_ADVISOR__ENABLED=true`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where baseline files live. Defaults to the user data dir.
    pub baseline_dir: Option<PathBuf>,
    #[serde(default)]
    pub advisor: AdvisorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://127.0.0.1:9200/v1/advise".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("hostaudit").join("config.yaml"))
    }

    /// Resolved baseline directory.
    pub fn baseline_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.baseline_dir {
            return Ok(dir.clone());
        }
        let data_dir = dirs::data_dir().context("could not determine data directory")?;
        Ok(data_dir.join("hostaudit").join("baselines"))
    }
}

pub fn load() -> Result<Config> {
    let path = Config::path()?;

    let mut figment = Figment::from(Serialized::defaults(Config::default()));
    if path.exists() {
        figment = figment.merge(Yaml::file(&path));
    }

    figment
        .merge(Env::prefixed("HOSTAUDIT_").split("__"))
        .extract()
        .with_context(|| format!("loading configuration from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_disable_the_advisor() {
        let config = Config::default();
        assert!(!config.advisor.enabled);
        assert_eq!(config.advisor.timeout_secs, 10);
    }

    #[test]
    fn baseline_dir_override_wins() {
        let config = Config {
            baseline_dir: Some(PathBuf::from("/tmp/baselines")),
            ..Config::default()
        };
        assert_eq!(config.baseline_dir().unwrap(), PathBuf::from("/tmp/baselines"));
    }
}

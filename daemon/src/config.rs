use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use override_engine::{Blend, OverrideConfig};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: OverrideConfig,
    #[serde(default)]
    pub ranking: Blend,
}

impl DaemonConfig {
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path();
        let config = if config_path.exists() {
            let raw = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config file {}", config_path.display()))?;
            Self::parse(&raw)
                .with_context(|| format!("failed to parse TOML from {}", config_path.display()))?
        } else {
            DaemonConfig::default()
        };

        config.finish(|key| env::var(key).ok())
    }

    /// Applies `OVERRIDE_CAPACITY` / `OVERRIDE_HALFLIFE` on top of the file,
    /// then validates.
    fn finish(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        self.apply_overrides(&lookup)?;
        self.model.validate().context("invalid [model] section")?;
        self.ranking
            .validate()
            .context("invalid [ranking] section")?;
        Ok(self)
    }

    fn parse(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(capacity) = env_parse::<usize>(lookup, "OVERRIDE_CAPACITY")? {
            self.model.capacity = capacity;
        }
        if let Some(halflife) = env_parse::<f64>(lookup, "OVERRIDE_HALFLIFE")? {
            self.model.halflife = halflife;
        }
        Ok(())
    }
}

fn env_parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("{key}={raw} is not a valid value")),
        None => Ok(None),
    }
}

fn resolve_config_path() -> PathBuf {
    if let Ok(path) = env::var("OVERRIDE_DAEMON_CONFIG") {
        return Path::new(&path).to_path_buf();
    }

    if let Some(base) = dirs::config_dir() {
        return base.join("override-daemon").join("config.toml");
    }

    Path::new("/tmp/override-daemon.toml").to_path_buf()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_socket_path() -> PathBuf {
    Path::new("/tmp/override-daemon.sock").to_path_buf()
}

fn default_max_line_bytes() -> usize {
    64 * 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = DaemonConfig::parse("").unwrap();
        assert_eq!(config.model.capacity, 500);
        assert_eq!(config.model.halflife, 5400.0);
        assert_eq!(config.ranking, Blend::default());
        assert_eq!(config.server.max_line_bytes, 64 * 1024);
    }

    #[test]
    fn parses_all_sections() {
        let raw = r#"
            [server]
            socket_path = "/run/user/1000/override.sock"

            [model]
            capacity = 32
            halflife = 60.0

            [ranking]
            kind = "threshold"
            threshold = 0.25
            bonus = 99.0
        "#;
        let config = DaemonConfig::parse(raw).unwrap();
        assert_eq!(
            config.server.socket_path,
            PathBuf::from("/run/user/1000/override.sock")
        );
        assert_eq!(config.model.capacity, 32);
        assert_eq!(config.model.halflife, 60.0);
        assert_eq!(
            config.ranking,
            Blend::Threshold {
                threshold: 0.25,
                bonus: 99.0
            }
        );
    }

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn env_overrides_win_over_file() {
        let config = DaemonConfig::parse("[model]\ncapacity = 32\nhalflife = 60.0\n")
            .unwrap()
            .finish(vars(&[("OVERRIDE_CAPACITY", " 8 "), ("OVERRIDE_HALFLIFE", "90.5")]))
            .unwrap();
        assert_eq!(config.model.capacity, 8);
        assert_eq!(config.model.halflife, 90.5);
    }

    #[test]
    fn missing_env_keeps_file_values() {
        let config = DaemonConfig::parse("[model]\ncapacity = 32\n")
            .unwrap()
            .finish(vars(&[]))
            .unwrap();
        assert_eq!(config.model.capacity, 32);
        assert_eq!(config.model.halflife, 5400.0);
    }

    #[test]
    fn bad_env_values_fail_load() {
        for (key, value) in [
            ("OVERRIDE_CAPACITY", "abc"),
            ("OVERRIDE_CAPACITY", "0"),
            ("OVERRIDE_HALFLIFE", "-1"),
            ("OVERRIDE_HALFLIFE", "soon"),
        ] {
            let result = DaemonConfig::default().finish(vars(&[(key, value)]));
            assert!(result.is_err(), "{key}={value} should be rejected");
        }
    }

    #[test]
    fn invalid_ranking_fails_load() {
        let config = DaemonConfig::parse("[ranking]\nkind = \"additive\"\nboost = 0.0\n").unwrap();
        assert!(config.finish(vars(&[])).is_err());
    }

    #[test]
    fn zero_capacity_fails_validation() {
        let config = DaemonConfig::parse("[model]\ncapacity = 0\n").unwrap();
        assert!(config.model.validate().is_err());
    }
}

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use log::debug;

/// Prefix of the environment variables that override configuration values, e.g.
/// `CADENCE_DATABASE` or `CADENCE_BUSY_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "CADENCE_";

/// Storage settings.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. Optional JSON file
/// 3. `CADENCE_*` environment variables
#[derive(serde::Deserialize, serde::Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path of the SQLite database file, or `:memory:`.
    pub database: PathBuf,
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("cadence.db"),
            busy_timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::figment(path)?.merge(env_provider()).extract()?)
    }

    /// Defaults merged with the given file, without environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::figment(Some(path))?.extract()?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Figment::from(Serialized::defaults(Config::default()))
            .merge(Json::string(json))
            .extract()?)
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.database.as_os_str() == ":memory:"
    }

    fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let Some(path) = path else {
            return Ok(figment);
        };
        // Missing files are skipped silently by figment, a file named explicitly must exist.
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        debug!("reading configuration from {}", path.display());
        Ok(figment.merge(Json::file(path)))
    }
}

fn env_provider() -> Env {
    Env::prefixed(ENV_PREFIX).only(&["database", "busy_timeout_ms"])
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("configuration file {0} not found")]
    Missing(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(value: figment::Error) -> Self {
        ConfigError::Invalid(Box::new(value))
    }
}

#[cfg(test)]
mod tests {
    use figment::Jail;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_from_json_partial() {
        assert_eq!(
            Config::from_json(r#"{"database": "/var/lib/cadence/cadence.db"}"#).unwrap(),
            Config {
                database: PathBuf::from("/var/lib/cadence/cadence.db"),
                ..Config::default()
            }
        );
    }

    #[rstest]
    #[case(r#"{"database": 1}"#)]
    #[case(r#"{"timeout": 100}"#)]
    #[case("database")]
    fn test_from_json_invalid(#[case] json: &str) {
        assert!(matches!(
            Config::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "cadence.json",
                r#"{"database": ":memory:", "busy_timeout_ms": 250}"#,
            )?;
            let config = Config::from_file(Path::new("cadence.json")).unwrap();
            assert!(config.is_in_memory());
            assert_eq!(config.busy_timeout_ms, 250);
            Ok(())
        });
    }

    #[test]
    fn test_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Config::from_file(&dir.path().join("missing.json")),
            Err(ConfigError::Missing(_))
        ));
    }

    #[test]
    fn test_load_environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("cadence.json", r#"{"database": "file.db", "busy_timeout_ms": 250}"#)?;
            jail.set_env("CADENCE_DATABASE", "/tmp/other.db");
            jail.set_env("CADENCE_BUSY_TIMEOUT_MS", "100");
            jail.set_env("CADENCE_UNRELATED", "ignored");
            assert_eq!(
                Config::load(Some(Path::new("cadence.json"))).unwrap(),
                Config {
                    database: PathBuf::from("/tmp/other.db"),
                    busy_timeout_ms: 100,
                }
            );
            Ok(())
        });
    }

    #[test]
    fn test_load_defaults() {
        Jail::expect_with(|_| {
            assert_eq!(Config::load(None).unwrap(), Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_invalid_timeout() {
        Jail::expect_with(|jail| {
            jail.set_env("CADENCE_BUSY_TIMEOUT_MS", "soon");
            assert!(matches!(Config::load(None), Err(ConfigError::Invalid(_))));
            Ok(())
        });
    }
}

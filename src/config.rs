use serde::{Deserialize, Serialize};

use std::{env, fs, path::Path};

/// Names a YAML file to read instead of the process environment.
pub const CONFIG_PATH_VAR: &str = "NOTES_SERVER_CONFIG";

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Postgres connection string (`PG_DSN`). Persistence is disabled without it.
    #[serde(default)]
    pub pg_dsn: Option<String>,
    /// HTTP listen port (`PORT`).
    #[serde(default = "default_port")]
    pub port: u16,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}

pub fn load_config() -> Result<Config, ConfigError> {
    // Try the file named by the env variable first
    if let Ok(config_path) = env::var(CONFIG_PATH_VAR) {
        if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from '{}'", config_path);
            return from_yaml_file(Path::new(&config_path));
        }

        tracing::warn!(
            "Config file '{}' not found, falling back to environment variables",
            config_path
        );
    }

    from_env_vars(env::vars())
}

fn from_yaml_file(path: &Path) -> Result<Config, ConfigError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

fn from_env_vars<I>(vars: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = (String, String)>,
{
    Ok(envy::from_iter(vars)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = from_env_vars(Vec::new()).unwrap();

        assert_eq!(config.pg_dsn, None);
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn reads_dsn_and_port_from_environment() {
        let config = from_env_vars(vars(&[
            ("PG_DSN", "postgres://notes:notes@db:5432/notes"),
            ("PORT", "9090"),
            ("UNRELATED", "ignored"),
        ]))
        .unwrap();

        assert_eq!(
            config.pg_dsn.as_deref(),
            Some("postgres://notes:notes@db:5432/notes")
        );
        assert_eq!(config.port, 9090);
    }

    #[rstest]
    #[case("not-a-number")]
    #[case("70000")]
    #[case("-1")]
    fn rejects_invalid_port(#[case] port: &str) {
        let result = from_env_vars(vars(&[("PORT", port)]));

        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "pg_dsn: host=localhost user=notes\nport: 8081").unwrap();

        let config = from_yaml_file(file.path()).unwrap();

        assert_eq!(config.pg_dsn.as_deref(), Some("host=localhost user=notes"));
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn yaml_file_without_dsn_leaves_persistence_disabled() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 8000").unwrap();

        let config = from_yaml_file(file.path()).unwrap();

        assert_eq!(config.pg_dsn, None);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: [8000").unwrap();

        assert!(matches!(
            from_yaml_file(file.path()),
            Err(ConfigError::Yaml(_))
        ));
    }
}

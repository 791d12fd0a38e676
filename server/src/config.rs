//! Configuration management for the mock node.

use std::env;

/// Node configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Listen address
    pub host: String,
    /// Listen port
    pub port: u16,
    /// Buckets served by this node
    pub buckets: Vec<String>,
    /// Password every bucket requires; any password is accepted when unset
    pub password: Option<String>,
    /// Partitions per bucket
    pub partitions: u16,
    /// Replica copies per partition
    pub replicas: u8,
    /// Whether observe reports mutations as persisted
    pub persist: bool,
    /// Whether mutation responses carry tokens
    pub mutation_tokens: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8091,
            buckets: vec!["default".to_string()],
            password: None,
            partitions: 64,
            replicas: 1,
            persist: true,
            mutation_tokens: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let buckets = match lookup("MOCK_BUCKETS") {
            Some(raw) => {
                let names: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                if names.is_empty() {
                    return Err(ConfigError::NoBuckets);
                }
                names
            }
            None => defaults.buckets,
        };

        let password = lookup("MOCK_PASSWORD").filter(|p| !p.is_empty());

        let partitions = match lookup("MOCK_PARTITIONS") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::Invalid("MOCK_PARTITIONS", raw)),
            },
            None => defaults.partitions,
        };

        let replicas = match lookup("MOCK_REPLICAS") {
            Some(raw) => match raw.parse::<u8>() {
                Ok(n) if n <= 3 => n,
                _ => return Err(ConfigError::Invalid("MOCK_REPLICAS", raw)),
            },
            None => defaults.replicas,
        };

        let persist = parse_flag(&lookup, "MOCK_PERSIST", defaults.persist)?;
        let mutation_tokens =
            parse_flag(&lookup, "MOCK_MUTATION_TOKENS", defaults.mutation_tokens)?;

        Ok(Self {
            host,
            port,
            buckets,
            password,
            partitions,
            replicas,
            persist,
            mutation_tokens,
        })
    }
}

fn parse_flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match lookup(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(name, raw)),
        },
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("MOCK_BUCKETS must name at least one bucket")]
    NoBuckets,

    #[error("Invalid {0} value: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(Config::from_lookup(lookup(&[])).unwrap(), Config::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "11210"),
            ("MOCK_BUCKETS", "default, travel-sample"),
            ("MOCK_PASSWORD", "secret"),
            ("MOCK_PARTITIONS", "1024"),
            ("MOCK_REPLICAS", "2"),
            ("MOCK_PERSIST", "false"),
            ("MOCK_MUTATION_TOKENS", "0"),
        ]))
        .unwrap();

        assert_eq!(config.port, 11210);
        assert_eq!(config.buckets, vec!["default", "travel-sample"]);
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.partitions, 1024);
        assert_eq!(config.replicas, 2);
        assert!(!config.persist);
        assert!(!config.mutation_tokens);
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            Config::from_lookup(lookup(&[("PORT", "http")])),
            Err(ConfigError::InvalidPort)
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("MOCK_BUCKETS", " , ")])),
            Err(ConfigError::NoBuckets)
        );
        assert!(matches!(
            Config::from_lookup(lookup(&[("MOCK_REPLICAS", "4")])),
            Err(ConfigError::Invalid("MOCK_REPLICAS", _))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MOCK_PARTITIONS", "0")])),
            Err(ConfigError::Invalid("MOCK_PARTITIONS", _))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("MOCK_PERSIST", "maybe")])),
            Err(ConfigError::Invalid("MOCK_PERSIST", _))
        ));
    }
}

//! Process configuration read from the environment.
//!
//! Every knob has a default, so an empty environment yields a working
//! file-backed setup. Parsing goes through [`AppConfig::from_lookup`] so tests
//! can supply variables without touching the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use labinv_inventory::Limits;
use labinv_observability::LogFormat;
use thiserror::Error;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be set")]
    Missing(&'static str),
}

impl ConfigError {
    fn invalid(var: &'static str, value: &str, reason: impl ToString) -> Self {
        Self::Invalid {
            var,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    Memory,
    #[default]
    File,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown store backend {other:?} (expected file, postgres or memory)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub url: String,
    /// Bound on establishing (and later acquiring) a connection.
    pub connect_timeout: Duration,
    pub max_connections: u32,
}

/// Which backend to open and where.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub data_dir: PathBuf,
    /// Present whenever `DATABASE_URL` is set; required for `Postgres`.
    pub postgres: Option<PostgresConfig>,
    pub seed_sample_data: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            postgres: None,
            seed_sample_data: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub limits: Limits,
    pub bind_addr: SocketAddr,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let backend = parse_or(&var, "LABINV_STORE", StoreBackend::default())?;
        let data_dir = var("LABINV_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let connect_timeout_secs: u64 =
            parse_or(&var, "LABINV_DB_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS)?;
        let max_connections: u32 =
            parse_or(&var, "LABINV_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::invalid(
                "LABINV_DB_MAX_CONNECTIONS",
                "0",
                "must be at least 1",
            ));
        }

        let postgres = var("DATABASE_URL").map(|url| PostgresConfig {
            url,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            max_connections,
        });
        if backend == StoreBackend::Postgres && postgres.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let seed_sample_data = match var("LABINV_SEED_SAMPLE_DATA") {
            None => true,
            Some(raw) => parse_flag(&raw)
                .ok_or_else(|| ConfigError::invalid("LABINV_SEED_SAMPLE_DATA", &raw, "expected a boolean"))?,
        };

        let max_price: Option<f64> = parse_opt(&var, "LABINV_MAX_PRICE")?;
        if let Some(p) = max_price {
            if !p.is_finite() || p < 0.0 {
                return Err(ConfigError::invalid(
                    "LABINV_MAX_PRICE",
                    &p.to_string(),
                    "must be a non-negative number",
                ));
            }
        }
        let max_number: Option<u32> = parse_opt(&var, "LABINV_MAX_NUMBER")?;

        let bind_addr = match var("LABINV_BIND_ADDR") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid("LABINV_BIND_ADDR", &raw, e))?,
            None => DEFAULT_BIND_ADDR
                .parse()
                .map_err(|e| ConfigError::invalid("LABINV_BIND_ADDR", DEFAULT_BIND_ADDR, e))?,
        };

        let log_format = parse_or(&var, "LABINV_LOG_FORMAT", LogFormat::default())?;

        Ok(Self {
            store: StoreConfig {
                backend,
                data_dir,
                postgres,
                seed_sample_data,
            },
            limits: Limits {
                max_price,
                max_number,
            },
            bind_addr,
            log_format,
        })
    }
}

fn parse_opt<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::invalid(name, &raw, e)),
        None => Ok(None),
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(var, name)?.unwrap_or(default))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.store, StoreConfig::default());
        assert_eq!(cfg.limits, Limits::default());
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = config(&[("LABINV_STORE", "postgres")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let cfg = config(&[
            ("LABINV_STORE", "Postgres"),
            ("DATABASE_URL", "postgres://lab@localhost/inventory"),
            ("LABINV_DB_CONNECT_TIMEOUT_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::Postgres);
        let pg = cfg.store.postgres.unwrap();
        assert_eq!(pg.connect_timeout, Duration::from_secs(3));
        assert_eq!(pg.max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = config(&[("LABINV_STORE", "  "), ("LABINV_DATA_DIR", "")]).unwrap();
        assert_eq!(cfg.store.backend, StoreBackend::File);
        assert_eq!(cfg.store.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn limits_and_flags_are_parsed() {
        let cfg = config(&[
            ("LABINV_MAX_PRICE", "1000"),
            ("LABINV_MAX_NUMBER", "500"),
            ("LABINV_SEED_SAMPLE_DATA", "off"),
            ("LABINV_LOG_FORMAT", "pretty"),
        ])
        .unwrap();
        assert_eq!(cfg.limits.max_price, Some(1000.0));
        assert_eq!(cfg.limits.max_number, Some(500));
        assert!(!cfg.store.seed_sample_data);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_values_are_rejected() {
        for (var, value) in [
            ("LABINV_STORE", "sqlite"),
            ("LABINV_BIND_ADDR", "localhost"),
            ("LABINV_MAX_PRICE", "-1"),
            ("LABINV_MAX_NUMBER", "lots"),
            ("LABINV_SEED_SAMPLE_DATA", "maybe"),
            ("LABINV_DB_MAX_CONNECTIONS", "0"),
            ("LABINV_LOG_FORMAT", "xml"),
        ] {
            let err = config(&[(var, value)]).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { var: v, .. } if *v == var),
                "{var}={value} gave {err:?}"
            );
        }
    }
}

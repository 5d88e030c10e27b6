use blindpoll::{ResubmitPolicy, DEFAULT_KEY_BITS};
use std::env::{var, VarError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not valid unicode")]
    NotUnicode(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub key_bits: usize,
    pub resubmit: ResubmitPolicy,

    /// Port for a network transport in front of the service
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_path = env_or("BLINDPOLL_DB_PATH", "./blindpoll.db")?;
        let key_bits = parse_var("BLINDPOLL_KEY_BITS", DEFAULT_KEY_BITS)?;
        let resubmit = parse_var("BLINDPOLL_RESUBMIT", ResubmitPolicy::default())?;
        let port = parse_var("BLINDPOLL_PORT", 12345)?;

        Ok(Config {
            db_path,
            key_bits,
            resubmit,
            port,
        })
    }

    pub fn service_config(&self) -> blindpoll::ServiceConfig {
        blindpoll::ServiceConfig {
            key_bits: self.key_bits,
            resubmit: self.resubmit,
        }
    }
}

fn env_or(name: &'static str, default: &str) -> Result<String, ConfigError> {
    match var(name) {
        Ok(val) => Ok(val),
        Err(VarError::NotPresent) => Ok(default.to_owned()),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: val }),
        Err(VarError::NotPresent) => Ok(default),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode(name)),
    }
}

use std::env;

use anyhow::Context;
use serde::Deserialize;
use tracing::{Level, info};

pub const DEFAULT_PREFIX: &str = "/api";
/// Variable selecting `.env` loading (`file`) or the plain process environment.
pub const ENV_SWITCH: &str = "env";

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default = "default_env")]
    pub env: String, // file / server
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub prefix: Option<String>,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_env() -> String {
    "file".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    7071
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            env: default_env(),
            host: default_host(),
            port: default_port(),
            prefix: None,
            log_dir: default_log_dir(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn prefix(&self) -> String {
        self.prefix
            .clone()
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
    }

    /// Falls back to INFO for unknown level names.
    pub fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

pub fn get_config() -> anyhow::Result<Config> {
    let env_var = env::var(ENV_SWITCH).unwrap_or_else(|_| default_env());
    if env_var == "file" {
        info!("using .env file as environment variables");
        let _ = dotenvy::dotenv();
    } else {
        info!("using server environment as environment variables");
    }
    envy::from_env::<Config>().context("invalid configuration in environment")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config: Config = envy::from_iter(vars(&[])).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 7071);
        assert_eq!(config.prefix(), "/api");
        assert_eq!(config.log_level(), Level::INFO);
    }

    #[test]
    fn environment_overrides_defaults() {
        let config: Config = envy::from_iter(vars(&[
            ("PORT", "8080"),
            ("PREFIX", "/charts"),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.prefix(), "/charts");
        assert_eq!(config.log_level(), Level::DEBUG);
    }

    #[test]
    fn switch_variable_sets_env_field() {
        let config: Config = envy::from_iter(vars(&[(ENV_SWITCH, "server")])).unwrap();
        assert_eq!(config.env, "server");
    }

    #[test]
    fn invalid_port_is_an_error() {
        assert!(envy::from_iter::<_, Config>(vars(&[("PORT", "not-a-port")])).is_err());
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = Config {
            log_level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(config.log_level(), Level::INFO);
    }
}

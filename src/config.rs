use crate::cli::Cli;
use crate::core::leaderboard::WinLookupPolicy;
use crate::error::BoardResult;
use crate::store::StoreBackend;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

const TRACE_LEVELS: [&'static str; 5] = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
const LOCAL_SETTINGS_YAML_FILE: &str = ".env.local.yaml";

// Environment variables read into the settings. Example:
// REDIS_HOST="redis" would set redis_host to the redis value.
const ENV_KEYS: [&'static str; 15] = [
    "trace_level",
    "host",
    "port",
    "store_backend",
    "redis_host",
    "redis_port",
    "redis_password",
    "redis_db",
    "redis_timeout_ms",
    "redis_max_retries",
    "redis_retry_backoff_ms",
    "points_key",
    "wins_key",
    "win_lookup_policy",
    "seed",
];

// All settings may be configured via the local yaml file, environment
// variables or command line flags, in increasing order of priority.
#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_trace_level")]
    trace_level: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub store_backend: StoreBackend,
    #[serde(default = "default_redis_host")]
    pub redis_host: String,
    #[serde(default = "default_redis_port")]
    pub redis_port: u16,
    pub redis_password: Option<String>,
    // Logical database, the namespace both keys live in
    #[serde(default)]
    pub redis_db: i64,
    #[serde(default = "default_redis_timeout_ms")]
    pub redis_timeout_ms: u64,
    #[serde(default = "default_redis_max_retries")]
    pub redis_max_retries: u32,
    #[serde(default = "default_redis_retry_backoff_ms")]
    pub redis_retry_backoff_ms: u64,
    #[serde(default = "default_points_key")]
    pub points_key: String,
    #[serde(default = "default_wins_key")]
    pub wins_key: String,
    #[serde(default)]
    pub win_lookup_policy: WinLookupPolicy,
    #[serde(default)]
    pub seed: bool,
}

impl Settings {
    pub fn new(cli: Cli) -> BoardResult<Self> {
        Ok(Settings::figment(cli).extract()?)
    }

    pub fn figment(cli: Cli) -> Figment {
        let mut figment = Figment::new();
        if Path::new(LOCAL_SETTINGS_YAML_FILE).exists() {
            println!(
                "\n######################################\n\
                   ##   Found '.env.local.yaml' file,  ##\n\
                   ##   loading local configuration.   ##\n\
                   ######################################\n\
                "
            );
            figment = figment.merge(Yaml::file(LOCAL_SETTINGS_YAML_FILE));
        }
        figment
            .merge(Env::raw().only(&ENV_KEYS))
            .merge(Serialized::defaults(cli))
    }

    pub fn get_trace_level(&self) -> Level {
        get_trace_level(&self.trace_level)
    }

    pub fn redis_timeout(&self) -> Duration {
        Duration::from_millis(self.redis_timeout_ms)
    }

    pub fn redis_retry_backoff(&self) -> Duration {
        Duration::from_millis(self.redis_retry_backoff_ms)
    }
}

fn get_trace_level(level_str: &str) -> Level {
    match level_str.to_uppercase().as_str() {
        level if level == TRACE_LEVELS[0] => Level::TRACE,
        level if level == TRACE_LEVELS[1] => Level::DEBUG,
        level if level == TRACE_LEVELS[2] => Level::INFO,
        level if level == TRACE_LEVELS[3] => Level::WARN,
        level if level == TRACE_LEVELS[4] => Level::ERROR,
        // Default trace level
        _ => Level::INFO,
    }
}

fn default_trace_level() -> String {
    "INFO".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_redis_host() -> String {
    "localhost".to_string()
}

fn default_redis_port() -> u16 {
    6379
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

fn default_redis_max_retries() -> u32 {
    2
}

fn default_redis_retry_backoff_ms() -> u64 {
    50
}

fn default_points_key() -> String {
    "leaderboard".to_string()
}

fn default_wins_key() -> String {
    "wins".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_without_any_source() {
        Jail::expect_with(|_jail| {
            let settings: Settings = Settings::figment(Cli::default()).extract()?;
            assert_eq!(settings.port, 8080);
            assert_eq!(settings.store_backend, StoreBackend::Redis);
            assert_eq!(settings.points_key, "leaderboard");
            assert_eq!(settings.wins_key, "wins");
            assert_eq!(settings.win_lookup_policy, WinLookupPolicy::Strict);
            assert_eq!(settings.redis_password, None);
            assert!(!settings.seed);
            assert_eq!(settings.get_trace_level(), Level::INFO);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_yaml_and_cli_overrides_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                LOCAL_SETTINGS_YAML_FILE,
                "redis_host: yaml-host\nport: 9000\nwin_lookup_policy: lenient\n",
            )?;
            jail.set_env("REDIS_HOST", "env-host");
            jail.set_env("TRACE_LEVEL", "debug");

            let cli = Cli {
                port: Some(9100),
                seed: true,
                ..Cli::default()
            };
            let settings: Settings = Settings::figment(cli).extract()?;
            assert_eq!(settings.redis_host, "env-host");
            assert_eq!(settings.port, 9100);
            assert!(settings.seed);
            assert_eq!(settings.win_lookup_policy, WinLookupPolicy::Lenient);
            assert_eq!(settings.get_trace_level(), Level::DEBUG);
            Ok(())
        });
    }

    #[test]
    fn unrelated_environment_is_ignored() {
        Jail::expect_with(|jail| {
            jail.set_env("SOME_OTHER_PORT", "not a number");
            let settings: Settings = Settings::figment(Cli::default()).extract()?;
            assert_eq!(settings.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn memory_flag_selects_memory_backend() {
        Jail::expect_with(|_jail| {
            let cli = Cli {
                store_backend: Some("memory".to_string()),
                ..Cli::default()
            };
            let settings: Settings = Settings::figment(cli).extract()?;
            assert_eq!(settings.store_backend, StoreBackend::Memory);
            Ok(())
        });
    }

    #[test]
    fn invalid_policy_is_a_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("WIN_LOOKUP_POLICY", "sometimes");
            let result = Settings::new(Cli::default());
            assert!(matches!(result, Err(crate::error::BoardError::Config(_))));
            Ok(())
        });
    }
}

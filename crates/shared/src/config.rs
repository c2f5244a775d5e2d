//! Application configuration management.
//!
//! Sources are layered: `config/default`, then `config/{RUN_MODE}`, then
//! `TALLY__*` environment variables (for example
//! `TALLY__LEDGER__ACCOUNT_CODES__SALARY_EXPENSE=5100`).

use std::collections::BTreeMap;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Overrides for the symbolic system account codes, keyed by the
    /// snake_case account key (e.g. `salary_expense`).
    #[serde(default)]
    pub account_codes: BTreeMap<String, String>,
    /// Prefix of the description given to reversal entries.
    #[serde(default = "default_reversal_prefix")]
    pub reversal_description_prefix: String,
}

fn default_reversal_prefix() -> String {
    "Reversal of".to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_codes: BTreeMap::new(),
            reversal_description_prefix: default_reversal_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Fallback `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info,sqlx=warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-missing")),
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally")),
                ("TALLY__LOG__JSON", Some("true")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally");
                assert_eq!(config.database.max_connections, 10);
                assert!(config.log.json);
                assert_eq!(config.ledger.reversal_description_prefix, "Reversal of");
                assert!(config.ledger.account_codes.is_empty());
            },
        );
    }

    #[test]
    fn test_account_code_overrides_from_environment() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-missing")),
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally")),
                (
                    "TALLY__LEDGER__ACCOUNT_CODES__SALARY_EXPENSE",
                    Some("5100"),
                ),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(
                    config
                        .ledger
                        .account_codes
                        .get("salary_expense")
                        .map(String::as_str),
                    Some("5100")
                );
            },
        );
    }

    #[test]
    fn test_missing_database_url_fails() {
        temp_env::with_vars(
            [
                ("RUN_MODE", Some("test-missing")),
                ("TALLY__DATABASE__URL", None::<&str>),
            ],
            || {
                assert!(AppConfig::load().is_err());
            },
        );
    }
}

//! Application configuration management.
//!
//! Configuration is loaded from an optional YAML file with environment variable overrides. The
//! file path defaults to `simplecrud.yaml` but can be specified via `-f` or the
//! `SIMPLECRUD_CONFIG` environment variable. A missing file is not an error: every field has a
//! default, except for the database connection string.
//!
//! ## Loading Priority
//!
//! Later sources override earlier ones:
//!
//! 1. **YAML config file**
//! 2. **Environment variables** prefixed with `SIMPLECRUD_`, `__` separating nested keys
//!    (e.g. `SIMPLECRUD_RETRY__MAX_RETRIES=5`)
//! 3. **DATABASE_URL** - overrides `database.url`
//! 4. **Positional DSN argument** on the command line
//!
//! ## Example
//!
//! ```yaml
//! database:
//!   url: postgresql://root@localhost:26257/defaultdb?sslmode=disable
//!   application_name: "$ docs_simplecrud_sqlx"
//!   pool:
//!     max_connections: 1
//! accounts:
//!   initial_balances: [1000, 250]
//! transfer:
//!   amount: 100
//! retry:
//!   max_retries: 3
//!   base_backoff: 100ms
//!   jitter: true
//! ```

use clap::{CommandFactory, Parser};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Test sqlx with CockroachDB.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Database connection string (default: value of the DATABASE_URL environment variable)
    #[arg(env = "DATABASE_URL", hide_env_values = true)]
    pub dsn: Option<String>,

    /// Print debug info
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file
    #[arg(short = 'f', long, env = "SIMPLECRUD_CONFIG", default_value = "simplecrud.yaml")]
    pub config: String,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub validate: bool,
}

impl Args {
    /// A configuration problem reported like a bad argument: usage on stderr and exit code 2.
    pub fn usage_error(err: impl std::fmt::Display) -> clap::Error {
        Args::command().error(clap::error::ErrorKind::ValueValidation, err)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Raw `DATABASE_URL`, folded into `database.url` by [`Config::load`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    pub database: DatabaseConfig,
    /// Accounts seeded at the start of the run
    pub accounts: AccountsConfig,
    pub transfer: TransferConfig,
    /// Serialization failure retry behaviour
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string, e.g. `postgresql://root@localhost:26257/defaultdb?sslmode=disable`
    pub url: String,
    /// Reported to the server and visible in its session listings
    pub application_name: String,
    pub pool: PoolSettings,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            application_name: "$ docs_simplecrud_sqlx".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

/// Connection pool parameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Maximum time to wait for a connection (seconds)
    pub acquire_timeout_secs: u64,
}

impl Default for PoolSettings {
    /// Statements run one after another, so a single connection is enough
    fn default() -> Self {
        Self {
            max_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

impl PoolSettings {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccountsConfig {
    /// Opening balances; the first account pays the second
    pub initial_balances: Vec<i64>,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            initial_balances: vec![1000, 250],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransferConfig {
    pub amount: i64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { amount: 100 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Attempts before giving up on a transaction
    pub max_retries: u32,
    /// Sleep before retry `n` is `2^n` times this
    #[serde(with = "humantime_serde")]
    pub base_backoff: Duration,
    /// Randomize each sleep by a factor in [0.5, 1.5)
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_millis(100),
            jitter: true,
        }
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let mut config: Self = Self::figment(args).extract()?;

        if let Some(url) = config.database_url.take().filter(|url| !url.is_empty()) {
            config.database.url = url;
        }

        if let Some(dsn) = args.dsn.as_deref().filter(|dsn| !dsn.is_empty()) {
            config.database.url = dsn.to_string();
        }

        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required fields
    pub fn validate(&self) -> Result<(), Error> {
        if self.database.url.trim().is_empty() {
            return Err(Error::InvalidConfig {
                message: "database connection string not set".to_string(),
            });
        }

        if self.database.pool.max_connections < 1 {
            return Err(Error::InvalidConfig {
                message: "Config validation: database.pool.max_connections must be at least 1".to_string(),
            });
        }

        if self.accounts.initial_balances.len() != 2 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "Config validation: accounts.initial_balances must list exactly 2 balances, got {}",
                    self.accounts.initial_balances.len()
                ),
            });
        }

        if let Some(balance) = self.accounts.initial_balances.iter().find(|balance| **balance < 0) {
            return Err(Error::InvalidConfig {
                message: format!("Config validation: initial balance {balance} cannot be negative"),
            });
        }

        if self.transfer.amount <= 0 {
            return Err(Error::InvalidConfig {
                message: format!("Config validation: transfer.amount must be positive, got {}", self.transfer.amount),
            });
        }

        if self.retry.max_retries < 1 {
            return Err(Error::InvalidConfig {
                message: "Config validation: retry.max_retries must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            .merge(Yaml::file(&args.config))
            // SIMPLECRUD_CONFIG names the file itself, it is not a config key
            .merge(Env::prefixed("SIMPLECRUD_").split("__").ignore(&["config"]))
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args(config: &str, dsn: Option<&str>) -> Args {
        Args {
            dsn: dsn.map(str::to_string),
            verbose: false,
            config: config.to_string(),
            validate: false,
        }
    }

    #[test]
    fn test_defaults_with_only_database_url() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgresql://root@localhost:26257/defaultdb");

            let config = Config::load(&args("missing.yaml", None))?;

            assert_eq!(config.database.url, "postgresql://root@localhost:26257/defaultdb");
            assert_eq!(config.database.application_name, "$ docs_simplecrud_sqlx");
            assert_eq!(config.database.pool.max_connections, 1);
            assert_eq!(config.database.pool.acquire_timeout(), Duration::from_secs(30));
            assert_eq!(config.accounts.initial_balances, vec![1000, 250]);
            assert_eq!(config.transfer.amount, 100);
            assert_eq!(config.retry.max_retries, 3);
            assert_eq!(config.retry.base_backoff, Duration::from_millis(100));
            assert!(config.retry.jitter);
            assert!(config.database_url.is_none());

            Ok(())
        });
    }

    #[test]
    fn test_yaml_file() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "");
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: postgresql://from-file:26257/bank
  application_name: tester
  pool:
    max_connections: 2
    acquire_timeout_secs: 5
accounts:
  initial_balances: [500, 0]
transfer:
  amount: 50
retry:
  max_retries: 7
  base_backoff: 250ms
  jitter: false
"#,
            )?;

            let config = Config::load(&args("test.yaml", None))?;

            assert_eq!(config.database.url, "postgresql://from-file:26257/bank");
            assert_eq!(config.database.application_name, "tester");
            assert_eq!(config.database.pool.max_connections, 2);
            assert_eq!(config.database.pool.acquire_timeout(), Duration::from_secs(5));
            assert_eq!(config.accounts.initial_balances, vec![500, 0]);
            assert_eq!(config.transfer.amount, 50);
            assert_eq!(config.retry.max_retries, 7);
            assert_eq!(config.retry.base_backoff, Duration::from_millis(250));
            assert!(!config.retry.jitter);

            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "");
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: postgresql://from-file:26257/bank
transfer:
  amount: 50
"#,
            )?;
            jail.set_env("SIMPLECRUD_TRANSFER__AMOUNT", "75");
            jail.set_env("SIMPLECRUD_RETRY__BASE_BACKOFF", "1s");
            jail.set_env("SIMPLECRUD_CONFIG", "test.yaml");

            let config = Config::load(&args("test.yaml", None))?;

            assert_eq!(config.database.url, "postgresql://from-file:26257/bank");
            assert_eq!(config.transfer.amount, 75);
            assert_eq!(config.retry.base_backoff, Duration::from_secs(1));

            Ok(())
        });
    }

    #[test]
    fn test_database_url_overrides_file_and_dsn_overrides_both() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: postgresql://from-file:26257/bank
"#,
            )?;
            jail.set_env("DATABASE_URL", "postgresql://from-env:26257/bank");

            let config = Config::load(&args("test.yaml", None))?;
            assert_eq!(config.database.url, "postgresql://from-env:26257/bank");

            let config = Config::load(&args("test.yaml", Some("postgresql://from-cli:26257/bank")))?;
            assert_eq!(config.database.url, "postgresql://from-cli:26257/bank");

            Ok(())
        });
    }

    #[test]
    fn test_missing_connection_string() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "");

            let err = Config::load(&args("missing.yaml", None)).unwrap_err();
            assert!(err.to_string().contains("database connection string not set"));

            let err = Config::load(&args("missing.yaml", Some(""))).unwrap_err();
            assert!(err.to_string().contains("database connection string not set"));

            Ok(())
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "test.yaml",
                r#"
database:
  url: postgresql://localhost:26257/bank
  hostname: oops
"#,
            )?;

            assert!(Config::load(&args("test.yaml", None)).is_err());

            Ok(())
        });
    }

    #[test]
    fn test_missing_connection_string_is_a_usage_error() {
        Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "");

            let err = Args::usage_error(Config::load(&args("missing.yaml", None)).unwrap_err());
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
            assert_eq!(err.exit_code(), 2);
            assert!(err.to_string().contains("database connection string not set"));

            Ok(())
        });
    }

    #[test]
    fn test_parse_args() {
        Jail::expect_with(|_| {
            let args = Args::try_parse_from(["simplecrud", "--validate", "-v", "-f", "other.yaml", "postgresql://cli:26257/bank"])
                .map_err(|e| e.to_string())?;
            assert!(args.validate);
            assert!(args.verbose);
            assert_eq!(args.config, "other.yaml");
            assert_eq!(args.dsn.as_deref(), Some("postgresql://cli:26257/bank"));

            assert!(Args::try_parse_from(["simplecrud", "--no-such-flag"]).is_err());

            Ok(())
        });
    }

    fn valid() -> Config {
        Config {
            database: DatabaseConfig {
                url: "postgresql://localhost:26257/bank".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_accepts_defaults_with_url() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_pool_size() {
        let mut config = valid();
        config.database.pool.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_account_count() {
        let mut config = valid();
        config.accounts.initial_balances = vec![1000];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("exactly 2 balances"));

        config.accounts.initial_balances = vec![1, 2, 3];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_balance() {
        let mut config = valid();
        config.accounts.initial_balances = vec![1000, -1];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cannot be negative"));
    }

    #[test]
    fn test_validate_rejects_non_positive_amount() {
        let mut config = valid();
        config.transfer.amount = 0;
        assert!(config.validate().is_err());

        config.transfer.amount = -5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = valid();
        config.retry.max_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_retries"));
    }
}

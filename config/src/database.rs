use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{envy_load, load_config};

/// Connection-pool and statement-level settings for the Postgres backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "DatabaseConfig::default_pool_size")]
    pub pool_size: u32,
    pub statement_timeout_sec: Option<u64>,
}

impl DatabaseConfig {
    const fn default_pool_size() -> u32 {
        10
    }

    pub fn from_env() -> Self {
        envy_load("tlog_database", "TLOG_DATABASE_")
    }

    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_sec.map(Duration::from_secs)
    }
}

pub fn load_database_config() -> Result<DatabaseConfig, config::ConfigError> {
    load_config("configuration/database", "TLOG_DATABASE")
}

/// Write-admission quota thresholds (spec §4.5). Only the `Global`/`Write`
/// scope is enforced by the engine; the fields here configure how the
/// backlog of unsequenced leaves is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "QuotaConfig::default_max_unsequenced_rows")]
    pub max_unsequenced_rows: u64,
    /// `true`: accurate but expensive `SELECT COUNT(*)` against the queue
    /// table. `false`: a constant-time estimate from
    /// `pg_stat_user_tables`, which lags reality (spec §4.5).
    #[serde(default)]
    pub use_select_count: bool,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_unsequenced_rows: Self::default_max_unsequenced_rows(),
            use_select_count: false,
        }
    }
}

impl QuotaConfig {
    const fn default_max_unsequenced_rows() -> u64 {
        1_000_000
    }

    pub fn from_env() -> Self {
        envy_load("tlog_quota", "TLOG_QUOTA_")
    }
}

pub fn load_quota_config() -> Result<QuotaConfig, config::ConfigError> {
    load_config("configuration/quota", "TLOG_QUOTA")
}

#[cfg(test)]
mod tests {
    use crate::utils::tests::EnvMutex;

    use super::{load_database_config, DatabaseConfig};

    static MUTEX: EnvMutex = EnvMutex::new();

    #[test]
    fn test_load_database_config() {
        let mut lock = MUTEX.lock();
        let config = r#"
            TLOG_DATABASE_URL=postgres://localhost/tlog
            TLOG_DATABASE_POOL_SIZE=20
            TLOG_DATABASE_STATEMENT_TIMEOUT_SEC=30
        "#;
        lock.set_env(config);

        let db_config = load_database_config().expect("failed to load db config");
        assert_eq!(
            db_config,
            DatabaseConfig {
                url: "postgres://localhost/tlog".to_string(),
                pool_size: 20,
                statement_timeout_sec: Some(30),
            }
        );
    }
}

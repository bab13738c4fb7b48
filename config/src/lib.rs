use serde::de::DeserializeOwned;

pub mod database;
pub mod utils;

pub use database::{
    load_database_config, load_quota_config, DatabaseConfig, QuotaConfig,
};

pub fn envy_load<T: DeserializeOwned>(name: &str, prefix: &str) -> T {
    envy_try_load(prefix).unwrap_or_else(|_| {
        panic!("Cannot load config <{}>: {}", name, prefix);
    })
}

pub fn envy_try_load<T: DeserializeOwned>(prefix: &str) -> Result<T, envy::Error> {
    envy::prefixed(prefix).from_env()
}

/// Loads a config section from an optional `{path}.yaml`/`{path}.toml` file,
/// with environment variables under `{env_prefix}_*` taking precedence.
pub fn load_config<T: DeserializeOwned>(
    path: &str,
    env_prefix: &str,
) -> Result<T, config::ConfigError> {
    config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix(env_prefix).separator("_"))
        .build()?
        .try_deserialize()
}

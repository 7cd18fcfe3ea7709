use clap::Args;

/// Collection used when none is configured.
pub const DEFAULT_COLLECTION: &str = "casbin";

/// Settings the policy adapter is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Collection holding one document per rule
    pub collection: String,
}

impl AdapterConfig {
    pub fn new(collection: impl Into<String>) -> Self {
        AdapterConfig {
            collection: collection.into(),
        }
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig::new(DEFAULT_COLLECTION)
    }
}

/// Process configuration for the rulestore tool.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// PostgreSQL connection URL of the document store
    #[arg(
        long,
        default_value = "postgres://localhost/rulestore",
        env = "RULESTORE_DATABASE_URL"
    )]
    pub database_url: String,

    /// Collection holding the policy rules
    #[arg(long, default_value = DEFAULT_COLLECTION, env = "RULESTORE_COLLECTION")]
    pub collection: String,

    /// Minimum pooled connections
    #[arg(long, default_value = "1", env = "RULESTORE_MIN_CONNECTIONS")]
    pub min_connections: u32,

    /// Maximum pooled connections
    #[arg(long, default_value = "5", env = "RULESTORE_MAX_CONNECTIONS")]
    pub max_connections: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    pub log_level: String,

    /// Apply pending migrations before running the command
    #[arg(long, default_value = "false", env = "RULESTORE_RUN_MIGRATIONS")]
    pub run_migrations: bool,
}

impl Config {
    /// Adapter settings derived from this configuration.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig::new(self.collection.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "postgres://localhost/rulestore".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            min_connections: 1,
            max_connections: 5,
            log_level: "info".to_string(),
            run_migrations: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.collection, "casbin");
        assert_eq!(config.max_connections, 5);
        assert!(!config.run_migrations);
    }

    #[test]
    fn test_adapter_config() {
        let config = Config {
            collection: "rules".to_string(),
            ..Default::default()
        };

        assert_eq!(config.adapter_config(), AdapterConfig::new("rules"));
        assert_eq!(AdapterConfig::default().collection, DEFAULT_COLLECTION);
    }
}

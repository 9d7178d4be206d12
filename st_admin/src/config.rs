//! Operator configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use studio_tournament::{
    db::DatabaseConfig,
    tournament::{GenerationConfig, partition::MIN_GROUP_MEMBERS},
};

/// Complete configuration loaded from `.env`, the environment and CLI overrides
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Database configuration
    pub database: DatabaseConfig,
    /// Generation settings applied on top of each competition's record
    pub defaults: GenerationDefaults,
}

/// Generation settings that override what the competition record stores.
///
/// Unset fields leave the competition's own value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationDefaults {
    /// Number of tables matches rotate across
    pub table_count: Option<u32>,
    /// Minutes reserved per match
    pub slot_interval_mins: Option<u32>,
    /// Fixed group size for group+knockout competitions
    pub group_size: Option<usize>,
}

impl GenerationDefaults {
    /// Overlay these defaults on a competition-derived configuration
    pub fn apply(&self, mut config: GenerationConfig) -> GenerationConfig {
        if let Some(tables) = self.table_count {
            config = config.with_tables(tables);
        }
        if let Some(minutes) = self.slot_interval_mins {
            config = config.with_slot_interval(minutes);
        }
        if let Some(size) = self.group_size {
            config = config.with_group_size(size);
        }
        config
    }
}

impl AdminConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Returns
    ///
    /// * `Result<AdminConfig, ConfigError>` - Loaded configuration or error
    ///
    /// # Errors
    ///
    /// Returns error if a generation default is set but not a number
    pub fn from_env(database_url_override: Option<String>) -> Result<Self, ConfigError> {
        let mut database = DatabaseConfig::from_env();
        if let Some(url) = database_url_override {
            database.database_url = url;
        }

        let defaults = GenerationDefaults {
            table_count: parse_env_opt("DEFAULT_TABLE_COUNT")?,
            slot_interval_mins: parse_env_opt("DEFAULT_SLOT_INTERVAL_MINS")?,
            group_size: parse_env_opt("DEFAULT_GROUP_SIZE")?,
        };

        Ok(AdminConfig { database, defaults })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: format!(
                    "Must be at least DB_MIN_CONNECTIONS ({})",
                    self.database.min_connections
                ),
            });
        }

        if self.defaults.table_count == Some(0) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_TABLE_COUNT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.defaults.slot_interval_mins == Some(0) {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_SLOT_INTERVAL_MINS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self
            .defaults
            .group_size
            .is_some_and(|size| size < MIN_GROUP_MEMBERS)
        {
            return Err(ConfigError::Invalid {
                var: "DEFAULT_GROUP_SIZE".to_string(),
                reason: format!("Must be at least {MIN_GROUP_MEMBERS}"),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Read an optional numeric environment variable.
///
/// Unset or empty means `None`; anything else must parse.
fn parse_env_opt<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => {
            value
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    var: key.to_string(),
                    reason: e.to_string(),
                })
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use studio_tournament::TournamentFormat;

    fn config(defaults: GenerationDefaults) -> AdminConfig {
        AdminConfig {
            database: DatabaseConfig {
                database_url: "postgres://localhost/studio_test".to_string(),
                max_connections: 5,
                min_connections: 1,
                connection_timeout_secs: 5,
                idle_timeout_secs: 300,
                max_lifetime_secs: 1800,
            },
            defaults,
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "DEFAULT_TABLE_COUNT".to_string(),
            reason: "Must be greater than 0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DEFAULT_TABLE_COUNT"));
        assert!(msg.contains("greater than 0"));
    }

    #[test]
    fn test_validation_accepts_unset_defaults() {
        assert!(config(GenerationDefaults::default()).validate().is_ok());
    }

    #[test]
    fn test_validation_zero_tables() {
        let err = config(GenerationDefaults {
            table_count: Some(0),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DEFAULT_TABLE_COUNT"));
    }

    #[test]
    fn test_validation_group_size_too_small() {
        let err = config(GenerationDefaults {
            group_size: Some(1),
            ..Default::default()
        })
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "DEFAULT_GROUP_SIZE"));
    }

    #[test]
    fn test_validation_connection_bounds() {
        let mut admin = config(GenerationDefaults::default());
        admin.database.min_connections = 10;
        admin.database.max_connections = 2;
        assert!(admin.validate().is_err());
    }

    #[test]
    fn test_defaults_overlay() {
        let base = GenerationConfig::new(TournamentFormat::GroupKnockout, Utc::now());
        let applied = GenerationDefaults {
            table_count: Some(3),
            slot_interval_mins: None,
            group_size: Some(5),
        }
        .apply(base.clone());

        assert_eq!(applied.table_count, 3);
        assert_eq!(applied.slot_interval_mins, base.slot_interval_mins);
        assert_eq!(applied.group_size, Some(5));
    }

    #[test]
    fn test_unset_variable_is_none() {
        let value: Option<u32> = parse_env_opt("ST_ADMIN_TEST_UNSET_VARIABLE").unwrap();
        assert_eq!(value, None);
    }
}

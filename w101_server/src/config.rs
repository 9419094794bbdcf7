//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.
//! The library crate never reads the environment; everything it needs is
//! handed over from here by constructor.

use std::net::SocketAddr;
use w101::db::DatabaseConfig;
use w101::ledger::RewardConfig;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_DATABASE_URL: &str = "postgres://postgres@localhost/w101";
const MIN_JWT_SECRET_LEN: usize = 32;
const MIN_PEPPER_LEN: usize = 16;

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token signing and validation
    pub jwt: JwtConfig,
    /// Password hashing pepper (required)
    pub password_pepper: String,
    /// Daily and ad reward amounts and the ad cooldown
    pub rewards: RewardConfig,
    /// Balance granted to newly registered users
    pub starting_diamonds: i64,
    /// Apply pending migrations on startup
    pub run_migrations: bool,
    /// Prometheus exporter address; metrics are disabled when unset
    pub metrics_bind: Option<SocketAddr>,
}

/// Token settings
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing secret (required)
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_hours: i64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok(), bind_override, database_url_override)
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// `from_env` passes the process environment; tests pass a map.
    pub fn from_vars<F>(
        vars: F,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match bind_override {
            Some(addr) => addr,
            None => resolve_bind(&vars)?,
        };

        let database_url = database_url_override
            .or_else(|| vars("DATABASE_URL"))
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let mut database = DatabaseConfig::with_url(database_url);
        database.max_connections =
            parse_var_or(&vars, "DB_MAX_CONNECTIONS", database.max_connections);
        database.min_connections =
            parse_var_or(&vars, "DB_MIN_CONNECTIONS", database.min_connections);
        database.connection_timeout_secs =
            parse_var_or(&vars, "DB_CONNECTION_TIMEOUT_SECS", database.connection_timeout_secs);
        database.idle_timeout_secs =
            parse_var_or(&vars, "DB_IDLE_TIMEOUT_SECS", database.idle_timeout_secs);
        database.max_lifetime_secs =
            parse_var_or(&vars, "DB_MAX_LIFETIME_SECS", database.max_lifetime_secs);

        // Security configuration (REQUIRED)
        let secret = vars("JWT_SECRET").ok_or_else(|| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Generate with: openssl rand -hex 32".to_string(),
        })?;

        let password_pepper = vars("PASSWORD_PEPPER").ok_or_else(|| ConfigError::MissingRequired {
            var: "PASSWORD_PEPPER".to_string(),
            hint: "Generate with: openssl rand -hex 16".to_string(),
        })?;

        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET".to_string(),
                reason: format!("Must be at least {MIN_JWT_SECRET_LEN} characters"),
            });
        }

        if password_pepper.len() < MIN_PEPPER_LEN {
            return Err(ConfigError::Invalid {
                var: "PASSWORD_PEPPER".to_string(),
                reason: format!("Must be at least {MIN_PEPPER_LEN} characters"),
            });
        }

        let jwt = JwtConfig {
            secret,
            issuer: vars("JWT_ISSUER").unwrap_or_else(|| "w101".to_string()),
            audience: vars("JWT_AUDIENCE").unwrap_or_else(|| "w101-clients".to_string()),
            expiry_hours: parse_var_or(&vars, "JWT_EXPIRY_HOURS", 24),
        };

        let defaults = RewardConfig::default();
        let rewards = RewardConfig {
            daily_amount: parse_var_or(&vars, "DAILY_REWARD_AMOUNT", defaults.daily_amount),
            ad_amount: parse_var_or(&vars, "AD_REWARD_AMOUNT", defaults.ad_amount),
            ad_cooldown: chrono::Duration::minutes(parse_var_or(
                &vars,
                "AD_REWARD_COOLDOWN_MINUTES",
                defaults.ad_cooldown.num_minutes(),
            )),
        };

        let metrics_bind = match vars("METRICS_BIND") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("'{raw}' is not a socket address"),
            })?),
            None => None,
        };

        Ok(ServerConfig {
            bind,
            database,
            jwt,
            password_pepper,
            rewards,
            starting_diamonds: parse_var_or(&vars, "STARTING_DIAMONDS", 100),
            run_migrations: parse_var_or(&vars, "RUN_MIGRATIONS", true),
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rewards.daily_amount <= 0 {
            return Err(ConfigError::Invalid {
                var: "DAILY_REWARD_AMOUNT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rewards.ad_amount <= 0 {
            return Err(ConfigError::Invalid {
                var: "AD_REWARD_AMOUNT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.rewards.ad_cooldown <= chrono::Duration::zero() {
            return Err(ConfigError::Invalid {
                var: "AD_REWARD_COOLDOWN_MINUTES".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.starting_diamonds < 0 {
            return Err(ConfigError::Invalid {
                var: "STARTING_DIAMONDS".to_string(),
                reason: "Cannot be negative".to_string(),
            });
        }

        if self.jwt.expiry_hours <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_EXPIRY_HOURS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed DB_MAX_CONNECTIONS ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// `SERVER_BIND` wins over `PORT`; with neither, listen on all interfaces
fn resolve_bind<F>(vars: &F) -> Result<SocketAddr, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match (vars("SERVER_BIND"), vars("PORT")) {
        (Some(bind), _) => bind,
        (None, Some(port)) => format!("0.0.0.0:{port}"),
        (None, None) => DEFAULT_BIND.to_string(),
    };

    raw.parse().map_err(|_| ConfigError::Invalid {
        var: "SERVER_BIND".to_string(),
        reason: format!("'{raw}' is not a socket address"),
    })
}

/// Helper to parse a variable with default fallback
fn parse_var_or<F, T>(vars: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    vars(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn required() -> HashMap<&'static str, String> {
        HashMap::from([
            ("JWT_SECRET", "s".repeat(32)),
            ("PASSWORD_PEPPER", "p".repeat(16)),
        ])
    }

    fn load(vars: &HashMap<&'static str, String>) -> Result<ServerConfig, ConfigError> {
        ServerConfig::from_vars(|key| vars.get(key).cloned(), None, None)
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use openssl".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("JWT_SECRET"));
        assert!(msg.contains("Use openssl"));
    }

    #[test]
    fn test_defaults() {
        let config = load(&required()).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.database.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.jwt.expiry_hours, 24);
        assert_eq!(config.rewards.daily_amount, 50);
        assert_eq!(config.rewards.ad_amount, 25);
        assert_eq!(config.rewards.ad_cooldown, chrono::Duration::minutes(20));
        assert_eq!(config.starting_diamonds, 100);
        assert!(config.run_migrations);
        assert!(config.metrics_bind.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secrets() {
        let mut vars = required();
        vars.remove("JWT_SECRET");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingRequired { var, .. }) if var == "JWT_SECRET"
        ));

        let mut vars = required();
        vars.remove("PASSWORD_PEPPER");
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingRequired { var, .. }) if var == "PASSWORD_PEPPER"
        ));
    }

    #[test]
    fn test_short_secrets_rejected() {
        let mut vars = required();
        vars.insert("JWT_SECRET", "short".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));

        let mut vars = required();
        vars.insert("PASSWORD_PEPPER", "short".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_bind_resolution() {
        let mut vars = required();
        vars.insert("PORT", "5000".to_string());
        assert_eq!(load(&vars).unwrap().bind, "0.0.0.0:5000".parse().unwrap());

        vars.insert("SERVER_BIND", "127.0.0.1:7000".to_string());
        assert_eq!(load(&vars).unwrap().bind, "127.0.0.1:7000".parse().unwrap());

        vars.insert("SERVER_BIND", "nowhere".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));

        let overridden = ServerConfig::from_vars(
            |key| vars.get(key).cloned(),
            Some("127.0.0.1:9999".parse().unwrap()),
            Some("postgres://cli/db".to_string()),
        )
        .unwrap();
        assert_eq!(overridden.bind.port(), 9999);
        assert_eq!(overridden.database.database_url, "postgres://cli/db");
    }

    #[test]
    fn test_reward_overrides_and_validation() {
        let mut vars = required();
        vars.insert("DAILY_REWARD_AMOUNT", "75".to_string());
        vars.insert("AD_REWARD_COOLDOWN_MINUTES", "5".to_string());
        let config = load(&vars).unwrap();
        assert_eq!(config.rewards.daily_amount, 75);
        assert_eq!(config.rewards.ad_cooldown, chrono::Duration::minutes(5));

        vars.insert("AD_REWARD_AMOUNT", "0".to_string());
        let err = load(&vars).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("AD_REWARD_AMOUNT"));

        vars.insert("AD_REWARD_AMOUNT", "10".to_string());
        vars.insert("AD_REWARD_COOLDOWN_MINUTES", "0".to_string());
        let err = load(&vars).unwrap().validate().unwrap_err();
        assert!(err.to_string().contains("AD_REWARD_COOLDOWN_MINUTES"));
    }

    #[test]
    fn test_metrics_bind() {
        let mut vars = required();
        vars.insert("METRICS_BIND", "127.0.0.1:9090".to_string());
        assert_eq!(
            load(&vars).unwrap().metrics_bind,
            Some("127.0.0.1:9090".parse().unwrap())
        );

        vars.insert("METRICS_BIND", "bogus".to_string());
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }
}

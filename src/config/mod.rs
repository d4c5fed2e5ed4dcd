//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Configuration is loaded with the
//! `PAYDESK` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use paydesk::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod database;
mod error;
mod payment;
mod server;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use payment::PaymentConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe keys, link policy, pricing)
    pub payment: PaymentConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with the `PAYDESK` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `PAYDESK__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `PAYDESK__DATABASE__URL=...` -> `database.url = ...`
    /// - `PAYDESK__PAYMENT__STRIPE_API_KEY=...` -> `payment.stripe_api_key = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("PAYDESK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn set_minimal_env() {
        env::set_var("PAYDESK__DATABASE__URL", "postgresql://test@localhost/test");
        env::set_var("PAYDESK__PAYMENT__STRIPE_API_KEY", "sk_test_xxx");
        env::set_var("PAYDESK__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx");
        env::set_var("PAYDESK__PAYMENT__SUBSCRIPTION_PRICE_ID", "price_monthly");
        env::set_var(
            "PAYDESK__PAYMENT__FRONTEND_BASE_URL",
            "https://shop.example.com",
        );
    }

    fn clear_env() {
        env::remove_var("PAYDESK__DATABASE__URL");
        env::remove_var("PAYDESK__PAYMENT__STRIPE_API_KEY");
        env::remove_var("PAYDESK__PAYMENT__STRIPE_WEBHOOK_SECRET");
        env::remove_var("PAYDESK__PAYMENT__SUBSCRIPTION_PRICE_ID");
        env::remove_var("PAYDESK__PAYMENT__FRONTEND_BASE_URL");
        env::remove_var("PAYDESK__SERVER__PORT");
    }

    #[test]
    fn load_with_minimal_env_succeeds_and_validates() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();

        let config = AppConfig::load().unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.one_time_amount_minor, 200);
        assert!(!config.is_production());

        clear_env();
    }

    #[test]
    fn server_port_override_applies() {
        let _guard = ENV_MUTEX.lock().unwrap();
        set_minimal_env();
        env::set_var("PAYDESK__SERVER__PORT", "9090");

        let config = AppConfig::load().unwrap();
        assert_eq!(config.server.port, 9090);

        clear_env();
    }
}

//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `ADMIN_SECRET` (required): shared secret for the admin endpoints
/// - `DEFAULT_KEY_NAME` (optional): name of the well-known default key, defaults to "drakness"
/// - `KEY_DURATION_HOURS` (optional): key lifetime at creation, defaults to 24
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    /// Shared secret for the admin surface.
    ///
    /// Injected at startup rather than hard-coded so deployments can rotate
    /// it without a rebuild.
    pub admin_secret: String,

    #[serde(default = "default_key_name")]
    pub default_key_name: String,

    #[serde(default = "default_key_duration_hours")]
    pub key_duration_hours: i64,
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

/// Default well-known key name used by the create-default-key admin endpoint.
fn default_key_name() -> String {
    "drakness".to_string()
}

/// Default key lifetime in hours.
fn default_key_duration_hours() -> i64 {
    24
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL, ADMIN_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        assert_eq!(default_port(), 3000);
        assert_eq!(default_key_name(), "drakness");
        assert_eq!(default_key_duration_hours(), 24);
    }
}

//! Application configuration management.
//!
//! Configuration comes from environment variables (optionally seeded from a
//! `.env` file) and is deserialized with `envy` into a type-safe struct.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `DATABASE_MAX_CONNECTIONS` (optional): pool size, defaults to 5
/// - `CORS_ALLOWED_ORIGINS` (optional): `*` or a comma-separated origin list
/// - `WHATSAPP_API_BASE_URL` (optional): Graph API base, defaults to `https://graph.facebook.com`
/// - `CERTIFICATE_ALERT_DAYS` (optional): days before expiry that count as "expirando", defaults to 30
/// - `CERTIFICATE_CHECK_INTERVAL_SECS` (optional): certificate monitor period, 0 disables, defaults to 3600
/// - `HTTP_CLIENT_TIMEOUT_SECS` (optional): outbound HTTP/TCP timeout, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: String,

    #[serde(default = "default_whatsapp_base_url")]
    pub whatsapp_api_base_url: String,

    #[serde(default = "default_certificate_alert_days")]
    pub certificate_alert_days: i64,

    #[serde(default = "default_certificate_interval")]
    pub certificate_check_interval_secs: u64,

    #[serde(default = "default_http_timeout")]
    pub http_client_timeout_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_max_connections() -> u32 {
    5
}

fn default_cors_origins() -> String {
    "*".to_string()
}

fn default_whatsapp_base_url() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_certificate_alert_days() -> i64 {
    30
}

fn default_certificate_interval() -> u64 {
    3600
}

fn default_http_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first when present.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a value cannot be
    /// parsed into its expected type.
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>()
    }

    /// Explicit origins for the CORS layer, or `None` when any origin is allowed.
    pub fn cors_origins(&self) -> Option<Vec<String>> {
        let raw = self.cors_allowed_origins.trim();
        if raw.is_empty() || raw == "*" {
            return None;
        }
        Some(
            raw.split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        )
    }

    /// Configuration suitable for tests: lazy database URL and defaults everywhere else.
    pub fn for_tests(database_url: &str) -> Self {
        Self {
            database_url: database_url.to_string(),
            server_port: default_port(),
            database_max_connections: 1,
            cors_allowed_origins: default_cors_origins(),
            whatsapp_api_base_url: default_whatsapp_base_url(),
            certificate_alert_days: default_certificate_alert_days(),
            certificate_check_interval_secs: 0,
            http_client_timeout_secs: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_origin_allows_any() {
        let config = Config::for_tests("postgres://localhost/test");
        assert_eq!(config.cors_origins(), None);
    }

    #[test]
    fn origin_list_is_split_and_trimmed() {
        let mut config = Config::for_tests("postgres://localhost/test");
        config.cors_allowed_origins = "http://localhost:5173, https://erp.example.com,".into();
        assert_eq!(
            config.cors_origins(),
            Some(vec![
                "http://localhost:5173".to_string(),
                "https://erp.example.com".to_string()
            ])
        );
    }
}

use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

/// Process configuration, sourced from the environment at startup.
/// The payments-service URL and the operating wallet pointer used as the
/// sender side of every outgoing payment live here instead of being
/// hardcoded next to the client.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub payments_service_url: String,
    pub operating_wallet: String,
    pub cors_origin: Option<String>,
    pub session_ttl_hours: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Ok(Config {
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,
            database_url: env::var("DATABASE_URL")?,
            payments_service_url: env::var("PAYMENTS_SERVICE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3001".to_string()),
            operating_wallet: env::var("OPERATING_WALLET")?,
            cors_origin: env::var("CORS_ORIGIN").ok(),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
        })
    }
}

// config.rs
use std::env;

use crate::errors::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsProvider {
    Log,
    AfricasTalking,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub provider: SmsProvider,
    pub api_key: String,
    pub username: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub sms: SmsConfig,
    pub admin_phone: Option<String>,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup so it can be exercised without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend = match var("STORE_BACKEND").as_deref() {
            None | Some("mongo") => StoreBackend::Mongo,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(AppError::configuration(format!(
                    "STORE_BACKEND must be 'mongo' or 'memory', got '{}'",
                    other
                )))
            }
        };

        let database_url = match (store_backend, var("DATABASE_URL")) {
            (_, Some(url)) => url,
            (StoreBackend::Memory, None) => String::new(),
            (StoreBackend::Mongo, None) => {
                return Err(AppError::configuration("DATABASE_URL must be set"))
            }
        };

        let jwt_secret =
            var("JWT_SECRET").ok_or_else(|| AppError::configuration("JWT_SECRET must be set"))?;

        let jwt_ttl_hours = match var("JWT_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|h| *h > 0)
                .ok_or_else(|| AppError::configuration("JWT_TTL_HOURS must be a positive number"))?,
            None => 24,
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::configuration("PORT must be a number"))?,
            None => 5000,
        };

        let provider = match var("SMS_PROVIDER").as_deref() {
            None | Some("log") => SmsProvider::Log,
            Some("africastalking") => SmsProvider::AfricasTalking,
            Some(other) => {
                return Err(AppError::configuration(format!(
                    "SMS_PROVIDER must be 'log' or 'africastalking', got '{}'",
                    other
                )))
            }
        };

        let sms = SmsConfig {
            provider,
            api_key: var("SMS_API_KEY").unwrap_or_default(),
            username: var("SMS_USERNAME").unwrap_or_else(|| "sandbox".to_string()),
            from: var("SMS_FROM").unwrap_or_else(|| "UmojaFarms".to_string()),
        };

        if sms.provider == SmsProvider::AfricasTalking && sms.api_key.is_empty() {
            return Err(AppError::configuration(
                "SMS_API_KEY must be set when SMS_PROVIDER=africastalking",
            ));
        }

        Ok(AppConfig {
            store_backend,
            database_url,
            database_name: var("DATABASE_NAME").unwrap_or_else(|| "umoja_farms".to_string()),
            jwt_secret,
            jwt_ttl_hours,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            sms,
            admin_phone: var("ADMIN_PHONE"),
            admin_password: var("ADMIN_PASSWORD"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

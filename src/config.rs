use std::env;
use std::time::Duration;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub presence_ttl_secs: u64,
    pub default_offer_ttl_secs: u64,
    pub min_offer_ttl_secs: u64,
    pub max_offer_ttl_secs: u64,
    pub store_timeout_ms: u64,
    pub event_queue_size: usize,
    pub event_buffer_size: usize,
    pub publish_max_attempts: u32,
    pub sweep_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8080,
            log_level: "info".to_string(),
            presence_ttl_secs: 60,
            default_offer_ttl_secs: 15,
            min_offer_ttl_secs: 5,
            max_offer_ttl_secs: 60,
            store_timeout_ms: 500,
            event_queue_size: 1024,
            event_buffer_size: 1024,
            publish_max_attempts: 3,
            sweep_interval_ms: 1000,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            presence_ttl_secs: parse_or_default("PRESENCE_TTL_SECS", defaults.presence_ttl_secs)?,
            default_offer_ttl_secs: parse_or_default(
                "DEFAULT_OFFER_TTL_SECS",
                defaults.default_offer_ttl_secs,
            )?,
            min_offer_ttl_secs: parse_or_default("MIN_OFFER_TTL_SECS", defaults.min_offer_ttl_secs)?,
            max_offer_ttl_secs: parse_or_default("MAX_OFFER_TTL_SECS", defaults.max_offer_ttl_secs)?,
            store_timeout_ms: parse_or_default("STORE_TIMEOUT_MS", defaults.store_timeout_ms)?,
            event_queue_size: parse_or_default("EVENT_QUEUE_SIZE", defaults.event_queue_size)?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
            publish_max_attempts: parse_or_default(
                "PUBLISH_MAX_ATTEMPTS",
                defaults.publish_max_attempts,
            )?,
            sweep_interval_ms: parse_or_default("SWEEP_INTERVAL_MS", defaults.sweep_interval_ms)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.presence_ttl_secs == 0 {
            return Err(AppError::Internal("PRESENCE_TTL_SECS must be > 0".to_string()));
        }
        if self.min_offer_ttl_secs == 0 || self.min_offer_ttl_secs > self.max_offer_ttl_secs {
            return Err(AppError::Internal(
                "offer ttl bounds must satisfy 0 < MIN_OFFER_TTL_SECS <= MAX_OFFER_TTL_SECS"
                    .to_string(),
            ));
        }
        if !(self.min_offer_ttl_secs..=self.max_offer_ttl_secs)
            .contains(&self.default_offer_ttl_secs)
        {
            return Err(AppError::Internal(
                "DEFAULT_OFFER_TTL_SECS must lie within the offer ttl bounds".to_string(),
            ));
        }
        if self.event_queue_size == 0 || self.event_buffer_size == 0 {
            return Err(AppError::Internal("event queue sizes must be > 0".to_string()));
        }
        if self.publish_max_attempts == 0 {
            return Err(AppError::Internal("PUBLISH_MAX_ATTEMPTS must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn presence_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}

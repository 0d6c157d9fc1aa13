//! Configuration for the notification service

use core_config::{
    ConfigError, Environment, FromEnv, env_or_default, server::ServerConfig, stream::StreamConfig,
};
use domain_notifications::SmtpConfig;

/// Cron expression (with seconds) for the expiry sweep; every minute.
pub const DEFAULT_SWEEP_SCHEDULE: &str = "0 * * * * *";

/// Everything the service reads from the environment, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub smtp: SmtpConfig,
    pub sweep_schedule: String,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            environment: Environment::from_env(),
            server: ServerConfig::from_env()?,
            stream: StreamConfig::from_env()?,
            smtp: SmtpConfig::from_env()?,
            sweep_schedule: env_or_default("SWEEP_SCHEDULE", DEFAULT_SWEEP_SCHEDULE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("localhost")),
                ("SMTP_FROM_EMAIL", Some("noreply@four-x.com")),
                ("PORT", None),
                ("STREAM_TOPIC", None),
                ("STREAM_BACKOFF_MS", None),
                ("SWEEP_SCHEDULE", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.stream.topic, "notifications:requests");
                assert_eq!(config.stream.backoff_ms, 1000);
                assert_eq!(config.smtp.port, 465);
                assert_eq!(config.sweep_schedule, DEFAULT_SWEEP_SCHEDULE);
            },
        );
    }

    #[test]
    fn test_config_requires_smtp_host() {
        temp_env::with_vars(
            [("SMTP_HOST", None), ("SMTP_FROM_EMAIL", Some("noreply@four-x.com"))],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(matches!(err, ConfigError::MissingEnvVar(key) if key == "SMTP_HOST"));
            },
        );
    }

    #[test]
    fn test_config_rejects_bad_port() {
        temp_env::with_vars(
            [
                ("SMTP_HOST", Some("localhost")),
                ("SMTP_FROM_EMAIL", Some("noreply@four-x.com")),
                ("PORT", Some("eighty")),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("PORT"));
            },
        );
    }
}

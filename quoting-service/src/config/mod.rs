//! Configuration module for quoting-service.

use crate::derivation::RuleSet;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct QuotingConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub quote: QuoteConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct QuoteConfig {
    /// Rule set applied to every quote line edited through this service.
    pub rule_set: RuleSet,
}

impl QuotingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "quoting-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("DATABASE_URL is required"))
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            quote: QuoteConfig {
                rule_set: parse_rule_set(env::var("QUOTE_RULE_SET").ok().as_deref())?,
            },
        })
    }
}

/// Unset means the full rule set; an unrecognised name is a startup error.
fn parse_rule_set(raw: Option<&str>) -> Result<RuleSet, AppError> {
    match raw {
        None => Ok(RuleSet::default()),
        Some(raw) => RuleSet::from_string(raw).ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "QUOTE_RULE_SET must be 'full' or 'basic', got '{}'",
                raw
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_set_defaults_to_full_when_unset() {
        assert_eq!(parse_rule_set(None).unwrap(), RuleSet::Full);
        assert_eq!(parse_rule_set(Some("BASIC")).unwrap(), RuleSet::Basic);
    }

    #[test]
    fn unknown_rule_set_is_config_error() {
        let err = parse_rule_set(Some("basc")).unwrap_err();

        assert!(matches!(err, AppError::ConfigError(_)));
        assert!(err.to_string().contains("basc"));
    }
}

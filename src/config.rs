use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Settings for signing and validating bearer tokens
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub expiry_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub tokeninfo_url: String,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_key: Option<String>,
    pub sender_id: String,
    pub api_url: String,
    pub channel: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub from_address: String,
    pub from_name: String,
}

/// Application configuration, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub google: GoogleConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
    pub http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));
        let or_default = |name: &str, default: &str| get(name).unwrap_or_else(|| default.to_string());

        Ok(Self {
            host: or_default("HOST", "127.0.0.1"),
            port: parse_or(get("PORT"), "PORT", 8080)?,
            database_url: required("DATABASE_URL")?,
            jwt: JwtConfig {
                secret: required("JWT_SECRET")?,
                issuer: or_default("JWT_ISSUER", "linkoja"),
                audience: or_default("JWT_AUDIENCE", "linkoja-clients"),
                expiry_minutes: parse_or(get("JWT_EXPIRY_MINUTES"), "JWT_EXPIRY_MINUTES", 1440)?,
            },
            bcrypt_cost: parse_or(get("BCRYPT_COST"), "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            google: GoogleConfig {
                client_id: get("GOOGLE_CLIENT_ID"),
                tokeninfo_url: or_default(
                    "GOOGLE_TOKENINFO_URL",
                    "https://oauth2.googleapis.com/tokeninfo",
                ),
            },
            sms: SmsConfig {
                api_key: get("TERMII_API_KEY"),
                sender_id: or_default("TERMII_SENDER_ID", "Linkoja"),
                api_url: or_default("TERMII_API_URL", "https://api.ng.termii.com/api/sms/send"),
                channel: or_default("TERMII_CHANNEL", "generic"),
            },
            email: EmailConfig {
                api_url: get("EMAIL_API_URL"),
                api_key: get("EMAIL_API_KEY"),
                from_address: or_default("EMAIL_FROM_ADDRESS", "no-reply@linkoja.com"),
                from_name: or_default("EMAIL_FROM_NAME", "Linkoja"),
            },
            http_timeout: Duration::from_secs(parse_or(
                get("HTTP_CLIENT_TIMEOUT_SECS"),
                "HTTP_CLIENT_TIMEOUT_SECS",
                10,
            )?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/linkoja"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.jwt.issuer, "linkoja");
        assert_eq!(config.jwt.expiry_minutes, 1440);
        assert_eq!(config.bcrypt_cost, 12);
        assert_eq!(config.sms.channel, "generic");
        assert!(config.google.client_id.is_none());
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/x")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/x"),
            ("JWT_SECRET", "s"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }
}

use std::net::SocketAddr;
use thiserror::Error;

pub const ADDR_VAR: &str = "RUSTYTRACK_ADDR";
pub const MAX_UPLOAD_VAR: &str = "RUSTYTRACK_MAX_UPLOAD_BYTES";

const DEFAULT_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var} must be a socket address like 0.0.0.0:3000, got '{value}'")]
    InvalidAddr { var: &'static str, value: String },
    #[error("{var} must be a positive byte count, got '{value}'")]
    InvalidUploadLimit { var: &'static str, value: String },
}

/// Server settings; every field has a default so no configuration is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// Upper bound for one multipart request, both files included.
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_ADDR
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3000))),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ADDR_VAR) {
            config.bind_addr = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidAddr { var: ADDR_VAR, value })?;
        }

        if let Some(value) = lookup(MAX_UPLOAD_VAR) {
            config.max_upload_bytes = match value.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => {
                    return Err(ConfigError::InvalidUploadLimit {
                        var: MAX_UPLOAD_VAR,
                        value,
                    });
                }
            };
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn variables_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            (ADDR_VAR, "127.0.0.1:8080"),
            (MAX_UPLOAD_VAR, "1024"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.max_upload_bytes, 1024);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(ADDR_VAR, "localhost")])),
            Err(ConfigError::InvalidAddr { .. })
        ));
        assert!(matches!(
            AppConfig::from_lookup(lookup(&[(MAX_UPLOAD_VAR, "0")])),
            Err(ConfigError::InvalidUploadLimit { .. })
        ));
    }
}

//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", format_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::StoreBackendKind;
    use std::io::Write;

    #[test]
    fn loads_minimal_config() {
        let toml = r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [[mappings]]
            match_key = "/filings"
            upstream_base_url = "http://api.example.com/v1"
            rate_limit_per_second = 5

            [mappings.breaker]
            error_threshold = 3
            latency_ms = 1500
            cooldown_seconds = 10

            [store]
            backend = "sqlite"
            sqlite_path = "/tmp/state.db"
        "#;

        let path = std::env::temp_dir().join(format!("gateway-test-{}.toml", std::process::id()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = load_config(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.mappings.len(), 1);
        assert_eq!(config.mappings[0].match_key, "/filings");
        assert_eq!(config.mappings[0].breaker.error_threshold, 3);
        assert_eq!(config.store.backend, StoreBackendKind::Sqlite);
    }

    #[test]
    fn rejects_invalid_config() {
        let toml = r#"
            [[mappings]]
            match_key = "missing-slash"
            upstream_base_url = "https://api.example.com"
        "#;

        let path = std::env::temp_dir().join(format!("gateway-bad-{}.toml", std::process::id()));
        fs::write(&path, toml).unwrap();
        let result = load_config(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}

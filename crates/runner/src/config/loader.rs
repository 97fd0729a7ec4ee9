use std::path::Path;
use thiserror::Error;

use super::PipelineConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load pipeline configuration from a JSON file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Load configuration from a JSON string
pub fn load_config_from_str(json: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}

/// Load the default embedded configuration
pub fn load_default_config() -> Result<PipelineConfig, ConfigError> {
    let default_config = include_str!("pipeline_config.json");
    load_config_from_str(default_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use meridian_gateway::VenueId;
    use rust_decimal_macros::dec;

    #[test]
    fn test_load_default_config() {
        let config = load_default_config().unwrap();
        assert_eq!(config.feed.symbols, vec!["BTC", "ETH", "SOL"]);
        assert!(matches!(config.source, SourceConfig::Simulated(_)));
        assert_eq!(config.risk.max_daily_loss, dec!(2000));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = load_config_from_str("{}").unwrap();
        assert_eq!(config.ledger.initial_cash, dec!(10000));
        assert_eq!(config.signals.cooldown_secs, 300);
        assert!(config.auto_execute);
        assert!(config.feed.venues.is_empty());
    }

    #[test]
    fn test_partial_sections() {
        let config = load_config_from_str(
            r#"{
                "feed": { "symbols": ["ETH"], "venues": ["kraken"] },
                "source": { "kind": "http", "quote": "eur" },
                "risk": { "max_open_positions": 2 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.feed.venues, vec![VenueId::Kraken]);
        assert_eq!(config.risk.max_open_positions, 2);
        assert_eq!(config.risk.max_daily_loss, dec!(2000));
        match config.source {
            SourceConfig::Http(http) => assert_eq!(http.quote, "eur"),
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let err = load_config_from_str(r#"{ "feed": { "symbols": [] } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = load_config_from_str(
            r#"{ "signals": { "cooldown_secs": 600, "force_after_secs": 300 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = load_config_from_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config("/nonexistent/meridian.json").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}

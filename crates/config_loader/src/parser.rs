//! Profile parsing
//!
//! TOML is the primary format; JSON is accepted for generated profiles.

use contracts::{BenchProfile, ContractError};

/// Profile file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (preferred)
    Toml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse a TOML profile
pub fn parse_toml(content: &str) -> Result<BenchProfile, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse a JSON profile
pub fn parse_json(content: &str) -> Result<BenchProfile, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<BenchProfile, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SchedulerKind;

    #[test]
    fn test_parse_toml_full() {
        let content = r#"
version = "1"
scheduler = "tokio"

[dispatcher]
name = "orders"
capacity = 10
delay_ms = 1000

[load]
producers = 5
items_per_producer = 200
chunk_size = 5
interval_ms = 2
payload_bytes = 32

[processor]
work_per_item_us = 10
fail_every = 7
"#;
        let profile = parse_toml(content).unwrap();
        assert_eq!(profile.dispatcher.name, "orders");
        assert_eq!(profile.dispatcher.capacity, 10);
        assert_eq!(profile.scheduler, SchedulerKind::Tokio);
        assert_eq!(profile.load.total_items(), 1000);
        assert_eq!(profile.processor.fail_every, 7);
    }

    #[test]
    fn test_parse_toml_empty_uses_defaults() {
        let profile = parse_toml("").unwrap();
        assert_eq!(profile.dispatcher.capacity, 100);
        assert_eq!(profile.dispatcher.delay_ms, 500);
        assert_eq!(profile.scheduler, SchedulerKind::Thread);
    }

    #[test]
    fn test_parse_json_minimal() {
        let content = r#"{
            "dispatcher": { "capacity": 25, "delay_ms": 0 },
            "load": { "producers": 2 }
        }"#;
        let profile = parse_json(content).unwrap();
        assert_eq!(profile.dispatcher.capacity, 25);
        assert_eq!(profile.load.producers, 2);
        assert_eq!(profile.load.items_per_producer, 1000);
    }

    #[test]
    fn test_parse_unknown_scheduler() {
        let result = parse_toml(r#"scheduler = "fiber""#);
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ContractError::ConfigParse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("JSON"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}

//! # Config Loader
//!
//! Bench profile loading and parsing.
//!
//! Responsibilities:
//! - Parse TOML/JSON profile files
//! - Validate field ranges and cross-field rules
//! - Produce a `BenchProfile`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let profile = ConfigLoader::load_from_path(Path::new("bench.toml")).unwrap();
//! println!("capacity: {}", profile.dispatcher.capacity);
//! ```

mod parser;
mod validator;

pub use contracts::BenchProfile;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Profile loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a profile from a file path
    ///
    /// Format is detected from the extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<BenchProfile, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load a profile from a string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<BenchProfile, ContractError> {
        let profile = parser::parse(content, format)?;
        validator::validate(&profile)?;
        Ok(profile)
    }

    /// Validate an already-built profile (e.g. after CLI overrides)
    pub fn validate(profile: &BenchProfile) -> Result<(), ContractError> {
        validator::validate(profile)
    }

    /// Serialize a profile to TOML
    pub fn to_toml(profile: &BenchProfile) -> Result<String, ContractError> {
        toml::to_string_pretty(profile)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize a profile to JSON
    pub fn to_json(profile: &BenchProfile) -> Result<String, ContractError> {
        serde_json::to_string_pretty(profile)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}

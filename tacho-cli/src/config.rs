//! Configuration loading and parsing

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tacho_decoder::DecoderConfig;

/// Application configuration (loaded from a TOML file)
///
/// Every section is optional; command line flags override what is set here.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub decoder: DecoderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Certificate dataset replacing the bundled one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificates: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Indented JSON
    #[serde(default)]
    pub pretty: bool,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            certificates = "/etc/tacho/erca.json"

            [decoder]
            verify_signatures = true
            keep_raw_on_error = false

            [output]
            pretty = true
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.decoder.verify_signatures);
        assert!(!config.decoder.keep_raw_on_error);
        assert!(config.decoder.skip_empty_records);
        assert!(config.output.pretty);
        assert_eq!(config.certificates, Some(PathBuf::from("/etc/tacho/erca.json")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}

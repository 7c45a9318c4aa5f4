//! Decoder configuration types
//!
//! The decoder needs very little configuration: whether to run the signature
//! verification pass and how much of a malformed field to keep in the output.

use serde::{Deserialize, Serialize};

/// Configuration for the decoder library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Check every signed block against the certificate store
    #[serde(default)]
    pub verify_signatures: bool,

    /// Keep the raw payload of fields that failed to decode
    #[serde(default = "default_true")]
    pub keep_raw_on_error: bool,

    /// Drop all-zero entries from repeated record lists (unused card slots)
    #[serde(default = "default_true")]
    pub skip_empty_records: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            verify_signatures: false,
            keep_raw_on_error: true,
            skip_empty_records: true,
        }
    }
}

impl DecoderConfig {
    /// Create a new decoder configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable signature verification
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_signatures = enabled;
        self
    }

    /// Builder method: keep raw bytes of malformed fields
    pub fn with_raw_on_error(mut self, enabled: bool) -> Self {
        self.keep_raw_on_error = enabled;
        self
    }

    /// Builder method: skip all-zero repeated records
    pub fn with_skip_empty_records(mut self, enabled: bool) -> Self {
        self.skip_empty_records = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new()
            .with_verification(true)
            .with_raw_on_error(false)
            .with_skip_empty_records(false);

        assert!(config.verify_signatures);
        assert!(!config.keep_raw_on_error);
        assert!(!config.skip_empty_records);
    }

    #[test]
    fn test_defaults_match_serde_defaults() {
        let parsed: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, DecoderConfig::default());
        assert!(!parsed.verify_signatures);
        assert!(parsed.keep_raw_on_error);
        assert!(parsed.skip_empty_records);
    }
}

//! Main decoder API
//!
//! The [`Decoder`] owns a certificate store and a configuration and decodes
//! card and VU downloads held in memory. It keeps no state between calls, so
//! one decoder can be shared by any number of threads.

use crate::card::{self, Card};
use crate::certificates::CertificateStore;
use crate::config::DecoderConfig;
use crate::types::{Decoded, Result};
use crate::vu::{self, Vu};
use std::sync::Arc;

/// Entry point for all decoding operations
#[derive(Debug, Clone)]
pub struct Decoder {
    store: Arc<CertificateStore>,
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder backed by the embedded certificate store
    ///
    /// The store is loaded on the first call in a process and shared by
    /// every decoder created this way.
    pub fn new() -> Result<Self> {
        Ok(Self::with_store(CertificateStore::shared()?))
    }

    /// Create a decoder sharing an existing store
    ///
    /// # Example
    /// ```no_run
    /// use std::path::Path;
    /// use std::sync::Arc;
    /// use tacho_decoder::{CertificateStore, Decoder, DecoderConfig};
    ///
    /// let store = Arc::new(CertificateStore::from_path(Path::new("erca.json")).unwrap());
    /// let decoder = Decoder::with_store(store)
    ///     .with_config(DecoderConfig::new().with_verification(true));
    /// let card = decoder.decode_card(&std::fs::read("driver.ddd").unwrap()).unwrap();
    /// println!("{}", card.value.to_json(true).unwrap());
    /// ```
    pub fn with_store(store: Arc<CertificateStore>) -> Self {
        Self {
            store,
            config: DecoderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DecoderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &CertificateStore {
        &self.store
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a driver, workshop, control or company card download
    ///
    /// Fails only when fewer than two bytes are left where an element
    /// header should start; every other problem becomes a diagnostic.
    pub fn decode_card(&self, bytes: &[u8]) -> Result<Decoded<Card>> {
        log::debug!("Decoding card file ({} bytes)", bytes.len());
        if self.config.verify_signatures {
            let ring = card::key_ring(bytes, &self.store);
            card::decode(bytes, &self.config, Some(&ring))
        } else {
            card::decode(bytes, &self.config, None)
        }
    }

    /// Decode a vehicle unit download
    ///
    /// An unknown transfer tag stops the scan; what was decoded before it is
    /// returned together with a terminal diagnostic.
    pub fn decode_vu(&self, bytes: &[u8]) -> Result<Decoded<Vu>> {
        log::debug!("Decoding VU file ({} bytes)", bytes.len());
        let store = self.config.verify_signatures.then_some(&*self.store);
        vu::decode(bytes, &self.config, store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_inputs() {
        let decoder = Decoder::with_store(Arc::new(CertificateStore::empty()));
        let card = decoder.decode_card(&[]).unwrap();
        assert_eq!(card.value, Card::default());
        assert!(card.is_complete());

        let vu = decoder.decode_vu(&[]).unwrap();
        assert_eq!(vu.value, Vu::default());
        assert_eq!(vu.consumed, 0);
    }

    #[test]
    fn test_decoders_share_the_embedded_store() {
        let first = Decoder::new().unwrap();
        let second = Decoder::new().unwrap();
        assert!(std::ptr::eq(first.store(), second.store()));
    }

    #[test]
    fn test_config_is_kept() {
        let decoder = Decoder::with_store(Arc::new(CertificateStore::empty()))
            .with_config(DecoderConfig::new().with_verification(true));
        assert!(decoder.config().verify_signatures);
        assert_eq!(decoder.store().len(crate::types::Generation::Gen1), 0);
    }
}

//! Certificate store: trusted roots and member state keys
//!
//! A store is loaded from a JSON dataset, either the one bundled with the
//! crate or one read from disk, and is read-only afterwards.

use super::{resolve, Certificate, KeyIdentifier, KeyMaterial};
use crate::signature::{self, KeySource};
use crate::types::{Generation, HexBytes, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Certificate dataset bundled with the crate
const EMBEDDED_DATASET: &str = include_str!("../../data/certificates.json");

/// The bundled store, built on first use
static EMBEDDED: OnceCell<Arc<CertificateStore>> = OnceCell::new();

/// On-disk layout of a certificate dataset
#[derive(Debug, Deserialize)]
struct Dataset {
    version: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    first_gen_roots: Vec<RsaRoot>,
    #[serde(default)]
    first_gen_certificates: Vec<HexBytes>,
    #[serde(default)]
    second_gen_roots: Vec<EccRoot>,
    #[serde(default)]
    second_gen_certificates: Vec<HexBytes>,
}

#[derive(Debug, Deserialize)]
struct RsaRoot {
    key_identifier: KeyIdentifier,
    modulus: HexBytes,
    exponent: HexBytes,
}

#[derive(Debug, Deserialize)]
struct EccRoot {
    key_identifier: KeyIdentifier,
    curve: super::Curve,
    point: HexBytes,
}

/// Trusted public keys indexed by generation and key identifier
///
/// Built once and then only read, so a single store can be shared across
/// decoder threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct CertificateStore {
    version: String,
    first_gen: HashMap<KeyIdentifier, Certificate>,
    second_gen: HashMap<KeyIdentifier, Certificate>,
}

impl CertificateStore {
    /// A store with no keys: every lookup misses
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the dataset bundled with the crate
    pub fn embedded() -> Result<Self> {
        Self::from_dataset(EMBEDDED_DATASET)
    }

    /// The bundled store, loaded once per process and shared afterwards
    pub fn shared() -> Result<Arc<Self>> {
        EMBEDDED
            .get_or_try_init(|| Self::embedded().map(Arc::new))
            .map(Arc::clone)
    }

    /// Load a dataset file in the same JSON layout as the bundled one
    pub fn from_path(path: &Path) -> Result<Self> {
        log::debug!("Reading certificate dataset {:?}", path);
        let json = std::fs::read_to_string(path)?;
        Self::from_dataset(&json)
    }

    /// Load a JSON dataset of roots and member state certificates
    ///
    /// Certificates are admitted only once their issuer is in the store and
    /// their signature checks out; ones that never resolve are logged and
    /// left out.
    pub fn from_dataset(json: &str) -> Result<Self> {
        let dataset: Dataset = serde_json::from_str(json)?;
        log::info!("Loading certificate dataset {}", dataset.version);
        if !dataset.description.is_empty() {
            log::debug!("{}", dataset.description);
        }

        let mut store = Self {
            version: dataset.version,
            ..Self::default()
        };

        for root in dataset.first_gen_roots {
            let key = KeyMaterial::Rsa {
                modulus: root.modulus,
                exponent: root.exponent,
            };
            signature::validate_key(&key)?;
            store.insert(Certificate {
                key_identifier: root.key_identifier,
                generation: Generation::Gen1,
                key,
                authority_reference: None,
            });
        }
        for root in dataset.second_gen_roots {
            let key = KeyMaterial::Ecc {
                curve: root.curve,
                point: root.point,
            };
            signature::validate_key(&key)?;
            store.insert(Certificate {
                key_identifier: root.key_identifier,
                generation: Generation::Gen2V1,
                key,
                authority_reference: None,
            });
        }

        let mut pending: Vec<(Generation, HexBytes)> = dataset
            .first_gen_certificates
            .into_iter()
            .map(|c| (Generation::Gen1, c))
            .chain(
                dataset
                    .second_gen_certificates
                    .into_iter()
                    .map(|c| (Generation::Gen2V1, c)),
            )
            .collect();

        // Certificates may be listed before their issuer; keep sweeping
        // until a pass admits nothing new.
        loop {
            let before = pending.len();
            pending.retain(|(generation, bytes)| match resolve(&store, *generation, bytes) {
                Ok(Some(certificate)) => {
                    log::debug!(
                        "Admitted {} certificate {}",
                        certificate.generation,
                        certificate.key_identifier
                    );
                    store.insert(certificate);
                    false
                }
                Ok(None) => true,
                Err(e) => {
                    log::warn!("Rejected {} certificate from dataset: {}", generation, e);
                    false
                }
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for (generation, _) in &pending {
            log::warn!("Dropped {} certificate with unknown issuer", generation);
        }

        log::info!(
            "Certificate store ready: {} first generation and {} second generation key(s)",
            store.first_gen.len(),
            store.second_gen.len()
        );
        Ok(store)
    }

    fn insert(&mut self, certificate: Certificate) {
        let table = match certificate.generation.key_family() {
            Generation::Gen1 => &mut self.first_gen,
            _ => &mut self.second_gen,
        };
        table.insert(certificate.key_identifier, certificate);
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Number of keys held for a generation's key family
    pub fn len(&self, generation: Generation) -> usize {
        match generation.key_family() {
            Generation::Gen1 => self.first_gen.len(),
            _ => self.second_gen.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first_gen.is_empty() && self.second_gen.is_empty()
    }
}

impl KeySource for CertificateStore {
    fn lookup(&self, generation: Generation, id: &KeyIdentifier) -> Option<&Certificate> {
        match generation.key_family() {
            Generation::Gen1 => self.first_gen.get(id),
            _ => self.second_gen.get(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DecoderError;

    const TEST_DATASET: &str = include_str!("../../tests/data/certificates.json");

    #[test]
    fn test_embedded_dataset_loads() {
        let store = CertificateStore::embedded().unwrap();
        assert!(!store.version().is_empty());
    }

    #[test]
    fn test_shared_store_is_built_once() {
        let first = CertificateStore::shared().unwrap();
        let second = CertificateStore::shared().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dataset_admits_member_state_keys() {
        let store = CertificateStore::from_dataset(TEST_DATASET).unwrap();
        // one root and one member state key per generation
        assert_eq!(store.len(Generation::Gen1), 2);
        assert_eq!(store.len(Generation::Gen2V2), 2);

        let ms: KeyIdentifier = "fe4d534101ffff01".parse().unwrap();
        let found = store.lookup(Generation::Gen1, &ms).unwrap();
        assert_eq!(found.authority_reference.unwrap().to_string(), "fe54535401ffff01");
        assert!(store.lookup(Generation::Gen2V1, &ms).is_none());
    }

    #[test]
    fn test_missing_dataset_file() {
        let missing = Path::new("no/such/certificates.json");
        assert!(matches!(
            CertificateStore::from_path(missing),
            Err(DecoderError::IoError(_))
        ));
    }

    #[test]
    fn test_empty_store_misses() {
        let store = CertificateStore::empty();
        let id: KeyIdentifier = "fd45432001ffff01".parse().unwrap();
        assert!(store.lookup(Generation::Gen1, &id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_unresolvable_certificates_are_dropped() {
        let json = r#"{
            "version": "test",
            "first_gen_certificates": ["00"]
        }"#;
        let store = CertificateStore::from_dataset(json).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(matches!(
            CertificateStore::from_dataset("{"),
            Err(DecoderError::Json(_))
        ));
    }
}

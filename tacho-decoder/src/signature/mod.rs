//! Signature verification
//!
//! First generation data is signed with RSA (PKCS#1 v1.5 over SHA-1).
//! Second generation data is signed with ECDSA; the hash follows the key
//! size (SHA-256, SHA-384 or SHA-512).

mod curve;
pub mod ecdsa;
pub mod rsa;

use crate::certificates::{self, Certificate, CertificateStore, KeyIdentifier, KeyMaterial};
use crate::types::{Generation, Result, Verification};
use std::collections::HashMap;

/// Anything that can hand out public keys by identifier
pub trait KeySource {
    fn lookup(&self, generation: Generation, id: &KeyIdentifier) -> Option<&Certificate>;

    /// Check `signature` over `data` with the key `id`
    fn verify(
        &self,
        generation: Generation,
        id: &KeyIdentifier,
        data: &[u8],
        signature: &[u8],
    ) -> Verification {
        match self.lookup(generation, id) {
            Some(certificate) => verify_with(&certificate.key, data, signature),
            None => Verification::KeyNotFound,
        }
    }
}

/// Check `signature` over `data` with a known key
pub fn verify_with(key: &KeyMaterial, data: &[u8], signature: &[u8]) -> Verification {
    match key {
        KeyMaterial::Rsa { modulus, exponent } => {
            match rsa::verify_pkcs1_sha1(modulus, exponent, data, signature) {
                Ok(true) => Verification::Valid,
                Ok(false) => Verification::Invalid,
                Err(e) => {
                    log::debug!("RSA verification failed: {}", e);
                    Verification::Invalid
                }
            }
        }
        KeyMaterial::Ecc { curve, point } => ecdsa::verify(*curve, point, data, signature),
    }
}

/// Reject key material that can never verify anything
pub fn validate_key(key: &KeyMaterial) -> Result<()> {
    match key {
        KeyMaterial::Rsa { modulus, exponent } => rsa::public_key(modulus, exponent).map(|_| ()),
        KeyMaterial::Ecc { curve, point } => ecdsa::validate_point(*curve, point),
    }
}

/// Keys found in a single file, layered over the shared store
///
/// Card and VU certificates are opened with the member state keys from the
/// store (or from certificates found earlier in the same file) and kept here
/// for the lifetime of one decode.
pub struct KeyRing<'a> {
    store: &'a CertificateStore,
    derived: HashMap<(Generation, KeyIdentifier), Certificate>,
    signers: HashMap<Generation, KeyIdentifier>,
}

impl<'a> KeyRing<'a> {
    pub fn new(store: &'a CertificateStore) -> Self {
        Self {
            store,
            derived: HashMap::new(),
            signers: HashMap::new(),
        }
    }

    /// Open a certificate with a key already known to the ring and keep its key
    ///
    /// Returns the holder reference on success; an unknown issuer or a
    /// certificate that fails verification is logged and yields `None`.
    pub fn admit(&mut self, generation: Generation, bytes: &[u8]) -> Option<KeyIdentifier> {
        match certificates::resolve(&*self, generation, bytes) {
            Ok(Some(certificate)) => {
                let id = certificate.key_identifier;
                log::debug!("Resolved {} certificate {}", generation, id);
                self.derived
                    .insert((generation.key_family(), id), certificate);
                Some(id)
            }
            Ok(None) => {
                log::debug!("Issuer of a {} certificate is not known", generation);
                None
            }
            Err(e) => {
                log::warn!("{} certificate rejected: {}", generation, e);
                None
            }
        }
    }

    /// Admit a certificate whose key signs the file's data blocks
    pub fn admit_signer(&mut self, generation: Generation, bytes: &[u8]) -> Option<KeyIdentifier> {
        let id = self.admit(generation, bytes)?;
        self.signers.insert(generation.key_family(), id);
        Some(id)
    }

    /// Key that signs data blocks of the given generation, once resolved
    pub fn signer(&self, generation: Generation) -> Option<KeyIdentifier> {
        self.signers.get(&generation.key_family()).copied()
    }

    /// Verify a data block with the file's signer key
    pub fn verify_block(&self, generation: Generation, data: &[u8], signature: &[u8]) -> Verification {
        match self.signer(generation) {
            Some(id) => self.verify(generation, &id, data, signature),
            None => Verification::KeyNotFound,
        }
    }
}

impl KeySource for KeyRing<'_> {
    fn lookup(&self, generation: Generation, id: &KeyIdentifier) -> Option<&Certificate> {
        self.derived
            .get(&(generation.key_family(), *id))
            .or_else(|| self.store.lookup(generation, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HexBytes;

    #[test]
    fn test_unknown_key_is_reported() {
        let store = CertificateStore::empty();
        let ring = KeyRing::new(&store);
        let id: KeyIdentifier = "0102030405060708".parse().unwrap();
        assert_eq!(
            ring.verify(Generation::Gen1, &id, b"data", &[0u8; 128]),
            Verification::KeyNotFound
        );
        assert_eq!(
            ring.verify_block(Generation::Gen2V2, b"data", &[0u8; 64]),
            Verification::KeyNotFound
        );
    }

    #[test]
    fn test_p521_is_unsupported() {
        let key = KeyMaterial::Ecc {
            curve: certificates::Curve::NistP521,
            point: HexBytes(vec![0x04; 133]),
        };
        assert_eq!(
            verify_with(&key, b"data", &[0u8; 132]),
            Verification::UnsupportedAlgorithm
        );
    }

    #[test]
    fn test_garbage_certificate_is_not_admitted() {
        let store = CertificateStore::empty();
        let mut ring = KeyRing::new(&store);
        assert_eq!(ring.admit(Generation::Gen1, &[0u8; 10]), None);
        assert_eq!(ring.admit_signer(Generation::Gen2V1, &[0x7F, 0x21, 0x00]), None);
        assert_eq!(ring.signer(Generation::Gen2V1), None);
    }
}

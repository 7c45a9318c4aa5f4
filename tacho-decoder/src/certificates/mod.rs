//! Certificates and the certificate store
//!
//! First generation certificates are 194 byte RSA certificates with message
//! recovery: their content can only be read after the signature has been
//! opened with the issuer's public key. Second generation certificates are
//! BER encoded and readable on their own; only their ECDSA signature needs
//! the issuer key.
//!
//! The [`CertificateStore`] holds the trusted roots and member state
//! certificates. Card and VU certificates are resolved per decode into a
//! [`crate::signature::KeyRing`] layered on top of the store.

pub mod ber;
pub mod gen1;
pub mod gen2;
mod store;

pub use store::CertificateStore;

use crate::signature::{self, KeySource};
use crate::types::{DecoderError, Generation, HexBytes, Result, Verification};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Eight byte key identifier (certificate holder/authority reference)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyIdentifier(pub [u8; 8]);

impl KeyIdentifier {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 8] = bytes.try_into().map_err(|_| {
            DecoderError::InvalidCertificate(format!(
                "key identifier must be 8 bytes, found {}",
                bytes.len()
            ))
        })?;
        Ok(KeyIdentifier(array))
    }
}

impl FromStr for KeyIdentifier {
    type Err = DecoderError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s)
            .map_err(|e| DecoderError::Malformed(format!("key identifier {}: {}", s, e)))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for KeyIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyIdentifier({})", self)
    }
}

impl Serialize for KeyIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeyIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Elliptic curves that appear in second generation certificates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Curve {
    #[serde(rename = "brainpoolP256r1")]
    BrainpoolP256r1,
    #[serde(rename = "brainpoolP384r1")]
    BrainpoolP384r1,
    #[serde(rename = "brainpoolP512r1")]
    BrainpoolP512r1,
    #[serde(rename = "secp256r1")]
    NistP256,
    #[serde(rename = "secp384r1")]
    NistP384,
    #[serde(rename = "secp521r1")]
    NistP521,
}

impl Curve {
    /// Curve for a DER encoded object identifier (without tag and length)
    pub fn from_oid(oid: &[u8]) -> Option<Self> {
        const BRAINPOOL_PREFIX: [u8; 8] = [0x2B, 0x24, 0x03, 0x03, 0x02, 0x08, 0x01, 0x01];
        match oid {
            [0x2A, 0x86, 0x48, 0xCE, 0x3D, 0x03, 0x01, 0x07] => Some(Curve::NistP256),
            [0x2B, 0x81, 0x04, 0x00, 0x22] => Some(Curve::NistP384),
            [0x2B, 0x81, 0x04, 0x00, 0x23] => Some(Curve::NistP521),
            [prefix @ .., last] if prefix == BRAINPOOL_PREFIX => match *last {
                0x07 => Some(Curve::BrainpoolP256r1),
                0x0B => Some(Curve::BrainpoolP384r1),
                0x0D => Some(Curve::BrainpoolP512r1),
                _ => None,
            },
            _ => None,
        }
    }

    /// Size of a field element (and of each signature half) in bytes
    pub fn field_size(self) -> usize {
        match self {
            Curve::BrainpoolP256r1 | Curve::NistP256 => 32,
            Curve::BrainpoolP384r1 | Curve::NistP384 => 48,
            Curve::BrainpoolP512r1 => 64,
            Curve::NistP521 => 66,
        }
    }
}

/// Public key of a certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyMaterial {
    Rsa { modulus: HexBytes, exponent: HexBytes },
    Ecc { curve: Curve, point: HexBytes },
}

/// A trusted public key and where it belongs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub key_identifier: KeyIdentifier,
    pub generation: Generation,
    pub key: KeyMaterial,
    /// Issuer key, absent for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_reference: Option<KeyIdentifier>,
}

/// What can be read from a certificate found on a card or VU file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_reference: Option<KeyIdentifier>,
    /// Only known for first generation certificates once the issuer key was found
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_reference: Option<KeyIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
}

/// A certificate as it appears in a decoded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateRecord {
    pub certificate: HexBytes,
    pub summary: CertificateSummary,
}

impl CertificateRecord {
    /// Wrap a certificate of the given generation, reading what is readable
    /// without the issuer key
    pub fn decode(generation: Generation, bytes: &[u8]) -> Result<Self> {
        let summary = if generation.is_second() {
            let parsed = gen2::SecondGenCertificate::parse(bytes)?;
            CertificateSummary {
                authority_reference: Some(parsed.authority_reference),
                holder_reference: Some(parsed.holder_reference),
                curve: parsed.curve,
                effective_date: Some(parsed.effective_date),
                expiration_date: Some(parsed.expiration_date),
            }
        } else {
            CertificateSummary {
                authority_reference: Some(gen1::authority_reference(bytes)?),
                ..CertificateSummary::default()
            }
        };
        Ok(Self {
            certificate: HexBytes::from(bytes),
            summary,
        })
    }

    /// Like [`decode`](Self::decode), also filling in the holder reference
    /// of a first generation certificate whose issuer `source` knows
    pub fn decode_with(
        generation: Generation,
        bytes: &[u8],
        source: &impl KeySource,
    ) -> Result<Self> {
        let mut record = Self::decode(generation, bytes)?;
        if !generation.is_second() {
            if let Ok(Some(opened)) = resolve(source, generation, bytes) {
                record.summary.holder_reference = Some(opened.key_identifier);
            }
        }
        Ok(record)
    }
}

/// Open a certificate with its issuer key from `source`
///
/// Returns `Ok(None)` when the issuer is not known to `source`, and an error
/// when the issuer is known but the certificate does not verify.
pub fn resolve(
    source: &impl KeySource,
    generation: Generation,
    bytes: &[u8],
) -> Result<Option<Certificate>> {
    if generation.is_second() {
        let parsed = gen2::SecondGenCertificate::parse(bytes)?;
        let Some(issuer) = source.lookup(generation, &parsed.authority_reference) else {
            return Ok(None);
        };
        match signature::verify_with(&issuer.key, parsed.body, parsed.signature) {
            Verification::Valid => {}
            outcome => {
                return Err(DecoderError::InvalidCertificate(format!(
                    "certificate {} signature is {}",
                    parsed.holder_reference, outcome
                )))
            }
        }
        let curve = parsed.curve.ok_or_else(|| {
            DecoderError::InvalidCertificate(format!(
                "certificate {} uses an unknown curve",
                parsed.holder_reference
            ))
        })?;
        Ok(Some(Certificate {
            key_identifier: parsed.holder_reference,
            generation: Generation::Gen2V1,
            key: KeyMaterial::Ecc {
                curve,
                point: HexBytes::from(parsed.public_point),
            },
            authority_reference: Some(parsed.authority_reference),
        }))
    } else {
        let authority = gen1::authority_reference(bytes)?;
        let Some(issuer) = source.lookup(generation, &authority) else {
            return Ok(None);
        };
        let opened = gen1::FirstGenCertificate::recover(bytes, &issuer.key)?;
        Ok(Some(Certificate {
            key_identifier: opened.holder_reference,
            generation: Generation::Gen1,
            key: KeyMaterial::Rsa {
                modulus: HexBytes::from(opened.modulus),
                exponent: HexBytes::from(opened.exponent),
            },
            authority_reference: Some(opened.authority_reference),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_from_oid() {
        let bp256 = hex::decode("2b2403030208010107").unwrap();
        assert_eq!(Curve::from_oid(&bp256), Some(Curve::BrainpoolP256r1));
        let bp512 = hex::decode("2b240303020801010d").unwrap();
        assert_eq!(Curve::from_oid(&bp512), Some(Curve::BrainpoolP512r1));
        let p384 = hex::decode("2b81040022").unwrap();
        assert_eq!(Curve::from_oid(&p384), Some(Curve::NistP384));
        assert_eq!(Curve::from_oid(&[0x2B, 0x06]), None);
    }

    #[test]
    fn test_key_identifier_hex() {
        let id: KeyIdentifier = "fd45432001ffff01".parse().unwrap();
        assert_eq!(id.0[0], 0xFD);
        assert_eq!(id.to_string(), "fd45432001ffff01");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"fd45432001ffff01\"");
        assert!("fd45".parse::<KeyIdentifier>().is_err());
    }

    #[test]
    fn test_key_material_serde() {
        let key = KeyMaterial::Ecc {
            curve: Curve::BrainpoolP256r1,
            point: HexBytes(vec![0x04, 0x01]),
        };
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"type":"ecc","curve":"brainpoolP256r1","point":"0401"}"#);
    }
}

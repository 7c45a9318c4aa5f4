//! First generation RSA certificates (ISO/IEC 9796-2 message recovery)
//!
//! Layout on file: `Sign (128) | Cn' (58) | CAR (8)`. Opening `Sign` with the
//! issuer key yields `6A | Cr' (106) | H' (20) | BC`, and the certificate body
//! `C' = Cr' | Cn'` must hash to `H'` under SHA-1.

use super::{KeyIdentifier, KeyMaterial};
use crate::primitives::{time::time_real, Reader};
use crate::signature::rsa;
use crate::types::{DecoderError, Result};
use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

pub const CERTIFICATE_SIZE: usize = 194;
const SIGNATURE_SIZE: usize = 128;
const BODY_SIZE: usize = 164;
const RECOVERED_BODY: usize = 106;

/// Issuer key reference: the trailing eight bytes, readable without recovery
pub fn authority_reference(certificate: &[u8]) -> Result<KeyIdentifier> {
    if certificate.len() != CERTIFICATE_SIZE {
        return Err(DecoderError::InvalidCertificate(format!(
            "first generation certificate must be {} bytes, found {}",
            CERTIFICATE_SIZE,
            certificate.len()
        )));
    }
    KeyIdentifier::from_slice(&certificate[CERTIFICATE_SIZE - 8..])
}

/// Content of an opened first generation certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstGenCertificate {
    pub profile_identifier: u8,
    pub authority_reference: KeyIdentifier,
    pub holder_authorisation: [u8; 7],
    pub end_of_validity: DateTime<Utc>,
    pub holder_reference: KeyIdentifier,
    pub modulus: Vec<u8>,
    pub exponent: Vec<u8>,
}

impl FirstGenCertificate {
    /// Open `certificate` with the issuer's RSA key
    pub fn recover(certificate: &[u8], issuer: &KeyMaterial) -> Result<Self> {
        let trailing_car = authority_reference(certificate)?;
        let KeyMaterial::Rsa { modulus, exponent } = issuer else {
            return Err(DecoderError::InvalidKey(
                "first generation certificates need an RSA issuer key".to_string(),
            ));
        };

        let (sign, rest) = certificate.split_at(SIGNATURE_SIZE);
        let public_remainder = &rest[..rest.len() - 8];

        let recovered = rsa::public_operation(modulus, exponent, sign)?;
        if recovered.len() != SIGNATURE_SIZE
            || recovered[0] != 0x6A
            || recovered[SIGNATURE_SIZE - 1] != 0xBC
        {
            return Err(DecoderError::InvalidCertificate(format!(
                "certificate from {} does not open with the issuer key",
                trailing_car
            )));
        }

        let mut body = Vec::with_capacity(BODY_SIZE);
        body.extend_from_slice(&recovered[1..1 + RECOVERED_BODY]);
        body.extend_from_slice(public_remainder);
        let hash = &recovered[1 + RECOVERED_BODY..SIGNATURE_SIZE - 1];
        if Sha1::digest(&body).as_slice() != hash {
            return Err(DecoderError::InvalidCertificate(format!(
                "certificate from {} fails its hash check",
                trailing_car
            )));
        }

        let opened = Self::parse_body(&body)?;
        if opened.authority_reference != trailing_car {
            return Err(DecoderError::InvalidCertificate(format!(
                "authority reference {} inside the certificate differs from {}",
                opened.authority_reference, trailing_car
            )));
        }
        Ok(opened)
    }

    fn parse_body(body: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(body);
        Ok(Self {
            profile_identifier: reader.u8()?,
            authority_reference: KeyIdentifier(reader.array()?),
            holder_authorisation: reader.array()?,
            end_of_validity: time_real(&mut reader)?,
            holder_reference: KeyIdentifier(reader.array()?),
            modulus: reader.bytes(128)?.to_vec(),
            exponent: reader.bytes(8)?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_reference_needs_full_certificate() {
        let mut certificate = vec![0u8; CERTIFICATE_SIZE];
        certificate[186..].copy_from_slice(&[0xFD, 0x45, 0x43, 0x20, 0x01, 0xFF, 0xFF, 0x01]);
        assert_eq!(
            authority_reference(&certificate).unwrap().to_string(),
            "fd45432001ffff01"
        );
        assert!(authority_reference(&certificate[..100]).is_err());
    }

    #[test]
    fn test_recover_rejects_ecc_issuer() {
        let certificate = vec![0u8; CERTIFICATE_SIZE];
        let issuer = KeyMaterial::Ecc {
            curve: crate::certificates::Curve::NistP256,
            point: crate::types::HexBytes(vec![0x04]),
        };
        assert!(matches!(
            FirstGenCertificate::recover(&certificate, &issuer),
            Err(DecoderError::InvalidKey(_))
        ));
    }
}

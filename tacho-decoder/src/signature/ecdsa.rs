//! Second generation ECDSA verification
//!
//! NIST curves go through the `p256`/`p384` crates; Brainpool curves through
//! the local prime curve arithmetic. Signatures are plain `r || s`.

use super::curve::PrimeCurve;
use crate::certificates::Curve;
use crate::types::{DecoderError, Result, Verification};
use p256::ecdsa::signature::Verifier;
use sha2::{Digest, Sha256, Sha384, Sha512};

/// Verify an ECDSA signature over `data` with the public point on `curve`
pub fn verify(curve: Curve, point: &[u8], data: &[u8], signature: &[u8]) -> Verification {
    let valid = match curve {
        Curve::NistP256 => verify_p256(point, data, signature),
        Curve::NistP384 => verify_p384(point, data, signature),
        Curve::NistP521 => return Verification::UnsupportedAlgorithm,
        Curve::BrainpoolP256r1 | Curve::BrainpoolP384r1 | Curve::BrainpoolP512r1 => {
            let Some(params) = PrimeCurve::brainpool(curve) else {
                return Verification::UnsupportedAlgorithm;
            };
            params.verify_prehash(point, &digest_for(curve, data), signature)
        }
    };
    if valid {
        Verification::Valid
    } else {
        Verification::Invalid
    }
}

/// Hash matching the key size, as the signing side uses it
fn digest_for(curve: Curve, data: &[u8]) -> Vec<u8> {
    match curve.field_size() {
        32 => Sha256::digest(data).to_vec(),
        48 => Sha384::digest(data).to_vec(),
        _ => Sha512::digest(data).to_vec(),
    }
}

fn verify_p256(point: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(point) else {
        return false;
    };
    let Ok(signature) = p256::ecdsa::Signature::from_slice(signature) else {
        return false;
    };
    key.verify(data, &signature).is_ok()
}

fn verify_p384(point: &[u8], data: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = p384::ecdsa::VerifyingKey::from_sec1_bytes(point) else {
        return false;
    };
    let Ok(signature) = p384::ecdsa::Signature::from_slice(signature) else {
        return false;
    };
    key.verify(data, &signature).is_ok()
}

/// Check that `point` is a valid public point on `curve`
pub fn validate_point(curve: Curve, point: &[u8]) -> Result<()> {
    let valid = match curve {
        Curve::NistP256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(point).is_ok(),
        Curve::NistP384 => p384::ecdsa::VerifyingKey::from_sec1_bytes(point).is_ok(),
        Curve::NistP521 => {
            return Err(DecoderError::InvalidKey("secp521r1 keys are not supported".to_string()))
        }
        _ => PrimeCurve::brainpool(curve)
            .and_then(|params| params.decode_point(point))
            .is_some(),
    };
    if valid {
        Ok(())
    } else {
        Err(DecoderError::InvalidKey(format!("{:?} point is not on the curve", curve)))
    }
}

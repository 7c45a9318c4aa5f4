//! First generation RSA operations

use crate::types::{DecoderError, Result};
use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};

/// Build a public key from big-endian modulus and exponent bytes
pub fn public_key(modulus: &[u8], exponent: &[u8]) -> Result<RsaPublicKey> {
    RsaPublicKey::new(
        BigUint::from_bytes_be(modulus),
        BigUint::from_bytes_be(exponent),
    )
    .map_err(|e| DecoderError::InvalidKey(format!("RSA key: {}", e)))
}

/// Raw `signature ^ e mod n`, left-padded to the modulus size
///
/// Used to open first generation certificates, whose content is recovered
/// from the signature rather than carried next to it.
pub fn public_operation(modulus: &[u8], exponent: &[u8], signature: &[u8]) -> Result<Vec<u8>> {
    let n = BigUint::from_bytes_be(modulus);
    let e = BigUint::from_bytes_be(exponent);
    if modulus.last().map_or(true, |b| b & 1 == 0) || n <= BigUint::from(1u8) {
        return Err(DecoderError::InvalidKey("RSA modulus must be odd".to_string()));
    }
    if e <= BigUint::from(1u8) {
        return Err(DecoderError::InvalidKey("RSA exponent must exceed one".to_string()));
    }
    let input = BigUint::from_bytes_be(signature);
    if input >= n {
        return Err(DecoderError::InvalidCertificate(
            "signature is not smaller than the modulus".to_string(),
        ));
    }
    let output = input.modpow(&e, &n);

    let size = (n.bits() + 7) / 8;
    let bytes = output.to_bytes_be();
    let mut padded = vec![0u8; size.saturating_sub(bytes.len())];
    padded.extend_from_slice(&bytes);
    Ok(padded)
}

/// PKCS#1 v1.5 signature check over the SHA-1 of `data`
pub fn verify_pkcs1_sha1(
    modulus: &[u8],
    exponent: &[u8],
    data: &[u8],
    signature: &[u8],
) -> Result<bool> {
    let key = public_key(modulus, exponent)?;
    let hashed = Sha1::digest(data);
    Ok(key
        .verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, signature)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    // n = 61 * 53, e = 17: small enough to check by hand
    const MODULUS: [u8; 2] = [0x0C, 0xA1];
    const EXPONENT: [u8; 1] = [0x11];

    #[test]
    fn test_public_operation_textbook() {
        // 65^17 mod 3233 = 2790
        let out = public_operation(&MODULUS, &EXPONENT, &[0x00, 0x41]).unwrap();
        assert_eq!(out, vec![0x0A, 0xE6]);
    }

    #[test]
    fn test_signature_not_below_modulus() {
        assert!(public_operation(&MODULUS, &EXPONENT, &[0x0C, 0xA1]).is_err());
    }

    #[test]
    fn test_even_modulus_rejected() {
        assert!(public_operation(&[0x0C, 0xA2], &EXPONENT, &[0x01]).is_err());
    }

    #[test]
    fn test_wrong_signature_is_false() {
        let mut modulus = vec![0xFF; 128];
        modulus[127] = 0xFB;
        let verified =
            verify_pkcs1_sha1(&modulus, &[0x01, 0x00, 0x01], b"data", &[0x01; 128]).unwrap();
        assert!(!verified);
    }
}

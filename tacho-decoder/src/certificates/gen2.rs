//! Second generation ECC certificates
//!
//! ```text
//! 7F21 Certificate
//!   7F4E Certificate body (signed)
//!     5F29 Certificate profile identifier
//!     42   Certification authority reference
//!     5F4C Certificate holder authorisation
//!     7F49 Public key { 06 domain parameters OID, 86 public point }
//!     5F20 Certificate holder reference
//!     5F25 Certificate effective date
//!     5F24 Certificate expiration date
//!   5F37 ECC signature (r || s)
//! ```

use super::ber::BerObject;
use super::{Curve, KeyIdentifier};
use crate::primitives::{time::time_real, Reader};
use crate::types::{DecoderError, Result};
use chrono::{DateTime, Utc};

const TAG_CERTIFICATE: u16 = 0x7F21;
const TAG_BODY: u16 = 0x7F4E;
const TAG_PROFILE: u16 = 0x5F29;
const TAG_AUTHORITY: u16 = 0x42;
const TAG_AUTHORISATION: u16 = 0x5F4C;
const TAG_PUBLIC_KEY: u16 = 0x7F49;
const TAG_DOMAIN_PARAMETERS: u16 = 0x06;
const TAG_PUBLIC_POINT: u16 = 0x86;
const TAG_HOLDER: u16 = 0x5F20;
const TAG_EFFECTIVE: u16 = 0x5F25;
const TAG_EXPIRATION: u16 = 0x5F24;
const TAG_SIGNATURE: u16 = 0x5F37;

/// A parsed second generation certificate, borrowing from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondGenCertificate<'a> {
    pub profile_identifier: u8,
    pub authority_reference: KeyIdentifier,
    pub holder_authorisation: &'a [u8],
    /// `None` when the domain parameter OID is not one we know
    pub curve: Option<Curve>,
    pub domain_parameters: &'a [u8],
    pub public_point: &'a [u8],
    pub holder_reference: KeyIdentifier,
    pub effective_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    /// The encoded 7F4E object: the bytes the signature covers
    pub body: &'a [u8],
    pub signature: &'a [u8],
}

impl<'a> SecondGenCertificate<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let (certificate, _) = BerObject::parse(bytes)?;
        if certificate.tag != TAG_CERTIFICATE {
            return Err(DecoderError::InvalidCertificate(format!(
                "expected certificate tag 7F21, found {:X}",
                certificate.tag
            )));
        }
        let body = certificate.child(TAG_BODY)?;
        let signature = certificate.child(TAG_SIGNATURE)?;
        let public_key = body.child(TAG_PUBLIC_KEY)?;
        let domain_parameters = public_key.child(TAG_DOMAIN_PARAMETERS)?.value;

        let profile = body.child(TAG_PROFILE)?.value;
        Ok(Self {
            profile_identifier: profile.first().copied().unwrap_or_default(),
            authority_reference: KeyIdentifier::from_slice(body.child(TAG_AUTHORITY)?.value)?,
            holder_authorisation: body.child(TAG_AUTHORISATION)?.value,
            curve: Curve::from_oid(domain_parameters),
            domain_parameters,
            public_point: public_key.child(TAG_PUBLIC_POINT)?.value,
            holder_reference: KeyIdentifier::from_slice(body.child(TAG_HOLDER)?.value)?,
            effective_date: time_real(&mut Reader::new(body.child(TAG_EFFECTIVE)?.value))?,
            expiration_date: time_real(&mut Reader::new(body.child(TAG_EXPIRATION)?.value))?,
            body: body.encoded,
            signature: signature.value,
        })
    }
}

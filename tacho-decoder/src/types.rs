//! Core types for the tachograph decoder library
//!
//! This module defines the types shared by the card (TLV) and vehicle unit (TV)
//! decoders: generations, diagnostics, the per-field `Block` wrapper and the
//! error type for the few conditions that abort a decode outright.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Hard failures of the decoder
///
/// Malformed fields and unknown tags are *not* errors: they are reported as
/// [`Diagnostic`]s next to a partially decoded result.
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Trailing data at offset {offset}: {remaining} byte(s) cannot hold a tag")]
    TrailingBytes { offset: usize, remaining: usize },

    #[error("Unexpected end of data: needed {needed} bytes, {available} available")]
    UnexpectedEnd { needed: usize, available: usize },

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("Invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Tachograph hardware/cryptography generation
///
/// Ordered so that a later generation compares greater, which is what the
/// generation latch relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Generation {
    /// First generation (RSA)
    Gen1,
    /// Second generation, version 1 (ECC)
    Gen2V1,
    /// Second generation, version 2 (ECC, smart tachograph 2)
    Gen2V2,
}

impl Generation {
    /// True for both second generation versions
    pub fn is_second(self) -> bool {
        !matches!(self, Generation::Gen1)
    }

    /// The key family a certificate of this generation belongs to.
    ///
    /// Both second generation versions share one set of ECC keys.
    pub fn key_family(self) -> Generation {
        match self {
            Generation::Gen1 => Generation::Gen1,
            Generation::Gen2V1 | Generation::Gen2V2 => Generation::Gen2V1,
        }
    }

    /// Suffix used for generation-qualified field names
    pub fn field_suffix(self) -> &'static str {
        if self.is_second() {
            "_2"
        } else {
            "_1"
        }
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Generation::Gen1 => write!(f, "Gen1"),
            Generation::Gen2V1 => write!(f, "Gen2v1"),
            Generation::Gen2V2 => write!(f, "Gen2v2"),
        }
    }
}

/// The two file formats the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Driver/workshop/control/company card download (TLV encoded)
    Card,
    /// Vehicle unit download (TV encoded)
    Vu,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Card => write!(f, "card"),
            FileKind::Vu => write!(f, "vu"),
        }
    }
}

/// A non-fatal decode note attached to a position in the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Byte offset of the element (or record) the note refers to
    pub offset: usize,
    /// Raw tag value, when the note concerns a tagged element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u16>,
    /// Generation-qualified field name, when the tag was resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// True if decoding stopped at this point
    pub terminal: bool,
    pub kind: DiagnosticKind,
}

/// What went wrong at a [`Diagnostic`]'s position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The tag has no descriptor for the active file kind and generation.
    /// `length` is the declared payload length (TLV only).
    UnknownTag { length: Option<usize> },
    /// The element claims more bytes than the input holds
    Truncated { needed: usize, available: usize },
    /// The payload does not match its descriptor
    Malformed { reason: String },
    /// A second generation record array with an unregistered record type
    UnknownRecordType { record_type: u8 },
    /// A signature element with no preceding data element of the same tag
    OrphanSignature,
    /// A signature element following a record that is not signed
    UnexpectedSignature,
}

impl Diagnostic {
    pub(crate) fn new(offset: usize, kind: DiagnosticKind) -> Self {
        Self {
            offset,
            tag: None,
            field: None,
            terminal: false,
            kind,
        }
    }

    pub(crate) fn with_tag(mut self, tag: u16) -> Self {
        self.tag = Some(tag);
        self
    }

    pub(crate) fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub(crate) fn terminal(mut self) -> Self {
        self.terminal = true;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offset {}", self.offset)?;
        if let Some(tag) = self.tag {
            write!(f, ", tag 0x{:04X}", tag)?;
        }
        if let Some(field) = &self.field {
            write!(f, " ({})", field)?;
        }
        match &self.kind {
            DiagnosticKind::UnknownTag { length: Some(length) } => {
                write!(f, ": unknown tag, {} byte(s) skipped", length)
            }
            DiagnosticKind::UnknownTag { length: None } => write!(f, ": unknown tag"),
            DiagnosticKind::Truncated { needed, available } => write!(
                f,
                ": truncated, needed {} byte(s) but {} available",
                needed, available
            ),
            DiagnosticKind::Malformed { reason } => write!(f, ": malformed: {}", reason),
            DiagnosticKind::UnknownRecordType { record_type } => {
                write!(f, ": unknown record type 0x{:02X}", record_type)
            }
            DiagnosticKind::OrphanSignature => write!(f, ": signature without data"),
            DiagnosticKind::UnexpectedSignature => write!(f, ": signature on unsigned record"),
        }?;
        if self.terminal {
            write!(f, " (decoding stopped)")?;
        }
        Ok(())
    }
}

/// The outcome of a decode call: the (possibly partial) result, the
/// diagnostics collected on the way and how many input bytes were consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub diagnostics: Vec<Diagnostic>,
    pub consumed: usize,
}

impl<T> Decoded<T> {
    /// The diagnostic that stopped decoding, if any
    pub fn terminal(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.terminal)
    }

    /// True if the whole input was scanned
    pub fn is_complete(&self) -> bool {
        self.terminal().is_none()
    }
}

/// Outcome of a signature check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    Valid,
    Invalid,
    KeyNotFound,
    UnsupportedAlgorithm,
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verification::Valid => write!(f, "valid"),
            Verification::Invalid => write!(f, "invalid"),
            Verification::KeyNotFound => write!(f, "key not found"),
            Verification::UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
        }
    }
}

/// Signature bytes that followed a data block, with the verification outcome
/// when verification was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBlock {
    pub value: HexBytes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<Verification>,
}

impl SignatureBlock {
    pub fn new(value: &[u8]) -> Self {
        Self {
            value: HexBytes::from(value),
            verification: None,
        }
    }
}

/// One decoded field of a card or VU result
///
/// A malformed field keeps an error marker (and optionally its raw bytes)
/// instead of aborting the surrounding decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Block<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<HexBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureBlock>,
}

impl<T> Block<T> {
    pub fn decoded(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            raw: None,
            signature: None,
        }
    }

    pub fn malformed(reason: impl Into<String>, raw: Option<&[u8]>) -> Self {
        Self {
            data: None,
            error: Some(reason.into()),
            raw: raw.map(HexBytes::from),
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Option<SignatureBlock>) -> Self {
        self.signature = signature;
        self
    }

    pub fn is_malformed(&self) -> bool {
        self.error.is_some()
    }

    /// Verification outcome of the attached signature, if checked
    pub fn verification(&self) -> Option<Verification> {
        self.signature.as_ref().and_then(|s| s.verification)
    }
}

/// Opaque bytes, serialized as a lowercase hex string
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for HexBytes {
    fn from(bytes: &[u8]) -> Self {
        HexBytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        HexBytes(bytes)
    }
}

impl Deref for HexBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexBytes({})", hex::encode(&self.0))
    }
}

impl fmt::Display for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(&text)
            .map(HexBytes)
            .map_err(serde::de::Error::custom)
    }
}

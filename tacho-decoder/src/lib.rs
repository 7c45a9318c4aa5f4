//! Tachograph Download Decoder Library
//!
//! Decodes EU digital tachograph downloads (`.ddd` files) from driver,
//! workshop, control and company cards and from vehicle units, for the first
//! generation (RSA) and second generation (ECC) equipment.
//!
//! # Architecture
//!
//! - Card files are TLV: every element carries its file identifier and an
//!   explicit length, so unknown or broken elements are skipped and reported
//! - VU files are TV: transfer widths follow from their structure, so an
//!   unknown transfer ends the scan
//! - A static tag registry maps tags to record descriptors per generation
//! - An immutable certificate store holds the trusted keys; an optional
//!   pass checks every signed block against it
//!
//! Problems with individual fields never abort a decode. They come back as
//! [`Diagnostic`]s next to the partial result.
//!
//! The library does NOT read files, pick output paths or install a logger.
//! That is left to the application layer (tacho-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use tacho_decoder::{Decoder, DecoderConfig};
//!
//! let decoder = Decoder::new()
//!     .unwrap()
//!     .with_config(DecoderConfig::new().with_verification(true));
//!
//! let bytes = std::fs::read("C_20240301_1200_M_Mueller_DF00001234567801.ddd").unwrap();
//! let decoded = decoder.decode_card(&bytes).unwrap();
//! for diagnostic in &decoded.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! println!("{}", decoded.value.to_json(true).unwrap());
//! ```

// Public modules
pub mod card;
pub mod certificates;
pub mod config;
pub mod decoder;
pub mod primitives;
pub mod registry;
pub mod signature;
pub mod types;
pub mod vu;

// Re-export main types for convenience
pub use card::Card;
pub use certificates::{Certificate, CertificateStore, KeyIdentifier};
pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use types::{
    Block, Decoded, DecoderError, Diagnostic, DiagnosticKind, FileKind, Generation, HexBytes,
    Result, SignatureBlock, Verification,
};
pub use vu::Vu;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Decode a card download with the default configuration
///
/// Signatures are not checked, so no certificate store is involved.
pub fn decode_card(bytes: &[u8]) -> Result<Decoded<Card>> {
    card::decode(bytes, &DecoderConfig::default(), None)
}

/// Decode a VU download with the default configuration, without checking
/// signatures
pub fn decode_vu(bytes: &[u8]) -> Result<Decoded<Vu>> {
    vu::decode(bytes, &DecoderConfig::default(), None)
}

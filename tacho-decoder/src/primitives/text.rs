//! Text encodings: code-page qualified strings and IA5 strings
//!
//! A code-page string starts with one byte naming the character set
//! (1..=16 for ISO/IEC 8859-n, 80 for KOI8-R, 85 for KOI8-U) followed by the
//! text, padded with spaces. 255 marks an unused field.

use super::Reader;
use crate::types::{DecoderError, Result};
use encoding_rs::Encoding;

/// Read a code-page string occupying `len` bytes including the code page byte
pub fn code_page_string(reader: &mut Reader<'_>, len: usize) -> Result<String> {
    let code_page = reader.u8()?;
    let text = reader.bytes(len.saturating_sub(1))?;
    decode_code_page(code_page, text)
}

/// Decode `text` in the character set identified by `code_page`
pub fn decode_code_page(code_page: u8, text: &[u8]) -> Result<String> {
    let text = trim_padding(text);
    if text.is_empty() {
        return Ok(String::new());
    }
    match code_page {
        0 | 1 | 255 => Ok(latin1(text)),
        _ => {
            let encoding = encoding_for(code_page).ok_or_else(|| {
                DecoderError::Malformed(format!("unsupported code page {}", code_page))
            })?;
            let (decoded, _) = encoding.decode_without_bom_handling(text);
            Ok(decoded.trim().to_string())
        }
    }
}

fn encoding_for(code_page: u8) -> Option<&'static Encoding> {
    let encoding = match code_page {
        2 => encoding_rs::ISO_8859_2,
        3 => encoding_rs::ISO_8859_3,
        4 => encoding_rs::ISO_8859_4,
        5 => encoding_rs::ISO_8859_5,
        6 => encoding_rs::ISO_8859_6,
        7 => encoding_rs::ISO_8859_7,
        8 => encoding_rs::ISO_8859_8,
        // encoding_rs folds 8859-9 and 8859-11 into their windows supersets
        9 => encoding_rs::WINDOWS_1254,
        10 => encoding_rs::ISO_8859_10,
        11 => encoding_rs::WINDOWS_874,
        13 => encoding_rs::ISO_8859_13,
        14 => encoding_rs::ISO_8859_14,
        15 => encoding_rs::ISO_8859_15,
        16 => encoding_rs::ISO_8859_16,
        80 => encoding_rs::KOI8_R,
        85 => encoding_rs::KOI8_U,
        _ => return None,
    };
    Some(encoding)
}

/// ISO/IEC 8859-1 maps every byte to the code point of the same value
fn latin1(text: &[u8]) -> String {
    text.iter().map(|&b| char::from(b)).collect::<String>().trim().to_string()
}

/// Read a fixed-width IA5 (7-bit ASCII) string
pub fn ia5_string(reader: &mut Reader<'_>, len: usize) -> Result<String> {
    let text = trim_padding(reader.bytes(len)?);
    if let Some(bad) = text.iter().find(|b| !b.is_ascii()) {
        return Err(DecoderError::Malformed(format!("non-IA5 byte 0x{:02X}", bad)));
    }
    Ok(String::from_utf8_lossy(text).trim().to_string())
}

fn trim_padding(text: &[u8]) -> &[u8] {
    let is_padding = |b: &u8| matches!(*b, 0x00 | 0x20 | 0xFF);
    let start = text.iter().position(|b| !is_padding(b)).unwrap_or(text.len());
    let end = text.iter().rposition(|b| !is_padding(b)).map_or(start, |i| i + 1);
    &text[start..end]
}

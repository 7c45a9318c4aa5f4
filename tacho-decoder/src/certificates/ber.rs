//! Minimal BER-TLV reader for second generation certificates
//!
//! Tags are one or two bytes; lengths use the short form or the 0x81/0x82
//! long forms. Values are borrowed from the input.

use crate::types::{DecoderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BerObject<'a> {
    pub tag: u16,
    pub value: &'a [u8],
    /// Tag, length and value as they appear in the input
    pub encoded: &'a [u8],
}

impl<'a> BerObject<'a> {
    /// Parse the object at the start of `data`, returning it and what follows
    pub fn parse(data: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let (tag, tag_len) = read_tag(data)?;
        let (length, length_len) = read_length(&data[tag_len..])?;
        let header = tag_len + length_len;
        let end = header
            .checked_add(length)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                DecoderError::Malformed(format!(
                    "BER object 0x{:X} claims {} byte(s), {} available",
                    tag,
                    length,
                    data.len() - header
                ))
            })?;
        let object = BerObject {
            tag,
            value: &data[header..end],
            encoded: &data[..end],
        };
        Ok((object, &data[end..]))
    }

    /// Parse the value of a constructed object as a sequence of objects
    pub fn children(&self) -> Result<Vec<BerObject<'a>>> {
        let mut rest = self.value;
        let mut children = Vec::new();
        while !rest.is_empty() {
            let (child, next) = BerObject::parse(rest)?;
            children.push(child);
            rest = next;
        }
        Ok(children)
    }

    /// Direct child with the given tag
    pub fn child(&self, tag: u16) -> Result<BerObject<'a>> {
        self.children()?
            .into_iter()
            .find(|c| c.tag == tag)
            .ok_or_else(|| DecoderError::Malformed(format!("missing BER object 0x{:X}", tag)))
    }
}

fn read_tag(data: &[u8]) -> Result<(u16, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| DecoderError::Malformed("missing BER tag".to_string()))?;
    if first & 0x1F != 0x1F {
        return Ok((u16::from(first), 1));
    }
    let second = *data
        .get(1)
        .ok_or_else(|| DecoderError::Malformed("truncated BER tag".to_string()))?;
    if second & 0x80 != 0 {
        return Err(DecoderError::Malformed("BER tags over two bytes are not supported".to_string()));
    }
    Ok((u16::from_be_bytes([first, second]), 2))
}

fn read_length(data: &[u8]) -> Result<(usize, usize)> {
    let truncated = || DecoderError::Malformed("truncated BER length".to_string());
    let first = *data.first().ok_or_else(truncated)?;
    match first {
        0x00..=0x7F => Ok((usize::from(first), 1)),
        0x81 => {
            let len = *data.get(1).ok_or_else(truncated)?;
            Ok((usize::from(len), 2))
        }
        0x82 => {
            let bytes = data.get(1..3).ok_or_else(truncated)?;
            Ok((usize::from(u16::from_be_bytes([bytes[0], bytes[1]])), 3))
        }
        _ => Err(DecoderError::Malformed(format!("unsupported BER length byte 0x{:02X}", first))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        // 7F4E { 5F29 00, 42 <2 bytes> }
        let data = [0x7F, 0x4E, 0x08, 0x5F, 0x29, 0x01, 0x00, 0x42, 0x02, 0xAB, 0xCD, 0xEE];
        let (outer, rest) = BerObject::parse(&data).unwrap();
        assert_eq!(outer.tag, 0x7F4E);
        assert_eq!(outer.encoded.len(), 11);
        assert_eq!(rest, &[0xEE]);

        let children = outer.children().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].tag, 0x5F29);
        assert_eq!(outer.child(0x42).unwrap().value, &[0xAB, 0xCD]);
        assert!(outer.child(0x5F20).is_err());
    }

    #[test]
    fn test_long_form_lengths() {
        let mut data = vec![0x86, 0x81, 0x80];
        data.extend(std::iter::repeat(0x11).take(0x80));
        let (object, _) = BerObject::parse(&data).unwrap();
        assert_eq!(object.value.len(), 0x80);

        let mut data = vec![0x7F, 0x21, 0x82, 0x01, 0x00];
        data.extend(std::iter::repeat(0x22).take(0x100));
        let (object, _) = BerObject::parse(&data).unwrap();
        assert_eq!(object.value.len(), 0x100);
    }

    #[test]
    fn test_overlong_value() {
        assert!(BerObject::parse(&[0x42, 0x05, 0x01]).is_err());
        assert!(BerObject::parse(&[0x42, 0x83, 0x01]).is_err());
        assert!(BerObject::parse(&[]).is_err());
    }
}

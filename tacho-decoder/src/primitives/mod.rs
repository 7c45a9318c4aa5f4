//! Byte-level primitives shared by the card and VU decoders
//!
//! Everything on a tachograph file is big-endian. [`Reader`] wraps a byte
//! slice in a `byteorder` cursor and turns running off the end into a
//! [`DecoderError::UnexpectedEnd`] instead of an I/O error.

pub mod common;
pub mod text;
pub mod time;

use crate::types::{DecoderError, Result};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::Cursor;

/// A value with a self-contained binary layout
pub trait Decode: Sized {
    fn decode(reader: &mut Reader<'_>) -> Result<Self>;
}

/// A [`Decode`] value whose encoding always occupies `SIZE` bytes
pub trait Fixed: Decode {
    const SIZE: usize;
}

/// Big-endian cursor over a borrowed byte slice
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(DecoderError::UnexpectedEnd { needed, available });
        }
        Ok(())
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        Ok(self.cursor.read_u16::<BigEndian>()?)
    }

    /// Three byte unsigned integer (odometer values, geo coordinates)
    pub fn u24(&mut self) -> Result<u32> {
        self.ensure(3)?;
        Ok(self.cursor.read_u24::<BigEndian>()?)
    }

    /// Three byte two's complement integer
    pub fn i24(&mut self) -> Result<i32> {
        self.ensure(3)?;
        Ok(self.cursor.read_i24::<BigEndian>()?)
    }

    pub fn u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        Ok(self.cursor.read_u32::<BigEndian>()?)
    }

    /// Borrow the next `len` bytes
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position((start + len) as u64);
        Ok(&data[start..start + len])
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Everything not read yet
    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.position().min(self.len());
        let data: &'a [u8] = *self.cursor.get_ref();
        self.cursor.set_position(data.len() as u64);
        &data[start..]
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    pub fn decode<T: Decode>(&mut self) -> Result<T> {
        T::decode(self)
    }

    /// Decode `count` fixed-size records, checking the total width up front
    /// so a bogus count cannot trigger a large allocation.
    pub fn repeated<T: Fixed>(&mut self, count: usize) -> Result<Vec<T>> {
        self.ensure(count.saturating_mul(T::SIZE))?;
        (0..count).map(|_| T::decode(self)).collect()
    }
}

/// True if a record slot was never written (all zero or all 0xFF)
pub fn is_unused(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0x00) || bytes.iter().all(|&b| b == 0xFF)
}

/// Decode a run of fixed-width records filling `data` exactly, optionally
/// dropping slots that were never written.
pub fn records<T: Fixed>(data: &[u8], skip_unused: bool) -> Result<Vec<T>> {
    records_with(data, T::SIZE, skip_unused, T::decode)
}

/// Like [`records`], for record types whose width depends on context
pub fn records_with<T>(
    data: &[u8],
    size: usize,
    skip_unused: bool,
    decode: impl Fn(&mut Reader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    if size == 0 || data.len() % size != 0 {
        return Err(DecoderError::Malformed(format!(
            "{} byte(s) is not a multiple of the {} byte record size",
            data.len(),
            size
        )));
    }
    data.chunks(size)
        .filter(|chunk| !(skip_unused && is_unused(chunk)))
        .map(|chunk| decode(&mut Reader::new(chunk)))
        .collect()
}

/// Binary coded decimal, two digits per byte
pub fn bcd(bytes: &[u8]) -> Result<u32> {
    let mut value: u32 = 0;
    for &byte in bytes {
        let (high, low) = (byte >> 4, byte & 0x0F);
        if high > 9 || low > 9 {
            return Err(DecoderError::Malformed(format!("invalid BCD byte 0x{:02X}", byte)));
        }
        value = value * 100 + u32::from(high) * 10 + u32::from(low);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_big_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.u8().unwrap(), 0x01);
        assert_eq!(reader.u16().unwrap(), 0x0203);
        assert_eq!(reader.u24().unwrap(), 0x040506);
        assert_eq!(reader.u32().unwrap(), 0x0708090A);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_reader_reports_shortfall() {
        let mut reader = Reader::new(&[0x01, 0x02]);
        reader.u8().unwrap();
        match reader.u32() {
            Err(DecoderError::UnexpectedEnd { needed, available }) => {
                assert_eq!(needed, 4);
                assert_eq!(available, 1);
            }
            other => panic!("expected UnexpectedEnd, got {:?}", other),
        }
        // failed reads do not advance
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_signed_24_bit() {
        let mut reader = Reader::new(&[0xFF, 0xFF, 0xFE]);
        assert_eq!(reader.i24().unwrap(), -2);
    }

    #[test]
    fn test_bytes_and_rest() {
        let data = [1, 2, 3, 4, 5];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.bytes(2).unwrap(), &[1, 2]);
        assert_eq!(reader.array::<1>().unwrap(), [3]);
        assert_eq!(reader.rest(), &[4, 5]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_bcd() {
        assert_eq!(bcd(&[0x20, 0x24]).unwrap(), 2024);
        assert_eq!(bcd(&[0x00, 0x09]).unwrap(), 9);
        assert!(bcd(&[0x1A]).is_err());
    }

    #[test]
    fn test_is_unused() {
        assert!(is_unused(&[0, 0, 0]));
        assert!(is_unused(&[0xFF, 0xFF]));
        assert!(!is_unused(&[0, 1]));
    }
}

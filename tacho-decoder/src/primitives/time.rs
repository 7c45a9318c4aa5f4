//! Date and time encodings
//!
//! `TimeReal` is seconds since 1970-01-01 00:00 UTC in four bytes. `Datef`
//! is a four byte BCD `yyyymmdd`; an all-zero `Datef` means "no date".

use super::{bcd, Reader};
use crate::types::{DecoderError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Decode a TimeReal
pub fn time_real(reader: &mut Reader<'_>) -> Result<DateTime<Utc>> {
    let seconds = reader.u32()?;
    DateTime::from_timestamp(i64::from(seconds), 0)
        .ok_or_else(|| DecoderError::Malformed(format!("TimeReal {} out of range", seconds)))
}

/// Decode a Datef (BCD yyyymmdd)
pub fn datef(reader: &mut Reader<'_>) -> Result<Option<NaiveDate>> {
    let raw = reader.array::<4>()?;
    if raw == [0; 4] {
        return Ok(None);
    }
    let year = bcd(&raw[0..2])?;
    let month = bcd(&raw[2..3])?;
    let day = bcd(&raw[3..4])?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
        .map(Some)
        .ok_or_else(|| {
            DecoderError::Malformed(format!("invalid date {:04}-{:02}-{:02}", year, month, day))
        })
}

/// BCD month and two-digit year, as found in extended serial numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthYear {
    pub month: u8,
    pub year: u8,
}

impl MonthYear {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let raw = reader.array::<2>()?;
        Ok(Self {
            month: bcd(&raw[0..1])? as u8,
            year: bcd(&raw[1..2])? as u8,
        })
    }
}

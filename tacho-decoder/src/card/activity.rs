//! Driver activity cyclic buffer
//!
//! EF Driver_Activity_Data holds two pointers and a ring of variable-length
//! daily records. Each record starts with the length of the record before
//! it, so the ring is walked backwards from the newest day and the result
//! reversed into calendar order. Records may wrap around the end of the
//! buffer.

use crate::primitives::common::ActivityChangeInfo;
use crate::primitives::time::time_real;
use crate::primitives::{bcd, records, Reader};
use crate::types::{DecoderError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Previous length, record length, date, presence counter, distance
const DAILY_HEADER_SIZE: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardActivityDailyRecord {
    pub activity_record_date: DateTime<Utc>,
    pub activity_daily_presence_counter: u32,
    pub activity_day_distance: u16,
    pub activity_change_info: Vec<ActivityChangeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDriverActivity {
    pub oldest_day_record_pointer: u16,
    pub newest_day_record_pointer: u16,
    /// Oldest day first
    pub daily_records: Vec<CardActivityDailyRecord>,
}

impl CardDriverActivity {
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(payload);
        let oldest_day_record_pointer = reader.u16()?;
        let newest_day_record_pointer = reader.u16()?;
        let buffer = reader.rest();

        let mut activity = Self {
            oldest_day_record_pointer,
            newest_day_record_pointer,
            daily_records: Vec::new(),
        };
        if buffer.is_empty() {
            return Ok(activity);
        }

        let size = buffer.len();
        let oldest = usize::from(oldest_day_record_pointer);
        let newest = usize::from(newest_day_record_pointer);
        if oldest >= size || newest >= size {
            return Err(DecoderError::Malformed(format!(
                "activity pointers {}/{} outside a {} byte buffer",
                oldest, newest, size
            )));
        }

        let mut position = newest;
        let mut walked = 0;
        loop {
            let header = wrapped(buffer, position, 4);
            let previous_length = usize::from(u16::from_be_bytes([header[0], header[1]]));
            let record_length = usize::from(u16::from_be_bytes([header[2], header[3]]));
            if record_length == 0 {
                // never written
                break;
            }
            if record_length < DAILY_HEADER_SIZE
                || (record_length - DAILY_HEADER_SIZE) % 2 != 0
                || record_length > size
            {
                return Err(DecoderError::Malformed(format!(
                    "daily record at {} has invalid length {}",
                    position, record_length
                )));
            }
            walked += record_length;
            if walked > size {
                return Err(DecoderError::Malformed(
                    "daily records overrun the activity buffer".to_string(),
                ));
            }

            let record = wrapped(buffer, position, record_length);
            activity.daily_records.push(decode_daily(&record)?);

            if position == oldest || previous_length == 0 {
                break;
            }
            if previous_length > size {
                return Err(DecoderError::Malformed(format!(
                    "daily record at {} points {} byte(s) back",
                    position, previous_length
                )));
            }
            position = (position + size - previous_length) % size;
        }

        activity.daily_records.reverse();
        log::trace!(
            "Activity buffer of {} bytes holds {} day(s)",
            size,
            activity.daily_records.len()
        );
        Ok(activity)
    }
}

/// `len` bytes starting at `start`, continuing at the front of the buffer
fn wrapped(buffer: &[u8], start: usize, len: usize) -> Vec<u8> {
    buffer.iter().cycle().skip(start).take(len).copied().collect()
}

fn decode_daily(record: &[u8]) -> Result<CardActivityDailyRecord> {
    let mut reader = Reader::new(record);
    reader.skip(4)?;
    Ok(CardActivityDailyRecord {
        activity_record_date: time_real(&mut reader)?,
        activity_daily_presence_counter: bcd(reader.bytes(2)?)?,
        activity_day_distance: reader.u16()?,
        activity_change_info: records(reader.rest(), false)?,
    })
}

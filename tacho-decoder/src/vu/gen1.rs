//! First generation VU transfers
//!
//! Each transfer is a fixed sequence of blocks. Some blocks start with a
//! record count and are followed by that many fixed-size records; the rest
//! have a constant width. Every transfer ends with a 128 byte RSA signature.

use super::records::*;
use crate::certificates::{gen1::CERTIFICATE_SIZE, CertificateRecord};
use crate::primitives::common::{
    ActivityChangeInfo, SpecificConditionRecord, VehicleRegistration,
};
use crate::primitives::text::ia5_string;
use crate::primitives::time::time_real;
use crate::primitives::{Decode, Fixed, Reader};
use crate::registry::VuTransfer;
use crate::types::{DecoderError, Generation, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const SIGNATURE_SIZE: usize = 128;

/// One block of a transfer layout
#[derive(Debug, Clone, Copy)]
enum Segment {
    Width(usize),
    /// A `count`-byte record count followed by records of `record` bytes
    Counted { count: usize, record: usize },
}

use self::Segment::{Counted, Width};

const OVERVIEW: &[Segment] = &[
    Width(2 * CERTIFICATE_SIZE),
    // VIN, registration, current time, downloadable period, slots
    Width(17 + 15 + 4 + 8 + 1),
    Width(VuDownloadActivityData::FIRST_GEN_SIZE),
    Counted { count: 1, record: VuCompanyLocksRecord::FIRST_GEN_SIZE },
    Counted { count: 1, record: VuControlActivityRecord::FIRST_GEN_SIZE },
];

const ACTIVITIES: &[Segment] = &[
    // date of day downloaded, odometer at midnight
    Width(4 + 3),
    Counted { count: 2, record: VuCardIwRecord::SIZE },
    Counted { count: 2, record: ActivityChangeInfo::SIZE },
    Counted { count: 1, record: VuPlaceDailyWorkPeriodRecord::SIZE },
    Counted { count: 2, record: SpecificConditionRecord::SIZE },
];

const EVENTS_AND_FAULTS: &[Segment] = &[
    Counted { count: 1, record: VuFaultRecord::SIZE },
    Counted { count: 1, record: VuEventRecord::SIZE },
    Width(VuOverSpeedingControlData::SIZE),
    Counted { count: 1, record: VuOverSpeedingEventRecord::SIZE },
    Counted { count: 1, record: VuTimeAdjustmentRecord::SIZE },
];

const DETAILED_SPEED: &[Segment] = &[Counted { count: 2, record: VuDetailedSpeedBlock::SIZE }];

const TECHNICAL_DATA: &[Segment] = &[
    Width(VuIdentification::SIZE + SensorPaired::SIZE),
    Counted { count: 1, record: VuCalibrationRecord::SIZE },
];

fn layout(transfer: VuTransfer) -> &'static [Segment] {
    match transfer {
        VuTransfer::Overview => OVERVIEW,
        VuTransfer::Activities => ACTIVITIES,
        VuTransfer::EventsAndFaults => EVENTS_AND_FAULTS,
        VuTransfer::DetailedSpeed => DETAILED_SPEED,
        VuTransfer::TechnicalData => TECHNICAL_DATA,
    }
}

/// Width of a transfer value including its signature
///
/// Only the count fields are read, so this succeeds on any value whose
/// structure fits the input even if its content is garbage.
pub fn width(transfer: VuTransfer, body: &[u8]) -> Result<usize> {
    let mut position = 0;
    for segment in layout(transfer) {
        match *segment {
            Segment::Width(size) => position += size,
            Segment::Counted { count, record } => {
                let field = body.get(position..position + count).ok_or(
                    DecoderError::UnexpectedEnd {
                        needed: position + count,
                        available: body.len(),
                    },
                )?;
                let records = field
                    .iter()
                    .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
                position += count + records * record;
            }
        }
    }
    let total = position + SIGNATURE_SIZE;
    if total > body.len() {
        return Err(DecoderError::UnexpectedEnd {
            needed: total,
            available: body.len(),
        });
    }
    Ok(total)
}

/// Range of a transfer value covered by its signature
///
/// The overview signature leaves out the two certificates.
pub fn signed_range(transfer: VuTransfer, width: usize) -> Range<usize> {
    let start = match transfer {
        VuTransfer::Overview => 2 * CERTIFICATE_SIZE,
        _ => 0,
    };
    start..width.saturating_sub(SIGNATURE_SIZE)
}

fn counted<T>(
    reader: &mut Reader<'_>,
    count_size: usize,
    decode: impl Fn(&mut Reader<'_>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = if count_size == 1 {
        usize::from(reader.u8()?)
    } else {
        usize::from(reader.u16()?)
    };
    (0..count).map(|_| decode(reader)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub member_state_certificate: CertificateRecord,
    pub vu_certificate: CertificateRecord,
    pub vehicle_identification_number: String,
    pub vehicle_registration: VehicleRegistration,
    pub current_date_time: DateTime<Utc>,
    pub vu_downloadable_period: VuDownloadablePeriod,
    pub card_slots_status: CardSlotsStatus,
    pub vu_download_activity_data: VuDownloadActivityData,
    pub vu_company_locks: Vec<VuCompanyLocksRecord>,
    pub vu_control_activities: Vec<VuControlActivityRecord>,
}

impl Decode for Overview {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let member_state_certificate =
            CertificateRecord::decode(Generation::Gen1, reader.bytes(CERTIFICATE_SIZE)?)?;
        let vu_certificate =
            CertificateRecord::decode(Generation::Gen1, reader.bytes(CERTIFICATE_SIZE)?)?;
        Ok(Self {
            member_state_certificate,
            vu_certificate,
            vehicle_identification_number: ia5_string(reader, 17)?,
            vehicle_registration: reader.decode()?,
            current_date_time: time_real(reader)?,
            vu_downloadable_period: reader.decode()?,
            card_slots_status: reader.decode()?,
            vu_download_activity_data: VuDownloadActivityData::decode_versioned(reader, false)?,
            vu_company_locks: counted(reader, 1, |r| {
                VuCompanyLocksRecord::decode_versioned(r, false)
            })?,
            vu_control_activities: counted(reader, 1, |r| {
                VuControlActivityRecord::decode_versioned(r, false)
            })?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activities {
    pub date_of_day_downloaded: DateTime<Utc>,
    pub odometer_value_midnight: u32,
    pub vu_card_iw_records: Vec<VuCardIwRecord>,
    pub activity_change_info: Vec<ActivityChangeInfo>,
    pub vu_place_daily_work_period_records: Vec<VuPlaceDailyWorkPeriodRecord>,
    pub specific_condition_records: Vec<SpecificConditionRecord>,
}

impl Decode for Activities {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            date_of_day_downloaded: time_real(reader)?,
            odometer_value_midnight: reader.u24()?,
            vu_card_iw_records: counted(reader, 2, VuCardIwRecord::decode)?,
            activity_change_info: counted(reader, 2, ActivityChangeInfo::decode)?,
            vu_place_daily_work_period_records: counted(
                reader,
                1,
                VuPlaceDailyWorkPeriodRecord::decode,
            )?,
            specific_condition_records: counted(reader, 2, SpecificConditionRecord::decode)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsAndFaults {
    pub vu_faults: Vec<VuFaultRecord>,
    pub vu_events: Vec<VuEventRecord>,
    pub vu_over_speeding_control_data: VuOverSpeedingControlData,
    pub vu_over_speeding_events: Vec<VuOverSpeedingEventRecord>,
    pub vu_time_adjustments: Vec<VuTimeAdjustmentRecord>,
}

impl Decode for EventsAndFaults {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            vu_faults: counted(reader, 1, VuFaultRecord::decode)?,
            vu_events: counted(reader, 1, VuEventRecord::decode)?,
            vu_over_speeding_control_data: reader.decode()?,
            vu_over_speeding_events: counted(reader, 1, VuOverSpeedingEventRecord::decode)?,
            vu_time_adjustments: counted(reader, 1, VuTimeAdjustmentRecord::decode)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedSpeed {
    pub vu_detailed_speed_blocks: Vec<VuDetailedSpeedBlock>,
}

impl Decode for DetailedSpeed {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            vu_detailed_speed_blocks: counted(reader, 2, VuDetailedSpeedBlock::decode)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnicalData {
    pub vu_identification: VuIdentification,
    pub sensor_paired: SensorPaired,
    pub vu_calibration_records: Vec<VuCalibrationRecord>,
}

impl Decode for TechnicalData {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            vu_identification: reader.decode()?,
            sensor_paired: reader.decode()?,
            vu_calibration_records: counted(reader, 1, VuCalibrationRecord::decode)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_width() {
        // certificates, fixed blocks, no locks, no controls
        let mut body = vec![0u8; 388 + 45 + 58];
        body.extend_from_slice(&[0, 0]);
        body.extend_from_slice(&[0u8; SIGNATURE_SIZE]);
        assert_eq!(width(VuTransfer::Overview, &body).unwrap(), body.len());
        assert_eq!(signed_range(VuTransfer::Overview, body.len()), 388..493);
    }

    #[test]
    fn test_counted_width() {
        // two speed blocks
        let mut body = vec![0x00, 0x02];
        body.extend_from_slice(&[0u8; 128 + SIGNATURE_SIZE]);
        body.extend_from_slice(&[0xEE; 10]);
        assert_eq!(width(VuTransfer::DetailedSpeed, &body).unwrap(), 2 + 128 + 128);
    }

    #[test]
    fn test_width_past_end() {
        let body = vec![0x00, 0x05, 0x00];
        match width(VuTransfer::DetailedSpeed, &body) {
            Err(DecoderError::UnexpectedEnd { needed, available }) => {
                assert_eq!(needed, 2 + 5 * 64 + SIGNATURE_SIZE);
                assert_eq!(available, 3);
            }
            other => panic!("expected UnexpectedEnd, got {:?}", other),
        }
    }

    #[test]
    fn test_detailed_speed_decode() {
        let mut body = vec![0x00, 0x01, 0x65, 0xE1, 0x1A, 0x80];
        body.extend_from_slice(&[50u8; 60]);
        let speed = DetailedSpeed::decode(&mut Reader::new(&body)).unwrap();
        assert_eq!(speed.vu_detailed_speed_blocks.len(), 1);
        assert_eq!(speed.vu_detailed_speed_blocks[0].speeds_per_second[0], 50);
    }
}

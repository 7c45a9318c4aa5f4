//! Second generation VU transfers
//!
//! A transfer is a run of record arrays, each one
//!
//! ```text
//! record type (1) | record size (2) | number of records (2) | records
//! ```
//!
//! ending with the signature record array. The array headers make the
//! transfer self-describing, so unknown record types can be kept as bytes.

use super::records::*;
use crate::certificates::CertificateRecord;
use crate::primitives::common::{ActivityChangeInfo, SpecificConditionRecord, VehicleRegistration};
use crate::primitives::text::{code_page_string, ia5_string};
use crate::primitives::time::time_real;
use crate::primitives::{Decode, Fixed, Reader};
use crate::registry::VuTransfer;
use crate::types::{DecoderError, Generation, HexBytes, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;

pub const ARRAY_HEADER_SIZE: usize = 5;

pub const MEMBER_STATE_CERTIFICATE: u8 = 0x04;
pub const SIGNATURE: u8 = 0x08;
pub const VU_CERTIFICATE: u8 = 0x0F;

/// Record type names, as used in the JSON output
const RECORD_TYPES: &[(u8, &str)] = &[
    (0x01, "activity_change_info"),
    (0x02, "card_slots_status"),
    (0x03, "current_date_time"),
    (0x04, "member_state_certificate"),
    (0x05, "odometer_value_midnight"),
    (0x06, "date_of_day_downloaded"),
    (0x07, "sensor_paired"),
    (0x08, "signature"),
    (0x09, "specific_condition_record"),
    (0x0A, "vehicle_identification_number"),
    (0x0B, "vehicle_registration_number"),
    (0x0C, "vu_calibration_record"),
    (0x0D, "vu_card_iw_record"),
    (0x0E, "vu_card_record"),
    (0x0F, "vu_certificate"),
    (0x10, "vu_company_locks_record"),
    (0x11, "vu_control_activity_record"),
    (0x12, "vu_detailed_speed_block"),
    (0x13, "vu_downloadable_period"),
    (0x14, "vu_download_activity_data"),
    (0x15, "vu_event_record"),
    (0x16, "vu_gnss_ad_record"),
    (0x17, "vu_its_consent_record"),
    (0x18, "vu_fault_record"),
    (0x19, "vu_identification"),
    (0x1A, "vu_over_speeding_control_data"),
    (0x1B, "vu_over_speeding_event_record"),
    (0x1C, "vu_place_daily_work_period_record"),
    (0x1D, "vu_time_adjustment_gnss_record"),
    (0x1E, "vu_time_adjustment_record"),
    (0x1F, "vu_power_supply_interruption_record"),
    (0x20, "sensor_paired_record"),
    (0x21, "sensor_external_gnss_coupled_record"),
    (0x22, "vu_border_crossing_record"),
    (0x23, "vu_load_unload_record"),
    (0x24, "vehicle_registration_identification"),
];

/// Name of a record type, `None` if the type is not assigned
pub fn record_type_name(record_type: u8) -> Option<&'static str> {
    RECORD_TYPES
        .iter()
        .find(|(code, _)| *code == record_type)
        .map(|(_, name)| *name)
}

/// Position of one record array inside a transfer value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayLayout {
    pub record_type: u8,
    pub record_size: usize,
    pub count: usize,
    /// Offset of the array header
    pub offset: usize,
}

impl ArrayLayout {
    pub fn records(&self) -> Range<usize> {
        let start = self.offset + ARRAY_HEADER_SIZE;
        start..start + self.record_size * self.count
    }

    /// Header and records
    pub fn span(&self) -> Range<usize> {
        self.offset..self.records().end
    }
}

/// Walk the array headers of a transfer up to and including the signature
/// array
pub fn layout(body: &[u8]) -> Result<Vec<ArrayLayout>> {
    let mut arrays = Vec::new();
    let mut offset = 0;
    loop {
        let header = body.get(offset..offset + ARRAY_HEADER_SIZE).ok_or(
            DecoderError::UnexpectedEnd {
                needed: offset + ARRAY_HEADER_SIZE,
                available: body.len(),
            },
        )?;
        let array = ArrayLayout {
            record_type: header[0],
            record_size: usize::from(u16::from_be_bytes([header[1], header[2]])),
            count: usize::from(u16::from_be_bytes([header[3], header[4]])),
            offset,
        };
        let end = array.records().end;
        if end > body.len() {
            return Err(DecoderError::UnexpectedEnd {
                needed: end,
                available: body.len(),
            });
        }
        arrays.push(array);
        offset = end;
        if array.record_type == SIGNATURE {
            return Ok(arrays);
        }
    }
}

/// Ranges of a transfer value covered by its signature
///
/// Everything before the signature array, except certificate arrays in the
/// overview.
pub fn signed_ranges(transfer: VuTransfer, arrays: &[ArrayLayout]) -> Vec<Range<usize>> {
    let mut ranges: Vec<Range<usize>> = Vec::new();
    for array in arrays {
        let excluded = array.record_type == SIGNATURE
            || (transfer == VuTransfer::Overview
                && matches!(array.record_type, MEMBER_STATE_CERTIFICATE | VU_CERTIFICATE));
        if excluded {
            continue;
        }
        let span = array.span();
        match ranges.last_mut() {
            Some(last) if last.end == span.start => last.end = span.end,
            _ => ranges.push(span),
        }
    }
    ranges
}

/// A decoded record; types without a decoded layout stay as bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum VuRecord {
    ActivityChangeInfo(ActivityChangeInfo),
    CardSlotsStatus(CardSlotsStatus),
    DateTime(DateTime<Utc>),
    Certificate(CertificateRecord),
    OdometerValue(u32),
    SensorPaired(SensorPaired),
    SpecificCondition(SpecificConditionRecord),
    Text(String),
    VehicleRegistration(VehicleRegistration),
    Calibration(Box<VuCalibrationRecord>),
    CardIw(Box<VuCardIwRecord>),
    Card(VuCardRecord),
    DownloadablePeriod(VuDownloadablePeriod),
    DownloadActivity(VuDownloadActivityData),
    CompanyLock(VuCompanyLocksRecord),
    ControlActivity(VuControlActivityRecord),
    DetailedSpeedBlock(VuDetailedSpeedBlock),
    Event(VuEventRecord),
    GnssAccumulatedDriving(VuGnssAdRecord),
    ItsConsent(VuItsConsentRecord),
    Fault(VuFaultRecord),
    Identification(VuIdentification),
    OverSpeedingControl(VuOverSpeedingControlData),
    OverSpeedingEvent(VuOverSpeedingEventRecord),
    PlaceDailyWorkPeriod(VuPlaceDailyWorkPeriodRecord),
    TimeAdjustmentGnss(VuTimeAdjustmentGnssRecord),
    TimeAdjustment(VuTimeAdjustmentRecord),
    PowerSupplyInterruption(VuPowerSupplyInterruptionRecord),
    SensorPairedRecord(SensorPairedRecord),
    SensorExternalGnssCoupled(SensorExternalGnssCoupledRecord),
    BorderCrossing(VuBorderCrossingRecord),
    LoadUnload(VuLoadUnloadRecord),
    Raw(HexBytes),
}

/// Record size a typed decode expects for a record type, if typed at all
fn typed_size(record_type: u8) -> Option<usize> {
    let size = match record_type {
        0x01 => ActivityChangeInfo::SIZE,
        0x02 => CardSlotsStatus::SIZE,
        0x03 | 0x06 => 4,
        0x05 => 3,
        0x07 => SensorPaired::SIZE,
        0x09 => SpecificConditionRecord::SIZE,
        0x0A => 17,
        0x0B => 14,
        0x0C => VuCalibrationRecord::SECOND_GEN_SIZE,
        0x0D => VuCardIwRecord::SECOND_GEN_SIZE,
        0x0E => VuCardRecord::SIZE,
        0x10 => VuCompanyLocksRecord::SECOND_GEN_SIZE,
        0x11 => VuControlActivityRecord::SECOND_GEN_SIZE,
        0x12 => VuDetailedSpeedBlock::SIZE,
        0x13 => VuDownloadablePeriod::SIZE,
        0x14 => VuDownloadActivityData::SECOND_GEN_SIZE,
        0x15 => VuEventRecord::SECOND_GEN_SIZE,
        0x16 => VuGnssAdRecord::SIZE,
        0x17 => VuItsConsentRecord::SIZE,
        0x18 => VuFaultRecord::SECOND_GEN_SIZE,
        0x19 => VuIdentification::SECOND_GEN_SIZE,
        0x1A => VuOverSpeedingControlData::SIZE,
        0x1B => VuOverSpeedingEventRecord::SECOND_GEN_SIZE,
        0x1C => VuPlaceDailyWorkPeriodRecord::SECOND_GEN_SIZE,
        0x1D => VuTimeAdjustmentGnssRecord::SIZE,
        0x1E => VuTimeAdjustmentRecord::SECOND_GEN_SIZE,
        0x1F => VuPowerSupplyInterruptionRecord::SIZE,
        0x20 => SensorPairedRecord::SIZE,
        0x21 => SensorExternalGnssCoupledRecord::SIZE,
        0x22 => VuBorderCrossingRecord::SIZE,
        0x23 => VuLoadUnloadRecord::SIZE,
        0x24 => VehicleRegistration::SIZE,
        _ => return None,
    };
    Some(size)
}

fn decode_record(record_type: u8, bytes: &[u8]) -> Result<VuRecord> {
    let reader = &mut Reader::new(bytes);
    if matches!(record_type, MEMBER_STATE_CERTIFICATE | VU_CERTIFICATE) {
        return CertificateRecord::decode(Generation::Gen2V1, bytes).map(VuRecord::Certificate);
    }
    if typed_size(record_type) != Some(bytes.len()) {
        return Ok(VuRecord::Raw(HexBytes::from(bytes)));
    }
    let record = match record_type {
        0x01 => VuRecord::ActivityChangeInfo(reader.decode()?),
        0x02 => VuRecord::CardSlotsStatus(reader.decode()?),
        0x03 | 0x06 => VuRecord::DateTime(time_real(reader)?),
        0x05 => VuRecord::OdometerValue(reader.u24()?),
        0x07 => VuRecord::SensorPaired(reader.decode()?),
        0x09 => VuRecord::SpecificCondition(reader.decode()?),
        0x0A => VuRecord::Text(ia5_string(reader, 17)?),
        0x0B => VuRecord::Text(code_page_string(reader, 14)?),
        0x0C => VuRecord::Calibration(Box::new(VuCalibrationRecord::decode_versioned(reader, true)?)),
        0x0D => VuRecord::CardIw(Box::new(VuCardIwRecord::decode_versioned(reader, true)?)),
        0x0E => VuRecord::Card(reader.decode()?),
        0x10 => VuRecord::CompanyLock(VuCompanyLocksRecord::decode_versioned(reader, true)?),
        0x11 => VuRecord::ControlActivity(VuControlActivityRecord::decode_versioned(reader, true)?),
        0x12 => VuRecord::DetailedSpeedBlock(reader.decode()?),
        0x13 => VuRecord::DownloadablePeriod(reader.decode()?),
        0x14 => VuRecord::DownloadActivity(VuDownloadActivityData::decode_versioned(reader, true)?),
        0x15 => VuRecord::Event(VuEventRecord::decode_versioned(reader, true)?),
        0x16 => VuRecord::GnssAccumulatedDriving(reader.decode()?),
        0x17 => VuRecord::ItsConsent(reader.decode()?),
        0x18 => VuRecord::Fault(VuFaultRecord::decode_versioned(reader, true)?),
        0x19 => VuRecord::Identification(VuIdentification::decode_versioned(reader, true)?),
        0x1A => VuRecord::OverSpeedingControl(reader.decode()?),
        0x1B => VuRecord::OverSpeedingEvent(VuOverSpeedingEventRecord::decode_versioned(reader, true)?),
        0x1C => VuRecord::PlaceDailyWorkPeriod(VuPlaceDailyWorkPeriodRecord::decode_versioned(
            reader, true,
        )?),
        0x1D => VuRecord::TimeAdjustmentGnss(reader.decode()?),
        0x1E => VuRecord::TimeAdjustment(VuTimeAdjustmentRecord::decode_versioned(reader, true)?),
        0x1F => VuRecord::PowerSupplyInterruption(reader.decode()?),
        0x20 => VuRecord::SensorPairedRecord(reader.decode()?),
        0x21 => VuRecord::SensorExternalGnssCoupled(reader.decode()?),
        0x22 => VuRecord::BorderCrossing(reader.decode()?),
        0x23 => VuRecord::LoadUnload(reader.decode()?),
        0x24 => VuRecord::VehicleRegistration(reader.decode()?),
        _ => VuRecord::Raw(HexBytes::from(bytes)),
    };
    Ok(record)
}

/// A record that failed its typed decode and was kept as bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFault {
    pub record_type: u8,
    /// Offset of the record inside the transfer value
    pub offset: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordArray {
    pub record_type: u8,
    /// Record type name, absent for unassigned types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_type_name: Option<String>,
    pub record_size: u16,
    pub records: Vec<VuRecord>,
}

/// A second generation transfer: its record arrays, without the signature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferData {
    pub record_arrays: Vec<RecordArray>,
}

impl TransferData {
    /// Decode the arrays laid out by [`layout`], skipping the signature array
    ///
    /// A record that fails to decode is kept as bytes and reported in the
    /// returned faults; its neighbours are unaffected.
    pub fn decode(body: &[u8], arrays: &[ArrayLayout]) -> (Self, Vec<RecordFault>) {
        let mut record_arrays = Vec::with_capacity(arrays.len());
        let mut faults = Vec::new();
        for array in arrays.iter().filter(|a| a.record_type != SIGNATURE) {
            let start = array.records().start;
            let records = &body[array.records()];
            let decoded = if array.record_size == 0 {
                Vec::new()
            } else {
                records
                    .chunks(array.record_size)
                    .enumerate()
                    .map(|(index, record)| {
                        decode_record(array.record_type, record).unwrap_or_else(|e| {
                            faults.push(RecordFault {
                                record_type: array.record_type,
                                offset: start + index * array.record_size,
                                reason: e.to_string(),
                            });
                            VuRecord::Raw(HexBytes::from(record))
                        })
                    })
                    .collect()
            };
            record_arrays.push(RecordArray {
                record_type: array.record_type,
                record_type_name: record_type_name(array.record_type).map(str::to_string),
                record_size: array.record_size as u16,
                records: decoded,
            });
        }
        (Self { record_arrays }, faults)
    }

    /// Records of the first array of the given type
    pub fn records_of(&self, record_type: u8) -> Option<&[VuRecord]> {
        self.record_arrays
            .iter()
            .find(|a| a.record_type == record_type)
            .map(|a| a.records.as_slice())
    }
}

/// The signature bytes of a laid out transfer
pub fn signature_range(arrays: &[ArrayLayout]) -> Option<Range<usize>> {
    arrays
        .iter()
        .find(|a| a.record_type == SIGNATURE)
        .map(ArrayLayout::records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(record_type: u8, record_size: u16, records: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![record_type];
        out.extend_from_slice(&record_size.to_be_bytes());
        out.extend_from_slice(&(records.len() as u16).to_be_bytes());
        for record in records {
            out.extend_from_slice(record);
        }
        out
    }

    /// Record bytes assembled field by field
    #[derive(Default)]
    struct Fields(Vec<u8>);

    impl Fields {
        fn u8(mut self, value: u8) -> Self {
            self.0.push(value);
            self
        }

        fn bytes(mut self, bytes: &[u8]) -> Self {
            self.0.extend_from_slice(bytes);
            self
        }

        /// 2024-03-01T00:00:00Z
        fn time(self) -> Self {
            self.bytes(&[0x65, 0xE1, 0x1A, 0x80])
        }

        fn ia5(mut self, text: &str, len: usize) -> Self {
            let mut field = text.as_bytes().to_vec();
            field.resize(len, b' ');
            self.0.extend(field);
            self
        }

        fn code_page(self, text: &str, len: usize) -> Self {
            self.u8(1).ia5(text, len - 1)
        }

        /// Driver card number and card generation
        fn card(self, number: &str) -> Self {
            self.u8(1).u8(0x0D).ia5(number, 16).u8(2)
        }

        fn no_card(self) -> Self {
            self.bytes(&[0u8; 19])
        }

        fn serial(self) -> Self {
            self.bytes(&[0x00, 0x01, 0xE2, 0x40, 0x03, 0x24, 0x09, 0x11])
        }

        fn gnss_place(self) -> Self {
            self.time().u8(2).bytes(&[0x00, 0xC3, 0x50]).bytes(&[0xFF, 0xD8, 0xF0])
        }

        fn decode_as(self, record_type: u8) -> VuRecord {
            assert_eq!(typed_size(record_type), Some(self.0.len()));
            decode_record(record_type, &self.0).unwrap()
        }
    }

    #[test]
    fn test_layout_stops_at_signature() {
        let mut body = array(0x03, 4, &[&[0x65, 0xE1, 0x1A, 0x80]]);
        body.extend(array(0x05, 3, &[&[0x00, 0x01, 0x00]]));
        body.extend(array(SIGNATURE, 64, &[&[0xAB; 64]]));
        body.extend_from_slice(&[0x76, 0x21]);

        let arrays = layout(&body).unwrap();
        assert_eq!(arrays.len(), 3);
        assert_eq!(arrays[2].span().end, body.len() - 2);
        assert_eq!(signature_range(&arrays), Some(22..86));

        let (data, faults) = TransferData::decode(&body, &arrays);
        assert!(faults.is_empty());
        assert_eq!(data.record_arrays.len(), 2);
        assert_eq!(
            data.record_arrays[0].record_type_name.as_deref(),
            Some("current_date_time")
        );
        assert_eq!(data.records_of(0x05), Some(&[VuRecord::OdometerValue(256)][..]));
    }

    #[test]
    fn test_overview_signature_skips_certificates() {
        let mut body = array(MEMBER_STATE_CERTIFICATE, 3, &[&[1, 2, 3]]);
        body.extend(array(VU_CERTIFICATE, 2, &[&[4, 5]]));
        body.extend(array(0x0A, 17, &[b"WDB9634031L123456"]));
        body.extend(array(0x02, 1, &[&[0x10]]));
        body.extend(array(SIGNATURE, 64, &[&[0u8; 64]]));

        let arrays = layout(&body).unwrap();
        let ranges = signed_ranges(VuTransfer::Overview, &arrays);
        assert_eq!(ranges, vec![arrays[2].offset..arrays[3].span().end]);

        let all = signed_ranges(VuTransfer::Activities, &arrays);
        assert_eq!(all, vec![0..arrays[3].span().end]);
    }

    #[test]
    fn test_unexpected_size_is_kept_raw() {
        let record = decode_record(0x05, &[1, 2, 3, 4]).unwrap();
        assert_eq!(record, VuRecord::Raw(HexBytes(vec![1, 2, 3, 4])));
        let record = decode_record(0x16, &[9; 5]).unwrap();
        assert_eq!(record, VuRecord::Raw(HexBytes(vec![9; 5])));
    }

    #[test]
    fn test_failing_record_is_isolated() {
        // the second VIN carries a byte outside IA5
        let mut body = array(0x0A, 17, &[b"WDB9634031L123456", b"WDB9634031L12345\xC3"]);
        body.extend(array(0x05, 3, &[&[0x00, 0x00, 0x07]]));
        body.extend(array(SIGNATURE, 64, &[&[0u8; 64]]));

        let arrays = layout(&body).unwrap();
        let (data, faults) = TransferData::decode(&body, &arrays);
        assert_eq!(data.record_arrays.len(), 2);
        let vins = data.records_of(0x0A).unwrap();
        assert_eq!(vins[0], VuRecord::Text("WDB9634031L123456".to_string()));
        assert_eq!(vins[1], VuRecord::Raw(HexBytes(b"WDB9634031L12345\xC3".to_vec())));
        assert_eq!(data.records_of(0x05), Some(&[VuRecord::OdometerValue(7)][..]));

        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].record_type, 0x0A);
        assert_eq!(faults[0].offset, ARRAY_HEADER_SIZE + 17);
    }

    #[test]
    fn test_sensor_paired() {
        let record = Fields::default().serial().ia5("e1-0001", 8).time().decode_as(0x07);
        let VuRecord::SensorPaired(sensor) = record else {
            panic!("not a sensor pairing");
        };
        assert_eq!(sensor.sensor_serial_number.serial_number, 123_456);
        assert_eq!(sensor.sensor_approval_number, "e1-0001");
    }

    #[test]
    fn test_calibration_record() {
        let mut fields = Fields::default()
            .u8(3)
            .code_page("Werkstatt Nord", 36)
            .code_page("Hafenstrasse 1", 36)
            .card("W000001234560000")
            .time()
            .ia5("WDB9634031L123456", 17)
            .u8(0x0D)
            .code_page("B-TC 1234", 14)
            .bytes(&[0x1F, 0x40, 0x1F, 0x40, 0x61, 0xA8])
            .ia5("315/80 R22.5", 15)
            .u8(90)
            .bytes(&[0x01, 0x86, 0xA0, 0x01, 0x86, 0xA5])
            .time()
            .time()
            .time();
        for seal in 0..SEAL_RECORDS as u8 {
            fields = fields.u8(1).bytes(&[0x00, 0x0A]).bytes(&[0, 0, 0, 0, 0, 0, 0, seal]);
        }
        let VuRecord::Calibration(calibration) = fields.decode_as(0x0C) else {
            panic!("not a calibration");
        };
        assert_eq!(calibration.workshop_name, "Werkstatt Nord");
        assert_eq!(calibration.card_generation, Some(2));
        assert_eq!(calibration.vehicle_registration.number, "B-TC 1234");
        assert_eq!(calibration.l_tyre_circumference, 25_000);
        assert_eq!(calibration.new_odometer_value, 100_005);
        assert_eq!(calibration.seal_data.len(), SEAL_RECORDS);
        assert_eq!(calibration.seal_data[4].seal_identifier, 4);
    }

    #[test]
    fn test_card_iw_record() {
        let record = Fields::default()
            .code_page("Muster", 36)
            .code_page("Erika", 36)
            .card("D000001234560000")
            .time()
            .time()
            .bytes(&[0x01, 0x86, 0xA0])
            .u8(0)
            .time()
            .bytes(&[0x01, 0x87, 0x00])
            .u8(0x0D)
            .code_page("B-TC 1234", 14)
            .time()
            .u8(1)
            .u8(0)
            .decode_as(0x0D);
        let VuRecord::CardIw(iw) = record else {
            panic!("not a card insertion");
        };
        assert_eq!(iw.card_holder_name.surname, "Muster");
        assert_eq!(iw.full_card_number.as_ref().unwrap().card_number, "D000001234560000");
        assert_eq!(iw.card_generation, Some(2));
        assert_eq!(iw.vehicle_odometer_value_at_withdrawal, 100_096);
        assert_eq!(iw.previous_vu_generation, Some(1));
        assert_eq!(iw.manual_input_flag, 0);
    }

    #[test]
    fn test_card_record() {
        let record = Fields::default()
            .card("D000001234560000")
            .serial()
            .bytes(&[0x01, 0x00])
            .ia5("D000001234560000", 16)
            .decode_as(0x0E);
        let VuRecord::Card(card) = record else {
            panic!("not a card record");
        };
        assert_eq!(card.card_generation, 2);
        assert_eq!(card.card_structure_version, 0x0100);
        assert_eq!(card.card_number, "D000001234560000");
    }

    #[test]
    fn test_event_record() {
        let record = Fields::default()
            .u8(0x05)
            .u8(0x01)
            .time()
            .time()
            .card("D000001234560000")
            .no_card()
            .card("D000001234560000")
            .no_card()
            .u8(2)
            .bytes(&[0x0A, 0x00, 0x01, 0x02])
            .decode_as(0x15);
        let VuRecord::Event(event) = record else {
            panic!("not an event");
        };
        assert_eq!(event.event_type, 0x05);
        assert!(event.cards.card_number_driver_slot_begin.is_some());
        assert!(event.cards.card_number_codriver_slot_begin.is_none());
        assert_eq!(event.cards.card_generations, vec![2, 0, 2, 0]);
        assert_eq!(event.similar_events_number, 2);
        let specific = event.manufacturer_specific_data.unwrap();
        assert_eq!((specific.manufacturer_code, specific.error_code), (0x0A, 0x102));
    }

    #[test]
    fn test_gnss_accumulated_driving_record() {
        let record = Fields::default()
            .time()
            .card("D000001234560000")
            .no_card()
            .gnss_place()
            .bytes(&[0x01, 0x86, 0xA0])
            .decode_as(0x16);
        let VuRecord::GnssAccumulatedDriving(driving) = record else {
            panic!("not a GNSS record");
        };
        assert_eq!(driving.cards.driver_card_generation, 2);
        assert!(driving.cards.card_number_codriver_slot.is_none());
        assert_eq!(driving.gnss_place_record.geo_coordinates.latitude, 50_000);
        assert_eq!(driving.gnss_place_record.geo_coordinates.longitude, -10_000);
        assert_eq!(driving.vehicle_odometer_value, 100_000);
    }

    #[test]
    fn test_its_consent_record() {
        let record = Fields::default().card("D000001234560000").u8(1).decode_as(0x17);
        let VuRecord::ItsConsent(consent) = record else {
            panic!("not a consent record");
        };
        assert!(consent.consent);
        assert_eq!(consent.card_generation, 2);
    }

    #[test]
    fn test_fault_record() {
        let record = Fields::default()
            .u8(0x31)
            .u8(0x02)
            .time()
            .time()
            .no_card()
            .no_card()
            .no_card()
            .card("D000001234560000")
            .bytes(&[0x0A, 0x00, 0x00, 0x07])
            .decode_as(0x18);
        let VuRecord::Fault(fault) = record else {
            panic!("not a fault");
        };
        assert_eq!(fault.fault_type, 0x31);
        assert!(fault.cards.card_number_codriver_slot_end.is_some());
        assert_eq!(fault.manufacturer_specific_data.unwrap().error_code, 7);
    }

    #[test]
    fn test_identification() {
        let record = Fields::default()
            .code_page("Tacho Werke", 36)
            .code_page("Industriestrasse 5", 36)
            .ia5("PN-4711", 16)
            .serial()
            .ia5("0102", 4)
            .time()
            .time()
            .ia5("e1-84-0001-2", 16)
            .u8(2)
            .u8(0x01)
            .decode_as(0x19);
        let VuRecord::Identification(identification) = record else {
            panic!("not an identification");
        };
        assert_eq!(identification.vu_manufacturer_name, "Tacho Werke");
        assert_eq!(identification.vu_approval_number, "e1-84-0001-2");
        assert_eq!(identification.vu_generation, Some(2));
        assert_eq!(identification.vu_ability, Some(1));
    }

    #[test]
    fn test_over_speeding_control_data() {
        let record = Fields::default().time().time().u8(3).decode_as(0x1A);
        let VuRecord::OverSpeedingControl(control) = record else {
            panic!("not over speeding control data");
        };
        assert_eq!(control.number_of_overspeed_since, 3);
    }

    #[test]
    fn test_over_speeding_event_record() {
        let record = Fields::default()
            .u8(0x07)
            .u8(0x01)
            .time()
            .time()
            .u8(98)
            .u8(91)
            .card("D000001234560000")
            .u8(1)
            .decode_as(0x1B);
        let VuRecord::OverSpeedingEvent(event) = record else {
            panic!("not an over speeding event");
        };
        assert_eq!((event.max_speed_value, event.average_speed_value), (98, 91));
        assert_eq!(event.card_generation, Some(2));
        assert_eq!(event.similar_events_number, 1);
    }

    #[test]
    fn test_place_daily_work_period_record() {
        let record = Fields::default()
            .card("D000001234560000")
            .time()
            .u8(0x01)
            .u8(0x0D)
            .u8(0x00)
            .bytes(&[0x01, 0x86, 0xA0])
            .gnss_place()
            .decode_as(0x1C);
        let VuRecord::PlaceDailyWorkPeriod(place) = record else {
            panic!("not a place record");
        };
        assert_eq!(place.card_generation, Some(2));
        assert_eq!(place.place_record.daily_work_period_country, 0x0D);
        assert_eq!(place.place_record.vehicle_odometer_value, 100_000);
        assert!(place.place_record.entry_gnss_place_record.is_some());
    }

    #[test]
    fn test_time_adjustment_gnss_record() {
        let record = Fields::default()
            .time()
            .bytes(&[0x65, 0xE1, 0x1A, 0x8A])
            .decode_as(0x1D);
        let VuRecord::TimeAdjustmentGnss(adjustment) = record else {
            panic!("not a GNSS time adjustment");
        };
        assert_eq!((adjustment.new_time_value - adjustment.old_time_value).num_seconds(), 10);
    }

    #[test]
    fn test_time_adjustment_record() {
        let record = Fields::default()
            .time()
            .time()
            .code_page("Werkstatt Nord", 36)
            .code_page("Hafenstrasse 1", 36)
            .card("W000001234560000")
            .decode_as(0x1E);
        let VuRecord::TimeAdjustment(adjustment) = record else {
            panic!("not a time adjustment");
        };
        assert_eq!(adjustment.workshop_address, "Hafenstrasse 1");
        assert_eq!(adjustment.card_generation, Some(2));
    }

    #[test]
    fn test_power_supply_interruption_record() {
        let record = Fields::default()
            .u8(0x08)
            .u8(0x03)
            .time()
            .time()
            .card("D000001234560000")
            .no_card()
            .no_card()
            .no_card()
            .u8(4)
            .decode_as(0x1F);
        let VuRecord::PowerSupplyInterruption(interruption) = record else {
            panic!("not a power supply interruption");
        };
        assert_eq!(interruption.event_type, 0x08);
        assert_eq!(interruption.cards.card_generations, vec![2, 0, 0, 0]);
        assert_eq!(interruption.similar_events_number, 4);
    }

    #[test]
    fn test_sensor_paired_record() {
        let record = Fields::default()
            .serial()
            .ia5("e1-84-0002-1", 16)
            .time()
            .decode_as(0x20);
        let VuRecord::SensorPairedRecord(sensor) = record else {
            panic!("not a sensor pairing");
        };
        assert_eq!(sensor.sensor_approval_number, "e1-84-0002-1");
        assert_eq!(sensor.sensor_serial_number.manufacturer_code, 0x11);
    }

    #[test]
    fn test_external_gnss_coupled_record() {
        let record = Fields::default()
            .serial()
            .ia5("e1-84-0003-0", 16)
            .time()
            .decode_as(0x21);
        let VuRecord::SensorExternalGnssCoupled(sensor) = record else {
            panic!("not a GNSS coupling");
        };
        assert_eq!(sensor.sensor_approval_number, "e1-84-0003-0");
        assert_eq!(sensor.sensor_coupling_date.to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn test_border_crossing_record() {
        let record = Fields::default()
            .card("D000001234560000")
            .no_card()
            .u8(0x0D)
            .u8(0x0F)
            .gnss_place()
            .u8(1)
            .bytes(&[0x01, 0x86, 0xA0])
            .decode_as(0x22);
        let VuRecord::BorderCrossing(crossing) = record else {
            panic!("not a border crossing");
        };
        assert_eq!((crossing.country_left, crossing.country_entered), (0x0D, 0x0F));
        assert_eq!(crossing.gnss_place_auth_record.authentication_status, 1);
        assert_eq!(crossing.vehicle_odometer_value, 100_000);
    }

    #[test]
    fn test_load_unload_record() {
        let record = Fields::default()
            .time()
            .u8(2)
            .card("D000001234560000")
            .no_card()
            .gnss_place()
            .u8(0)
            .bytes(&[0x01, 0x86, 0xA0])
            .decode_as(0x23);
        let VuRecord::LoadUnload(operation) = record else {
            panic!("not a load or unload");
        };
        assert_eq!(operation.operation_type, 2);
        assert_eq!(operation.cards.driver_card_generation, 2);
        assert_eq!(operation.gnss_place_auth_record.authentication_status, 0);
    }

    #[test]
    fn test_record_array_serializes_with_kind() {
        let record = Fields::default().card("D000001234560000").u8(0).decode_as(0x17);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "its_consent");
        assert_eq!(json["value"]["consent"], false);
        let parsed: VuRecord = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_array_overrun() {
        let body = array(0x05, 3, &[&[0, 0, 1]]);
        // no signature array follows
        assert!(matches!(
            layout(&body),
            Err(DecoderError::UnexpectedEnd { .. })
        ));
        let mut short = array(0x05, 3, &[&[0, 0, 1], &[0, 0, 2]]);
        short.truncate(9);
        assert!(layout(&short).is_err());
    }

    #[test]
    fn test_record_type_names() {
        assert_eq!(record_type_name(0x0F), Some("vu_certificate"));
        assert_eq!(record_type_name(0x7E), None);
    }
}

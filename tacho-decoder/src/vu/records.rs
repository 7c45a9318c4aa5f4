//! VU record layouts
//!
//! Records that exist in both generations take a `second_gen` flag: the
//! second generation adds the generation byte after each full card number.
//! Records only found in second generation transfers decode that layout
//! directly.

use crate::primitives::common::{
    ExtendedSerialNumber, FullCardNumber, GnssPlaceAuthRecord, GnssPlaceRecord, HolderName,
    PlaceRecord, VehicleRegistration,
};
use crate::primitives::text::{code_page_string, ia5_string};
use crate::primitives::time::time_real;
use crate::primitives::{Decode, Fixed, Reader};
use crate::types::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Full card number, plus the card generation byte in second generation records
fn card_number(
    reader: &mut Reader<'_>,
    second_gen: bool,
) -> Result<(Option<FullCardNumber>, Option<u8>)> {
    let number = FullCardNumber::decode_optional(reader)?;
    let generation = if second_gen { Some(reader.u8()?) } else { None };
    Ok((number, generation))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuDownloadablePeriod {
    pub min_downloadable_time: DateTime<Utc>,
    pub max_downloadable_time: DateTime<Utc>,
}

impl Decode for VuDownloadablePeriod {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            min_downloadable_time: time_real(reader)?,
            max_downloadable_time: time_real(reader)?,
        })
    }
}

impl Fixed for VuDownloadablePeriod {
    const SIZE: usize = 8;
}

/// Card types in the two slots, one nibble each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSlotsStatus {
    pub driver: u8,
    pub co_driver: u8,
}

impl Decode for CardSlotsStatus {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let raw = reader.u8()?;
        Ok(Self {
            driver: raw & 0x0F,
            co_driver: raw >> 4,
        })
    }
}

impl Fixed for CardSlotsStatus {
    const SIZE: usize = 1;
}

/// The last download of this VU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuDownloadActivityData {
    pub downloading_time: DateTime<Utc>,
    pub full_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub company_or_workshop_name: String,
}

impl VuDownloadActivityData {
    pub const FIRST_GEN_SIZE: usize = 58;
    pub const SECOND_GEN_SIZE: usize = 59;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let downloading_time = time_real(reader)?;
        let (full_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            downloading_time,
            full_card_number,
            card_generation,
            company_or_workshop_name: code_page_string(reader, 36)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuCompanyLocksRecord {
    pub lock_in_time: DateTime<Utc>,
    pub lock_out_time: DateTime<Utc>,
    pub company_name: String,
    pub company_address: String,
    pub company_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
}

impl VuCompanyLocksRecord {
    pub const FIRST_GEN_SIZE: usize = 98;
    pub const SECOND_GEN_SIZE: usize = 99;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let lock_in_time = time_real(reader)?;
        let lock_out_time = time_real(reader)?;
        let company_name = code_page_string(reader, 36)?;
        let company_address = code_page_string(reader, 36)?;
        let (company_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            lock_in_time,
            lock_out_time,
            company_name,
            company_address,
            company_card_number,
            card_generation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuControlActivityRecord {
    pub control_type: u8,
    pub control_time: DateTime<Utc>,
    pub control_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub download_period_begin_time: DateTime<Utc>,
    pub download_period_end_time: DateTime<Utc>,
}

impl VuControlActivityRecord {
    pub const FIRST_GEN_SIZE: usize = 31;
    pub const SECOND_GEN_SIZE: usize = 32;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let control_type = reader.u8()?;
        let control_time = time_real(reader)?;
        let (control_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            control_type,
            control_time,
            control_card_number,
            card_generation,
            download_period_begin_time: time_real(reader)?,
            download_period_end_time: time_real(reader)?,
        })
    }
}

/// A card insertion/withdrawal cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuCardIwRecord {
    pub card_holder_name: HolderName,
    pub full_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub card_expiry_date: DateTime<Utc>,
    pub card_insertion_time: DateTime<Utc>,
    pub vehicle_odometer_value_at_insertion: u32,
    pub card_slot_number: u8,
    pub card_withdrawal_time: DateTime<Utc>,
    pub vehicle_odometer_value_at_withdrawal: u32,
    pub previous_vehicle_registration: VehicleRegistration,
    pub previous_card_withdrawal_time: DateTime<Utc>,
    /// Generation of the VU the card was previously withdrawn from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_vu_generation: Option<u8>,
    pub manual_input_flag: u8,
}

impl VuCardIwRecord {
    pub const SECOND_GEN_SIZE: usize = 131;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let card_holder_name = reader.decode()?;
        let (full_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            card_holder_name,
            full_card_number,
            card_generation,
            card_expiry_date: time_real(reader)?,
            card_insertion_time: time_real(reader)?,
            vehicle_odometer_value_at_insertion: reader.u24()?,
            card_slot_number: reader.u8()?,
            card_withdrawal_time: time_real(reader)?,
            vehicle_odometer_value_at_withdrawal: reader.u24()?,
            previous_vehicle_registration: reader.decode()?,
            previous_card_withdrawal_time: time_real(reader)?,
            previous_vu_generation: if second_gen { Some(reader.u8()?) } else { None },
            manual_input_flag: reader.u8()?,
        })
    }
}

impl Decode for VuCardIwRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuCardIwRecord {
    const SIZE: usize = 129;
}

/// A place entry together with the card it was entered on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuPlaceDailyWorkPeriodRecord {
    pub full_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub place_record: PlaceRecord,
}

impl VuPlaceDailyWorkPeriodRecord {
    pub const SECOND_GEN_SIZE: usize = 40;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let (full_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            full_card_number,
            card_generation,
            place_record: PlaceRecord::decode_versioned(reader, second_gen)?,
        })
    }
}

impl Decode for VuPlaceDailyWorkPeriodRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuPlaceDailyWorkPeriodRecord {
    const SIZE: usize = 28;
}

/// Cards in the slots when an event or fault began and ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCards {
    pub card_number_driver_slot_begin: Option<FullCardNumber>,
    pub card_number_codriver_slot_begin: Option<FullCardNumber>,
    pub card_number_driver_slot_end: Option<FullCardNumber>,
    pub card_number_codriver_slot_end: Option<FullCardNumber>,
    /// Card generations, in the order of the numbers above
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub card_generations: Vec<u8>,
}

impl SlotCards {
    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let mut numbers = Vec::with_capacity(4);
        let mut card_generations = Vec::new();
        for _ in 0..4 {
            let (number, generation) = card_number(reader, second_gen)?;
            numbers.push(number);
            card_generations.extend(generation);
        }
        let mut numbers = numbers.into_iter();
        Ok(Self {
            card_number_driver_slot_begin: numbers.next().flatten(),
            card_number_codriver_slot_begin: numbers.next().flatten(),
            card_number_driver_slot_end: numbers.next().flatten(),
            card_number_codriver_slot_end: numbers.next().flatten(),
            card_generations,
        })
    }
}

/// Manufacturer code and error code attached to second generation events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManufacturerSpecificData {
    pub manufacturer_code: u8,
    pub error_code: u32,
}

impl Decode for ManufacturerSpecificData {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            manufacturer_code: reader.u8()?,
            error_code: reader.u24()?,
        })
    }
}

impl Fixed for ManufacturerSpecificData {
    const SIZE: usize = 4;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuFaultRecord {
    pub fault_type: u8,
    pub fault_record_purpose: u8,
    pub fault_begin_time: DateTime<Utc>,
    pub fault_end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub cards: SlotCards,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_specific_data: Option<ManufacturerSpecificData>,
}

impl VuFaultRecord {
    pub const SECOND_GEN_SIZE: usize = 90;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        Ok(Self {
            fault_type: reader.u8()?,
            fault_record_purpose: reader.u8()?,
            fault_begin_time: time_real(reader)?,
            fault_end_time: time_real(reader)?,
            cards: SlotCards::decode_versioned(reader, second_gen)?,
            manufacturer_specific_data: if second_gen { Some(reader.decode()?) } else { None },
        })
    }
}

impl Decode for VuFaultRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuFaultRecord {
    const SIZE: usize = 82;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuEventRecord {
    pub event_type: u8,
    pub event_record_purpose: u8,
    pub event_begin_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub cards: SlotCards,
    pub similar_events_number: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_specific_data: Option<ManufacturerSpecificData>,
}

impl VuEventRecord {
    pub const SECOND_GEN_SIZE: usize = 91;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        Ok(Self {
            event_type: reader.u8()?,
            event_record_purpose: reader.u8()?,
            event_begin_time: time_real(reader)?,
            event_end_time: time_real(reader)?,
            cards: SlotCards::decode_versioned(reader, second_gen)?,
            similar_events_number: reader.u8()?,
            manufacturer_specific_data: if second_gen { Some(reader.decode()?) } else { None },
        })
    }
}

impl Decode for VuEventRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuEventRecord {
    const SIZE: usize = 83;
}

/// Power supply interruption, recorded apart from other events (Gen2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuPowerSupplyInterruptionRecord {
    pub event_type: u8,
    pub event_record_purpose: u8,
    pub event_begin_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    #[serde(flatten)]
    pub cards: SlotCards,
    pub similar_events_number: u8,
}

impl Decode for VuPowerSupplyInterruptionRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            event_type: reader.u8()?,
            event_record_purpose: reader.u8()?,
            event_begin_time: time_real(reader)?,
            event_end_time: time_real(reader)?,
            cards: SlotCards::decode_versioned(reader, true)?,
            similar_events_number: reader.u8()?,
        })
    }
}

impl Fixed for VuPowerSupplyInterruptionRecord {
    const SIZE: usize = 87;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuOverSpeedingControlData {
    pub last_overspeed_control_time: DateTime<Utc>,
    pub first_overspeed_since: DateTime<Utc>,
    pub number_of_overspeed_since: u8,
}

impl Decode for VuOverSpeedingControlData {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            last_overspeed_control_time: time_real(reader)?,
            first_overspeed_since: time_real(reader)?,
            number_of_overspeed_since: reader.u8()?,
        })
    }
}

impl Fixed for VuOverSpeedingControlData {
    const SIZE: usize = 9;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuOverSpeedingEventRecord {
    pub event_type: u8,
    pub event_record_purpose: u8,
    pub event_begin_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    /// km/h
    pub max_speed_value: u8,
    pub average_speed_value: u8,
    pub card_number_driver_slot_begin: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub similar_events_number: u8,
}

impl VuOverSpeedingEventRecord {
    pub const SECOND_GEN_SIZE: usize = 32;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let event_type = reader.u8()?;
        let event_record_purpose = reader.u8()?;
        let event_begin_time = time_real(reader)?;
        let event_end_time = time_real(reader)?;
        let max_speed_value = reader.u8()?;
        let average_speed_value = reader.u8()?;
        let (card_number_driver_slot_begin, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            event_type,
            event_record_purpose,
            event_begin_time,
            event_end_time,
            max_speed_value,
            average_speed_value,
            card_number_driver_slot_begin,
            card_generation,
            similar_events_number: reader.u8()?,
        })
    }
}

impl Decode for VuOverSpeedingEventRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuOverSpeedingEventRecord {
    const SIZE: usize = 31;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuTimeAdjustmentRecord {
    pub old_time_value: DateTime<Utc>,
    pub new_time_value: DateTime<Utc>,
    pub workshop_name: String,
    pub workshop_address: String,
    pub workshop_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
}

impl VuTimeAdjustmentRecord {
    pub const SECOND_GEN_SIZE: usize = 99;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let old_time_value = time_real(reader)?;
        let new_time_value = time_real(reader)?;
        let workshop_name = code_page_string(reader, 36)?;
        let workshop_address = code_page_string(reader, 36)?;
        let (workshop_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            old_time_value,
            new_time_value,
            workshop_name,
            workshop_address,
            workshop_card_number,
            card_generation,
        })
    }
}

impl Decode for VuTimeAdjustmentRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuTimeAdjustmentRecord {
    const SIZE: usize = 98;
}

/// Time adjustment made from the GNSS clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuTimeAdjustmentGnssRecord {
    pub old_time_value: DateTime<Utc>,
    pub new_time_value: DateTime<Utc>,
}

impl Decode for VuTimeAdjustmentGnssRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            old_time_value: time_real(reader)?,
            new_time_value: time_real(reader)?,
        })
    }
}

impl Fixed for VuTimeAdjustmentGnssRecord {
    const SIZE: usize = 8;
}

/// One minute of speed samples, km/h per second
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuDetailedSpeedBlock {
    pub speed_block_begin_date: DateTime<Utc>,
    pub speeds_per_second: Vec<u8>,
}

impl Decode for VuDetailedSpeedBlock {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            speed_block_begin_date: time_real(reader)?,
            speeds_per_second: reader.bytes(60)?.to_vec(),
        })
    }
}

impl Fixed for VuDetailedSpeedBlock {
    const SIZE: usize = 64;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuIdentification {
    pub vu_manufacturer_name: String,
    pub vu_manufacturer_address: String,
    pub vu_part_number: String,
    pub vu_serial_number: ExtendedSerialNumber,
    pub vu_software_version: String,
    pub vu_software_installation_date: DateTime<Utc>,
    pub vu_manufacturing_date: DateTime<Utc>,
    pub vu_approval_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vu_generation: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vu_ability: Option<u8>,
}

impl VuIdentification {
    pub const SECOND_GEN_SIZE: usize = 126;

    /// The approval number grows from 8 to 16 characters in the second
    /// generation, followed by the generation and ability bytes
    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let approval_len = if second_gen { 16 } else { 8 };
        Ok(Self {
            vu_manufacturer_name: code_page_string(reader, 36)?,
            vu_manufacturer_address: code_page_string(reader, 36)?,
            vu_part_number: ia5_string(reader, 16)?,
            vu_serial_number: reader.decode()?,
            vu_software_version: ia5_string(reader, 4)?,
            vu_software_installation_date: time_real(reader)?,
            vu_manufacturing_date: time_real(reader)?,
            vu_approval_number: ia5_string(reader, approval_len)?,
            vu_generation: if second_gen { Some(reader.u8()?) } else { None },
            vu_ability: if second_gen { Some(reader.u8()?) } else { None },
        })
    }
}

impl Decode for VuIdentification {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuIdentification {
    const SIZE: usize = 116;
}

/// First generation motion sensor pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPaired {
    pub sensor_serial_number: ExtendedSerialNumber,
    pub sensor_approval_number: String,
    pub sensor_pairing_date_first: DateTime<Utc>,
}

impl Decode for SensorPaired {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            sensor_serial_number: reader.decode()?,
            sensor_approval_number: ia5_string(reader, 8)?,
            sensor_pairing_date_first: time_real(reader)?,
        })
    }
}

impl Fixed for SensorPaired {
    const SIZE: usize = 20;
}

/// Second generation motion sensor pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorPairedRecord {
    pub sensor_serial_number: ExtendedSerialNumber,
    pub sensor_approval_number: String,
    pub sensor_pairing_date: DateTime<Utc>,
}

impl Decode for SensorPairedRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            sensor_serial_number: reader.decode()?,
            sensor_approval_number: ia5_string(reader, 16)?,
            sensor_pairing_date: time_real(reader)?,
        })
    }
}

impl Fixed for SensorPairedRecord {
    const SIZE: usize = 28;
}

/// External GNSS facility coupled to the VU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorExternalGnssCoupledRecord {
    pub sensor_serial_number: ExtendedSerialNumber,
    pub sensor_approval_number: String,
    pub sensor_coupling_date: DateTime<Utc>,
}

impl Decode for SensorExternalGnssCoupledRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            sensor_serial_number: reader.decode()?,
            sensor_approval_number: ia5_string(reader, 16)?,
            sensor_coupling_date: time_real(reader)?,
        })
    }
}

impl Fixed for SensorExternalGnssCoupledRecord {
    const SIZE: usize = 28;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealRecord {
    pub equipment_type: u8,
    pub manufacturer_code: u16,
    pub seal_identifier: u64,
}

impl Decode for SealRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            equipment_type: reader.u8()?,
            manufacturer_code: reader.u16()?,
            seal_identifier: u64::from_be_bytes(reader.array()?),
        })
    }
}

impl Fixed for SealRecord {
    const SIZE: usize = 11;
}

/// Seals recorded with a second generation calibration
pub const SEAL_RECORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuCalibrationRecord {
    pub calibration_purpose: u8,
    pub workshop_name: String,
    pub workshop_address: String,
    pub workshop_card_number: Option<FullCardNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_generation: Option<u8>,
    pub workshop_card_expiry_date: DateTime<Utc>,
    pub vehicle_identification_number: String,
    pub vehicle_registration: VehicleRegistration,
    pub w_vehicle_characteristic_constant: u16,
    pub k_constant_of_recording_equipment: u16,
    /// 1/8 mm
    pub l_tyre_circumference: u16,
    pub tyre_size: String,
    pub authorised_speed: u8,
    pub old_odometer_value: u32,
    pub new_odometer_value: u32,
    pub old_time_value: DateTime<Utc>,
    pub new_time_value: DateTime<Utc>,
    pub next_calibration_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seal_data: Vec<SealRecord>,
}

impl VuCalibrationRecord {
    pub const SECOND_GEN_SIZE: usize = 223;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let calibration_purpose = reader.u8()?;
        let workshop_name = code_page_string(reader, 36)?;
        let workshop_address = code_page_string(reader, 36)?;
        let (workshop_card_number, card_generation) = card_number(reader, second_gen)?;
        Ok(Self {
            calibration_purpose,
            workshop_name,
            workshop_address,
            workshop_card_number,
            card_generation,
            workshop_card_expiry_date: time_real(reader)?,
            vehicle_identification_number: ia5_string(reader, 17)?,
            vehicle_registration: reader.decode()?,
            w_vehicle_characteristic_constant: reader.u16()?,
            k_constant_of_recording_equipment: reader.u16()?,
            l_tyre_circumference: reader.u16()?,
            tyre_size: ia5_string(reader, 15)?,
            authorised_speed: reader.u8()?,
            old_odometer_value: reader.u24()?,
            new_odometer_value: reader.u24()?,
            old_time_value: time_real(reader)?,
            new_time_value: time_real(reader)?,
            next_calibration_date: time_real(reader)?,
            seal_data: if second_gen {
                reader.repeated(SEAL_RECORDS)?
            } else {
                Vec::new()
            },
        })
    }
}

impl Decode for VuCalibrationRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Self::decode_versioned(reader, false)
    }
}

impl Fixed for VuCalibrationRecord {
    const SIZE: usize = 167;
}

/// A card seen by the VU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuCardRecord {
    pub full_card_number: Option<FullCardNumber>,
    pub card_generation: u8,
    pub card_extended_serial_number: ExtendedSerialNumber,
    pub card_structure_version: u16,
    pub card_number: String,
}

impl Decode for VuCardRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let full_card_number = FullCardNumber::decode_optional(reader)?;
        Ok(Self {
            full_card_number,
            card_generation: reader.u8()?,
            card_extended_serial_number: reader.decode()?,
            card_structure_version: reader.u16()?,
            card_number: ia5_string(reader, 16)?,
        })
    }
}

impl Fixed for VuCardRecord {
    const SIZE: usize = 45;
}

/// Cards in the driver and co-driver slots, with their generations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPair {
    pub card_number_driver_slot: Option<FullCardNumber>,
    pub driver_card_generation: u8,
    pub card_number_codriver_slot: Option<FullCardNumber>,
    pub codriver_card_generation: u8,
}

impl Decode for SlotPair {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (card_number_driver_slot, driver) = card_number(reader, true)?;
        let (card_number_codriver_slot, codriver) = card_number(reader, true)?;
        Ok(Self {
            card_number_driver_slot,
            driver_card_generation: driver.unwrap_or_default(),
            card_number_codriver_slot,
            codriver_card_generation: codriver.unwrap_or_default(),
        })
    }
}

/// Position after three hours of accumulated driving
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuGnssAdRecord {
    pub time_stamp: DateTime<Utc>,
    #[serde(flatten)]
    pub cards: SlotPair,
    pub gnss_place_record: GnssPlaceRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for VuGnssAdRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            cards: reader.decode()?,
            gnss_place_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for VuGnssAdRecord {
    const SIZE: usize = 56;
}

/// Driver consent to ITS data use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuItsConsentRecord {
    pub full_card_number: Option<FullCardNumber>,
    pub card_generation: u8,
    pub consent: bool,
}

impl Decode for VuItsConsentRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        let (full_card_number, card_generation) = card_number(reader, true)?;
        Ok(Self {
            full_card_number,
            card_generation: card_generation.unwrap_or_default(),
            consent: reader.u8()? != 0,
        })
    }
}

impl Fixed for VuItsConsentRecord {
    const SIZE: usize = 20;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuBorderCrossingRecord {
    #[serde(flatten)]
    pub cards: SlotPair,
    pub country_left: u8,
    pub country_entered: u8,
    pub gnss_place_auth_record: GnssPlaceAuthRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for VuBorderCrossingRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            cards: reader.decode()?,
            country_left: reader.u8()?,
            country_entered: reader.u8()?,
            gnss_place_auth_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for VuBorderCrossingRecord {
    const SIZE: usize = 55;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VuLoadUnloadRecord {
    pub time_stamp: DateTime<Utc>,
    pub operation_type: u8,
    #[serde(flatten)]
    pub cards: SlotPair,
    pub gnss_place_auth_record: GnssPlaceAuthRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for VuLoadUnloadRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            operation_type: reader.u8()?,
            cards: reader.decode()?,
            gnss_place_auth_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for VuLoadUnloadRecord {
    const SIZE: usize = 58;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_slots_status() {
        let status = CardSlotsStatus::decode(&mut Reader::new(&[0x31])).unwrap();
        assert_eq!(status.driver, 1);
        assert_eq!(status.co_driver, 3);
    }

    #[test]
    fn test_control_activity_generation_byte() {
        let mut raw = vec![0x02, 0x65, 0xE1, 0x1A, 0x80];
        raw.extend_from_slice(&[0x00; 18]);
        raw.push(0x02);
        raw.extend_from_slice(&[0x65, 0xE1, 0x1A, 0x80, 0x65, 0xE1, 0x1A, 0x80]);
        assert_eq!(raw.len(), VuControlActivityRecord::SECOND_GEN_SIZE);

        let record = VuControlActivityRecord::decode_versioned(&mut Reader::new(&raw), true).unwrap();
        assert_eq!(record.control_type, 2);
        assert_eq!(record.control_card_number, None);
        assert_eq!(record.card_generation, Some(2));
    }

    #[test]
    fn test_detailed_speed_block() {
        let mut raw = vec![0x65, 0xE1, 0x1A, 0x80];
        raw.extend((0..60).map(|i| i as u8));
        let block = VuDetailedSpeedBlock::decode(&mut Reader::new(&raw)).unwrap();
        assert_eq!(block.speeds_per_second.len(), 60);
        assert_eq!(block.speeds_per_second[59], 59);
    }
}

//! Card record layouts

use crate::primitives::common::{
    ExtendedSerialNumber, FullCardNumber, GnssPlaceAuthRecord, GnssPlaceRecord, HolderName,
    VehicleRegistration,
};
use crate::primitives::text::{code_page_string, ia5_string};
use crate::primitives::time::{datef, time_real};
use crate::primitives::{bcd, records_with, Decode, Fixed, Reader};
use crate::types::{DecoderError, HexBytes, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedderIcAssemblerId {
    pub country_code: String,
    pub module_embedder: u16,
    pub manufacturer_information: u8,
}

/// EF ICC: card serial number and personalisation data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIccIdentification {
    pub clock_stop: u8,
    pub card_extended_serial_number: ExtendedSerialNumber,
    pub card_approval_number: String,
    pub card_personaliser_id: u8,
    pub embedder_ic_assembler_id: EmbedderIcAssemblerId,
    pub ic_identifier: HexBytes,
}

impl Decode for CardIccIdentification {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            clock_stop: reader.u8()?,
            card_extended_serial_number: reader.decode()?,
            card_approval_number: ia5_string(reader, 8)?,
            card_personaliser_id: reader.u8()?,
            embedder_ic_assembler_id: EmbedderIcAssemblerId {
                country_code: ia5_string(reader, 2)?,
                module_embedder: reader.u16()?,
                manufacturer_information: reader.u8()?,
            },
            ic_identifier: HexBytes::from(reader.bytes(2)?),
        })
    }
}

/// EF IC: chip serial number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardChipIdentification {
    pub ic_serial_number: HexBytes,
    pub ic_manufacturing_references: HexBytes,
}

impl Decode for CardChipIdentification {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            ic_serial_number: HexBytes::from(reader.bytes(4)?),
            ic_manufacturing_references: HexBytes::from(reader.bytes(4)?),
        })
    }
}

/// Record counts shared by driver and workshop cards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityCapacities {
    pub card_structure_version: u16,
    pub no_of_events_per_type: u8,
    pub no_of_faults_per_type: u8,
    pub activity_structure_length: u16,
    pub no_of_card_vehicle_records: u16,
    pub no_of_card_place_records: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_calibration_records: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_gnss_ad_records: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_specific_condition_records: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_of_card_vehicle_unit_records: Option<u16>,
}

/// EF Application_Identification, shaped by the card type byte
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "card_type", rename_all = "snake_case")]
pub enum ApplicationIdentification {
    Driver(ActivityCapacities),
    Workshop(ActivityCapacities),
    Control {
        card_structure_version: u16,
        no_of_control_activity_records: u16,
    },
    Company {
        card_structure_version: u16,
        no_of_company_activity_records: u16,
    },
}

pub const CARD_TYPE_DRIVER: u8 = 1;
pub const CARD_TYPE_WORKSHOP: u8 = 2;
pub const CARD_TYPE_CONTROL: u8 = 3;
pub const CARD_TYPE_COMPANY: u8 = 4;

impl ApplicationIdentification {
    pub fn decode(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        let card_type = reader.u8()?;
        let expected = match (card_type, second_gen) {
            (CARD_TYPE_DRIVER, false) => 9,
            (CARD_TYPE_DRIVER, true) => 16,
            (CARD_TYPE_WORKSHOP, false) => 10,
            (CARD_TYPE_WORKSHOP, true) => 17,
            (CARD_TYPE_CONTROL, _) | (CARD_TYPE_COMPANY, _) => 4,
            _ => {
                return Err(DecoderError::Malformed(format!(
                    "unknown card type {}",
                    card_type
                )))
            }
        };
        if reader.remaining() != expected {
            return Err(DecoderError::Malformed(format!(
                "application identification for card type {} has {} byte(s), expected {}",
                card_type,
                reader.remaining() + 1,
                expected + 1
            )));
        }

        let card_structure_version = reader.u16()?;
        match card_type {
            CARD_TYPE_CONTROL => Ok(ApplicationIdentification::Control {
                card_structure_version,
                no_of_control_activity_records: reader.u16()?,
            }),
            CARD_TYPE_COMPANY => Ok(ApplicationIdentification::Company {
                card_structure_version,
                no_of_company_activity_records: reader.u16()?,
            }),
            _ => {
                let workshop = card_type == CARD_TYPE_WORKSHOP;
                let capacities = ActivityCapacities {
                    card_structure_version,
                    no_of_events_per_type: reader.u8()?,
                    no_of_faults_per_type: reader.u8()?,
                    activity_structure_length: reader.u16()?,
                    no_of_card_vehicle_records: reader.u16()?,
                    no_of_card_place_records: if second_gen {
                        reader.u16()?
                    } else {
                        u16::from(reader.u8()?)
                    },
                    no_of_calibration_records: if workshop { Some(reader.u8()?) } else { None },
                    no_of_gnss_ad_records: optional_u16(reader, second_gen)?,
                    no_of_specific_condition_records: optional_u16(reader, second_gen)?,
                    no_of_card_vehicle_unit_records: optional_u16(reader, second_gen)?,
                };
                Ok(if workshop {
                    ApplicationIdentification::Workshop(capacities)
                } else {
                    ApplicationIdentification::Driver(capacities)
                })
            }
        }
    }
}

fn optional_u16(reader: &mut Reader<'_>, present: bool) -> Result<Option<u16>> {
    if present {
        reader.u16().map(Some)
    } else {
        Ok(None)
    }
}

/// EF Application_Identification_V2 (Gen2v2 only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationIdentificationV2 {
    pub no_of_border_crossing_records: u16,
    pub no_of_load_unload_records: u16,
    pub no_of_load_type_entry_records: u16,
    pub vu_configuration_length_range: u16,
}

impl Decode for ApplicationIdentificationV2 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            no_of_border_crossing_records: reader.u16()?,
            no_of_load_unload_records: reader.u16()?,
            no_of_load_type_entry_records: reader.u16()?,
            vu_configuration_length_range: reader.u16()?,
        })
    }
}

/// Issuing data common to every card type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardIdentification {
    pub card_issuing_member_state: u8,
    pub card_number: String,
    pub card_issuing_authority_name: String,
    pub card_issue_date: DateTime<Utc>,
    pub card_validity_begin: DateTime<Utc>,
    pub card_expiry_date: DateTime<Utc>,
}

impl Decode for CardIdentification {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            card_issuing_member_state: reader.u8()?,
            card_number: ia5_string(reader, 16)?,
            card_issuing_authority_name: code_page_string(reader, 36)?,
            card_issue_date: time_real(reader)?,
            card_validity_begin: time_real(reader)?,
            card_expiry_date: time_real(reader)?,
        })
    }
}

impl Fixed for CardIdentification {
    const SIZE: usize = 65;
}

/// Card holder block of EF Identification, by card type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "holder_type", rename_all = "snake_case")]
pub enum HolderIdentification {
    Driver {
        card_holder_name: HolderName,
        card_holder_birth_date: Option<NaiveDate>,
        card_holder_preferred_language: String,
    },
    Workshop {
        workshop_name: String,
        workshop_address: String,
        card_holder_name: HolderName,
        card_holder_preferred_language: String,
    },
    Control {
        control_body_name: String,
        control_body_address: String,
        card_holder_name: HolderName,
        card_holder_preferred_language: String,
    },
    Company {
        company_name: String,
        company_address: String,
        card_holder_preferred_language: String,
    },
}

/// EF Identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub card_identification: CardIdentification,
    pub holder: HolderIdentification,
}

impl Identification {
    pub const DRIVER_SIZE: usize = 143;
    /// Workshop and control cards share this width
    pub const WORKSHOP_SIZE: usize = 211;
    pub const COMPANY_SIZE: usize = 139;

    /// Decode with the card type from application identification, if known.
    /// Without it a 211 byte holder block reads as workshop data.
    pub fn decode_for(reader: &mut Reader<'_>, card_type: Option<u8>) -> Result<Self> {
        let total = reader.remaining();
        let card_identification = reader.decode()?;
        let holder = match total {
            Self::DRIVER_SIZE => HolderIdentification::Driver {
                card_holder_name: reader.decode()?,
                card_holder_birth_date: datef(reader)?,
                card_holder_preferred_language: ia5_string(reader, 2)?,
            },
            Self::WORKSHOP_SIZE if card_type == Some(CARD_TYPE_CONTROL) => {
                HolderIdentification::Control {
                    control_body_name: code_page_string(reader, 36)?,
                    control_body_address: code_page_string(reader, 36)?,
                    card_holder_name: reader.decode()?,
                    card_holder_preferred_language: ia5_string(reader, 2)?,
                }
            }
            Self::WORKSHOP_SIZE => HolderIdentification::Workshop {
                workshop_name: code_page_string(reader, 36)?,
                workshop_address: code_page_string(reader, 36)?,
                card_holder_name: reader.decode()?,
                card_holder_preferred_language: ia5_string(reader, 2)?,
            },
            Self::COMPANY_SIZE => HolderIdentification::Company {
                company_name: code_page_string(reader, 36)?,
                company_address: code_page_string(reader, 36)?,
                card_holder_preferred_language: ia5_string(reader, 2)?,
            },
            other => {
                return Err(DecoderError::Malformed(format!(
                    "identification of {} byte(s) matches no card type",
                    other
                )))
            }
        };
        Ok(Self {
            card_identification,
            holder,
        })
    }
}

impl ApplicationIdentification {
    pub fn card_type(&self) -> u8 {
        match self {
            ApplicationIdentification::Driver(_) => CARD_TYPE_DRIVER,
            ApplicationIdentification::Workshop(_) => CARD_TYPE_WORKSHOP,
            ApplicationIdentification::Control { .. } => CARD_TYPE_CONTROL,
            ApplicationIdentification::Company { .. } => CARD_TYPE_COMPANY,
        }
    }
}

/// EF Card_Download: last card download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDownload {
    pub last_card_download: DateTime<Utc>,
}

impl Decode for CardDownload {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            last_card_download: time_real(reader)?,
        })
    }
}

/// EF Driving_Licence_Info
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrivingLicenceInfo {
    pub driving_licence_issuing_authority: String,
    pub driving_licence_issuing_nation: u8,
    pub driving_licence_number: String,
}

impl Decode for DrivingLicenceInfo {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            driving_licence_issuing_authority: code_page_string(reader, 36)?,
            driving_licence_issuing_nation: reader.u8()?,
            driving_licence_number: ia5_string(reader, 16)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEventRecord {
    pub event_type: u8,
    pub event_begin_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    pub event_vehicle_registration: VehicleRegistration,
}

impl Decode for CardEventRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            event_type: reader.u8()?,
            event_begin_time: time_real(reader)?,
            event_end_time: time_real(reader)?,
            event_vehicle_registration: reader.decode()?,
        })
    }
}

impl Fixed for CardEventRecord {
    const SIZE: usize = 24;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFaultRecord {
    pub fault_type: u8,
    pub fault_begin_time: DateTime<Utc>,
    pub fault_end_time: DateTime<Utc>,
    pub fault_vehicle_registration: VehicleRegistration,
}

impl Decode for CardFaultRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            fault_type: reader.u8()?,
            fault_begin_time: time_real(reader)?,
            fault_end_time: time_real(reader)?,
            fault_vehicle_registration: reader.decode()?,
        })
    }
}

impl Fixed for CardFaultRecord {
    const SIZE: usize = 24;
}

/// A newest-record pointer followed by the record slots it indexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CyclicRecords<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newest_record_pointer: Option<u16>,
    pub records: Vec<T>,
}

impl<T> CyclicRecords<T> {
    /// Decode `pointer_size` bytes of pointer (0, 1 or 2) and then records of
    /// `record_size` bytes filling the rest of `data`
    pub fn decode_with(
        data: &[u8],
        pointer_size: usize,
        record_size: usize,
        skip_unused: bool,
        decode: impl Fn(&mut Reader<'_>) -> Result<T>,
    ) -> Result<Self> {
        let mut reader = Reader::new(data);
        let newest_record_pointer = match pointer_size {
            0 => None,
            1 => Some(u16::from(reader.u8()?)),
            _ => Some(reader.u16()?),
        };
        let records = records_with(reader.rest(), record_size, skip_unused, decode)?;
        Ok(Self {
            newest_record_pointer,
            records,
        })
    }
}

/// A vehicle the card was used in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardVehicleRecord {
    pub vehicle_odometer_begin: u32,
    pub vehicle_odometer_end: u32,
    pub vehicle_first_use: DateTime<Utc>,
    pub vehicle_last_use: DateTime<Utc>,
    pub vehicle_registration: VehicleRegistration,
    pub vu_data_block_counter: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_identification_number: Option<String>,
}

impl CardVehicleRecord {
    pub const FIRST_GEN_SIZE: usize = 31;
    pub const SECOND_GEN_SIZE: usize = 48;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        Ok(Self {
            vehicle_odometer_begin: reader.u24()?,
            vehicle_odometer_end: reader.u24()?,
            vehicle_first_use: time_real(reader)?,
            vehicle_last_use: time_real(reader)?,
            vehicle_registration: reader.decode()?,
            vu_data_block_counter: bcd(reader.bytes(2)?)?,
            vehicle_identification_number: if second_gen {
                Some(ia5_string(reader, 17)?)
            } else {
                None
            },
        })
    }
}

/// EF Current_Usage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCurrentUse {
    pub session_open_time: DateTime<Utc>,
    pub session_open_vehicle: VehicleRegistration,
}

impl Decode for CardCurrentUse {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            session_open_time: time_real(reader)?,
            session_open_vehicle: reader.decode()?,
        })
    }
}

/// EF Control_Activity_Data: the last control of this card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardControlActivityDataRecord {
    pub control_type: u8,
    pub control_time: DateTime<Utc>,
    pub control_card_number: Option<FullCardNumber>,
    pub control_vehicle_registration: VehicleRegistration,
    pub control_download_period_begin: DateTime<Utc>,
    pub control_download_period_end: DateTime<Utc>,
}

impl Decode for CardControlActivityDataRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            control_type: reader.u8()?,
            control_time: time_real(reader)?,
            control_card_number: FullCardNumber::decode_optional(reader)?,
            control_vehicle_registration: reader.decode()?,
            control_download_period_begin: time_real(reader)?,
            control_download_period_end: time_real(reader)?,
        })
    }
}

/// A vehicle unit the card was inserted in (Gen2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardVehicleUnitRecord {
    pub time_stamp: DateTime<Utc>,
    pub manufacturer_code: u8,
    pub device_id: u8,
    pub vu_software_version: String,
}

impl Decode for CardVehicleUnitRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            manufacturer_code: reader.u8()?,
            device_id: reader.u8()?,
            vu_software_version: ia5_string(reader, 4)?,
        })
    }
}

impl Fixed for CardVehicleUnitRecord {
    const SIZE: usize = 10;
}

/// Position recorded after three hours of accumulated driving (Gen2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnssAccumulatedDrivingRecord {
    pub time_stamp: DateTime<Utc>,
    pub gnss_place_record: GnssPlaceRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for GnssAccumulatedDrivingRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            gnss_place_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for GnssAccumulatedDrivingRecord {
    const SIZE: usize = 18;
}

/// Authentication status attached to a place or GNSS record (Gen2v2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationRecord {
    pub time_stamp: DateTime<Utc>,
    pub authentication_status: u8,
}

impl Decode for AuthenticationRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            authentication_status: reader.u8()?,
        })
    }
}

impl Fixed for AuthenticationRecord {
    const SIZE: usize = 5;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardBorderCrossingRecord {
    pub country_left: u8,
    pub country_entered: u8,
    pub gnss_place_auth_record: GnssPlaceAuthRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for CardBorderCrossingRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            country_left: reader.u8()?,
            country_entered: reader.u8()?,
            gnss_place_auth_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for CardBorderCrossingRecord {
    const SIZE: usize = 17;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLoadUnloadRecord {
    pub time_stamp: DateTime<Utc>,
    pub operation_type: u8,
    pub gnss_place_auth_record: GnssPlaceAuthRecord,
    pub vehicle_odometer_value: u32,
}

impl Decode for CardLoadUnloadRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            operation_type: reader.u8()?,
            gnss_place_auth_record: reader.decode()?,
            vehicle_odometer_value: reader.u24()?,
        })
    }
}

impl Fixed for CardLoadUnloadRecord {
    const SIZE: usize = 20;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardLoadTypeEntryRecord {
    pub time_stamp: DateTime<Utc>,
    pub load_type_entered: u8,
}

impl Decode for CardLoadTypeEntryRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            load_type_entered: reader.u8()?,
        })
    }
}

impl Fixed for CardLoadTypeEntryRecord {
    const SIZE: usize = 5;
}

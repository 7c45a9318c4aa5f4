//! Composite data types shared by card and VU records

use super::text::{code_page_string, ia5_string};
use super::time::{time_real, MonthYear};
use super::{is_unused, Decode, Fixed, Reader};
use crate::types::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Equipment serial number with manufacturing month, type and manufacturer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedSerialNumber {
    pub serial_number: u32,
    pub month_year: MonthYear,
    pub equipment_type: u8,
    pub manufacturer_code: u8,
}

impl Decode for ExtendedSerialNumber {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            serial_number: reader.u32()?,
            month_year: MonthYear::decode(reader)?,
            equipment_type: reader.u8()?,
            manufacturer_code: reader.u8()?,
        })
    }
}

impl Fixed for ExtendedSerialNumber {
    const SIZE: usize = 8;
}

/// Card type, issuing member state and card number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullCardNumber {
    pub card_type: u8,
    pub issuing_member_state: u8,
    pub card_number: String,
}

impl FullCardNumber {
    /// Decode a card number slot that may never have been written
    pub fn decode_optional(reader: &mut Reader<'_>) -> Result<Option<Self>> {
        let raw = reader.bytes(Self::SIZE)?;
        if is_unused(raw) {
            return Ok(None);
        }
        Self::decode(&mut Reader::new(raw)).map(Some)
    }
}

impl Decode for FullCardNumber {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            card_type: reader.u8()?,
            issuing_member_state: reader.u8()?,
            card_number: ia5_string(reader, 16)?,
        })
    }
}

impl Fixed for FullCardNumber {
    const SIZE: usize = 18;
}

/// Registering nation and registration plate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRegistration {
    pub nation: u8,
    pub number: String,
}

impl Decode for VehicleRegistration {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            nation: reader.u8()?,
            number: code_page_string(reader, 14)?,
        })
    }
}

impl Fixed for VehicleRegistration {
    const SIZE: usize = 15;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderName {
    pub surname: String,
    pub first_names: String,
}

impl Decode for HolderName {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            surname: code_page_string(reader, 36)?,
            first_names: code_page_string(reader, 36)?,
        })
    }
}

impl Fixed for HolderName {
    const SIZE: usize = 72;
}

/// Position as signed `±DDMMm` values (degrees, minutes, tenths of a minute)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoCoordinates {
    pub latitude: i32,
    pub longitude: i32,
}

impl Decode for GeoCoordinates {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            latitude: reader.i24()?,
            longitude: reader.i24()?,
        })
    }
}

impl Fixed for GeoCoordinates {
    const SIZE: usize = 6;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnssPlaceRecord {
    pub time_stamp: DateTime<Utc>,
    pub gnss_accuracy: u8,
    pub geo_coordinates: GeoCoordinates,
}

impl Decode for GnssPlaceRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            gnss_accuracy: reader.u8()?,
            geo_coordinates: reader.decode()?,
        })
    }
}

impl Fixed for GnssPlaceRecord {
    const SIZE: usize = 11;
}

/// GNSS place with the authentication status of the position (Gen2v2)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GnssPlaceAuthRecord {
    pub time_stamp: DateTime<Utc>,
    pub gnss_accuracy: u8,
    pub geo_coordinates: GeoCoordinates,
    pub authentication_status: u8,
}

impl Decode for GnssPlaceAuthRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            time_stamp: time_real(reader)?,
            gnss_accuracy: reader.u8()?,
            geo_coordinates: reader.decode()?,
            authentication_status: reader.u8()?,
        })
    }
}

impl Fixed for GnssPlaceAuthRecord {
    const SIZE: usize = 12;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Driver,
    CoDriver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Break,
    Availability,
    Work,
    Driving,
}

/// One activity change, packed as `scpaattttttttttt`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityChangeInfo {
    pub slot: Slot,
    /// Crew driving (card inserted) or activity known (card withdrawn)
    pub crew: bool,
    pub card_inserted: bool,
    pub activity: Activity,
    /// Minutes since 00:00 UTC
    pub minutes: u16,
}

impl ActivityChangeInfo {
    pub fn from_raw(raw: u16) -> Self {
        let activity = match (raw >> 11) & 0x03 {
            0 => Activity::Break,
            1 => Activity::Availability,
            2 => Activity::Work,
            _ => Activity::Driving,
        };
        Self {
            slot: if raw & 0x8000 == 0 {
                Slot::Driver
            } else {
                Slot::CoDriver
            },
            crew: raw & 0x4000 != 0,
            card_inserted: raw & 0x2000 == 0,
            activity,
            minutes: raw & 0x07FF,
        }
    }
}

impl Decode for ActivityChangeInfo {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self::from_raw(reader.u16()?))
    }
}

impl Fixed for ActivityChangeInfo {
    const SIZE: usize = 2;
}

/// Start or end of a daily work period
///
/// The second generation layout appends the GNSS position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub entry_time: DateTime<Utc>,
    pub entry_type_daily_work_period: u8,
    pub daily_work_period_country: u8,
    pub daily_work_period_region: u8,
    pub vehicle_odometer_value: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_gnss_place_record: Option<GnssPlaceRecord>,
}

impl PlaceRecord {
    pub const FIRST_GEN_SIZE: usize = 10;
    pub const SECOND_GEN_SIZE: usize = 21;

    pub fn decode_versioned(reader: &mut Reader<'_>, second_gen: bool) -> Result<Self> {
        Ok(Self {
            entry_time: time_real(reader)?,
            entry_type_daily_work_period: reader.u8()?,
            daily_work_period_country: reader.u8()?,
            daily_work_period_region: reader.u8()?,
            vehicle_odometer_value: reader.u24()?,
            entry_gnss_place_record: if second_gen {
                Some(reader.decode()?)
            } else {
                None
            },
        })
    }
}

/// Out of scope / ferry-train condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecificConditionRecord {
    pub entry_time: DateTime<Utc>,
    pub specific_condition_type: u8,
}

impl Decode for SpecificConditionRecord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self> {
        Ok(Self {
            entry_time: time_real(reader)?,
            specific_condition_type: reader.u8()?,
        })
    }
}

impl Fixed for SpecificConditionRecord {
    const SIZE: usize = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_change_driver_driving() {
        // s=0 c=0 p=0 aa=11 t=0x1E0 (08:00)
        let change = ActivityChangeInfo::from_raw(0b0001_1001_1110_0000);
        assert_eq!(change.slot, Slot::Driver);
        assert!(!change.crew);
        assert!(change.card_inserted);
        assert_eq!(change.activity, Activity::Driving);
        assert_eq!(change.minutes, 480);
    }

    #[test]
    fn test_activity_change_codriver_withdrawn() {
        // s=1 c=1 p=1 aa=01 t=0
        let change = ActivityChangeInfo::from_raw(0b1110_1000_0000_0000);
        assert_eq!(change.slot, Slot::CoDriver);
        assert!(change.crew);
        assert!(!change.card_inserted);
        assert_eq!(change.activity, Activity::Availability);
        assert_eq!(change.minutes, 0);
    }

    #[test]
    fn test_full_card_number_unused_slot() {
        let raw = [0xFFu8; 18];
        assert_eq!(FullCardNumber::decode_optional(&mut Reader::new(&raw)).unwrap(), None);

        let mut raw = vec![0x01, 0x0D];
        raw.extend_from_slice(b"DC00000987654300");
        let number = FullCardNumber::decode_optional(&mut Reader::new(&raw))
            .unwrap()
            .unwrap();
        assert_eq!(number.card_type, 1);
        assert_eq!(number.card_number, "DC00000987654300");
    }

    #[test]
    fn test_place_record_widths() {
        let mut raw = vec![0x65, 0xE1, 0x1A, 0x80, 0x01, 0x0D, 0x00, 0x01, 0x86, 0xA0];
        let place = PlaceRecord::decode_versioned(&mut Reader::new(&raw), false).unwrap();
        assert_eq!(place.vehicle_odometer_value, 100_000);
        assert_eq!(place.entry_gnss_place_record, None);

        raw.extend_from_slice(&[0x65, 0xE1, 0x1A, 0x80, 0x05, 0x00, 0xC3, 0x50, 0xFF, 0xFF, 0x9C]);
        assert_eq!(raw.len(), PlaceRecord::SECOND_GEN_SIZE);
        let place = PlaceRecord::decode_versioned(&mut Reader::new(&raw), true).unwrap();
        let gnss = place.entry_gnss_place_record.unwrap();
        assert_eq!(gnss.gnss_accuracy, 5);
        assert_eq!(gnss.geo_coordinates.latitude, 50_000);
        assert_eq!(gnss.geo_coordinates.longitude, -100);
    }
}

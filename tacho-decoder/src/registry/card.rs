//! Card elementary files

use super::{PayloadShape, RecordDescriptor, RecordKind};
use crate::types::{FileKind, Generation};

pub const EF_ICC: u16 = 0x0002;
pub const EF_IC: u16 = 0x0005;
pub const EF_APPLICATION_IDENTIFICATION: u16 = 0x0501;
pub const EF_EVENTS_DATA: u16 = 0x0502;
pub const EF_FAULTS_DATA: u16 = 0x0503;
pub const EF_DRIVER_ACTIVITY_DATA: u16 = 0x0504;
pub const EF_VEHICLES_USED: u16 = 0x0505;
pub const EF_PLACES: u16 = 0x0506;
pub const EF_CURRENT_USAGE: u16 = 0x0507;
pub const EF_CONTROL_ACTIVITY_DATA: u16 = 0x0508;
pub const EF_CARD_DOWNLOAD: u16 = 0x050E;
pub const EF_IDENTIFICATION: u16 = 0x0520;
pub const EF_DRIVING_LICENCE_INFO: u16 = 0x0521;
pub const EF_SPECIFIC_CONDITIONS: u16 = 0x0522;
pub const EF_VEHICLE_UNITS_USED: u16 = 0x0523;
pub const EF_GNSS_PLACES: u16 = 0x0524;
pub const EF_APPLICATION_IDENTIFICATION_V2: u16 = 0x0525;
pub const EF_PLACES_AUTHENTICATION: u16 = 0x0526;
pub const EF_GNSS_PLACES_AUTHENTICATION: u16 = 0x0527;
pub const EF_BORDER_CROSSINGS: u16 = 0x0528;
pub const EF_LOAD_UNLOAD_OPERATIONS: u16 = 0x0529;
pub const EF_LOAD_TYPE_ENTRIES: u16 = 0x0530;
pub const EF_CARD_CERTIFICATE: u16 = 0xC100;
pub const EF_CARD_SIGN_CERTIFICATE: u16 = 0xC101;
pub const EF_CA_CERTIFICATE: u16 = 0xC108;
pub const EF_LINK_CERTIFICATE: u16 = 0xC109;

/// Size of a first generation RSA certificate
pub const FIRST_GEN_CERTIFICATE_SIZE: usize = 194;

/// The record a card element decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardRecord {
    IccIdentification,
    ChipIdentification,
    ApplicationIdentification,
    CardCertificate,
    CardSignCertificate,
    CaCertificate,
    LinkCertificate,
    Identification,
    CardDownload,
    DrivingLicenceInfo,
    EventsData,
    FaultsData,
    DriverActivityData,
    VehiclesUsed,
    Places,
    CurrentUsage,
    ControlActivityData,
    SpecificConditions,
    VehicleUnitsUsed,
    GnssPlaces,
    ApplicationIdentificationV2,
    PlacesAuthentication,
    GnssPlacesAuthentication,
    BorderCrossings,
    LoadUnloadOperations,
    LoadTypeEntries,
}

const ALL: &[Generation] = &[Generation::Gen1, Generation::Gen2V1, Generation::Gen2V2];
const FIRST: &[Generation] = &[Generation::Gen1];
const SECOND: &[Generation] = &[Generation::Gen2V1, Generation::Gen2V2];
const SECOND_V2: &[Generation] = &[Generation::Gen2V2];

const fn ef(
    tag: u16,
    name: &'static str,
    generations: &'static [Generation],
    shape: PayloadShape,
    record: CardRecord,
    signed: bool,
) -> RecordDescriptor {
    RecordDescriptor {
        file: FileKind::Card,
        tag,
        name,
        generations,
        shape,
        record: RecordKind::Card(record),
        signed,
    }
}

use self::CardRecord as R;
use super::PayloadShape::{Computed, Fixed, LengthPrefixed, Repeated};

pub static DESCRIPTORS: &[RecordDescriptor] = &[
    ef(EF_ICC, "card_icc_identification", ALL, Fixed(25), R::IccIdentification, false),
    ef(EF_IC, "card_chip_identification", ALL, Fixed(8), R::ChipIdentification, false),
    ef(EF_APPLICATION_IDENTIFICATION, "application_identification", ALL, Computed, R::ApplicationIdentification, true),
    ef(EF_CARD_CERTIFICATE, "card_certificate", FIRST, Fixed(FIRST_GEN_CERTIFICATE_SIZE), R::CardCertificate, false),
    ef(EF_CARD_CERTIFICATE, "card_certificate", SECOND, LengthPrefixed, R::CardCertificate, false),
    ef(EF_CARD_SIGN_CERTIFICATE, "card_sign_certificate", SECOND, LengthPrefixed, R::CardSignCertificate, false),
    ef(EF_CA_CERTIFICATE, "ca_certificate", FIRST, Fixed(FIRST_GEN_CERTIFICATE_SIZE), R::CaCertificate, false),
    ef(EF_CA_CERTIFICATE, "ca_certificate", SECOND, LengthPrefixed, R::CaCertificate, false),
    ef(EF_LINK_CERTIFICATE, "link_certificate", SECOND, LengthPrefixed, R::LinkCertificate, false),
    ef(EF_IDENTIFICATION, "identification", ALL, Computed, R::Identification, true),
    ef(EF_CARD_DOWNLOAD, "card_download", ALL, Fixed(4), R::CardDownload, true),
    ef(EF_DRIVING_LICENCE_INFO, "driving_licence_info", ALL, Fixed(53), R::DrivingLicenceInfo, true),
    ef(EF_EVENTS_DATA, "events_data", ALL, Repeated { header: 0, record: 24 }, R::EventsData, true),
    ef(EF_FAULTS_DATA, "faults_data", ALL, Repeated { header: 0, record: 24 }, R::FaultsData, true),
    ef(EF_DRIVER_ACTIVITY_DATA, "driver_activity_data", ALL, Computed, R::DriverActivityData, true),
    ef(EF_VEHICLES_USED, "vehicles_used", FIRST, Repeated { header: 2, record: 31 }, R::VehiclesUsed, true),
    ef(EF_VEHICLES_USED, "vehicles_used", SECOND, Repeated { header: 2, record: 48 }, R::VehiclesUsed, true),
    ef(EF_PLACES, "places", FIRST, Repeated { header: 1, record: 10 }, R::Places, true),
    ef(EF_PLACES, "places", SECOND, Repeated { header: 2, record: 21 }, R::Places, true),
    ef(EF_CURRENT_USAGE, "current_usage", ALL, Fixed(19), R::CurrentUsage, true),
    ef(EF_CONTROL_ACTIVITY_DATA, "control_activity_data", ALL, Fixed(46), R::ControlActivityData, true),
    ef(EF_SPECIFIC_CONDITIONS, "specific_conditions", FIRST, Repeated { header: 0, record: 5 }, R::SpecificConditions, true),
    ef(EF_SPECIFIC_CONDITIONS, "specific_conditions", SECOND, Repeated { header: 2, record: 5 }, R::SpecificConditions, true),
    ef(EF_VEHICLE_UNITS_USED, "vehicle_units_used", SECOND, Repeated { header: 2, record: 10 }, R::VehicleUnitsUsed, true),
    ef(EF_GNSS_PLACES, "gnss_places", SECOND, Repeated { header: 2, record: 18 }, R::GnssPlaces, true),
    ef(EF_APPLICATION_IDENTIFICATION_V2, "application_identification_v2", SECOND_V2, Fixed(8), R::ApplicationIdentificationV2, true),
    ef(EF_PLACES_AUTHENTICATION, "places_authentication", SECOND_V2, Repeated { header: 2, record: 5 }, R::PlacesAuthentication, true),
    ef(EF_GNSS_PLACES_AUTHENTICATION, "gnss_places_authentication", SECOND_V2, Repeated { header: 2, record: 5 }, R::GnssPlacesAuthentication, true),
    ef(EF_BORDER_CROSSINGS, "border_crossings", SECOND_V2, Repeated { header: 2, record: 17 }, R::BorderCrossings, true),
    ef(EF_LOAD_UNLOAD_OPERATIONS, "load_unload_operations", SECOND_V2, Repeated { header: 2, record: 20 }, R::LoadUnloadOperations, true),
    ef(EF_LOAD_TYPE_ENTRIES, "load_type_entries", SECOND_V2, Repeated { header: 2, record: 5 }, R::LoadTypeEntries, true),
];

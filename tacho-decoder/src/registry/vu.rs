//! Vehicle unit transfer types
//!
//! Every VU transfer starts with the two-byte tag `0x76` followed by the
//! transfer response parameter (TREP). First generation TREPs are 01..05,
//! second generation version 1 21..25 and version 2 31..35.

use super::{PayloadShape, RecordDescriptor, RecordKind};
use crate::types::{FileKind, Generation};

/// Service identifier prefix of every VU tag
pub const VU_SID: u8 = 0x76;

/// The data transfer a VU tag introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VuTransfer {
    Overview,
    Activities,
    EventsAndFaults,
    DetailedSpeed,
    TechnicalData,
}

impl VuTransfer {
    /// Transfer for the low nibble of a TREP
    pub fn from_trep(trep: u8) -> Option<Self> {
        match trep & 0x0F {
            1 => Some(VuTransfer::Overview),
            2 => Some(VuTransfer::Activities),
            3 => Some(VuTransfer::EventsAndFaults),
            4 => Some(VuTransfer::DetailedSpeed),
            5 => Some(VuTransfer::TechnicalData),
            _ => None,
        }
    }
}

/// Generation a VU tag belongs to, if it is a transfer tag at all
pub fn generation_of(tag: u16) -> Option<Generation> {
    let [sid, trep] = tag.to_be_bytes();
    if sid != VU_SID || VuTransfer::from_trep(trep).is_none() {
        return None;
    }
    match trep & 0xF0 {
        0x00 => Some(Generation::Gen1),
        0x20 => Some(Generation::Gen2V1),
        0x30 => Some(Generation::Gen2V2),
        _ => None,
    }
}

const FIRST: &[Generation] = &[Generation::Gen1];
const SECOND_V1: &[Generation] = &[Generation::Gen2V1];
const SECOND_V2: &[Generation] = &[Generation::Gen2V2];

const fn transfer(
    tag: u16,
    name: &'static str,
    generations: &'static [Generation],
    record: VuTransfer,
) -> RecordDescriptor {
    RecordDescriptor {
        file: FileKind::Vu,
        tag,
        name,
        generations,
        shape: PayloadShape::Computed,
        record: RecordKind::Vu(record),
        signed: true,
    }
}

use self::VuTransfer as T;

pub static DESCRIPTORS: &[RecordDescriptor] = &[
    transfer(0x7601, "overview", FIRST, T::Overview),
    transfer(0x7602, "activities", FIRST, T::Activities),
    transfer(0x7603, "events_and_faults", FIRST, T::EventsAndFaults),
    transfer(0x7604, "detailed_speed", FIRST, T::DetailedSpeed),
    transfer(0x7605, "technical_data", FIRST, T::TechnicalData),
    transfer(0x7621, "overview", SECOND_V1, T::Overview),
    transfer(0x7622, "activities", SECOND_V1, T::Activities),
    transfer(0x7623, "events_and_faults", SECOND_V1, T::EventsAndFaults),
    transfer(0x7624, "detailed_speed", SECOND_V1, T::DetailedSpeed),
    transfer(0x7625, "technical_data", SECOND_V1, T::TechnicalData),
    transfer(0x7631, "overview", SECOND_V2, T::Overview),
    transfer(0x7632, "activities", SECOND_V2, T::Activities),
    transfer(0x7633, "events_and_faults", SECOND_V2, T::EventsAndFaults),
    transfer(0x7634, "detailed_speed", SECOND_V2, T::DetailedSpeed),
    transfer(0x7635, "technical_data", SECOND_V2, T::TechnicalData),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_of() {
        assert_eq!(generation_of(0x7601), Some(Generation::Gen1));
        assert_eq!(generation_of(0x7625), Some(Generation::Gen2V1));
        assert_eq!(generation_of(0x7632), Some(Generation::Gen2V2));
        assert_eq!(generation_of(0x7606), None);
        assert_eq!(generation_of(0x7701), None);
    }
}

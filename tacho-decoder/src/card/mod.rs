//! Card downloads (TLV)
//!
//! A card file is a flat sequence of elements:
//!
//! ```text
//! FID (2) | appendix (1) | length (2) | value (length)
//! ```
//!
//! The appendix says which generation family the element belongs to and
//! whether it carries data or the signature over the data element right
//! before it. Unknown elements are skipped by their declared length; only a
//! length running past the end of the input stops the scan.

pub mod activity;
pub mod records;

use crate::certificates::CertificateRecord;
use crate::config::DecoderConfig;
use crate::primitives::common::{PlaceRecord, SpecificConditionRecord};
use crate::primitives::{records as fixed_records, Decode, Reader};
use crate::registry::card::{
    EF_CARD_CERTIFICATE, EF_CARD_SIGN_CERTIFICATE, EF_CA_CERTIFICATE, EF_LINK_CERTIFICATE,
};
use crate::registry::{CardRecord, GenerationLatch, PayloadShape, RecordDescriptor, RecordKind, TagRegistry};
use crate::signature::KeyRing;
use crate::types::{
    Block, Decoded, DecoderError, Diagnostic, DiagnosticKind, FileKind, Generation, Result,
    SignatureBlock,
};
use activity::CardDriverActivity;
use records::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// FID, appendix and length
pub const ELEMENT_HEADER_SIZE: usize = 5;

/// A decoded card download
///
/// Every field is generation-qualified: `_1` holds the first generation
/// element, `_2` the second generation one. Dual-generation cards carry both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Highest generation seen in the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_icc_identification_1: Option<Block<CardIccIdentification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_icc_identification_2: Option<Block<CardIccIdentification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_chip_identification_1: Option<Block<CardChipIdentification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_chip_identification_2: Option<Block<CardChipIdentification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_identification_1: Option<Block<ApplicationIdentification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_identification_2: Option<Block<ApplicationIdentification>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_certificate_1: Option<Block<CertificateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_certificate_2: Option<Block<CertificateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_sign_certificate_2: Option<Block<CertificateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate_1: Option<Block<CertificateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_certificate_2: Option<Block<CertificateRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_certificate_2: Option<Block<CertificateRecord>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_1: Option<Block<Identification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identification_2: Option<Block<Identification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_download_1: Option<Block<CardDownload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_download_2: Option<Block<CardDownload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving_licence_info_1: Option<Block<DrivingLicenceInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driving_licence_info_2: Option<Block<DrivingLicenceInfo>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_data_1: Option<Block<Vec<CardEventRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_data_2: Option<Block<Vec<CardEventRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faults_data_1: Option<Block<Vec<CardFaultRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faults_data_2: Option<Block<Vec<CardFaultRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_activity_data_1: Option<Block<CardDriverActivity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_activity_data_2: Option<Block<CardDriverActivity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles_used_1: Option<Block<CyclicRecords<CardVehicleRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicles_used_2: Option<Block<CyclicRecords<CardVehicleRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_1: Option<Block<CyclicRecords<PlaceRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_2: Option<Block<CyclicRecords<PlaceRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage_1: Option<Block<CardCurrentUse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_usage_2: Option<Block<CardCurrentUse>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_activity_data_1: Option<Block<CardControlActivityDataRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_activity_data_2: Option<Block<CardControlActivityDataRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_conditions_1: Option<Block<CyclicRecords<SpecificConditionRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_conditions_2: Option<Block<CyclicRecords<SpecificConditionRecord>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_units_used_2: Option<Block<CyclicRecords<CardVehicleUnitRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnss_places_2: Option<Block<CyclicRecords<GnssAccumulatedDrivingRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_identification_v2_2: Option<Block<ApplicationIdentificationV2>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub places_authentication_2: Option<Block<CyclicRecords<AuthenticationRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gnss_places_authentication_2: Option<Block<CyclicRecords<AuthenticationRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_crossings_2: Option<Block<CyclicRecords<CardBorderCrossingRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_unload_operations_2: Option<Block<CyclicRecords<CardLoadUnloadRecord>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_type_entries_2: Option<Block<CyclicRecords<CardLoadTypeEntryRecord>>>,
}

impl Card {
    /// Serialize to JSON, indented when `pretty` is set
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Card type from the application identification of the given family
    fn card_type(&self, second: bool) -> Option<u8> {
        let block = if second {
            &self.application_identification_2
        } else {
            &self.application_identification_1
        };
        block
            .as_ref()
            .and_then(|b| b.data.as_ref())
            .map(ApplicationIdentification::card_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ElementHeader {
    fid: u16,
    appendix: u8,
    length: usize,
}

impl ElementHeader {
    /// Header at `offset`, if five bytes are available there
    fn read(bytes: &[u8], offset: usize) -> Option<Self> {
        let header = bytes.get(offset..offset.checked_add(ELEMENT_HEADER_SIZE)?)?;
        Some(Self {
            fid: u16::from_be_bytes([header[0], header[1]]),
            appendix: header[2],
            length: usize::from(u16::from_be_bytes([header[3], header[4]])),
        })
    }

    /// Generation family from the appendix byte, `None` if not a known appendix
    fn family(&self) -> Option<Generation> {
        match self.appendix {
            0x00 | 0x01 => Some(Generation::Gen1),
            0x02 | 0x03 => Some(Generation::Gen2V1),
            _ => None,
        }
    }

    fn is_signature(&self) -> bool {
        self.appendix & 0x01 == 0x01
    }

    /// True if `next` is the signature element over this data element
    fn signed_by(&self, next: &ElementHeader) -> bool {
        next.fid == self.fid && next.appendix == self.appendix | 0x01
    }
}

/// Build the key ring for one card file from the certificates it carries
///
/// Runs ahead of the main scan so that data blocks can be checked as they
/// are decoded, whatever order the certificates appear in.
pub(crate) fn key_ring<'s>(
    bytes: &[u8],
    store: &'s crate::certificates::CertificateStore,
) -> KeyRing<'s> {
    let mut found: HashMap<(u16, u8), &[u8]> = HashMap::new();
    let mut offset = 0;
    while let Some(header) = ElementHeader::read(bytes, offset) {
        let start = offset + ELEMENT_HEADER_SIZE;
        let end = start + header.length;
        if end > bytes.len() {
            break;
        }
        if matches!(
            header.fid,
            EF_CARD_CERTIFICATE | EF_CARD_SIGN_CERTIFICATE | EF_CA_CERTIFICATE | EF_LINK_CERTIFICATE
        ) && !header.is_signature()
        {
            found
                .entry((header.fid, header.appendix))
                .or_insert(&bytes[start..end]);
        }
        offset = end;
    }

    let mut ring = KeyRing::new(store);
    if let Some(ca) = found.get(&(EF_CA_CERTIFICATE, 0x00)) {
        ring.admit(Generation::Gen1, ca);
    }
    if let Some(card) = found.get(&(EF_CARD_CERTIFICATE, 0x00)) {
        ring.admit_signer(Generation::Gen1, card);
    }
    if let Some(link) = found.get(&(EF_LINK_CERTIFICATE, 0x02)) {
        ring.admit(Generation::Gen2V1, link);
    }
    if let Some(ca) = found.get(&(EF_CA_CERTIFICATE, 0x02)) {
        ring.admit(Generation::Gen2V1, ca);
    }
    if let Some(sign) = found.get(&(EF_CARD_SIGN_CERTIFICATE, 0x02)) {
        ring.admit_signer(Generation::Gen2V1, sign);
    }
    ring
}

/// Scan a card download
///
/// Fails only when fewer than two bytes are left at an element boundary.
/// Everything else ends up as a [`Diagnostic`] and, where the element was
/// recognised, as an error marker on its field.
pub(crate) fn decode(
    bytes: &[u8],
    config: &DecoderConfig,
    ring: Option<&KeyRing<'_>>,
) -> Result<Decoded<Card>> {
    let registry = TagRegistry::global();
    let mut card = Card::default();
    let mut diagnostics = Vec::new();
    let mut latch = GenerationLatch::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < 2 {
            return Err(DecoderError::TrailingBytes { offset, remaining });
        }
        let Some(header) = ElementHeader::read(bytes, offset) else {
            let fid = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
            log::warn!("Element header at offset {} cut short", offset);
            diagnostics.push(
                Diagnostic::new(
                    offset,
                    DiagnosticKind::Truncated {
                        needed: ELEMENT_HEADER_SIZE,
                        available: remaining,
                    },
                )
                .with_tag(fid)
                .terminal(),
            );
            break;
        };

        let value_start = offset + ELEMENT_HEADER_SIZE;
        let value_end = value_start + header.length;
        if value_end > bytes.len() {
            log::warn!(
                "Element 0x{:04X} at offset {} claims {} bytes, {} available",
                header.fid,
                offset,
                header.length,
                bytes.len() - value_start
            );
            diagnostics.push(
                Diagnostic::new(
                    offset,
                    DiagnosticKind::Truncated {
                        needed: header.length,
                        available: bytes.len() - value_start,
                    },
                )
                .with_tag(header.fid)
                .terminal(),
            );
            break;
        }
        let payload = &bytes[value_start..value_end];

        let Some(family) = header.family() else {
            log::warn!(
                "Element 0x{:04X} at offset {} has unknown appendix 0x{:02X}",
                header.fid,
                offset,
                header.appendix
            );
            diagnostics.push(
                Diagnostic::new(
                    offset,
                    DiagnosticKind::UnknownTag {
                        length: Some(header.length),
                    },
                )
                .with_tag(header.fid),
            );
            offset = value_end;
            continue;
        };

        if header.is_signature() {
            log::warn!("Signature 0x{:04X} at offset {} follows no data", header.fid, offset);
            diagnostics.push(
                Diagnostic::new(offset, DiagnosticKind::OrphanSignature).with_tag(header.fid),
            );
            offset = value_end;
            continue;
        }

        // the signature element, if any, belongs to this element whether or
        // not the tag turns out to be known
        let mut next = value_end;
        let mut signature = None;
        if let Some(following) = ElementHeader::read(bytes, value_end) {
            let signature_end = value_end + ELEMENT_HEADER_SIZE + following.length;
            if header.signed_by(&following) && signature_end <= bytes.len() {
                signature = Some(&bytes[value_end + ELEMENT_HEADER_SIZE..signature_end]);
                next = signature_end;
            }
        }

        latch.observe_card(header.fid, family);
        let generation = latch.card_generation(family);
        match registry.lookup(FileKind::Card, generation, header.fid) {
            Some(descriptor) => {
                log::debug!(
                    "Element 0x{:04X} at offset {}: {} ({} bytes)",
                    header.fid,
                    offset,
                    descriptor.field_name(generation),
                    header.length
                );
                let mut element = Element {
                    offset,
                    descriptor,
                    generation,
                    payload,
                    signature: None,
                    keep_raw: config.keep_raw_on_error,
                    diagnostics: &mut diagnostics,
                };
                element.attach_signature(signature, ring);
                element.store(&mut card, config, ring);
            }
            None => {
                log::warn!(
                    "Unknown {} element 0x{:04X} at offset {} ({} bytes skipped)",
                    generation,
                    header.fid,
                    offset,
                    header.length
                );
                diagnostics.push(
                    Diagnostic::new(
                        offset,
                        DiagnosticKind::UnknownTag {
                            length: Some(header.length),
                        },
                    )
                    .with_tag(header.fid),
                );
            }
        }
        offset = next;
    }

    card.generation = latch.current();
    log::info!(
        "Card decoded: {} byte(s) consumed, {} diagnostic(s)",
        offset,
        diagnostics.len()
    );
    Ok(Decoded {
        value: card,
        diagnostics,
        consumed: offset,
    })
}

/// One recognised data element on its way into the [`Card`]
struct Element<'a, 'd> {
    offset: usize,
    descriptor: &'static RecordDescriptor,
    generation: Generation,
    payload: &'a [u8],
    signature: Option<SignatureBlock>,
    keep_raw: bool,
    diagnostics: &'d mut Vec<Diagnostic>,
}

impl Element<'_, '_> {
    fn field(&self) -> String {
        self.descriptor.field_name(self.generation)
    }

    fn note(&mut self, kind: DiagnosticKind) {
        let diagnostic = Diagnostic::new(self.offset, kind)
            .with_tag(self.descriptor.tag)
            .with_field(self.field());
        self.diagnostics.push(diagnostic);
    }

    fn attach_signature(&mut self, signature: Option<&[u8]>, ring: Option<&KeyRing<'_>>) {
        let Some(signature) = signature else {
            return;
        };
        if !self.descriptor.signed {
            log::warn!("{} carries a signature but is not a signed record", self.field());
            self.note(DiagnosticKind::UnexpectedSignature);
        }
        let mut block = SignatureBlock::new(signature);
        if let Some(ring) = ring {
            let outcome = ring.verify_block(self.generation, self.payload, signature);
            log::debug!("{} signature: {}", self.field(), outcome);
            block.verification = Some(outcome);
        }
        self.signature = Some(block);
    }

    /// Decode the payload, which must be consumed exactly
    fn block<T>(&mut self, decode: impl FnOnce(&mut Reader<'_>) -> Result<T>) -> Block<T> {
        let result = if self.descriptor.shape.accepts(self.payload.len()) {
            let mut reader = Reader::new(self.payload);
            decode(&mut reader).and_then(|value| {
                if reader.is_empty() {
                    Ok(value)
                } else {
                    Err(DecoderError::Malformed(format!(
                        "{} trailing byte(s)",
                        reader.remaining()
                    )))
                }
            })
        } else {
            Err(DecoderError::Malformed(format!(
                "length {} does not fit {:?}",
                self.payload.len(),
                self.descriptor.shape
            )))
        };

        let block = match result {
            Ok(value) => Block::decoded(value),
            Err(e) => {
                let reason = e.to_string();
                log::warn!("Malformed {} at offset {}: {}", self.field(), self.offset, reason);
                self.note(DiagnosticKind::Malformed {
                    reason: reason.clone(),
                });
                let raw = if self.keep_raw { Some(self.payload) } else { None };
                Block::malformed(reason, raw)
            }
        };
        block.with_signature(self.signature.take())
    }

    /// `(pointer size, record size)` of a repeated-record descriptor
    fn repeated(&self) -> (usize, usize) {
        match self.descriptor.shape {
            PayloadShape::Repeated { header, record } => (header, record),
            _ => (0, self.payload.len().max(1)),
        }
    }

    fn cyclic<T>(
        &mut self,
        skip_unused: bool,
        decode: impl Fn(&mut Reader<'_>) -> Result<T>,
    ) -> Block<CyclicRecords<T>> {
        let (pointer, record) = self.repeated();
        self.block(|reader| {
            CyclicRecords::decode_with(reader.rest(), pointer, record, skip_unused, decode)
        })
    }

    fn certificate(&mut self, ring: Option<&KeyRing<'_>>) -> Block<CertificateRecord> {
        let generation = self.generation;
        self.block(|reader| match ring {
            Some(ring) => CertificateRecord::decode_with(generation, reader.rest(), ring),
            None => CertificateRecord::decode(generation, reader.rest()),
        })
    }

    fn store(mut self, card: &mut Card, config: &DecoderConfig, ring: Option<&KeyRing<'_>>) {
        let RecordKind::Card(record) = self.descriptor.record else {
            return;
        };
        let second = self.generation.is_second();
        let skip = config.skip_empty_records;

        match record {
            CardRecord::IccIdentification => put(
                second,
                &mut card.card_icc_identification_1,
                &mut card.card_icc_identification_2,
                self.block(CardIccIdentification::decode),
            ),
            CardRecord::ChipIdentification => put(
                second,
                &mut card.card_chip_identification_1,
                &mut card.card_chip_identification_2,
                self.block(CardChipIdentification::decode),
            ),
            CardRecord::ApplicationIdentification => put(
                second,
                &mut card.application_identification_1,
                &mut card.application_identification_2,
                self.block(|r| ApplicationIdentification::decode(r, second)),
            ),
            CardRecord::CardCertificate => put(
                second,
                &mut card.card_certificate_1,
                &mut card.card_certificate_2,
                self.certificate(ring),
            ),
            CardRecord::CardSignCertificate => {
                card.card_sign_certificate_2 = Some(self.certificate(ring))
            }
            CardRecord::CaCertificate => put(
                second,
                &mut card.ca_certificate_1,
                &mut card.ca_certificate_2,
                self.certificate(ring),
            ),
            CardRecord::LinkCertificate => card.link_certificate_2 = Some(self.certificate(ring)),
            CardRecord::Identification => {
                let card_type = card.card_type(second);
                put(
                    second,
                    &mut card.identification_1,
                    &mut card.identification_2,
                    self.block(|r| Identification::decode_for(r, card_type)),
                )
            }
            CardRecord::CardDownload => put(
                second,
                &mut card.card_download_1,
                &mut card.card_download_2,
                self.block(CardDownload::decode),
            ),
            CardRecord::DrivingLicenceInfo => put(
                second,
                &mut card.driving_licence_info_1,
                &mut card.driving_licence_info_2,
                self.block(DrivingLicenceInfo::decode),
            ),
            CardRecord::EventsData => put(
                second,
                &mut card.events_data_1,
                &mut card.events_data_2,
                self.block(|r| fixed_records(r.rest(), skip)),
            ),
            CardRecord::FaultsData => put(
                second,
                &mut card.faults_data_1,
                &mut card.faults_data_2,
                self.block(|r| fixed_records(r.rest(), skip)),
            ),
            CardRecord::DriverActivityData => put(
                second,
                &mut card.driver_activity_data_1,
                &mut card.driver_activity_data_2,
                self.block(|r| CardDriverActivity::decode(r.rest())),
            ),
            CardRecord::VehiclesUsed => put(
                second,
                &mut card.vehicles_used_1,
                &mut card.vehicles_used_2,
                self.cyclic(skip, |r| CardVehicleRecord::decode_versioned(r, second)),
            ),
            CardRecord::Places => put(
                second,
                &mut card.places_1,
                &mut card.places_2,
                self.cyclic(skip, |r| PlaceRecord::decode_versioned(r, second)),
            ),
            CardRecord::CurrentUsage => put(
                second,
                &mut card.current_usage_1,
                &mut card.current_usage_2,
                self.block(CardCurrentUse::decode),
            ),
            CardRecord::ControlActivityData => put(
                second,
                &mut card.control_activity_data_1,
                &mut card.control_activity_data_2,
                self.block(CardControlActivityDataRecord::decode),
            ),
            CardRecord::SpecificConditions => put(
                second,
                &mut card.specific_conditions_1,
                &mut card.specific_conditions_2,
                self.cyclic(skip, SpecificConditionRecord::decode),
            ),
            CardRecord::VehicleUnitsUsed => {
                card.vehicle_units_used_2 = Some(self.cyclic(skip, CardVehicleUnitRecord::decode))
            }
            CardRecord::GnssPlaces => {
                card.gnss_places_2 = Some(self.cyclic(skip, GnssAccumulatedDrivingRecord::decode))
            }
            CardRecord::ApplicationIdentificationV2 => {
                card.application_identification_v2_2 =
                    Some(self.block(ApplicationIdentificationV2::decode))
            }
            CardRecord::PlacesAuthentication => {
                card.places_authentication_2 = Some(self.cyclic(skip, AuthenticationRecord::decode))
            }
            CardRecord::GnssPlacesAuthentication => {
                card.gnss_places_authentication_2 =
                    Some(self.cyclic(skip, AuthenticationRecord::decode))
            }
            CardRecord::BorderCrossings => {
                card.border_crossings_2 = Some(self.cyclic(skip, CardBorderCrossingRecord::decode))
            }
            CardRecord::LoadUnloadOperations => {
                card.load_unload_operations_2 =
                    Some(self.cyclic(skip, CardLoadUnloadRecord::decode))
            }
            CardRecord::LoadTypeEntries => {
                card.load_type_entries_2 = Some(self.cyclic(skip, CardLoadTypeEntryRecord::decode))
            }
        }
    }
}

/// Store `block` in the field of the element's generation family
fn put<T>(
    second: bool,
    first_slot: &mut Option<Block<T>>,
    second_slot: &mut Option<Block<T>>,
    block: Block<T>,
) {
    if second {
        *second_slot = Some(block);
    } else {
        *first_slot = Some(block);
    }
}

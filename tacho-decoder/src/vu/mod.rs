//! Vehicle unit downloads (TV)
//!
//! A VU file is a sequence of transfers, each introduced by a two byte tag
//! (`0x76` and the TREP) and carrying no length. The width of a transfer is
//! worked out from its structure: record counts for the first generation,
//! record array headers for the second. An unknown tag therefore ends the
//! scan, since there is no way to find where its value stops.
//!
//! Signatures are checked after the scan, once the certificates in the
//! overview transfer are known.

pub mod gen1;
pub mod gen2;
pub mod records;

use crate::certificates::{CertificateStore, KeyIdentifier};
use crate::config::DecoderConfig;
use crate::primitives::{Decode, Reader};
use crate::registry::{RecordKind, TagRegistry, VuTransfer};
use crate::signature::KeyRing;
use crate::types::{
    Block, Decoded, DecoderError, Diagnostic, DiagnosticKind, FileKind, Generation, Result,
    SignatureBlock,
};
use gen2::{ArrayLayout, TransferData};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// `0x76` and the TREP
pub const TAG_SIZE: usize = 2;

/// A decoded VU download
///
/// A download may hold several transfers of the same kind (one activities
/// transfer per downloaded day, for instance), so every field is a list in
/// file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vu {
    /// Highest generation seen in the file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<Generation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overview_1: Vec<Block<gen1::Overview>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities_1: Vec<Block<gen1::Activities>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events_and_faults_1: Vec<Block<gen1::EventsAndFaults>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detailed_speed_1: Vec<Block<gen1::DetailedSpeed>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_data_1: Vec<Block<gen1::TechnicalData>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overview_2: Vec<Block<TransferData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities_2: Vec<Block<TransferData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events_and_faults_2: Vec<Block<TransferData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detailed_speed_2: Vec<Block<TransferData>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub technical_data_2: Vec<Block<TransferData>>,
}

impl Vu {
    /// Serialize to JSON, indented when `pretty` is set
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    fn second_gen_mut(&mut self, transfer: VuTransfer) -> &mut Vec<Block<TransferData>> {
        match transfer {
            VuTransfer::Overview => &mut self.overview_2,
            VuTransfer::Activities => &mut self.activities_2,
            VuTransfer::EventsAndFaults => &mut self.events_and_faults_2,
            VuTransfer::DetailedSpeed => &mut self.detailed_speed_2,
            VuTransfer::TechnicalData => &mut self.technical_data_2,
        }
    }

    /// Signature of the `index`th transfer of a kind
    pub fn block_signature_mut(
        &mut self,
        transfer: VuTransfer,
        second_gen: bool,
        index: usize,
    ) -> Option<&mut SignatureBlock> {
        if second_gen {
            return self.second_gen_mut(transfer).get_mut(index)?.signature.as_mut();
        }
        match transfer {
            VuTransfer::Overview => self.overview_1.get_mut(index)?.signature.as_mut(),
            VuTransfer::Activities => self.activities_1.get_mut(index)?.signature.as_mut(),
            VuTransfer::EventsAndFaults => {
                self.events_and_faults_1.get_mut(index)?.signature.as_mut()
            }
            VuTransfer::DetailedSpeed => self.detailed_speed_1.get_mut(index)?.signature.as_mut(),
            VuTransfer::TechnicalData => self.technical_data_1.get_mut(index)?.signature.as_mut(),
        }
    }
}

/// How a transfer value was delimited
enum Framing {
    First(usize),
    Second(Vec<ArrayLayout>),
}

impl Framing {
    fn width(&self) -> usize {
        match self {
            Framing::First(width) => *width,
            Framing::Second(arrays) => arrays.last().map_or(0, |a| a.span().end),
        }
    }
}

/// A signature to check once the file's keys are known, by absolute ranges
struct PendingSignature {
    transfer: VuTransfer,
    generation: Generation,
    index: usize,
    data: Vec<Range<usize>>,
    signature: Range<usize>,
}

/// Where the member state and VU certificates of one key family sit
struct CertificateRanges {
    member_state: Range<usize>,
    vu: Range<usize>,
}

fn shift(range: Range<usize>, by: usize) -> Range<usize> {
    range.start + by..range.end + by
}

/// One transfer on its way into the [`Vu`]
struct Transfer<'a> {
    offset: usize,
    tag: u16,
    field: String,
    value: &'a [u8],
}

impl Transfer<'_> {
    fn block<T>(
        &self,
        result: Result<T>,
        config: &DecoderConfig,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Block<T> {
        match result {
            Ok(value) => Block::decoded(value),
            Err(e) => {
                let reason = e.to_string();
                log::warn!("Malformed {} at offset {}: {}", self.field, self.offset, reason);
                diagnostics.push(
                    Diagnostic::new(
                        self.offset,
                        DiagnosticKind::Malformed {
                            reason: reason.clone(),
                        },
                    )
                    .with_tag(self.tag)
                    .with_field(self.field.clone()),
                );
                let raw = if config.keep_raw_on_error {
                    Some(self.value)
                } else {
                    None
                };
                Block::malformed(reason, raw)
            }
        }
    }
}

/// Decode `content`, which must be consumed exactly
fn decode_exact<T: Decode>(content: &[u8]) -> Result<T> {
    let mut reader = Reader::new(content);
    let value = T::decode(&mut reader)?;
    if !reader.is_empty() {
        return Err(DecoderError::Malformed(format!(
            "{} trailing byte(s)",
            reader.remaining()
        )));
    }
    Ok(value)
}

/// Scan a VU download
///
/// With a `store`, every transfer signature is checked after the scan.
pub(crate) fn decode(
    bytes: &[u8],
    config: &DecoderConfig,
    store: Option<&CertificateStore>,
) -> Result<Decoded<Vu>> {
    let registry = TagRegistry::global();
    let mut vu = Vu::default();
    let mut diagnostics = Vec::new();
    let mut latch = crate::registry::GenerationLatch::new();
    let mut pending = Vec::new();
    let mut certificates: HashMap<Generation, CertificateRanges> = HashMap::new();
    let mut offset = 0;

    while offset < bytes.len() {
        let remaining = bytes.len() - offset;
        if remaining < TAG_SIZE {
            return Err(DecoderError::TrailingBytes { offset, remaining });
        }
        let tag = u16::from_be_bytes([bytes[offset], bytes[offset + 1]]);
        let generation = latch.observe_vu(tag);
        let resolved = registry
            .lookup(FileKind::Vu, generation, tag)
            .and_then(|descriptor| match descriptor.record {
                RecordKind::Vu(transfer) => Some((descriptor, transfer)),
                RecordKind::Card(_) => None,
            });
        let Some((descriptor, transfer)) = resolved else {
            log::warn!("Unknown VU tag 0x{:04X} at offset {}, stopping", tag, offset);
            diagnostics.push(
                Diagnostic::new(offset, DiagnosticKind::UnknownTag { length: None })
                    .with_tag(tag)
                    .terminal(),
            );
            break;
        };

        let field = descriptor.field_name(generation);
        let value_start = offset + TAG_SIZE;
        let body = &bytes[value_start..];
        let framing = if generation.is_second() {
            gen2::layout(body).map(Framing::Second)
        } else {
            gen1::width(transfer, body).map(Framing::First)
        };
        let framing = match framing {
            Ok(framing) => framing,
            Err(e) => {
                let kind = match &e {
                    &DecoderError::UnexpectedEnd { needed, available } => {
                        DiagnosticKind::Truncated { needed, available }
                    }
                    other => DiagnosticKind::Malformed {
                        reason: other.to_string(),
                    },
                };
                log::warn!("{} at offset {} cannot be delimited: {}", field, offset, e);
                diagnostics.push(
                    Diagnostic::new(offset, kind)
                        .with_tag(tag)
                        .with_field(field)
                        .terminal(),
                );
                break;
            }
        };

        let width = framing.width();
        log::debug!("Transfer 0x{:04X} at offset {}: {} ({} bytes)", tag, offset, field, width);
        let current = Transfer {
            offset,
            tag,
            field,
            value: &body[..width],
        };

        match framing {
            Framing::First(width) => {
                let signature_range = width - gen1::SIGNATURE_SIZE..width;
                let signature = Some(SignatureBlock::new(&current.value[signature_range.clone()]));
                let content = &current.value[..width - gen1::SIGNATURE_SIZE];
                let index = match transfer {
                    VuTransfer::Overview => {
                        let block = current.block(decode_exact(content), config, &mut diagnostics);
                        vu.overview_1.push(block.with_signature(signature));
                        certificates.entry(Generation::Gen1).or_insert_with(|| {
                            let size = crate::certificates::gen1::CERTIFICATE_SIZE;
                            CertificateRanges {
                                member_state: value_start..value_start + size,
                                vu: value_start + size..value_start + 2 * size,
                            }
                        });
                        vu.overview_1.len() - 1
                    }
                    VuTransfer::Activities => {
                        let block = current.block(decode_exact(content), config, &mut diagnostics);
                        vu.activities_1.push(block.with_signature(signature));
                        vu.activities_1.len() - 1
                    }
                    VuTransfer::EventsAndFaults => {
                        let block = current.block(decode_exact(content), config, &mut diagnostics);
                        vu.events_and_faults_1.push(block.with_signature(signature));
                        vu.events_and_faults_1.len() - 1
                    }
                    VuTransfer::DetailedSpeed => {
                        let block = current.block(decode_exact(content), config, &mut diagnostics);
                        vu.detailed_speed_1.push(block.with_signature(signature));
                        vu.detailed_speed_1.len() - 1
                    }
                    VuTransfer::TechnicalData => {
                        let block = current.block(decode_exact(content), config, &mut diagnostics);
                        vu.technical_data_1.push(block.with_signature(signature));
                        vu.technical_data_1.len() - 1
                    }
                };
                pending.push(PendingSignature {
                    transfer,
                    generation,
                    index,
                    data: vec![shift(gen1::signed_range(transfer, width), value_start)],
                    signature: shift(signature_range, value_start),
                });
            }
            Framing::Second(arrays) => {
                for array in arrays
                    .iter()
                    .filter(|a| gen2::record_type_name(a.record_type).is_none())
                {
                    log::warn!(
                        "{}: unknown record type 0x{:02X} kept as bytes",
                        current.field,
                        array.record_type
                    );
                    diagnostics.push(
                        Diagnostic::new(
                            value_start + array.offset,
                            DiagnosticKind::UnknownRecordType {
                                record_type: array.record_type,
                            },
                        )
                        .with_tag(tag)
                        .with_field(current.field.clone()),
                    );
                }

                let signature_range = gen2::signature_range(&arrays);
                let signature = signature_range
                    .clone()
                    .map(|range| SignatureBlock::new(&current.value[range]));
                let (data, faults) = TransferData::decode(current.value, &arrays);
                for fault in faults {
                    log::warn!(
                        "{}: record type 0x{:02X} at offset {} kept as bytes: {}",
                        current.field,
                        fault.record_type,
                        value_start + fault.offset,
                        fault.reason
                    );
                    diagnostics.push(
                        Diagnostic::new(
                            value_start + fault.offset,
                            DiagnosticKind::Malformed {
                                reason: format!(
                                    "record array 0x{:02X}: {}",
                                    fault.record_type, fault.reason
                                ),
                            },
                        )
                        .with_tag(tag)
                        .with_field(current.field.clone()),
                    );
                }
                let block = Block::decoded(data).with_signature(signature);
                let list = vu.second_gen_mut(transfer);
                list.push(block);
                let index = list.len() - 1;

                if transfer == VuTransfer::Overview {
                    let first_record = |record_type: u8| {
                        arrays
                            .iter()
                            .find(|a| a.record_type == record_type && a.count > 0)
                            .map(|a| {
                                let start = a.records().start;
                                shift(start..start + a.record_size, value_start)
                            })
                    };
                    if let (Some(member_state), Some(vu_certificate)) = (
                        first_record(gen2::MEMBER_STATE_CERTIFICATE),
                        first_record(gen2::VU_CERTIFICATE),
                    ) {
                        certificates
                            .entry(generation.key_family())
                            .or_insert(CertificateRanges {
                                member_state,
                                vu: vu_certificate,
                            });
                    }
                }
                if let Some(signature) = signature_range {
                    pending.push(PendingSignature {
                        transfer,
                        generation,
                        index,
                        data: gen2::signed_ranges(transfer, &arrays)
                            .into_iter()
                            .map(|range| shift(range, value_start))
                            .collect(),
                        signature: shift(signature, value_start),
                    });
                }
            }
        }
        offset = value_start + width;
    }

    vu.generation = latch.current();
    if let Some(store) = store {
        verify_signatures(&mut vu, bytes, &certificates, &pending, store);
    }
    log::info!(
        "VU decoded: {} byte(s) consumed, {} diagnostic(s)",
        offset,
        diagnostics.len()
    );
    Ok(Decoded {
        value: vu,
        diagnostics,
        consumed: offset,
    })
}

fn verify_signatures(
    vu: &mut Vu,
    bytes: &[u8],
    certificates: &HashMap<Generation, CertificateRanges>,
    pending: &[PendingSignature],
    store: &CertificateStore,
) {
    let mut ring = KeyRing::new(store);
    let mut first_gen_holders: Option<(Option<KeyIdentifier>, Option<KeyIdentifier>)> = None;
    for (&generation, ranges) in certificates {
        let member_state = ring.admit(generation, &bytes[ranges.member_state.clone()]);
        let vu_key = ring.admit_signer(generation, &bytes[ranges.vu.clone()]);
        if generation == Generation::Gen1 {
            first_gen_holders = Some((member_state, vu_key));
        }
    }

    // first generation certificates can only be read once opened
    if let Some((member_state, vu_key)) = first_gen_holders {
        if let Some(overview) = vu.overview_1.first_mut().and_then(|b| b.data.as_mut()) {
            overview.member_state_certificate.summary.holder_reference = member_state;
            overview.vu_certificate.summary.holder_reference = vu_key;
        }
    }

    for item in pending {
        let data: Vec<u8> = item
            .data
            .iter()
            .flat_map(|range| bytes[range.clone()].iter().copied())
            .collect();
        let outcome = ring.verify_block(item.generation, &data, &bytes[item.signature.clone()]);
        log::debug!(
            "{:?} transfer {} ({}) signature: {}",
            item.transfer,
            item.index,
            item.generation,
            outcome
        );
        if let Some(signature) =
            vu.block_signature_mut(item.transfer, item.generation.is_second(), item.index)
        {
            signature.verification = Some(outcome);
        }
    }
}

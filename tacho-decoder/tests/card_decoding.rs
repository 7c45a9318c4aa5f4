//! End-to-end card decoding

mod common;

use common::*;
use tacho_decoder::card::records::{ApplicationIdentification, HolderIdentification};
use tacho_decoder::{Decoder, DecoderConfig, DiagnosticKind, Generation};

fn decoder() -> Decoder {
    Decoder::new().unwrap()
}

#[test]
fn test_first_generation_driver_card() {
    let bytes = gen1_driver_card();
    let decoded = decoder().decode_card(&bytes).unwrap();

    assert!(decoded.diagnostics.is_empty(), "{:?}", decoded.diagnostics);
    assert_eq!(decoded.consumed, bytes.len());
    let card = decoded.value;
    assert_eq!(card.generation, Some(Generation::Gen1));

    let application = card.application_identification_1.unwrap().data.unwrap();
    match application {
        ApplicationIdentification::Driver(capacities) => {
            assert_eq!(capacities.activity_structure_length, 5000);
            assert_eq!(capacities.no_of_card_place_records, 112);
        }
        other => panic!("expected a driver card, got {:?}", other),
    }

    let identification = card.identification_1.unwrap();
    assert!(identification.signature.is_some());
    let identification = identification.data.unwrap();
    let card_identification = &identification.card_identification;
    assert_eq!(card_identification.card_issuing_member_state, 0x0D);
    assert_eq!(card_identification.card_number, "DF00001234567801");
    assert_eq!(card_identification.card_issuing_authority_name, "KBA Flensburg");
    assert_eq!(
        card_identification.card_expiry_date.to_rfc3339(),
        "2028-01-14T00:00:00+00:00"
    );
    match identification.holder {
        HolderIdentification::Driver {
            card_holder_name,
            card_holder_birth_date,
            card_holder_preferred_language,
        } => {
            assert_eq!(card_holder_name.surname, "Müller");
            assert_eq!(card_holder_name.first_names, "Jürgen");
            assert_eq!(card_holder_birth_date.unwrap().to_string(), "1980-04-23");
            assert_eq!(card_holder_preferred_language, "de");
        }
        other => panic!("expected a driver holder, got {:?}", other),
    }

    assert!(card.card_certificate_1.is_some());
    assert!(card.ca_certificate_1.is_some());
    assert!(card.card_download_1.is_some());
    assert!(card.identification_2.is_none());
}

#[test]
fn test_second_generation_driver_card() {
    let bytes = gen2_driver_card();
    let decoded = decoder().decode_card(&bytes).unwrap();

    assert!(decoded.is_complete());
    let card = decoded.value;
    assert_eq!(card.generation, Some(Generation::Gen2V1));
    let sign = card.card_sign_certificate_2.unwrap().data.unwrap();
    assert_eq!(
        sign.summary.holder_reference.unwrap().to_string(),
        "0034567803240110"
    );
    assert_eq!(
        sign.summary.authority_reference.unwrap().to_string(),
        "fe4d534111ffff01"
    );
    let identification = card.identification_2.unwrap().data.unwrap();
    assert_eq!(
        identification.card_identification.card_number,
        "DF00001234567802"
    );
}

#[test]
fn test_single_element_card() {
    // one card download element of four bytes decodes on its own
    let bytes = element(0x050E, 0x00, &[0x65, 0xE2, 0x6C, 0x00]);
    let decoded = decoder().decode_card(&bytes).unwrap();

    assert!(decoded.diagnostics.is_empty());
    let json = decoded.value.to_json(false).unwrap();
    assert_eq!(
        json,
        r#"{"generation":"gen1","card_download_1":{"data":{"last_card_download":"2024-03-02T00:00:00Z"}}}"#
    );
}

#[test]
fn test_claimed_length_past_end() {
    let mut bytes = element(0x050E, 0x00, &[0x65, 0xE2, 0x6C, 0x00]);
    bytes[4] = 99;
    let decoded = decoder().decode_card(&bytes).unwrap();

    assert!(decoded.value.card_download_1.is_none());
    assert_eq!(decoded.diagnostics.len(), 1);
    assert_eq!(
        decoded.diagnostics[0].kind,
        DiagnosticKind::Truncated {
            needed: 99,
            available: 4
        }
    );
    assert!(!decoded.is_complete());
}

#[test]
fn test_unknown_element_between_known_ones() {
    let mut bytes = gen1_driver_card();
    let split = bytes.len() - 9;
    let tail = bytes.split_off(split);
    bytes.extend(element(0x7777, 0x00, &[1, 2, 3]));
    bytes.extend(element(0x7777, 0x01, &[0; 128]));
    bytes.extend(tail);

    let decoded = decoder().decode_card(&bytes).unwrap();
    assert_eq!(decoded.consumed, bytes.len());
    assert_eq!(decoded.diagnostics.len(), 1);
    assert_eq!(decoded.diagnostics[0].tag, Some(0x7777));
    assert!(matches!(
        decoded.diagnostics[0].kind,
        DiagnosticKind::UnknownTag { length: Some(3) }
    ));
    assert!(decoded.value.identification_1.is_some());
    assert!(decoded.value.card_download_1.is_some());
}

#[test]
fn test_malformed_field_keeps_neighbours() {
    // card number with a byte outside IA5
    let mut identification = vec![0u8; 143];
    identification[1] = 0x80;
    let mut bytes = element(0x0520, 0x00, &identification);
    bytes.extend(element(0x050E, 0x00, &[0x65, 0xE1, 0x1A, 0x80]));
    let config = DecoderConfig::new().with_raw_on_error(true);
    let decoded = decoder().with_config(config).decode_card(&bytes).unwrap();

    let identification = decoded.value.identification_1.as_ref().unwrap();
    assert!(identification.is_malformed());
    assert_eq!(identification.raw.as_ref().unwrap().len(), 143);
    assert!(decoded.value.card_download_1.as_ref().unwrap().data.is_some());
    assert!(decoded.is_complete());
}

#[test]
fn test_pretty_json_round_trip() {
    let decoded = decoder().decode_card(&gen1_driver_card()).unwrap();
    let json = decoded.value.to_json(true).unwrap();
    assert!(json.contains("\n  \"identification_1\""));
    let parsed: tacho_decoder::Card = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, decoded.value);
}

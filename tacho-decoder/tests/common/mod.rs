//! Shared builders and fixed test vectors
//!
//! The vectors form two small certificate chains under the test roots of
//! `tests/data/certificates.json`: RSA-1024 for the first generation and
//! brainpoolP256r1 over NIST P-256 for the second.

#![allow(dead_code)]

use once_cell::sync::Lazy;
use std::sync::Arc;
use tacho_decoder::CertificateStore;

static TEST_STORE: Lazy<Arc<CertificateStore>> = Lazy::new(|| {
    let dataset = include_str!("../data/certificates.json");
    Arc::new(CertificateStore::from_dataset(dataset).unwrap())
});

/// Store holding the test roots and member state certificates
pub fn test_store() -> Arc<CertificateStore> {
    Arc::clone(&TEST_STORE)
}

/// Card element: `fid | appendix | length | value`
pub fn element(fid: u16, appendix: u8, value: &[u8]) -> Vec<u8> {
    let mut out = fid.to_be_bytes().to_vec();
    out.push(appendix);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out
}

pub fn bytes(hex_text: &str) -> Vec<u8> {
    hex::decode(hex_text).unwrap()
}

/// First generation overview transfer: tag, certificates, data, signature
pub fn gen1_overview() -> Vec<u8> {
    let mut out = vec![0x76, 0x01];
    out.extend(bytes(G1_MS_CERT));
    out.extend(bytes(G1_VU_CERT));
    out.extend(bytes(G1_VU_OVERVIEW_SIGNED));
    out.extend(bytes(G1_VU_OVERVIEW_SIG));
    out
}

/// First generation detailed speed transfer with `blocks` blocks and a
/// signature that does not verify
pub fn gen1_detailed_speed(blocks: u16) -> Vec<u8> {
    let mut out = vec![0x76, 0x04];
    out.extend_from_slice(&blocks.to_be_bytes());
    for _ in 0..blocks {
        out.extend_from_slice(&[0x65, 0xE1, 0x1A, 0x80]);
        out.extend_from_slice(&[88u8; 60]);
    }
    out.extend_from_slice(&[0x33; 128]);
    out
}

/// First generation driver card with its certificate chain and a signed
/// identification file
pub fn gen1_driver_card() -> Vec<u8> {
    let mut out = element(0x0501, 0x00, &[0x01, 0x00, 0x01, 0x0C, 0x18, 0x13, 0x88, 0x00, 0x54, 0x70]);
    out.extend(element(0xC100, 0x00, &bytes(G1_CARD_CERT)));
    out.extend(element(0xC108, 0x00, &bytes(G1_MS_CERT)));
    out.extend(element(0x0520, 0x00, &bytes(G1_IDENTIFICATION)));
    out.extend(element(0x0520, 0x01, &bytes(G1_IDENTIFICATION_SIG)));
    out.extend(element(0x050E, 0x00, &[0x65, 0xE1, 0x1A, 0x80]));
    out
}

/// Second generation driver card with a signed identification file
pub fn gen2_driver_card() -> Vec<u8> {
    let mut out = element(0xC108, 0x02, &bytes(G2_MS_CERT));
    out.extend(element(0xC101, 0x02, &bytes(G2_CARD_SIGN_CERT)));
    out.extend(element(0x0520, 0x02, &bytes(G2_IDENTIFICATION)));
    out.extend(element(0x0520, 0x03, &bytes(G2_IDENTIFICATION_SIG)));
    out
}

/// Member state certificate fe4d534101ffff01, issued by the first generation root
pub const G1_MS_CERT: &str = concat!(
    "0b3247b1a66c70d94aaea4e44795ccf82ade1c7636fa54b3e3c704e48da5a87aff74cac20c573096135ba0e1",
    "c5b82237a4b218d3568fb90cbb4b6fb26020bf7cafb7faa1ed46e499a3ff9e89654a9831119350fdb1d0ed74",
    "f43e07f04adade560c1b384787a38639bf8a307075c6e7f05f31e9a47375e7adfb5bdcd2f9b53a184a167138",
    "d48c25b9dfe73d0c85cb1d1db940cdee3928b5fa0a11c093bb98e381087a41823280cfb71f37ad296cc1ef9c",
    "95150000000000010001fe54535401ffff01",
);

/// Driver card certificate 001234560123010a
pub const G1_CARD_CERT: &str = concat!(
    "4051b70624c0af2ca873cad16a56a7c0cdb1cb85cc83b176c7d69851dbd7d2d7e671296d047531c144605d23",
    "98a2b0068a9bbf27a46023fda736589925bef1f40aafff133050af544721a03578ad7a874ab8362288a842ff",
    "f6edad8beeb5378a92f1e5470d006eb477e35563f2c3af933349c05cac69c3b87d9e42f9cce8c9a00a704a72",
    "695a55848ac2ea4775fdd9ffdf52f5a5cc76b1bdd1a976aeffd2b58265938dfec8a0f9129a0044735c5a19c1",
    "e93d0000000000010001fe4d534101ffff01",
);

/// VU certificate 006543210622020b
pub const G1_VU_CERT: &str = concat!(
    "b7bcee930fdde47d160353aaf42e6afb9533d670a846b3e9c6b83100ac0384818f58c74bdbf35c870aaa1737",
    "b884a5fe046477da9f0e9126659736836dbc2dd5be6d9c8b5b63031ef88174fc7815979a41c4ac3ab940a612",
    "95dd78b6678db8fb0ece00248cdefb3e8c0f740e3d4408f6d1c87aea27d869de1d25cb02d71ea91f3a968c0f",
    "32c9965081fdf46cbc845bfdb3bb98e819f3e88447c63c03e52e6d36d70c46b77aa4cfbff57e956564ef706e",
    "86770000000000010001fe4d534101ffff01",
);

/// EF Identification of card DF00001234567801
pub const G1_IDENTIFICATION: &str = concat!(
    "0d44463030303031323334353637383031014b424120466c656e736275726720202020202020202020202020",
    "20202020202020202063c3420063c342006d294380014dfc6c6c657220202020202020202020202020202020",
    "20202020202020202020202020014afc7267656e202020202020202020202020202020202020202020202020",
    "2020202020198004236465",
);

/// RSA signature of the identification file with the card key
pub const G1_IDENTIFICATION_SIG: &str = concat!(
    "17fc66047964676f573d143f4743d14dffb8a8eca32fdbab95626d04d5fc070e05f55a2a178fc804cbb26a57",
    "a96ef8e88cb6aebc40ce6d132c81527b20883213f45a46718bce7b00a2622cf53c6d5abe4627db420e1d1ab8",
    "27c382df958712d0709ab4666449d34f89b13d30d0b510f068f9d63f88c530d98f8539344f6cc317",
);

/// Overview transfer data after the certificates
pub const G1_VU_OVERVIEW_SIGNED: &str = concat!(
    "574442393633343033314c3132333435360d01422d544320313233342020202065e11a806592008065e11a80",
    "1065e11a80040d4443303030303039383736353433303001537065646974696f6e20426569737069656c2047",
    "6d62482020202020202020202020200000",
);

/// RSA signature of the overview data with the VU key
pub const G1_VU_OVERVIEW_SIG: &str = concat!(
    "2c025b7d1f57da26333e2177f8288d330932f6638c27ec8051fb72a3745ac83e63a3526262f2bea0d3860b4e",
    "e4c52342e726e506c072eb67712634b7a4ecce6307542ca1d0318b7384bc10ac47f66294844357646fcb4df2",
    "8c4ec7e1a284f33d5f4dd862a0d917760f56a2e59ab98a0e35fdbbf413fcbf46018fe3057085c273",
);

/// Member state certificate fe4d534111ffff01 (brainpoolP256r1)
pub const G2_MS_CERT: &str = concat!(
    "7f2181c97f4e81825f2901004208fe54535411ffff015f4c07ff54414348470d7f494e06092b240303020801",
    "010786410489e575a90fb7b92f8db815e1920ddb8247d63be46439410b51c3418f16cb4fa3724875b4050607",
    "3d04278ee9a83c0afae693bd22ae146efb8a1611bcbf2aedc55f2008fe4d534111ffff015f250463b0cd005f",
    "24047680c4805f374059410ce02f9bfd29ef40783984c459569467e787bcaf51e8847d0b26dd7e550625f002",
    "1aae182cd4a76a1220a6183e0ab62b6564b37dc6702ebc2b8786cc7b5f",
);

/// Card sign certificate 0034567803240110 (NIST P-256)
pub const G2_CARD_SIGN_CERT: &str = concat!(
    "7f2181c87f4e81815f2901004208fe4d534111ffff015f4c07ff5441434847027f494d06082a8648ce3d0301",
    "07864104d0d668d8e57b7beaef7196ca2d72bf0e57d6424ff691a643e822a35e124f227afafcdc3f06bb4151",
    "20adb660a66093d35015bfdeef727620624abba58d83d2da5f200800345678032401105f250463b0cd005f24",
    "047680c4805f374089fe174106ce40c47c60a2055dac58cf54369abbae0bf6b15f6f2b5d971c98f2a5ba9e38",
    "41566f9f63ee83518640fe8c23cfe69348cc3eb7d57f2a0ddc84a768",
);

/// EF Identification of card DF00001234567802
pub const G2_IDENTIFICATION: &str = concat!(
    "0d44463030303031323334353637383032014b424120466c656e736275726720202020202020202020202020",
    "20202020202020202063c3420063c342006d294380014dfc6c6c657220202020202020202020202020202020",
    "20202020202020202020202020014afc7267656e202020202020202020202020202020202020202020202020",
    "2020202020198004236465",
);

/// ECDSA signature (r || s) of the identification file
pub const G2_IDENTIFICATION_SIG: &str = concat!(
    "38ba987e3f6f059597f68dbeefb2c293dfd42949ed384fb2c9cf6968da0501576de0679a7506b08aa4e00884",
    "412b35fee238007682a9dc400948697b4103f7da",
);

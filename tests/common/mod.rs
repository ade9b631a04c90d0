//! Shared fixtures for the integration suites: synthetic PE images,
//! OpenSSL-generated certificate chains, an independent skip-masked digest
//! and a scriptable timestamp transport.

#![allow(dead_code)]

use std::cell::RefCell;

use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameBuilder, X509};
use sha2::{Digest, Sha256};

use authenticode_signer::{SigningResult, TimestampTransport, TransportResponse};

/// Build a minimal but structurally valid PE image: DOS header, PE
/// signature, COFF header, optional header with 16 data directories, and a
/// deterministic body. No sections; the Authenticode digest walks the file
/// in offset order, so none are needed.
pub fn minimal_pe(pe32_plus: bool, total_len: usize) -> Vec<u8> {
    assert!(total_len >= 1024, "fixture image too small");
    let mut bytes = vec![0u8; total_len];
    bytes[0] = b'M';
    bytes[1] = b'Z';
    let pe_offset = 0x80usize;
    bytes[0x3c..0x40].copy_from_slice(&(pe_offset as u32).to_le_bytes());
    bytes[pe_offset..pe_offset + 4].copy_from_slice(b"PE\0\0");

    // COFF header
    let machine: u16 = if pe32_plus { 0x8664 } else { 0x014c };
    bytes[pe_offset + 4..pe_offset + 6].copy_from_slice(&machine.to_le_bytes());
    let optional_size: u16 = if pe32_plus { 240 } else { 224 };
    bytes[pe_offset + 20..pe_offset + 22].copy_from_slice(&optional_size.to_le_bytes());
    bytes[pe_offset + 22..pe_offset + 24].copy_from_slice(&0x0022u16.to_le_bytes());

    // Optional header
    let optional = pe_offset + 24;
    let magic: u16 = if pe32_plus { 0x20b } else { 0x10b };
    bytes[optional..optional + 2].copy_from_slice(&magic.to_le_bytes());
    let dirs = optional + if pe32_plus { 112 } else { 96 };
    bytes[dirs - 4..dirs].copy_from_slice(&16u32.to_le_bytes());

    // deterministic body past the headers
    for (i, b) in bytes.iter_mut().enumerate().skip(0x200) {
        *b = ((i * 7 + 13) % 251) as u8;
    }
    bytes
}

fn build_name(cn: &str) -> openssl::x509::X509Name {
    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", cn).unwrap();
    name.build()
}

fn build_cert(
    subject: &str,
    issuer: &str,
    public: &PKey<Private>,
    signer: &PKey<Private>,
    serial: u32,
) -> X509 {
    let mut builder = X509Builder::new().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&build_name(subject)).unwrap();
    builder.set_issuer_name(&build_name(issuer)).unwrap();
    builder.set_pubkey(public).unwrap();
    let serial = BigNum::from_u32(serial).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(signer, MessageDigest::sha256()).unwrap();
    builder.build()
}

/// Single self-signed RSA-2048 certificate plus its key.
pub fn self_signed_rsa() -> (Vec<X509>, PKey<Private>) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let cert = build_cert("Test Leaf", "Test Leaf", &key, &key, 1);
    (vec![cert], key)
}

/// Single self-signed P-256 certificate plus its key.
pub fn self_signed_ec() -> (Vec<X509>, PKey<Private>) {
    let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
    let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
    let cert = build_cert("EC Test Leaf", "EC Test Leaf", &key, &key, 2);
    (vec![cert], key)
}

/// Leaf ← intermediate ← root chain, leaf first, plus the leaf key.
pub fn chain_of_three() -> (Vec<X509>, PKey<Private>) {
    let root_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let intermediate_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let leaf_key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
    let root = build_cert("Test Root", "Test Root", &root_key, &root_key, 10);
    let intermediate = build_cert(
        "Test Intermediate",
        "Test Root",
        &intermediate_key,
        &root_key,
        11,
    );
    let leaf = build_cert(
        "Test Leaf",
        "Test Intermediate",
        &leaf_key,
        &intermediate_key,
        12,
    );
    (vec![leaf, intermediate, root], leaf_key)
}

/// Independent implementation of the Authenticode digest: SHA-256 over the
/// file with the CheckSum field, the SECURITY directory entry and the
/// certificate table region skipped. Header offsets are recomputed here from
/// scratch on purpose.
pub fn masked_sha256(bytes: &[u8]) -> Vec<u8> {
    let pe_offset = u32::from_le_bytes(bytes[0x3c..0x40].try_into().unwrap()) as usize;
    let optional = pe_offset + 24;
    let magic = u16::from_le_bytes([bytes[optional], bytes[optional + 1]]);
    let pe32_plus = magic == 0x20b;
    let checksum = optional + 64;
    let security = optional + if pe32_plus { 112 } else { 96 } + 4 * 8;
    let cert_offset = u32::from_le_bytes(bytes[security..security + 4].try_into().unwrap()) as usize;
    let cert_size =
        u32::from_le_bytes(bytes[security + 4..security + 8].try_into().unwrap()) as usize;

    let mut hasher = Sha256::new();
    let mut regions = vec![(checksum, 4), (security, 8)];
    if cert_offset != 0 && cert_size != 0 {
        regions.push((cert_offset, cert_size));
    }
    regions.sort_unstable();
    let mut cursor = 0usize;
    for (start, len) in regions {
        if start > cursor {
            hasher.update(&bytes[cursor..start]);
        }
        cursor = cursor.max(start + len);
    }
    if cursor < bytes.len() {
        hasher.update(&bytes[cursor..]);
    }
    hasher.finalize().to_vec()
}

/// Count non-overlapping occurrences of `needle` in `haystack`.
pub fn count_occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    if needle.is_empty() || haystack.len() < needle.len() {
        return 0;
    }
    let mut count = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}

/// Transport returning scripted responses and recording every request.
pub struct StubTransport {
    responses: RefCell<Vec<SigningResult<TransportResponse>>>,
    pub requests: RefCell<Vec<(String, String, Vec<u8>)>>,
}

impl StubTransport {
    pub fn new(responses: Vec<SigningResult<TransportResponse>>) -> Self {
        StubTransport {
            responses: RefCell::new(responses),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn replying(status: u16, body: Vec<u8>) -> Self {
        Self::new(vec![Ok(TransportResponse { status, body })])
    }
}

impl TimestampTransport for StubTransport {
    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> SigningResult<TransportResponse> {
        self.requests
            .borrow_mut()
            .push((url.to_string(), content_type.to_string(), body.to_vec()));
        self.responses.borrow_mut().remove(0)
    }
}

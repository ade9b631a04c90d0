//! Hash algorithm identities and streaming digest support.
//!
//! Each algorithm carries the three identifiers Authenticode needs: the
//! textual digest name, the DER OID used inside `DigestInfo` and the
//! algorithm-identifier sets, and the OID placed in timestamp requests.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::domain::constants::{SHA1_ALGORITHM_OID, SHA256_ALGORITHM_OID};

/// Digest algorithms accepted for Authenticode signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl Default for HashAlgorithm {
    /// SHA-256 unconditionally. The historical wall-clock rule (SHA-1 before
    /// 2016) is intentionally not reproduced.
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl HashAlgorithm {
    /// Textual digest name as used in configuration.
    #[must_use]
    pub fn digest_name(self) -> &'static str {
        match self {
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha256 => "SHA-256",
        }
    }

    /// Parse a configuration name. Accepts the hyphenated and plain
    /// spellings; anything else is unknown.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SHA-1" | "SHA1" => Some(HashAlgorithm::Sha1),
            "SHA-256" | "SHA256" => Some(HashAlgorithm::Sha256),
            _ => None,
        }
    }

    /// OID content bytes for DER `AlgorithmIdentifier` encoding.
    #[must_use]
    pub fn oid_der(self) -> &'static [u8] {
        match self {
            HashAlgorithm::Sha1 => SHA1_ALGORITHM_OID,
            HashAlgorithm::Sha256 => SHA256_ALGORITHM_OID,
        }
    }

    /// OID content bytes for the MessageImprint of a timestamp request.
    /// Identical values to `oid_der` for both members of the set, kept as a
    /// separate accessor because the two identifier spaces are distinct.
    #[must_use]
    pub fn timestamp_oid_der(self) -> &'static [u8] {
        self.oid_der()
    }

    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha1 => 20,
            HashAlgorithm::Sha256 => 32,
        }
    }

    /// Matching OpenSSL message digest for signature generation.
    #[must_use]
    pub fn message_digest(self) -> openssl::hash::MessageDigest {
        match self {
            HashAlgorithm::Sha1 => openssl::hash::MessageDigest::sha1(),
            HashAlgorithm::Sha256 => openssl::hash::MessageDigest::sha256(),
        }
    }

    /// One-shot digest of a byte slice.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        let mut digester = Digester::new(self);
        digester.update(data);
        digester.finish()
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.digest_name())
    }
}

/// Streaming digest over the closed algorithm set.
pub enum Digester {
    Sha1(Sha1),
    Sha256(Sha256),
}

impl Digester {
    #[must_use]
    pub fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Sha1 => Digester::Sha1(Sha1::new()),
            HashAlgorithm::Sha256 => Digester::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Digester::Sha1(h) => h.update(data),
            Digester::Sha256(h) => h.update(data),
        }
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        match self {
            Digester::Sha1(h) => h.finalize().to_vec(),
            Digester::Sha256(h) => h.finalize().to_vec(),
        }
    }
}

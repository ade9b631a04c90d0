//! Authenticode SPC structures: the signed content and the Authenticode
//! authenticated attributes.
//!
//! `SpcIndirectDataContent` binds the image digest to the Authenticode
//! content type; `SpcStatementType` and `SpcSpOpusInfo` ride along as signed
//! attributes. All encodings here are the exact shapes Windows verifiers
//! expect, including the explicit NULL digest-algorithm parameter and the
//! conventional `<<<Obsolete>>>` file link inside `SpcPeImageData`.

use crate::domain::constants::{
    ASN1_CONTEXT_0_PRIMITIVE_TAG, ASN1_CONTEXT_0_TAG, ASN1_CONTEXT_1_TAG, ASN1_CONTEXT_2_TAG,
    ASN1_NULL, SPC_INDIVIDUAL_SP_KEY_PURPOSE_OID, SPC_PE_IMAGE_DATA_OID, SPC_SP_OPUS_INFO_OID,
    SPC_STATEMENT_TYPE_OID,
};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::der;

/// The placeholder file name carried by every Authenticode PE signature.
const OBSOLETE_FILE_MARKER: &str = "<<<Obsolete>>>";

/// A CMS attribute: OID plus a single value, encoded as
/// `SEQUENCE { type, SET { value } }`.
#[derive(Debug, Clone)]
pub struct Attribute {
    oid: Vec<u8>,
    value: Vec<u8>,
}

impl Attribute {
    #[must_use]
    pub fn new(oid: &[u8], value: Vec<u8>) -> Self {
        Attribute {
            oid: oid.to_vec(),
            value,
        }
    }

    #[must_use]
    pub fn oid(&self) -> &[u8] {
        &self.oid
    }

    /// Complete DER of the attribute.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let mut body = der::oid(&self.oid);
        body.extend_from_slice(&der::set_of(vec![self.value.clone()]));
        der::sequence(&body)
    }
}

/// `DigestInfo ::= SEQUENCE { AlgorithmIdentifier, OCTET STRING }` with the
/// NULL parameter present; Windows rejects an absent parameter here.
fn digest_info(algorithm: HashAlgorithm, digest: &[u8]) -> Vec<u8> {
    let mut identifier = der::oid(algorithm.oid_der());
    identifier.extend_from_slice(ASN1_NULL);
    let mut body = der::sequence(&identifier);
    body.extend_from_slice(&der::octet_string(digest));
    der::sequence(&body)
}

/// `SpcPeImageData ::= SEQUENCE { flags BIT STRING, file [0] EXPLICIT
/// SpcLink }` with empty flags and the obsolete unicode file link
/// (`file [2] EXPLICIT SpcString`, `unicode [0] IMPLICIT BMPString`).
fn pe_image_data() -> Vec<u8> {
    let marker = {
        let bmp = der::bmp_string(OBSOLETE_FILE_MARKER);
        // re-tag the BMPString as [0] IMPLICIT
        let mut implicit = bmp;
        implicit[0] = ASN1_CONTEXT_0_PRIMITIVE_TAG;
        implicit
    };
    let spc_link = der::wrap(ASN1_CONTEXT_2_TAG, &marker);
    let file = der::wrap(ASN1_CONTEXT_0_TAG, &spc_link);

    let mut body = der::empty_bit_string();
    body.extend_from_slice(&file);
    der::sequence(&body)
}

/// DER of the `SpcIndirectDataContent` carried as eContent: the PE-image
/// marker plus the `DigestInfo` over the Authenticode image digest.
#[must_use]
pub fn indirect_data_content(algorithm: HashAlgorithm, digest: &[u8]) -> Vec<u8> {
    let mut data = der::oid(SPC_PE_IMAGE_DATA_OID);
    data.extend_from_slice(&pe_image_data());
    let mut body = der::sequence(&data);
    body.extend_from_slice(&digest_info(algorithm, digest));
    der::sequence(&body)
}

/// `SpcStatementType` naming the individual code-signing purpose.
#[must_use]
pub fn statement_type_attribute() -> Attribute {
    let purpose = der::sequence(&der::oid(SPC_INDIVIDUAL_SP_KEY_PURPOSE_OID));
    Attribute::new(SPC_STATEMENT_TYPE_OID, purpose)
}

/// `SpcSpOpusInfo` carrying the program name (unicode) and URL (IA5),
/// present iff at least one of the two is set.
#[must_use]
pub fn opus_info_attribute(
    program_name: Option<&str>,
    program_url: Option<&str>,
) -> Option<Attribute> {
    if program_name.is_none() && program_url.is_none() {
        return None;
    }
    let mut body = Vec::new();
    if let Some(name) = program_name {
        let mut unicode = der::bmp_string(name);
        unicode[0] = ASN1_CONTEXT_0_PRIMITIVE_TAG;
        body.extend_from_slice(&der::wrap(ASN1_CONTEXT_0_TAG, &unicode));
    }
    if let Some(url) = program_url {
        let mut link = der::ia5_string(url);
        link[0] = ASN1_CONTEXT_0_PRIMITIVE_TAG;
        body.extend_from_slice(&der::wrap(ASN1_CONTEXT_1_TAG, &link));
    }
    Some(Attribute::new(SPC_SP_OPUS_INFO_OID, der::sequence(&body)))
}

/// The Authenticode-specific authenticated attributes. The standard CMS
/// `contentType` and `messageDigest` attributes are added by the signed-data
/// generator.
#[must_use]
pub fn authenticated_attributes(
    program_name: Option<&str>,
    program_url: Option<&str>,
) -> Vec<Attribute> {
    let mut attributes = vec![statement_type_attribute()];
    if let Some(opus) = opus_info_attribute(program_name, program_url) {
        attributes.push(opus);
    }
    attributes
}

//! Centralized constants for commonly repeated DER/OID bytes, tags and
//! Certificate Table fields. Keep this intentionally small; only broadly
//! reused literals should live here.

// === ASN.1 DER Constants ===

/// ASN.1 NULL value (tag + zero length)
pub const ASN1_NULL: &[u8] = &[0x05, 0x00];

/// ASN.1 SEQUENCE tag (constructed)
pub const ASN1_SEQUENCE_TAG: u8 = 0x30;

/// ASN.1 SET tag (constructed)
pub const ASN1_SET_TAG: u8 = 0x31;

/// ASN.1 INTEGER tag
pub const ASN1_INTEGER_TAG: u8 = 0x02;

/// ASN.1 OBJECT IDENTIFIER tag
pub const ASN1_OID_TAG: u8 = 0x06;

/// ASN.1 OCTET STRING tag
pub const ASN1_OCTET_STRING_TAG: u8 = 0x04;

/// ASN.1 BIT STRING tag
pub const ASN1_BIT_STRING_TAG: u8 = 0x03;

/// ASN.1 BMPString tag (UTF-16BE payload)
pub const ASN1_BMP_STRING_TAG: u8 = 0x1e;

/// ASN.1 IA5String tag
pub const ASN1_IA5_STRING_TAG: u8 = 0x16;

/// Context-specific [0] constructed tag
pub const ASN1_CONTEXT_0_TAG: u8 = 0xa0;

/// Context-specific [1] constructed tag
pub const ASN1_CONTEXT_1_TAG: u8 = 0xa1;

/// Context-specific [2] constructed tag
pub const ASN1_CONTEXT_2_TAG: u8 = 0xa2;

/// Context-specific [0] primitive tag (IMPLICIT string forms inside SPC)
pub const ASN1_CONTEXT_0_PRIMITIVE_TAG: u8 = 0x80;

/// DER long form length encoding: 1-byte length follows
pub const DER_LONG_FORM_1_BYTE: u8 = 0x81;

/// DER long form length encoding: 2-byte length follows
pub const DER_LONG_FORM_2_BYTE: u8 = 0x82;

/// DER long form length encoding: 3-byte length follows
pub const DER_LONG_FORM_3_BYTE: u8 = 0x83;

// === Hash Algorithm OIDs (content bytes, without tag and length) ===

/// SHA-1 algorithm OID (1.3.14.3.2.26)
pub const SHA1_ALGORITHM_OID: &[u8] = &[0x2b, 0x0e, 0x03, 0x02, 0x1a];

/// SHA-256 algorithm OID (2.16.840.1.101.3.4.2.1)
pub const SHA256_ALGORITHM_OID: &[u8] = &[0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01];

// === Signature Algorithm OIDs ===

/// sha1WithRSAEncryption (1.2.840.113549.1.1.5)
pub const SHA1_WITH_RSA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x05];

/// sha256WithRSAEncryption (1.2.840.113549.1.1.11)
pub const SHA256_WITH_RSA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b];

/// ecdsa-with-SHA1 (1.2.840.10045.4.1)
pub const ECDSA_WITH_SHA1_OID: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x01];

/// ecdsa-with-SHA256 (1.2.840.10045.4.3.2)
pub const ECDSA_WITH_SHA256_OID: &[u8] = &[0x2a, 0x86, 0x48, 0xce, 0x3d, 0x04, 0x03, 0x02];

// === PKCS#7 / PKCS#9 OIDs ===

/// id-data (1.2.840.113549.1.7.1)
pub const PKCS7_DATA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x01];

/// PKCS#7 signedData (1.2.840.113549.1.7.2)
pub const PKCS7_SIGNED_DATA_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// PKCS#9 contentType attribute (1.2.840.113549.1.9.3)
pub const PKCS9_CONTENT_TYPE_OID: &[u8] = &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x03];

/// PKCS#9 messageDigest attribute (1.2.840.113549.1.9.4)
pub const PKCS9_MESSAGE_DIGEST_OID: &[u8] =
    &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x04];

/// PKCS#9 counterSignature attribute (1.2.840.113549.1.9.6)
pub const PKCS9_COUNTER_SIGNATURE_OID: &[u8] =
    &[0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x09, 0x06];

// === Microsoft Authenticode OIDs ===

/// SPC_INDIRECT_DATA_OBJID (1.3.6.1.4.1.311.2.1.4) - Authenticode content type
pub const SPC_INDIRECT_DATA_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x04];

/// SPC_STATEMENT_TYPE_OBJID (1.3.6.1.4.1.311.2.1.11)
pub const SPC_STATEMENT_TYPE_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x0b];

/// SPC_SP_OPUS_INFO_OBJID (1.3.6.1.4.1.311.2.1.12)
pub const SPC_SP_OPUS_INFO_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x0c];

/// SPC_PE_IMAGE_DATA_OBJID (1.3.6.1.4.1.311.2.1.15)
pub const SPC_PE_IMAGE_DATA_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x0f];

/// SPC_INDIVIDUAL_SP_KEY_PURPOSE_OBJID (1.3.6.1.4.1.311.2.1.21)
pub const SPC_INDIVIDUAL_SP_KEY_PURPOSE_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x02, 0x01, 0x15];

/// SPC_TIME_STAMP_REQUEST_OBJID (1.3.6.1.4.1.311.3.2.1)
pub const SPC_TIME_STAMP_REQUEST_OID: &[u8] =
    &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x03, 0x02, 0x01];

/// SPC_RFC3161_OBJID (1.3.6.1.4.1.311.3.3.1) - RFC 3161 counter-signature attribute
pub const SPC_RFC3161_OID: &[u8] = &[0x2b, 0x06, 0x01, 0x04, 0x01, 0x82, 0x37, 0x03, 0x03, 0x01];

// === RFC 3161 Timestamp Request Constants ===

/// Version 1 INTEGER for RFC 3161 timestamp requests
pub const TS_REQ_VERSION_1: &[u8] = &[0x02, 0x01, 0x01];

/// BOOLEAN TRUE value for the certReq field
pub const CERT_REQ_TRUE: &[u8] = &[0x01, 0x01, 0xff];

// === Certificate Table entry fields ===

/// WIN_CERTIFICATE wRevision for Authenticode signatures
pub const WIN_CERT_REVISION_2_0: u16 = 0x0200;

/// WIN_CERTIFICATE wCertificateType for PKCS#7 SignedData
pub const WIN_CERT_TYPE_PKCS_SIGNED_DATA: u16 = 0x0002;

/// Alignment required for the Certificate Table and its entries
pub const CERTIFICATE_TABLE_ALIGNMENT: usize = 8;

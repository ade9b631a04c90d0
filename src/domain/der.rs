//! Minimal DER writer and reader used by the hand-assembled Authenticode
//! structures.
//!
//! The signature container deviates from vanilla CMS in enough places
//! (content type, eContent wrapping, attribute tagging) that assembling the
//! bytes directly is simpler and easier to audit than fighting a generic
//! encoder. The reader side covers just what the timestamp response parser
//! needs.

use crate::domain::constants::{
    ASN1_BIT_STRING_TAG, ASN1_BMP_STRING_TAG, ASN1_IA5_STRING_TAG, ASN1_INTEGER_TAG,
    ASN1_OCTET_STRING_TAG, ASN1_OID_TAG, ASN1_SEQUENCE_TAG, ASN1_SET_TAG, DER_LONG_FORM_1_BYTE,
    DER_LONG_FORM_2_BYTE, DER_LONG_FORM_3_BYTE,
};
use crate::infra::error::{SigningError, SigningResult};

/// Encode a DER length field (short form, or long form up to 3 bytes).
#[must_use]
pub fn encode_len(len: usize) -> Vec<u8> {
    if len < 128 {
        vec![len as u8]
    } else if len < 256 {
        vec![DER_LONG_FORM_1_BYTE, len as u8]
    } else if len < 65536 {
        vec![DER_LONG_FORM_2_BYTE, (len >> 8) as u8, (len & 0xff) as u8]
    } else {
        vec![
            DER_LONG_FORM_3_BYTE,
            ((len >> 16) & 0xff) as u8,
            ((len >> 8) & 0xff) as u8,
            (len & 0xff) as u8,
        ]
    }
}

/// Wrap content bytes in a TLV with the given tag.
#[must_use]
pub fn wrap(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + 4);
    out.push(tag);
    out.extend_from_slice(&encode_len(content.len()));
    out.extend_from_slice(content);
    out
}

#[must_use]
pub fn sequence(content: &[u8]) -> Vec<u8> {
    wrap(ASN1_SEQUENCE_TAG, content)
}

/// OBJECT IDENTIFIER from pre-encoded content bytes.
#[must_use]
pub fn oid(body: &[u8]) -> Vec<u8> {
    wrap(ASN1_OID_TAG, body)
}

#[must_use]
pub fn octet_string(content: &[u8]) -> Vec<u8> {
    wrap(ASN1_OCTET_STRING_TAG, content)
}

/// INTEGER from big-endian magnitude bytes; inserts the sign octet when the
/// high bit is set and maps an empty magnitude to zero.
#[must_use]
pub fn integer(magnitude: &[u8]) -> Vec<u8> {
    let mut bytes = magnitude.to_vec();
    if bytes.is_empty() {
        bytes.push(0);
    }
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    wrap(ASN1_INTEGER_TAG, &bytes)
}

/// BMPString (UTF-16BE), used for SPC unicode strings.
#[must_use]
pub fn bmp_string(s: &str) -> Vec<u8> {
    let mut utf16 = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        utf16.extend_from_slice(&unit.to_be_bytes());
    }
    wrap(ASN1_BMP_STRING_TAG, &utf16)
}

#[must_use]
pub fn ia5_string(s: &str) -> Vec<u8> {
    wrap(ASN1_IA5_STRING_TAG, s.as_bytes())
}

/// BIT STRING with no content bits (zero unused-bit octet only).
#[must_use]
pub fn empty_bit_string() -> Vec<u8> {
    vec![ASN1_BIT_STRING_TAG, 0x01, 0x00]
}

/// SET OF with canonical DER ordering: elements sorted by their encoding.
#[must_use]
pub fn set_of(mut elements: Vec<Vec<u8>>) -> Vec<u8> {
    elements.sort();
    let mut content = Vec::new();
    for element in &elements {
        content.extend_from_slice(element);
    }
    wrap(ASN1_SET_TAG, &content)
}

/// A decoded TLV at the start of a buffer.
#[derive(Debug, Clone, Copy)]
pub struct Tlv<'a> {
    pub tag: u8,
    pub header_len: usize,
    pub content: &'a [u8],
}

impl Tlv<'_> {
    /// Total encoded length (header + content).
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.header_len + self.content.len()
    }
}

/// Read the TLV at the start of `data`.
pub fn read_tlv(data: &[u8]) -> SigningResult<Tlv<'_>> {
    if data.len() < 2 {
        return Err(SigningError::Asn1Error("truncated TLV header".into()));
    }
    let tag = data[0];
    let (len, header_len) = match data[1] {
        short if short & 0x80 == 0 => (short as usize, 2),
        DER_LONG_FORM_1_BYTE => {
            if data.len() < 3 {
                return Err(SigningError::Asn1Error("truncated length field".into()));
            }
            (data[2] as usize, 3)
        }
        DER_LONG_FORM_2_BYTE => {
            if data.len() < 4 {
                return Err(SigningError::Asn1Error("truncated length field".into()));
            }
            (((data[2] as usize) << 8) | data[3] as usize, 4)
        }
        DER_LONG_FORM_3_BYTE => {
            if data.len() < 5 {
                return Err(SigningError::Asn1Error("truncated length field".into()));
            }
            (
                ((data[2] as usize) << 16) | ((data[3] as usize) << 8) | data[4] as usize,
                5,
            )
        }
        other => {
            return Err(SigningError::Asn1Error(format!(
                "unsupported length encoding 0x{other:02x}"
            )))
        }
    };
    if header_len + len > data.len() {
        return Err(SigningError::Asn1Error(
            "TLV length exceeds available bytes".into(),
        ));
    }
    Ok(Tlv {
        tag,
        header_len,
        content: &data[header_len..header_len + len],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_encoding_forms() {
        assert_eq!(encode_len(0), vec![0x00]);
        assert_eq!(encode_len(127), vec![0x7f]);
        assert_eq!(encode_len(128), vec![0x81, 0x80]);
        assert_eq!(encode_len(255), vec![0x81, 0xff]);
        assert_eq!(encode_len(256), vec![0x82, 0x01, 0x00]);
        assert_eq!(encode_len(65535), vec![0x82, 0xff, 0xff]);
        assert_eq!(encode_len(65536), vec![0x83, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn integer_sign_handling() {
        assert_eq!(integer(&[]), vec![0x02, 0x01, 0x00]);
        assert_eq!(integer(&[0x7f]), vec![0x02, 0x01, 0x7f]);
        assert_eq!(integer(&[0x80]), vec![0x02, 0x02, 0x00, 0x80]);
    }

    #[test]
    fn bmp_string_is_utf16be() {
        assert_eq!(bmp_string("A"), vec![0x1e, 0x02, 0x00, 0x41]);
    }

    #[test]
    fn set_of_sorts_elements_by_encoding() {
        let a = vec![0x30, 0x03, 0x02, 0x01, 0x02];
        let b = vec![0x30, 0x03, 0x02, 0x01, 0x01];
        let set = set_of(vec![a.clone(), b.clone()]);
        let mut expected = vec![0x31, 0x0a];
        expected.extend_from_slice(&b);
        expected.extend_from_slice(&a);
        assert_eq!(set, expected);
    }

    #[test]
    fn tlv_roundtrip() {
        let payload = vec![0xaa; 300];
        let encoded = octet_string(&payload);
        let tlv = read_tlv(&encoded).expect("parse");
        assert_eq!(tlv.tag, 0x04);
        assert_eq!(tlv.content, payload.as_slice());
        assert_eq!(tlv.total_len(), encoded.len());
    }

    #[test]
    fn tlv_rejects_overlong_length() {
        let result = read_tlv(&[0x30, 0x05, 0x01]);
        assert!(result.is_err());
    }
}

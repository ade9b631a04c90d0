//! CMS `SignedData` generation for Authenticode.
//!
//! The produced structure deviates from vanilla CMS in the ways Authenticode
//! requires: `encapContentInfo.contentType` is `SPC_INDIRECT_DATA_OBJID`,
//! the eContent is the raw `SpcIndirectDataContent` DER under `[0] EXPLICIT`
//! (no OCTET STRING wrapper), and the certificate set is the caller's chain
//! with the root removed unless the chain is a single self-signed entry.
//!
//! The generator returns a [`CmsSignature`] that keeps the individual
//! components, so a timestamper can attach its counter-signature as an
//! unsigned attribute and re-encode without disturbing the signed bytes.

use openssl::pkey::{Id, PKey, PKeyRef, Private};
use openssl::sign::Signer;
use openssl::x509::X509;

use crate::domain::constants::{
    ASN1_CONTEXT_0_TAG, ASN1_CONTEXT_1_TAG, ASN1_NULL, ASN1_SET_TAG, ECDSA_WITH_SHA1_OID,
    ECDSA_WITH_SHA256_OID, PKCS7_SIGNED_DATA_OID, PKCS9_CONTENT_TYPE_OID,
    PKCS9_MESSAGE_DIGEST_OID, SHA1_WITH_RSA_OID, SHA256_WITH_RSA_OID, SPC_INDIRECT_DATA_OID,
};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::der;
use crate::domain::spc::Attribute;
use crate::infra::error::{SigningError, SigningResult};

/// An attribute destined for the unsignedAttrs slot of the single signer.
#[derive(Debug, Clone)]
pub struct UnsignedAttribute {
    oid: Vec<u8>,
    value: Vec<u8>,
}

impl UnsignedAttribute {
    #[must_use]
    pub fn new(oid: &[u8], value: Vec<u8>) -> Self {
        UnsignedAttribute {
            oid: oid.to_vec(),
            value,
        }
    }

    #[must_use]
    pub fn oid(&self) -> &[u8] {
        &self.oid
    }

    fn to_der(&self) -> Vec<u8> {
        Attribute::new(&self.oid, self.value.clone()).to_der()
    }
}

/// A generated Authenticode signature, kept in component form.
#[derive(Debug, Clone)]
pub struct CmsSignature {
    algorithm: HashAlgorithm,
    content: Vec<u8>,
    digest_algorithm_der: Vec<u8>,
    issuer_and_serial: Vec<u8>,
    signed_attrs: Vec<Vec<u8>>,
    signature_algorithm_der: Vec<u8>,
    signature: Vec<u8>,
    certificates: Vec<Vec<u8>>,
    counter_signature: Option<UnsignedAttribute>,
}

impl CmsSignature {
    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// The signer's encrypted digest (the `SignerInfo.signature` octets);
    /// this is what timestamp authorities counter-sign.
    #[must_use]
    pub fn encrypted_digest(&self) -> &[u8] {
        &self.signature
    }

    #[must_use]
    pub fn counter_signature(&self) -> Option<&UnsignedAttribute> {
        self.counter_signature.as_ref()
    }

    /// A copy of this signature with the counter-signature attached as the
    /// single unsigned attribute. The signed portion is untouched.
    #[must_use]
    pub fn with_counter_signature(&self, attribute: UnsignedAttribute) -> Self {
        let mut copy = self.clone();
        copy.counter_signature = Some(attribute);
        copy
    }

    /// Encode the complete `ContentInfo { signedData }` DER.
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        // SignerInfo
        let mut signer_info = Vec::new();
        signer_info.extend_from_slice(&der::integer(&[1])); // version: issuerAndSerialNumber
        signer_info.extend_from_slice(&self.issuer_and_serial);
        signer_info.extend_from_slice(&self.digest_algorithm_der);
        // signedAttrs [0] IMPLICIT: the attributes keep their SET OF ordering
        let mut attrs_concat = Vec::new();
        for attr in &self.signed_attrs {
            attrs_concat.extend_from_slice(attr);
        }
        signer_info.extend_from_slice(&der::wrap(ASN1_CONTEXT_0_TAG, &attrs_concat));
        signer_info.extend_from_slice(&self.signature_algorithm_der);
        signer_info.extend_from_slice(&der::octet_string(&self.signature));
        if let Some(counter) = &self.counter_signature {
            signer_info.extend_from_slice(&der::wrap(ASN1_CONTEXT_1_TAG, &counter.to_der()));
        }
        let signer_infos = der::wrap(
            ASN1_SET_TAG,
            &der::sequence(&signer_info),
        );

        // SignedData
        let mut signed_data = Vec::new();
        signed_data.extend_from_slice(&der::integer(&[1])); // version per CMS for issuerAndSerial
        signed_data.extend_from_slice(&der::wrap(
            ASN1_SET_TAG,
            &self.digest_algorithm_der,
        ));
        // encapContentInfo: SPC content type, eContent [0] EXPLICIT raw DER
        let mut encap = der::oid(SPC_INDIRECT_DATA_OID);
        encap.extend_from_slice(&der::wrap(ASN1_CONTEXT_0_TAG, &self.content));
        signed_data.extend_from_slice(&der::sequence(&encap));
        // certificates [0] IMPLICIT: concatenated Certificate DERs
        let mut certs_concat = Vec::new();
        for cert in &self.certificates {
            certs_concat.extend_from_slice(cert);
        }
        signed_data.extend_from_slice(&der::wrap(ASN1_CONTEXT_0_TAG, &certs_concat));
        signed_data.extend_from_slice(&signer_infos);

        // Outer ContentInfo
        let mut content_info = der::oid(PKCS7_SIGNED_DATA_OID);
        content_info.extend_from_slice(&der::wrap(
            ASN1_CONTEXT_0_TAG,
            &der::sequence(&signed_data),
        ));
        der::sequence(&content_info)
    }
}

/// Builds the Authenticode `SignedData` for a content blob.
pub struct SignedDataGenerator<'a> {
    chain: &'a [X509],
    private_key: &'a PKeyRef<Private>,
    algorithm: HashAlgorithm,
}

impl<'a> SignedDataGenerator<'a> {
    #[must_use]
    pub fn new(
        chain: &'a [X509],
        private_key: &'a PKeyRef<Private>,
        algorithm: HashAlgorithm,
    ) -> Self {
        SignedDataGenerator {
            chain,
            private_key,
            algorithm,
        }
    }

    /// Sign `content` (the `SpcIndirectDataContent` DER) with the configured
    /// key, producing the one-signer `SignedData`. `extra_attributes` are the
    /// Authenticode attributes; `contentType` and `messageDigest` are added
    /// here.
    pub fn generate(
        &self,
        content: &[u8],
        extra_attributes: Vec<Attribute>,
    ) -> SigningResult<CmsSignature> {
        let leaf = self.chain.first().ok_or_else(|| {
            SigningError::CertificateError("certificate chain is empty".into())
        })?;

        // authenticated attributes: contentType, messageDigest, then the
        // Authenticode extras; canonical SET OF order is by encoding
        let content_digest = self.algorithm.digest(content);
        let mut attribute_ders = vec![
            Attribute::new(PKCS9_CONTENT_TYPE_OID, der::oid(SPC_INDIRECT_DATA_OID)).to_der(),
            Attribute::new(PKCS9_MESSAGE_DIGEST_OID, der::octet_string(&content_digest)).to_der(),
        ];
        for attribute in &extra_attributes {
            attribute_ders.push(attribute.to_der());
        }
        attribute_ders.sort();

        // the signature covers the explicit SET OF encoding, per CMS
        let mut to_be_signed = Vec::new();
        for attr in &attribute_ders {
            to_be_signed.extend_from_slice(attr);
        }
        let to_be_signed = der::wrap(ASN1_SET_TAG, &to_be_signed);

        let mut signer = Signer::new(self.algorithm.message_digest(), self.private_key)
            .map_err(|e| SigningError::SignatureError(format!("signer setup failed: {e}")))?;
        signer
            .update(&to_be_signed)
            .map_err(|e| SigningError::SignatureError(format!("digest update failed: {e}")))?;
        let signature = signer
            .sign_to_vec()
            .map_err(|e| SigningError::SignatureError(format!("signing failed: {e}")))?;

        let mut digest_algorithm = der::oid(self.algorithm.oid_der());
        digest_algorithm.extend_from_slice(ASN1_NULL);
        let digest_algorithm_der = der::sequence(&digest_algorithm);

        Ok(CmsSignature {
            algorithm: self.algorithm,
            content: content.to_vec(),
            digest_algorithm_der,
            issuer_and_serial: issuer_and_serial(leaf)?,
            signed_attrs: attribute_ders,
            signature_algorithm_der: self.signature_algorithm()?,
            signature,
            certificates: trim_chain(self.chain)?,
            counter_signature: None,
        })
    }

    /// `<hash>with<key-algorithm>` identifier for the signer's key. RSA
    /// variants carry a NULL parameter; ECDSA ones omit parameters.
    fn signature_algorithm(&self) -> SigningResult<Vec<u8>> {
        let (oid, null_param): (&[u8], bool) = match (self.private_key.id(), self.algorithm) {
            (Id::RSA, HashAlgorithm::Sha1) => (SHA1_WITH_RSA_OID, true),
            (Id::RSA, HashAlgorithm::Sha256) => (SHA256_WITH_RSA_OID, true),
            (Id::EC, HashAlgorithm::Sha1) => (ECDSA_WITH_SHA1_OID, false),
            (Id::EC, HashAlgorithm::Sha256) => (ECDSA_WITH_SHA256_OID, false),
            (other, _) => {
                return Err(SigningError::SignatureError(format!(
                    "unsupported key algorithm: {other:?}"
                )))
            }
        };
        let mut body = der::oid(oid);
        if null_param {
            body.extend_from_slice(ASN1_NULL);
        }
        Ok(der::sequence(&body))
    }
}

/// `IssuerAndSerialNumber` of the leaf certificate.
fn issuer_and_serial(leaf: &X509) -> SigningResult<Vec<u8>> {
    let issuer = leaf
        .issuer_name()
        .to_der()
        .map_err(|e| SigningError::CertificateError(format!("issuer encoding failed: {e}")))?;
    let serial = leaf
        .serial_number()
        .to_bn()
        .map(|bn| bn.to_vec())
        .map_err(|e| SigningError::CertificateError(format!("serial extraction failed: {e}")))?;
    let mut body = issuer;
    body.extend_from_slice(&der::integer(&serial));
    Ok(der::sequence(&body))
}

/// The certificate set to embed: the chain minus its root, unless the chain
/// is a single (self-signed) certificate. "Root" is structural:
/// Subject == Issuer, without verifying the self-signature.
fn trim_chain(chain: &[X509]) -> SigningResult<Vec<Vec<u8>>> {
    let mut certificates = Vec::with_capacity(chain.len());
    if chain.len() == 1 {
        certificates.push(cert_der(&chain[0])?);
        return Ok(certificates);
    }
    for cert in chain {
        if !is_self_signed(cert)? {
            certificates.push(cert_der(cert)?);
        }
    }
    Ok(certificates)
}

fn cert_der(cert: &X509) -> SigningResult<Vec<u8>> {
    cert.to_der()
        .map_err(|e| SigningError::CertificateError(format!("certificate encoding failed: {e}")))
}

fn is_self_signed(cert: &X509) -> SigningResult<bool> {
    let subject = cert
        .subject_name()
        .to_der()
        .map_err(|e| SigningError::CertificateError(format!("subject encoding failed: {e}")))?;
    let issuer = cert
        .issuer_name()
        .to_der()
        .map_err(|e| SigningError::CertificateError(format!("issuer encoding failed: {e}")))?;
    Ok(subject == issuer)
}

//! Counter-signature acquisition from timestamp authorities.
//!
//! Two interchangeable strategies share one contract: take the primary
//! signature, obtain a server-issued counter-signature over the signer's
//! encrypted digest, and return the signature with that token attached as an
//! unsigned attribute.
//!
//! * [`AuthenticodeTimestamper`] speaks the legacy protocol: a base64-encoded
//!   `TimeStampRequest` POSTed as `application/octet-stream`, answered with a
//!   base64 PKCS#7 `SignedData`.
//! * [`Rfc3161Timestamper`] speaks RFC 3161: a DER `TimeStampReq` POSTed as
//!   `application/timestamp-query`, answered with a `TimeStampResp`.
//!
//! HTTP goes through the narrow [`TimestampTransport`] seam so tests can
//! substitute a canned server. Transient transport failures are retried a
//! bounded number of times with exponential backoff; any non-2xx status or
//! structural defect in the response is fatal.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use rand::RngCore;

use crate::domain::constants::{
    ASN1_CONTEXT_0_TAG, ASN1_INTEGER_TAG, ASN1_NULL, ASN1_SEQUENCE_TAG, CERT_REQ_TRUE,
    PKCS7_DATA_OID, PKCS7_SIGNED_DATA_OID, PKCS9_COUNTER_SIGNATURE_OID, SPC_RFC3161_OID,
    SPC_TIME_STAMP_REQUEST_OID, TS_REQ_VERSION_1,
};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::der;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signed_data::{CmsSignature, UnsignedAttribute};

/// Attempts per request before giving up on the server.
const RETRY_ATTEMPTS: usize = 3;

/// Initial backoff delay; doubled after each failed attempt.
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from a timestamp server exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The request/response capability consumed by the timestampers.
pub trait TimestampTransport {
    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> SigningResult<TransportResponse>;
}

/// Default transport: a blocking HTTP client with a per-request timeout.
/// Sockets are scoped to a single exchange.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> SigningResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("authenticode-signer/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SigningError::NetworkError(format!("HTTP client setup failed: {e}")))?;
        Ok(HttpTransport { client })
    }
}

impl TimestampTransport for HttpTransport {
    fn post(&self, url: &str, content_type: &str, body: &[u8]) -> SigningResult<TransportResponse> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()?;
        let status = response.status().as_u16();
        let body = response.bytes()?.to_vec();
        Ok(TransportResponse { status, body })
    }
}

/// Common contract of the two timestamping strategies.
pub trait Timestamper {
    /// Counter-sign `primary` and return it with the token attached as an
    /// unsigned attribute of its single signer.
    fn timestamp(
        &self,
        algorithm: HashAlgorithm,
        primary: &CmsSignature,
    ) -> SigningResult<CmsSignature>;
}

fn post_with_retries(
    transport: &dyn TimestampTransport,
    url: &str,
    content_type: &str,
    body: &[u8],
) -> SigningResult<TransportResponse> {
    let mut delay = INITIAL_RETRY_DELAY;
    let mut last_error = None;
    for attempt in 1..=RETRY_ATTEMPTS {
        match transport.post(url, content_type, body) {
            Ok(response) if (200..300).contains(&response.status) => return Ok(response),
            Ok(response) => {
                return Err(SigningError::TimestampError(format!(
                    "timestamp server {url} returned HTTP {}",
                    response.status
                )))
            }
            Err(e) => {
                log::warn!("timestamp request to {url} failed (attempt {attempt}/{RETRY_ATTEMPTS}): {e}");
                last_error = Some(e);
                if attempt < RETRY_ATTEMPTS {
                    std::thread::sleep(delay);
                    delay *= 2;
                }
            }
        }
    }
    Err(last_error.unwrap_or_else(|| {
        SigningError::TimestampError("timestamp request failed without a response".into())
    }))
}

/// Require a DER blob shaped like `ContentInfo { signedData, ... }`.
fn check_pkcs7_shape(blob: &[u8], what: &str) -> SigningResult<()> {
    let outer = der::read_tlv(blob)
        .map_err(|_| SigningError::TimestampError(format!("{what} is not valid DER")))?;
    if outer.tag != ASN1_SEQUENCE_TAG || outer.total_len() != blob.len() {
        return Err(SigningError::TimestampError(format!(
            "{what} is not a single DER SEQUENCE"
        )));
    }
    let oid_tlv = der::read_tlv(outer.content)
        .map_err(|_| SigningError::TimestampError(format!("{what} has no content type")))?;
    if oid_tlv.content != PKCS7_SIGNED_DATA_OID {
        return Err(SigningError::TimestampError(format!(
            "{what} is not a PKCS#7 SignedData"
        )));
    }
    Ok(())
}

/// Legacy Authenticode timestamper.
pub struct AuthenticodeTimestamper {
    url: String,
    transport: Arc<dyn TimestampTransport>,
}

impl AuthenticodeTimestamper {
    pub const DEFAULT_URL: &'static str = "http://timestamp.comodoca.com/authenticode";

    pub fn new() -> SigningResult<Self> {
        Ok(Self::with_transport(
            Self::DEFAULT_URL,
            Arc::new(HttpTransport::new()?),
        ))
    }

    #[must_use]
    pub fn with_transport(url: impl Into<String>, transport: Arc<dyn TimestampTransport>) -> Self {
        AuthenticodeTimestamper {
            url: url.into(),
            transport,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `TimeStampRequest ::= SEQUENCE { countersignatureType OID, content
    /// ContentInfo { id-data, [0] OCTET STRING encryptedDigest } }`
    fn build_request(encrypted_digest: &[u8]) -> Vec<u8> {
        let mut content = der::oid(PKCS7_DATA_OID);
        content.extend_from_slice(&der::wrap(
            ASN1_CONTEXT_0_TAG,
            &der::octet_string(encrypted_digest),
        ));
        let mut request = der::oid(SPC_TIME_STAMP_REQUEST_OID);
        request.extend_from_slice(&der::sequence(&content));
        der::sequence(&request)
    }
}

impl Timestamper for AuthenticodeTimestamper {
    fn timestamp(
        &self,
        _algorithm: HashAlgorithm,
        primary: &CmsSignature,
    ) -> SigningResult<CmsSignature> {
        log::info!("requesting Authenticode timestamp from {}", self.url);
        let request = Self::build_request(primary.encrypted_digest());
        let body = base64::engine::general_purpose::STANDARD.encode(&request);

        let response = post_with_retries(
            self.transport.as_ref(),
            &self.url,
            "application/octet-stream",
            body.as_bytes(),
        )?;

        let text: String = String::from_utf8_lossy(&response.body)
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        let token = base64::engine::general_purpose::STANDARD
            .decode(&text)
            .map_err(|e| {
                SigningError::TimestampError(format!("response is not valid base64: {e}"))
            })?;
        check_pkcs7_shape(&token, "timestamp response")?;

        log::debug!("received Authenticode timestamp token ({} bytes)", token.len());
        Ok(primary.with_counter_signature(UnsignedAttribute::new(
            PKCS9_COUNTER_SIGNATURE_OID,
            token,
        )))
    }
}

/// RFC 3161 timestamper.
pub struct Rfc3161Timestamper {
    url: String,
    transport: Arc<dyn TimestampTransport>,
}

impl Rfc3161Timestamper {
    pub const DEFAULT_URL: &'static str = "http://timestamp.comodoca.com/rfc3161";

    pub fn new() -> SigningResult<Self> {
        Ok(Self::with_transport(
            Self::DEFAULT_URL,
            Arc::new(HttpTransport::new()?),
        ))
    }

    #[must_use]
    pub fn with_transport(url: impl Into<String>, transport: Arc<dyn TimestampTransport>) -> Self {
        Rfc3161Timestamper {
            url: url.into(),
            transport,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// `TimeStampReq ::= SEQUENCE { version 1, messageImprint, nonce,
    /// certReq TRUE }` with the imprint over the hash of the encrypted
    /// digest.
    fn build_request(algorithm: HashAlgorithm, imprint: &[u8]) -> Vec<u8> {
        let mut identifier = der::oid(algorithm.timestamp_oid_der());
        identifier.extend_from_slice(ASN1_NULL);
        let mut message_imprint = der::sequence(&identifier);
        message_imprint.extend_from_slice(&der::octet_string(imprint));

        let mut nonce = [0u8; 8];
        rand::rng().fill_bytes(&mut nonce);
        let mut nonce_der = vec![ASN1_INTEGER_TAG, 0x09, 0x00];
        nonce_der.extend_from_slice(&nonce);

        let mut body = Vec::new();
        body.extend_from_slice(TS_REQ_VERSION_1);
        body.extend_from_slice(&der::sequence(&message_imprint));
        body.extend_from_slice(&nonce_der);
        body.extend_from_slice(CERT_REQ_TRUE);
        der::sequence(&body)
    }

    /// Extract the `TimeStampToken` from a `TimeStampResp`, requiring a
    /// granted status (0 or 1).
    fn extract_token(response: &[u8]) -> SigningResult<Vec<u8>> {
        let outer = der::read_tlv(response)
            .map_err(|_| SigningError::TimestampError("response is not valid DER".into()))?;
        if outer.tag != ASN1_SEQUENCE_TAG {
            return Err(SigningError::TimestampError(
                "response is not a TimeStampResp".into(),
            ));
        }
        let status_info = der::read_tlv(outer.content).map_err(|_| {
            SigningError::TimestampError("response lacks a PKIStatusInfo".into())
        })?;
        if status_info.tag != ASN1_SEQUENCE_TAG {
            return Err(SigningError::TimestampError(
                "malformed PKIStatusInfo".into(),
            ));
        }
        let status_tlv = der::read_tlv(status_info.content).map_err(|_| {
            SigningError::TimestampError("malformed PKIStatusInfo status".into())
        })?;
        if status_tlv.tag != ASN1_INTEGER_TAG || status_tlv.content.len() > 8 {
            return Err(SigningError::TimestampError(
                "malformed PKIStatusInfo status".into(),
            ));
        }
        let status = status_tlv
            .content
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b));
        if status > 1 {
            return Err(SigningError::TimestampError(format!(
                "timestamp request rejected with status {status}"
            )));
        }

        let rest = &outer.content[status_info.total_len()..];
        if rest.is_empty() {
            return Err(SigningError::TimestampError(
                "granted response carries no timestamp token".into(),
            ));
        }
        let token = der::read_tlv(rest)
            .map_err(|_| SigningError::TimestampError("malformed timestamp token".into()))?;
        let token_bytes = rest[..token.total_len()].to_vec();
        check_pkcs7_shape(&token_bytes, "timestamp token")?;
        Ok(token_bytes)
    }
}

impl Timestamper for Rfc3161Timestamper {
    fn timestamp(
        &self,
        algorithm: HashAlgorithm,
        primary: &CmsSignature,
    ) -> SigningResult<CmsSignature> {
        log::info!("requesting RFC 3161 timestamp from {}", self.url);
        let imprint = algorithm.digest(primary.encrypted_digest());
        let request = Self::build_request(algorithm, &imprint);

        let response = post_with_retries(
            self.transport.as_ref(),
            &self.url,
            "application/timestamp-query",
            &request,
        )?;

        let token = Self::extract_token(&response.body)?;
        log::debug!("received RFC 3161 timestamp token ({} bytes)", token.len());
        Ok(primary.with_counter_signature(UnsignedAttribute::new(SPC_RFC3161_OID, token)))
    }
}

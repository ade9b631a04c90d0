//! End-to-end signing against stubbed timestamp servers: attribute OIDs,
//! wire formats and failure handling.

mod common;

use std::sync::Arc;

use base64::Engine;

use authenticode_signer::domain::{constants, der};
use authenticode_signer::{PeSigner, SigningError, TransportResponse};

use common::{count_occurrences, minimal_pe, self_signed_rsa, StubTransport};

/// Minimal blob shaped like `ContentInfo { signedData, [0] { ... } }`.
fn canned_pkcs7() -> Vec<u8> {
    let mut body = der::oid(constants::PKCS7_SIGNED_DATA_OID);
    body.extend_from_slice(&der::wrap(0xa0, &der::sequence(&der::integer(&[1]))));
    der::sequence(&body)
}

fn canned_time_stamp_resp() -> Vec<u8> {
    let mut body = der::sequence(&der::integer(&[0]));
    body.extend_from_slice(&canned_pkcs7());
    der::sequence(&body)
}

fn fixture(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("app.exe");
    std::fs::write(&path, minimal_pe(true, 4096)).expect("write fixture");
    path
}

#[test]
fn authenticode_timestamp_adds_counter_signature_attribute() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    let reply = base64::engine::general_purpose::STANDARD
        .encode(canned_pkcs7())
        .into_bytes();
    let transport = Arc::new(StubTransport::replying(200, reply));

    PeSigner::new(chain, key)
        .unwrap()
        .with_timestamp_authority("http://tsa.test/authenticode")
        .with_timestamp_transport(transport.clone())
        .sign(&path)
        .expect("sign");

    // request shape
    {
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 1);
        let (url, content_type, body) = &requests[0];
        assert_eq!(url, "http://tsa.test/authenticode");
        assert_eq!(content_type, "application/octet-stream");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(body)
            .expect("request body is base64");
        let request_oid = der::oid(constants::SPC_TIME_STAMP_REQUEST_OID);
        assert!(decoded.windows(request_oid.len()).any(|w| w == request_oid));
    }

    // exactly one counterSignature attribute, no RFC 3161 attribute
    let signed = std::fs::read(&path).unwrap();
    let counter_oid = der::oid(constants::PKCS9_COUNTER_SIGNATURE_OID);
    assert_eq!(count_occurrences(&signed, &counter_oid), 1);
    let rfc3161_oid = der::oid(constants::SPC_RFC3161_OID);
    assert_eq!(count_occurrences(&signed, &rfc3161_oid), 0);
}

#[test]
fn rfc3161_timestamp_adds_spc_rfc3161_attribute() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    let transport = Arc::new(StubTransport::replying(200, canned_time_stamp_resp()));

    PeSigner::new(chain, key)
        .unwrap()
        .with_timestamping_protocol(true)
        .with_timestamp_authority("http://tsa.test/rfc3161")
        .with_timestamp_transport(transport.clone())
        .sign(&path)
        .expect("sign");

    {
        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 1);
        let (url, content_type, body) = &requests[0];
        assert_eq!(url, "http://tsa.test/rfc3161");
        assert_eq!(content_type, "application/timestamp-query");
        // DER TimeStampReq: version 1 and certReq TRUE present
        assert!(body.windows(3).any(|w| w == constants::TS_REQ_VERSION_1));
        assert!(body.windows(3).any(|w| w == constants::CERT_REQ_TRUE));
    }

    let signed = std::fs::read(&path).unwrap();
    let rfc3161_oid = der::oid(constants::SPC_RFC3161_OID);
    assert_eq!(count_occurrences(&signed, &rfc3161_oid), 1);
    let counter_oid = der::oid(constants::PKCS9_COUNTER_SIGNATURE_OID);
    assert_eq!(count_occurrences(&signed, &counter_oid), 0);
}

#[test]
fn timestamping_disabled_produces_no_unsigned_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    PeSigner::new(chain, key)
        .unwrap()
        .with_timestamping(false)
        .sign(&path)
        .expect("sign");

    let signed = std::fs::read(&path).unwrap();
    assert_eq!(
        count_occurrences(&signed, &der::oid(constants::PKCS9_COUNTER_SIGNATURE_OID)),
        0
    );
    assert_eq!(
        count_occurrences(&signed, &der::oid(constants::SPC_RFC3161_OID)),
        0
    );
}

#[test]
fn http_error_from_timestamp_server_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let before = std::fs::read(&path).unwrap();
    let (chain, key) = self_signed_rsa();

    let transport = Arc::new(StubTransport::replying(503, b"unavailable".to_vec()));
    let result = PeSigner::new(chain, key)
        .unwrap()
        .with_timestamp_transport(transport)
        .sign(&path);

    assert!(matches!(result, Err(SigningError::TimestampError(_))));
    assert_eq!(std::fs::read(&path).unwrap(), before, "file must be untouched");
}

#[test]
fn malformed_timestamp_response_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    // valid base64, but not a PKCS#7 structure
    let reply = base64::engine::general_purpose::STANDARD
        .encode([0x04u8, 0x02, 0xab, 0xcd])
        .into_bytes();
    let transport = Arc::new(StubTransport::replying(200, reply));

    let result = PeSigner::new(chain, key)
        .unwrap()
        .with_timestamp_transport(transport)
        .sign(&path);
    assert!(matches!(result, Err(SigningError::TimestampError(_))));
}

#[test]
fn rejected_rfc3161_status_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    // PKIStatusInfo status 2 (rejection), no token
    let reply = der::sequence(&der::sequence(&der::integer(&[2])));
    let transport = Arc::new(StubTransport::replying(200, reply));

    let result = PeSigner::new(chain, key)
        .unwrap()
        .with_timestamping_protocol(true)
        .with_timestamp_transport(transport)
        .sign(&path);
    assert!(matches!(result, Err(SigningError::TimestampError(_))));
}

#[test]
fn transient_network_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = fixture(&dir);
    let (chain, key) = self_signed_rsa();

    let reply = base64::engine::general_purpose::STANDARD
        .encode(canned_pkcs7())
        .into_bytes();
    let transport = Arc::new(StubTransport::new(vec![
        Err(SigningError::NetworkError("connection refused".into())),
        Ok(TransportResponse {
            status: 200,
            body: reply,
        }),
    ]));

    PeSigner::new(chain, key)
        .unwrap()
        .with_timestamp_transport(transport.clone())
        .sign(&path)
        .expect("second attempt succeeds");
    assert_eq!(transport.requests.borrow().len(), 2);
}

//! Error types and result alias for signing operations.

use thiserror::Error;

/// Result type for signing operations
pub type SigningResult<T> = Result<T, SigningError>;

/// Error taxonomy for the signing pipeline
#[derive(Error, Debug)]
pub enum SigningError {
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    #[error("PE file parsing error: {0}")]
    PeParsingError(String),

    #[error("certificate error: {0}")]
    CertificateError(String),

    #[error("signature creation error: {0}")]
    SignatureError(String),

    #[error("ASN.1 encoding/decoding error: {0}")]
    Asn1Error(String),

    #[error("timestamp error: {0}")]
    TimestampError(String),

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for SigningError {
    fn from(error: std::io::Error) -> Self {
        SigningError::IoError(error.to_string())
    }
}

impl From<openssl::error::ErrorStack> for SigningError {
    fn from(error: openssl::error::ErrorStack) -> Self {
        SigningError::SignatureError(error.to_string())
    }
}

impl From<reqwest::Error> for SigningError {
    fn from(error: reqwest::Error) -> Self {
        SigningError::NetworkError(error.to_string())
    }
}

//! Signing facade: configuration and orchestration of the full pipeline.
//!
//! A [`PeSigner`] owns the certificate chain and private key, carries the
//! optional program metadata and timestamping policy, and drives the
//! container through pad → digest → signature → timestamp → write-back.
//! Timestamping is enabled by default and uses the legacy Authenticode
//! protocol unless RFC 3161 is selected.

use std::path::Path;
use std::sync::Arc;

use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use crate::domain::constants::{
    CERTIFICATE_TABLE_ALIGNMENT, WIN_CERT_REVISION_2_0, WIN_CERT_TYPE_PKCS_SIGNED_DATA,
};
use crate::domain::crypto::HashAlgorithm;
use crate::domain::pe::{DataDirectory, PeFile};
use crate::domain::spc;
use crate::infra::error::{SigningError, SigningResult};
use crate::services::signed_data::{CmsSignature, SignedDataGenerator};
use crate::services::timestamp::{
    AuthenticodeTimestamper, Rfc3161Timestamper, Timestamper, TimestampTransport,
};

/// Signs PE files under a fixed configuration.
pub struct PeSigner {
    chain: Vec<X509>,
    private_key: PKey<Private>,
    algorithm: HashAlgorithm,
    program_name: Option<String>,
    program_url: Option<String>,
    timestamping: bool,
    use_rfc3161: bool,
    timestamp_url: Option<String>,
    transport: Option<Arc<dyn TimestampTransport>>,
}

impl PeSigner {
    /// Create a signer for a chain (leaf first) and its private key.
    ///
    /// Fails when the chain is empty or the key does not match the leaf
    /// certificate's public key; nothing is touched on disk in either case.
    pub fn new(chain: Vec<X509>, private_key: PKey<Private>) -> SigningResult<Self> {
        if chain.is_empty() {
            return Err(SigningError::ConfigurationError(
                "certificate chain is empty".into(),
            ));
        }
        let leaf_public = chain[0].public_key().map_err(|e| {
            SigningError::CertificateError(format!("leaf public key unavailable: {e}"))
        })?;
        if !private_key.public_eq(&leaf_public) {
            return Err(SigningError::ConfigurationError(
                "private key does not match the leaf certificate".into(),
            ));
        }
        Ok(PeSigner {
            chain,
            private_key,
            algorithm: HashAlgorithm::default(),
            program_name: None,
            program_url: None,
            timestamping: true,
            use_rfc3161: false,
            timestamp_url: None,
            transport: None,
        })
    }

    /// Set the program name embedded in the signature.
    #[must_use]
    pub fn with_program_name(mut self, name: impl Into<String>) -> Self {
        self.program_name = Some(name.into());
        self
    }

    /// Set the program URL embedded in the signature.
    #[must_use]
    pub fn with_program_url(mut self, url: impl Into<String>) -> Self {
        self.program_url = Some(url.into());
        self
    }

    /// Enable or disable timestamping (enabled by default).
    #[must_use]
    pub fn with_timestamping(mut self, timestamping: bool) -> Self {
        self.timestamping = timestamping;
        self
    }

    /// Select RFC 3161 or the legacy Authenticode protocol (the default).
    #[must_use]
    pub fn with_timestamping_protocol(mut self, use_rfc3161: bool) -> Self {
        self.use_rfc3161 = use_rfc3161;
        self
    }

    /// Override the timestamp authority URL.
    #[must_use]
    pub fn with_timestamp_authority(mut self, url: impl Into<String>) -> Self {
        self.timestamp_url = Some(url.into());
        self
    }

    /// Replace the HTTP transport used for timestamp requests. Intended for
    /// stub servers in tests and for callers that manage their own HTTP
    /// stack.
    #[must_use]
    pub fn with_timestamp_transport(mut self, transport: Arc<dyn TimestampTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Select the digest algorithm by name (`SHA-1` or `SHA-256`).
    ///
    /// Unknown names are rejected; the silent fallback of the historical
    /// implementation is not reproduced.
    pub fn with_hash_algorithm(mut self, name: &str) -> SigningResult<Self> {
        match HashAlgorithm::from_name(name) {
            Some(algorithm) => {
                if algorithm == HashAlgorithm::Sha1 {
                    log::warn!("SHA-1 selected; modern Windows releases distrust SHA-1 signatures");
                }
                self.algorithm = algorithm;
                Ok(self)
            }
            None => Err(SigningError::ConfigurationError(format!(
                "unsupported hash algorithm: {name}"
            ))),
        }
    }

    #[must_use]
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Sign the executable at `path` in place.
    ///
    /// Any previous signature is replaced. On error the file keeps its
    /// original content; the write-back is staged and atomic.
    pub fn sign<P: AsRef<Path>>(&self, path: P) -> SigningResult<()> {
        let path = path.as_ref();
        log::info!("signing {} ({})", path.display(), self.algorithm);

        let mut file = PeFile::open(path)?;
        file.remove_certificate_table();
        file.pad(CERTIFICATE_TABLE_ALIGNMENT);

        let table = self.create_certificate_table(&file)?;
        file.write_data_directory(DataDirectory::CertificateTable, &table)?;
        file.close()?;

        log::info!("signed {}", path.display());
        Ok(())
    }

    /// Build the complete Certificate Table entry: the (optionally
    /// counter-signed) signature DER, zero-padded to an 8-byte multiple and
    /// framed by the WIN_CERTIFICATE header.
    fn create_certificate_table(&self, file: &PeFile) -> SigningResult<Vec<u8>> {
        let mut signature = self.create_signature(file)?;
        if self.timestamping {
            signature = self.timestamper()?.timestamp(self.algorithm, &signature)?;
        }

        let mut der = signature.to_der();
        let remainder = der.len() % CERTIFICATE_TABLE_ALIGNMENT;
        if remainder != 0 {
            der.extend(std::iter::repeat(0u8).take(CERTIFICATE_TABLE_ALIGNMENT - remainder));
        }

        let length = u32::try_from(der.len() + 8).map_err(|_| {
            SigningError::SignatureError("signature exceeds the certificate table limit".into())
        })?;
        let mut table = Vec::with_capacity(der.len() + 8);
        table.extend_from_slice(&length.to_le_bytes());
        table.extend_from_slice(&WIN_CERT_REVISION_2_0.to_le_bytes());
        table.extend_from_slice(&WIN_CERT_TYPE_PKCS_SIGNED_DATA.to_le_bytes());
        table.extend_from_slice(&der);
        Ok(table)
    }

    fn create_signature(&self, file: &PeFile) -> SigningResult<CmsSignature> {
        let digest = file.compute_digest(self.algorithm);
        log::debug!("computed image digest ({} bytes)", digest.len());

        let content = spc::indirect_data_content(self.algorithm, &digest);
        let attributes =
            spc::authenticated_attributes(self.program_name.as_deref(), self.program_url.as_deref());
        SignedDataGenerator::new(&self.chain, &self.private_key, self.algorithm)
            .generate(&content, attributes)
    }

    fn timestamper(&self) -> SigningResult<Box<dyn Timestamper>> {
        if self.use_rfc3161 {
            let url = self
                .timestamp_url
                .clone()
                .unwrap_or_else(|| Rfc3161Timestamper::DEFAULT_URL.to_string());
            Ok(Box::new(match &self.transport {
                Some(transport) => Rfc3161Timestamper::with_transport(url, transport.clone()),
                None => Rfc3161Timestamper::with_transport(
                    url,
                    Arc::new(crate::services::timestamp::HttpTransport::new()?),
                ),
            }))
        } else {
            let url = self
                .timestamp_url
                .clone()
                .unwrap_or_else(|| AuthenticodeTimestamper::DEFAULT_URL.to_string());
            Ok(Box::new(match &self.transport {
                Some(transport) => {
                    AuthenticodeTimestamper::with_transport(url, transport.clone())
                }
                None => AuthenticodeTimestamper::with_transport(
                    url,
                    Arc::new(crate::services::timestamp::HttpTransport::new()?),
                ),
            }))
        }
    }
}

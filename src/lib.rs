//! Authenticode signing for Portable Executable files.
//!
//! Embeds a CMS `SignedData` structure carrying an `SpcIndirectDataContent`
//! into a PE image so the result validates under Microsoft's Authenticode
//! verification. Counter-signatures can be obtained from a legacy
//! Authenticode timestamping server or an RFC 3161 timestamp authority;
//! timestamping is enabled by default and relies on the Comodo server.
//!
//! ```no_run
//! use authenticode_signer::PeSigner;
//! use openssl::pkey::PKey;
//! use openssl::x509::X509;
//!
//! # fn main() -> authenticode_signer::SigningResult<()> {
//! let cert = X509::from_pem(&std::fs::read("cert.pem")?)?;
//! let key = PKey::private_key_from_pem(&std::fs::read("key.pem")?)?;
//!
//! PeSigner::new(vec![cert], key)?
//!     .with_program_name("My App")
//!     .with_timestamping(false)
//!     .sign("app.exe")?;
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod infra;
pub mod services;

pub use domain::crypto::HashAlgorithm;
pub use domain::pe::{DataDirectory, PeFile, PeLayout};
pub use infra::error::{SigningError, SigningResult};
pub use services::signed_data::{CmsSignature, SignedDataGenerator, UnsignedAttribute};
pub use services::signer::PeSigner;
pub use services::timestamp::{
    AuthenticodeTimestamper, HttpTransport, Rfc3161Timestamper, Timestamper, TimestampTransport,
    TransportResponse,
};

//! Service layer: signature generation, timestamping and the signing facade.

pub mod signed_data;
pub mod signer;
pub mod timestamp;

pub use signed_data::{CmsSignature, SignedDataGenerator, UnsignedAttribute};
pub use signer::PeSigner;
pub use timestamp::{
    AuthenticodeTimestamper, HttpTransport, Rfc3161Timestamper, Timestamper, TimestampTransport,
    TransportResponse,
};

//! Infrastructure layer: error taxonomy shared by all components.

pub mod error;

pub use error::{SigningError, SigningResult};

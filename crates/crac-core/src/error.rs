//! Error types for the CRAC model
//!
//! Every failure in this crate is a synchronous validation error carrying a
//! human-readable message. [`CracError`] groups those messages by category so
//! callers can branch on the kind of failure while still matching on text.
//!
//! # Example
//!
//! ```
//! use crac_core::{Crac, CracError, CracResult, InstantKind};
//!
//! fn build() -> CracResult<Crac> {
//!     let mut crac = Crac::new("crac");
//!     crac.new_instant("preventive", InstantKind::Preventive)?;
//!     crac.new_instant("outage", InstantKind::Outage)?;
//!     Ok(crac)
//! }
//!
//! assert!(build().is_ok());
//! let err = Crac::new("crac").new_instant("auto", InstantKind::Auto).unwrap_err();
//! assert!(matches!(err, CracError::Instant(_)));
//! ```

use thiserror::Error;

/// Unified error type for all CRAC operations.
///
/// The domain variants display their message verbatim: the message is the
/// contract, the variant is the category.
#[derive(Error, Debug)]
pub enum CracError {
    /// A required builder field was never set
    #[error("{0}")]
    MissingField(String),

    /// Reference to an entity the Crac does not know
    #[error("{0}")]
    UnknownReference(String),

    /// Same id registered twice with a different payload
    #[error("{0}")]
    Conflict(String),

    /// A domain rule was violated
    #[error("{0}")]
    InvalidData(String),

    /// Instant lattice violations
    #[error("{0}")]
    Instant(String),

    /// Failures reported by the network collaborator
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using CracError.
pub type CracResult<T> = Result<T, CracError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for CracError {
    fn from(err: anyhow::Error) -> Self {
        CracError::Other(err.to_string())
    }
}

impl From<String> for CracError {
    fn from(s: String) -> Self {
        CracError::Other(s)
    }
}

impl From<&str> for CracError {
    fn from(s: &str) -> Self {
        CracError::Other(s.to_string())
    }
}

impl From<toml::de::Error> for CracError {
    fn from(err: toml::de::Error) -> Self {
        CracError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for CracError {
    fn from(err: toml::ser::Error) -> Self {
        CracError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_error_display_is_message() {
        let err = CracError::InvalidData("You cannot define a contingency for a preventive cnec.".into());
        assert_eq!(
            err.to_string(),
            "You cannot define a contingency for a preventive cnec."
        );
    }

    #[test]
    fn test_network_error_display() {
        let err = CracError::Network("Generator gen-1 not found".into());
        assert!(err.to_string().contains("Network error"));
        assert!(err.to_string().contains("gen-1"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let crac_err: CracError = io_err.into();
        assert!(matches!(crac_err, CracError::Io(_)));
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: CracError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, CracError::Other(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> CracResult<()> {
            Err(CracError::Conflict("duplicate".into()))
        }

        fn outer() -> CracResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(CracError::Conflict(_))));
    }
}

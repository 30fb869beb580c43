//! Unified error type definitions

use serde::Serialize;
use thiserror::Error;

/// Advisor error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum AdvisorError {
    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration could not be parsed
    #[error("Config error: {0}")]
    ConfigError(String),
}

/// Advisor Result type alias
pub type AdvisorResult<T> = std::result::Result<T, AdvisorError>;

/// Failure of a single TLS or STARTTLS probe attempt.
///
/// Probe errors never escape the advisor; they are turned into advice text.
/// The `Display` form is appended verbatim to the generic failure messages.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum ProbeError {
    /// The hostname did not resolve.
    #[error("lookup {0}: no such host")]
    NoSuchHost(String),

    /// The TCP dial did not complete before the configured timeout.
    #[error("i/o timeout")]
    Timeout,

    /// The TCP dial failed for any other reason.
    #[error("{0}")]
    Connect(String),

    /// The SMTP server did not greet us properly.
    #[error("smtp: {0}")]
    Smtp(String),

    /// The peer certificate failed verification.
    #[error("tls: failed to verify certificate: {0}")]
    UntrustedCertificate(String),

    /// STARTTLS negotiation or the TLS handshake failed.
    #[error("{0}")]
    Handshake(String),
}

impl ProbeError {
    /// Whether a retry with certificate verification disabled makes sense.
    #[must_use]
    pub fn is_certificate_failure(&self) -> bool {
        matches!(self, Self::UntrustedCertificate(_))
    }
}

/// Probe Result type alias
pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

//! Public types returned by advisor operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Remediation advice for every checked record type.
///
/// Each field preserves generation order; the first entry may be a summary
/// line. Empty fields are omitted when serialised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advice {
    /// Domain advice (HTTPS reachability and TLS version).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,
    /// BIMI advice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bimi: Vec<String>,
    /// DKIM advice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dkim: Vec<String>,
    /// DMARC advice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dmarc: Vec<String>,
    /// MX advice (mail server redundancy and STARTTLS).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mx: Vec<String>,
    /// SPF advice.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spf: Vec<String>,
}

/// Already-resolved DNS data for one domain.
///
/// The advisor performs no DNS resolution; an empty string means the record
/// was not found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainRecords {
    /// The domain name being audited.
    pub domain: String,
    /// Raw BIMI TXT record.
    pub bimi: String,
    /// DKIM TXT record of the first known selector that answered.
    pub dkim: String,
    /// Raw DMARC TXT record.
    pub dmarc: String,
    /// Mail server hostnames in MX preference order, possibly with a trailing dot.
    pub mx: Vec<String>,
    /// Raw SPF TXT record.
    pub spf: String,
}

/// TLS protocol version negotiated by a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlsVersion {
    Tls10,
    Tls11,
    Tls12,
    Tls13,
    /// Anything else, including a handshake that reported no version.
    Unknown,
}

impl fmt::Display for TlsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tls10 => write!(f, "1.0"),
            Self::Tls11 => write!(f, "1.1"),
            Self::Tls12 => write!(f, "1.2"),
            Self::Tls13 => write!(f, "1.3"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(feature = "rustls")]
impl From<rustls::ProtocolVersion> for TlsVersion {
    fn from(version: rustls::ProtocolVersion) -> Self {
        match version {
            rustls::ProtocolVersion::TLSv1_0 => Self::Tls10,
            rustls::ProtocolVersion::TLSv1_1 => Self::Tls11,
            rustls::ProtocolVersion::TLSv1_2 => Self::Tls12,
            rustls::ProtocolVersion::TLSv1_3 => Self::Tls13,
            _ => Self::Unknown,
        }
    }
}

//! Email security advisor for domain owners.
//!
//! Turns already-resolved SPF, DKIM, DMARC, BIMI and MX data into
//! human-readable remediation advice, and probes the domain (port 443) and
//! its mail servers (port 25, `STARTTLS`) for their negotiated TLS version.
//! DNS resolution is left to the caller.

mod cache;
mod config;
mod error;
mod services;
mod types;

#[cfg(test)]
mod test_utils;

pub use cache::ExpiringCache;
pub use config::AdvisorConfig;
pub use error::{AdvisorError, AdvisorResult, ProbeError, ProbeResult};
pub use services::{
    Advisor, NetworkTransport, Transport, Verification, classify_tls_version, is_consumer_domain,
    validate_email,
};
pub use types::{Advice, DomainRecords, TlsVersion};

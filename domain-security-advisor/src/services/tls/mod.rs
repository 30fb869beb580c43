//! TLS probe engine.
//!
//! Both probes run a two-attempt state machine: a strict attempt, then on a
//! certificate failure exactly one relaxed attempt over a fresh connection.
//! Whatever advice an uncached probe produces is written to its cache once,
//! keyed by the dot-stripped hostname.

mod smtp;
mod transport;

use std::time::Duration;

use log::{debug, trace};

pub use transport::{NetworkTransport, SharedTransport, Transport, Verification};

use crate::cache::ExpiringCache;
use crate::error::ProbeError;
use crate::types::TlsVersion;

pub const HTTPS_PORT: u16 = 443;
pub const SMTP_PORT: u16 = 25;

const NO_VALID_CERTIFICATE: &str = "No valid certificate could be found.";
const FAILED_TO_REACH: &str = "Failed to reach domain";
const FAILED_TO_REACH_TIMEOUT: &str = "Failed to reach domain before timeout";
const FAILED_TO_START_TLS: &str = "Failed to start TLS connection";

/// Marker present in the advice line for a TLS 1.3 connection.
pub const NO_FURTHER_ACTION: &str = "no further action needed";

/// Maps a negotiated version to exactly one advice line.
pub fn classify_tls_version(version: TlsVersion) -> String {
    match version {
        TlsVersion::Tls10 | TlsVersion::Tls11 => format!(
            "Your domain is using TLS version {version} which is outdated, and should be upgraded to TLS 1.3."
        ),
        TlsVersion::Tls12 => {
            "Your domain is using TLS version 1.2, and should be upgraded to TLS 1.3.".to_string()
        }
        TlsVersion::Tls13 => {
            format!("Your domain is using TLS 1.3, {NO_FURTHER_ACTION}!")
        }
        TlsVersion::Unknown => "Your domain is using an unrecognized version of TLS, you should verify that it's using TLS 1.3 or above.".to_string(),
    }
}

/// Strips the DNS root dot, if present.
pub fn strip_root_dot(hostname: &str) -> &str {
    hostname.strip_suffix('.').unwrap_or(hostname)
}

/// Runs and memoizes host (HTTPS) and mail (STARTTLS) probes.
pub struct TlsProber {
    transport: SharedTransport,
    host_cache: ExpiringCache<Vec<String>>,
    mail_cache: ExpiringCache<Vec<String>>,
}

impl TlsProber {
    pub fn new(transport: SharedTransport, cache_lifetime: Duration) -> Self {
        Self {
            transport,
            host_cache: ExpiringCache::new(cache_lifetime),
            mail_cache: ExpiringCache::new(cache_lifetime),
        }
    }

    /// TLS probe against `hostname:port`, served from cache when fresh.
    pub async fn check_host_tls(&self, hostname: &str, port: u16) -> Vec<String> {
        let hostname = strip_root_dot(hostname);

        if let Some(advice) = self.host_cache.get(hostname).await {
            trace!("[TLS] Cache hit for {hostname}");
            return advice;
        }
        trace!("[TLS] Cache miss for {hostname}");

        let port = if port == 0 { HTTPS_PORT } else { port };
        let advice = self.probe_host(hostname, port).await;
        self.host_cache.set(hostname, advice.clone()).await;
        advice
    }

    /// STARTTLS probe against `hostname:25`, served from cache when fresh.
    pub async fn check_mail_tls(&self, hostname: &str) -> Vec<String> {
        let hostname = strip_root_dot(hostname);

        if let Some(advice) = self.mail_cache.get(hostname).await {
            trace!("[SMTP] Cache hit for {hostname}");
            return advice;
        }
        trace!("[SMTP] Cache miss for {hostname}");

        let advice = self.probe_mail(hostname).await;
        self.mail_cache.set(hostname, advice.clone()).await;
        advice
    }

    async fn probe_host(&self, hostname: &str, port: u16) -> Vec<String> {
        let strict = self
            .transport
            .tls_handshake(hostname, port, Verification::Strict)
            .await;

        match strict {
            Ok(version) => vec![classify_tls_version(version)],
            Err(ProbeError::NoSuchHost(_)) => vec![format!("{hostname} could not be reached")],
            Err(e) if e.is_certificate_failure() => {
                debug!("[TLS] {hostname}: {e}, retrying without verification");
                let mut advice = vec![NO_VALID_CERTIFICATE.to_string()];
                match self
                    .transport
                    .tls_handshake(hostname, port, Verification::Relaxed)
                    .await
                {
                    Ok(version) => advice.push(classify_tls_version(version)),
                    Err(e) => debug!("[TLS] {hostname}: relaxed attempt failed: {e}"),
                }
                advice
            }
            Err(e) => vec![format!("{FAILED_TO_REACH}: {e}")],
        }
    }

    async fn probe_mail(&self, hostname: &str) -> Vec<String> {
        let strict = self
            .transport
            .starttls_handshake(hostname, SMTP_PORT, Verification::Strict)
            .await;

        match strict {
            Ok(version) => vec![classify_tls_version(version)],
            Err(ProbeError::Timeout) => vec![FAILED_TO_REACH_TIMEOUT.to_string()],
            Err(ProbeError::NoSuchHost(_) | ProbeError::Connect(_) | ProbeError::Smtp(_)) => {
                vec![FAILED_TO_REACH.to_string()]
            }
            Err(e) if e.is_certificate_failure() => {
                debug!("[SMTP] {hostname}: {e}, retrying without verification");
                let mut advice = vec![NO_VALID_CERTIFICATE.to_string()];
                match self
                    .transport
                    .starttls_handshake(hostname, SMTP_PORT, Verification::Relaxed)
                    .await
                {
                    Ok(version) => advice.push(classify_tls_version(version)),
                    Err(
                        ProbeError::NoSuchHost(_)
                        | ProbeError::Timeout
                        | ProbeError::Connect(_)
                        | ProbeError::Smtp(_),
                    ) => return vec![FAILED_TO_REACH.to_string()],
                    Err(e) => {
                        debug!("[SMTP] {hostname}: relaxed attempt failed: {e}");
                        advice.push(FAILED_TO_START_TLS.to_string());
                    }
                }
                advice
            }
            Err(e) => vec![format!("{FAILED_TO_START_TLS}: {e}")],
        }
    }
}

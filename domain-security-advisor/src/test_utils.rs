//! Test helpers
//!
//! Provides a scripted [`Transport`] that counts how often the network would
//! have been hit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ProbeError, ProbeResult};
use crate::services::tls::{Transport, Verification};
use crate::types::TlsVersion;

type Script = HashMap<(String, Verification), ProbeResult<TlsVersion>>;

// ===== MockTransport =====

/// Unscripted hosts fail with a connection error.
#[derive(Default)]
pub struct MockTransport {
    tls: Script,
    starttls: Script,
    delay: Duration,
    tls_calls: AtomicUsize,
    starttls_calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tls(mut self, host: &str, result: ProbeResult<TlsVersion>) -> Self {
        self.tls
            .insert((host.to_string(), Verification::Strict), result);
        self
    }

    pub fn with_relaxed_tls(mut self, host: &str, result: ProbeResult<TlsVersion>) -> Self {
        self.tls
            .insert((host.to_string(), Verification::Relaxed), result);
        self
    }

    pub fn with_starttls(mut self, host: &str, result: ProbeResult<TlsVersion>) -> Self {
        self.starttls
            .insert((host.to_string(), Verification::Strict), result);
        self
    }

    pub fn with_relaxed_starttls(mut self, host: &str, result: ProbeResult<TlsVersion>) -> Self {
        self.starttls
            .insert((host.to_string(), Verification::Relaxed), result);
        self
    }

    /// Every handshake sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn tls_calls(&self) -> usize {
        self.tls_calls.load(Ordering::SeqCst)
    }

    pub fn starttls_calls(&self) -> usize {
        self.starttls_calls.load(Ordering::SeqCst)
    }

    fn lookup(script: &Script, host: &str, verification: Verification) -> ProbeResult<TlsVersion> {
        script
            .get(&(host.to_string(), verification))
            .cloned()
            .unwrap_or_else(|| Err(ProbeError::Connect(format!("unscripted host {host}"))))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn tls_handshake(
        &self,
        host: &str,
        _port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion> {
        self.tls_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Self::lookup(&self.tls, host, verification)
    }

    async fn starttls_handshake(
        &self,
        host: &str,
        _port: u16,
        verification: Verification,
    ) -> ProbeResult<TlsVersion> {
        self.starttls_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Self::lookup(&self.starttls, host, verification)
    }
}

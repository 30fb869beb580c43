//! Service façade exposing all advisor operations.
//!
//! Record checks are pure functions of their input; the domain and MX checks
//! go through the shared [`TlsProber`] and its caches.

mod bimi;
mod dkim;
mod dmarc;
mod domain;
mod email;
mod mx;
mod spf;
pub(crate) mod tls;

use std::sync::Arc;
use std::time::Instant;

use log::{debug, warn};
use reqwest::{Client, ClientBuilder};

use crate::config::AdvisorConfig;
use crate::types::{Advice, DomainRecords};

pub use domain::is_consumer_domain;
pub use email::validate_email;
pub use tls::{NetworkTransport, Transport, Verification, classify_tls_version};

use tls::TlsProber;

/// Entry point for all email security checks.
///
/// Cheap to clone; clones share the TLS caches.
///
/// ```rust,no_run
/// use domain_security_advisor::{Advisor, AdvisorConfig, DomainRecords};
/// # async fn demo() {
/// let advisor = Advisor::new(AdvisorConfig::default());
/// let advice = advisor
///     .check_all(&DomainRecords {
///         domain: "example.com".to_string(),
///         spf: "v=spf1 -all".to_string(),
///         ..DomainRecords::default()
///     })
///     .await;
/// # }
/// ```
#[derive(Clone)]
pub struct Advisor {
    check_tls: bool,
    http: Client,
    prober: Arc<TlsProber>,
}

impl Advisor {
    /// Advisor that probes over real sockets.
    ///
    /// Zero durations in `config` fall back to the defaults.
    pub fn new(config: AdvisorConfig) -> Self {
        let config = config.or_defaults();
        let transport = Arc::new(NetworkTransport::new(config.timeout()));
        Self::with_transport(config, transport)
    }

    /// Advisor that runs its TLS probes through `transport`.
    pub fn with_transport(config: AdvisorConfig, transport: Arc<dyn Transport>) -> Self {
        let config = config.or_defaults();
        let http = build_http_client(Client::builder().timeout(config.timeout()));

        Self {
            check_tls: config.check_tls,
            http,
            prober: Arc::new(TlsProber::new(transport, config.cache_lifetime())),
        }
    }

    /// Run all six checks concurrently and return once every one finished.
    pub async fn check_all(&self, records: &DomainRecords) -> Advice {
        debug!("[ADVISOR] Checking {}", records.domain);
        let start_time = Instant::now();

        let (domain, bimi, dkim, dmarc, mx, spf) = futures::join!(
            self.check_domain(&records.domain),
            self.check_bimi(&records.bimi),
            async { self.check_dkim(&records.dkim) },
            async { self.check_dmarc(&records.dmarc) },
            self.check_mx(&records.mx),
            async { self.check_spf(&records.spf) },
        );

        debug!(
            "[ADVISOR] Check of {} completed, total_time={:?}",
            records.domain,
            start_time.elapsed()
        );

        Advice {
            domain,
            bimi,
            dkim,
            dmarc,
            mx,
            spf,
        }
    }

    /// Consumer-provider short circuit, then the port 443 TLS probe.
    pub async fn check_domain(&self, domain: &str) -> Vec<String> {
        domain::check_domain(&self.prober, self.check_tls, domain).await
    }

    /// BIMI tag shape plus HEAD reachability of the logo and VMC.
    pub async fn check_bimi(&self, bimi: &str) -> Vec<String> {
        bimi::check_bimi(&self.http, bimi).await
    }

    #[allow(clippy::unused_self)]
    pub fn check_dkim(&self, dkim: &str) -> Vec<String> {
        dkim::check_dkim(dkim)
    }

    #[allow(clippy::unused_self)]
    pub fn check_dmarc(&self, dmarc: &str) -> Vec<String> {
        dmarc::check_dmarc(dmarc)
    }

    /// Redundancy advice plus a STARTTLS probe of every host, in order.
    pub async fn check_mx(&self, mx: &[String]) -> Vec<String> {
        mx::check_mx(&self.prober, self.check_tls, mx).await
    }

    #[allow(clippy::unused_self)]
    pub fn check_spf(&self, spf: &str) -> Vec<String> {
        spf::check_spf(spf)
    }
}

fn build_http_client(builder: ClientBuilder) -> Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            warn!("[ADVISOR] Failed to build HTTP client, BIMI requests have no timeout: {e}");
            Client::default()
        }
    }
}

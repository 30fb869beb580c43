//! Mail server advice: redundancy and STARTTLS posture of every MX host.

use log::debug;

use super::tls::{NO_FURTHER_ACTION, TlsProber, strip_root_dot};

const NO_MAIL_SERVERS: &str =
    "You do not have any mail servers setup, so you cannot receive email at this domain.";
const SINGLE_MAIL_SERVER: &str = "You have a single mail server setup, but it's recommended that you have at least two setup in case the first one fails.";
const MULTIPLE_MAIL_SERVERS: &str = "You have multiple mail servers setup, which is recommended.";
const ALL_TLS_13: &str = "All of your domains are using TLS 1.3, no further action needed!";
const LOOKS_GOOD: &str = "You have a multiple mail servers setup! No further action needed.";

pub async fn check_mx(prober: &TlsProber, check_tls: bool, mx: &[String]) -> Vec<String> {
    let mut advice = match mx.len() {
        0 => return vec![NO_MAIL_SERVERS.to_string()],
        1 => vec![SINGLE_MAIL_SERVER.to_string()],
        _ => vec![MULTIPLE_MAIL_SERVERS.to_string()],
    };

    if check_tls {
        let mut probe_lines = 0usize;
        let mut clean_lines = 0usize;

        // One host at a time, in record order.
        for server in mx {
            let hostname = strip_root_dot(server);
            for line in prober.check_mail_tls(hostname).await {
                probe_lines += 1;
                if line.contains(NO_FURTHER_ACTION) {
                    clean_lines += 1;
                }
                advice.push(format!("{hostname}: {line}"));
            }
        }

        debug!("[MX] {clean_lines}/{probe_lines} probe lines report TLS 1.3");
        if probe_lines > 0 && clean_lines == probe_lines {
            return vec![ALL_TLS_13.to_string()];
        }
    }

    if advice.is_empty() {
        return vec![LOOKS_GOOD.to_string()];
    }

    advice
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ProbeError;
    use crate::services::tls::classify_tls_version;
    use crate::test_utils::MockTransport;
    use crate::types::TlsVersion;

    fn prober(transport: &Arc<MockTransport>) -> TlsProber {
        TlsProber::new(transport.clone(), Duration::from_secs(60))
    }

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[tokio::test]
    async fn test_no_mail_servers_skips_probing() {
        let transport = Arc::new(MockTransport::new());
        let advice = check_mx(&prober(&transport), true, &[]).await;
        assert_eq!(advice, vec![NO_MAIL_SERVERS.to_string()]);
        assert_eq!(transport.starttls_calls(), 0);
    }

    #[tokio::test]
    async fn test_cardinality_only_without_tls() {
        let transport = Arc::new(MockTransport::new());
        let prober = prober(&transport);
        assert_eq!(
            check_mx(&prober, false, &hosts(&["mx.example.com."])).await,
            vec![SINGLE_MAIL_SERVER.to_string()]
        );
        assert_eq!(
            check_mx(&prober, false, &hosts(&["mx1.example.com.", "mx2.example.com."])).await,
            vec![MULTIPLE_MAIL_SERVERS.to_string()]
        );
        assert_eq!(transport.starttls_calls(), 0);
    }

    #[tokio::test]
    async fn test_all_tls_13_collapses() {
        let transport = Arc::new(
            MockTransport::new()
                .with_starttls("mx1.example.com", Ok(TlsVersion::Tls13))
                .with_starttls("mx2.example.com", Ok(TlsVersion::Tls13)),
        );
        let advice = check_mx(
            &prober(&transport),
            true,
            &hosts(&["mx1.example.com.", "mx2.example.com."]),
        )
        .await;
        assert_eq!(advice, vec![ALL_TLS_13.to_string()]);
    }

    #[tokio::test]
    async fn test_single_host_tls_13_collapses() {
        let transport =
            Arc::new(MockTransport::new().with_starttls("mx.example.com", Ok(TlsVersion::Tls13)));
        let advice = check_mx(&prober(&transport), true, &hosts(&["mx.example.com."])).await;
        assert_eq!(advice, vec![ALL_TLS_13.to_string()]);
    }

    #[tokio::test]
    async fn test_mixed_results_are_prefixed_with_hostname() {
        let transport = Arc::new(
            MockTransport::new()
                .with_starttls("mx1.example.com", Ok(TlsVersion::Tls13))
                .with_starttls("mx2.example.com", Err(ProbeError::Timeout)),
        );
        let advice = check_mx(
            &prober(&transport),
            true,
            &hosts(&["mx1.example.com.", "mx2.example.com"]),
        )
        .await;
        assert_eq!(
            advice,
            vec![
                MULTIPLE_MAIL_SERVERS.to_string(),
                format!("mx1.example.com: {}", classify_tls_version(TlsVersion::Tls13)),
                "mx2.example.com: Failed to reach domain before timeout".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_certificate_retry_lines_are_all_prefixed() {
        let transport = Arc::new(
            MockTransport::new()
                .with_starttls(
                    "mx.example.com",
                    Err(ProbeError::UntrustedCertificate("UnknownIssuer".to_string())),
                )
                .with_relaxed_starttls("mx.example.com", Ok(TlsVersion::Tls13)),
        );
        let advice = check_mx(&prober(&transport), true, &hosts(&["mx.example.com."])).await;
        assert_eq!(
            advice,
            vec![
                SINGLE_MAIL_SERVER.to_string(),
                "mx.example.com: No valid certificate could be found.".to_string(),
                format!("mx.example.com: {}", classify_tls_version(TlsVersion::Tls13)),
            ]
        );
    }

    #[tokio::test]
    async fn test_repeated_hosts_hit_cache() {
        let transport =
            Arc::new(MockTransport::new().with_starttls("mx.example.com", Ok(TlsVersion::Tls12)));
        let prober = prober(&transport);
        let mx = hosts(&["mx.example.com.", "mx.example.com"]);

        let _ = check_mx(&prober, true, &mx).await;
        let _ = check_mx(&prober, true, &mx).await;
        assert_eq!(transport.starttls_calls(), 1);
    }
}

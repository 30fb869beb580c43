//! Domain-level advice: consumer mailbox providers and HTTPS posture.

use std::collections::HashSet;
use std::sync::LazyLock;

use super::tls::{HTTPS_PORT, TlsProber, strip_root_dot};

const CONSUMER_DOMAIN: &str = "Consumer based accounts (i.e gmail.com, yahoo.com, etc) are controlled by the vendor. They are responsible for setting DKIM, SPF and DMARC capabilities on their domains.";
const NO_DOMAIN: &str = "No domain name was provided, so it could not be checked.";
const LOOKS_GOOD: &str = "Your domain looks good! No further action needed.";

/// Mail providers whose authentication setup is the vendor's business.
const CONSUMER_DOMAIN_LIST: &[&str] = &[
    "126.com",
    "163.com",
    "aim.com",
    "aol.com",
    "att.net",
    "bellsouth.net",
    "btinternet.com",
    "charter.net",
    "comcast.net",
    "cox.net",
    "earthlink.net",
    "fastmail.com",
    "free.fr",
    "gmail.com",
    "gmx.com",
    "gmx.de",
    "gmx.net",
    "googlemail.com",
    "hey.com",
    "hotmail.co.uk",
    "hotmail.com",
    "hotmail.fr",
    "icloud.com",
    "laposte.net",
    "libero.it",
    "live.com",
    "mac.com",
    "mail.com",
    "mail.ru",
    "me.com",
    "msn.com",
    "naver.com",
    "orange.fr",
    "outlook.com",
    "proton.me",
    "protonmail.com",
    "qq.com",
    "rocketmail.com",
    "sbcglobal.net",
    "sina.com",
    "t-online.de",
    "tutanota.com",
    "verizon.net",
    "web.de",
    "yahoo.co.jp",
    "yahoo.co.uk",
    "yahoo.com",
    "yahoo.fr",
    "yandex.com",
    "yandex.ru",
    "ymail.com",
    "zoho.com",
];

/// Built once, never mutated, so concurrent readers need no lock.
static CONSUMER_DOMAINS: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| CONSUMER_DOMAIN_LIST.iter().copied().collect());

/// Whether `domain` belongs to a known consumer mailbox provider.
pub fn is_consumer_domain(domain: &str) -> bool {
    let domain = strip_root_dot(domain.trim()).to_ascii_lowercase();
    CONSUMER_DOMAINS.contains(domain.as_str())
}

pub async fn check_domain(prober: &TlsProber, check_tls: bool, domain: &str) -> Vec<String> {
    if domain.trim().is_empty() {
        return vec![NO_DOMAIN.to_string()];
    }

    if is_consumer_domain(domain) {
        return vec![CONSUMER_DOMAIN.to_string()];
    }

    let mut advice = Vec::new();
    if check_tls {
        advice.extend(prober.check_host_tls(domain, HTTPS_PORT).await);
    }

    if advice.is_empty() {
        return vec![LOOKS_GOOD.to_string()];
    }

    advice
}

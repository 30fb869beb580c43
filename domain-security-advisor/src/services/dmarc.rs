//! DMARC record advice.
//!
//! Tags are walked as an ordered sequence of `(index, key, value)` triples;
//! `v` and `p` are positional, so a map would lose information here.

use super::email::validate_email;

const NOT_FOUND: &str = "You do not have DMARC setup!";
const MALFORMED: &str =
    "Your DMARC record appears to be malformed as no semicolons seem to be present.";

const BAD_VERSION: &str =
    "The beginning of your DMARC record should be v=DMARC1 with specific capitalization.";
const BAD_POLICY_POSITION: &str =
    "The second tag in your DMARC record must be p=none/p=quarantine/p=reject.";
const INVALID_POLICY: &str =
    "Invalid DMARC policy specified, the record must be p=none/p=quarantine/p=reject.";

const QUARANTINE_WITH_RUA: &str = "You are currently at the second level and receiving reports. Please make sure to review the reports, make the appropriate adjustments, and move to reject soon.";
const QUARANTINE_WITHOUT_RUA: &str = "You are currently at the second level. However, you must receive reports in order to determine if DKIM/DMARC/SPF are functioning correctly and move to the highest level (reject). Please add the ‘rua’ tag to your DMARC policy.";
const NONE_WITH_RUA: &str = "You are currently at the lowest level and receiving reports, which is a great starting point. Please make sure to review the reports, make the appropriate adjustments, and move to either quarantine or reject soon.";
const NONE_WITHOUT_RUA: &str = "You are currently at the lowest level, which is a great starting point. However, you must receive reports in order to determine if DKIM/DMARC/SPF are functioning correctly. Please add the ‘rua’ tag to your DMARC policy.";
const REJECT_WITH_RUA: &str = "You are at the highest level! Please make sure to continue reviewing the reports and make the appropriate adjustments, if needed.";
const REJECT_WITHOUT_RUA: &str = "You are at the highest level! However, we do recommend keeping reports enabled (via the rua tag) in case any issues may arise and you can review reports to see if DMARC is the cause.";

const INVALID_SUBDOMAIN_POLICY: &str =
    "Invalid subdomain policy specified, the record must be sp=none/sp=quarantine/sp=reject.";
const INVALID_PERCENTAGE: &str =
    "Invalid report percentage specified, it must be between 0 and 100.";
const RUA_MISSING_MAILTO: &str =
    "Invalid aggregate report destination specified, it should begin with mailto:.";
const RUA_INVALID_EMAIL: &str =
    "Invalid aggregate report destination specified, it should be a valid email address.";
const RUF_MISSING_MAILTO: &str =
    "Invalid forensic report destination specified, it should begin with mailto:.";
const RUF_INVALID_EMAIL: &str =
    "Invalid forensic report destination specified, it should be a valid email address.";
const INVALID_FAILURE_OPTIONS: &str =
    "Invalid failure options specified, the record must be fo=0/fo=1/fo=d/fo=s.";
const INVALID_INTERVAL: &str =
    "Invalid report interval specified, it must be a positive integer.";
const NEGATIVE_INTERVAL: &str = "Invalid report interval specified, it must be a positive value.";

const CONSIDER_RUA: &str = "Consider specifying a 'rua' tag for aggregate reporting.";
const CONSIDER_FO: &str = "Consider specifying an 'fo' tag to define the condition for generating failure reports. Default is '0' (report if both SPF and DKIM fail).";
const CONSIDER_RUF: &str = "Consider specifying a 'ruf' tag for forensic reporting.";
const SUBDOMAIN_POLICY_DEFAULT: &str =
    "Subdomain policy isn't specified, they'll default to the main policy instead.";

const MAILTO: &str = "mailto:";

/// Parse accumulator for one DMARC record. Only `advice` escapes.
#[derive(Debug, Default)]
struct DmarcFields {
    version: String,
    policy: String,
    subdomain_policy: String,
    percentage: i64,
    aggregate_report_destinations: Vec<String>,
    forensic_report_destinations: Vec<String>,
    failure_options: String,
    aspf: String,
    adkim: String,
    report_interval: i64,
    advice: Vec<String>,
}

impl DmarcFields {
    fn advise(&mut self, message: &str) {
        self.advice.push(message.to_string());
    }

    fn apply(&mut self, index: usize, key: &str, value: &str, rua_exists: bool) {
        match key {
            "v" => {
                if index != 0 || value != "DMARC1" {
                    self.advise(BAD_VERSION);
                }
                self.version = value.to_string();
            }
            "p" => {
                if index != 1 {
                    self.advise(BAD_POLICY_POSITION);
                }
                self.policy = value.to_string();
                self.advise(policy_advice(value, rua_exists));
            }
            "sp" => {
                self.subdomain_policy = value.to_string();
                if !matches!(value, "none" | "quarantine" | "reject") {
                    self.advise(INVALID_SUBDOMAIN_POLICY);
                }
            }
            "pct" => {
                let parsed = value.parse::<i64>();
                if !matches!(parsed, Ok(0..=100)) {
                    self.advise(INVALID_PERCENTAGE);
                }
                self.percentage = parsed.unwrap_or_default();
            }
            "rua" => {
                let destinations = split_destinations(value);
                for destination in &destinations {
                    if !destination.starts_with(MAILTO) {
                        self.advise(RUA_MISSING_MAILTO);
                    }
                    let address = destination.strip_prefix(MAILTO).unwrap_or(destination);
                    if !validate_email(address) {
                        self.advise(RUA_INVALID_EMAIL);
                    }
                }
                self.aggregate_report_destinations = destinations;
            }
            "ruf" => {
                let destinations = split_destinations(value);
                for destination in &destinations {
                    let Some(address) = destination.strip_prefix(MAILTO) else {
                        self.advise(RUF_MISSING_MAILTO);
                        continue;
                    };
                    if !validate_email(address) {
                        self.advise(RUF_INVALID_EMAIL);
                    }
                }
                self.forensic_report_destinations = destinations;
            }
            "fo" => {
                self.failure_options = value.to_string();
                if !matches!(value, "0" | "1" | "d" | "s") {
                    self.advise(INVALID_FAILURE_OPTIONS);
                }
            }
            "aspf" => self.aspf = value.to_string(),
            "adkim" => self.adkim = value.to_string(),
            "ri" => {
                // An unparsable interval is stored as zero, so it never also
                // reports as negative.
                match value.parse::<i64>() {
                    Ok(interval) if interval < 0 => {
                        self.advise(NEGATIVE_INTERVAL);
                        self.report_interval = interval;
                    }
                    Ok(interval) => self.report_interval = interval,
                    Err(_) => {
                        self.advise(INVALID_INTERVAL);
                        self.report_interval = 0;
                    }
                }
            }
            _ => {}
        }
    }

    fn remind_best_practices(&mut self) {
        if self.aggregate_report_destinations.is_empty() {
            self.advise(CONSIDER_RUA);
        }
        if self.failure_options.is_empty() {
            self.advise(CONSIDER_FO);
        }
        if self.forensic_report_destinations.is_empty() {
            self.advise(CONSIDER_RUF);
        }
        if self.subdomain_policy.is_empty() {
            self.advise(SUBDOMAIN_POLICY_DEFAULT);
        }
    }
}

fn policy_advice(policy: &str, rua_exists: bool) -> &'static str {
    match (policy, rua_exists) {
        ("quarantine", true) => QUARANTINE_WITH_RUA,
        ("quarantine", false) => QUARANTINE_WITHOUT_RUA,
        ("none", true) => NONE_WITH_RUA,
        ("none", false) => NONE_WITHOUT_RUA,
        ("reject", true) => REJECT_WITH_RUA,
        ("reject", false) => REJECT_WITHOUT_RUA,
        _ => INVALID_POLICY,
    }
}

fn split_destinations(value: &str) -> Vec<String> {
    value.split(',').map(str::to_string).collect()
}

/// Ordered `(index, key, value)` triples; tags without `=` are dropped but
/// still consume their index.
fn tags(record: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    record
        .split(';')
        .enumerate()
        .filter_map(|(index, part)| {
            part.trim()
                .split_once('=')
                .map(|(key, value)| (index, key, value))
        })
}

pub fn check_dmarc(record: &str) -> Vec<String> {
    if record.is_empty() {
        return vec![NOT_FOUND.to_string()];
    }

    if !record.contains(';') {
        return vec![MALFORMED.to_string()];
    }

    let rua_exists = record.contains("rua=");
    let mut fields = DmarcFields::default();

    for (index, key, value) in tags(record) {
        fields.apply(index, key, value, rua_exists);
    }

    fields.remind_best_practices();

    log::trace!(
        "[DMARC] v={} p={} sp={} pct={} aspf={} adkim={} ri={} advice={}",
        fields.version,
        fields.policy,
        fields.subdomain_policy,
        fields.percentage,
        fields.aspf,
        fields.adkim,
        fields.report_interval,
        fields.advice.len()
    );

    fields.advice
}

//! SPF record advice.

const NOT_FOUND: &str = "We couldn't detect any active SPF record for your domain. Please visit https://dmarcguide.globalcyberalliance.org to fix this.";
const PLUS_ALL: &str = "Your SPF record contains the +all tag. It is strongly recommended that this be changed to either -all or ~all. The +all tag allows for any system regardless of SPF to send mail on the organization’s behalf.";
const MISSING_ALL: &str = "Your SPF record is missing the all tag. Please visit https://dmarcguide.globalcyberalliance.org to fix this.";
const LOOKS_GOOD: &str = "SPF seems to be setup correctly! No further action needed.";

/// Returns exactly one advice line; the first matching rule wins.
pub fn check_spf(spf: &str) -> Vec<String> {
    let advice = if spf.is_empty() {
        NOT_FOUND
    } else if !spf.contains("all") {
        MISSING_ALL
    } else if spf.contains("+all") {
        PLUS_ALL
    } else {
        LOOKS_GOOD
    };

    vec![advice.to_string()]
}

//! DKIM record advice (presence and tag shape only).

const NOT_FOUND: &str = "We couldn't detect any active DKIM record for your domain. Due to how DKIM works, we only lookup common/known DKIM selectors (such as x, selector1, google). Visit https://dmarcguide.globalcyberalliance.org for more info on how to configure DKIM for your domain.";
const MALFORMED: &str =
    "Your DKIM record appears to be malformed as no semicolons seem to be present.";
const BAD_VERSION: &str =
    "The beginning of your DKIM record should be v=DKIM1 with specific capitalization.";
const BAD_KEY_TYPE: &str = "The second tag in your DKIM record must be k=rsa or a=rsa-sha256.";
const MISSING_KEY: &str = "The third tag in your DKIM record must be p=YOUR_KEY.";
const LOOKS_GOOD: &str = "DKIM is setup for this email server. However, if you have other 3rd party systems, please send a test email to confirm DKIM is setup properly.";

pub fn check_dkim(dkim: &str) -> Vec<String> {
    if dkim.is_empty() {
        return vec![NOT_FOUND.to_string()];
    }

    if !dkim.contains(';') {
        return vec![MALFORMED.to_string()];
    }

    let mut advice = Vec::new();

    // Only the first three tags are positional; the rest are free-form.
    for (index, tag) in dkim.split(';').map(str::trim).enumerate().take(3) {
        match index {
            0 if !tag.contains("v=DKIM1") => advice.push(BAD_VERSION.to_string()),
            1 if !tag.contains("k=rsa") && !tag.contains("a=rsa-sha256") => {
                advice.push(BAD_KEY_TYPE.to_string());
            }
            2 if !tag.contains("p=") => advice.push(MISSING_KEY.to_string()),
            _ => {}
        }
    }

    if advice.is_empty() {
        return vec![LOOKS_GOOD.to_string()];
    }

    advice
}

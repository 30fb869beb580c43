//! BIMI record advice, including reachability of the logo and VMC assets.

use log::{debug, warn};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};

const NOT_FOUND: &str = "We couldn't detect any active BIMI record for your domain. Please visit https://dmarcguide.globalcyberalliance.org to fix this.";
const MALFORMED: &str =
    "Your BIMI record appears to be malformed as no semicolons seem to be present.";
const HAS_ISSUES: &str = "Your BIMI record has some issues:";
const BAD_VERSION: &str =
    "The beginning of your BIMI record should be v=BIMI1 with specific capitalization.";
const SVG_UNREACHABLE: &str = "Your SVG logo could not be downloaded.";
const SVG_TOO_LARGE: &str = "Your SVG logo exceeds the maximum of 32KB.";
const VMC_UNREACHABLE: &str = "Your VMC certificate could not be downloaded.";
const SVG_MISSING: &str = "Your BIMI record is missing the SVG logo URL.";
const VMC_MISSING: &str = "Your BIMI record is missing the VMC cert URL.";
const LOOKS_GOOD: &str = "Your BIMI record looks good! No further action needed.";

/// Maximum SVG logo size in bytes.
const MAX_SVG_BYTES: u64 = 32 * 1024;

/// Outcome of a HEAD request against a BIMI asset.
enum Asset {
    Unreachable,
    Available { content_length: Option<u64> },
}

async fn head_asset(client: &Client, url: &str) -> Asset {
    let response = match client.head(url).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("[BIMI] HEAD {url} failed: {e}");
            return Asset::Unreachable;
        }
    };

    debug!("[BIMI] HEAD {url} -> {}", response.status());
    if response.status() != StatusCode::OK {
        return Asset::Unreachable;
    }

    // `Response::content_length` reflects the (empty) HEAD body, not the header.
    let content_length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok());

    Asset::Available { content_length }
}

pub async fn check_bimi(client: &Client, bimi: &str) -> Vec<String> {
    if bimi.is_empty() {
        return vec![NOT_FOUND.to_string()];
    }

    if !bimi.contains(';') {
        return vec![MALFORMED.to_string()];
    }

    let mut advice: Vec<String> = Vec::new();
    let mut svg_found = false;
    let mut vmc_found = false;

    for (index, tag) in bimi.split(';').map(str::trim).enumerate() {
        if index == 0 && !tag.contains("v=BIMI1") {
            advice.push(BAD_VERSION.to_string());
        }

        if tag.contains("l=") {
            svg_found = true;
            let url = tag.strip_prefix("l=").unwrap_or(tag);

            match head_asset(client, url).await {
                Asset::Unreachable => {
                    advice.push(SVG_UNREACHABLE.to_string());
                    continue;
                }
                Asset::Available { content_length } => {
                    if content_length.is_some_and(|length| length > MAX_SVG_BYTES) {
                        advice.push(SVG_TOO_LARGE.to_string());
                    }
                }
            }
        }

        if tag.contains("a=") {
            vmc_found = true;
            let url = tag.strip_prefix("a=").unwrap_or(tag);

            if matches!(head_asset(client, url).await, Asset::Unreachable) {
                advice.push(VMC_UNREACHABLE.to_string());
            }
        }
    }

    if !svg_found {
        advice.push(SVG_MISSING.to_string());
    }

    if !vmc_found {
        advice.push(VMC_MISSING.to_string());
    }

    if advice.is_empty() {
        return vec![LOOKS_GOOD.to_string()];
    }

    advice.insert(0, HAS_ISSUES.to_string());
    advice
}

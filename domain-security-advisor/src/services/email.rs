//! Email address shape validation.

use std::sync::LazyLock;

use regex::Regex;

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 254;

static EMAIL_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .ok()
});

/// Checks that `email` looks like an address. No DNS or mailbox checks.
pub fn validate_email(email: &str) -> bool {
    if email.len() < MIN_LENGTH || email.len() > MAX_LENGTH {
        return false;
    }

    EMAIL_REGEX
        .as_ref()
        .is_some_and(|regex| regex.is_match(email))
}

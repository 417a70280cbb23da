use std::sync::LazyLock;

use regex::Regex;

static MSISDN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^62[0-9]{7,14}$").expect("valid msisdn pattern"));

const LOCAL_PREFIX: &str = "08";
const COUNTRY_CODE: &str = "62";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid msisdn: {0:?}")]
pub struct InvalidMsisdn(pub String);

/// Trims the input, rewrites a local `08…` number to `628…` and checks the
/// canonical `62` + 7..=14 digit form.
pub fn normalize(raw: &str) -> Result<String, InvalidMsisdn> {
    let trimmed = raw.trim();
    let msisdn = match trimmed.strip_prefix('0') {
        Some(rest) if trimmed.starts_with(LOCAL_PREFIX) => format!("{COUNTRY_CODE}{rest}"),
        _ => trimmed.to_string(),
    };

    if MSISDN_PATTERN.is_match(&msisdn) {
        Ok(msisdn)
    } else {
        Err(InvalidMsisdn(raw.to_string()))
    }
}

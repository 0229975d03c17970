//! Correlation value normalization
//!
//! Every function returns `None` for a value that cannot be correlated.
//! Normalized values are what the repository stores and compares.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MD5: Regex = Regex::new(r"^[0-9a-f]{32}$").expect("valid md5 regex");
    static ref EMAIL: Regex =
        Regex::new(r"^[^@\s]+@[a-z0-9-]+(\.[a-z0-9-]+)+$").expect("valid email regex");
    static ref DOMAIN: Regex =
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)+$")
            .expect("valid domain regex");
    static ref URL_HOST: Regex =
        Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*://)?(?:[^@/?#]*@)?([^:/?#]+)")
            .expect("valid url regex");
}

/// Lower-case 32-digit hex MD5
pub fn normalize_md5(value: &str) -> Option<String> {
    let md5 = value.trim().to_ascii_lowercase();
    MD5.is_match(&md5).then_some(md5)
}

/// Lower-case e-mail address
pub fn normalize_email(value: &str) -> Option<String> {
    let email = value.trim().trim_matches(|c| c == '<' || c == '>').to_lowercase();
    EMAIL.is_match(&email).then_some(email)
}

/// Digits with an optional leading `+`, between 5 and 20 digits
pub fn normalize_phone(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
    if !(5..=20).contains(&digits.len()) {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else {
        Some(digits)
    }
}

/// Lower-case host name without a leading `www.`
///
/// Accepts a bare domain or a URL.
pub fn normalize_domain(value: &str) -> Option<String> {
    let host = URL_HOST.captures(value.trim())?.get(1)?.as_str();
    let host = host.trim_end_matches('.').to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(host.as_str()).to_string();
    DOMAIN.is_match(&host).then_some(host)
}

/// Trimmed, lower-case USB device id
pub fn normalize_usb_id(value: &str) -> Option<String> {
    let id = value.trim().to_lowercase();
    (!id.is_empty()).then_some(id)
}

/// Upper-case colon separated MAC address
pub fn normalize_mac(value: &str) -> Option<String> {
    let hex: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.' | ' '))
        .collect();
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let hex = hex.to_ascii_uppercase();
    let pairs: Vec<&str> = (0..6).map(|i| &hex[i * 2..i * 2 + 2]).collect();
    Some(pairs.join(":"))
}

/// Trimmed wireless network name, case preserved
pub fn normalize_ssid(value: &str) -> Option<String> {
    let ssid = value.trim();
    (!ssid.is_empty()).then(|| ssid.to_string())
}

fn digits_only(value: &str, min: usize, max: usize) -> Option<String> {
    let compact: String = value
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if !(min..=max).contains(&compact.len()) || !compact.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(compact)
}

pub fn normalize_imei(value: &str) -> Option<String> {
    digits_only(value, 14, 16)
}

pub fn normalize_imsi(value: &str) -> Option<String> {
    digits_only(value, 14, 15)
}

pub fn normalize_iccid(value: &str) -> Option<String> {
    digits_only(value, 18, 22)
}

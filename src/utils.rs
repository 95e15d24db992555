use std::sync::LazyLock;

use hmac::{Hmac, Mac};
use regex::Regex;
use serde_json::Value;
use sha2::Sha256;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

use crate::models::retry::RetryConfig;

type HmacSha256 = Hmac<Sha256>;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

pub async fn retry_with_backoff<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    info!(
                        attempt,
                        max_attempts = config.max_attempts,
                        "Retry succeeded"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if attempt >= config.max_attempts {
                    warn!(
                        max_attempts = config.max_attempts,
                        error = %e,
                        "Retry failed after exhausting all attempts"
                    );
                    return Err(e);
                }

                debug!(
                    attempt,
                    max_attempts = config.max_attempts,
                    delay_ms,
                    error = %e,
                    "Retry attempt failed, backing off"
                );

                let jitter = rand::random_range(-0.1..=0.1);
                let jittered_delay = (delay_ms as f64 * (1.0 + jitter)) as u64;

                sleep(Duration::from_millis(jittered_delay)).await;

                delay_ms = std::cmp::min(delay_ms * config.backoff_multiplier, config.max_delay_ms);
            }
        }
    }
}

/// Number of `%s` placeholders in a subject format string.
pub fn count_placeholders(format: &str) -> usize {
    let mut count = 0;
    let mut chars = format.chars();

    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('s') => count += 1,
                _ => continue,
            }
        }
    }

    count
}

/// Fills `%s` placeholders in order and unescapes `%%`. Placeholders beyond
/// the supplied values are left as-is.
pub fn format_subject(format: &str, values: &[String]) -> String {
    let mut result = String::with_capacity(format.len());
    let mut values = values.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            result.push(c);
            continue;
        }

        match chars.peek() {
            Some('s') => {
                chars.next();
                match values.next() {
                    Some(value) => result.push_str(value),
                    None => result.push_str("%s"),
                }
            }
            Some('%') => {
                chars.next();
                result.push('%');
            }
            _ => result.push('%'),
        }
    }

    result
}

/// Text form of a merge value for subject lines. Booleans become `1` or
/// nothing and whole-valued floats drop their fraction, so `100.00` reads `100`.
pub fn merge_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null | Value::Bool(false) => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

pub fn strip_tags(html: &str) -> String {
    TAG_PATTERN.replace_all(html, "").into_owned()
}

/// Peppered HMAC-SHA256 of a recipient address, hex encoded. Addresses are
/// trimmed and lowercased first so the same mailbox always hashes the same.
pub fn hash_recipient(pepper: &str, address: &str) -> String {
    let normalised = address.trim().to_lowercase();

    let mut mac =
        HmacSha256::new_from_slice(pepper.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(normalised.as_bytes());

    hex::encode(mac.finalize().into_bytes())
}

//! Opaque identifiers for tests and variants.
//!
//! Each id is `prefix + base36(now_ms) + "_" + random suffix`. The suffix
//! comes from the thread-local CSPRNG, so concurrent callers never need to
//! coordinate.

use rand::Rng;
use std::time::{SystemTime, UNIX_EPOCH};

pub const TEST_ID_PREFIX: &str = "abtest_";
pub const VARIANT_ID_PREFIX: &str = "var_";

const SUFFIX_LEN: usize = 10;
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Generate a fresh test id, e.g. `abtest_m3k2x9q1_7hd0w2kz4p`.
pub fn generate_test_id() -> String {
    generate_id(TEST_ID_PREFIX)
}

/// Generate a fresh variant id, e.g. `var_m3k2x9q1_a0s9d8f7g6`.
pub fn generate_variant_id() -> String {
    generate_id(VARIANT_ID_PREFIX)
}

fn generate_id(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{prefix}{}_{suffix}", to_base36(now_ms()))
}

/// Current Unix epoch in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

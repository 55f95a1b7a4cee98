use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::domain::ServiceKind;

const SUFFIX_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const SUFFIX_LEN: usize = 2;
const SERIAL_MODULUS: i64 = 1_000_000;

/// Credential reference assigned exactly once, at approval.
///
/// Shape: `{prefix}-{YYYYMM}-{six digits}-{two base36 chars}`, for example
/// `PSP-202608-417203-K7`. The six-digit serial is the millisecond clock
/// folded into the month segment's resolution, so references stay readable
/// over the phone while collisions within one millisecond are broken by the
/// random suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    pub fn generate(service: ServiceKind, issued_at: DateTime<Utc>) -> ReferenceNumber {
        let mut rng = rand::rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| {
                let index = rng.random_range(0..SUFFIX_ALPHABET.len());
                SUFFIX_ALPHABET[index] as char
            })
            .collect();
        let serial = issued_at.timestamp_millis().rem_euclid(SERIAL_MODULUS);

        ReferenceNumber(format!(
            "{}-{}-{:06}-{}",
            service.reference_prefix(),
            issued_at.format("%Y%m"),
            serial,
            suffix
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks both the service prefix and the overall segment shape.
    pub fn matches_service(&self, service: ServiceKind) -> bool {
        let Some(rest) = self
            .0
            .strip_prefix(service.reference_prefix())
            .and_then(|rest| rest.strip_prefix('-'))
        else {
            return false;
        };

        let mut segments = rest.split('-');
        let (Some(month), Some(serial), Some(suffix), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return false;
        };

        month.len() == 6
            && month.bytes().all(|byte| byte.is_ascii_digit())
            && serial.len() == 6
            && serial.bytes().all(|byte| byte.is_ascii_digit())
            && suffix.len() == SUFFIX_LEN
            && suffix
                .bytes()
                .all(|byte| byte.is_ascii_digit() || byte.is_ascii_uppercase())
    }
}

impl fmt::Display for ReferenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

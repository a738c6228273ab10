//! ISO-8601 duration strings (`PT5M`, `PT1H30M`, `P1DT2H`)
//!
//! Alert windows cross the API boundary as text and live internally as
//! [`std::time::Duration`]. Only the day/time designators are accepted;
//! years, months and weeks have no fixed length and are rejected.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:[.,](\d{1,9}))?S)?)?$")
        .expect("duration pattern is valid")
});

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// Duration parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DurationParseError {
    #[error("'{0}' is not an ISO-8601 duration (expected e.g. PT5M)")]
    Malformed(String),

    #[error("duration '{0}' is out of range")]
    Overflow(String),
}

/// Parse an ISO-8601 duration such as `PT5M` or `P1DT12H`.
pub fn parse_iso8601(input: &str) -> Result<Duration, DurationParseError> {
    let text = input.trim();
    let malformed = || DurationParseError::Malformed(input.to_string());

    // A bare "P" or a dangling "T" designator carries no components
    if text.len() < 2 || text.ends_with(['T', 't']) {
        return Err(malformed());
    }

    let caps = DURATION_PATTERN.captures(text).ok_or_else(malformed)?;

    let field = |idx: usize| -> Result<u64, DurationParseError> {
        caps.get(idx)
            .map(|m| m.as_str().parse::<u64>())
            .transpose()
            .map(|v| v.unwrap_or(0))
            .map_err(|_| DurationParseError::Overflow(input.to_string()))
    };

    let (days, hours, minutes, seconds) = (field(1)?, field(2)?, field(3)?, field(4)?);
    let secs = days
        .checked_mul(SECS_PER_DAY)
        .and_then(|s| s.checked_add(hours.checked_mul(SECS_PER_HOUR)?))
        .and_then(|s| s.checked_add(minutes.checked_mul(SECS_PER_MINUTE)?))
        .and_then(|s| s.checked_add(seconds))
        .ok_or_else(|| DurationParseError::Overflow(input.to_string()))?;

    // Fraction digits are right-padded to nanoseconds: ".5" is 500ms
    let nanos = match caps.get(5) {
        Some(frac) => {
            let digits = frac.as_str();
            let padded = format!("{:0<9}", digits);
            padded.parse::<u32>().map_err(|_| malformed())?
        }
        None => 0,
    };

    Ok(Duration::new(secs, nanos))
}

/// Render a duration the way `java.time.Duration` prints it (`PT5M`, `PT36H`).
pub fn format_iso8601(duration: &Duration) -> String {
    let total = duration.as_secs();
    let nanos = duration.subsec_nanos();

    if total == 0 && nanos == 0 {
        return "PT0S".to_string();
    }

    let hours = total / SECS_PER_HOUR;
    let minutes = (total % SECS_PER_HOUR) / SECS_PER_MINUTE;
    let seconds = total % SECS_PER_MINUTE;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{}H", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}M", minutes));
    }
    if seconds > 0 || nanos > 0 {
        if nanos > 0 {
            let frac = format!("{:09}", nanos);
            out.push_str(&format!("{}.{}S", seconds, frac.trim_end_matches('0')));
        } else {
            out.push_str(&format!("{}S", seconds));
        }
    }
    out
}

/// Serde adapter storing a `Duration` as an ISO-8601 string
pub mod iso8601_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso8601(duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::parse_iso8601(&text).map_err(serde::de::Error::custom)
    }
}

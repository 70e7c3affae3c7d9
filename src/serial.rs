//! SOA serial numbers.
//!
//! Serials are 32 bit counters compared with RFC 1982 circular arithmetic,
//! so a zone can cycle through the whole number space without ever being
//! seen as going backwards.

use chrono::{DateTime, Datelike, Local};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Starting point for zones that have never been assigned a serial.
///
/// It is a date-encoded value that is always below today's date code, so the
/// first build of a new zone lands on `YYYYMMDD00`.
pub const BASELINE_SERIAL: Serial = Serial(2000010100);

/// Lower bound of the Unix-timestamp serial convention.
const TIMESTAMP_FLOOR: u32 = 1_000_000_000;

/// Lower bound of the `YYYYMMDDnn` serial convention.
const DATE_FLOOR: u32 = 2_000_000_000;

/// A zone's SOA serial number.
///
/// Ordering follows [`is_increased`]. Serials half the number space apart
/// are unordered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Serial(pub u32);

impl PartialOrd for Serial {
    fn partial_cmp(&self, other: &Serial) -> Option<Ordering> {
        if self == other {
            Some(Ordering::Equal)
        } else if is_increased(*other, *self) {
            Some(Ordering::Greater)
        } else if is_increased(*self, *other) {
            Some(Ordering::Less)
        } else {
            None
        }
    }
}

impl fmt::Display for Serial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Serial {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Serial)
    }
}

// State files store serials as decimal strings.
impl Serialize for Serial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Serial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Number(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Number(n) => u32::try_from(n)
                .map(Serial)
                .map_err(|_| serde::de::Error::custom(format!("serial {} out of range", n))),
        }
    }
}

/// Returns true if `new` is greater than `old` under RFC 1982 rules.
///
/// Equal serials are never considered increased.
pub fn is_increased(old: Serial, new: Serial) -> bool {
    let diff = new.0.wrapping_sub(old.0);
    diff > 0 && diff < 0x7FFF_FFFF
}

/// Returns the serial that should follow `old`, recognizing the convention
/// already in use.
pub fn next_serial(old: Serial) -> Serial {
    next_serial_at(old, Local::now())
}

/// Like [`next_serial`], with the current time supplied by the caller.
pub fn next_serial_at(old: Serial, now: DateTime<Local>) -> Serial {
    let unix_now = u32::try_from(now.timestamp()).unwrap_or(u32::MAX);
    let today = date_serial(now);

    // This breaks in 2034 when Unix time reaches the YYYYMMDDnn range.
    if TIMESTAMP_FLOOR < old.0 && old.0 < unix_now {
        Serial(unix_now)
    } else if DATE_FLOOR < old.0 && old.0 < today.0 {
        today
    } else {
        Serial(old.0.wrapping_add(1))
    }
}

/// Today's date encoded as `YYYYMMDD00`.
pub fn date_serial(now: DateTime<Local>) -> Serial {
    Serial(now.year() as u32 * 1_000_000 + now.month() * 10_000 + now.day() * 100)
}

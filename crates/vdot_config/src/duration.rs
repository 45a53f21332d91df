//! Human-readable simulation durations such as `1ns` or `500ps`.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use vdot_sim::time::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};

use crate::error::ConfigError;

/// Parses a duration string (e.g. `"100ns"`, `"5us"`) into femtoseconds.
pub fn parse_duration(s: &str) -> Result<u64, ConfigError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(ConfigError::ParseError("empty duration string".into()));
    }

    let digit_end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if digit_end == 0 {
        return Err(ConfigError::ParseError(format!(
            "invalid duration: no numeric value in '{s}'"
        )));
    }

    let number: u64 = s[..digit_end]
        .parse()
        .map_err(|_| ConfigError::ParseError(format!("invalid number in duration '{s}'")))?;

    let multiplier = match s[digit_end..].trim() {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        "" => {
            return Err(ConfigError::ParseError(format!(
                "missing unit in duration '{s}' (use fs, ps, ns, us, ms, or s)"
            )))
        }
        unit => {
            return Err(ConfigError::ParseError(format!(
                "unknown duration unit '{unit}' (use fs, ps, ns, us, ms, or s)"
            )))
        }
    };

    number
        .checked_mul(multiplier)
        .ok_or_else(|| ConfigError::ParseError(format!("duration '{s}' overflows")))
}

/// A duration in femtoseconds.
///
/// Deserializes from a unit string (`"1ns"`) or a bare integer of femtoseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(pub u64);

impl Duration {
    /// Whole nanoseconds.
    pub const fn from_ns(ns: u64) -> Self {
        Self(ns * FS_PER_NS)
    }

    /// Length in femtoseconds.
    pub fn as_fs(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}fs", self.0)
    }
}

impl Serialize for Duration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DurationVisitor;

        impl Visitor<'_> for DurationVisitor {
            type Value = Duration;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a duration such as \"1ns\" or an integer of femtoseconds")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                parse_duration(v).map(Duration).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Duration(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(Duration)
                    .map_err(|_| E::custom(format!("negative duration {v}")))
            }
        }

        deserializer.deserialize_any(DurationVisitor)
    }
}

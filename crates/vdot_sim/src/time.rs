//! Simulated time with femtosecond resolution and delta cycles.
//!
//! [`SimTime`] orders events first by wall-clock simulation time, then by the
//! delta index inside a single instant. Delta cycles carry zero-time
//! propagation: a process woken at `(t, d)` schedules its writes at `(t, d + 1)`.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Femtoseconds per picosecond.
pub const FS_PER_PS: u64 = 1_000;
/// Femtoseconds per nanosecond.
pub const FS_PER_NS: u64 = 1_000_000;
/// Femtoseconds per microsecond.
pub const FS_PER_US: u64 = 1_000_000_000;
/// Femtoseconds per millisecond.
pub const FS_PER_MS: u64 = 1_000_000_000_000;
/// Femtoseconds per second.
pub const FS_PER_S: u64 = 1_000_000_000_000_000;

/// A point in simulated time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimTime {
    /// Simulation time in femtoseconds.
    pub fs: u64,
    /// Delta cycle index within the instant `fs`.
    pub delta: u32,
}

impl SimTime {
    /// Time zero, delta zero.
    pub fn zero() -> Self {
        Self { fs: 0, delta: 0 }
    }

    /// Creates a time from a femtosecond value with delta 0.
    pub fn from_fs(fs: u64) -> Self {
        Self { fs, delta: 0 }
    }

    /// Creates a time from a nanosecond value with delta 0.
    pub fn from_ns(ns: u64) -> Self {
        Self::from_fs(ns * FS_PER_NS)
    }

    /// Returns the next delta cycle at the same instant.
    pub fn next_delta(&self) -> Self {
        Self {
            fs: self.fs,
            delta: self.delta + 1,
        }
    }

    /// Returns the first delta of the instant `duration_fs` later, or `None`
    /// if that instant is not representable.
    pub fn after(&self, duration_fs: u64) -> Option<Self> {
        self.fs.checked_add(duration_fs).map(Self::from_fs)
    }

    /// Converts the femtosecond timestamp to nanoseconds (truncated).
    pub fn to_ns(&self) -> u64 {
        self.fs / FS_PER_NS
    }
}

impl Default for SimTime {
    fn default() -> Self {
        Self::zero()
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fs.cmp(&other.fs).then(self.delta.cmp(&other.delta))
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fs = self.fs;
        let units = [
            (FS_PER_MS, "ms"),
            (FS_PER_US, "us"),
            (FS_PER_NS, "ns"),
            (FS_PER_PS, "ps"),
        ];
        match units
            .iter()
            .find(|(scale, _)| fs >= *scale && fs % scale == 0)
        {
            Some((scale, unit)) => write!(f, "{} {unit}", fs / scale)?,
            None => write!(f, "{fs} fs")?,
        }
        if self.delta > 0 {
            write!(f, "+d{}", self.delta)?;
        }
        Ok(())
    }
}

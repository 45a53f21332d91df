//! Periodic clock description.
//!
//! A [`ClockSpec`] mirrors the usual `clock(name, period, duty, start, posedge_first)`
//! constructor of event-driven simulators. The context turns it into a
//! self-rescheduling stream of edge events once the clock is added.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::time::FS_PER_NS;

/// Shape of a periodic clock waveform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClockSpec {
    /// Clock signal name.
    pub name: String,
    /// Full period in femtoseconds.
    pub period_fs: u64,
    /// Fraction of the period spent high, in `(0, 1)`.
    pub duty_cycle: f64,
    /// Time of the first edge in femtoseconds.
    pub start_fs: u64,
    /// Whether the first edge is rising (initial level low) or falling.
    pub posedge_first: bool,
}

impl Default for ClockSpec {
    /// `clk`: 1 ns period, 50 % duty, first rising edge at time zero.
    fn default() -> Self {
        Self {
            name: "clk".into(),
            period_fs: FS_PER_NS,
            duty_cycle: 0.5,
            start_fs: 0,
            posedge_first: true,
        }
    }
}

impl ClockSpec {
    /// Checks that both phases of the waveform have non-zero length.
    pub fn validate(&self) -> Result<(), SimError> {
        let reject = |reason: &str| SimError::InvalidClock {
            name: self.name.clone(),
            reason: reason.into(),
        };
        if self.period_fs == 0 {
            return Err(reject("period must be non-zero"));
        }
        if !(self.duty_cycle > 0.0 && self.duty_cycle < 1.0) {
            return Err(reject("duty cycle must lie strictly between 0 and 1"));
        }
        if self.high_fs() == 0 || self.low_fs() == 0 {
            return Err(reject("period too short for the requested duty cycle"));
        }
        Ok(())
    }

    /// Length of the high phase.
    pub fn high_fs(&self) -> u64 {
        (self.period_fs as f64 * self.duty_cycle).round() as u64
    }

    /// Length of the low phase.
    pub fn low_fs(&self) -> u64 {
        self.period_fs.saturating_sub(self.high_fs())
    }

    /// Level held before the first edge.
    pub fn initial_level(&self) -> bool {
        !self.posedge_first
    }

    /// Time from an edge that leaves the clock at `level` to the next edge.
    pub(crate) fn phase_after(&self, level: bool) -> u64 {
        if level {
            self.high_fs()
        } else {
            self.low_fs()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_ns_square_wave() {
        let c = ClockSpec::default();
        c.validate().unwrap();
        assert_eq!(c.high_fs(), FS_PER_NS / 2);
        assert_eq!(c.low_fs(), FS_PER_NS / 2);
        assert!(!c.initial_level());
    }

    #[test]
    fn uneven_duty() {
        let c = ClockSpec {
            duty_cycle: 0.25,
            period_fs: 4_000,
            ..ClockSpec::default()
        };
        assert_eq!(c.high_fs(), 1_000);
        assert_eq!(c.low_fs(), 3_000);
        assert_eq!(c.phase_after(true), 1_000);
        assert_eq!(c.phase_after(false), 3_000);
    }

    #[test]
    fn negedge_first_starts_high() {
        let c = ClockSpec {
            posedge_first: false,
            ..ClockSpec::default()
        };
        assert!(c.initial_level());
    }

    #[test]
    fn zero_period_rejected() {
        let c = ClockSpec {
            period_fs: 0,
            ..ClockSpec::default()
        };
        assert!(matches!(c.validate(), Err(SimError::InvalidClock { .. })));
    }

    #[test]
    fn degenerate_duty_rejected() {
        for duty in [0.0, 1.0, 1.5] {
            let c = ClockSpec {
                duty_cycle: duty,
                ..ClockSpec::default()
            };
            assert!(c.validate().is_err(), "duty {duty} should be rejected");
        }
        let tiny = ClockSpec {
            period_fs: 1,
            ..ClockSpec::default()
        };
        assert!(tiny.validate().is_err());
    }
}

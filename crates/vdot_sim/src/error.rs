//! Simulation error types for the discrete-event context.
//!
//! All errors that can occur while constructing, binding, running, or tracing
//! a simulation are represented as variants of [`SimError`].

use std::io;
use std::path::PathBuf;

/// Errors that can occur during simulation setup or execution.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A port array does not have the shape the model was built for.
    #[error("shape mismatch on port '{port}': expected {expected} elements, found {found}")]
    ShapeMismatch {
        /// The port (or bus vector) whose length is wrong.
        port: String,
        /// The number of elements the other side of the binding declares.
        expected: usize,
        /// The number of elements actually supplied.
        found: usize,
    },

    /// The waveform destination could not be created.
    #[error("cannot open trace file '{}': {source}", path.display())]
    TraceOpen {
        /// The path that failed to open.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// An I/O error occurred while writing waveform data.
    #[error("waveform I/O error: {0}")]
    WaveformIo(#[from] io::Error),

    /// A signal handle does not belong to this simulation context.
    #[error("invalid signal reference: {reason}")]
    InvalidSignalRef {
        /// Description of why the signal reference is invalid.
        reason: String,
    },

    /// A clock description cannot produce a waveform.
    #[error("invalid clock '{name}': {reason}")]
    InvalidClock {
        /// The clock signal name.
        name: String,
        /// Why the clock was rejected.
        reason: String,
    },

    /// Too many delta cycles at a single time step, indicating a combinational loop.
    #[error("delta cycle limit exceeded at {fs} fs (max {max_deltas} deltas)")]
    DeltaCycleLimit {
        /// The time in femtoseconds where the limit was hit.
        fs: u64,
        /// The maximum number of delta cycles allowed.
        max_deltas: u32,
    },

    /// Simulated time would pass the largest representable instant.
    #[error("time overflow: cannot advance {duration_fs} fs past {fs} fs")]
    TimeOverflow {
        /// The time in femtoseconds the advance started from.
        fs: u64,
        /// The requested duration in femtoseconds.
        duration_fs: u64,
    },

    /// The context was advanced after its models were finalized.
    #[error("simulation already finalized at {time_fs} fs")]
    Finalized {
        /// Time in femtoseconds when finalization happened.
        time_fs: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_display() {
        let e = SimError::ShapeMismatch {
            port: "a_i".into(),
            expected: 10000,
            found: 9999,
        };
        assert_eq!(
            e.to_string(),
            "shape mismatch on port 'a_i': expected 10000 elements, found 9999"
        );
    }

    #[test]
    fn trace_open_display() {
        let e = SimError::TraceOpen {
            path: PathBuf::from("/nope/DotProduct_tb.vcd"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such directory"),
        };
        let msg = e.to_string();
        assert!(msg.starts_with("cannot open trace file '/nope/DotProduct_tb.vcd'"));
        assert!(msg.contains("no such directory"));
    }

    #[test]
    fn waveform_io_display() {
        let e = SimError::WaveformIo(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(e.to_string().contains("waveform I/O error"));
    }

    #[test]
    fn invalid_signal_ref_display() {
        let e = SimError::InvalidSignalRef {
            reason: "out of range".into(),
        };
        assert_eq!(e.to_string(), "invalid signal reference: out of range");
    }

    #[test]
    fn invalid_clock_display() {
        let e = SimError::InvalidClock {
            name: "clk".into(),
            reason: "zero period".into(),
        };
        assert_eq!(e.to_string(), "invalid clock 'clk': zero period");
    }

    #[test]
    fn delta_cycle_limit_display() {
        let e = SimError::DeltaCycleLimit {
            fs: 100,
            max_deltas: 10000,
        };
        assert_eq!(
            e.to_string(),
            "delta cycle limit exceeded at 100 fs (max 10000 deltas)"
        );
    }

    #[test]
    fn time_overflow_display() {
        let e = SimError::TimeOverflow {
            fs: 3_000_000,
            duration_fs: u64::MAX,
        };
        assert_eq!(
            e.to_string(),
            format!("time overflow: cannot advance {} fs past 3000000 fs", u64::MAX)
        );
    }

    #[test]
    fn finalized_display() {
        let e = SimError::Finalized { time_fs: 103 };
        assert_eq!(e.to_string(), "simulation already finalized at 103 fs");
    }
}

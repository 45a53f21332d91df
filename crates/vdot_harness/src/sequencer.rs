//! Deterministic reset and stimulus sequencing.
//!
//! The sequencer is the only writer of reset and the input vectors. It runs
//! the fixed protocol one step per call: zero-time elaboration, one period,
//! assert reset, one period, release reset, one period, drive every input at
//! once, then wait out the settle window. [`StimulusSequencer::drive_inputs`]
//! takes a [`ResetReleased`] token that only [`StimulusSequencer::reset`]
//! produces, so inputs cannot be driven before reset has been released.

use std::fmt;

use vdot_sim::{SimContext, SimError, SimTime};

use crate::bus::HarnessPorts;

/// Values for the two input vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stimulus {
    a: Vec<u32>,
    b: Vec<u32>,
}

impl Stimulus {
    /// Every element of A set to `a_value`, every element of B to `b_value`.
    pub fn constant(size: usize, a_value: u32, b_value: u32) -> Self {
        Self {
            a: vec![a_value; size],
            b: vec![b_value; size],
        }
    }

    /// Arbitrary vectors of equal length.
    pub fn from_vectors(a: Vec<u32>, b: Vec<u32>) -> Result<Self, SimError> {
        if a.len() != b.len() {
            return Err(SimError::ShapeMismatch {
                port: "b_i".into(),
                expected: a.len(),
                found: b.len(),
            });
        }
        Ok(Self { a, b })
    }

    /// Number of elements per vector.
    pub fn len(&self) -> usize {
        self.a.len()
    }

    /// Whether the vectors are empty.
    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Values for vector A.
    pub fn a(&self) -> &[u32] {
        &self.a
    }

    /// Values for vector B.
    pub fn b(&self) -> &[u32] {
        &self.b
    }

    /// `Σ a[i] * b[i]` modulo 2^32.
    pub fn expected(&self) -> u32 {
        self.a
            .iter()
            .zip(&self.b)
            .fold(0u32, |acc, (&a, &b)| acc.wrapping_add(a.wrapping_mul(b)))
    }
}

/// One step of the protocol, as recorded in the [`StimulusLog`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StimulusAction {
    /// Zero-time step before anything is written.
    Elaborate,
    /// `reset_n` driven to 0.
    AssertReset,
    /// `reset_n` driven to 1.
    ReleaseReset,
    /// All input elements driven at one instant.
    DriveInputs {
        /// Elements per vector.
        elements: usize,
    },
    /// Settle window started.
    Settle {
        /// Length of the window in clock periods.
        cycles: u64,
    },
    /// Result read back.
    Sample {
        /// The value read.
        value: u32,
    },
}

impl fmt::Display for StimulusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elaborate => write!(f, "elaborate"),
            Self::AssertReset => write!(f, "assert reset"),
            Self::ReleaseReset => write!(f, "release reset"),
            Self::DriveInputs { elements } => write!(f, "drive {elements} input pairs"),
            Self::Settle { cycles } => write!(f, "settle {cycles} cycles"),
            Self::Sample { value } => write!(f, "sample {value}"),
        }
    }
}

/// A protocol step and the simulated time it was issued at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LogEntry {
    /// Time of the write or of the start of the wait.
    pub time: SimTime,
    /// What happened.
    pub action: StimulusAction,
}

/// Ordered record of everything the sequencer did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StimulusLog {
    entries: Vec<LogEntry>,
}

impl StimulusLog {
    fn push(&mut self, time: SimTime, action: StimulusAction) {
        tracing::debug!(%time, %action, "stimulus");
        self.entries.push(LogEntry { time, action });
    }

    /// All entries in issue order.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Time of the first entry matching `pred`.
    pub fn time_of(&self, pred: impl Fn(&StimulusAction) -> bool) -> Option<SimTime> {
        self.entries
            .iter()
            .find(|e| pred(&e.action))
            .map(|e| e.time)
    }

    /// Time of the reset release, if it happened.
    pub fn reset_released_at(&self) -> Option<SimTime> {
        self.time_of(|a| *a == StimulusAction::ReleaseReset)
    }

    /// Time inputs were driven, if they were.
    pub fn inputs_driven_at(&self) -> Option<SimTime> {
        self.time_of(|a| matches!(a, StimulusAction::DriveInputs { .. }))
    }
}

/// Proof that reset has been asserted, released and given one period to
/// propagate.
#[derive(Debug)]
pub struct ResetReleased {
    released_at: SimTime,
}

impl ResetReleased {
    /// When `reset_n` went high.
    pub fn released_at(&self) -> SimTime {
        self.released_at
    }
}

/// Drives reset and inputs according to the fixed protocol.
#[derive(Debug)]
pub struct StimulusSequencer {
    ports: HarnessPorts,
    period_fs: u64,
    log: StimulusLog,
}

impl StimulusSequencer {
    /// Takes ownership of the harness-side writers.
    pub fn new(ports: HarnessPorts, period_fs: u64) -> Self {
        Self {
            ports,
            period_fs,
            log: StimulusLog::default(),
        }
    }

    /// Step 1: settle time zero without writing anything.
    pub fn elaborate(&mut self, ctx: &mut SimContext) -> Result<(), SimError> {
        self.log.push(ctx.current_time(), StimulusAction::Elaborate);
        ctx.advance(0)
    }

    /// Steps 2 to 4: hold reset for one period, release it, and let the
    /// release propagate for one more period.
    pub fn reset(&mut self, ctx: &mut SimContext) -> Result<ResetReleased, SimError> {
        ctx.advance(self.period_fs)?;
        ctx.write(&self.ports.reset_n, false);
        self.log.push(ctx.current_time(), StimulusAction::AssertReset);

        ctx.advance(self.period_fs)?;
        ctx.write(&self.ports.reset_n, true);
        let released_at = ctx.current_time();
        self.log.push(released_at, StimulusAction::ReleaseReset);

        ctx.advance(self.period_fs)?;
        Ok(ResetReleased { released_at })
    }

    /// Step 5: writes every element of both vectors at the current instant.
    ///
    /// An empty stimulus writes nothing. Fails with
    /// [`SimError::ShapeMismatch`] if the stimulus is not as wide as the bus.
    pub fn drive_inputs(
        &mut self,
        ctx: &mut SimContext,
        released: ResetReleased,
        stimulus: &Stimulus,
    ) -> Result<(), SimError> {
        if stimulus.len() != self.ports.a.len() {
            return Err(SimError::ShapeMismatch {
                port: "a_i".into(),
                expected: self.ports.a.len(),
                found: stimulus.len(),
            });
        }
        if stimulus.is_empty() {
            tracing::debug!("empty stimulus, no inputs driven");
            return Ok(());
        }
        for (writer, &value) in self.ports.a.iter().zip(stimulus.a()) {
            ctx.write(writer, value);
        }
        for (writer, &value) in self.ports.b.iter().zip(stimulus.b()) {
            ctx.write(writer, value);
        }
        let now = ctx.current_time();
        debug_assert!(now > released.released_at);
        self.log.push(
            now,
            StimulusAction::DriveInputs {
                elements: stimulus.len(),
            },
        );
        Ok(())
    }

    /// Step 6: advances `cycles` clock periods.
    pub fn settle(&mut self, ctx: &mut SimContext, cycles: u64) -> Result<(), SimError> {
        let window_fs = cycles
            .checked_mul(self.period_fs)
            .ok_or(SimError::TimeOverflow {
                fs: ctx.current_time().fs,
                duration_fs: u64::MAX,
            })?;
        self.log
            .push(ctx.current_time(), StimulusAction::Settle { cycles });
        ctx.advance(window_fs)
    }

    /// Reads the result and records it.
    pub fn sample(&mut self, ctx: &SimContext) -> u32 {
        let value = ctx.read(self.ports.result);
        self.log
            .push(ctx.current_time(), StimulusAction::Sample { value });
        value
    }

    /// Everything issued so far.
    pub fn log(&self) -> &StimulusLog {
        &self.log
    }

    /// Consumes the sequencer, returning its log.
    pub fn into_log(self) -> StimulusLog {
        self.log
    }
}

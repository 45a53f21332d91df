//! Top-level orchestration of one testbench run.
//!
//! [`Harness`] walks a fixed state machine:
//!
//! ```text
//! Constructed -> Elaborated -> Tracing -> Reset -> Running -> Settled -> Finalized -> Closed
//! ```
//!
//! Each step method performs exactly one transition and fails with
//! [`HarnessError::Transition`] when called out of order. [`Harness::run`]
//! performs them all.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use vdot_config::{validate_config, HarnessConfig};
use vdot_dut::{DotProduct, DotProductParams};
use vdot_sim::{Model, SimContext, SimTime, TraceRegistry};

use crate::bus::{bind, SignalBus};
use crate::sequencer::{ResetReleased, Stimulus, StimulusLog, StimulusSequencer};
use crate::HarnessError;

/// Lifecycle states of a [`Harness`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarnessState {
    /// Bus, clock and DUT exist; time has not moved.
    Constructed,
    /// The zero-time step has been taken.
    Elaborated,
    /// The trace is open and attached (or tracing is disabled).
    Tracing,
    /// Reset has been asserted and released.
    Reset,
    /// Inputs have been driven.
    Running,
    /// The settle window has elapsed and the result was sampled.
    Settled,
    /// The DUT has been finalized and the context sealed.
    Finalized,
    /// The trace is closed.
    Closed,
}

impl fmt::Display for HarnessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Constructed => "constructed",
            Self::Elaborated => "elaborated",
            Self::Tracing => "tracing",
            Self::Reset => "reset",
            Self::Running => "running",
            Self::Settled => "settled",
            Self::Finalized => "finalized",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct HarnessReport {
    /// Value of `result_o` at the end of the settle window.
    pub result: u32,
    /// `Σ A[i] * B[i]` modulo 2^32 for the driven stimulus.
    pub expected: u32,
    /// Where the waveform was written, if tracing was enabled.
    pub trace_path: Option<PathBuf>,
    /// Simulated time when the run ended.
    pub final_time: SimTime,
    /// Delta cycles executed.
    pub total_deltas: u64,
    /// Everything the sequencer did.
    pub log: StimulusLog,
}

impl HarnessReport {
    /// Whether the sampled result matches the closed-form sum.
    pub fn passed(&self) -> bool {
        self.result == self.expected
    }
}

/// One testbench run.
#[derive(Debug)]
pub struct Harness {
    state: HarnessState,
    ctx: SimContext,
    config: HarnessConfig,
    stimulus: Stimulus,
    sequencer: StimulusSequencer,
    dut: Option<DotProduct>,
    released: Option<ResetReleased>,
    trace_path: Option<PathBuf>,
    result: Option<u32>,
}

impl Harness {
    /// Builds a harness driving the constant vectors from `config`.
    pub fn new(config: HarnessConfig) -> Result<Self, HarnessError> {
        let stimulus = Stimulus::constant(
            config.vectors.size,
            config.vectors.a_value,
            config.vectors.b_value,
        );
        Self::with_stimulus(config, stimulus)
    }

    /// Builds a harness driving arbitrary vectors.
    ///
    /// The bus is sized from `stimulus`; `config.vectors` is ignored.
    pub fn with_stimulus(config: HarnessConfig, stimulus: Stimulus) -> Result<Self, HarnessError> {
        validate_config(&config)?;
        let mut ctx = SimContext::new();
        ctx.set_max_delta(config.sim.max_deltas);

        let clock = config.clock_spec();
        let period_fs = clock.period_fs;
        let bus = SignalBus::new(&mut ctx, clock, stimulus.len())?;

        let mut params = DotProductParams::new(stimulus.len());
        if let Some(latency) = config.dut.latency {
            params = params.with_latency(latency);
        }
        let (ports, dut) = bind(&mut ctx, bus, &config.dut.name, params)?;
        tracing::debug!(
            width = stimulus.len(),
            latency = params.latency,
            settle_cycles = config.stimulus.settle_cycles,
            "harness constructed"
        );

        Ok(Self {
            state: HarnessState::Constructed,
            ctx,
            sequencer: StimulusSequencer::new(ports, period_fs),
            stimulus,
            config,
            dut: Some(dut),
            released: None,
            trace_path: None,
            result: None,
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HarnessState {
        self.state
    }

    /// The simulation context.
    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    /// The DUT, until it is finalized.
    pub fn dut(&self) -> Option<&DotProduct> {
        self.dut.as_ref()
    }

    fn transition(&mut self, from: HarnessState, to: HarnessState) -> Result<(), HarnessError> {
        if self.state != from {
            return Err(HarnessError::Transition {
                from: self.state,
                to,
            });
        }
        tracing::debug!(%from, %to, time = %self.ctx.current_time(), "harness transition");
        self.state = to;
        Ok(())
    }

    /// Takes the zero-time step.
    pub fn elaborate(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::Constructed, HarnessState::Elaborated)?;
        self.sequencer.elaborate(&mut self.ctx)?;
        Ok(())
    }

    /// Registers the DUT's signals and opens the waveform file.
    pub fn open_trace(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::Elaborated, HarnessState::Tracing)?;
        if !self.config.trace.enabled {
            tracing::debug!("tracing disabled");
            return Ok(());
        }
        let dut = self.dut.as_ref().ok_or(HarnessError::Transition {
            from: HarnessState::Finalized,
            to: HarnessState::Tracing,
        })?;
        let mut registry = TraceRegistry::new();
        dut.trace(&mut registry, self.config.trace.depth);
        let path = self.config.trace_path();
        let session = registry.open(&path)?;
        self.ctx.attach_trace(session)?;
        self.trace_path = Some(path);
        Ok(())
    }

    /// Asserts and releases reset.
    pub fn reset(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::Tracing, HarnessState::Reset)?;
        self.released = Some(self.sequencer.reset(&mut self.ctx)?);
        Ok(())
    }

    /// Drives both input vectors.
    pub fn drive(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::Reset, HarnessState::Running)?;
        let released = self.released.take().ok_or(HarnessError::Transition {
            from: HarnessState::Tracing,
            to: HarnessState::Running,
        })?;
        self.sequencer
            .drive_inputs(&mut self.ctx, released, &self.stimulus)?;
        Ok(())
    }

    /// Waits out the settle window and samples the result.
    pub fn settle(&mut self) -> Result<u32, HarnessError> {
        self.transition(HarnessState::Running, HarnessState::Settled)?;
        self.sequencer
            .settle(&mut self.ctx, self.config.stimulus.settle_cycles)?;
        let result = self.sequencer.sample(&self.ctx);
        self.result = Some(result);
        Ok(result)
    }

    /// Finalizes the DUT and freezes simulated time.
    pub fn finalize(&mut self) -> Result<(), HarnessError> {
        self.transition(HarnessState::Settled, HarnessState::Finalized)?;
        if let Some(dut) = self.dut.take() {
            dut.finalize(&mut self.ctx)?;
        }
        self.ctx.seal();
        Ok(())
    }

    /// Flushes and closes the waveform, returning the report.
    pub fn close(mut self) -> Result<HarnessReport, HarnessError> {
        self.transition(HarnessState::Finalized, HarnessState::Closed)?;
        if let Some(mut session) = self.ctx.detach_trace()? {
            session.flush()?;
            let changes = session.change_count();
            session.close()?;
            tracing::debug!(changes, path = ?self.trace_path, "trace closed");
        }

        let expected = self.stimulus.expected();
        let result = self.result.unwrap_or_default();
        if result != expected {
            tracing::warn!(result, expected, "sampled result differs from the closed-form sum");
        }
        Ok(HarnessReport {
            result,
            expected,
            trace_path: self.trace_path,
            final_time: self.ctx.current_time(),
            total_deltas: self.ctx.total_deltas(),
            log: self.sequencer.into_log(),
        })
    }

    /// Runs every step in order.
    pub fn run(mut self) -> Result<HarnessReport, HarnessError> {
        self.elaborate()?;
        self.open_trace()?;
        self.reset()?;
        self.drive()?;
        self.settle()?;
        self.finalize()?;
        self.close()
    }

    /// Runs every step, printing the start, result and done lines to `out`.
    pub fn run_with_output<W: Write>(self, out: &mut W) -> Result<HarnessReport, HarnessError> {
        writeln!(out, "VDotProduct start!")?;
        let report = self.run()?;
        writeln!(out, "Dot Product: {}", report.result)?;
        writeln!(out, "VDotProduct done!")?;
        Ok(report)
    }
}

//! Verification harness for the `DotProduct` unit.
//!
//! Wires a clock, an active-low reset and two input vectors to a
//! [`vdot_dut::DotProduct`] instance, runs the fixed reset and stimulus
//! protocol, samples the result after a settle window, and records a VCD
//! trace of the run.
//!
//! # Usage
//!
//! ```ignore
//! use vdot_harness::Harness;
//!
//! let report = Harness::new(vdot_config::HarnessConfig::default())?.run()?;
//! assert_eq!(report.result, 20_000);
//! ```

#![warn(missing_docs)]

pub mod bus;
pub mod driver;
pub mod sequencer;

pub use bus::{bind, HarnessPorts, SignalBus};
pub use driver::{Harness, HarnessReport, HarnessState};
pub use sequencer::{
    LogEntry, ResetReleased, Stimulus, StimulusAction, StimulusLog, StimulusSequencer,
};

use vdot_config::ConfigError;
use vdot_sim::SimError;

/// Errors that abort a harness run.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Construction, binding, simulation or tracing failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A lifecycle step was invoked in the wrong state.
    #[error("cannot move to '{to}' from '{from}'")]
    Transition {
        /// State the harness was in.
        from: HarnessState,
        /// State the caller asked for.
        to: HarnessState,
    },

    /// Writing the report lines failed.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

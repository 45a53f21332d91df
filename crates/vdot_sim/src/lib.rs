//! Discrete-event simulation context for the VDotProduct harness.
//!
//! This crate provides the minimal event-driven machinery a cycle-accurate
//! testbench needs: typed signals with single-writer handles, a time-ordered
//! event queue with delta cycles, free-running clocks, edge-triggered
//! processes, and VCD waveform tracing.
//!
//! # Architecture
//!
//! [`SimContext`] is the only place simulated time lives. Components receive
//! it by `&mut` and never hold it. Signals are created through the context,
//! which hands back a [`Writer`]; readers are derived from the writer and can
//! be copied freely. Device models register [`Process`]es whose writes land
//! one delta after the event that woke them.
//!
//! # Usage
//!
//! ```ignore
//! use vdot_sim::{ClockSpec, SimContext, TraceRegistry};
//!
//! let mut ctx = SimContext::new();
//! let clk = ctx.add_clock(ClockSpec::default())?;
//! ctx.advance(0)?;
//! let mut registry = TraceRegistry::new();
//! registry.add(clk, "clk");
//! ctx.attach_trace(registry.open("out.vcd")?)?;
//! ctx.advance(10 * vdot_sim::time::FS_PER_NS)?;
//! if let Some(session) = ctx.detach_trace()? {
//!     session.close()?;
//! }
//! ```
//!
//! # Modules
//!
//! - `time`: Femtosecond-precision time with delta cycles
//! - `signal`: Signal handles, state, and edge triggers
//! - `clock`: Clock waveform description
//! - `model`: Process and model contracts
//! - `kernel`: Event queue and delta-cycle loop
//! - `waveform`: VCD recorder
//! - `trace`: Trace registration and session lifecycle
//! - `vcd_loader`: Reading VCD files back

#![warn(missing_docs)]

pub mod clock;
pub mod error;
pub mod kernel;
pub mod model;
pub mod signal;
pub mod time;
pub mod trace;
pub mod vcd_loader;
pub mod waveform;

pub use clock::ClockSpec;
pub use error::SimError;
pub use kernel::{ProcessId, SimContext, DEFAULT_MAX_DELTAS};
pub use model::{EvalContext, Model, Process, Updates};
pub use signal::{Edge, Reader, SignalId, SignalType, Trigger, Writer};
pub use time::SimTime;
pub use trace::{TraceRegistry, TraceSession, DEFAULT_TRACE_PATH, FULL_DEPTH};
pub use vcd_loader::{load_vcd, load_vcd_file, LoadedWaveform, VcdLoadError};
pub use waveform::{VcdRecorder, WaveformRecorder};

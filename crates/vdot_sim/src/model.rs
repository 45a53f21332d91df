//! Process and model contracts.
//!
//! A [`Process`] is the unit the kernel schedules: it declares a sensitivity
//! list and, when woken, reads signals through an [`EvalContext`] and drives
//! its outputs through [`Updates`]. Writes land one delta later.
//!
//! A [`Model`] is the harness-facing side of a device under test: it knows
//! how to register its signals for tracing and how to shut itself down.

use std::collections::HashSet;

use crate::error::SimError;
use crate::kernel::SimContext;
use crate::signal::{Reader, SignalId, SignalState, SignalType, Trigger, Writer};
use crate::time::SimTime;
use crate::trace::TraceRegistry;

/// Read-only view of the signal table handed to a process during evaluation.
pub struct EvalContext<'a> {
    pub(crate) signals: &'a [SignalState],
    pub(crate) changed: &'a HashSet<SignalId>,
    pub(crate) time: SimTime,
}

impl EvalContext<'_> {
    /// Current value of a signal.
    ///
    /// # Panics
    ///
    /// Panics if `reader` was created by a different context.
    pub fn read<T: SignalType>(&self, reader: Reader<T>) -> T {
        T::from_bits(self.signals[reader.id().index()].value)
    }

    /// Whether the signal changed in the delta that woke this process.
    pub fn changed<T: SignalType>(&self, reader: Reader<T>) -> bool {
        self.changed.contains(&reader.id())
    }

    /// Whether `reader` saw a 0 → 1 transition in the waking delta.
    pub fn rose(&self, reader: Reader<bool>) -> bool {
        if !self.changed(reader) {
            return false;
        }
        let sig = &self.signals[reader.id().index()];
        sig.previous_value & 1 == 0 && sig.value & 1 == 1
    }

    /// The time of the waking delta.
    pub fn time(&self) -> SimTime {
        self.time
    }
}

/// Writes collected from a process evaluation.
#[derive(Debug, Default)]
pub struct Updates {
    pub(crate) pending: Vec<(SignalId, u64)>,
}

impl Updates {
    /// Creates an empty update buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drives `value` onto the signal owned by `writer` in the next delta.
    pub fn drive<T: SignalType>(&mut self, writer: &Writer<T>, value: T) {
        self.pending.push((writer.id(), value.to_bits()));
    }

    /// Number of buffered writes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether no write has been buffered.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A schedulable piece of behaviour.
pub trait Process {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Signals and edges that wake this process.
    fn triggers(&self) -> Vec<Trigger>;

    /// Runs the process body once.
    fn evaluate(&mut self, ctx: &EvalContext<'_>, updates: &mut Updates) -> Result<(), SimError>;

    /// Runs once when the process is retired. Default: nothing.
    fn finalize(&mut self, _ctx: &EvalContext<'_>) {}
}

/// Harness-facing lifecycle of a simulatable model.
pub trait Model {
    /// Instance name, used as the top trace scope.
    fn name(&self) -> &str;

    /// Registers the model's signals with `registry`, down to `depth` hierarchy levels.
    ///
    /// Level 1 is the model's own ports; deeper levels hold internal state.
    /// A depth of 0 registers nothing.
    fn trace(&self, registry: &mut TraceRegistry, depth: u32);

    /// Retires the model's processes. Consuming `self` rules out further use.
    fn finalize(self, ctx: &mut SimContext) -> Result<(), SimError>
    where
        Self: Sized;
}

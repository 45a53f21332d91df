//! Simulation context with event queue, clocks, and delta-cycle loop.
//!
//! [`SimContext`] owns simulated time and everything that changes with it:
//! the signal table, a min-heap of scheduled events, clock generators, the
//! registered processes, and an optional attached [`TraceSession`].
//!
//! Time only moves through [`SimContext::advance`]. Within one instant,
//! events are grouped into delta cycles: all updates of a delta are applied
//! first, then every process whose trigger fired is evaluated, and the writes
//! those processes produce are scheduled for the following delta.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::clock::ClockSpec;
use crate::error::SimError;
use crate::model::{EvalContext, Process, Updates};
use crate::signal::{Reader, SignalId, SignalState, SignalType, Trigger, Writer};
use crate::time::SimTime;
use crate::trace::TraceSession;

/// Default maximum number of delta cycles per instant.
pub const DEFAULT_MAX_DELTAS: u32 = 10_000;

#[derive(Debug, Clone, Copy)]
enum EventKind {
    /// Drive a new value onto a signal.
    Update { signal: SignalId, value: u64 },
    /// Toggle the clock at this index and schedule its next edge.
    ClockEdge { clock: usize },
}

/// An event scheduled in the simulation event queue.
#[derive(Debug, Clone, Copy)]
struct SimEvent {
    time: SimTime,
    /// Scheduling order, used to keep same-delta events FIFO.
    seq: u64,
    kind: EventKind,
}

impl PartialEq for SimEvent {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for SimEvent {}

impl PartialOrd for SimEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time).then(self.seq.cmp(&other.seq))
    }
}

/// Handle to a registered process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProcessId(usize);

struct ProcessSlot {
    process: Box<dyn Process>,
    triggers: Vec<Trigger>,
    active: bool,
}

/// A clock generator; the kernel is the sole writer of its signal.
struct ClockGen {
    spec: ClockSpec,
    signal: SignalId,
}

/// The simulation context: time, signals, event queue, and processes.
pub struct SimContext {
    current_time: SimTime,
    event_queue: BinaryHeap<Reverse<SimEvent>>,
    next_seq: u64,
    signals: Vec<SignalState>,
    processes: Vec<ProcessSlot>,
    /// Signal → indices of processes with a trigger on it.
    sensitivity_map: HashMap<SignalId, Vec<usize>>,
    clocks: Vec<ClockGen>,
    trace: Option<TraceSession>,
    max_delta_per_step: u32,
    total_deltas: u64,
    sealed_at: Option<SimTime>,
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SimContext {
    /// Creates an empty context at time zero.
    pub fn new() -> Self {
        Self {
            current_time: SimTime::zero(),
            event_queue: BinaryHeap::new(),
            next_seq: 0,
            signals: Vec::new(),
            processes: Vec::new(),
            sensitivity_map: HashMap::new(),
            clocks: Vec::new(),
            trace: None,
            max_delta_per_step: DEFAULT_MAX_DELTAS,
            total_deltas: 0,
            sealed_at: None,
        }
    }

    /// Sets the maximum number of delta cycles per instant.
    pub fn set_max_delta(&mut self, max: u32) {
        self.max_delta_per_step = max;
    }

    /// Returns the current simulation time.
    pub fn current_time(&self) -> SimTime {
        self.current_time
    }

    /// Total delta cycles executed so far.
    pub fn total_deltas(&self) -> u64 {
        self.total_deltas
    }

    /// Number of signals created.
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of registered processes, retired ones included.
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// State of a signal by ID.
    pub fn signal_state(&self, id: SignalId) -> Option<&SignalState> {
        self.signals.get(id.index())
    }

    /// Finds a signal by the name it was created with.
    pub fn find_signal(&self, name: &str) -> Option<SignalId> {
        self.signals
            .iter()
            .position(|s| s.name == name)
            .map(|i| SignalId::from_raw(i as u32))
    }

    /// Creates a signal and returns its only writer.
    pub fn create_signal<T: SignalType>(&mut self, name: impl Into<String>, init: T) -> Writer<T> {
        let id = self.alloc_signal(name.into(), T::WIDTH, init.to_bits());
        Writer::new(id)
    }

    /// Creates `len` signals named `name[i]`, all starting at `init`.
    pub fn create_array<T: SignalType>(
        &mut self,
        name: &str,
        len: usize,
        init: T,
    ) -> Box<[Writer<T>]> {
        (0..len)
            .map(|i| self.create_signal(format!("{name}[{i}]"), init))
            .collect()
    }

    fn alloc_signal(&mut self, name: String, width: u32, init: u64) -> SignalId {
        let id = SignalId::from_raw(self.signals.len() as u32);
        self.signals.push(SignalState::new(name, width, init));
        id
    }

    /// Adds a free-running clock and returns a read view of it.
    ///
    /// The first edge is scheduled at `spec.start_fs` (relative to time zero).
    pub fn add_clock(&mut self, spec: ClockSpec) -> Result<Reader<bool>, SimError> {
        spec.validate()?;
        let signal = self.alloc_signal(spec.name.clone(), 1, u64::from(spec.initial_level()));
        let first_edge = SimTime::from_fs(spec.start_fs.max(self.current_time.fs));
        let clock = self.clocks.len();
        tracing::debug!(
            name = %spec.name,
            period_fs = spec.period_fs,
            first_edge = %first_edge,
            "added clock"
        );
        self.clocks.push(ClockGen { spec, signal });
        self.schedule(first_edge, EventKind::ClockEdge { clock });
        Ok(Reader::new(signal))
    }

    /// Registers a process and indexes its sensitivity list.
    pub fn add_process(&mut self, process: Box<dyn Process>) -> ProcessId {
        let idx = self.processes.len();
        let triggers = process.triggers();
        for t in &triggers {
            let procs = self.sensitivity_map.entry(t.signal).or_default();
            if !procs.contains(&idx) {
                procs.push(idx);
            }
        }
        tracing::debug!(process = process.name(), triggers = triggers.len(), "added process");
        self.processes.push(ProcessSlot {
            process,
            triggers,
            active: true,
        });
        ProcessId(idx)
    }

    /// Runs the process's finalizer and stops it from being scheduled again.
    pub fn retire_process(&mut self, id: ProcessId) {
        let Some(slot) = self.processes.get_mut(id.0) else {
            return;
        };
        if !slot.active {
            return;
        }
        slot.active = false;
        let changed = HashSet::new();
        let ctx = EvalContext {
            signals: &self.signals,
            changed: &changed,
            time: self.current_time,
        };
        slot.process.finalize(&ctx);
        for procs in self.sensitivity_map.values_mut() {
            procs.retain(|&p| p != id.0);
        }
        tracing::debug!(process = slot.process.name(), "retired process");
    }

    /// Whether the process is still scheduled.
    pub fn is_active(&self, id: ProcessId) -> bool {
        self.processes.get(id.0).is_some_and(|s| s.active)
    }

    /// Freezes the context: any later [`advance`](Self::advance) fails.
    pub fn seal(&mut self) {
        if self.sealed_at.is_none() {
            self.sealed_at = Some(self.current_time);
        }
    }

    /// Schedules `value` onto the writer's signal at the current instant.
    ///
    /// All writes issued between two advances land in the same delta and are
    /// applied together, before any process observes them.
    pub fn write<T: SignalType>(&mut self, writer: &Writer<T>, value: T) {
        let at = SimTime::from_fs(self.current_time.fs);
        self.schedule(
            at,
            EventKind::Update {
                signal: writer.id(),
                value: value.to_bits(),
            },
        );
    }

    /// Current value of a signal.
    ///
    /// # Panics
    ///
    /// Panics if `reader` was created by a different context.
    pub fn read<T: SignalType>(&self, reader: Reader<T>) -> T {
        T::from_bits(self.signals[reader.id().index()].value)
    }

    /// Attaches a trace and dumps the current value of every traced signal.
    pub fn attach_trace(&mut self, mut session: TraceSession) -> Result<(), SimError> {
        let initial: Vec<(SignalId, u64)> = self
            .signals
            .iter()
            .enumerate()
            .map(|(i, s)| (SignalId::from_raw(i as u32), s.value))
            .filter(|(id, _)| session.is_traced(*id))
            .collect();
        session.dump_initial(self.current_time.fs, &initial)?;
        self.trace = Some(session);
        Ok(())
    }

    /// Detaches the trace, stamping the current time as its last instant.
    pub fn detach_trace(&mut self) -> Result<Option<TraceSession>, SimError> {
        match self.trace.take() {
            Some(mut session) => {
                session.mark_time(self.current_time.fs)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    /// Whether a trace session is attached.
    pub fn is_tracing(&self) -> bool {
        self.trace.is_some()
    }

    /// Advances simulated time by `duration_fs`.
    ///
    /// A zero duration settles every delta pending at the current instant.
    /// A positive duration processes events in `[now, now + duration)` and
    /// leaves time at `now + duration`; events due exactly then stay queued.
    pub fn advance(&mut self, duration_fs: u64) -> Result<(), SimError> {
        if let Some(at) = self.sealed_at {
            return Err(SimError::Finalized { time_fs: at.fs });
        }
        let end = self
            .current_time
            .fs
            .checked_add(duration_fs)
            .ok_or(SimError::TimeOverflow {
                fs: self.current_time.fs,
                duration_fs,
            })?;
        let mut instant = None;
        let mut deltas_at_instant = 0u32;

        while let Some(Reverse(next)) = self.event_queue.peek() {
            let next_fs = next.time.fs;
            let due = if duration_fs == 0 {
                next_fs <= end
            } else {
                next_fs < end
            };
            if !due {
                break;
            }
            if instant != Some(next_fs) {
                instant = Some(next_fs);
                deltas_at_instant = 0;
            }

            if deltas_at_instant >= self.max_delta_per_step {
                return Err(SimError::DeltaCycleLimit {
                    fs: next_fs,
                    max_deltas: self.max_delta_per_step,
                });
            }

            self.step_delta()?;
            deltas_at_instant += 1;
        }

        self.current_time = SimTime::from_fs(end);
        Ok(())
    }

    /// Applies every event of the earliest pending delta and evaluates the
    /// processes it wakes. Returns `false` if the queue was empty.
    fn step_delta(&mut self) -> Result<bool, SimError> {
        let Some(Reverse(head)) = self.event_queue.peek() else {
            return Ok(false);
        };
        let now = head.time;
        self.current_time = now;

        // Update phase
        let mut changed = HashSet::new();
        let mut changed_order = Vec::new();
        while let Some(Reverse(evt)) = self.event_queue.peek() {
            if evt.time != now {
                break;
            }
            let Some(Reverse(evt)) = self.event_queue.pop() else {
                break;
            };
            let signal = match evt.kind {
                EventKind::Update { signal, value } => {
                    let state = self.signals.get_mut(signal.index()).ok_or_else(|| {
                        SimError::InvalidSignalRef {
                            reason: format!("signal {} not in this context", signal.as_raw()),
                        }
                    })?;
                    state.apply(value).then_some(signal)
                }
                EventKind::ClockEdge { clock } => {
                    let clk_gen = &self.clocks[clock];
                    let signal = clk_gen.signal;
                    let state = &mut self.signals[signal.index()];
                    let level = state.value & 1 == 0;
                    state.apply(u64::from(level));
                    let phase = clk_gen.spec.phase_after(level);
                    let next = now.after(phase).ok_or(SimError::TimeOverflow {
                        fs: now.fs,
                        duration_fs: phase,
                    })?;
                    self.schedule(next, EventKind::ClockEdge { clock });
                    Some(signal)
                }
            };
            if let Some(signal) = signal {
                if changed.insert(signal) {
                    changed_order.push(signal);
                }
            }
        }

        if let Some(trace) = &mut self.trace {
            for &id in &changed_order {
                trace.record(now.fs, id, self.signals[id.index()].value)?;
            }
        }

        // Evaluation phase
        let to_run = self.find_sensitive_processes(&changed);
        let mut updates = Updates::new();
        let ctx = EvalContext {
            signals: &self.signals,
            changed: &changed,
            time: now,
        };
        for idx in to_run {
            self.processes[idx].process.evaluate(&ctx, &mut updates)?;
        }

        let next_delta = now.next_delta();
        for (signal, value) in updates.pending {
            self.schedule(next_delta, EventKind::Update { signal, value });
        }

        self.total_deltas += 1;
        tracing::trace!(time = %now, changed = changed_order.len(), "delta");
        Ok(true)
    }

    /// Finds active processes with a trigger satisfied by this delta's changes.
    fn find_sensitive_processes(&self, changed: &HashSet<SignalId>) -> Vec<usize> {
        let mut to_run = HashSet::new();
        for sig_id in changed {
            let Some(procs) = self.sensitivity_map.get(sig_id) else {
                continue;
            };
            let state = &self.signals[sig_id.index()];
            for &idx in procs {
                let slot = &self.processes[idx];
                let fired = slot.active
                    && slot.triggers.iter().any(|t| {
                        t.signal == *sig_id && t.edge.matches(state.previous_value, state.value)
                    });
                if fired {
                    to_run.insert(idx);
                }
            }
        }
        let mut result: Vec<usize> = to_run.into_iter().collect();
        result.sort_unstable();
        result
    }

    fn schedule(&mut self, time: SimTime, kind: EventKind) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.event_queue.push(Reverse(SimEvent { time, seq, kind }));
    }
}

impl std::fmt::Debug for SimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimContext")
            .field("current_time", &self.current_time)
            .field("signals", &self.signals.len())
            .field("processes", &self.processes.len())
            .field("pending_events", &self.event_queue.len())
            .field("tracing", &self.trace.is_some())
            .finish()
    }
}

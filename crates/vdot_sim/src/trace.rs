//! Trace session lifecycle: register, open, flush, close.
//!
//! Models describe what they want traced into a [`TraceRegistry`]. Opening
//! the registry consumes it and yields a [`TraceSession`] bound to a file;
//! the session is then attached to the [`SimContext`](crate::kernel::SimContext),
//! which feeds it every change of a registered signal. [`TraceSession::close`]
//! consumes the session, so nothing can be written after it.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SimError;
use crate::signal::{Reader, SignalId, SignalType};
use crate::waveform::{VcdRecorder, WaveformRecorder};

/// Default waveform destination when none is configured.
pub const DEFAULT_TRACE_PATH: &str = "DotProduct_tb.vcd";

/// Hierarchy depth that registers everything.
pub const FULL_DEPTH: u32 = 99;

#[derive(Clone, Debug, PartialEq, Eq)]
enum TraceEntry {
    Begin(String),
    Var {
        id: SignalId,
        name: String,
        width: u32,
    },
    End,
}

/// Signals and scopes waiting to be written as trace definitions.
#[derive(Debug, Default)]
pub struct TraceRegistry {
    entries: Vec<TraceEntry>,
    depth: u32,
}

impl TraceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a nested scope.
    pub fn push_scope(&mut self, name: &str) {
        self.entries.push(TraceEntry::Begin(name.to_string()));
        self.depth += 1;
    }

    /// Closes the innermost scope. Unbalanced calls are ignored.
    pub fn pop_scope(&mut self) {
        if self.depth > 0 {
            self.entries.push(TraceEntry::End);
            self.depth -= 1;
        }
    }

    /// Registers one signal in the current scope.
    pub fn add<T: SignalType>(&mut self, reader: Reader<T>, name: &str) {
        self.entries.push(TraceEntry::Var {
            id: reader.id(),
            name: name.to_string(),
            width: T::WIDTH,
        });
    }

    /// Registers a signal array as `name(0)`, `name(1)`, ...
    pub fn add_array<T: SignalType>(&mut self, readers: &[Reader<T>], name: &str) {
        for (i, r) in readers.iter().enumerate() {
            self.add(*r, &format!("{name}({i})"));
        }
    }

    /// Number of registered variables (aliases included).
    pub fn signal_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, TraceEntry::Var { .. }))
            .count()
    }

    /// Creates `path` and writes the VCD definitions to it.
    pub fn open(self, path: impl AsRef<Path>) -> Result<TraceSession, SimError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| SimError::TraceOpen {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), signals = self.signal_count(), "opened trace");
        let mut session = self.open_with(BufWriter::new(file))?;
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    /// Writes the VCD definitions to an arbitrary writer.
    pub fn open_with<W: Write + 'static>(self, writer: W) -> Result<TraceSession, SimError> {
        let mut recorder = VcdRecorder::new(writer);
        let mut open_scopes = 0u32;
        for entry in &self.entries {
            match entry {
                TraceEntry::Begin(name) => {
                    recorder.begin_scope(name)?;
                    open_scopes += 1;
                }
                TraceEntry::Var { id, name, width } => {
                    recorder.register_signal(*id, name, *width)?;
                }
                TraceEntry::End => {
                    recorder.end_scope()?;
                    open_scopes -= 1;
                }
            }
        }
        for _ in 0..open_scopes {
            recorder.end_scope()?;
        }
        Ok(TraceSession {
            recorder: Box::new(recorder),
            path: None,
            changes: 0,
        })
    }
}

/// An open waveform file.
pub struct TraceSession {
    recorder: Box<dyn WaveformRecorder>,
    path: Option<PathBuf>,
    changes: u64,
}

impl TraceSession {
    /// Destination file, if the session was opened on a path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of value changes written after the initial dump.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    /// Whether `id` is part of this trace.
    pub fn is_traced(&self, id: SignalId) -> bool {
        self.recorder.is_registered(id)
    }

    pub(crate) fn dump_initial(
        &mut self,
        time_fs: u64,
        values: &[(SignalId, u64)],
    ) -> Result<(), SimError> {
        self.recorder.dump_initial(time_fs, values)
    }

    pub(crate) fn record(&mut self, time_fs: u64, id: SignalId, value: u64) -> Result<(), SimError> {
        if self.recorder.is_registered(id) {
            self.recorder.record_change(time_fs, id, value)?;
            self.changes += 1;
        }
        Ok(())
    }

    pub(crate) fn mark_time(&mut self, time_fs: u64) -> Result<(), SimError> {
        self.recorder.advance_time(time_fs)
    }

    /// Forces buffered trace data out. Safe to call any number of times.
    pub fn flush(&mut self) -> Result<(), SimError> {
        self.recorder.flush()
    }

    /// Finalizes and releases the trace file.
    pub fn close(mut self) -> Result<(), SimError> {
        self.recorder.finalize()?;
        tracing::debug!(changes = self.changes, "closed trace");
        Ok(())
    }
}

impl std::fmt::Debug for TraceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceSession")
            .field("path", &self.path)
            .field("changes", &self.changes)
            .finish_non_exhaustive()
    }
}

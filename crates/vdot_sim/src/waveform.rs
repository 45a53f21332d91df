//! Waveform recording for simulation output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, producing text
//! files that can be viewed in GTKWave, Surfer, or other waveform viewers.

use std::collections::HashMap;
use std::io::Write;

use crate::error::SimError;
use crate::signal::SignalId;

/// Trait for recording simulation waveforms.
///
/// Definitions (scopes and variables) come first, then one initial dump,
/// then value changes in non-decreasing time order.
pub trait WaveformRecorder {
    /// Opens a new scope (hierarchy level).
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Declares a signal inside the current scope.
    ///
    /// Registering the same signal twice declares an alias sharing one ID code.
    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError>;

    /// Whether `id` has been declared.
    fn is_registered(&self, id: SignalId) -> bool;

    /// Closes the definitions and writes the starting value of every signal.
    fn dump_initial(&mut self, time_fs: u64, values: &[(SignalId, u64)]) -> Result<(), SimError>;

    /// Records a value change at the given time (in femtoseconds).
    fn record_change(&mut self, time_fs: u64, id: SignalId, value: u64) -> Result<(), SimError>;

    /// Marks simulated time as having reached `time_fs` without a change.
    fn advance_time(&mut self, time_fs: u64) -> Result<(), SimError>;

    /// Pushes buffered output to the underlying writer.
    fn flush(&mut self) -> Result<(), SimError>;

    /// Finalizes the waveform output.
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) format recorder following IEEE 1364.
///
/// Signal identifiers use printable ASCII characters starting from `!` (0x21).
pub struct VcdRecorder<W: Write> {
    writer: W,
    codes: HashMap<SignalId, (String, u32)>,
    next_id: u32,
    header_written: bool,
    definitions_closed: bool,
    current_time: Option<u64>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            codes: HashMap::new(),
            next_id: 0,
            header_written: false,
            definitions_closed: false,
            current_time: None,
        }
    }

    /// Number of distinct signals declared.
    pub fn signal_count(&self) -> usize {
        self.codes.len()
    }

    /// Consumes the recorder, returning the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.writer, "$date")?;
        writeln!(self.writer, "  VDotProduct testbench")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  vdot_sim {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1fs")?;
        writeln!(self.writer, "$end")?;
        self.header_written = true;
        Ok(())
    }

    fn close_definitions(&mut self) -> Result<(), SimError> {
        if self.definitions_closed {
            return Ok(());
        }
        self.ensure_header()?;
        writeln!(self.writer, "$enddefinitions $end")?;
        self.definitions_closed = true;
        Ok(())
    }

    fn write_time(&mut self, time_fs: u64) -> Result<(), SimError> {
        if self.current_time != Some(time_fs) {
            writeln!(self.writer, "#{time_fs}")?;
            self.current_time = Some(time_fs);
        }
        Ok(())
    }

    fn write_value(&mut self, id: SignalId, value: u64) -> Result<(), SimError> {
        let (code, width) =
            self.codes
                .get(&id)
                .ok_or_else(|| SimError::InvalidSignalRef {
                    reason: format!("unregistered VCD signal {}", id.as_raw()),
                })?;
        if *width == 1 {
            writeln!(self.writer, "{}{code}", value & 1)?;
        } else {
            writeln!(self.writer, "{} {code}", Self::format_vector(value, *width))?;
        }
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    ///
    /// Multi-character codes are generated for indices >= 94.
    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            let c = (b'!' + (idx % 94) as u8) as char;
            result.push(c);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    /// Formats a vector value as `b<bits>` with leading zeros dropped.
    fn format_vector(value: u64, width: u32) -> String {
        let masked = value & crate::signal::width_mask(width);
        format!("b{masked:b}")
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn register_signal(&mut self, id: SignalId, name: &str, width: u32) -> Result<(), SimError> {
        self.ensure_header()?;
        let code = match self.codes.get(&id) {
            Some((code, _)) => code.clone(),
            None => {
                let code = Self::make_id_code(self.next_id);
                self.next_id += 1;
                self.codes.insert(id, (code.clone(), width));
                code
            }
        };
        writeln!(self.writer, "$var wire {width} {code} {name} $end")?;
        Ok(())
    }

    fn is_registered(&self, id: SignalId) -> bool {
        self.codes.contains_key(&id)
    }

    fn dump_initial(&mut self, time_fs: u64, values: &[(SignalId, u64)]) -> Result<(), SimError> {
        self.close_definitions()?;
        self.write_time(time_fs)?;
        writeln!(self.writer, "$dumpvars")?;
        for &(id, value) in values {
            self.write_value(id, value)?;
        }
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn record_change(&mut self, time_fs: u64, id: SignalId, value: u64) -> Result<(), SimError> {
        self.close_definitions()?;
        self.write_time(time_fs)?;
        self.write_value(id, value)
    }

    fn advance_time(&mut self, time_fs: u64) -> Result<(), SimError> {
        self.close_definitions()?;
        if !matches!(self.current_time, Some(t) if time_fs <= t) {
            self.write_time(time_fs)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SimError> {
        self.writer.flush()?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        self.close_definitions()?;
        self.writer.flush()?;
        Ok(())
    }
}

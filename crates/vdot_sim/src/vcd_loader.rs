//! VCD file loader for reading recorded waveforms back.
//!
//! Parses IEEE 1364 Value Change Dump files produced by
//! [`VcdRecorder`](crate::waveform::VcdRecorder) or other simulators into a
//! [`LoadedWaveform`]: signal definitions plus per-signal change histories.
//! Values are two-state; `x` and `z` bits read as 0.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use thiserror::Error;

use crate::signal::width_mask;
use crate::time::{FS_PER_MS, FS_PER_NS, FS_PER_PS, FS_PER_S, FS_PER_US};

/// Errors that can occur while loading a VCD file.
#[derive(Debug, Error)]
pub enum VcdLoadError {
    /// An I/O error occurred while reading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A parse error at a specific line number.
    #[error("parse error at line {line}: {message}")]
    ParseError {
        /// The 1-based line number where the error occurred.
        line: usize,
        /// Description of the error.
        message: String,
    },
    /// The VCD file has a structural format error.
    #[error("format error: {0}")]
    FormatError(String),
}

/// Metadata for a signal found in the VCD file.
#[derive(Clone, Debug)]
pub struct VcdSignalDef {
    /// The VCD identifier code.
    pub id_code: String,
    /// Dotted hierarchical name, e.g. `dotProduct.a_i(3)`.
    pub name: String,
    /// Bit width.
    pub width: u32,
    /// Variable type (`wire`, `reg`, ...).
    pub var_type: String,
}

/// A fully loaded waveform.
#[derive(Clone, Debug, Default)]
pub struct LoadedWaveform {
    /// Femtoseconds per VCD time unit.
    pub fs_per_unit: u64,
    /// Signal definitions in declaration order.
    pub signals: Vec<VcdSignalDef>,
    /// Per-signal `(time_fs, value)` histories, parallel to `signals`.
    pub histories: Vec<Vec<(u64, u64)>>,
    /// Last timestamp seen in the file.
    pub end_time_fs: u64,
}

impl LoadedWaveform {
    /// Index of the signal with the given dotted name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.signals.iter().position(|s| s.name == name)
    }

    /// Change history of the named signal.
    pub fn history(&self, name: &str) -> Option<&[(u64, u64)]> {
        self.find(name).map(|i| self.histories[i].as_slice())
    }

    /// Value of the named signal at `time_fs` (last change at or before it).
    pub fn value_at(&self, name: &str, time_fs: u64) -> Option<u64> {
        self.history(name)?
            .iter()
            .take_while(|(t, _)| *t <= time_fs)
            .last()
            .map(|(_, v)| *v)
    }

    /// Time of the first change of the named signal after `after_fs`.
    pub fn first_change_after(&self, name: &str, after_fs: u64) -> Option<u64> {
        let history = self.history(name)?;
        let mut prev = None;
        for &(t, v) in history {
            if t > after_fs && prev != Some(v) {
                return Some(t);
            }
            prev = Some(v);
        }
        None
    }
}

/// Loads a VCD waveform from a buffered reader.
pub fn load_vcd<R: BufRead>(reader: R) -> Result<LoadedWaveform, VcdLoadError> {
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let mut tokens = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        tokens.extend(line.split_whitespace().map(|t| (i + 1, t)));
    }
    Parser {
        tokens,
        pos: 0,
        wave: LoadedWaveform {
            fs_per_unit: 1,
            ..LoadedWaveform::default()
        },
        id_to_idx: HashMap::new(),
        scope_stack: Vec::new(),
        current_time_fs: 0,
    }
    .run()
}

/// Loads a VCD waveform from a file path.
pub fn load_vcd_file(path: &Path) -> Result<LoadedWaveform, VcdLoadError> {
    let file = std::fs::File::open(path)?;
    load_vcd(std::io::BufReader::new(file))
}

struct Parser<'a> {
    tokens: Vec<(usize, &'a str)>,
    pos: usize,
    wave: LoadedWaveform,
    id_to_idx: HashMap<String, Vec<usize>>,
    scope_stack: Vec<String>,
    current_time_fs: u64,
}

impl<'a> Parser<'a> {
    fn run(mut self) -> Result<LoadedWaveform, VcdLoadError> {
        self.definitions()?;
        self.changes()?;
        Ok(self.wave)
    }

    fn next(&mut self) -> Option<(usize, &'a str)> {
        let tok = self.tokens.get(self.pos).copied();
        self.pos += 1;
        tok
    }

    /// Collects tokens up to the closing `$end`.
    fn body(&mut self, keyword: &str, line: usize) -> Result<Vec<&'a str>, VcdLoadError> {
        let mut body = Vec::new();
        loop {
            match self.next() {
                Some((_, "$end")) => return Ok(body),
                Some((_, t)) => body.push(t),
                None => {
                    return Err(VcdLoadError::ParseError {
                        line,
                        message: format!("unterminated {keyword}"),
                    })
                }
            }
        }
    }

    fn definitions(&mut self) -> Result<(), VcdLoadError> {
        while let Some((line, tok)) = self.next() {
            match tok {
                "$enddefinitions" => {
                    self.body(tok, line)?;
                    return Ok(());
                }
                "$timescale" => {
                    let body = self.body(tok, line)?.concat();
                    self.wave.fs_per_unit = parse_timescale(&body, line)?;
                }
                "$scope" => {
                    let body = self.body(tok, line)?;
                    let name = body.get(1).copied().unwrap_or("");
                    self.scope_stack.push(name.to_string());
                }
                "$upscope" => {
                    self.body(tok, line)?;
                    self.scope_stack.pop();
                }
                "$var" => {
                    let body = self.body(tok, line)?;
                    self.var(&body, line)?;
                }
                t if t.starts_with('$') => {
                    self.body(t, line)?;
                }
                other => {
                    return Err(VcdLoadError::ParseError {
                        line,
                        message: format!("unexpected token in header: {other}"),
                    })
                }
            }
        }
        Err(VcdLoadError::FormatError(
            "missing $enddefinitions".to_string(),
        ))
    }

    fn var(&mut self, body: &[&str], line: usize) -> Result<(), VcdLoadError> {
        let [var_type, width, code, reference, ..] = body else {
            return Err(VcdLoadError::ParseError {
                line,
                message: format!("malformed $var: {}", body.join(" ")),
            });
        };
        let width: u32 = width.parse().map_err(|_| VcdLoadError::ParseError {
            line,
            message: format!("invalid width: {width}"),
        })?;
        let mut name = self.scope_stack.join(".");
        if !name.is_empty() {
            name.push('.');
        }
        name.push_str(reference);

        let idx = self.wave.signals.len();
        self.wave.signals.push(VcdSignalDef {
            id_code: code.to_string(),
            name,
            width,
            var_type: var_type.to_string(),
        });
        self.wave.histories.push(Vec::new());
        self.id_to_idx.entry(code.to_string()).or_default().push(idx);
        Ok(())
    }

    fn changes(&mut self) -> Result<(), VcdLoadError> {
        while let Some((line, tok)) = self.next() {
            if let Some(time) = tok.strip_prefix('#') {
                let t: u64 = time.parse().map_err(|_| VcdLoadError::ParseError {
                    line,
                    message: format!("invalid timestamp: {tok}"),
                })?;
                self.current_time_fs =
                    t.checked_mul(self.wave.fs_per_unit)
                        .ok_or_else(|| VcdLoadError::ParseError {
                            line,
                            message: format!("timestamp {tok} out of range in femtoseconds"),
                        })?;
                self.wave.end_time_fs = self.wave.end_time_fs.max(self.current_time_fs);
                continue;
            }
            match tok {
                "$dumpvars" | "$dumpall" | "$dumpon" | "$dumpoff" | "$end" => {}
                "$comment" => {
                    self.body(tok, line)?;
                }
                _ => {
                    let first = tok.as_bytes()[0];
                    match first {
                        b'b' | b'B' => {
                            let (_, code) = self.next().ok_or(VcdLoadError::ParseError {
                                line,
                                message: "vector value without identifier".into(),
                            })?;
                            self.set(code, parse_bits(&tok[1..]), line)?;
                        }
                        b'r' | b'R' => {
                            // Real values are not representable; skip the identifier.
                            self.next();
                        }
                        b'0' | b'1' | b'x' | b'X' | b'z' | b'Z' => {
                            self.set(&tok[1..], u64::from(first == b'1'), line)?;
                        }
                        _ => {
                            return Err(VcdLoadError::ParseError {
                                line,
                                message: format!("unexpected token: {tok}"),
                            })
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn set(&mut self, code: &str, value: u64, line: usize) -> Result<(), VcdLoadError> {
        let indices = self
            .id_to_idx
            .get(code)
            .ok_or_else(|| VcdLoadError::ParseError {
                line,
                message: format!("unknown identifier code: {code}"),
            })?;
        for &idx in indices {
            let masked = value & width_mask(self.wave.signals[idx].width);
            self.wave.histories[idx].push((self.current_time_fs, masked));
        }
        Ok(())
    }
}

/// Parses a timescale body such as `1fs`, `10ps` or `100 ns` into femtoseconds.
fn parse_timescale(body: &str, line: usize) -> Result<u64, VcdLoadError> {
    let body = body.trim();
    let digit_end = body.find(|c: char| !c.is_ascii_digit()).unwrap_or(body.len());
    let bad = || VcdLoadError::ParseError {
        line,
        message: format!("invalid timescale: {body}"),
    };
    let magnitude: u64 = body[..digit_end].parse().map_err(|_| bad())?;
    let unit = match body[digit_end..].trim() {
        "fs" => 1,
        "ps" => FS_PER_PS,
        "ns" => FS_PER_NS,
        "us" => FS_PER_US,
        "ms" => FS_PER_MS,
        "s" => FS_PER_S,
        _ => return Err(bad()),
    };
    magnitude.checked_mul(unit).ok_or_else(bad)
}

/// Parses a binary string, reading `x`/`z` bits as 0. Only the low 64 bits are kept.
fn parse_bits(bits: &str) -> u64 {
    bits.bytes().fold(0u64, |acc, b| (acc << 1) | u64::from(b == b'1'))
}

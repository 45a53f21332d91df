//! Signal bus and positional binding to the DUT.
//!
//! A [`SignalBus`] owns the write side of every testbench signal. [`bind`]
//! splits it: the DUT receives read views of clock, reset and inputs plus the
//! only writer of the result, and the harness keeps the writers of reset and
//! inputs plus a read view of the result ([`HarnessPorts`]).

use vdot_dut::{DotProduct, DotProductParams, DotProductPorts};
use vdot_sim::{ClockSpec, Reader, SimContext, SimError, Writer};

/// Every signal of the DUT interface, before binding.
#[derive(Debug)]
pub struct SignalBus {
    clk: Reader<bool>,
    reset_n: Writer<bool>,
    a: Box<[Writer<u32>]>,
    b: Box<[Writer<u32>]>,
    result: Writer<u32>,
}

impl SignalBus {
    /// Creates a bus with `size`-element input vectors.
    pub fn new(ctx: &mut SimContext, clock: ClockSpec, size: usize) -> Result<Self, SimError> {
        Self::with_shape(ctx, clock, size, size)
    }

    /// Creates a bus with explicitly sized input vectors.
    ///
    /// Fails with [`SimError::ShapeMismatch`] before creating any signal if
    /// the two lengths differ.
    pub fn with_shape(
        ctx: &mut SimContext,
        clock: ClockSpec,
        a_len: usize,
        b_len: usize,
    ) -> Result<Self, SimError> {
        if a_len != b_len {
            return Err(SimError::ShapeMismatch {
                port: "b_i".into(),
                expected: a_len,
                found: b_len,
            });
        }
        let clk = ctx.add_clock(clock)?;
        Ok(Self {
            clk,
            reset_n: ctx.create_signal("reset_n", false),
            a: ctx.create_array("a_i", a_len, 0u32),
            b: ctx.create_array("b_i", b_len, 0u32),
            result: ctx.create_signal("result_o", 0u32),
        })
    }

    /// Number of elements per input vector.
    pub fn width(&self) -> usize {
        self.a.len()
    }

    /// Read view of the clock.
    pub fn clk(&self) -> Reader<bool> {
        self.clk
    }
}

/// The harness side of a bound bus.
#[derive(Debug)]
pub struct HarnessPorts {
    /// Clock, for observation.
    pub clk: Reader<bool>,
    /// Reset writer; only the sequencer drives it.
    pub reset_n: Writer<bool>,
    /// Vector A writers.
    pub a: Box<[Writer<u32>]>,
    /// Vector B writers.
    pub b: Box<[Writer<u32>]>,
    /// Result, read-only.
    pub result: Reader<u32>,
}

/// Connects `bus` to a new DUT instance by position: `a_i[k]` drives the
/// DUT's `a_i(k)` for every `k`.
///
/// Fails with [`SimError::ShapeMismatch`] if the bus width differs from
/// `params.size`.
pub fn bind(
    ctx: &mut SimContext,
    bus: SignalBus,
    name: &str,
    params: DotProductParams,
) -> Result<(HarnessPorts, DotProduct), SimError> {
    let result = bus.result.reader();
    let ports = DotProductPorts {
        clk: bus.clk,
        reset_n: bus.reset_n.reader(),
        a: bus.a.iter().map(Writer::reader).collect(),
        b: bus.b.iter().map(Writer::reader).collect(),
        result: bus.result,
    };
    let dut = DotProduct::new(ctx, name, params, ports)?;
    tracing::debug!(instance = name, width = bus.a.len(), "bound signal bus");
    Ok((
        HarnessPorts {
            clk: bus.clk,
            reset_n: bus.reset_n,
            a: bus.a,
            b: bus.b,
            result,
        },
        dut,
    ))
}

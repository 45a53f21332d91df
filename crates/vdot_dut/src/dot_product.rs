//! Pipelined dot-product unit.
//!
//! On every rising clock edge with `reset_n_i` high, the unit latches
//! `Σ a_i(k) * b_i(k)` (wrapping at 32 bits) into the first stage register and
//! shifts the pipeline one step toward `result_o`. With `reset_n_i` low, every
//! register clears to zero.

use vdot_sim::{
    EvalContext, Model, Process, ProcessId, Reader, SimContext, SimError, TraceRegistry, Trigger,
    Updates, Writer,
};

use crate::params::DotProductParams;

/// Ports of a [`DotProduct`] instance.
///
/// Inputs are read views; the result writer moves into the model, which is
/// then its only driver.
#[derive(Debug)]
pub struct DotProductPorts {
    /// Clock input.
    pub clk: Reader<bool>,
    /// Active-low reset: 0 holds the unit in reset, 1 lets it run.
    pub reset_n: Reader<bool>,
    /// Vector A, one signal per element.
    pub a: Box<[Reader<u32>]>,
    /// Vector B, one signal per element.
    pub b: Box<[Reader<u32>]>,
    /// Result output.
    pub result: Writer<u32>,
}

/// A bound dot-product instance.
#[derive(Debug)]
pub struct DotProduct {
    name: String,
    params: DotProductParams,
    clk: Reader<bool>,
    reset_n: Reader<bool>,
    a: Box<[Reader<u32>]>,
    b: Box<[Reader<u32>]>,
    stages: Box<[Reader<u32>]>,
    result: Reader<u32>,
    process: ProcessId,
}

impl DotProduct {
    /// Creates the pipeline registers and registers the clocked process.
    ///
    /// Fails with [`SimError::ShapeMismatch`] if either input array does not
    /// have `params.size` elements. Nothing is added to `ctx` in that case.
    pub fn new(
        ctx: &mut SimContext,
        name: &str,
        params: DotProductParams,
        ports: DotProductPorts,
    ) -> Result<Self, SimError> {
        check_width("a_i", params.size, ports.a.len())?;
        check_width("b_i", params.size, ports.b.len())?;

        let stage_writers = ctx.create_array(&format!("{name}.stage_q"), params.stage_count(), 0u32);
        let stages: Box<[Reader<u32>]> = stage_writers.iter().map(Writer::reader).collect();
        let result = ports.result.reader();

        let core = PipelineCore {
            name: name.to_string(),
            clk: ports.clk,
            reset_n: ports.reset_n,
            a: ports.a.clone(),
            b: ports.b.clone(),
            stages: stage_writers,
            result: ports.result,
        };
        let process = ctx.add_process(Box::new(core));
        tracing::debug!(
            instance = name,
            size = params.size,
            latency = params.latency,
            "bound dot product"
        );

        Ok(Self {
            name: name.to_string(),
            params,
            clk: ports.clk,
            reset_n: ports.reset_n,
            a: ports.a,
            b: ports.b,
            stages,
            result,
            process,
        })
    }

    /// Parameters the instance was built with.
    pub fn params(&self) -> DotProductParams {
        self.params
    }

    /// Read view of `result_o`.
    pub fn result(&self) -> Reader<u32> {
        self.result
    }

    /// Read views of the internal stage registers, input side first.
    pub fn stages(&self) -> &[Reader<u32>] {
        &self.stages
    }

    /// Handle of the clocked process.
    pub fn process_id(&self) -> ProcessId {
        self.process
    }
}

fn check_width(port: &str, expected: usize, found: usize) -> Result<(), SimError> {
    if expected == found {
        Ok(())
    } else {
        Err(SimError::ShapeMismatch {
            port: port.to_string(),
            expected,
            found,
        })
    }
}

impl Model for DotProduct {
    fn name(&self) -> &str {
        &self.name
    }

    fn trace(&self, registry: &mut TraceRegistry, depth: u32) {
        if depth == 0 {
            return;
        }
        registry.push_scope(&self.name);
        registry.add(self.clk, "clk_i");
        registry.add(self.reset_n, "reset_n_i");
        registry.add_array(&self.a, "a_i");
        registry.add_array(&self.b, "b_i");
        registry.add(self.result, "result_o");
        if depth >= 2 && !self.stages.is_empty() {
            registry.push_scope("adder_tree");
            registry.add_array(&self.stages, "stage_q");
            registry.pop_scope();
        }
        registry.pop_scope();
    }

    fn finalize(self, ctx: &mut SimContext) -> Result<(), SimError> {
        ctx.retire_process(self.process);
        Ok(())
    }
}

/// The clocked process behind a [`DotProduct`].
struct PipelineCore {
    name: String,
    clk: Reader<bool>,
    reset_n: Reader<bool>,
    a: Box<[Reader<u32>]>,
    b: Box<[Reader<u32>]>,
    stages: Box<[Writer<u32>]>,
    result: Writer<u32>,
}

impl PipelineCore {
    fn sum(&self, ctx: &EvalContext<'_>) -> u32 {
        self.a
            .iter()
            .zip(self.b.iter())
            .fold(0u32, |acc, (&a, &b)| {
                acc.wrapping_add(ctx.read(a).wrapping_mul(ctx.read(b)))
            })
    }
}

impl Process for PipelineCore {
    fn name(&self) -> &str {
        &self.name
    }

    fn triggers(&self) -> Vec<Trigger> {
        vec![Trigger::posedge(self.clk)]
    }

    fn evaluate(&mut self, ctx: &EvalContext<'_>, updates: &mut Updates) -> Result<(), SimError> {
        if !ctx.rose(self.clk) {
            return Ok(());
        }
        if !ctx.read(self.reset_n) {
            for stage in self.stages.iter() {
                updates.drive(stage, 0);
            }
            updates.drive(&self.result, 0);
            return Ok(());
        }

        let mut carry = self.sum(ctx);
        for stage in self.stages.iter() {
            let held = ctx.read(stage.reader());
            updates.drive(stage, carry);
            carry = held;
        }
        updates.drive(&self.result, carry);
        Ok(())
    }

    fn finalize(&mut self, ctx: &EvalContext<'_>) {
        tracing::debug!(
            instance = %self.name,
            result = ctx.read(self.result.reader()),
            time = %ctx.time(),
            "finalized dot product"
        );
    }
}

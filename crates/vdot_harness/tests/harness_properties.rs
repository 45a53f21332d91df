//! End-to-end properties of a harness run: correctness of the sampled sum,
//! reset ordering, trace artifact validity, shape checks, and the minimum
//! settle window for the default vectors.

use tempfile::TempDir;
use vdot_config::HarnessConfig;
use vdot_dut::DotProductParams;
use vdot_harness::{bind, Harness, HarnessError, SignalBus, Stimulus, StimulusAction};
use vdot_sim::time::FS_PER_NS;
use vdot_sim::{load_vcd_file, ClockSpec, SimContext, SimError, TraceRegistry};

fn traced_config(dir: &TempDir) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.trace.path = Some(dir.path().join("DotProduct_tb.vcd"));
    config
}

fn untraced_config(size: usize, settle_cycles: u64) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.vectors.size = size;
    config.stimulus.settle_cycles = settle_cycles;
    config.trace.enabled = false;
    config
}

#[test]
fn default_run_computes_twenty_thousand() {
    let tmp = TempDir::new().unwrap();
    let report = Harness::new(traced_config(&tmp)).unwrap().run().unwrap();
    assert_eq!(report.result, 20_000);
    assert_eq!(report.expected, 20_000);
    assert!(report.passed());
}

#[test]
fn arbitrary_vectors_match_wrapping_sum() {
    let a: Vec<u32> = (0..257u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
    let b: Vec<u32> = (0..257u32).map(|i| u32::MAX - i * 3).collect();
    let stimulus = Stimulus::from_vectors(a.clone(), b.clone()).unwrap();
    let expected = a
        .iter()
        .zip(&b)
        .fold(0u32, |acc, (x, y)| acc.wrapping_add(x.wrapping_mul(*y)));

    let report = Harness::with_stimulus(untraced_config(0, 100), stimulus)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.result, expected);
}

#[test]
fn zero_length_vectors_still_reset_and_settle() {
    let report = Harness::new(untraced_config(0, 100)).unwrap().run().unwrap();
    assert_eq!(report.result, 0);
    assert!(report.log.reset_released_at().is_some());
    assert!(report.log.inputs_driven_at().is_none());
    assert!(report
        .log
        .entries()
        .iter()
        .any(|e| e.action == StimulusAction::Settle { cycles: 100 }));
    assert_eq!(report.final_time.to_ns(), 103);
}

#[test]
fn inputs_follow_reset_release_in_log_and_trace() {
    let tmp = TempDir::new().unwrap();
    let mut config = traced_config(&tmp);
    config.vectors.size = 64;
    let report = Harness::new(config).unwrap().run().unwrap();

    let released = report.log.reset_released_at().unwrap();
    let driven = report.log.inputs_driven_at().unwrap();
    assert!(driven > released);

    let wave = load_vcd_file(&report.trace_path.unwrap()).unwrap();
    let reset_rise = wave
        .first_change_after("dotProduct.reset_n_i", 0)
        .unwrap();
    assert_eq!(reset_rise, released.fs);
    for i in [0, 31, 63] {
        let a = format!("dotProduct.a_i({i})");
        let b = format!("dotProduct.b_i({i})");
        assert!(wave.first_change_after(&a, 0).unwrap() > reset_rise);
        assert!(wave.first_change_after(&b, 0).unwrap() > reset_rise);
        assert_eq!(wave.value_at(&a, reset_rise), Some(0));
    }
}

#[test]
fn harness_trace_reopens_with_full_hierarchy() {
    let tmp = TempDir::new().unwrap();
    let report = Harness::new(traced_config(&tmp)).unwrap().run().unwrap();
    let path = report.trace_path.unwrap();
    assert_eq!(path, tmp.path().join("DotProduct_tb.vcd"));

    let wave = load_vcd_file(&path).unwrap();
    // clk, reset_n, 2 x 10 000 inputs, result, 15 stage registers
    assert_eq!(wave.signals.len(), 1 + 1 + 20_000 + 1 + 15);
    assert!(wave.find("dotProduct.b_i(9999)").is_some());
    assert!(wave.find("dotProduct.adder_tree.stage_q(14)").is_some());
    assert_eq!(wave.end_time_fs, 103 * FS_PER_NS);
    assert_eq!(wave.value_at("dotProduct.result_o", 17 * FS_PER_NS), Some(0));
    assert_eq!(
        wave.value_at("dotProduct.result_o", 18 * FS_PER_NS),
        Some(20_000)
    );
}

#[test]
fn port_depth_trace_omits_pipeline() {
    let tmp = TempDir::new().unwrap();
    let mut config = traced_config(&tmp);
    config.vectors.size = 8;
    config.trace.depth = 1;
    let report = Harness::new(config).unwrap().run().unwrap();
    let wave = load_vcd_file(&report.trace_path.unwrap()).unwrap();
    assert_eq!(wave.signals.len(), 1 + 1 + 16 + 1);
    assert!(wave.signals.iter().all(|s| !s.name.contains("stage_q")));
}

#[test]
fn repeated_flush_then_close_yields_valid_trace() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("flush.vcd");
    let mut ctx = SimContext::new();
    let clk = ctx.add_clock(ClockSpec::default()).unwrap();
    let data = ctx.create_signal("data", 0u32);
    ctx.advance(0).unwrap();

    let mut registry = TraceRegistry::new();
    registry.push_scope("top");
    registry.add(clk, "clk");
    registry.add(data.reader(), "data");
    registry.pop_scope();
    ctx.attach_trace(registry.open(&path).unwrap()).unwrap();

    ctx.advance(2 * FS_PER_NS).unwrap();
    ctx.write(&data, 9);
    ctx.advance(2 * FS_PER_NS).unwrap();

    let mut session = ctx.detach_trace().unwrap().unwrap();
    for _ in 0..3 {
        session.flush().unwrap();
    }
    session.close().unwrap();

    let wave = load_vcd_file(&path).unwrap();
    assert_eq!(wave.value_at("top.data", 2 * FS_PER_NS), Some(9));
    assert_eq!(wave.history("top.clk").unwrap().len(), 1 + 7);
    assert_eq!(wave.end_time_fs, 4 * FS_PER_NS);
}

#[test]
fn unequal_bus_vectors_fail_every_time() {
    for _ in 0..3 {
        let mut ctx = SimContext::new();
        let err = SignalBus::with_shape(&mut ctx, ClockSpec::default(), 10, 11).unwrap_err();
        assert!(matches!(
            err,
            SimError::ShapeMismatch { expected: 10, found: 11, .. }
        ));
    }
    assert!(Stimulus::from_vectors(vec![0; 3], vec![0; 4]).is_err());
}

#[test]
fn bus_wider_than_dut_fails_binding() {
    let mut ctx = SimContext::new();
    let bus = SignalBus::new(&mut ctx, ClockSpec::default(), 10_000).unwrap();
    let err = bind(&mut ctx, bus, "dotProduct", DotProductParams::new(9_999)).unwrap_err();
    assert!(matches!(
        err,
        SimError::ShapeMismatch { expected: 9_999, found: 10_000, .. }
    ));
}

#[test]
fn unopenable_trace_aborts_before_reset() {
    let tmp = TempDir::new().unwrap();
    let mut config = traced_config(&tmp);
    config.vectors.size = 4;
    config.trace.path = Some(tmp.path().join("missing").join("tb.vcd"));
    let err = Harness::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, HarnessError::Sim(SimError::TraceOpen { .. })));
}

/// The adder-tree model of the 10 000-wide unit needs 16 cycles. Any window
/// shorter than that samples the stale reset value; 16 and up sample the sum.
#[test]
fn settle_window_pins_minimum_at_pipeline_depth() {
    let latency = DotProductParams::adder_tree_latency(10_000);
    assert_eq!(latency, 16);

    for cycles in [1, 8, 15] {
        let report = Harness::new(untraced_config(10_000, cycles))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.result, 0, "settle window of {cycles} cycles");
        assert!(!report.passed());
    }
    for cycles in [16, 17, 100] {
        let report = Harness::new(untraced_config(10_000, cycles))
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(report.result, 20_000, "settle window of {cycles} cycles");
    }
}

#[test]
fn manual_wiring_matches_harness() {
    let mut ctx = SimContext::new();
    let bus = SignalBus::new(&mut ctx, ClockSpec::default(), 3).unwrap();
    let (ports, _dut) = bind(&mut ctx, bus, "dotProduct", DotProductParams::new(3)).unwrap();
    ctx.advance(0).unwrap();
    ctx.advance(FS_PER_NS).unwrap();
    ctx.write(&ports.reset_n, false);
    ctx.advance(FS_PER_NS).unwrap();
    ctx.write(&ports.reset_n, true);
    ctx.advance(FS_PER_NS).unwrap();
    let values = [4u32, 5, 6];
    for (w, v) in ports.a.iter().zip(values) {
        ctx.write(w, v);
    }
    for w in ports.b.iter() {
        ctx.write(w, 10);
    }
    ctx.advance(100 * FS_PER_NS).unwrap();
    assert_eq!(ctx.read(ports.result), 150);
}

//! Configuration types deserialized from `vdot.toml`.
//!
//! Every section and field is optional. An empty file describes the
//! reference run: 10 000-element vectors of ones and twos, a 1 ns clock,
//! a 100-cycle settle window, and a full-depth trace to `DotProduct_tb.vcd`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use vdot_sim::{ClockSpec, DEFAULT_MAX_DELTAS, DEFAULT_TRACE_PATH, FULL_DEPTH};

use crate::duration::Duration;

/// The top-level harness configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    /// Input vector shape and stimulus values.
    #[serde(default)]
    pub vectors: VectorConfig,
    /// Clock waveform.
    #[serde(default)]
    pub clock: ClockConfig,
    /// Device-under-test instance settings.
    #[serde(default)]
    pub dut: DutConfig,
    /// Stimulus timing.
    #[serde(default)]
    pub stimulus: StimulusConfig,
    /// Waveform output.
    #[serde(default)]
    pub trace: TraceConfig,
    /// Simulation kernel limits.
    #[serde(default)]
    pub sim: SimLimits,
}

impl HarnessConfig {
    /// The clock described by the `[clock]` section.
    pub fn clock_spec(&self) -> ClockSpec {
        ClockSpec {
            name: "clk".into(),
            period_fs: self.clock.period.as_fs(),
            duty_cycle: self.clock.duty_cycle,
            start_fs: self.clock.start.as_fs(),
            posedge_first: self.clock.posedge_first,
        }
    }

    /// Length of the settle window in femtoseconds, or `None` if it does not
    /// fit in a `u64`.
    pub fn settle_fs(&self) -> Option<u64> {
        self.stimulus
            .settle_cycles
            .checked_mul(self.clock.period.as_fs())
    }

    /// Trace destination, falling back to `DotProduct_tb.vcd`.
    pub fn trace_path(&self) -> PathBuf {
        self.trace
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TRACE_PATH))
    }
}

/// `[vectors]`: shape of the two input vectors and the constant they carry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VectorConfig {
    /// Number of elements per vector.
    pub size: usize,
    /// Value driven onto every element of A.
    pub a_value: u32,
    /// Value driven onto every element of B.
    pub b_value: u32,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            size: 10_000,
            a_value: 1,
            b_value: 2,
        }
    }
}

/// `[clock]`: period, duty cycle and phase of the testbench clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClockConfig {
    /// Full period.
    pub period: Duration,
    /// Fraction of the period spent high.
    pub duty_cycle: f64,
    /// Time of the first edge.
    pub start: Duration,
    /// Whether the first edge rises.
    pub posedge_first: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_ns(1),
            duty_cycle: 0.5,
            start: Duration(0),
            posedge_first: true,
        }
    }
}

/// `[dut]`: instance name and optional pipeline-depth override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DutConfig {
    /// Instance name, also the top trace scope.
    pub name: String,
    /// Pipeline latency in cycles. `None` uses the adder-tree depth.
    pub latency: Option<u32>,
}

impl Default for DutConfig {
    fn default() -> Self {
        Self {
            name: "dotProduct".into(),
            latency: None,
        }
    }
}

/// `[stimulus]`: timing of the run after inputs are driven.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StimulusConfig {
    /// Clock periods to wait between driving inputs and sampling the result.
    pub settle_cycles: u64,
}

impl Default for StimulusConfig {
    fn default() -> Self {
        Self { settle_cycles: 100 }
    }
}

/// `[trace]`: waveform destination and hierarchy depth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TraceConfig {
    /// Output path. `None` means `DotProduct_tb.vcd`.
    pub path: Option<PathBuf>,
    /// Hierarchy levels to register; 1 = ports, 2 = pipeline registers.
    pub depth: u32,
    /// Whether a waveform is written at all.
    pub enabled: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            path: None,
            depth: FULL_DEPTH,
            enabled: true,
        }
    }
}

/// `[sim]`: kernel safety limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimLimits {
    /// Delta cycles allowed at one instant before the run is aborted.
    pub max_deltas: u32,
}

impl Default for SimLimits {
    fn default() -> Self {
        Self {
            max_deltas: DEFAULT_MAX_DELTAS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;
    use vdot_sim::time::FS_PER_NS;

    #[test]
    fn defaults_reproduce_reference_run() {
        let config = HarnessConfig::default();
        assert_eq!(config.vectors.size, 10_000);
        assert_eq!(config.vectors.a_value, 1);
        assert_eq!(config.vectors.b_value, 2);
        assert_eq!(config.stimulus.settle_cycles, 100);
        assert_eq!(config.dut.name, "dotProduct");
        assert_eq!(config.trace_path(), PathBuf::from("DotProduct_tb.vcd"));
        assert_eq!(config.trace.depth, 99);
        assert!(config.trace.enabled);
        assert_eq!(config.clock_spec(), ClockSpec::default());
        assert_eq!(config.settle_fs(), Some(100 * FS_PER_NS));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = load_config_from_str("[vectors]\nsize = 8\n").unwrap();
        assert_eq!(config.vectors.size, 8);
        assert_eq!(config.vectors.a_value, 1);
        assert_eq!(config.clock, ClockConfig::default());
    }

    #[test]
    fn clock_section_maps_to_clock_spec() {
        let toml = r#"
[clock]
period = "10ns"
duty_cycle = 0.25
start = "2ns"
posedge_first = false
"#;
        let spec = load_config_from_str(toml).unwrap().clock_spec();
        assert_eq!(spec.period_fs, 10 * FS_PER_NS);
        assert_eq!(spec.high_fs(), 2_500_000);
        assert_eq!(spec.start_fs, 2 * FS_PER_NS);
        assert!(spec.initial_level());
    }

    #[test]
    fn settle_window_scales_with_period() {
        let toml = "[clock]\nperiod = \"4ns\"\n[stimulus]\nsettle_cycles = 16\n";
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.settle_fs(), Some(64 * FS_PER_NS));
    }

    #[test]
    fn unknown_field_rejected() {
        assert!(load_config_from_str("[vectors]\nlength = 3\n").is_err());
        assert!(load_config_from_str("[bogus]\n").is_err());
    }

    #[test]
    fn json_round_trip_preserves_sections() {
        let mut config = HarnessConfig::default();
        config.trace.path = Some(PathBuf::from("out/run.vcd"));
        config.dut.latency = Some(4);
        let json = serde_json::to_string(&config).unwrap();
        let back: HarnessConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}

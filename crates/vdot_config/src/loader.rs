//! Configuration file loading and validation.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::HarnessConfig;

/// File name looked up in the working directory when no config is given.
pub const CONFIG_FILE_NAME: &str = "vdot.toml";

/// Loads and validates a configuration file.
pub fn load_config(path: &Path) -> Result<HarnessConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<HarnessConfig, ConfigError> {
    let config: HarnessConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Returns `<dir>/vdot.toml` if it exists.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let candidate = dir.join(CONFIG_FILE_NAME);
    candidate.is_file().then_some(candidate)
}

/// Checks values that parse but cannot drive a run.
pub fn validate_config(config: &HarnessConfig) -> Result<(), ConfigError> {
    if config.dut.name.is_empty() {
        return Err(ConfigError::MissingField("dut.name".to_string()));
    }
    if config.dut.latency == Some(0) {
        return Err(ConfigError::ValidationError(
            "dut.latency must be at least 1 cycle".to_string(),
        ));
    }
    config
        .clock_spec()
        .validate()
        .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
    // Reset and input drive take three periods before the window opens.
    let total_fs = config.settle_fs().and_then(|settle| {
        config
            .clock
            .period
            .as_fs()
            .checked_mul(3)
            .and_then(|lead| lead.checked_add(settle))
    });
    if total_fs.is_none() {
        return Err(ConfigError::ValidationError(format!(
            "stimulus.settle_cycles = {} overflows the simulated time range at a {} clock period",
            config.stimulus.settle_cycles, config.clock.period
        )));
    }
    if config.sim.max_deltas == 0 {
        return Err(ConfigError::ValidationError(
            "sim.max_deltas must be non-zero".to_string(),
        ));
    }
    if config
        .trace
        .path
        .as_ref()
        .is_some_and(|p| p.as_os_str().is_empty())
    {
        return Err(ConfigError::MissingField("trace.path".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn empty_config_is_default() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[vectors]
size = 16
a_value = 3
b_value = 5

[clock]
period = "2ns"
duty_cycle = 0.5
start = "0ns"
posedge_first = true

[dut]
name = "dp"
latency = 6

[stimulus]
settle_cycles = 20

[trace]
path = "waves/dp.vcd"
depth = 1
enabled = false

[sim]
max_deltas = 500
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.vectors.size, 16);
        assert_eq!(config.vectors.a_value, 3);
        assert_eq!(config.dut.name, "dp");
        assert_eq!(config.dut.latency, Some(6));
        assert_eq!(config.stimulus.settle_cycles, 20);
        assert_eq!(config.trace_path(), PathBuf::from("waves/dp.vcd"));
        assert_eq!(config.trace.depth, 1);
        assert!(!config.trace.enabled);
        assert_eq!(config.sim.max_deltas, 500);
    }

    #[test]
    fn integer_period_is_femtoseconds() {
        let config = load_config_from_str("[clock]\nperiod = 4000\n").unwrap();
        assert_eq!(config.clock_spec().period_fs, 4000);
    }

    #[test]
    fn invalid_toml() {
        let err = load_config_from_str("this is not valid toml {{{").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn bad_duration_is_parse_error() {
        let err = load_config_from_str("[clock]\nperiod = \"1 fortnight\"\n").unwrap_err();
        match err {
            ConfigError::ParseError(msg) => assert!(msg.contains("unknown duration unit")),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn zero_period_rejected() {
        let err = load_config_from_str("[clock]\nperiod = \"0ns\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn bad_duty_cycle_rejected() {
        let err = load_config_from_str("[clock]\nduty_cycle = 1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_latency_rejected() {
        let err = load_config_from_str("[dut]\nlatency = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn empty_names_rejected() {
        let err = load_config_from_str("[dut]\nname = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "dut.name"));
        let err = load_config_from_str("[trace]\npath = \"\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(f) if f == "trace.path"));
    }

    #[test]
    fn zero_delta_limit_rejected() {
        let err = load_config_from_str("[sim]\nmax_deltas = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn overflowing_settle_window_rejected() {
        let toml = "[vectors]\nsize = 1\n[trace]\nenabled = false\n[stimulus]\nsettle_cycles = 9223372036854775807\n";
        let err = load_config_from_str(toml).unwrap_err();
        match err {
            ConfigError::ValidationError(msg) => assert!(msg.contains("stimulus.settle_cycles")),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn long_settle_window_within_range_accepted() {
        let config = load_config_from_str("[stimulus]\nsettle_cycles = 1000000000\n").unwrap();
        assert_eq!(config.settle_fs(), Some(1_000_000_000 * 1_000_000));
    }

    #[test]
    fn load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[vectors]\nsize = 4\n").unwrap();
        assert_eq!(find_config(tmp.path()), Some(path.clone()));
        assert_eq!(load_config(&path).unwrap().vectors.size, 4);
    }

    #[test]
    fn missing_file() {
        let tmp = TempDir::new().unwrap();
        assert!(find_config(tmp.path()).is_none());
        let err = load_config(&tmp.path().join(CONFIG_FILE_NAME)).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}

//! The `vdot_tb` run: configuration, path resolution and report lines.

use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};

use vdot_config::{find_config, load_config, ConfigError, HarnessConfig};
use vdot_harness::Harness;

/// Trace destination named on the command line.
///
/// Only exactly one positional argument counts; none or several mean that no
/// path was supplied.
pub fn resolve_trace_path(paths: &[String]) -> Option<PathBuf> {
    match paths {
        [path] => Some(PathBuf::from(path)),
        _ => None,
    }
}

/// Loads `--config` if given, else `./vdot.toml` if present, else defaults.
pub fn load_harness_config(config: Option<&str>, cwd: &Path) -> Result<HarnessConfig, ConfigError> {
    match config {
        Some(path) => load_config(Path::new(path)),
        None => match find_config(cwd) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using config");
                load_config(&path)
            }
            None => Ok(HarnessConfig::default()),
        },
    }
}

/// Runs the testbench from the process working directory.
pub fn run<W: Write>(
    paths: &[String],
    config: Option<&str>,
    out: &mut W,
) -> Result<i32, Box<dyn Error>> {
    let cwd = std::env::current_dir()?;
    run_in(&cwd, paths, config, out)
}

/// Runs the testbench with `cwd` as the working directory, writing the report
/// lines to `out`. Returns the exit code.
///
/// Relative trace paths, including the default, are resolved against `cwd`.
pub fn run_in<W: Write>(
    cwd: &Path,
    paths: &[String],
    config: Option<&str>,
    out: &mut W,
) -> Result<i32, Box<dyn Error>> {
    let mut harness_config = load_harness_config(config, cwd)?;
    if paths.len() > 1 {
        tracing::warn!(count = paths.len(), "ignoring extra arguments, using default trace path");
    }
    let trace_path = resolve_trace_path(paths).unwrap_or_else(|| harness_config.trace_path());
    harness_config.trace.path = Some(cwd.join(trace_path));

    let report = Harness::new(harness_config)?.run_with_output(out)?;
    out.flush()?;
    tracing::info!(
        result = report.result,
        expected = report.expected,
        time = %report.final_time,
        deltas = report.total_deltas,
        "run complete"
    );
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zero_args_is_no_path() {
        assert_eq!(resolve_trace_path(&[]), None);
    }

    #[test]
    fn one_arg_is_literal_path() {
        assert_eq!(
            resolve_trace_path(&args(&["waves/my run.vcd"])),
            Some(PathBuf::from("waves/my run.vcd"))
        );
    }

    #[test]
    fn two_args_is_no_path() {
        assert_eq!(resolve_trace_path(&args(&["a.vcd", "b.vcd"])), None);
    }

    #[test]
    fn default_trace_path_when_unset() {
        let tmp = TempDir::new().unwrap();
        let config = load_harness_config(None, tmp.path()).unwrap();
        assert_eq!(config.trace_path(), PathBuf::from("DotProduct_tb.vcd"));
    }

    #[test]
    fn config_discovered_in_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vdot.toml"), "[vectors]\nsize = 5\n").unwrap();
        let config = load_harness_config(None, tmp.path()).unwrap();
        assert_eq!(config.vectors.size, 5);
    }

    #[test]
    fn missing_explicit_config_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.toml");
        let err = load_harness_config(missing.to_str(), tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn run_prints_report_and_writes_trace() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("small.toml");
        fs::write(&config_path, "[vectors]\nsize = 10\na_value = 3\nb_value = 4\n").unwrap();
        let trace = tmp.path().join("run.vcd");

        let mut out = Vec::new();
        let code = run(
            &args(&[trace.to_str().unwrap()]),
            config_path.to_str(),
            &mut out,
        )
        .unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "VDotProduct start!\nDot Product: 120\nVDotProduct done!\n"
        );
        assert!(trace.exists());
    }

    #[test]
    fn no_arguments_write_default_trace_in_working_dir() {
        let tmp = TempDir::new().unwrap();
        let mut out = Vec::new();
        let code = run_in(tmp.path(), &[], None, &mut out).unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "VDotProduct start!\nDot Product: 20000\nVDotProduct done!\n"
        );
        let vcd = fs::read_to_string(tmp.path().join("DotProduct_tb.vcd")).unwrap();
        assert!(vcd.contains("$enddefinitions $end"));
        assert!(vcd.contains("result_o"));
    }

    #[test]
    fn extra_arguments_fall_back_to_default_trace() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vdot.toml"), "[vectors]\nsize = 3\n").unwrap();
        let mut out = Vec::new();
        run_in(tmp.path(), &args(&["a.vcd", "b.vcd"]), None, &mut out).unwrap();
        assert!(tmp.path().join("DotProduct_tb.vcd").is_file());
        assert!(!tmp.path().join("a.vcd").exists());
        assert!(String::from_utf8(out).unwrap().contains("Dot Product: 6\n"));
    }

    #[test]
    fn relative_trace_argument_resolves_against_working_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("vdot.toml"), "[vectors]\nsize = 2\n").unwrap();
        let mut out = Vec::new();
        run_in(tmp.path(), &args(&["waves.vcd"]), None, &mut out).unwrap();
        assert!(tmp.path().join("waves.vcd").is_file());
    }

    #[test]
    fn run_fails_on_unwritable_path() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("small.toml");
        fs::write(&config_path, "[vectors]\nsize = 2\n").unwrap();
        let trace = tmp.path().join("missing").join("run.vcd");

        let mut out = Vec::new();
        let err = run(
            &args(&[trace.to_str().unwrap()]),
            config_path.to_str(),
            &mut out,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot open trace file"));
        assert_eq!(String::from_utf8(out).unwrap(), "VDotProduct start!\n");
    }
}

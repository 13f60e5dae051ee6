//! CLI integration tests against CSV files and INI configs on disk.
//!
//! Tests cover:
//! - Argument parsing for every subcommand
//! - Data path resolution (flag vs. [data] path)
//! - simulate writing the daily CSV report
//! - validate, sweep, benchmark, overlap, info and list-symbols exit codes

use clap::Parser;
use regimesim::adapters::file_config_adapter::FileConfigAdapter;
use regimesim::cli::{self, Cli, Command};
use regimesim::domain::error::SimError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

// ExitCode doesn't implement PartialEq, so compare the Debug output
fn succeeded(code: ExitCode) -> bool {
    format!("{code:?}") == format!("{:?}", ExitCode::SUCCESS)
}

fn run(args: &[&str]) -> ExitCode {
    let mut argv = vec!["regimesim"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn write_prices(dir: &Path, symbol: &str, n: usize, daily: f64) {
    let mut file = fs::File::create(dir.join(format!("{symbol}.csv"))).unwrap();
    writeln!(file, "Date,Open,High,Low,Close,Adj Close,Volume").unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
    for i in 0..n {
        let date = start + chrono::Duration::days(i as i64);
        let close = 50.0 * (1.0 + daily).powi(i as i32);
        writeln!(file, "{date},{close},{close},{close},{close},{close},1000").unwrap();
    }
}

fn write_ini(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("run.ini");
    fs::write(&path, content).unwrap();
    path
}

fn data_dir() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    write_prices(dir.path(), "SPX", 120, 0.002);
    write_prices(dir.path(), "GLD", 120, -0.001);
    dir
}

fn run_ini(data: &Path) -> String {
    format!(
        "[data]\npath = {}\n\n[assets]\nrisk = SPX\nsignal = SPX\nhedge = GLD\n\n[simulation]\nma_window = 10\n",
        data.display()
    )
}

mod parsing {
    use super::*;

    #[test]
    fn simulate_with_overrides() {
        let cli = Cli::try_parse_from([
            "regimesim", "simulate", "-c", "a.ini", "--data", "prices", "-o", "out.csv",
        ])
        .unwrap();
        match cli.command {
            Command::Simulate {
                config,
                data,
                output,
            } => {
                assert_eq!(config, PathBuf::from("a.ini"));
                assert_eq!(data, Some(PathBuf::from("prices")));
                assert_eq!(output, Some(PathBuf::from("out.csv")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn simulate_requires_config() {
        assert!(Cli::try_parse_from(["regimesim", "simulate"]).is_err());
    }

    #[test]
    fn overlap_requires_symbols() {
        assert!(Cli::try_parse_from(["regimesim", "overlap", "--data", "d"]).is_err());
    }

    #[test]
    fn benchmark_custom_leverages() {
        let cli = Cli::try_parse_from([
            "regimesim", "benchmark", "-c", "a.ini", "--leverages", "1,1.5",
        ])
        .unwrap();
        match cli.command {
            Command::Benchmark { leverages, .. } => assert_eq!(leverages, vec![1.0, 1.5]),
            other => panic!("unexpected command {other:?}"),
        }
    }
}

mod data_path {
    use super::*;

    #[test]
    fn missing_everywhere_is_config_missing() {
        let err = cli::resolve_data_path(None, None).unwrap_err();
        assert!(matches!(err, SimError::ConfigMissing { ref section, .. } if section == "data"));
    }

    #[test]
    fn config_path_used_without_flag() {
        let cfg = FileConfigAdapter::from_string("[data]\npath = /prices\n").unwrap();
        let path = cli::resolve_data_path(None, Some(&cfg)).unwrap();
        assert_eq!(path, PathBuf::from("/prices"));
    }
}

mod commands {
    use super::*;

    #[test]
    fn simulate_writes_daily_report() {
        let data = data_dir();
        let work = tempfile::TempDir::new().unwrap();
        let ini = write_ini(work.path(), &run_ini(data.path()));
        let output = work.path().join("daily.csv");

        let code = run(&[
            "simulate",
            "-c",
            ini.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]);
        assert!(succeeded(code));
        assert!(output.exists(), "daily report should be written");

        let content = fs::read_to_string(&output).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("date,value,return,regime,signal_above,tilt,tax"));
        // 120 closes, 9 warmup rows
        assert_eq!(lines.count(), 111);
    }

    #[test]
    fn simulate_report_path_from_config() {
        let data = data_dir();
        let work = tempfile::TempDir::new().unwrap();
        let output = work.path().join("from_config.csv");
        let ini = write_ini(
            work.path(),
            &format!("{}\n[report]\noutput = {}\n", run_ini(data.path()), output.display()),
        );

        assert!(succeeded(run(&["simulate", "-c", ini.to_str().unwrap()])));
        assert!(output.exists());
    }

    #[test]
    fn simulate_data_flag_overrides_config() {
        let data = data_dir();
        let work = tempfile::TempDir::new().unwrap();
        let ini = write_ini(
            work.path(),
            "[data]\npath = /nonexistent/prices\n\n[assets]\nrisk = SPX\nsignal = SPX\n\n[simulation]\nma_window = 10\n",
        );

        let code = run(&[
            "simulate",
            "-c",
            ini.to_str().unwrap(),
            "--data",
            data.path().to_str().unwrap(),
        ]);
        assert!(succeeded(code));
    }

    #[test]
    fn simulate_missing_config_file_fails() {
        assert!(!succeeded(run(&["simulate", "-c", "/nonexistent/run.ini"])));
    }

    #[test]
    fn simulate_unknown_symbol_fails() {
        let data = data_dir();
        let work = tempfile::TempDir::new().unwrap();
        let ini = write_ini(
            work.path(),
            &format!(
                "[data]\npath = {}\n[assets]\nrisk = NOPE\nsignal = SPX\n",
                data.path().display()
            ),
        );
        assert!(!succeeded(run(&["simulate", "-c", ini.to_str().unwrap()])));
    }

    #[test]
    fn validate_accepts_good_config_and_rejects_bad_formula() {
        let work = tempfile::TempDir::new().unwrap();
        let good = write_ini(work.path(), "[assets]\nrisk = SPX\nsignal = SPX\n");
        assert!(succeeded(run(&["validate", "-c", good.to_str().unwrap()])));

        let bad = write_ini(
            work.path(),
            "[assets]\nrisk = SPX\nsignal = SPX\n[allocation]\nabove = 0.5*bonds\n",
        );
        assert!(!succeeded(run(&["validate", "-c", bad.to_str().unwrap()])));
    }

    #[test]
    fn sweep_benchmark_and_overlap_succeed() {
        let data = data_dir();
        let work = tempfile::TempDir::new().unwrap();
        let ini = write_ini(
            work.path(),
            &format!("{}\n[sweep]\nma_windows = 5, 10\nleverages = 1, 2\n", run_ini(data.path())),
        );
        let ini = ini.to_str().unwrap();
        let data_path = data.path().to_str().unwrap();

        assert!(succeeded(run(&["sweep", "-c", ini])));
        assert!(succeeded(run(&["benchmark", "-c", ini, "--leverages", "1,2"])));
        assert!(succeeded(run(&[
            "overlap", "--data", data_path, "--symbols", "SPX,GLD", "--window", "10",
        ])));
    }

    #[test]
    fn overlap_unknown_symbol_fails() {
        let data = data_dir();
        let data_path = data.path().to_str().unwrap();
        assert!(!succeeded(run(&[
            "overlap", "--data", data_path, "--symbols", "SPX,NOPE",
        ])));
    }

    #[test]
    fn info_and_list_symbols_succeed() {
        let data = data_dir();
        let data_path = data.path().to_str().unwrap();
        assert!(succeeded(run(&["list-symbols", "--data", data_path])));
        assert!(succeeded(run(&["info", "--data", data_path, "--symbol", "GLD"])));
        assert!(succeeded(run(&["info", "--data", data_path])));
    }
}

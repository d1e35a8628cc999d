use std::path::Path;

use cbx_bench::{run_benchmark, BenchConfig, BenchError, BenchHarness, RunMode};
use cbx_core::fakes::FakeRunner;
use cbx_core::{OutputMode, ProcessOutput};

fn bench_tree(scenarios: &[&str]) -> tempfile::TempDir {
    let root = tempfile::tempdir().unwrap();
    let provider = root.path().join("bench").join("benchmarking-provider");
    std::fs::create_dir_all(&provider).unwrap();
    std::fs::write(provider.join("manage.py"), "#!/usr/bin/env python3\n").unwrap();
    for name in scenarios {
        std::fs::write(provider.join(format!("launcher-{name}")), "[launcher]\n").unwrap();
    }
    root
}

fn config(root: &Path) -> BenchConfig {
    BenchConfig::from_bench_dir(root.join("bench"))
}

// ── Full run ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn two_scenarios_produce_four_timings() {
    let root = bench_tree(&["alpha", "beta"]);
    let runner = FakeRunner::new();

    let results = run_benchmark(&runner, config(root.path())).await.unwrap();

    let keys: Vec<_> = results.keys().collect();
    assert_eq!(
        keys,
        vec!["local-alpha", "local-beta", "remote-alpha", "remote-beta"]
    );
    for (_, seconds) in results.iter() {
        assert!(seconds >= 0.0);
    }
}

#[tokio::test]
async fn environment_is_prepared_before_any_launcher() {
    let root = bench_tree(&["alpha"]);
    let runner = FakeRunner::new();

    run_benchmark(&runner, config(root.path())).await.unwrap();

    let lines = runner.command_lines();
    assert!(lines[0].starts_with("./mk-venv "));
    assert!(lines[0].ends_with("/venv"));
    assert!(lines[1].contains("benchmarking-provider/manage.py develop -d "));
    assert!(lines[2].starts_with("checkbox-cli "));
    assert!(lines[2].ends_with("launcher-alpha"));
    assert!(lines[3].starts_with("checkbox-cli master localhost "));

    let mk_venv = &runner.calls()[0];
    assert_eq!(mk_venv.cwd.as_deref(), Some(root.path()));
}

#[tokio::test]
async fn every_slave_is_terminated() {
    let root = bench_tree(&["alpha", "beta"]);
    let runner = FakeRunner::new();

    run_benchmark(&runner, config(root.path())).await.unwrap();

    let slaves = runner.background_calls();
    assert_eq!(slaves.len(), 2);
    assert!(slaves
        .iter()
        .all(|s| s.command_line() == "checkbox-cli slave"));
    assert!(slaves.iter().all(|s| s.output == OutputMode::Inherit));
    assert_eq!(runner.terminations(), 2);
}

// ── Failure policy ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_provider_aborts_before_any_command() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("bench")).unwrap();
    let runner = FakeRunner::new();

    let err = run_benchmark(&runner, config(root.path())).await.unwrap_err();

    assert!(matches!(err, BenchError::ProviderMissing { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn venv_failure_is_fatal() {
    let root = bench_tree(&["alpha"]);
    let runner = FakeRunner::new();
    runner.on("./mk-venv", ProcessOutput::failure(1, "python3 -m venv failed"));

    let err = run_benchmark(&runner, config(root.path())).await.unwrap_err();

    assert!(matches!(err, BenchError::Environment(_)));
    assert_eq!(err.captured_output(), Some("python3 -m venv failed"));
    assert_eq!(runner.calls().len(), 1);
}

#[tokio::test]
async fn failing_local_run_reports_no_partial_results() {
    let root = bench_tree(&["alpha", "beta"]);
    let runner = FakeRunner::new();
    runner.on_with("checkbox-cli ", |inv| {
        if inv.command_line().ends_with("launcher-beta") && !inv.args.contains(&"master".to_string()) {
            ProcessOutput::failure(1, "job crashed")
        } else {
            ProcessOutput::success("")
        }
    });

    let err = run_benchmark(&runner, config(root.path())).await.unwrap_err();

    match err {
        BenchError::LauncherFailed { mode, launcher, .. } => {
            assert_eq!(mode, RunMode::Local);
            assert!(launcher.ends_with("launcher-beta"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn failing_master_still_terminates_slave() {
    let root = bench_tree(&["alpha"]);
    let runner = FakeRunner::new();
    runner.on("checkbox-cli master", ProcessOutput::failure(1, "Connection refused"));

    let err = run_benchmark(&runner, config(root.path())).await.unwrap_err();

    assert!(matches!(
        err,
        BenchError::LauncherFailed {
            mode: RunMode::Remote,
            ..
        }
    ));
    assert_eq!(err.captured_output(), Some("Connection refused"));
    assert_eq!(runner.terminations(), 1);
}

#[tokio::test]
async fn slave_dying_early_is_fatal_even_if_master_succeeds() {
    let root = bench_tree(&["alpha"]);
    let runner = FakeRunner::new();
    runner.background_exits_early(true);
    let tmp = tempfile::tempdir().unwrap();

    let harness = BenchHarness::prepare(&runner, config(root.path()), tmp.path())
        .await
        .unwrap();
    let launcher = root
        .path()
        .join("bench/benchmarking-provider/launcher-alpha");

    let local = harness.run_locally(&launcher).await.unwrap();
    assert!(local >= 0.0);

    let err = harness.run_remotely(&launcher).await.unwrap_err();
    assert!(matches!(err, BenchError::SlaveDied));
    assert_eq!(runner.terminations(), 1);
}

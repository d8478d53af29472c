//! Process-level tests: compiles fixture C programs and drives them through
//! the Sandbox Launcher directly, covering the boundary behaviors in §8.

use diffjudge::config::Config;
use diffjudge::model::VerdictKind;
use diffjudge::sandbox::{Launcher, LaunchSpec};
use diffjudge_tests::{compile_fixture, BIG_STDOUT_PROGRAM, HUGE_MALLOC_PROGRAM, OK_PROGRAM, SPIN_FOREVER_PROGRAM};
use std::path::PathBuf;
use std::time::Duration;

fn test_config() -> Config {
    let mut config = Config::default();
    config.rlimit_wrapper_executable = PathBuf::from(env!("CARGO_BIN_EXE_diffjudge-rlw"));
    config.program_limits.cpu_time = Duration::from_secs(2);
    config.program_limits.address_space_bytes = 64 * 1024 * 1024;
    config.program_limits.output_limit_bytes = 4096;
    config
}

#[tokio::test]
async fn ok_program_exits_cleanly() {
    let config = test_config();
    let scratch = tempfile::tempdir().unwrap();
    let exe = compile_fixture(&config, scratch.path(), "ok", OK_PROGRAM).await;

    let launcher = Launcher::new(config);
    let spec = LaunchSpec::new(&exe).stdin_bytes(b"3 5".to_vec());
    let outcome = launcher.launch(spec).await.unwrap();

    assert!(outcome.is_ok());
    assert_eq!(String::from_utf8_lossy(&outcome.stdout).trim(), "8");
}

#[tokio::test]
async fn spinning_program_is_tle() {
    let config = test_config();
    let scratch = tempfile::tempdir().unwrap();
    let exe = compile_fixture(&config, scratch.path(), "spin", SPIN_FOREVER_PROGRAM).await;

    let limits = config.program_limits.clone();
    let launcher = Launcher::new(config);
    let spec = LaunchSpec {
        cpu_time: limits.cpu_time,
        address_space_bytes: limits.address_space_bytes,
        output_limit_bytes: limits.output_limit_bytes,
        ..LaunchSpec::new(&exe)
    };
    let outcome = launcher.launch(spec).await.unwrap();

    assert_eq!(outcome.verdict_kind, VerdictKind::Tle);
    assert!(outcome.user_time_us as f64 / 1_000_000.0 >= limits.cpu_time.as_secs_f64() * 0.9);
}

#[tokio::test]
async fn huge_allocation_is_killed_or_re() {
    let config = test_config();
    let scratch = tempfile::tempdir().unwrap();
    let exe = compile_fixture(&config, scratch.path(), "malloc", HUGE_MALLOC_PROGRAM).await;

    let launcher = Launcher::new(config);
    let outcome = launcher.launch(LaunchSpec::new(&exe)).await.unwrap();

    assert!(matches!(outcome.verdict_kind, VerdictKind::Killed | VerdictKind::Re));
}

#[tokio::test]
async fn oversized_stdout_is_ole() {
    let config = test_config();
    let scratch = tempfile::tempdir().unwrap();
    let exe = compile_fixture(&config, scratch.path(), "bigout", BIG_STDOUT_PROGRAM).await;

    let launcher = Launcher::new(config);
    let outcome = launcher.launch(LaunchSpec::new(&exe)).await.unwrap();

    assert_eq!(outcome.verdict_kind, VerdictKind::Ole);
}

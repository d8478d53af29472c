//! End-to-end Controller tests against the in-memory stores, covering
//! scenarios 1, 2, 3, 4, 5, and 6 from §8.

use diffjudge::config::Config;
use diffjudge::controller::Controller;
use diffjudge::model::SessionCode;
use diffjudge::persistence::{InMemoryStore, TestCaseStore};
use diffjudge::stopflags::StopFlags;
use diffjudge::stream::Event;
use diffjudge_tests::{c_blob, compile_wcmp_checker, HUGE_MALLOC_PROGRAM, SPIN_FOREVER_PROGRAM, SYNTAX_ERROR_PROGRAM};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn generator_printing(text: &str) -> diffjudge::model::CodeBlob {
    let source = format!(
        r#"
#include <stdio.h>
int main(void) {{
    printf("{}\n");
    return 0;
}}
"#,
        text
    );
    c_blob(&source)
}

fn user_and_std_sum() -> (diffjudge::model::CodeBlob, diffjudge::model::CodeBlob) {
    let sum = r#"
#include <stdio.h>
int main(void) { int a, b; scanf("%d %d", &a, &b); printf("%d\n", a + b); return 0; }
"#;
    (c_blob(sum), c_blob(sum))
}

async fn test_config_with_checker(checker_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.rlimit_wrapper_executable = PathBuf::from(env!("CARGO_BIN_EXE_diffjudge-rlw"));
    config.checker_executable_prefix = checker_dir.to_path_buf();
    config.program_limits.cpu_time = Duration::from_secs(2);
    compile_wcmp_checker(&config, checker_dir).await;
    config
}

async fn collect_events<S, T>(
    controller: &Controller<S, T>,
    session_id: i64,
    max_tests: i64,
    checker: &str,
) -> Vec<Event>
where
    S: diffjudge::persistence::SessionStore + 'static,
    T: TestCaseStore + 'static,
{
    let events = std::sync::Mutex::new(Vec::new());
    controller
        .start(session_id, max_tests, checker, |event| {
            events.lock().unwrap().push(event);
            async { Ok(()) }
        })
        .await;
    events.into_inner().unwrap()
}

#[tokio::test]
async fn all_pass_bounded_run_emits_three_ok_results() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let (user, reference) = user_and_std_sum();
    sessions.put_session(
        1,
        SessionCode {
            user,
            reference,
            generator: Some(generator_printing("3 5")),
        },
    );

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events = collect_events(&controller, 1, 3, "wcmp").await;

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TestResult { test_case, .. } => Some(test_case),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|c| c.status == "OK"));
    assert!(matches!(events.last(), Some(Event::Finish)));
    assert_eq!(cases.list(1).await.unwrap().len(), 3);
}

#[tokio::test]
async fn first_test_wa_stops_the_run() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let off_by_one = c_blob(
        r#"
#include <stdio.h>
int main(void) { int a, b; scanf("%d %d", &a, &b); printf("%d\n", a + b + 1); return 0; }
"#,
    );
    let correct = c_blob(
        r#"
#include <stdio.h>
int main(void) { int a, b; scanf("%d %d", &a, &b); printf("%d\n", a + b); return 0; }
"#,
    );
    sessions.put_session(
        2,
        SessionCode {
            user: off_by_one,
            reference: correct,
            generator: Some(generator_printing("2 2")),
        },
    );

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events = collect_events(&controller, 2, 3, "wcmp").await;

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TestResult { test_case, .. } => Some(test_case),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, "WA");
    assert!(matches!(events.last(), Some(Event::Finish)));
}

#[tokio::test]
async fn user_tle_stops_the_run_with_time_recorded() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let (_, reference) = user_and_std_sum();
    sessions.put_session(
        5,
        SessionCode {
            user: c_blob(SPIN_FOREVER_PROGRAM),
            reference,
            generator: Some(generator_printing("1 1")),
        },
    );

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events = collect_events(&controller, 5, 3, "wcmp").await;

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TestResult { test_case, .. } => Some(test_case),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status, "User TLE");
    assert!(results[0].time_used_ms.unwrap_or(0.0) >= Duration::from_secs(2).as_millis() as f64);
    assert!(matches!(events.last(), Some(Event::Finish)));
    assert_eq!(cases.list(5).await.unwrap().len(), 1);
}

#[tokio::test]
async fn user_mle_or_re_stops_the_run_with_memory_recorded() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let (_, reference) = user_and_std_sum();
    sessions.put_session(
        6,
        SessionCode {
            user: c_blob(HUGE_MALLOC_PROGRAM),
            reference,
            generator: Some(generator_printing("1 1")),
        },
    );

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events = collect_events(&controller, 6, 3, "wcmp").await;

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TestResult { test_case, .. } => Some(test_case),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].status.starts_with("User "));
    assert!(results[0].status == "User KILLED" || results[0].status == "User RE");
    assert!(results[0].memory_used_mib.is_some());
    assert!(matches!(events.last(), Some(Event::Finish)));
}

#[tokio::test]
async fn compile_error_emits_failed_with_no_test_results() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let (_, reference) = user_and_std_sum();
    sessions.put_session(
        3,
        SessionCode {
            user: c_blob(SYNTAX_ERROR_PROGRAM),
            reference,
            generator: Some(generator_printing("1 1")),
        },
    );

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events = collect_events(&controller, 3, 3, "wcmp").await;

    assert!(events.iter().any(|e| matches!(e, Event::Failed { .. })));
    assert!(events.iter().all(|e| !matches!(e, Event::TestResult { .. })));
    assert!(cases.list(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn rerun_replays_stored_inputs_with_fixed_user() {
    let checker_dir = tempfile::tempdir().unwrap();
    let config = test_config_with_checker(checker_dir.path()).await;

    let sessions = Arc::new(InMemoryStore::new());
    let cases = Arc::new(InMemoryStore::new());
    let (user, reference) = user_and_std_sum();
    sessions.put_session(
        4,
        SessionCode {
            user: user.clone(),
            reference: reference.clone(),
            generator: None,
        },
    );

    let mut first = diffjudge::model::TestCase::new(4, chrono::Utc::now());
    first.input_data = "1 1".to_string();
    first.status = "WA".to_string();
    let mut second = diffjudge::model::TestCase::new(4, chrono::Utc::now());
    second.input_data = "2 2".to_string();
    second.status = "WA".to_string();
    cases.append(&first).await.unwrap();
    cases.append(&second).await.unwrap();

    let controller = Controller::new(config, sessions, cases.clone(), StopFlags::new());
    let events_mutex = std::sync::Mutex::new(Vec::new());
    controller
        .rerun(4, "wcmp", |event| {
            events_mutex.lock().unwrap().push(event);
            async { Ok(()) }
        })
        .await;
    let events = events_mutex.into_inner().unwrap();

    let results: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::TestResult { test_case, .. } => Some(test_case),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|c| c.status == "OK"));
    assert_eq!(results[0].input_data, "1 1");
    assert_eq!(results[1].input_data, "2 2");
}

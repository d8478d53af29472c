//! Diff Controller (§4.6): orchestrates the stress loop and the rerun loop,
//! consulting the stop-flag set at each iteration boundary and emitting a
//! terminal-event-exactly-once stream of progress.

use crate::compiler::{CompileOutcome, Compiler};
use crate::config::Config;
use crate::judge::Judge;
use crate::model::{CodeBlob, TestCase};
use crate::persistence::{SessionStore, TestCaseStore};
use crate::stopflags::StopFlags;
use crate::stream::Event;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

const MIN_MAX_TESTS: u32 = 1;
const MAX_MAX_TESTS: u32 = 1000;

/// Clamps `requested` into `[1, 1000]`, following the original service's
/// `max(min(max_tests, 1000), 1)` behavior rather than rejecting it (§13).
pub fn clamp_max_tests(requested: i64) -> u32 {
    requested.clamp(MIN_MAX_TESTS as i64, MAX_MAX_TESTS as i64) as u32
}

pub struct Controller<S, T> {
    config: Config,
    sessions: Arc<S>,
    cases: Arc<T>,
    stop_flags: StopFlags,
}

impl<S, T> Controller<S, T>
where
    S: SessionStore + 'static,
    T: TestCaseStore + 'static,
{
    pub fn new(config: Config, sessions: Arc<S>, cases: Arc<T>, stop_flags: StopFlags) -> Self {
        Controller {
            config,
            sessions,
            cases,
            stop_flags,
        }
    }

    pub fn stop(&self, session_id: i64) {
        self.stop_flags.request_stop(session_id);
    }

    /// Runs a fresh stress-test loop, calling `emit` once per event in
    /// strict program order. `emit` errors are treated as a client
    /// disconnect: the run is abandoned and resources released, but no
    /// further emission is attempted.
    pub async fn start<E, Fut>(
        &self,
        session_id: i64,
        max_tests: i64,
        checker_name: &str,
        mut emit: E,
    ) where
        E: FnMut(Event) -> Fut,
        Fut: std::future::Future<Output = Result<(), ()>>,
    {
        let span = tracing::info_span!("controller.start", session_id);
        let _guard = span.enter();

        self.stop_flags.clear(session_id);
        if let Err(e) = self.cases.clear(session_id).await {
            warn!(error = %e, "failed to clear prior test cases");
            let _ = emit(Event::Error {
                message: format!("persistence error: {}", e),
            })
            .await;
            return;
        }

        let codes = match self.sessions.load_codes(session_id).await {
            Ok(codes) => codes,
            Err(e) => {
                let _ = emit(Event::Error {
                    message: format!("failed to load session: {}", e),
                })
                .await;
                return;
            }
        };

        let scratch_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                let _ = emit(Event::Error {
                    message: format!("failed to create scratch directory: {}", e),
                })
                .await;
                return;
            }
        };

        let compiler = Compiler::new(self.config.clone());

        if emit(Event::Status {
            status: "Compiling user code".to_string(),
        })
        .await
        .is_err()
        {
            return;
        }
        let user_exe = match compile_or_fail(&compiler, &codes.user, scratch_dir.path(), "user", &mut emit).await {
            Some(exe) => exe,
            None => return,
        };

        if emit(Event::Status {
            status: "Compiling std code".to_string(),
        })
        .await
        .is_err()
        {
            return;
        }
        let std_exe = match compile_or_fail(&compiler, &codes.reference, scratch_dir.path(), "std", &mut emit).await {
            Some(exe) => exe,
            None => return,
        };

        let gen_exe = if let Some(generator) = &codes.generator {
            if emit(Event::Status {
                status: "Compiling generator code".to_string(),
            })
            .await
            .is_err()
            {
                return;
            }
            match compile_or_fail(&compiler, generator, scratch_dir.path(), "gen", &mut emit).await {
                Some(exe) => Some(exe),
                None => return,
            }
        } else {
            None
        };

        let judge = Judge::new(self.config.clone());
        let max_tests = clamp_max_tests(max_tests);
        info!(max_tests, "starting stress loop");

        for i in 0..max_tests {
            if emit(Event::Status {
                status: format!("Running test {}/{}", i + 1, max_tests),
            })
            .await
            .is_err()
            {
                return;
            }

            let mut case = TestCase::new(session_id, Utc::now());
            let run_result = judge
                .run_step(
                    &mut case,
                    gen_exe.as_deref(),
                    &user_exe,
                    &std_exe,
                    checker_name,
                    scratch_dir.path(),
                )
                .await;

            let passed = match run_result {
                Ok(passed) => passed,
                Err(e) => {
                    let _ = emit(Event::Error {
                        message: format!("judging error: {}", e),
                    })
                    .await;
                    return;
                }
            };

            let case_id = match self.cases.append(&case).await {
                Ok(id) => id,
                Err(e) => {
                    let _ = emit(Event::Error {
                        message: format!("persistence error: {}", e),
                    })
                    .await;
                    return;
                }
            };
            case.id = Some(case_id);

            if emit(Event::TestResult {
                test_num: i + 1,
                test_case: case,
            })
            .await
            .is_err()
            {
                return;
            }

            if !passed {
                break;
            }
            if self.stop_flags.is_stopped(session_id) {
                warn!("stop observed at iteration boundary");
                break;
            }
        }

        let _ = emit(Event::Finish).await;
    }

    /// Replays the session's existing TestCases against freshly compiled
    /// binaries. No generator is compiled; inputs are reused verbatim.
    pub async fn rerun<E, Fut>(&self, session_id: i64, checker_name: &str, mut emit: E)
    where
        E: FnMut(Event) -> Fut,
        Fut: std::future::Future<Output = Result<(), ()>>,
    {
        let span = tracing::info_span!("controller.rerun", session_id);
        let _guard = span.enter();

        let codes = match self.sessions.load_codes(session_id).await {
            Ok(codes) => codes,
            Err(e) => {
                let _ = emit(Event::Error {
                    message: format!("failed to load session: {}", e),
                })
                .await;
                return;
            }
        };

        let existing = match self.cases.list(session_id).await {
            Ok(cases) => cases,
            Err(e) => {
                let _ = emit(Event::Error {
                    message: format!("persistence error: {}", e),
                })
                .await;
                return;
            }
        };

        let scratch_dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                let _ = emit(Event::Error {
                    message: format!("failed to create scratch directory: {}", e),
                })
                .await;
                return;
            }
        };

        let compiler = Compiler::new(self.config.clone());

        if emit(Event::Status {
            status: "Compiling user code".to_string(),
        })
        .await
        .is_err()
        {
            return;
        }
        let user_exe = match compile_or_fail(&compiler, &codes.user, scratch_dir.path(), "user", &mut emit).await {
            Some(exe) => exe,
            None => return,
        };

        if emit(Event::Status {
            status: "Compiling std code".to_string(),
        })
        .await
        .is_err()
        {
            return;
        }
        let std_exe = match compile_or_fail(&compiler, &codes.reference, scratch_dir.path(), "std", &mut emit).await {
            Some(exe) => exe,
            None => return,
        };

        let judge = Judge::new(self.config.clone());
        let total = existing.len() as u32;
        info!(total, "starting rerun loop");

        for (i, mut case) in existing.into_iter().enumerate() {
            if emit(Event::Status {
                status: format!("Running test {}/{}", i + 1, total),
            })
            .await
            .is_err()
            {
                return;
            }

            let run_result = judge
                .run_step(
                    &mut case,
                    None,
                    &user_exe,
                    &std_exe,
                    checker_name,
                    scratch_dir.path(),
                )
                .await;

            let passed = match run_result {
                Ok(passed) => passed,
                Err(e) => {
                    let _ = emit(Event::Error {
                        message: format!("judging error: {}", e),
                    })
                    .await;
                    return;
                }
            };

            if let Err(e) = self.cases.update(&case).await {
                let _ = emit(Event::Error {
                    message: format!("persistence error: {}", e),
                })
                .await;
                return;
            }

            if emit(Event::TestResult {
                test_num: i as u32 + 1,
                test_case: case,
            })
            .await
            .is_err()
            {
                return;
            }

            if !passed {
                break;
            }
            if self.stop_flags.is_stopped(session_id) {
                warn!("stop observed at iteration boundary");
                break;
            }
        }

        let _ = emit(Event::Finish).await;
    }
}

async fn compile_or_fail<E, Fut>(
    compiler: &Compiler,
    blob: &CodeBlob,
    scratch_dir: &std::path::Path,
    role: &str,
    emit: &mut E,
) -> Option<std::path::PathBuf>
where
    E: FnMut(Event) -> Fut,
    Fut: std::future::Future<Output = Result<(), ()>>,
{
    let out_name = crate::compiler::artifact_path(scratch_dir, role);
    let out_name = out_name.file_name()?.to_str()?;
    match compiler.compile(blob, scratch_dir, out_name).await {
        Ok(CompileOutcome::Compiled(artifact)) => Some(artifact.exe_path),
        Ok(CompileOutcome::CompileError { message, stderr_excerpt }) => {
            let _ = emit(Event::Failed {
                message: format!("{} code: {}", role, message),
                detail: stderr_excerpt,
            })
            .await;
            None
        }
        Err(e) => {
            let _ = emit(Event::Error {
                message: format!("compiler plumbing error: {}", e),
            })
            .await;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_max_tests_clamps_both_ends() {
        assert_eq!(clamp_max_tests(0), 1);
        assert_eq!(clamp_max_tests(-5), 1);
        assert_eq!(clamp_max_tests(5), 5);
        assert_eq!(clamp_max_tests(5000), 1000);
    }
}

//! Judge Step (§4.5): one test-case transition — generate, run user, run
//! reference, check — expressed as a small state machine that never treats
//! an expected verdict (WA, TLE, ...) as a `Result::Err`.

use crate::checker::Checker;
use crate::config::Config;
use crate::model::{SandboxOutcome, TestCase, VerdictKind};
use crate::sandbox::{Launcher, LaunchSpec};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::path::Path;

const SEED_LEN: usize = 16;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Sandbox(#[from] crate::error::Error),
    #[error("{0}")]
    Checker(#[from] crate::checker::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Which role a sandboxed run played, used only to prefix a `TestCase`'s
/// status string (§4.5, §13's "<Role> <Kind>" convention).
#[derive(Debug, Copy, Clone)]
enum Role {
    Generator,
    User,
    Std,
}

impl Role {
    fn label(self) -> &'static str {
        match self {
            Role::Generator => "Generator",
            Role::User => "User",
            Role::Std => "Std",
        }
    }
}

pub struct Judge {
    launcher: Launcher,
    checker: Checker,
    config: Config,
}

impl Judge {
    pub fn new(config: Config) -> Self {
        Judge {
            launcher: Launcher::new(config.clone()),
            checker: Checker::new(config.clone()),
            config,
        }
    }

    fn program_spec(&self, program: &Path) -> LaunchSpec {
        let limits = &self.config.program_limits;
        LaunchSpec {
            cpu_time: limits.cpu_time,
            address_space_bytes: limits.address_space_bytes,
            output_limit_bytes: limits.output_limit_bytes,
            ..LaunchSpec::new(program)
        }
    }

    /// Runs one full iteration, filling in `case`. Returns `Ok(true)` when
    /// the checker accepted the result, `Ok(false)` on any non-OK step
    /// (the case is still fully annotated). Only plumbing failures are `Err`.
    pub async fn run_step(
        &self,
        case: &mut TestCase,
        generator_exe: Option<&Path>,
        user_exe: &Path,
        reference_exe: &Path,
        checker_name: &str,
        scratch_dir: &Path,
    ) -> Result<bool, Error> {
        let input = if let Some(generator) = generator_exe {
            let seed = random_seed();
            let spec = self.program_spec(generator).arg(seed);
            let outcome = self.launcher.launch(spec).await?;
            let generated = String::from_utf8_lossy(&outcome.stdout).into_owned();
            case.input_data = generated.clone();
            if !outcome.is_ok() {
                annotate_failure(case, Role::Generator, &outcome);
                return Ok(false);
            }
            generated
        } else {
            case.input_data.clone()
        };
        case.input_data = input.clone();

        let user_spec = self.program_spec(user_exe).stdin_bytes(input.clone().into_bytes());
        let user_outcome = self.launcher.launch(user_spec).await?;
        case.time_used_ms = Some(user_outcome.time_used_ms());
        case.memory_used_mib = Some(user_outcome.memory_used_mib());
        if !user_outcome.is_ok() {
            annotate_failure(case, Role::User, &user_outcome);
            return Ok(false);
        }
        let user_output = String::from_utf8_lossy(&user_outcome.stdout).into_owned();
        case.user_output = user_output.clone();

        let std_spec = self.program_spec(reference_exe).stdin_bytes(input.clone().into_bytes());
        let std_outcome = self.launcher.launch(std_spec).await?;
        if !std_outcome.is_ok() {
            annotate_failure(case, Role::Std, &std_outcome);
            return Ok(false);
        }
        let std_output = String::from_utf8_lossy(&std_outcome.stdout).into_owned();
        case.std_output = std_output.clone();

        let input_path = scratch_dir.join("checker_input");
        let output_path = scratch_dir.join("checker_output");
        let answer_path = scratch_dir.join("checker_answer");
        tokio::fs::write(&input_path, &input).await?;
        tokio::fs::write(&output_path, &user_output).await?;
        tokio::fs::write(&answer_path, &std_output).await?;

        let result = self
            .checker
            .check(checker_name, &input_path, &output_path, &answer_path)
            .await?;
        case.status = result.status;
        case.detail = result.detail;

        Ok(case.is_ok())
    }
}

fn random_seed() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .filter(|b| b.is_ascii_alphabetic())
        .take(SEED_LEN)
        .map(char::from)
        .collect()
}

fn annotate_failure(case: &mut TestCase, role: Role, outcome: &SandboxOutcome) {
    case.status = format!("{} {}", role.label(), outcome.verdict_kind.label());
    case.detail = match outcome.verdict_kind {
        VerdictKind::Re => outcome
            .signal_number
            .map(|sig| format!("{} RE ({})", role.label(), signal_name(sig)))
            .unwrap_or_else(|| format!("{} RE", role.label())),
        _ => format!("{} {}", role.label(), outcome.verdict_kind.label()),
    };
}

fn signal_name(signal: i32) -> &'static str {
    match signal {
        libc::SIGSEGV => "SIGSEGV",
        libc::SIGABRT => "SIGABRT",
        libc::SIGFPE => "SIGFPE",
        libc::SIGBUS => "SIGBUS",
        libc::SIGILL => "SIGILL",
        libc::SIGPIPE => "SIGPIPE",
        _ => "SIGNAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_seed_is_sixteen_alphabetic_chars() {
        let seed = random_seed();
        assert_eq!(seed.len(), SEED_LEN);
        assert!(seed.chars().all(|c| c.is_ascii_alphabetic()));
    }

    #[test]
    fn signal_name_maps_common_signals() {
        assert_eq!(signal_name(libc::SIGSEGV), "SIGSEGV");
        assert_eq!(signal_name(9999), "SIGNAL");
    }

    #[test]
    fn annotate_failure_includes_signal_name_for_re() {
        let mut case = TestCase::new(1, chrono::Utc::now());
        let outcome = SandboxOutcome {
            verdict_kind: VerdictKind::Re,
            raw_exit_code: 0,
            signal_number: Some(libc::SIGSEGV),
            user_time_us: 0,
            sys_time_us: 0,
            peak_rss_kib: 0,
            stdout: vec![],
            stderr: vec![],
        };
        annotate_failure(&mut case, Role::User, &outcome);
        assert_eq!(case.status, "User RE");
        assert_eq!(case.detail, "User RE (SIGSEGV)");
    }

    #[test]
    fn annotate_failure_mirrors_status_into_detail_for_non_re_kinds() {
        let mut case = TestCase::new(1, chrono::Utc::now());
        let outcome = SandboxOutcome {
            verdict_kind: VerdictKind::Tle,
            raw_exit_code: 0,
            signal_number: None,
            user_time_us: 0,
            sys_time_us: 0,
            peak_rss_kib: 0,
            stdout: vec![],
            stderr: vec![],
        };
        annotate_failure(&mut case, Role::User, &outcome);
        assert_eq!(case.status, "User TLE");
        assert_eq!(case.detail, "User TLE");
    }
}

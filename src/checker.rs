//! Checker Driver (§4.4): runs an external testlib-convention checker over
//! (input, output, answer) and maps its exit code to a verdict.
//!
//! Checkers are trusted, pre-compiled operator binaries, but this driver
//! still runs them through the Sandbox Launcher to reuse its byte-capped
//! I/O and accounting rather than inventing a second execution path.

use crate::config::Config;
use crate::sandbox::{Launcher, LaunchSpec, MountSpec};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Sandbox(#[from] crate::error::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub status: String,
    pub detail: String,
}

pub struct Checker {
    launcher: Launcher,
    config: Config,
}

impl Checker {
    pub fn new(config: Config) -> Self {
        Checker {
            launcher: Launcher::new(config.clone()),
            config,
        }
    }

    pub async fn check(
        &self,
        checker_name: &str,
        input: &Path,
        output: &Path,
        answer: &Path,
    ) -> Result<CheckResult, Error> {
        let checker_host_path = self.config.checker_executable_prefix.join(checker_name);
        let limits = &self.config.checker_limits;

        let spec = LaunchSpec::new("/home/checker")
            .arg("/home/input")
            .arg("/home/output")
            .arg("/home/answer")
            .mount(MountSpec::readonly(&checker_host_path, "/home/checker"))
            .mount(MountSpec::readonly(input, "/home/input"))
            .mount(MountSpec::readonly(output, "/home/output"))
            .mount(MountSpec::readonly(answer, "/home/answer"));
        let spec = LaunchSpec {
            cpu_time: limits.cpu_time,
            address_space_bytes: limits.address_space_bytes,
            output_limit_bytes: limits.output_limit_bytes,
            ..spec
        };

        let outcome = self.launcher.launch(spec).await?;

        if !outcome.verdict_kind.is_ok() {
            return Ok(CheckResult {
                status: format!("Checker {}", outcome.verdict_kind.label()),
                detail: String::from_utf8_lossy(&outcome.stderr).into_owned(),
            });
        }

        let detail = String::from_utf8_lossy(&outcome.stderr).into_owned();
        match outcome.raw_exit_code {
            0 => Ok(CheckResult {
                status: "OK".to_string(),
                detail,
            }),
            1 => Ok(CheckResult {
                status: "WA".to_string(),
                detail,
            }),
            2 => Ok(CheckResult {
                status: "Checker PE".to_string(),
                detail,
            }),
            other => Ok(CheckResult {
                status: format!("Checker {}", other),
                detail,
            }),
        }
    }
}

//! Compiler Driver (§4.3): stages a source blob in a scratch directory and
//! invokes `gcc`/`g++` through the Sandbox Launcher.

use crate::config::Config;
use crate::model::{CodeBlob, CompileArtifact, Language};
use crate::sandbox::{Launcher, LaunchSpec, MountSpec};
use std::path::{Path, PathBuf};

const STDERR_EXCERPT_CAP: usize = 1024;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Sandbox(#[from] crate::error::Error),
}

/// Mirrors §7's distinction between a compiler that ran and produced
/// diagnostics versus a sandbox that could not run it at all.
#[derive(Debug)]
pub enum CompileOutcome {
    Compiled(CompileArtifact),
    CompileError { message: String, stderr_excerpt: String },
}

pub struct Compiler {
    launcher: Launcher,
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Compiler {
            launcher: Launcher::new(config.clone()),
            config,
        }
    }

    pub async fn compile(
        &self,
        blob: &CodeBlob,
        scratch_dir: &Path,
        out_name: &str,
    ) -> Result<CompileOutcome, Error> {
        let (toolchain, source_name) = match blob.language {
            Language::C => ("gcc", "source.c"),
            Language::Cpp => ("g++", "source.cpp"),
        };

        let source_path = scratch_dir.join(source_name);
        std::fs::write(&source_path, &blob.content).map_err(|e| {
            Error::Sandbox(crate::error::Error::Io { cause: e })
        })?;

        let exe_host_path = scratch_dir.join(out_name);
        std::fs::write(&exe_host_path, []).map_err(|e| {
            Error::Sandbox(crate::error::Error::Io { cause: e })
        })?;

        let limits = &self.config.compiler_limits;
        let spec = LaunchSpec::new(format!("/usr/bin/{}", toolchain))
            .arg("-x")
            .arg(match blob.language {
                Language::C => "c",
                Language::Cpp => "c++",
            })
            .arg("-std")
            .arg(&blob.standard)
            .arg("-O2")
            .arg("/home/src")
            .arg("-o")
            .arg("/home/out")
            .mount(MountSpec::readonly(&source_path, "/home/src"))
            .mount(MountSpec::writable(&exe_host_path, "/home/out"))
            .mount(MountSpec::readonly(
                &self.config.testlib_path,
                "/home/testlib.h",
            ));
        let spec = LaunchSpec {
            cpu_time: limits.cpu_time,
            address_space_bytes: limits.address_space_bytes,
            output_limit_bytes: limits.output_limit_bytes,
            ..spec
        };

        let outcome = self.launcher.launch(spec).await?;

        if outcome.verdict_kind.is_ok() {
            let stderr_excerpt = truncated_utf8(&outcome.stderr, STDERR_EXCERPT_CAP);
            if outcome.raw_exit_code == 0 {
                Ok(CompileOutcome::Compiled(CompileArtifact {
                    exe_path: exe_host_path,
                    stderr_excerpt,
                }))
            } else {
                Ok(CompileOutcome::CompileError {
                    message: "Compile Error".to_string(),
                    stderr_excerpt,
                })
            }
        } else {
            Ok(CompileOutcome::CompileError {
                message: format!("Compiler {}", outcome.verdict_kind.label()),
                stderr_excerpt: truncated_utf8(&outcome.stderr, STDERR_EXCERPT_CAP),
            })
        }
    }
}

fn truncated_utf8(bytes: &[u8], cap: usize) -> String {
    let slice = &bytes[..bytes.len().min(cap)];
    String::from_utf8_lossy(slice).into_owned()
}

/// Picks the path a freshly compiled artifact should land at within a
/// scratch directory, so callers share one naming convention.
pub fn artifact_path(scratch_dir: &Path, role: &str) -> PathBuf {
    scratch_dir.join(format!("{}_exe", role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_is_scoped_to_role() {
        let dir = PathBuf::from("/tmp/run-1");
        assert_eq!(artifact_path(&dir, "user"), PathBuf::from("/tmp/run-1/user_exe"));
        assert_eq!(artifact_path(&dir, "std"), PathBuf::from("/tmp/run-1/std_exe"));
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let bytes = "héllo".as_bytes();
        // cap=2 would split the multi-byte 'é'; from_utf8_lossy must not panic,
        // and replaces the split byte rather than dropping it silently.
        let s = truncated_utf8(bytes, 2);
        assert_eq!(s, "h\u{FFFD}");
    }
}

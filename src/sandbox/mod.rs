//! Sandbox Launcher (§4.2): builds a `bwrap` invocation around the
//! Resource-Limited Wrapper, captures stdio through real temp files so
//! `RLIMIT_FSIZE` can enforce the output cap, and turns the accounting
//! record RLW writes back into a normalized [`SandboxOutcome`].

mod mount;

pub use mount::{MountKind, MountSpec};

use crate::accounting::{AccountingRecord, RECORD_LEN};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{SandboxOutcome, VerdictKind};
use nix::fcntl::{fcntl, FcntlArg, FdFlag};
use nix::unistd::{self, pipe2};
use std::ffi::OsString;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::os::unix::io::RawFd;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Fixed mount point inside the sandbox where RLW itself is bind-mounted.
const RLW_MOUNT_POINT: &str = "/home/.rlw";

#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Path to the target executable, as seen *inside* the sandbox.
    pub program: PathBuf,
    pub argv: Vec<OsString>,
    pub cpu_time: Duration,
    pub address_space_bytes: u64,
    pub output_limit_bytes: u64,
    pub mounts: Vec<MountSpec>,
    pub stdin: Option<Vec<u8>>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        LaunchSpec {
            program: program.into(),
            argv: Vec::new(),
            cpu_time: Duration::from_secs(5),
            address_space_bytes: 256 * 1024 * 1024,
            output_limit_bytes: 16 * 1024,
            mounts: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, a: impl Into<OsString>) -> Self {
        self.argv.push(a.into());
        self
    }

    pub fn mount(mut self, m: MountSpec) -> Self {
        self.mounts.push(m);
        self
    }

    pub fn stdin_bytes(mut self, data: Vec<u8>) -> Self {
        self.stdin = Some(data);
        self
    }
}

/// Launches sandboxed processes on behalf of the Compiler Driver, Judge
/// Step, and Checker Driver. Holds only configuration; each call spawns an
/// independent, short-lived sandbox (there is no persistent zygote).
#[derive(Debug, Clone)]
pub struct Launcher {
    config: Config,
}

impl Launcher {
    pub fn new(config: Config) -> Self {
        Launcher { config }
    }

    pub async fn launch(&self, spec: LaunchSpec) -> Result<SandboxOutcome> {
        // Unlike `sandbox_executable` (exec'd via `Command::new`, so $PATH
        // resolution is in play), this path is only ever used as the source
        // argument to `--ro-bind` below: bwrap resolves it as a literal
        // filesystem path relative to its own cwd, never via $PATH, so it
        // must exist on disk regardless of whether it looks bare.
        if !self.config.rlimit_wrapper_executable.exists() {
            return Err(Error::MissingExecutable {
                path: self.config.rlimit_wrapper_executable.clone(),
            });
        }

        let (read_fd, write_fd) = setup_sync_pipe()?;

        let mut command = Command::new(&self.config.sandbox_executable);
        command
            .arg("--unshare-all")
            .arg("--die-with-parent")
            .arg("--ro-bind")
            .arg("/usr")
            .arg("/usr")
            .arg("--symlink")
            .arg("usr/lib")
            .arg("/lib")
            .arg("--symlink")
            .arg("usr/lib64")
            .arg("/lib64")
            .arg("--proc")
            .arg("/proc")
            .arg("--dev")
            .arg("/dev")
            .arg("--dir")
            .arg("/home")
            .arg("--chdir")
            .arg("/home")
            .arg("--ro-bind")
            .arg(&self.config.rlimit_wrapper_executable)
            .arg(RLW_MOUNT_POINT);

        for mount in &spec.mounts {
            command
                .arg(mount.bwrap_flag())
                .arg(&mount.src)
                .arg(&mount.dest);
        }

        let cpu_s = spec.cpu_time.as_secs().max(1);
        command
            .arg("--sync-fd")
            .arg(write_fd.to_string())
            .arg("--")
            .arg(RLW_MOUNT_POINT)
            .arg(cpu_s.to_string())
            .arg(spec.address_space_bytes.to_string())
            .arg(spec.output_limit_bytes.to_string())
            .arg(write_fd.to_string())
            .arg(&spec.program)
            .args(&spec.argv);

        // stdout/stderr are backed by real, unlinked temp files rather than
        // pipes: RLIMIT_FSIZE (and thus SIGXFSZ) only fires on writes to a
        // regular file, never on a pipe, so output-limit enforcement needs
        // the child's fd 1/2 to be seekable files on disk.
        let mut stdout_file = capture_file()?;
        let mut stderr_file = capture_file()?;
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::from(stdout_file.try_clone().map_err(Error::from)?))
            .stderr(Stdio::from(stderr_file.try_clone().map_err(Error::from)?));

        let mut child = command.spawn().map_err(Error::from)?;
        // The parent only reads the accounting pipe; bwrap/RLW hold the
        // write end now that it has propagated across exec via --sync-fd.
        unistd::close(write_fd).ok();

        let mut stdin_handle = child.stdin.take();
        let stdin_data = spec.stdin.clone();
        let stdin_task = tokio::spawn(async move {
            if let Some(mut handle) = stdin_handle.take() {
                if let Some(data) = stdin_data {
                    let _ = handle.write_all(&data).await;
                }
                let _ = handle.shutdown().await;
            }
        });

        let wall_clock_guard = cpu_s * 2 + 1;
        let wait_result =
            tokio::time::timeout(Duration::from_secs(wall_clock_guard), child.wait()).await;

        let status = match wait_result {
            Ok(status) => status.map_err(Error::from)?,
            Err(_elapsed) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                unistd::close(read_fd).ok();
                return Err(Error::WallClockExceeded);
            }
        };

        let _ = stdin_task.await;
        let _ = status;

        let cap = spec.output_limit_bytes as usize;
        let stdout = read_capped(&mut stdout_file, cap);
        let stderr = read_capped(&mut stderr_file, cap);

        let record = read_accounting_record(read_fd)?;
        unistd::close(read_fd).ok();

        Ok(derive_outcome(record, stdout, stderr))
    }
}

fn capture_file() -> Result<File> {
    tempfile::tempfile().map_err(Error::from)
}

fn read_capped(file: &mut File, cap: usize) -> Vec<u8> {
    let _ = file.seek(SeekFrom::Start(0));
    let mut buf = Vec::new();
    let _ = file.by_ref().take(cap as u64).read_to_end(&mut buf);
    buf
}

fn setup_sync_pipe() -> Result<(RawFd, RawFd)> {
    let (read_fd, write_fd) = pipe2(nix::fcntl::OFlag::O_CLOEXEC)?;
    // The write end must survive bwrap's exec of RLW, so it cannot carry
    // FD_CLOEXEC; the read end stays exclusively on our side.
    fcntl(write_fd, FcntlArg::F_SETFD(FdFlag::empty()))?;
    Ok((read_fd, write_fd))
}

fn read_accounting_record(read_fd: RawFd) -> Result<AccountingRecord> {
    let mut buf = [0u8; RECORD_LEN];
    let mut got = 0;
    while got < RECORD_LEN {
        match unistd::read(read_fd, &mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(nix::Error::Sys(nix::errno::Errno::EINTR)) => continue,
            Err(e) => return Err(Error::from(e)),
        }
    }
    if got != RECORD_LEN {
        return Err(Error::ShortAccountingRead {
            got,
            expected: RECORD_LEN,
        });
    }
    Ok(AccountingRecord::decode(&buf))
}

fn derive_outcome(record: AccountingRecord, stdout: Vec<u8>, stderr: Vec<u8>) -> SandboxOutcome {
    // bwrap's own wait status reflects its supervisor process, not the
    // target; the authoritative status is the one RLW reported for the
    // actual target, carried in the accounting record.
    let raw = record.exit_status;

    let (verdict_kind, raw_exit_code, signal_number) = if let Some(sig) = signal_from_status(raw) {
        let kind = match sig {
            libc::SIGXCPU => VerdictKind::Tle,
            libc::SIGXFSZ => VerdictKind::Ole,
            libc::SIGKILL => VerdictKind::Killed,
            _ => VerdictKind::Re,
        };
        (kind, 0, Some(sig))
    } else if let Some(code) = exit_code_from_status(raw) {
        (VerdictKind::Ok, code, None)
    } else {
        (VerdictKind::Uke, 0, None)
    };

    SandboxOutcome {
        verdict_kind,
        raw_exit_code,
        signal_number,
        user_time_us: record.user_time_us,
        sys_time_us: record.sys_time_us,
        peak_rss_kib: record.peak_rss_kib,
        stdout,
        stderr,
    }
}

/// `status` follows the POSIX wait(2) encoding RLW copies verbatim from its
/// own `wait4` call: low byte nonzero-and-not-0x7f means signaled.
fn signal_from_status(status: i32) -> Option<i32> {
    let signaled = (status & 0x7f) != 0 && (status & 0x7f) != 0x7f;
    if signaled {
        Some(status & 0x7f)
    } else {
        None
    }
}

fn exit_code_from_status(status: i32) -> Option<i32> {
    let exited = (status & 0x7f) == 0;
    if exited {
        Some((status >> 8) & 0xff)
    } else {
        None
    }
}

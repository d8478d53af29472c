//! Error taxonomy for the judging pipeline.
//!
//! Each layer gets its own `thiserror` enum, composed upward via `#[from]`,
//! so the controller can catch one `Error` type and decide whether to emit
//! `failed` or `error` without re-deriving the classification at each call
//! site.

use std::path::PathBuf;

/// Coarse classification, analogous to a sandbox-vs-system split: does this
/// error mean the *isolated program* misbehaved (expected, recorded as a
/// verdict) or does it mean *our own plumbing* is broken (unexpected, must
/// abort the run)?
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ErrorKind {
    /// Operator misconfiguration: unknown language, missing binary, bad env var.
    Config,
    /// The sandboxed program itself could not be launched or accounted for.
    SandboxInternal,
    /// Something about our own process plumbing failed (pipe, fork, exec).
    System,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("io error")]
    Io {
        #[from]
        cause: std::io::Error,
    },
    #[error("system call failed with error code {code}")]
    Syscall { code: i32 },
    #[error("accounting pipe gave a short read ({got} of {expected} bytes)")]
    ShortAccountingRead { got: usize, expected: usize },
    #[error("required executable not found: {path}")]
    MissingExecutable { path: PathBuf },
    #[error("sandboxed process exceeded its wall-clock guard")]
    WallClockExceeded,
    #[error("unknown language: {lang}")]
    UnknownLanguage { lang: String },
    #[error("invalid environment variable {name}: {value}")]
    InvalidConfig { name: String, value: String },
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownLanguage { .. } | Error::InvalidConfig { .. } => ErrorKind::Config,
            Error::ShortAccountingRead { .. }
            | Error::MissingExecutable { .. }
            | Error::WallClockExceeded => ErrorKind::SandboxInternal,
            Error::Io { .. } | Error::Syscall { .. } | Error::Other { .. } => ErrorKind::System,
        }
    }

    pub fn is_config(&self) -> bool {
        self.kind() == ErrorKind::Config
    }

    pub fn is_sandbox_internal(&self) -> bool {
        self.kind() == ErrorKind::SandboxInternal
    }
}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        match err.as_errno() {
            Some(errno) => Error::Syscall { code: errno as i32 },
            None => Error::Other {
                message: err.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

//! Bind-mount specifications handed to `bwrap`.
//!
//! Grounded on the `SharedDir`/`SharedDirKind` split the teacher exposes at
//! its crate root (`src/lib.rs`): callers distinguish readonly from
//! writable exposures, never raw mount flags.

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MountKind {
    Readonly,
    Writable,
}

#[derive(Debug, Clone)]
pub struct MountSpec {
    /// Path on the host.
    pub src: PathBuf,
    /// Path inside the sandbox, absolute.
    pub dest: PathBuf,
    pub kind: MountKind,
}

impl MountSpec {
    pub fn readonly(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        MountSpec {
            src: src.into(),
            dest: dest.into(),
            kind: MountKind::Readonly,
        }
    }

    pub fn writable(src: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        MountSpec {
            src: src.into(),
            dest: dest.into(),
            kind: MountKind::Writable,
        }
    }

    pub(super) fn bwrap_flag(&self) -> &'static str {
        match self.kind {
            MountKind::Readonly => "--ro-bind",
            MountKind::Writable => "--bind",
        }
    }
}

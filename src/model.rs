//! Core data model: §3 of the spec.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source language the Compiler Driver knows how to build.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn from_str_opt(s: &str) -> Option<Language> {
        match s.to_ascii_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            _ => None,
        }
    }
}

/// An immutable piece of source code plus the language/standard to compile it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeBlob {
    pub language: Language,
    /// e.g. "c17", "c++17".
    pub standard: String,
    pub content: String,
}

impl CodeBlob {
    /// Builds a `CodeBlob` from an untyped language string, the shape a
    /// session submission arrives in (§4.3). Returns `UnknownLanguage` for
    /// anything `Language::from_str_opt` doesn't recognize.
    pub fn new(
        language: &str,
        standard: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<CodeBlob, crate::error::Error> {
        let language = Language::from_str_opt(language).ok_or_else(|| crate::error::Error::UnknownLanguage {
            lang: language.to_string(),
        })?;
        Ok(CodeBlob {
            language,
            standard: standard.into(),
            content: content.into(),
        })
    }
}

/// The three code blobs a Session supplies to a diff run.
#[derive(Debug, Clone)]
pub struct SessionCode {
    pub user: CodeBlob,
    pub reference: CodeBlob,
    /// Absent for `rerun`, which never compiles a generator.
    pub generator: Option<CodeBlob>,
}

/// Result of a successful compile: an executable plus any compiler warnings.
#[derive(Debug, Clone)]
pub struct CompileArtifact {
    pub exe_path: PathBuf,
    /// Compiler stderr, truncated to 1 KiB.
    pub stderr_excerpt: String,
}

/// How a sandboxed run terminated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum VerdictKind {
    Ok,
    Tle,
    Mle,
    Ole,
    Killed,
    Re,
    Uke,
}

impl VerdictKind {
    pub fn is_ok(self) -> bool {
        matches!(self, VerdictKind::Ok)
    }

    /// Short label used when composing `status` strings like `"User TLE"`.
    pub fn label(self) -> &'static str {
        match self {
            VerdictKind::Ok => "OK",
            VerdictKind::Tle => "TLE",
            VerdictKind::Mle => "MLE",
            VerdictKind::Ole => "OLE",
            VerdictKind::Killed => "KILLED",
            VerdictKind::Re => "RE",
            VerdictKind::Uke => "UKE",
        }
    }
}

/// Normalized result of one Sandbox Launcher invocation (§3).
#[derive(Debug, Clone)]
pub struct SandboxOutcome {
    pub verdict_kind: VerdictKind,
    /// Exit code when the child exited normally; meaningless otherwise.
    pub raw_exit_code: i32,
    pub signal_number: Option<i32>,
    pub user_time_us: u64,
    pub sys_time_us: u64,
    pub peak_rss_kib: u64,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl SandboxOutcome {
    pub fn is_ok(&self) -> bool {
        self.verdict_kind.is_ok() && self.raw_exit_code == 0
    }

    pub fn time_used_ms(&self) -> f64 {
        (self.user_time_us + self.sys_time_us) as f64 / 1000.0
    }

    pub fn memory_used_mib(&self) -> f64 {
        self.peak_rss_kib as f64 / 1024.0
    }
}

/// A persisted test-case record (§3). `id` is assigned by the persistence
/// layer; `TestCase::new` leaves it at `None` until `TestCaseStore::append`
/// returns one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Option<i64>,
    pub session_id: i64,
    pub input_data: String,
    pub user_output: String,
    pub std_output: String,
    pub status: String,
    pub detail: String,
    pub time_used_ms: Option<f64>,
    pub memory_used_mib: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl TestCase {
    pub fn new(session_id: i64, created_at: DateTime<Utc>) -> Self {
        TestCase {
            id: None,
            session_id,
            input_data: String::new(),
            user_output: String::new(),
            std_output: String::new(),
            status: "PENDING".to_string(),
            detail: String::new(),
            time_used_ms: None,
            memory_used_mib: None,
            created_at,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_str_opt_accepts_known_spellings_case_insensitively() {
        assert_eq!(Language::from_str_opt("c"), Some(Language::C));
        assert_eq!(Language::from_str_opt("C"), Some(Language::C));
        assert_eq!(Language::from_str_opt("cpp"), Some(Language::Cpp));
        assert_eq!(Language::from_str_opt("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_str_opt("rust"), None);
    }

    #[test]
    fn code_blob_new_rejects_unknown_language() {
        let err = CodeBlob::new("pascal", "c17", "").unwrap_err();
        assert!(matches!(err, crate::error::Error::UnknownLanguage { lang } if lang == "pascal"));
    }

    #[test]
    fn code_blob_new_builds_from_known_language() {
        let blob = CodeBlob::new("cpp", "c++17", "int main(){}").unwrap();
        assert_eq!(blob.language, Language::Cpp);
        assert_eq!(blob.standard, "c++17");
    }
}

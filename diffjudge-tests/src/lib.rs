//! Fixture C programs and small helpers shared by the integration tests in
//! `tests/`. Mirrors the teacher's `minion-tests` in spirit (a sibling
//! crate dedicated to process-level tests) without its bespoke in-process
//! `TestCase` harness, which assumed a fork-per-test sandbox this crate's
//! bwrap-based sandbox does not need.

use diffjudge::compiler::{CompileOutcome, Compiler};
use diffjudge::config::Config;
use diffjudge::model::CodeBlob;
use std::path::{Path, PathBuf};

pub const OK_PROGRAM: &str = r#"
#include <stdio.h>
int main(void) {
    int a, b;
    scanf("%d %d", &a, &b);
    printf("%d\n", a + b);
    return 0;
}
"#;

pub const SPIN_FOREVER_PROGRAM: &str = r#"
int main(void) {
    for (;;) {}
    return 0;
}
"#;

pub const HUGE_MALLOC_PROGRAM: &str = r#"
#include <stdlib.h>
#include <string.h>
int main(void) {
    size_t n = (size_t)1 << 30;
    char *p = malloc(n);
    if (!p) {
        return 1;
    }
    memset(p, 1, n);
    return 0;
}
"#;

pub const BIG_STDOUT_PROGRAM: &str = r#"
#include <stdio.h>
int main(void) {
    for (long i = 0; i < 10000000L; i++) {
        fputc('A', stdout);
    }
    return 0;
}
"#;

pub const SYNTAX_ERROR_PROGRAM: &str = r#"
#include <stdio.h>
int main(void) {
    this is not valid C
}
"#;

/// A minimal whitespace-tokenizing checker, in the spirit of testlib's
/// `wcmp.cpp`: argv is `(input, output, answer)`; exit 0 on an exact token
/// match, 1 otherwise.
pub const WCMP_CHECKER_PROGRAM: &str = r#"
#include <stdio.h>
#include <string.h>

static int next_token(FILE *f, char *buf, size_t cap) {
    int c;
    size_t n = 0;
    while ((c = fgetc(f)) != EOF && (c == ' ' || c == '\n' || c == '\t' || c == '\r')) {}
    if (c == EOF) return 0;
    while (c != EOF && c != ' ' && c != '\n' && c != '\t' && c != '\r') {
        if (n + 1 < cap) buf[n++] = (char)c;
        c = fgetc(f);
    }
    buf[n] = '\0';
    return 1;
}

int main(int argc, char **argv) {
    if (argc != 4) return 2;
    FILE *out = fopen(argv[2], "r");
    FILE *ans = fopen(argv[3], "r");
    if (!out || !ans) return 2;
    char tok_out[4096], tok_ans[4096];
    for (;;) {
        int have_out = next_token(out, tok_out, sizeof(tok_out));
        int have_ans = next_token(ans, tok_ans, sizeof(tok_ans));
        if (!have_out && !have_ans) return 0;
        if (have_out != have_ans) return 1;
        if (strcmp(tok_out, tok_ans) != 0) return 1;
    }
}
"#;

pub fn c_blob(source: &str) -> CodeBlob {
    CodeBlob::new("c", "c17", source).expect("\"c\" is a recognized language")
}

/// Compiles `source` into `scratch_dir/<role>_exe`, panicking on any
/// compiler or sandbox-plumbing failure (tests want a hard failure here,
/// not a recorded verdict).
pub async fn compile_fixture(config: &Config, scratch_dir: &Path, role: &str, source: &str) -> PathBuf {
    let compiler = Compiler::new(config.clone());
    let blob = c_blob(source);
    let out_name = format!("{}_exe", role);
    match compiler.compile(&blob, scratch_dir, &out_name).await {
        Ok(CompileOutcome::Compiled(artifact)) => artifact.exe_path,
        Ok(CompileOutcome::CompileError { message, stderr_excerpt }) => {
            panic!("fixture {} failed to compile: {} ({})", role, message, stderr_excerpt)
        }
        Err(e) => panic!("fixture {} compiler plumbing error: {}", role, e),
    }
}

/// Compiles [`WCMP_CHECKER_PROGRAM`] directly into `checker_dir/wcmp`, the
/// layout `CHECKER_EXECUTABLE_PREFIX` expects.
pub async fn compile_wcmp_checker(config: &Config, checker_dir: &Path) {
    let exe_path = compile_fixture(config, checker_dir, "wcmp", WCMP_CHECKER_PROGRAM).await;
    std::fs::rename(exe_path, checker_dir.join("wcmp")).expect("rename checker into place");
}

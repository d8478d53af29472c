//! Manually exercises a single sandboxed run from the command line, for
//! operator debugging. Not itself a test; test-adjacent tooling the way
//! the teacher ships its own exec CLI.

use clap::Clap;
use diffjudge::config::Config;
use diffjudge::sandbox::{Launcher, LaunchSpec};

#[derive(Clap, Debug)]
struct ExecOpt {
    /// Full path of the executable to run inside the sandbox.
    #[clap(name = "bin")]
    executable: String,

    /// Arguments passed to the isolated process.
    #[clap(short = 'a', long = "arg")]
    argv: Vec<String>,

    /// CPU time limit in seconds.
    #[clap(short = 't', long, default_value = "5")]
    cpu_time_secs: u64,

    /// Address-space limit in bytes.
    #[clap(short = 'm', long, default_value = "268435456")]
    address_space_bytes: u64,

    /// Captured stdout/stderr byte cap.
    #[clap(short = 'o', long, default_value = "16384")]
    output_limit_bytes: u64,

    /// Feed this string to the sandboxed process's stdin.
    #[clap(short = 'i', long)]
    stdin: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opts: ExecOpt = Clap::parse();
    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("invalid configuration, falling back to defaults: {}", e);
        Config::default()
    });
    let launcher = Launcher::new(config);

    let mut spec = LaunchSpec::new(&opts.executable);
    for arg in &opts.argv {
        spec = spec.arg(arg);
    }
    spec.cpu_time = std::time::Duration::from_secs(opts.cpu_time_secs);
    spec.address_space_bytes = opts.address_space_bytes;
    spec.output_limit_bytes = opts.output_limit_bytes;
    if let Some(stdin) = opts.stdin {
        spec = spec.stdin_bytes(stdin.into_bytes());
    }

    match launcher.launch(spec).await {
        Ok(outcome) => {
            println!("verdict: {}", outcome.verdict_kind.label());
            println!("exit_code: {}", outcome.raw_exit_code);
            println!("signal: {:?}", outcome.signal_number);
            println!("time_used_ms: {:.2}", outcome.time_used_ms());
            println!("memory_used_mib: {:.2}", outcome.memory_used_mib());
            println!("stdout: {}", String::from_utf8_lossy(&outcome.stdout));
            println!("stderr: {}", String::from_utf8_lossy(&outcome.stderr));
            if !outcome.is_ok() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("launch failed: {}", e);
            std::process::exit(2);
        }
    }
}

//! Resource-Limited Wrapper (§4.1): applies `setrlimit`, forks, execs the
//! target, and reports exit status + `rusage` back to the Sandbox Launcher
//! over a pre-opened pipe fd.
//!
//! Runs as the sandboxed container's pid 1. Must not depend on an async
//! runtime or spawn threads before the `fork` — any thread alive at fork
//! time only survives in the parent, leaving the child's state undefined
//! for anything that thread owned.

use diffjudge::accounting::AccountingRecord;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

fn usage_exit() -> ! {
    eprintln!("usage: diffjudge-rlw <cpu_s> <as_bytes> <fsize_bytes> <sync_fd> <program> [argv...]");
    std::process::exit(64);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 6 {
        usage_exit();
    }

    let cpu_s: libc::rlim_t = args[1].parse().unwrap_or_else(|_| usage_exit());
    let as_bytes: libc::rlim_t = args[2].parse().unwrap_or_else(|_| usage_exit());
    let fsize_bytes: libc::rlim_t = args[3].parse().unwrap_or_else(|_| usage_exit());
    let sync_fd: i32 = args[4].parse().unwrap_or_else(|_| usage_exit());
    let program = &args[5];
    let child_argv = &args[5..];

    apply_resource_limits(cpu_s, as_bytes, fsize_bytes);

    let program_c = CString::new(program.as_bytes()).expect("program path contains NUL");
    let argv_c: Vec<CString> = child_argv
        .iter()
        .map(|a| CString::new(std::ffi::OsStr::new(a).as_bytes()).expect("argv contains NUL"))
        .collect();

    // SAFETY: single-threaded process; no allocator state is shared across
    // the fork in a way that could deadlock, and the child execs promptly.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        eprintln!("diffjudge-rlw: fork failed: {}", std::io::Error::last_os_error());
        std::process::exit(71);
    }

    if pid == 0 {
        exec_child(&program_c, &argv_c);
    }

    let (status, rusage) = wait_for_child(pid);
    let record = AccountingRecord {
        exit_status: status,
        user_time_us: timeval_to_us(rusage.ru_utime),
        sys_time_us: timeval_to_us(rusage.ru_stime),
        peak_rss_kib: rusage.ru_maxrss.max(0) as u64,
    };
    report_and_exit(sync_fd, &record, status);
}

fn apply_resource_limits(cpu_s: libc::rlim_t, as_bytes: libc::rlim_t, fsize_bytes: libc::rlim_t) {
    // SAFETY: setrlimit with a stack-local rlimit struct, standard libc FFI.
    unsafe {
        set_one(libc::RLIMIT_CPU, cpu_s);
        set_one(libc::RLIMIT_AS, as_bytes);
        set_one(libc::RLIMIT_FSIZE, fsize_bytes);
        set_one(libc::RLIMIT_STACK, as_bytes);
        set_one(libc::RLIMIT_CORE, 0);
    }
}

unsafe fn set_one(resource: libc::__rlimit_resource_t, limit: libc::rlim_t) {
    let lim = libc::rlimit {
        rlim_cur: limit,
        rlim_max: limit,
    };
    if libc::setrlimit(resource, &lim) != 0 {
        eprintln!(
            "diffjudge-rlw: setrlimit({}) failed: {}",
            resource,
            std::io::Error::last_os_error()
        );
        libc::_exit(71);
    }
}

/// Never returns: either `execve`s into `program`, or `_exit`s with a
/// dedicated failure code the parent cannot confuse with the target's own
/// exit status.
fn exec_child(program: &CString, argv: &[CString]) -> ! {
    let mut argv_ptrs: Vec<*const libc::c_char> = argv.iter().map(|a| a.as_ptr()).collect();
    argv_ptrs.push(std::ptr::null());

    // SAFETY: argv_ptrs is NUL-terminated and outlives the execve call;
    // execve only returns on failure.
    unsafe {
        libc::execv(program.as_ptr(), argv_ptrs.as_ptr());
        libc::_exit(127);
    }
}

fn wait_for_child(pid: libc::pid_t) -> (i32, libc::rusage) {
    let mut status: libc::c_int = 0;
    let mut rusage: libc::rusage = unsafe { std::mem::zeroed() };
    loop {
        // SAFETY: pid is this process's direct fork child; rusage/status are
        // stack-local and correctly sized for the FFI call.
        let ret = unsafe { libc::wait4(pid, &mut status, 0, &mut rusage) };
        if ret == pid {
            return (status, rusage);
        }
        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            eprintln!("diffjudge-rlw: wait4 failed: {}", err);
            std::process::exit(71);
        }
    }
}

fn timeval_to_us(tv: libc::timeval) -> u64 {
    (tv.tv_sec.max(0) as u64) * 1_000_000 + (tv.tv_usec.max(0) as u64)
}

fn report_and_exit(sync_fd: i32, record: &AccountingRecord, status: i32) -> ! {
    let encoded = record.encode();
    let mut written = 0;
    while written < encoded.len() {
        // SAFETY: encoded[written..] is a valid slice; sync_fd is the
        // pre-opened pipe fd passed in by the Sandbox Launcher.
        let n = unsafe {
            libc::write(
                sync_fd,
                encoded[written..].as_ptr() as *const libc::c_void,
                encoded.len() - written,
            )
        };
        if n < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                continue;
            }
            eprintln!("diffjudge-rlw: failed to report accounting record: {}", err);
            break;
        }
        written += n as usize;
    }
    unsafe {
        libc::close(sync_fd);
    }

    if status & 0x7f == 0 {
        std::process::exit((status >> 8) & 0xff);
    }
    std::process::exit(128 + (status & 0x7f));
}

//! Environment-driven configuration (§6, §11). Mirrors the `Settings` /
//! `Default` shape the teacher uses for sandbox settings, generalized to the
//! whole table of environment variables this service reads.

use crate::error::Error;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ResourceLimits {
    pub cpu_time: Duration,
    pub address_space_bytes: u64,
    pub output_limit_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sandbox_executable: PathBuf,
    pub rlimit_wrapper_executable: PathBuf,
    pub checker_executable_prefix: PathBuf,
    pub testlib_path: PathBuf,

    pub program_limits: ResourceLimits,
    pub compiler_limits: ResourceLimits,
    pub checker_limits: ResourceLimits,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            sandbox_executable: "bwrap".into(),
            rlimit_wrapper_executable: "diffjudge-rlw".into(),
            checker_executable_prefix: "/usr/local/lib/diffjudge/checkers".into(),
            testlib_path: "/usr/local/share/diffjudge/testlib.h".into(),
            program_limits: ResourceLimits {
                cpu_time: Duration::from_secs(5),
                address_space_bytes: 256 * 1024 * 1024,
                output_limit_bytes: 16 * 1024,
            },
            compiler_limits: ResourceLimits {
                cpu_time: Duration::from_secs(15),
                address_space_bytes: 512 * 1024 * 1024,
                output_limit_bytes: 16384 * 1024,
            },
            checker_limits: ResourceLimits {
                cpu_time: Duration::from_secs(2),
                address_space_bytes: 256 * 1024 * 1024,
                output_limit_bytes: 16 * 1024,
            },
        }
    }
}

impl Config {
    pub fn new() -> Config {
        Default::default()
    }

    /// Reads every field from the environment, falling back to the defaults
    /// documented in §6 when a variable is unset. Returns a `ConfigError`
    /// (`Error::InvalidConfig`) if a variable is set but fails to parse.
    pub fn from_env() -> Result<Config, Error> {
        let defaults = Config::default();
        Ok(Config {
            sandbox_executable: env_path("SANDBOX_EXECUTABLE", defaults.sandbox_executable),
            rlimit_wrapper_executable: env_path(
                "RLIMIT_WRAPPER_EXECUTABLE",
                defaults.rlimit_wrapper_executable,
            ),
            checker_executable_prefix: env_path(
                "CHECKER_EXECUTABLE_PREFIX",
                defaults.checker_executable_prefix,
            ),
            testlib_path: env_path("TESTLIB_PATH", defaults.testlib_path),
            program_limits: ResourceLimits {
                cpu_time: env_duration_secs("PROG_TIME_LIMIT", defaults.program_limits.cpu_time)?,
                address_space_bytes: env_bytes_mib(
                    "PROG_MEMORY_LIMIT",
                    defaults.program_limits.address_space_bytes,
                )?,
                output_limit_bytes: env_bytes_kib(
                    "PROG_OUTPUT_LIMIT",
                    defaults.program_limits.output_limit_bytes,
                )?,
            },
            compiler_limits: ResourceLimits {
                cpu_time: env_duration_secs(
                    "COMPILER_TIME_LIMIT",
                    defaults.compiler_limits.cpu_time,
                )?,
                address_space_bytes: env_bytes_mib(
                    "COMPILER_MEMORY_LIMIT",
                    defaults.compiler_limits.address_space_bytes,
                )?,
                output_limit_bytes: env_bytes_kib(
                    "COMPILER_OUTPUT_LIMIT",
                    defaults.compiler_limits.output_limit_bytes,
                )?,
            },
            checker_limits: ResourceLimits {
                cpu_time: env_duration_secs(
                    "CHECKER_TIME_LIMIT",
                    defaults.checker_limits.cpu_time,
                )?,
                address_space_bytes: env_bytes_mib(
                    "CHECKER_MEMORY_LIMIT",
                    defaults.checker_limits.address_space_bytes,
                )?,
                output_limit_bytes: env_bytes_kib(
                    "CHECKER_OUTPUT_LIMIT",
                    defaults.checker_limits.output_limit_bytes,
                )?,
            },
        })
    }
}

fn env_path(name: &str, default: PathBuf) -> PathBuf {
    std::env::var_os(name).map(PathBuf::from).unwrap_or(default)
}

fn env_parse_u64(name: &str) -> Result<Option<u64>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| Error::InvalidConfig {
                name: name.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

fn env_duration_secs(name: &str, default: Duration) -> Result<Duration, Error> {
    Ok(env_parse_u64(name)?
        .map(Duration::from_secs)
        .unwrap_or(default))
}

fn env_bytes_mib(name: &str, default: u64) -> Result<u64, Error> {
    Ok(env_parse_u64(name)?
        .map(|mib| mib * 1024 * 1024)
        .unwrap_or(default))
}

fn env_bytes_kib(name: &str, default: u64) -> Result<u64, Error> {
    Ok(env_parse_u64(name)?
        .map(|kib| kib * 1024)
        .unwrap_or(default))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_table() {
        let cfg = Config::default();
        assert_eq!(cfg.program_limits.cpu_time, Duration::from_secs(5));
        assert_eq!(cfg.program_limits.address_space_bytes, 256 * 1024 * 1024);
        assert_eq!(cfg.program_limits.output_limit_bytes, 16 * 1024);
        assert_eq!(cfg.compiler_limits.cpu_time, Duration::from_secs(15));
        assert_eq!(cfg.checker_limits.cpu_time, Duration::from_secs(2));
    }

    #[test]
    fn invalid_numeric_env_is_a_config_error() {
        std::env::set_var("PROG_TIME_LIMIT", "not-a-number");
        let result = Config::from_env();
        std::env::remove_var("PROG_TIME_LIMIT");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }
}

//! Drives the verifier server/client pair over every file in the benchmark
//! manifest and records wall-clock timings.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use slog::{info, Logger};

use crate::environment::{self, EnvMap, Platform};
use crate::error::{BenchError, Result};
use crate::statistics::TimingRecord;

pub const WARMUP_ITERATIONS: usize = 6;
pub const BENCH_ITERATIONS: usize = 10;
pub const DEFAULT_MANIFEST: &str =
    "counterexample-thesis-resources/benchmarked-files-counterexample.csv";
pub(crate) const EDITION_FLAG: &str = "--edition=2018";

const SERVER_PORT: &str = "12345";
const SERVER_GRACE: Duration = Duration::from_secs(2);
const WARMUP_PATH: &str = "prusti-tests/tests/verify/pass/quick/fibonacci.rs";
const OUTPUT_DIR: &str = "benchmark-output";

/// Runs the full benchmark: server startup, warmup, timed iterations per
/// manifest entry, JSON output. Returns the path of the written record.
pub fn run_benchmarks(manifest: &Path, suffix: Option<&str>, logger: &Logger) -> Result<PathBuf> {
    let server_exe = server_executable()?;
    let client_exe = client_executable()?;
    let env = environment::build_env(logger)?;

    let mut server = ServerGuard::spawn(&server_exe, &env, logger)?;
    server.ensure_running(&server_exe)?;

    // The server address is only known to the clients, never inherited back.
    let mut client_env = env.clone();
    client_env.insert(
        "PRUSTI_SERVER_ADDRESS".to_string(),
        format!("localhost:{SERVER_PORT}"),
    );

    let results = benchmark_files(&client_exe, manifest, &client_env, logger)?;
    drop(server);

    write_results(&results, suffix, logger)
}

/// Warms the server up on a known-good fixture, then times every manifest
/// entry. Warmup timings are logged and discarded.
pub fn benchmark_files(
    client: &Path,
    manifest: &Path,
    env: &EnvMap,
    logger: &Logger,
) -> Result<TimingRecord> {
    info!(logger, "starting warmup of the server");
    for run in 0..WARMUP_ITERATIONS {
        let elapsed = measure_verifier_time(client, WARMUP_PATH, env)?;
        info!(logger, "warmup run {} took {:.3}s", run + 1, elapsed);
    }
    info!(logger, "finished warmup, starting benchmark");

    let mut results = TimingRecord::new();
    for file in read_manifest(manifest)? {
        info!(logger, "benchmarking {}", file);
        let samples = results.entry(file.clone()).or_default();
        for _ in 0..BENCH_ITERATIONS {
            samples.push(measure_verifier_time(client, &file, env)?);
        }
    }
    Ok(results)
}

/// One blocking client invocation, timed with a monotonic clock. The exit
/// status is not interpreted; a failed verification still yields a sample.
pub fn measure_verifier_time(client: &Path, input: &str, env: &EnvMap) -> Result<f64> {
    let start = Instant::now();
    Command::new(client)
        .arg(EDITION_FLAG)
        .arg(input)
        .env_clear()
        .envs(env)
        .status()?;
    Ok(start.elapsed().as_secs_f64())
}

/// First CSV column of the manifest, in file order. Extra columns are
/// ignored; there is no header row.
pub fn read_manifest(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut files = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(file) = record.get(0) {
            if !file.is_empty() {
                files.push(file.to_string());
            }
        }
    }
    Ok(files)
}

pub fn server_executable() -> Result<PathBuf> {
    Ok(tool_directory()?.join("prusti-server-driver"))
}

pub fn client_executable() -> Result<PathBuf> {
    Ok(tool_directory()?.join("prusti-rustc"))
}

/// The release binaries sit next to this driver; anything but Linux has no
/// supported layout.
fn tool_directory() -> Result<PathBuf> {
    if Platform::current() != Some(Platform::Linux) {
        return Err(BenchError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ));
    }
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or(BenchError::ExecutableDir)
}

fn write_results(results: &TimingRecord, suffix: Option<&str>, logger: &Logger) -> Result<PathBuf> {
    fs::create_dir_all(OUTPUT_DIR)?;
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let path = Path::new(OUTPUT_DIR).join(output_file_name(suffix, timestamp));
    fs::write(&path, serde_json::to_string_pretty(results)?)?;
    info!(logger, "wrote benchmark results to {}", path.display());
    Ok(path)
}

fn output_file_name(suffix: Option<&str>, timestamp: u64) -> String {
    match suffix {
        Some(suffix) => format!("benchmark-{suffix}{timestamp}.json"),
        None => format!("benchmark{timestamp}.json"),
    }
}

/// Holds the server child for the duration of the benchmark; dropping the
/// guard interrupts the server on every exit path.
struct ServerGuard {
    child: Child,
    logger: Logger,
}

impl ServerGuard {
    fn spawn(exe: &Path, env: &EnvMap, logger: &Logger) -> Result<ServerGuard> {
        info!(logger, "starting verifier server ({})", exe.display());
        let child = Command::new(exe)
            .args(["--port", SERVER_PORT])
            .env_clear()
            .envs(env)
            .spawn()
            .map_err(|_| BenchError::ServerStart(exe.display().to_string()))?;
        Ok(ServerGuard {
            child,
            logger: logger.clone(),
        })
    }

    /// Gives the server a grace period to bind its port, then checks it has
    /// not already exited.
    fn ensure_running(&mut self, exe: &Path) -> Result<()> {
        thread::sleep(SERVER_GRACE);
        match self.child.try_wait()? {
            Some(_) => Err(BenchError::ServerStart(exe.display().to_string())),
            None => Ok(()),
        }
    }
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        info!(self.logger, "terminating verifier server");
        // SIGINT, matching a manual interrupt; the server flushes and exits.
        unsafe {
            libc::kill(self.child.id() as libc::pid_t, libc::SIGINT);
        }
        let _ = self.child.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::o;
    use std::io::Write;

    fn logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn inherited_env() -> EnvMap {
        std::env::vars().collect()
    }

    #[test]
    fn output_name_without_suffix() {
        assert_eq!(
            output_file_name(None, 1700000000),
            "benchmark1700000000.json"
        );
    }

    #[test]
    fn output_name_with_suffix() {
        assert_eq!(
            output_file_name(Some("vanilla"), 1700000000),
            "benchmark-vanilla1700000000.json"
        );
    }

    #[test]
    fn manifest_takes_first_column_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "tests/a.rs,some note").unwrap();
        writeln!(file, "tests/b.rs").unwrap();
        writeln!(file, "tests/c.rs,x,y,z").unwrap();
        let files = read_manifest(file.path()).unwrap();
        assert_eq!(files, vec!["tests/a.rs", "tests/b.rs", "tests/c.rs"]);
    }

    #[test]
    fn warmup_runs_never_reach_the_record() {
        // `true` ignores its arguments, so the missing fixture is harmless.
        let mut manifest = tempfile::NamedTempFile::new().unwrap();
        writeln!(manifest, "first.rs").unwrap();
        writeln!(manifest, "second.rs").unwrap();
        let results =
            benchmark_files(Path::new("true"), manifest.path(), &inherited_env(), &logger())
                .unwrap();
        assert_eq!(results.len(), 2);
        for samples in results.values() {
            assert_eq!(samples.len(), BENCH_ITERATIONS);
        }
    }

    #[test]
    fn measured_time_is_positive() {
        let elapsed =
            measure_verifier_time(Path::new("true"), "ignored.rs", &inherited_env()).unwrap();
        assert!(elapsed > 0.0);
    }
}

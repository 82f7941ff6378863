//! Builds the environment passed to every verifier subprocess: the inherited
//! process environment merged with platform-discovered locations of the Java
//! runtime, the Viper backends and the Z3 executable.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::env;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use slog::{info, warn, Logger};

use crate::error::{BenchError, Result};

pub type EnvMap = BTreeMap<String, String>;

/// Variables holding a separator-joined list of paths. Discovered values are
/// appended to these instead of being skipped when already set.
const PATH_LIKE: [&str; 3] = ["PATH", "LD_LIBRARY_PATH", "DYLD_LIBRARY_PATH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Option<Platform> {
        match env::consts::OS {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::MacOs),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    fn path_separator(self) -> char {
        match self {
            Platform::Windows => ';',
            _ => ':',
        }
    }

    fn name(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
        }
    }

    /// Variables discovered for this platform, in application order. Only
    /// Linux discovery is implemented; the benchmarks have never been run
    /// anywhere else.
    fn discover_variables(self, logger: &Logger) -> Result<Vec<(String, String)>> {
        match self {
            Platform::Linux => Ok(linux_variables(logger)),
            Platform::MacOs | Platform::Windows => {
                Err(BenchError::UnsupportedPlatform(self.name().to_string()))
            }
        }
    }
}

/// Returns the inherited environment with the platform-discovered variables
/// merged in. Built once per run and passed explicitly to each subprocess.
pub fn build_env(logger: &Logger) -> Result<EnvMap> {
    let platform = Platform::current()
        .ok_or_else(|| BenchError::UnsupportedPlatform(env::consts::OS.to_string()))?;
    let mut env: EnvMap = env::vars().collect();
    merge_variables(
        &mut env,
        platform.discover_variables(logger)?,
        platform,
        logger,
    );
    Ok(env)
}

/// Sets each variable unless already present; path-list variables are
/// appended with the platform separator instead.
pub fn merge_variables(
    env: &mut EnvMap,
    variables: Vec<(String, String)>,
    platform: Platform,
    logger: &Logger,
) {
    for (name, value) in variables {
        match env.entry(name.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut entry) if PATH_LIKE.contains(&name.as_str()) => {
                let joined = entry.get_mut();
                joined.push(platform.path_separator());
                joined.push_str(&value);
            }
            Entry::Occupied(_) => {}
        }
        info!(logger, "env: {}={}", name, env[&name]);
    }
}

fn linux_variables(logger: &Logger) -> Vec<(String, String)> {
    let mut variables = vec![("RUST_TEST_THREADS".to_string(), "1".to_string())];

    match env::var("JAVA_HOME").ok().or_else(default_linux_java_home) {
        Some(java_home) => {
            variables.push(("JAVA_HOME".to_string(), java_home.clone()));
            if Path::new(&java_home).exists() {
                match find_libjvm(Path::new(&java_home)) {
                    Some(dir) => variables.push((
                        "LD_LIBRARY_PATH".to_string(),
                        dir.to_string_lossy().into_owned(),
                    )),
                    None => warn!(logger, "could not find libjvm.so in {}", java_home),
                }
            }
        }
        None => warn!(logger, "could not determine a default java location"),
    }

    let viper_home =
        env::var("VIPER_HOME").unwrap_or_else(|_| absolute_path("viper_tools/backends"));
    if Path::new(&viper_home).exists() {
        variables.push(("VIPER_HOME".to_string(), viper_home.clone()));
    }
    let z3_exe = Path::new(&viper_home).join("../z3/bin/z3");
    if z3_exe.exists() {
        variables.push((
            "Z3_EXE".to_string(),
            z3_exe.to_string_lossy().into_owned(),
        ));
    }

    variables
}

fn default_linux_java_home() -> Option<String> {
    ["/usr/lib/jvm/default-java", "/usr/lib/jvm/default"]
        .into_iter()
        .find(|path| Path::new(path).exists())
        .map(str::to_string)
}

/// Directory under `java_home` containing `libjvm.so`, searched recursively.
fn find_libjvm(dir: &Path) -> Option<PathBuf> {
    for entry in fs::read_dir(dir).ok()?.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(found) = find_libjvm(&path) {
                return Some(found);
            }
        } else if path.file_name() == Some(OsStr::new("libjvm.so")) {
            return path.parent().map(Path::to_path_buf);
        }
    }
    None
}

fn absolute_path(relative: &str) -> String {
    env::current_dir()
        .map(|dir| dir.join(relative))
        .unwrap_or_else(|_| PathBuf::from(relative))
        .to_string_lossy()
        .into_owned()
}

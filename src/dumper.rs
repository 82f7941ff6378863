//! Runs the compiler wrapper with counterexamples enabled on every source
//! file under a directory, capturing the combined output per file.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use slog::{info, Logger};

use crate::environment::{self, EnvMap};
use crate::error::Result;
use crate::runner::{self, EDITION_FLAG};

const SOURCE_EXTENSION: &str = "rs";
const ARTIFACT_SUFFIX: &str = ".txt";

/// Dumps one `<file>.txt` artifact per `.rs` file under `source` into
/// `target`, using the verifier wrapper with counterexamples enabled.
pub fn dump_counterexamples(source: &Path, target: &Path, logger: &Logger) -> Result<()> {
    let exe = runner::client_executable()?;
    let mut env = environment::build_env(logger)?;
    env.insert("PRUSTI_COUNTEREXAMPLE".to_string(), "true".to_string());
    run_on_tree(&exe, source, target, &env, logger)
}

/// Invokes `exe` once per discovered source file, redirecting stdout and
/// stderr into the per-file artifact. Exit codes are not interpreted;
/// failures of the wrapper end up in the artifact instead.
pub fn run_on_tree(
    exe: &Path,
    source: &Path,
    target: &Path,
    env: &EnvMap,
    logger: &Logger,
) -> Result<()> {
    fs::create_dir_all(target)?;
    for file in collect_source_files(source)? {
        let artifact = target.join(artifact_name(&file));
        info!(
            logger,
            "{} {} {} > {}",
            exe.display(),
            EDITION_FLAG,
            file.display(),
            artifact.display()
        );
        let stdout = File::create(&artifact)?;
        let stderr = stdout.try_clone()?;
        let _ = Command::new(exe)
            .arg(EDITION_FLAG)
            .arg(&file)
            .env_clear()
            .envs(env)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .status()?;
    }
    Ok(())
}

/// Recursively collects every file with the source extension, sorted for a
/// stable processing order.
pub fn collect_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    visit(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn visit(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            visit(&path, files)?;
        } else if path.extension() == Some(OsStr::new(SOURCE_EXTENSION)) {
            files.push(path);
        }
    }
    Ok(())
}

/// Artifacts are named after the original file, flattened into the target
/// directory: `foo.rs` becomes `foo.rs.txt` wherever it came from.
fn artifact_name(file: &Path) -> String {
    let name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{name}{ARTIFACT_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::o;

    fn logger() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn inherited_env() -> EnvMap {
        std::env::vars().collect()
    }

    fn touch(path: &Path) {
        fs::write(path, "fn main() {}\n").unwrap();
    }

    #[test]
    fn collects_only_source_files_recursively() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested/deep")).unwrap();
        touch(&dir.path().join("top.rs"));
        touch(&dir.path().join("nested/inner.rs"));
        touch(&dir.path().join("nested/deep/leaf.rs"));
        fs::write(dir.path().join("notes.md"), "notes").unwrap();
        fs::write(dir.path().join("nested/data.json"), "{}").unwrap();

        let files = collect_source_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|file| file.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 3);
        assert!(names.contains(&"top.rs".to_string()));
        assert!(names.contains(&"inner.rs".to_string()));
        assert!(names.contains(&"leaf.rs".to_string()));
    }

    #[test]
    fn artifact_names_are_flattened() {
        assert_eq!(artifact_name(Path::new("a/b/foo.rs")), "foo.rs.txt");
    }

    #[test]
    fn one_artifact_per_source_file() {
        let source = tempfile::TempDir::new().unwrap();
        let target = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(source.path().join("sub")).unwrap();
        touch(&source.path().join("one.rs"));
        touch(&source.path().join("sub/two.rs"));
        fs::write(source.path().join("sub/skip.txt"), "skip").unwrap();

        run_on_tree(
            Path::new("echo"),
            source.path(),
            target.path(),
            &inherited_env(),
            &logger(),
        )
        .unwrap();

        let mut artifacts: Vec<_> = fs::read_dir(target.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        artifacts.sort();
        assert_eq!(artifacts, vec!["one.rs.txt", "two.rs.txt"]);
        // `echo` printed the flag and the path into the artifact.
        let captured = fs::read_to_string(target.path().join("one.rs.txt")).unwrap();
        assert!(captured.contains(EDITION_FLAG));
    }
}

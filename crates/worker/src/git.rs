//! Git access for template imports.
//!
//! Repositories are fetched with the `git` CLI under a timeout, then walked
//! on disk to collect the template's files.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use kublade_db::models::template_file::ImportedFile;
use tokio::process::Command;
use walkdir::WalkDir;

/// Files larger than this are left out of an import (1 MiB).
pub const MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Longest stderr excerpt kept in an error.
const MAX_STDERR_CHARS: usize = 2_000;

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("failed to run '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {command} timed out after {secs}s")]
    Timeout { command: &'static str, secs: u64 },

    #[error("git {command} exited with status {code}: {stderr}")]
    Failed {
        command: &'static str,
        code: i32,
        stderr: String,
    },

    #[error("path '{0}' does not exist in the repository")]
    MissingPath(String),

    #[error("failed to walk repository: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Runs the `git` binary.
#[derive(Debug, Clone)]
pub struct GitClient {
    binary: String,
    timeout: Duration,
}

impl GitClient {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    /// Clone only the tip of `branch` into `dest`, which must not exist or
    /// be empty.
    pub async fn shallow_clone(&self, url: &str, branch: &str, dest: &Path) -> Result<(), GitError> {
        let args: Vec<OsString> = vec![
            "clone".into(),
            "--depth".into(),
            "1".into(),
            "--single-branch".into(),
            "--branch".into(),
            branch.into(),
            "--".into(),
            url.into(),
            dest.as_os_str().to_owned(),
        ];
        self.run("clone", args).await.map(|_| ())
    }

    /// The commit checked out in `repo`.
    pub async fn head_commit(&self, repo: &Path) -> Result<String, GitError> {
        let args: Vec<OsString> = vec![
            "-C".into(),
            repo.as_os_str().to_owned(),
            "rev-parse".into(),
            "HEAD".into(),
        ];
        let stdout = self.run("rev-parse", args).await?;
        Ok(stdout.trim().to_string())
    }

    async fn run(&self, command: &'static str, args: Vec<OsString>) -> Result<String, GitError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&args)
            // Never block on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(command, "Running git");

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|source| GitError::Spawn {
                binary: self.binary.clone(),
                source,
            })?,
            Err(_elapsed) => {
                return Err(GitError::Timeout {
                    command,
                    secs: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            let stderr: String = String::from_utf8_lossy(&output.stderr)
                .trim()
                .chars()
                .take(MAX_STDERR_CHARS)
                .collect();
            return Err(GitError::Failed {
                command,
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Collect the files under `sub_path` of a checked-out repository.
///
/// `sub_path` is relative to `root` and already normalised; empty means the
/// repository root. Returned paths are relative to `sub_path`, `/`-separated
/// and sorted. `.git` directories, symlinks, files over [`MAX_FILE_BYTES`]
/// and files that are not UTF-8 are skipped.
pub fn collect_files(root: &Path, sub_path: &str) -> Result<Vec<ImportedFile>, GitError> {
    let base = if sub_path.is_empty() {
        root.to_path_buf()
    } else {
        root.join(sub_path)
    };
    if !base.is_dir() {
        return Err(GitError::MissingPath(sub_path.to_string()));
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(&base)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git");

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = match entry.path().strip_prefix(&base) {
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };

        let size = entry.metadata()?.len();
        if size > MAX_FILE_BYTES {
            tracing::debug!(path = %relative, size, "Skipping oversized file");
            continue;
        }

        let bytes = std::fs::read(entry.path())?;
        match String::from_utf8(bytes) {
            Ok(content) => files.push(ImportedFile {
                path: relative,
                content,
            }),
            Err(_) => tracing::debug!(path = %relative, "Skipping non UTF-8 file"),
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

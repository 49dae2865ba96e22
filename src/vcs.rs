//! Changed-file detection through `git diff`.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    process::ExitStatus,
};

use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to run git: {0}")]
    Spawn(std::io::Error),
    #[error("git diff exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Paths changed between `base` and `head`, relative to `repo`.
pub async fn changed_files(repo: &Path, base: &str, head: &str) -> Result<HashSet<PathBuf>, Error> {
    let output = tokio::process::Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(["diff", "--name-only", "--relative", base, head])
        .output()
        .await
        .map_err(Error::Spawn)?;
    if !output.status.success() {
        return Err(Error::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }
    let changed = parse_name_only(&String::from_utf8_lossy(&output.stdout));
    debug!(base, head, count = changed.len(), "changed files");
    Ok(changed)
}

fn parse_name_only(stdout: &str) -> HashSet<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect()
}

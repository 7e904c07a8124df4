//! Thin wrapper around the `git` binary for the releases and operator checkouts

use std::path::Path;
use tokio::process::Command;

use crate::error::{CliError, Result};

const MAIN_BRANCH: &str = "master";

async fn run_git(dir: &Path, args: &[&str]) -> Result<String> {
    tracing::debug!(dir = %dir.display(), args = ?args, "running git");

    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(CliError::Git {
            command: args.first().copied().unwrap_or_default().to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Fetch the main branch so a shallow CI checkout can be diffed against it
pub async fn fetch_main(dir: &Path) -> Result<()> {
    run_git(dir, &["fetch", "--unshallow", "origin", MAIN_BRANCH]).await?;
    Ok(())
}

/// Common ancestor of `HEAD` and the remote main branch
pub async fn merge_base(dir: &Path) -> Result<String> {
    let main = format!("origin/{}", MAIN_BRANCH);
    let out = run_git(dir, &["merge-base", "HEAD", &main]).await?;
    Ok(out.trim().to_string())
}

/// Files added between `base` and `HEAD`, in `--name-status` form
///
/// Rename detection is off so a copied release directory shows up as added.
pub async fn added_files(dir: &Path, base: &str) -> Result<String> {
    run_git(
        dir,
        &[
            "diff",
            "--name-status",
            base,
            "--diff-filter=A",
            "--no-renames",
            "HEAD",
        ],
    )
    .await
}

/// Commit SHA of `HEAD`
pub async fn head_sha(dir: &Path) -> Result<String> {
    let out = run_git(dir, &["rev-parse", "HEAD"]).await?;
    Ok(out.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_reports_command() {
        let dir = tempfile::TempDir::new().unwrap();

        match head_sha(dir.path()).await {
            Err(CliError::Git { command, .. }) => assert_eq!(command, "rev-parse"),
            // No git binary on this machine
            Err(CliError::Io { .. }) => {}
            other => panic!("expected git failure, got {:?}", other),
        }
    }
}

//! Discovering a newly added release from `git diff --name-status` output

use crate::error::{CoreError, Result};

const RELEASE_FILE_SUFFIX: &str = "/release.yaml";

/// A release manifest added by a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRelease {
    /// Path of the manifest, relative to the repository root
    pub path: String,
    /// First path segment, e.g. `aws`
    pub provider: String,
    /// Second path segment, e.g. `v13.0.0`
    pub release_dir: String,
}

/// Find the release manifest added in `diff`
///
/// Lines look like `A  aws/v13.0.0/release.yaml`. The first line ending in
/// `/release.yaml` wins.
pub fn locate_release_in_diff(diff: &str) -> Result<DiffRelease> {
    let mut candidates = diff
        .lines()
        .map(str::trim)
        .filter(|line| line.ends_with(RELEASE_FILE_SUFFIX));

    let line = candidates.next().ok_or(CoreError::ReleaseNotFound)?;

    for extra in candidates {
        tracing::warn!(line = extra, "ignoring additional release in diff");
    }

    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 2 {
        return Err(CoreError::MalformedDiff {
            line: line.to_string(),
        });
    }

    let path = fields[1];
    let mut segments = path.split('/');
    let provider = segments.next().unwrap_or_default().to_string();
    let release_dir = segments.next().unwrap_or_default().to_string();

    Ok(DiffRelease {
        path: path.to_string(),
        provider,
        release_dir,
    })
}

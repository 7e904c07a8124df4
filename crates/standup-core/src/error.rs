//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid version constraint '{constraint}': {message}")]
    InvalidConstraint { constraint: String, message: String },

    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        #[source]
        source: semver::Error,
    },

    #[error("Invalid release name '{name}': expected vMAJOR.MINOR.PATCH[-PRERELEASE]")]
    InvalidReleaseName { name: String },

    #[error("Incorrectly formatted diff: should look like 'A  aws/v13.0.0/release.yaml', found '{line}'")]
    MalformedDiff { line: String },

    #[error("No new release found in diff")]
    ReleaseNotFound,

    #[error("No valid release found in {path}")]
    NoReleaseInDirectory { path: String },

    #[error("Invalid provider configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Component '{name}' not found in release '{release}'")]
    ComponentNotFound { name: String, release: String },

    #[error("Could not resolve version of project at {path}")]
    VersionNotDeclared { path: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Build an `InvalidVersion` error for the given literal
    pub fn invalid_version(version: impl Into<String>, source: semver::Error) -> Self {
        Self::InvalidVersion {
            version: version.into(),
            source,
        }
    }

    /// Whether this error reports a missing release (as opposed to bad input)
    pub fn is_release_not_found(&self) -> bool {
        matches!(
            self,
            Self::ReleaseNotFound | Self::NoReleaseInDirectory { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Parse a semantic version, tolerating a leading `v`
pub(crate) fn parse_version(raw: &str) -> Result<semver::Version> {
    let trimmed = raw.trim();
    let literal = trimmed.strip_prefix('v').unwrap_or(trimmed);
    semver::Version::parse(literal).map_err(|e| CoreError::invalid_version(raw, e))
}

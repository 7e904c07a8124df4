//! Release manifest model
//!
//! Mirrors the `Release` custom resource (`release.giantswarm.io/v1alpha1`)
//! as it is stored in the releases repository and submitted to the
//! management cluster.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result, parse_version};

/// API version of the Release custom resource
pub const RELEASE_API_VERSION: &str = "release.giantswarm.io/v1alpha1";

/// Kind of the Release custom resource
pub const RELEASE_KIND: &str = "Release";

/// Label marking releases created for testing (garbage-collected later)
pub const TESTING_LABEL: &str = "giantswarm.io/testing";

/// Directory name skipped when looking for the latest release
const ARCHIVED_DIR: &str = "archived";

/// A release manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_kind")]
    pub kind: String,

    pub metadata: ReleaseMetadata,

    #[serde(default)]
    pub spec: ReleaseSpec,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReleaseStatus>,
}

fn default_api_version() -> String {
    RELEASE_API_VERSION.to_string()
}

fn default_kind() -> String {
    RELEASE_KIND.to_string()
}

/// Release metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    /// Release name (`vMAJOR.MINOR.PATCH[-PRERELEASE]`)
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Release specification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSpec {
    #[serde(default)]
    pub apps: Vec<App>,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub state: ReleaseState,
}

/// An app shipped with the release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_version: Option<String>,
}

/// A component (operator) of the release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,

    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_operator_deploy: Option<bool>,
}

/// Declared lifecycle state of a release
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    #[default]
    Active,
    Deprecated,
    Wip,
    Preview,
}

impl std::fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReleaseState::Active => write!(f, "active"),
            ReleaseState::Deprecated => write!(f, "deprecated"),
            ReleaseState::Wip => write!(f, "wip"),
            ReleaseState::Preview => write!(f, "preview"),
        }
    }
}

/// Observed status, set by the release operator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseStatus {
    #[serde(default)]
    pub ready: bool,

    #[serde(default)]
    pub in_use: bool,
}

impl Release {
    /// Load a release manifest from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse a release manifest from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Serialize the manifest back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The release version, i.e. the name without its leading `v`
    pub fn version(&self) -> Result<Version> {
        parse_version(&self.metadata.name).map_err(|_| CoreError::InvalidReleaseName {
            name: self.metadata.name.clone(),
        })
    }

    /// Whether the release operator reported the release as ready
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.ready)
    }

    /// Label the release for later garbage collection
    pub fn mark_for_testing(&mut self) {
        self.metadata
            .labels
            .insert(TESTING_LABEL.to_string(), "true".to_string());
    }

    pub fn component(&self, name: &str) -> Option<&Component> {
        self.spec.components.iter().find(|c| c.name == name)
    }

    pub fn component_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.spec.components.iter_mut().find(|c| c.name == name)
    }

    /// Point a component at a build from a test catalog
    ///
    /// The reference becomes `<previous version>-<git ref>`.
    pub fn override_component(
        &mut self,
        name: &str,
        version: &str,
        catalog: &str,
        git_ref: &str,
    ) -> Result<()> {
        let release = self.metadata.name.clone();
        let component = self
            .component_mut(name)
            .ok_or_else(|| CoreError::ComponentNotFound {
                name: name.to_string(),
                release,
            })?;

        component.reference = Some(format!("{}-{}", component.version, git_ref));
        component.version = version.to_string();
        component.catalog = Some(catalog.to_string());
        Ok(())
    }
}

/// Find the manifest of the highest release version for a provider
///
/// Looks at `<releases_dir>/<provider>/<vX.Y.Z>/release.yaml`, skipping the
/// `archived` directory and any entry whose name is not a version.
pub fn find_latest_release(releases_dir: &Path, provider: &str) -> Result<PathBuf> {
    let provider_dir = releases_dir.join(provider);
    let mut latest: Option<(Version, PathBuf)> = None;

    for entry in std::fs::read_dir(&provider_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if name == ARCHIVED_DIR {
            continue;
        }

        let version = match parse_version(name) {
            Ok(v) => v,
            Err(_) => {
                tracing::debug!(entry = name, "skipping directory without a semver name");
                continue;
            }
        };

        if latest.as_ref().is_none_or(|(current, _)| version > *current) {
            latest = Some((version, entry.path()));
        }
    }

    match latest {
        Some((version, dir)) => {
            tracing::info!(provider, version = %version, "found latest release");
            Ok(dir.join("release.yaml"))
        }
        None => Err(CoreError::NoReleaseInDirectory {
            path: provider_dir.display().to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const MANIFEST: &str = r#"
apiVersion: release.giantswarm.io/v1alpha1
kind: Release
metadata:
  name: v13.0.0
spec:
  apps:
  - name: cert-exporter
    version: 1.2.3
    componentVersion: 1.0.0
  - name: coredns
    version: 1.2.0
  components:
  - name: aws-operator
    version: 9.0.0
    releaseOperatorDeploy: true
  - name: kubernetes
    version: 1.18.9
  date: "2020-10-01T12:00:00Z"
  state: active
"#;

    #[test]
    fn test_parse_manifest() {
        let release = Release::from_yaml(MANIFEST).unwrap();
        assert_eq!(release.name(), "v13.0.0");
        assert_eq!(release.version().unwrap(), Version::new(13, 0, 0));
        assert_eq!(release.spec.apps.len(), 2);
        assert_eq!(release.spec.components.len(), 2);
        assert_eq!(
            release.spec.apps[0].component_version.as_deref(),
            Some("1.0.0")
        );
        assert_eq!(release.spec.state, ReleaseState::Active);
        assert!(!release.is_ready());
    }

    #[test]
    fn test_defaults_when_omitted() {
        let release = Release::from_yaml("metadata:\n  name: v1.0.0\n").unwrap();
        assert_eq!(release.api_version, RELEASE_API_VERSION);
        assert_eq!(release.kind, RELEASE_KIND);
        assert!(release.spec.components.is_empty());
    }

    #[test]
    fn test_yaml_keeps_camel_case() {
        let release = Release::from_yaml(MANIFEST).unwrap();
        let yaml = release.to_yaml().unwrap();
        assert!(yaml.contains("componentVersion: 1.0.0"));
        assert!(yaml.contains("releaseOperatorDeploy: true"));
        assert!(!yaml.contains("status"));
        assert_eq!(Release::from_yaml(&yaml).unwrap(), release);
    }

    #[test]
    fn test_invalid_release_name() {
        let release = Release::from_yaml("metadata:\n  name: latest\n").unwrap();
        assert!(matches!(
            release.version(),
            Err(CoreError::InvalidReleaseName { .. })
        ));
    }

    #[test]
    fn test_mark_for_testing() {
        let mut release = Release::from_yaml(MANIFEST).unwrap();
        release.mark_for_testing();
        assert_eq!(
            release.metadata.labels.get(TESTING_LABEL).map(String::as_str),
            Some("true")
        );
    }

    #[test]
    fn test_override_component() {
        let mut release = Release::from_yaml(MANIFEST).unwrap();
        release
            .override_component("aws-operator", "9.1.0-dev", "control-plane-test-catalog", "abc123")
            .unwrap();

        let component = release.component("aws-operator").unwrap();
        assert_eq!(component.version, "9.1.0-dev");
        assert_eq!(component.catalog.as_deref(), Some("control-plane-test-catalog"));
        assert_eq!(component.reference.as_deref(), Some("9.0.0-abc123"));

        let err = release
            .override_component("azure-operator", "1.0.0", "catalog", "abc")
            .unwrap_err();
        assert!(matches!(err, CoreError::ComponentNotFound { .. }));
    }

    #[test]
    fn test_find_latest_release() {
        let dir = TempDir::new().unwrap();
        let aws = dir.path().join("aws");
        for name in ["v12.1.0", "v13.0.0", "v13.0.0-beta1", "v9.9.9", "archived", "not-a-version"] {
            std::fs::create_dir_all(aws.join(name)).unwrap();
        }
        std::fs::create_dir_all(aws.join("archived").join("v99.0.0")).unwrap();
        std::fs::write(aws.join("requests.yaml"), "releases: []\n").unwrap();

        let latest = find_latest_release(dir.path(), "aws").unwrap();
        assert_eq!(latest, aws.join("v13.0.0").join("release.yaml"));
    }

    #[test]
    fn test_find_latest_release_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("kvm").join("archived")).unwrap();

        let err = find_latest_release(dir.path(), "kvm").unwrap_err();
        assert!(err.is_release_not_found());
    }
}

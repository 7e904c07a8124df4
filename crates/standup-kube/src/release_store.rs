//! Release custom resources on the management cluster

use async_trait::async_trait;
use kube::api::{Api, DeleteParams, DynamicObject, PostParams};
use kube::core::{ApiResource, GroupVersionKind};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use standup_core::Release;

use crate::error::{KubeError, Result};

/// Access to `release.giantswarm.io/v1alpha1` Release objects
#[async_trait]
pub trait ReleaseStore: Send + Sync {
    /// Fetch a release by name
    async fn get(&self, name: &str) -> Result<Release>;

    /// Submit a new release
    async fn create(&self, release: &Release) -> Result<()>;

    /// Delete a release, letting dependents be garbage-collected in the background
    async fn delete(&self, name: &str) -> Result<()>;
}

/// [`ReleaseStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeReleaseStore {
    api: Api<DynamicObject>,
}

impl KubeReleaseStore {
    pub fn new(client: kube::Client) -> Self {
        let gvk = GroupVersionKind::gvk("release.giantswarm.io", "v1alpha1", "Release");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "releases");
        Self {
            api: Api::all_with(client, &resource),
        }
    }
}

#[async_trait]
impl ReleaseStore for KubeReleaseStore {
    async fn get(&self, name: &str) -> Result<Release> {
        let object = self.api.get(name).await?;
        from_object(object)
    }

    async fn create(&self, release: &Release) -> Result<()> {
        let object = to_object(release)?;
        self.api.create(&PostParams::default(), &object).await?;
        tracing::info!(release = release.name(), "created release CR");
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.api.delete(name, &DeleteParams::background()).await?;
        tracing::info!(release = name, "deleted release CR");
        Ok(())
    }
}

fn to_object(release: &Release) -> Result<DynamicObject> {
    Ok(serde_json::from_value(serde_json::to_value(release)?)?)
}

fn from_object(object: DynamicObject) -> Result<Release> {
    Ok(serde_json::from_value(serde_json::to_value(object)?)?)
}

/// In-memory [`ReleaseStore`] for testing
#[derive(Clone, Default)]
pub struct MockReleaseStore {
    state: Arc<Mutex<MockReleases>>,
}

#[derive(Default)]
struct MockReleases {
    releases: HashMap<String, Release>,
    /// Releases become ready once they have been fetched this many times
    ready_after: Option<usize>,
    gets_by_name: HashMap<String, usize>,
    fail_gets: bool,
    counts: ReleaseOperationCounts,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReleaseOperationCounts {
    pub gets: usize,
    pub creates: usize,
    pub deletes: usize,
}

impl MockReleaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-populated releases
    pub fn with_releases(releases: Vec<Release>) -> Self {
        let store = Self::new();
        {
            let mut state = store.lock();
            for release in releases {
                state.releases.insert(release.metadata.name.clone(), release);
            }
        }
        store
    }

    /// Mark releases ready after they have been fetched `gets` times
    pub fn ready_after(self, gets: usize) -> Self {
        self.lock().ready_after = Some(gets);
        self
    }

    /// Make every get fail with a server error
    pub fn with_failing_gets(self) -> Self {
        self.lock().fail_gets = true;
        self
    }

    pub fn operation_counts(&self) -> ReleaseOperationCounts {
        self.lock().counts.clone()
    }

    pub fn release(&self, name: &str) -> Option<Release> {
        self.lock().releases.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockReleases> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ReleaseStore for MockReleaseStore {
    async fn get(&self, name: &str) -> Result<Release> {
        let mut state = self.lock();
        state.counts.gets += 1;

        if state.fail_gets {
            return Err(KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "etcdserver: request timed out".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })));
        }

        let seen = {
            let n = state.gets_by_name.entry(name.to_string()).or_default();
            *n += 1;
            *n
        };
        let ready_after = state.ready_after;

        let release = state
            .releases
            .get_mut(name)
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
            })?;

        if ready_after.is_some_and(|n| seen >= n) {
            release.status.get_or_insert_with(Default::default).ready = true;
        }
        Ok(release.clone())
    }

    async fn create(&self, release: &Release) -> Result<()> {
        let mut state = self.lock();
        state.counts.creates += 1;
        state
            .releases
            .insert(release.metadata.name.clone(), release.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.counts.deletes += 1;
        state
            .releases
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| KubeError::ReleaseNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: release.giantswarm.io/v1alpha1
kind: Release
metadata:
  name: v13.0.0-1602000000
  labels:
    giantswarm.io/testing: "true"
spec:
  apps:
  - name: coredns
    version: 1.2.0
  components:
  - name: aws-operator
    version: 9.0.0
  state: wip
"#;

    #[test]
    fn test_object_conversion() {
        let release = Release::from_yaml(MANIFEST).unwrap();
        let object = to_object(&release).unwrap();

        assert_eq!(object.metadata.name.as_deref(), Some("v13.0.0-1602000000"));
        let types = object.types.as_ref().unwrap();
        assert_eq!(types.kind, "Release");
        assert_eq!(object.data["spec"]["components"][0]["name"], "aws-operator");

        assert_eq!(from_object(object).unwrap(), release);
    }

    #[test]
    fn test_from_object_with_server_fields() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "release.giantswarm.io/v1alpha1",
            "kind": "Release",
            "metadata": {
                "name": "v13.0.0",
                "resourceVersion": "12345",
                "uid": "0b6c6f0e-0000-0000-0000-000000000000",
                "creationTimestamp": "2020-10-06T12:00:00Z"
            },
            "spec": {"components": [], "apps": [], "state": "active"},
            "status": {"ready": true, "inUse": false}
        }))
        .unwrap();

        let release = from_object(object).unwrap();
        assert!(release.is_ready());
    }

    #[tokio::test]
    async fn test_mock_ready_after() {
        let release = Release::from_yaml(MANIFEST).unwrap();
        let store = MockReleaseStore::new().ready_after(2);
        store.create(&release).await.unwrap();

        assert!(!store.get(release.name()).await.unwrap().is_ready());
        assert!(store.get(release.name()).await.unwrap().is_ready());
        assert_eq!(store.operation_counts().gets, 2);
    }

    #[tokio::test]
    async fn test_mock_delete() {
        let release = Release::from_yaml(MANIFEST).unwrap();
        let store = MockReleaseStore::with_releases(vec![release.clone()]);

        store.delete(release.name()).await.unwrap();
        assert!(store.get(release.name()).await.unwrap_err().is_not_found());
        assert!(store.delete(release.name()).await.unwrap_err().is_not_found());
    }
}

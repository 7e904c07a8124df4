//! Cluster-management API access
//!
//! Tenant clusters are created and deleted through `gsctl`, the Giant Swarm
//! CLI. [`GsctlClient`] shells out to it with `--output=json` and maps the
//! responses; [`MockClusterManager`] keeps clusters in memory for tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::Command;

use standup_core::ProviderConfig;

use crate::error::{KubeError, Result};

/// Owner used when no organization is selected
pub const DEFAULT_CLUSTER_OWNER: &str = "conformance-testing";

const CREATED: &str = "created";
const CREATED_WITH_ERRORS: &str = "created-with-errors";
const DELETION_SCHEDULED: &str = "deletion scheduled";
const CLUSTER_NOT_FOUND_KIND: &str = "ClusterNotFoundError";

/// A cluster as reported by the cluster listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterEntry {
    pub id: String,

    /// Release version, usually without the leading `v`
    #[serde(default)]
    pub release_version: String,
}

impl ClusterEntry {
    pub fn new(id: impl Into<String>, release_version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            release_version: release_version.into(),
        }
    }

    /// Name of the Release CR the cluster runs (`v` + version)
    pub fn release_name(&self) -> String {
        format!("v{}", self.release_version.trim_start_matches('v'))
    }
}

/// Operations on tenant clusters
#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// Create a cluster and return its id
    async fn create(&self, owner: &str, name: &str, release_version: &str) -> Result<String>;

    /// Schedule deletion of a cluster
    async fn delete(&self, id: &str) -> Result<()>;

    /// List all clusters, including those being deleted
    async fn list(&self) -> Result<Vec<ClusterEntry>>;

    /// Write a self-contained kubeconfig for the cluster to `path`
    async fn create_kubeconfig(&self, id: &str, path: &Path) -> Result<()>;

    /// Look up the cluster with the given id
    async fn find(&self, id: &str) -> Result<ClusterEntry> {
        self.list()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| KubeError::ClusterNotFound { id: id.to_string() })
    }
}

#[derive(Debug, Deserialize)]
struct ResponseError {
    #[serde(default)]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    id: String,
    #[serde(default)]
    result: String,
    #[serde(default)]
    error: Option<ResponseError>,
}

/// Credentials passed to gsctl
#[derive(Clone)]
enum Auth {
    Token(String),
    Login { username: String, password: String },
}

/// [`ClusterManager`] backed by the `gsctl` binary
#[derive(Clone)]
pub struct GsctlClient {
    binary: PathBuf,
    endpoint: String,
    auth: Auth,
}

impl GsctlClient {
    /// Build a client for a provider's management cluster
    ///
    /// A token takes precedence over username and password.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(KubeError::InvalidConfig("gsctl endpoint is required".to_string()));
        }

        let auth = if config.has_token() {
            Auth::Token(config.token.clone())
        } else if !config.username.is_empty() && !config.password.is_empty() {
            Auth::Login {
                username: config.username.clone(),
                password: config.password.clone(),
            }
        } else {
            return Err(KubeError::InvalidConfig(
                "gsctl needs a token or username and password".to_string(),
            ));
        };

        Ok(Self {
            binary: PathBuf::from("gsctl"),
            endpoint: config.endpoint.clone(),
            auth,
        })
    }

    /// Use a specific gsctl binary instead of the one on `PATH`
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    async fn authenticate(&self) -> Result<()> {
        if let Auth::Login { username, password } = &self.auth {
            let args = [
                "login",
                "--username",
                username.as_str(),
                "--password",
                password.as_str(),
            ];
            let output = self.run(&args).await?;
            if !output.status.success() {
                return Err(command_failed("login", &output));
            }
        }
        Ok(())
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).arg("--endpoint").arg(&self.endpoint);
        if let Auth::Token(token) = &self.auth {
            cmd.arg("--auth-token").arg(token);
        }
        cmd
    }

    async fn run(&self, args: &[&str]) -> Result<std::process::Output> {
        tracing::debug!(args = ?args, "running gsctl");
        Ok(self.command(args).output().await?)
    }

    /// Run a JSON command; a failed exit still carries a JSON body worth parsing
    async fn run_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        args: &[&str],
    ) -> Result<T> {
        self.authenticate().await?;

        let output = self.run(args).await?;
        serde_json::from_slice(&output.stdout).map_err(|_| command_failed(name, &output))
    }
}

#[async_trait]
impl ClusterManager for GsctlClient {
    async fn create(&self, owner: &str, name: &str, release_version: &str) -> Result<String> {
        let response: Response = self
            .run_json(
                "create cluster",
                &[
                    "--output=json",
                    "create",
                    "cluster",
                    "--owner",
                    owner,
                    "--name",
                    name,
                    "--release",
                    release_version,
                ],
            )
            .await?;
        parse_creation(response)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let response: Response = self
            .run_json("delete cluster", &["--output=json", "delete", "cluster", id])
            .await?;
        parse_deletion(response, id)
    }

    async fn list(&self) -> Result<Vec<ClusterEntry>> {
        self.run_json(
            "list clusters",
            &["--output=json", "list", "clusters", "--show-deleting"],
        )
        .await
    }

    async fn create_kubeconfig(&self, id: &str, path: &Path) -> Result<()> {
        self.authenticate().await?;

        let path = path.to_string_lossy();
        let output = self
            .run(&[
                "create",
                "kubeconfig",
                "--cluster",
                id,
                "--certificate-organizations",
                "system:masters",
                "--force",
                "--self-contained",
                path.as_ref(),
            ])
            .await?;

        if !output.status.success() {
            return Err(command_failed("create kubeconfig", &output));
        }
        Ok(())
    }
}

fn parse_creation(response: Response) -> Result<String> {
    match response.result.as_str() {
        CREATED => Ok(response.id),
        CREATED_WITH_ERRORS => Err(KubeError::CreatedWithErrors { id: response.id }),
        other => Err(KubeError::ClusterManager {
            command: "create cluster".to_string(),
            message: format!("unexpected result '{}'", other),
        }),
    }
}

fn parse_deletion(response: Response, id: &str) -> Result<()> {
    if response.result == DELETION_SCHEDULED {
        return Ok(());
    }

    match response.error {
        Some(e) if e.kind == CLUSTER_NOT_FOUND_KIND => {
            Err(KubeError::ClusterNotFound { id: id.to_string() })
        }
        _ => Err(KubeError::ClusterManager {
            command: "delete cluster".to_string(),
            message: format!("unexpected result '{}'", response.result),
        }),
    }
}

fn command_failed(command: &str, output: &std::process::Output) -> KubeError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let message = if stderr.trim().is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.trim().to_string()
    };

    KubeError::ClusterManager {
        command: command.to_string(),
        message: format!("{} ({})", message, output.status),
    }
}

/// In-memory [`ClusterManager`] for testing
#[derive(Clone, Default)]
pub struct MockClusterManager {
    state: Arc<Mutex<MockClusters>>,
}

#[derive(Default)]
struct MockClusters {
    clusters: Vec<ClusterEntry>,
    /// id -> remaining listings before a deleted cluster disappears
    deleting: Vec<(String, usize)>,
    deletion_lag: usize,
    kubeconfig_failures: usize,
    fail_listing: bool,
    creation_errors: bool,
    next_id: usize,
    counts: ClusterOperationCounts,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ClusterOperationCounts {
    pub creates: usize,
    pub deletes: usize,
    pub lists: usize,
    pub kubeconfigs: usize,
}

impl MockClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-existing clusters
    pub fn with_clusters(clusters: Vec<ClusterEntry>) -> Self {
        let mock = Self::new();
        mock.lock().clusters = clusters;
        mock
    }

    /// Keep deleted clusters listed for `listings` more list calls
    pub fn with_deletion_lag(self, listings: usize) -> Self {
        self.lock().deletion_lag = listings;
        self
    }

    /// Fail the first `n` kubeconfig requests
    pub fn with_kubeconfig_failures(self, n: usize) -> Self {
        self.lock().kubeconfig_failures = n;
        self
    }

    /// Create clusters that report errors, as gsctl's `created-with-errors`
    pub fn with_creation_errors(self) -> Self {
        self.lock().creation_errors = true;
        self
    }

    /// Make every list call fail
    pub fn with_failing_listing(self) -> Self {
        self.lock().fail_listing = true;
        self
    }

    pub fn operation_counts(&self) -> ClusterOperationCounts {
        self.lock().counts.clone()
    }

    pub fn clusters(&self) -> Vec<ClusterEntry> {
        self.lock().clusters.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockClusters> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ClusterManager for MockClusterManager {
    async fn create(&self, _owner: &str, _name: &str, release_version: &str) -> Result<String> {
        let mut state = self.lock();
        state.counts.creates += 1;
        state.next_id += 1;

        let id = format!("t{:04}", state.next_id);
        state
            .clusters
            .push(ClusterEntry::new(id.clone(), release_version));
        if state.creation_errors {
            return Err(KubeError::CreatedWithErrors { id });
        }
        Ok(id)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.counts.deletes += 1;

        if !state.clusters.iter().any(|c| c.id == id) {
            return Err(KubeError::ClusterNotFound { id: id.to_string() });
        }
        let lag = state.deletion_lag;
        state.deleting.push((id.to_string(), lag));
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ClusterEntry>> {
        let mut state = self.lock();
        state.counts.lists += 1;

        if state.fail_listing {
            return Err(KubeError::ClusterManager {
                command: "list clusters".to_string(),
                message: "connection refused".to_string(),
            });
        }

        let mut gone = Vec::new();
        for (id, remaining) in state.deleting.iter_mut() {
            if *remaining == 0 {
                gone.push(id.clone());
            } else {
                *remaining -= 1;
            }
        }
        state.deleting.retain(|(id, _)| !gone.contains(id));
        state.clusters.retain(|c| !gone.contains(&c.id));

        Ok(state.clusters.clone())
    }

    async fn create_kubeconfig(&self, id: &str, path: &Path) -> Result<()> {
        {
            let mut state = self.lock();
            state.counts.kubeconfigs += 1;

            if state.kubeconfig_failures > 0 {
                state.kubeconfig_failures -= 1;
                return Err(KubeError::ClusterManager {
                    command: "create kubeconfig".to_string(),
                    message: "cluster API not available yet".to_string(),
                });
            }
            if !state.clusters.iter().any(|c| c.id == id) {
                return Err(KubeError::ClusterNotFound { id: id.to_string() });
            }
        }

        tokio::fs::write(path, format!("# kubeconfig for cluster {}\n", id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: &str) -> Response {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_creation() {
        let id = parse_creation(response(r#"{"id": "a1b2c", "result": "created"}"#)).unwrap();
        assert_eq!(id, "a1b2c");

        let err = parse_creation(response(r#"{"id": "a1b2c", "result": "created-with-errors"}"#))
            .unwrap_err();
        assert!(matches!(err, KubeError::CreatedWithErrors { ref id } if id == "a1b2c"));

        assert!(parse_creation(response(r#"{"result": "error"}"#)).is_err());
    }

    #[test]
    fn test_parse_deletion() {
        parse_deletion(
            response(r#"{"id": "a1b2c", "result": "deletion scheduled"}"#),
            "a1b2c",
        )
        .unwrap();

        let err = parse_deletion(
            response(r#"{"result": "error", "error": {"kind": "ClusterNotFoundError"}}"#),
            "a1b2c",
        )
        .unwrap_err();
        assert!(matches!(err, KubeError::ClusterNotFound { .. }));

        let err = parse_deletion(response(r#"{"result": "error"}"#), "a1b2c").unwrap_err();
        assert!(matches!(err, KubeError::ClusterManager { .. }));
    }

    #[test]
    fn test_parse_listing() {
        let entries: Vec<ClusterEntry> = serde_json::from_str(
            r#"[{"id": "a1b2c", "release_version": "13.0.0-1602000000", "owner": "conformance-testing"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].id, "a1b2c");
        assert_eq!(entries[0].release_name(), "v13.0.0-1602000000");
    }

    #[test]
    fn test_release_name_keeps_single_v() {
        assert_eq!(ClusterEntry::new("x", "v1.2.3").release_name(), "v1.2.3");
    }

    #[test]
    fn test_gsctl_client_requires_credentials() {
        let config = ProviderConfig {
            context: "ctx".to_string(),
            endpoint: "https://api.example.com".to_string(),
            ..Default::default()
        };
        assert!(GsctlClient::new(&config).is_err());

        let config = ProviderConfig {
            token: "t".to_string(),
            ..config
        };
        assert!(GsctlClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let config = ProviderConfig {
            endpoint: "https://api.example.com".to_string(),
            token: "t".to_string(),
            ..Default::default()
        };
        let client = GsctlClient::new(&config)
            .unwrap()
            .with_binary("/nonexistent/gsctl");

        assert!(matches!(client.list().await, Err(KubeError::Io(_))));
    }

    #[tokio::test]
    async fn test_mock_find() {
        let mock = MockClusterManager::with_clusters(vec![ClusterEntry::new("abc12", "13.0.0")]);
        assert_eq!(mock.find("abc12").await.unwrap().release_name(), "v13.0.0");
        assert!(matches!(
            mock.find("zzz99").await,
            Err(KubeError::ClusterNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_deletion_lag() {
        let mock = MockClusterManager::with_clusters(vec![ClusterEntry::new("abc12", "13.0.0")])
            .with_deletion_lag(2);

        mock.delete("abc12").await.unwrap();
        assert_eq!(mock.list().await.unwrap().len(), 1);
        assert_eq!(mock.list().await.unwrap().len(), 1);
        assert!(mock.list().await.unwrap().is_empty());
        assert_eq!(mock.operation_counts().lists, 3);
    }
}

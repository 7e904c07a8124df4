//! Error types for standup-kube

use thiserror::Error;

/// Result type for standup-kube operations
pub type Result<T> = std::result::Result<T, KubeError>;

/// Errors raised while talking to the management or workload cluster
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KubeError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Api(#[from] kube::Error),

    /// Kubeconfig could not be loaded
    #[error("invalid kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    /// Resource exists but is not ready yet
    #[error("{resource} not ready: {message}")]
    NotReady { resource: String, message: String },

    /// Release custom resource does not exist
    #[error("release '{name}' not found")]
    ReleaseNotFound { name: String },

    /// Cluster id unknown to the cluster-management API
    #[error("cluster '{id}' not found")]
    ClusterNotFound { id: String },

    /// Cluster exists but its creation reported errors
    #[error("cluster '{id}' created with errors")]
    CreatedWithErrors { id: String },

    /// Cluster-management CLI failed
    #[error("gsctl {command} failed: {message}")]
    ClusterManager { command: String, message: String },

    /// No organization is eligible to own test clusters
    #[error("no organization labelled '{label}' found")]
    NoOrganization { label: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Core error (release model, config)
    #[error(transparent)]
    Core(#[from] standup_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for KubeError {
    fn from(e: serde_json::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for KubeError {
    fn from(e: serde_yaml::Error) -> Self {
        KubeError::Serialization(e.to_string())
    }
}

impl KubeError {
    /// Shorthand for a [`KubeError::NotReady`]
    pub fn not_ready(resource: impl Into<String>, message: impl Into<String>) -> Self {
        KubeError::NotReady {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Check if this is a Kubernetes 404 Not Found error or a missing release
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code == 404)
            || matches!(self, KubeError::ReleaseNotFound { .. })
    }

    /// Check if this is a "not ready yet" condition
    pub fn is_not_ready(&self) -> bool {
        matches!(self, KubeError::NotReady { .. })
    }

    /// Check if this is a server-side failure (5xx)
    pub fn is_server_error(&self) -> bool {
        matches!(self, KubeError::Api(kube::Error::Api(resp)) if resp.code >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> KubeError {
        KubeError::Api(kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "NotFound".to_string(),
            code,
        }))
    }

    #[test]
    fn test_is_not_found() {
        assert!(api_error(404).is_not_found());
        assert!(!api_error(500).is_not_found());
        assert!(
            KubeError::ReleaseNotFound {
                name: "v1.0.0".to_string()
            }
            .is_not_found()
        );
        assert!(
            !KubeError::ClusterNotFound {
                id: "abc12".to_string()
            }
            .is_not_found()
        );
    }

    #[test]
    fn test_is_server_error() {
        assert!(api_error(503).is_server_error());
        assert!(!api_error(404).is_server_error());
    }

    #[test]
    fn test_not_ready() {
        let err = KubeError::not_ready("release v13.0.0", "status.ready is false");
        assert!(err.is_not_ready());
        assert_eq!(err.to_string(), "release v13.0.0 not ready: status.ready is false");
    }
}

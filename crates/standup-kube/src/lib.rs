//! Standup Kube - Cluster lifecycle integration for standup
//!
//! This crate provides:
//! - **Polling**: Fixed-interval retry with bounded and unbounded budgets
//! - **Readiness**: Predicates for releases, clusters, nodes, DNS and charts
//! - **Cluster management**: Tenant cluster lifecycle through `gsctl`
//! - **Release store**: Release custom resources on the management cluster
//! - **Workload observer**: Read-only view of a tenant cluster
//!
//! Every collaborator is a trait with a Kubernetes-backed implementation and
//! an in-memory mock, so waits can be tested without a cluster.

pub mod client;
pub mod cluster;
pub mod error;
pub mod poll;
pub mod readiness;
pub mod release_store;
pub mod workload;

pub use client::{
    TEST_ORGANIZATION_LABEL, choose_owner, connect, connect_installation, kubeconfig_path,
    list_test_organizations,
};
pub use cluster::{
    ClusterEntry, ClusterManager, ClusterOperationCounts, DEFAULT_CLUSTER_OWNER, GsctlClient,
    MockClusterManager,
};
pub use error::{KubeError, Result};
pub use poll::{RetryError, RetryPolicy, retry};
pub use readiness::{COREDNS, Check, DnsTarget, EXTERNAL_DNS};
pub use release_store::{KubeReleaseStore, MockReleaseStore, ReleaseOperationCounts, ReleaseStore};
pub use workload::{
    CHART_NAMESPACE, Chart, KubeWorkloadObserver, MockWorkloadObserver, WorkloadObserver,
    WorkloadOperationCounts,
};

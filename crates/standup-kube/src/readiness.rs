//! Readiness predicates
//!
//! Each waited-on resource has a pure `classify_*` function turning observed
//! state into a poll outcome, and an async check that observes through a
//! collaborator and classifies. Checks are meant to be driven by
//! [`crate::poll::retry`]:
//!
//! - `Ok(())`: condition met
//! - `Err(RetryError::Transient(_))`: not yet, usually [`KubeError::NotReady`]
//! - `Err(RetryError::Permanent(_))`: stop waiting

use k8s_openapi::api::core::v1::{Node, Pod, Service};
use std::path::Path;

use standup_core::Release;

use crate::cluster::{ClusterEntry, ClusterManager};
use crate::error::{KubeError, Result};
use crate::poll::RetryError;
use crate::release_store::ReleaseStore;
use crate::workload::{CHART_NAMESPACE, Chart, WorkloadObserver, selector_from_labels};

/// Outcome of a single readiness check
pub type Check = std::result::Result<(), RetryError<KubeError>>;

/// A DNS deployment found through its service
#[derive(Debug, Clone, Copy)]
pub struct DnsTarget {
    pub name: &'static str,
    pub namespace: &'static str,
    /// Service selectors, tried in order until one finds a service
    pub selectors: &'static [&'static str],
}

pub const COREDNS: DnsTarget = DnsTarget {
    name: "CoreDNS",
    namespace: "kube-system",
    selectors: &[
        "kubernetes.io/cluster-service=true,kubernetes.io/name=CoreDNS",
        "k8s-app=coredns",
    ],
};

pub const EXTERNAL_DNS: DnsTarget = DnsTarget {
    name: "external-dns",
    namespace: "kube-system",
    selectors: &["app=external-dns", "app.kubernetes.io/name=external-dns"],
};

fn not_ready(resource: impl Into<String>, message: impl Into<String>) -> Check {
    Err(RetryError::Transient(KubeError::not_ready(resource, message)))
}

// ========== Pure classifiers ==========

pub fn classify_release(release: &Release) -> Check {
    if release.is_ready() {
        Ok(())
    } else {
        not_ready(format!("release {}", release.name()), "status.ready is false")
    }
}

pub fn classify_cluster_gone(clusters: &[ClusterEntry], id: &str) -> Check {
    if clusters.iter().any(|c| c.id == id) {
        not_ready(format!("cluster {}", id), "still listed, waiting for deletion")
    } else {
        Ok(())
    }
}

pub fn classify_release_gone(name: &str, fetched: Result<Release>) -> Check {
    match fetched {
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(RetryError::Permanent(e)),
        Ok(_) => not_ready(format!("release {}", name), "still exists, waiting for deletion"),
    }
}

fn node_is_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True")
}

pub fn classify_nodes(nodes: &[Node], min_nodes: usize) -> Check {
    if nodes.len() < min_nodes {
        return not_ready(
            "nodes",
            format!(
                "found {} registered nodes, waiting for at least {}",
                nodes.len(),
                min_nodes
            ),
        );
    }

    let ready = nodes.iter().filter(|n| node_is_ready(n)).count();
    if ready < nodes.len() {
        return not_ready("nodes", format!("{} out of {} nodes ready", ready, nodes.len()));
    }
    Ok(())
}

pub fn classify_pods(name: &str, pods: &[Pod]) -> Check {
    if pods.is_empty() {
        return not_ready(name, "no pods found");
    }

    for pod in pods {
        let statuses = pod
            .status
            .as_ref()
            .and_then(|s| s.container_statuses.as_deref())
            .unwrap_or_default();

        if statuses.is_empty() {
            let pod_name = pod.metadata.name.as_deref().unwrap_or("<unnamed>");
            return not_ready(name, format!("pod {} has no container statuses", pod_name));
        }
        if let Some(container) = statuses.iter().find(|c| !c.ready) {
            return not_ready(name, format!("container {} not ready", container.name));
        }
    }
    Ok(())
}

pub fn classify_charts(charts: &[Chart], min_charts: usize) -> Check {
    if charts.len() < min_charts {
        return not_ready(
            "charts",
            format!("found {} charts, waiting for at least {}", charts.len(), min_charts),
        );
    }

    let pending: Vec<&str> = charts
        .iter()
        .filter(|c| !c.is_deployed())
        .map(|c| c.name.as_str())
        .collect();
    if !pending.is_empty() {
        return not_ready("charts", format!("not deployed yet: {}", pending.join(", ")));
    }
    Ok(())
}

// ========== Observing checks ==========

/// The release exists and its operator reports it ready
pub async fn release_ready<S: ReleaseStore + ?Sized>(store: &S, name: &str) -> Check {
    let release = store.get(name).await.map_err(RetryError::Permanent)?;
    classify_release(&release)
}

/// The release has been deleted
pub async fn release_gone<S: ReleaseStore + ?Sized>(store: &S, name: &str) -> Check {
    classify_release_gone(name, store.get(name).await)
}

/// The cluster no longer appears in the cluster listing
pub async fn cluster_gone<M: ClusterManager + ?Sized>(manager: &M, id: &str) -> Check {
    let clusters = manager.list().await.map_err(RetryError::Permanent)?;
    classify_cluster_gone(&clusters, id)
}

/// A kubeconfig for the cluster could be written to `path`
pub async fn kubeconfig_available<M: ClusterManager + ?Sized>(
    manager: &M,
    id: &str,
    path: &Path,
) -> Check {
    manager
        .create_kubeconfig(id, path)
        .await
        .map_err(RetryError::Transient)
}

/// The cluster API answers
pub async fn api_reachable<W: WorkloadObserver + ?Sized>(observer: &W) -> Check {
    observer
        .list_nodes()
        .await
        .map(|_| ())
        .map_err(RetryError::Transient)
}

/// At least `min_nodes` nodes are registered and all of them are Ready
pub async fn nodes_ready<W: WorkloadObserver + ?Sized>(observer: &W, min_nodes: usize) -> Check {
    let nodes = observer.list_nodes().await.map_err(RetryError::Transient)?;
    classify_nodes(&nodes, min_nodes)
}

/// The target's service exists and every container behind it is ready
pub async fn dns_ready<W: WorkloadObserver + ?Sized>(observer: &W, target: &DnsTarget) -> Check {
    let service = find_service(observer, target).await?;

    let selector = service
        .spec
        .as_ref()
        .and_then(|s| s.selector.as_ref())
        .map(selector_from_labels)
        .unwrap_or_default();
    if selector.is_empty() {
        return not_ready(target.name, "service has no pod selector");
    }

    let pods = observer
        .list_pods(target.namespace, &selector)
        .await
        .map_err(RetryError::Transient)?;
    classify_pods(target.name, &pods)
}

async fn find_service<W: WorkloadObserver + ?Sized>(
    observer: &W,
    target: &DnsTarget,
) -> std::result::Result<Service, RetryError<KubeError>> {
    for selector in target.selectors {
        let services = observer
            .list_services(target.namespace, selector)
            .await
            .map_err(RetryError::Transient)?;
        if let Some(service) = services.into_iter().next() {
            return Ok(service);
        }
        tracing::debug!(dns = target.name, selector, "no service found with selector");
    }

    Err(RetryError::Transient(KubeError::not_ready(
        target.name,
        format!("service not found using selectors {}", target.selectors.join(" or ")),
    )))
}

/// At least `min_charts` charts exist and all are deployed
pub async fn charts_deployed<W: WorkloadObserver + ?Sized>(
    observer: &W,
    min_charts: usize,
) -> Check {
    let charts = observer
        .list_charts(CHART_NAMESPACE)
        .await
        .map_err(RetryError::Transient)?;
    classify_charts(&charts, min_charts)
}

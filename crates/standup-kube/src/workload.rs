//! Read-only view of a tenant cluster's workloads

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use kube::api::{Api, DynamicObject, ListParams};
use kube::core::{ApiResource, GroupVersionKind};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{KubeError, Result};

/// Namespace holding the Chart custom resources of a tenant cluster
pub const CHART_NAMESPACE: &str = "giantswarm";

/// Release status of a successfully installed chart
pub const CHART_DEPLOYED: &str = "deployed";

/// A `application.giantswarm.io/v1alpha1` Chart, reduced to what readiness needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chart {
    pub name: String,
    /// `status.release.status`, absent until the chart operator picks it up
    pub release_status: Option<String>,
}

impl Chart {
    pub fn new(name: impl Into<String>, release_status: Option<&str>) -> Self {
        Self {
            name: name.into(),
            release_status: release_status.map(str::to_string),
        }
    }

    pub fn is_deployed(&self) -> bool {
        self.release_status.as_deref() == Some(CHART_DEPLOYED)
    }

    fn from_object(object: &DynamicObject) -> Self {
        let release_status = object
            .data
            .pointer("/status/release/status")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Self {
            name: object.metadata.name.clone().unwrap_or_default(),
            release_status,
        }
    }
}

/// Observation of nodes, services, pods and charts
#[async_trait]
pub trait WorkloadObserver: Send + Sync {
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    async fn list_services(&self, namespace: &str, selector: &str) -> Result<Vec<Service>>;

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>>;

    async fn list_charts(&self, namespace: &str) -> Result<Vec<Chart>>;
}

/// [`WorkloadObserver`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeWorkloadObserver {
    client: kube::Client,
    charts: ApiResource,
}

impl KubeWorkloadObserver {
    pub fn new(client: kube::Client) -> Self {
        let gvk = GroupVersionKind::gvk("application.giantswarm.io", "v1alpha1", "Chart");
        Self {
            client,
            charts: ApiResource::from_gvk_with_plural(&gvk, "charts"),
        }
    }
}

#[async_trait]
impl WorkloadObserver for KubeWorkloadObserver {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let api: Api<Node> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_services(&self, namespace: &str, selector: &str) -> Result<Vec<Service>> {
        let api: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(selector);
        Ok(api.list(&lp).await?.items)
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let lp = ListParams::default().labels(selector);
        Ok(api.list(&lp).await?.items)
    }

    async fn list_charts(&self, namespace: &str) -> Result<Vec<Chart>> {
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client.clone(), namespace, &self.charts);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items.iter().map(Chart::from_object).collect())
    }
}

/// Render a label map as a selector (`a=b,c=d`), sorted by key
pub fn selector_from_labels(labels: &BTreeMap<String, String>) -> String {
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",")
}

/// In-memory [`WorkloadObserver`] for testing
///
/// Selectors are matched exactly against the selector string a service or
/// pod set was registered under.
#[derive(Clone, Default)]
pub struct MockWorkloadObserver {
    state: Arc<Mutex<MockWorkloads>>,
}

#[derive(Default)]
struct MockWorkloads {
    nodes: Vec<Node>,
    services: Vec<(String, String, Service)>,
    pods: Vec<(String, String, Pod)>,
    charts: Vec<(String, Chart)>,
    unreachable_lists: usize,
    counts: WorkloadOperationCounts,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkloadOperationCounts {
    pub node_lists: usize,
    pub service_lists: usize,
    pub pod_lists: usize,
    pub chart_lists: usize,
}

impl MockWorkloadObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(self, nodes: Vec<Node>) -> Self {
        self.lock().nodes = nodes;
        self
    }

    pub fn with_service(self, namespace: &str, selector: &str, service: Service) -> Self {
        self.lock()
            .services
            .push((namespace.to_string(), selector.to_string(), service));
        self
    }

    pub fn with_pods(self, namespace: &str, selector: &str, pods: Vec<Pod>) -> Self {
        {
            let mut state = self.lock();
            for pod in pods {
                state
                    .pods
                    .push((namespace.to_string(), selector.to_string(), pod));
            }
        }
        self
    }

    pub fn with_charts(self, namespace: &str, charts: Vec<Chart>) -> Self {
        {
            let mut state = self.lock();
            for chart in charts {
                state.charts.push((namespace.to_string(), chart));
            }
        }
        self
    }

    /// Fail the first `n` node listings as if the API were not up yet
    pub fn unreachable_for(self, n: usize) -> Self {
        self.lock().unreachable_lists = n;
        self
    }

    /// Replace the node list, e.g. to simulate nodes joining
    pub fn set_nodes(&self, nodes: Vec<Node>) {
        self.lock().nodes = nodes;
    }

    pub fn operation_counts(&self) -> WorkloadOperationCounts {
        self.lock().counts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockWorkloads> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl WorkloadObserver for MockWorkloadObserver {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut state = self.lock();
        state.counts.node_lists += 1;

        if state.unreachable_lists > 0 {
            state.unreachable_lists -= 1;
            return Err(KubeError::Api(kube::Error::Api(kube::core::ErrorResponse {
                status: "Failure".to_string(),
                message: "the server is currently unable to handle the request".to_string(),
                reason: "ServiceUnavailable".to_string(),
                code: 503,
            })));
        }
        Ok(state.nodes.clone())
    }

    async fn list_services(&self, namespace: &str, selector: &str) -> Result<Vec<Service>> {
        let mut state = self.lock();
        state.counts.service_lists += 1;
        Ok(state
            .services
            .iter()
            .filter(|(ns, sel, _)| ns == namespace && sel == selector)
            .map(|(_, _, svc)| svc.clone())
            .collect())
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>> {
        let mut state = self.lock();
        state.counts.pod_lists += 1;
        Ok(state
            .pods
            .iter()
            .filter(|(ns, sel, _)| ns == namespace && sel == selector)
            .map(|(_, _, pod)| pod.clone())
            .collect())
    }

    async fn list_charts(&self, namespace: &str) -> Result<Vec<Chart>> {
        let mut state = self.lock();
        state.counts.chart_lists += 1;
        Ok(state
            .charts
            .iter()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, chart)| chart.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_from_object() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "application.giantswarm.io/v1alpha1",
            "kind": "Chart",
            "metadata": {"name": "coredns", "namespace": "giantswarm"},
            "spec": {"name": "coredns-app"},
            "status": {"release": {"status": "deployed"}}
        }))
        .unwrap();

        let chart = Chart::from_object(&object);
        assert_eq!(chart.name, "coredns");
        assert!(chart.is_deployed());
    }

    #[test]
    fn test_chart_without_status() {
        let object: DynamicObject = serde_json::from_value(serde_json::json!({
            "apiVersion": "application.giantswarm.io/v1alpha1",
            "kind": "Chart",
            "metadata": {"name": "kiam"}
        }))
        .unwrap();

        let chart = Chart::from_object(&object);
        assert_eq!(chart.release_status, None);
        assert!(!chart.is_deployed());
    }

    #[test]
    fn test_selector_from_labels() {
        let labels = BTreeMap::from([
            ("k8s-app".to_string(), "coredns".to_string()),
            ("app".to_string(), "dns".to_string()),
        ]);
        assert_eq!(selector_from_labels(&labels), "app=dns,k8s-app=coredns");
    }

    #[tokio::test]
    async fn test_mock_filters_by_namespace() {
        let mock = MockWorkloadObserver::new()
            .with_charts("giantswarm", vec![Chart::new("a", Some("deployed"))])
            .with_charts("default", vec![Chart::new("b", None)]);

        let charts = mock.list_charts("giantswarm").await.unwrap();
        assert_eq!(charts, vec![Chart::new("a", Some("deployed"))]);
        assert_eq!(mock.operation_counts().chart_lists, 1);
    }
}

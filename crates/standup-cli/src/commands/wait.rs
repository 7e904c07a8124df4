//! Wait command - block until a new tenant cluster can run tests

use console::style;
use std::path::Path;

use standup_core::{Feature, ProviderTable};
use standup_kube::poll::{RetryPolicy, policy};
use standup_kube::readiness::{api_reachable, charts_deployed, dns_ready, nodes_ready};
use standup_kube::{COREDNS, EXTERNAL_DNS, KubeWorkloadObserver, WorkloadObserver, connect, retry};

use crate::error::{CliError, Result};

/// Minimum value accepted for `--nodes`
pub const MIN_NODES: usize = 2;

/// Budgets for each stage of the wait
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicies {
    pub api: RetryPolicy,
    pub nodes: RetryPolicy,
    pub dns: RetryPolicy,
    pub charts: RetryPolicy,
}

impl Default for WaitPolicies {
    fn default() -> Self {
        Self {
            api: policy::STANDARD,
            nodes: policy::STANDARD,
            dns: policy::STANDARD,
            charts: policy::LONG_POLL,
        }
    }
}

/// Run the wait command
pub async fn run(kubeconfig: &Path, provider: &str, nodes: usize, charts: usize) -> Result<()> {
    if nodes < MIN_NODES {
        return Err(CliError::input(format!(
            "--nodes has to be at least {}, got {}",
            MIN_NODES, nodes
        )));
    }

    let table = ProviderTable::standard();
    if !table.is_known_provider(provider) {
        tracing::warn!(provider, "unknown provider, waiting for the common checks only");
    }

    let client = connect(kubeconfig, None).await?;
    let observer = KubeWorkloadObserver::new(client);

    wait_for_cluster(&observer, &table, provider, nodes, charts, &WaitPolicies::default()).await?;

    println!("{} Cluster is ready", style("✓").green().bold());
    Ok(())
}

fn stage(message: &str) {
    println!("{} {}", style("→").blue().bold(), message);
}

async fn wait_for_cluster<W: WorkloadObserver + ?Sized>(
    observer: &W,
    table: &ProviderTable,
    provider: &str,
    nodes: usize,
    charts: usize,
    policies: &WaitPolicies,
) -> Result<()> {
    stage("Waiting for the Kubernetes API");
    retry(&policies.api, "api reachable", || api_reachable(observer))
        .await
        .map_err(|e| CliError::wait("Kubernetes API", e))?;

    stage(&format!("Waiting for {} ready nodes", nodes));
    retry(&policies.nodes, "nodes ready", || nodes_ready(observer, nodes))
        .await
        .map_err(|e| CliError::wait("nodes", e))?;

    stage("Waiting for CoreDNS");
    retry(&policies.dns, "coredns ready", || dns_ready(observer, &COREDNS))
        .await
        .map_err(|e| CliError::wait("CoreDNS", e))?;

    if table.has_feature(provider, Feature::ExternalDns) {
        stage("Waiting for external-dns");
        retry(&policies.dns, "external-dns ready", || {
            dns_ready(observer, &EXTERNAL_DNS)
        })
        .await
        .map_err(|e| CliError::wait("external-dns", e))?;
    } else {
        tracing::info!(provider, "provider runs no external-dns, skipping");
    }

    stage("Waiting for charts to be deployed");
    retry(&policies.charts, "charts deployed", || {
        charts_deployed(observer, charts)
    })
    .await
    .map_err(|e| CliError::wait("charts", e))?;

    Ok(())
}

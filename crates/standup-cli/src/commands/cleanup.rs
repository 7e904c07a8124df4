//! Cleanup command - delete the test cluster and the release it ran

use console::style;
use std::path::Path;

use standup_core::ProviderConfig;
use standup_kube::poll::{RetryPolicy, policy};
use standup_kube::readiness::{cluster_gone, release_gone};
use standup_kube::{ClusterManager, GsctlClient, KubeReleaseStore, ReleaseStore, connect, retry};

use crate::error::{CliError, Result};

/// Run the cleanup command
pub async fn run(config: &Path, kubeconfig: &Path, provider: &str, cluster_id: &str) -> Result<()> {
    let provider_config = ProviderConfig::load(config, provider)?;
    let manager = GsctlClient::new(&provider_config)?;

    let client = connect(kubeconfig, Some(provider_config.context.as_str())).await?;
    let store = KubeReleaseStore::new(client);

    teardown(&manager, &store, cluster_id, &policy::UNBOUNDED).await?;

    println!("{} Cleanup complete", style("✓").green().bold());
    Ok(())
}

async fn teardown<M, S>(
    manager: &M,
    store: &S,
    cluster_id: &str,
    policy: &RetryPolicy,
) -> Result<()>
where
    M: ClusterManager + ?Sized,
    S: ReleaseStore + ?Sized,
{
    let cluster = manager.find(cluster_id).await?;
    let release = cluster.release_name();

    println!(
        "{} Deleting cluster {} running release {}",
        style("→").blue().bold(),
        style(cluster_id).cyan(),
        style(&release).yellow()
    );
    manager.delete(cluster_id).await?;
    retry(policy, "cluster gone", || cluster_gone(manager, cluster_id))
        .await
        .map_err(|e| CliError::wait("cluster deletion", e))?;

    println!(
        "{} Deleting release {}",
        style("→").blue().bold(),
        style(&release).yellow()
    );
    match store.delete(&release).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => {
            tracing::warn!(release = %release, "release already deleted");
        }
        Err(e) => return Err(e.into()),
    }
    retry(policy, "release gone", || release_gone(store, &release))
        .await
        .map_err(|e| CliError::wait("release deletion", e))?;

    Ok(())
}

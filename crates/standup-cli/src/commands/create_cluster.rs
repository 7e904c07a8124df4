//! Create cluster command - a tenant cluster running the release under test

use console::style;
use std::path::Path;

use standup_core::ProviderConfig;
use standup_kube::poll::{RetryPolicy, policy};
use standup_kube::readiness::kubeconfig_available;
use standup_kube::{
    ClusterManager, GsctlClient, KubeError, choose_owner, connect_installation,
    list_test_organizations, retry,
};

use crate::error::{CliError, Result};
use crate::output::{self, OutputDir};

/// Run the create cluster command
///
/// Provider, installation and release fall back to the files written by
/// `create release` in the output directory.
pub async fn run(
    config: &Path,
    kubeconfig: &Path,
    output: &Path,
    provider: Option<&str>,
    installation: Option<&str>,
    release: Option<&str>,
    owner: Option<&str>,
) -> Result<()> {
    if release.is_some() && installation.is_none() {
        return Err(CliError::input(
            "--installation must be specified when defining an exact release version",
        ));
    }

    let outputs = OutputDir::new(output);
    let provider = outputs.flag_or_read(provider, output::PROVIDER)?;
    let installation = outputs.flag_or_read(installation, output::INSTALLATION)?;
    let release_version = release_version(&outputs.flag_or_read(release, output::RELEASE_ID)?)?;

    let provider_config = ProviderConfig::load(config, &provider)?;
    let manager = GsctlClient::new(&provider_config)?;

    let owner = match owner {
        Some(owner) => owner.to_string(),
        None => {
            let client = connect_installation(kubeconfig, &installation).await?;
            choose_owner(&list_test_organizations(client).await?)?
        }
    };

    println!(
        "{} Creating cluster for release {} on {} owned by {}",
        style("→").blue().bold(),
        style(&release_version).yellow(),
        style(&installation).cyan(),
        style(&owner).cyan()
    );

    let id = create_cluster(
        &manager,
        &owner,
        &release_version,
        &outputs,
        &policy::UNBOUNDED,
    )
    .await?;

    println!(
        "{} Cluster {} is up, kubeconfig written to {}",
        style("✓").green().bold(),
        style(&id).cyan(),
        outputs.path(output::KUBECONFIG).display()
    );
    Ok(())
}

/// Release version as the cluster-management API wants it: semver, no `v`
fn release_version(raw: &str) -> Result<String> {
    let version = raw.trim().trim_start_matches('v');
    semver::Version::parse(version).map_err(|e| {
        CliError::input_with_help(
            format!("'{}' is not a valid release version: {}", raw, e),
            "release versions look like 13.0.0 or v13.0.0-1602000000",
        )
    })?;
    Ok(version.to_string())
}

/// Create the cluster, record its id and fetch a kubeconfig once it answers
async fn create_cluster<M: ClusterManager + ?Sized>(
    manager: &M,
    owner: &str,
    release_version: &str,
    outputs: &OutputDir,
    policy: &RetryPolicy,
) -> Result<String> {
    let id = match manager.create(owner, release_version, release_version).await {
        Ok(id) => id,
        Err(KubeError::CreatedWithErrors { id }) => {
            // cleanup still needs the id
            outputs.write(output::CLUSTER_ID, &id)?;
            return Err(KubeError::CreatedWithErrors { id }.into());
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(cluster = %id, "created cluster");
    outputs.write(output::CLUSTER_ID, &id)?;

    let path = outputs.path(output::KUBECONFIG);
    println!(
        "{} Waiting for kubeconfig of cluster {}",
        style("→").blue().bold(),
        style(&id).cyan()
    );
    retry(policy, "kubeconfig available", || {
        kubeconfig_available(manager, &id, &path)
    })
    .await
    .map_err(|e| CliError::wait("kubeconfig", e))?;

    Ok(id)
}

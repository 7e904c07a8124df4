//! Kubernetes client construction and management-cluster lookups

use kube::api::{Api, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, GroupVersionKind};
use kube::{Client, Config};
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{KubeError, Result};

/// Label marking organizations allowed to own conformance-test clusters
pub const TEST_ORGANIZATION_LABEL: &str = "giantswarm.io/conformance-testing";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a client from a kubeconfig file
///
/// `context` selects a named context, otherwise the file's current context
/// is used.
pub async fn connect(kubeconfig: &Path, context: Option<&str>) -> Result<Client> {
    let kubeconfig_data = Kubeconfig::read_from(kubeconfig)?;
    let options = KubeConfigOptions {
        context: context.map(str::to_string),
        ..Default::default()
    };

    let mut config = Config::from_custom_kubeconfig(kubeconfig_data, &options).await?;
    config.connect_timeout = Some(CONNECT_TIMEOUT);

    tracing::debug!(
        kubeconfig = %kubeconfig.display(),
        context = context.unwrap_or("<current>"),
        cluster_url = %config.cluster_url,
        "connecting to cluster"
    );
    Ok(Client::try_from(config)?)
}

/// Path of the management-cluster kubeconfig for an installation
pub fn kubeconfig_path(base: &Path, installation: &str) -> PathBuf {
    base.join(installation)
}

/// Connect to an installation's management cluster
///
/// Uses the current context of `<base>/<installation>`. Only cleanup picks a
/// context from the provider config.
pub async fn connect_installation(base: &Path, installation: &str) -> Result<Client> {
    connect(&kubeconfig_path(base, installation), None).await
}

/// Names of the organizations eligible to own test clusters
pub async fn list_test_organizations(client: Client) -> Result<Vec<String>> {
    let gvk = GroupVersionKind::gvk("security.giantswarm.io", "v1alpha1", "Organization");
    let resource = ApiResource::from_gvk_with_plural(&gvk, "organizations");
    let api: Api<DynamicObject> = Api::all_with(client, &resource);

    let lp = ListParams::default().labels(&format!("{}=true", TEST_ORGANIZATION_LABEL));
    let list = api.list(&lp).await?;

    Ok(list
        .items
        .into_iter()
        .filter_map(|o| o.metadata.name)
        .collect())
}

/// Pick one organization at random
pub fn choose_owner(organizations: &[String]) -> Result<String> {
    organizations
        .choose(&mut rand::rng())
        .cloned()
        .ok_or_else(|| KubeError::NoOrganization {
            label: TEST_ORGANIZATION_LABEL.to_string(),
        })
}

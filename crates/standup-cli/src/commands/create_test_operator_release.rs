//! Create test-operator-release command - the latest release with a provider
//! operator build from a branch swapped in

use chrono::{DateTime, Utc};
use console::style;
use std::path::Path;

use standup_core::{
    ApplyReport, ComponentVersionResolver, ProjectFileResolver, ProviderConfig, REQUIREMENTS_FILE,
    Release, ReleaseState, Requirements, find_latest_release,
};
use standup_kube::poll::policy;
use standup_kube::{KubeReleaseStore, connect_installation};

use super::{prepare_for_test, submit_release};
use crate::error::{CliError, Result};
use crate::git;
use crate::output::{self, OutputDir};

/// Catalog holding operator builds from branches
pub const TEST_CATALOG: &str = "control-plane-test-catalog";

const SUPPORTED_PROVIDERS: &[&str] = &["aws", "azure"];

/// Run the create test-operator-release command
pub async fn run(
    config: &Path,
    kubeconfig: &Path,
    operator_path: &Path,
    output: &Path,
    provider: &str,
    releases_path: &Path,
) -> Result<()> {
    if !SUPPORTED_PROVIDERS.contains(&provider) {
        return Err(CliError::input_with_help(
            format!("unsupported provider '{}'", provider),
            format!("supported providers are {}", SUPPORTED_PROVIDERS.join(", ")),
        ));
    }
    let outputs = OutputDir::new(output);

    let manifest = find_latest_release(releases_path, provider)?;
    let mut release = Release::load(&manifest)?;
    println!(
        "{} Latest {} release is {}",
        style("→").blue().bold(),
        style(provider).cyan(),
        style(release.name()).yellow()
    );

    let requirements = Requirements::load(releases_path.join(provider).join(REQUIREMENTS_FILE))?;
    let report = apply_requirements(&mut release, &requirements)?;
    for bump in &report.bumped {
        println!(
            "  {} {} {} → {}",
            style("↑").green(),
            bump.name,
            style(&bump.from).dim(),
            style(&bump.to).green()
        );
    }
    for name in &report.unmatched {
        println!("  {} {} is not part of the release, skipped", style("⚠").yellow(), name);
    }

    let head = git::head_sha(operator_path).await?;
    let version = ProjectFileResolver::default().resolve(operator_path)?;
    build_test_release(&mut release, provider, &version, &head, Utc::now())?;

    let original = release.name().to_string();
    prepare_for_test(&mut release);
    println!(
        "{} Testing {}-operator {} ({}) on {} as {}",
        style("→").blue().bold(),
        provider,
        style(&version).yellow(),
        style(&head).dim(),
        style(&original).yellow(),
        style(release.name()).cyan()
    );

    // create cluster and cleanup read the same entry
    ProviderConfig::load(config, provider)?;
    let client = connect_installation(kubeconfig, provider).await?;
    let store = KubeReleaseStore::new(client);

    outputs.write(output::PROVIDER, provider)?;
    outputs.write(output::INSTALLATION, provider)?;

    submit_release(&store, &release, &outputs, &policy::UNBOUNDED).await
}

/// Raise app and component versions to what the requirements ask for
fn apply_requirements(release: &mut Release, requirements: &Requirements) -> Result<ApplyReport> {
    let target = release.version()?;
    let merged = requirements.merge(&target);
    Ok(merged.apply(release)?)
}

/// Swap in the operator build and mark the release as work in progress
fn build_test_release(
    release: &mut Release,
    provider: &str,
    version: &str,
    head: &str,
    now: DateTime<Utc>,
) -> Result<()> {
    let operator = format!("{}-operator", provider);
    release.override_component(&operator, version, TEST_CATALOG, head)?;
    release.spec.date = Some(now);
    release.spec.state = ReleaseState::Wip;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const MANIFEST: &str = r#"
apiVersion: release.giantswarm.io/v1alpha1
kind: Release
metadata:
  name: v13.0.0
spec:
  apps:
  - name: coredns
    version: 1.2.0
  components:
  - name: aws-operator
    version: 9.0.0
  - name: cert-operator
    version: 0.1.0
  date: "2020-09-01T10:00:00Z"
  state: active
"#;

    const REQUESTS: &str = r#"
releases:
  - name: ">= 13.0.0"
    requests:
      - name: coredns
        version: ">= 1.3.0"
      - name: cert-operator
        version: ">= 0.1.0"
  - name: "< 13.0.0"
    requests:
      - name: coredns
        version: ">= 2.0.0"
"#;

    #[test]
    fn test_apply_requirements() {
        let mut release = Release::from_yaml(MANIFEST).unwrap();
        let requirements = Requirements::from_yaml(REQUESTS).unwrap();

        let report = apply_requirements(&mut release, &requirements).unwrap();

        assert_eq!(report.bumped.len(), 1);
        assert_eq!(report.bumped[0].name, "coredns");
        assert_eq!(release.spec.apps[0].version, "1.3.0");
        assert_eq!(release.component("cert-operator").unwrap().version, "0.1.0");
    }

    #[test]
    fn test_build_test_release() {
        let mut release = Release::from_yaml(MANIFEST).unwrap();
        let now = Utc.with_ymd_and_hms(2020, 10, 6, 12, 0, 0).unwrap();

        build_test_release(&mut release, "aws", "9.1.0-dev", "abc123", now).unwrap();

        let operator = release.component("aws-operator").unwrap();
        assert_eq!(operator.version, "9.1.0-dev");
        assert_eq!(operator.catalog.as_deref(), Some(TEST_CATALOG));
        assert_eq!(operator.reference.as_deref(), Some("9.0.0-abc123"));
        assert_eq!(release.spec.date, Some(now));
        assert_eq!(release.spec.state, ReleaseState::Wip);
    }

    #[test]
    fn test_build_test_release_without_operator() {
        let mut release = Release::from_yaml(MANIFEST).unwrap();
        let err = build_test_release(&mut release, "azure", "1.0.0", "abc123", Utc::now())
            .unwrap_err();
        assert!(matches!(err, CliError::Release { .. }));
    }
}

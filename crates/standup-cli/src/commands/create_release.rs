//! Create release command - submit the release added on this branch

use console::style;
use std::path::Path;

use standup_core::{ProviderConfig, Release, locate_release_in_diff};
use standup_kube::poll::policy;
use standup_kube::{KubeReleaseStore, connect_installation};

use super::{prepare_for_test, provider_table, submit_release};
use crate::error::Result;
use crate::git;
use crate::output::{self, OutputDir};

/// Run the create release command
pub async fn run(
    config: &Path,
    kubeconfig: &Path,
    output: &Path,
    releases: &Path,
    pipeline: Option<&str>,
    routes: &[String],
) -> Result<()> {
    let table = provider_table(routes)?;
    let outputs = OutputDir::new(output);

    println!("{} Determining release to test", style("→").blue().bold());

    // CI checks out a single commit, so main has to be fetched before diffing
    git::fetch_main(releases).await?;
    let base = git::merge_base(releases).await?;
    let diff = git::added_files(releases, &base).await?;
    let added = locate_release_in_diff(&diff)?;

    let manifest = releases.join(&added.path);
    tracing::info!(path = %manifest.display(), "found release under test");

    let mut release = Release::load(&manifest)?;
    let original = release.name().to_string();
    prepare_for_test(&mut release);

    let installation = table.installation_for(pipeline, &added.provider).to_string();
    println!(
        "{} Testing release {} for {} as {} on {}",
        style("→").blue().bold(),
        style(original.trim_start_matches('v')).yellow(),
        style(&added.provider).cyan(),
        style(release.name().trim_start_matches('v')).yellow(),
        style(&installation).cyan()
    );

    // create cluster and cleanup read the same entry
    ProviderConfig::load(config, &added.provider)?;
    let client = connect_installation(kubeconfig, &installation).await?;
    let store = KubeReleaseStore::new(client);

    outputs.write(output::PROVIDER, &added.provider)?;
    outputs.write(output::INSTALLATION, &installation)?;

    submit_release(&store, &release, &outputs, &policy::UNBOUNDED).await
}

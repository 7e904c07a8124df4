//! CLI commands

pub mod cleanup;
pub mod create_cluster;
pub mod create_release;
pub mod create_test_operator_release;
pub mod locate_release;
pub mod wait;

use console::style;
use standup_core::{ProviderTable, Release, generate_release_name};
use standup_kube::poll::RetryPolicy;
use standup_kube::readiness::release_ready;
use standup_kube::{ReleaseStore, retry};

use crate::error::{CliError, Result};
use crate::output::{self, OutputDir};

/// Provider table with `PIPELINE=INSTALLATION` routes added
pub(crate) fn provider_table(routes: &[String]) -> Result<ProviderTable> {
    let mut table = ProviderTable::standard();
    for route in routes {
        let Some((pipeline, installation)) = route.split_once('=') else {
            return Err(CliError::input_with_help(
                format!("invalid pipeline route '{}'", route),
                "use PIPELINE=INSTALLATION, e.g. --route aws-nightly=ghost",
            ));
        };
        table = table.with_pipeline(pipeline.trim(), installation.trim());
    }
    Ok(table)
}

/// Give the release a unique name and label it for garbage collection
pub(crate) fn prepare_for_test(release: &mut Release) {
    let original = release.name().to_string();
    release.metadata.name = generate_release_name(&original);
    release.mark_for_testing();

    tracing::info!(original = %original, name = release.name(), "renamed release for testing");
}

/// Create the release CR, record its name and wait until it is ready
pub(crate) async fn submit_release<S: ReleaseStore + ?Sized>(
    store: &S,
    release: &Release,
    outputs: &OutputDir,
    policy: &RetryPolicy,
) -> Result<()> {
    println!(
        "{} Creating release {}",
        style("→").blue().bold(),
        style(release.name()).cyan()
    );
    store.create(release).await?;
    outputs.write(output::RELEASE_ID, release.name())?;

    println!("{} Waiting for release to be ready", style("→").blue().bold());
    retry(policy, "release ready", || release_ready(store, release.name()))
        .await
        .map_err(|e| CliError::wait("release", e))?;

    println!(
        "{} Release {} is ready",
        style("✓").green().bold(),
        style(release.name()).cyan()
    );
    Ok(())
}

//! standup - Stand up and tear down tenant clusters for release conformance testing

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;
mod git;
mod output;

#[derive(Parser)]
#[command(name = "standup")]
#[command(author = "Giant Swarm")]
#[command(version)]
#[command(about = "Stand up and tear down tenant clusters for release conformance testing", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a release or a cluster under test
    #[command(subcommand)]
    Create(CreateCommands),

    /// Wait for a tenant cluster to be ready for tests
    Wait {
        /// Path to the tenant cluster kubeconfig
        #[arg(short, long)]
        kubeconfig: PathBuf,

        /// Provider of the management cluster
        #[arg(short, long)]
        provider: String,

        /// Number of ready nodes to wait for
        #[arg(long, default_value_t = 2)]
        nodes: usize,

        /// Number of deployed charts to wait for
        #[arg(long, default_value_t = 1)]
        charts: usize,
    },

    /// Delete a test cluster and the release it was created with
    Cleanup {
        /// Provider config file with endpoints and credentials
        #[arg(short = 'g', long)]
        config: PathBuf,

        /// Path to the management cluster kubeconfig
        #[arg(short, long)]
        kubeconfig: PathBuf,

        /// Provider of the management cluster
        #[arg(short, long)]
        provider: String,

        /// ID of the cluster to delete
        #[arg(short, long = "cluster-id", alias = "cluster")]
        cluster_id: String,
    },

    /// Print the release a `git diff --name-status` adds
    LocateRelease {
        /// Diff file, `-` for stdin
        diff: PathBuf,
    },
}

#[derive(Subcommand)]
enum CreateCommands {
    /// Submit the release added on the current branch
    Release {
        /// Provider config file with endpoints and credentials
        #[arg(short = 'g', long)]
        config: PathBuf,

        /// Directory holding one kubeconfig per installation
        #[arg(short, long)]
        kubeconfig: PathBuf,

        /// Directory for the provider, installation and release-id files
        #[arg(long)]
        output: PathBuf,

        /// Local checkout of the releases repository
        #[arg(short = 's', long)]
        releases: PathBuf,

        /// Pipeline standup is running in
        #[arg(short = 't', long, env = "STANDUP_PIPELINE")]
        pipeline: Option<String>,

        /// Route a pipeline to an installation (PIPELINE=INSTALLATION)
        #[arg(long = "route")]
        routes: Vec<String>,
    },

    /// Submit the latest release with a provider operator build swapped in
    TestOperatorRelease {
        /// Provider config file with endpoints and credentials
        #[arg(short = 'g', long)]
        config: PathBuf,

        /// Directory holding one kubeconfig per installation
        #[arg(short, long)]
        kubeconfig: PathBuf,

        /// Local checkout of the provider operator
        #[arg(long)]
        operator_path: PathBuf,

        /// Directory for the provider, installation and release-id files
        #[arg(long)]
        output: PathBuf,

        /// Provider to build the release for (aws or azure)
        #[arg(long)]
        provider: String,

        /// Local checkout of the releases repository
        #[arg(long)]
        releases_path: PathBuf,
    },

    /// Create a tenant cluster running the release under test
    Cluster {
        /// Provider config file with endpoints and credentials
        #[arg(short = 'g', long)]
        config: PathBuf,

        /// Directory holding one kubeconfig per installation
        #[arg(short, long)]
        kubeconfig: PathBuf,

        /// Directory holding the release outputs; cluster-id and kubeconfig are added
        #[arg(long)]
        output: PathBuf,

        /// Provider (default: read from the output directory)
        #[arg(short, long)]
        provider: Option<String>,

        /// Installation (default: read from the output directory)
        #[arg(short, long)]
        installation: Option<String>,

        /// Release version (default: read from the output directory)
        #[arg(short, long)]
        release: Option<String>,

        /// Owning organization (default: a random conformance-testing organization)
        #[arg(long)]
        owner: Option<String>,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli.command) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn run(command: Commands) -> error::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| error::CliError::Other {
            message: format!("failed to start async runtime: {}", e),
        })?;

    runtime.block_on(dispatch(command))
}

async fn dispatch(command: Commands) -> error::Result<()> {
    match command {
        Commands::Create(CreateCommands::Release {
            config,
            kubeconfig,
            output,
            releases,
            pipeline,
            routes,
        }) => {
            commands::create_release::run(
                &config,
                &kubeconfig,
                &output,
                &releases,
                pipeline.as_deref(),
                &routes,
            )
            .await
        }

        Commands::Create(CreateCommands::TestOperatorRelease {
            config,
            kubeconfig,
            operator_path,
            output,
            provider,
            releases_path,
        }) => {
            commands::create_test_operator_release::run(
                &config,
                &kubeconfig,
                &operator_path,
                &output,
                &provider,
                &releases_path,
            )
            .await
        }

        Commands::Create(CreateCommands::Cluster {
            config,
            kubeconfig,
            output,
            provider,
            installation,
            release,
            owner,
        }) => {
            commands::create_cluster::run(
                &config,
                &kubeconfig,
                &output,
                provider.as_deref(),
                installation.as_deref(),
                release.as_deref(),
                owner.as_deref(),
            )
            .await
        }

        Commands::Wait {
            kubeconfig,
            provider,
            nodes,
            charts,
        } => commands::wait::run(&kubeconfig, &provider, nodes, charts).await,

        Commands::Cleanup {
            config,
            kubeconfig,
            provider,
            cluster_id,
        } => commands::cleanup::run(&config, &kubeconfig, &provider, &cluster_id).await,

        Commands::LocateRelease { diff } => commands::locate_release::run(&diff),
    }
}

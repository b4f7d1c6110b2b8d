//! geist-operator binary

use clap::{Parser, Subcommand};
use kube::{Client, CustomResourceExt};

use geist_common::crd::GeistConnector;
use geist_common::telemetry::{init_telemetry, TelemetryConfig};
use geist_operator::runner::{build_connector_controller, ensure_crds_installed};

/// Geist operator - deploys GeistConnector resources as connector workloads
#[derive(Parser, Debug)]
#[command(name = "geist-operator", version, about, long_about = None)]
struct Cli {
    /// Print the GeistConnector CRD as YAML and exit
    #[arg(long)]
    crd: bool,

    /// Only watch connectors in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    watch_namespace: Option<String>,

    /// Skip CRD installation at startup
    #[arg(long, env = "SKIP_CRD_INSTALL", default_value_t = false)]
    skip_crd_install: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run as controller (default mode)
    Controller,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if cli.crd {
        print!("{}", serde_yaml::to_string(&GeistConnector::crd())?);
        return Ok(());
    }

    init_telemetry(TelemetryConfig::for_service("geist-operator"))?;

    match cli.command.unwrap_or(Commands::Controller) {
        Commands::Controller => run_controller(cli.watch_namespace, cli.skip_crd_install).await,
    }
}

async fn run_controller(namespace: Option<String>, skip_crd_install: bool) -> anyhow::Result<()> {
    let client = Client::try_default()
        .await
        .map_err(|e| anyhow::anyhow!("failed to create Kubernetes client: {}", e))?;

    if skip_crd_install {
        tracing::info!("Skipping CRD installation");
    } else {
        ensure_crds_installed(&client)
            .await
            .map_err(|e| anyhow::anyhow!("failed to install CRDs: {}", e))?;
    }

    tracing::info!("Starting Geist controllers");
    build_connector_controller(client, namespace).await;
    tracing::info!("Controller shut down");
    Ok(())
}

//! geist-discovery binary

use std::sync::Arc;

use clap::Parser;

use geist_common::telemetry::{init_telemetry, TelemetryConfig};
use geist_discovery::auth::TokenVerifier;
use geist_discovery::config::DiscoveryConfig;
use geist_discovery::kube_client::{create_client, KubeConnectorSource};
use geist_discovery::server::{serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = DiscoveryConfig::parse();

    init_telemetry(TelemetryConfig::for_service("geist-discovery"))?;

    let addr = config.bind_addr().await?;
    let verifier = TokenVerifier::from_config(&config)
        .await
        .map_err(|e| anyhow::anyhow!("failed to set up token verification: {}", e))?;
    tracing::info!(verifier = ?verifier, "Token verification ready");

    let client = create_client(config.debug)
        .await
        .map_err(|e| anyhow::anyhow!("failed to reach Kubernetes: {}", e))?;

    let state = AppState {
        verifier: Arc::new(verifier),
        source: Arc::new(KubeConnectorSource::new(client)),
        namespace: config.namespace,
    };
    serve(addr, state).await?;
    Ok(())
}

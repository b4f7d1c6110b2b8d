//! Kubernetes access for the discovery API

use std::time::Duration;

use async_trait::async_trait;
use kube::api::ListParams;
use kube::config::KubeConfigOptions;
use kube::{Api, Client, Config};
use tracing::{debug, info};

use geist_common::crd::GeistConnector;

use crate::error::{Error, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a client and check the API server answers
///
/// With `debug` set the local kubeconfig is used, otherwise the pod's
/// service account.
pub async fn create_client(debug: bool) -> Result<Client> {
    let mut config = if debug {
        Config::from_kubeconfig(&KubeConfigOptions::default())
            .await
            .map_err(|e| Error::Config(format!("failed to load kubeconfig: {e}")))?
    } else {
        Config::incluster().map_err(|e| Error::Config(format!("failed to load in-cluster config: {e}")))?
    };
    config.connect_timeout = Some(CONNECT_TIMEOUT);
    config.read_timeout = Some(READ_TIMEOUT);

    let client = Client::try_from(config)?;
    let version = client.apiserver_version().await?;
    let debug_mode = debug;
    info!(version = %version.git_version, debug = debug_mode, "Connected to API server");
    Ok(client)
}

/// Read access to connectors and cluster metadata
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectorSource: Send + Sync {
    /// All connectors in `namespace`, as stored
    async fn list_connectors(&self, namespace: &str) -> Result<Vec<GeistConnector>>;

    /// API server version as `major.minor`
    async fn server_version(&self) -> Result<String>;
}

/// [`ConnectorSource`] backed by the API server
pub struct KubeConnectorSource {
    client: Client,
}

impl KubeConnectorSource {
    /// Wrap a client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConnectorSource for KubeConnectorSource {
    async fn list_connectors(&self, namespace: &str) -> Result<Vec<GeistConnector>> {
        let api: Api<GeistConnector> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!(namespace, count = list.items.len(), "listed connectors");

        Ok(list.items)
    }

    async fn server_version(&self) -> Result<String> {
        let info = self.client.apiserver_version().await?;
        Ok(format!("{}.{}", info.major, info.minor))
    }
}

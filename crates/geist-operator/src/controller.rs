//! GeistConnector reconciliation
//!
//! Every attempt is level-triggered: fetch the connector, build each child
//! from scratch, create whatever is missing. Order is ConfigMap, then the
//! certificate Secret when the connector manages its own certificate, then
//! the Deployment.
//!
//! Existing children are never updated or deleted. A drifted ConfigMap
//! stays drifted until someone deletes it; the next reconcile recreates it.
//! Deletion of children is left to the garbage collector.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, info, instrument, warn};

use geist_common::crd::GeistConnector;
use geist_common::{Error, Result};

use crate::builders::{
    build_config_map, build_deployment, build_secret, ChildKind, ChildNames, ChildObject,
};
use crate::ownership::is_controlled_by;

/// Requeue delay after a retryable failure
pub const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Result of a create call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The object was created
    Created,
    /// Someone else created it first
    AlreadyExists,
}

/// Kubernetes operations the reconciler needs
///
/// Only reads and creates. The reconciler never updates or deletes.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ConnectorKubeClient: Send + Sync {
    /// Fetch a connector, `None` if it no longer exists
    async fn get_connector(&self, namespace: &str, name: &str) -> Result<Option<GeistConnector>>;

    /// Fetch a child's metadata, `None` if it does not exist
    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>>;

    /// Create a child object
    async fn create_child(&self, namespace: &str, child: &ChildObject) -> Result<CreateOutcome>;
}

/// Real Kubernetes client implementation
pub struct ConnectorKubeClientImpl {
    client: Client,
}

impl ConnectorKubeClientImpl {
    /// Create a new client wrapper
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConnectorKubeClient for ConnectorKubeClientImpl {
    async fn get_connector(&self, namespace: &str, name: &str) -> Result<Option<GeistConnector>> {
        let api: Api<GeistConnector> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ObjectMeta>> {
        let client = self.client.clone();
        let meta = match kind {
            ChildKind::ConfigMap => Api::<ConfigMap>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|o| o.metadata),
            ChildKind::Secret => Api::<Secret>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|o| o.metadata),
            ChildKind::Deployment => Api::<Deployment>::namespaced(client, namespace)
                .get_opt(name)
                .await?
                .map(|o| o.metadata),
        };
        Ok(meta)
    }

    async fn create_child(&self, namespace: &str, child: &ChildObject) -> Result<CreateOutcome> {
        let client = self.client.clone();
        let pp = PostParams::default();
        let result = match child {
            ChildObject::ConfigMap(o) => Api::<ConfigMap>::namespaced(client, namespace)
                .create(&pp, o)
                .await
                .map(|_| ()),
            ChildObject::Secret(o) => Api::<Secret>::namespaced(client, namespace)
                .create(&pp, o)
                .await
                .map(|_| ()),
            ChildObject::Deployment(o) => Api::<Deployment>::namespaced(client, namespace)
                .create(&pp, o)
                .await
                .map(|_| ()),
        };
        match result {
            Ok(()) => Ok(CreateOutcome::Created),
            Err(kube::Error::Api(ae)) if ae.code == 409 => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(e.into()),
        }
    }
}

/// Controller context shared by reconcile attempts
pub struct Context {
    /// Kubernetes client for API operations (trait object for testability)
    pub kube: Arc<dyn ConnectorKubeClient>,
}

impl Context {
    /// Create a context backed by a real client
    pub fn new(client: Client) -> Self {
        Self {
            kube: Arc::new(ConnectorKubeClientImpl::new(client)),
        }
    }

    /// Create a context around any client implementation
    pub fn with_client(kube: Arc<dyn ConnectorKubeClient>) -> Self {
        Self { kube }
    }
}

/// Reconcile a GeistConnector
#[instrument(skip(connector, ctx), fields(connector = %connector.name_any()))]
pub async fn reconcile(connector: Arc<GeistConnector>, ctx: Arc<Context>) -> Result<Action> {
    let name = connector.name_any();
    let namespace = connector
        .namespace()
        .ok_or_else(|| Error::validation_for(&name, "GeistConnector must be namespaced"))?;

    let Some(current) = ctx.kube.get_connector(&namespace, &name).await? else {
        info!("GeistConnector not found, must have been deleted");
        return Ok(Action::await_change());
    };

    let names = ChildNames::for_connector(&name);
    let certificates = current.certificate_source();
    debug!(%certificates, "certificate source");

    let config_map = ChildObject::ConfigMap(build_config_map(&current)?);
    converge(&current, &namespace, config_map, ctx.as_ref()).await?;

    if certificates.needs_secret() {
        let secret = ChildObject::Secret(build_secret(&current)?);
        converge(&current, &namespace, secret, ctx.as_ref()).await?;
    }

    let deployment = ChildObject::Deployment(build_deployment(&current, certificates)?);
    converge(&current, &namespace, deployment, ctx.as_ref()).await?;

    info!(deployment = %names.deployment, "GeistConnector reconciled");
    Ok(Action::await_change())
}

/// Create `child` unless an object with its name already exists.
async fn converge(
    connector: &GeistConnector,
    namespace: &str,
    child: ChildObject,
    ctx: &Context,
) -> Result<()> {
    let kind = child.kind();
    let child_name = child.name().to_string();

    if let Some(existing) = ctx.kube.get_child(kind, namespace, &child_name).await? {
        if !is_controlled_by(&existing, connector) {
            warn!(%kind, child = %child_name, "child exists but is not controlled by this connector");
        }
        debug!(%kind, child = %child_name, "child already exists");
        return Ok(());
    }

    info!(%kind, child = %child_name, "creating child");
    match ctx.kube.create_child(namespace, &child).await? {
        CreateOutcome::Created => {}
        CreateOutcome::AlreadyExists => {
            debug!(%kind, child = %child_name, "child created concurrently");
        }
    }
    Ok(())
}

/// Error policy for the GeistConnector controller
///
/// Transient failures requeue after [`RETRY_DELAY`]. Misconfiguration waits
/// for the connector to change.
pub fn error_policy(connector: Arc<GeistConnector>, error: &Error, _ctx: Arc<Context>) -> Action {
    if error.is_retryable() {
        warn!(
            error = %error,
            connector = %connector.name_any(),
            "reconciliation failed, will retry"
        );
        Action::requeue(RETRY_DELAY)
    } else {
        error!(
            error = %error,
            connector = %connector.name_any(),
            "reconciliation failed, waiting for spec change"
        );
        Action::await_change()
    }
}

//! Controller runner: CRD installation and the GeistConnector controller future

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Patch, PatchParams};
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, CustomResourceExt, Resource};
use serde::de::DeserializeOwned;

use geist_common::crd::GeistConnector;
use geist_common::{Result, FIELD_MANAGER};

use crate::controller::{error_policy, reconcile, Context};

/// Watcher timeout (seconds), kept below the client read timeout so idle
/// watches are closed by the API server first.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Install or update the GeistConnector CRD with server-side apply
pub async fn ensure_crds_installed(client: &Client) -> Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let crd = GeistConnector::crd();
    let name = crd.metadata.name.clone().unwrap_or_default();

    tracing::info!(crd = %name, "Installing GeistConnector CRD...");
    crds.patch(&name, &params, &Patch::Apply(&crd)).await?;
    Ok(())
}

/// Build the GeistConnector controller future
///
/// Watches every namespace unless `namespace` is set. Owned ConfigMaps,
/// Secrets and Deployments are watched too so deleting a child triggers
/// a reconcile that recreates it.
pub fn build_connector_controller(
    client: Client,
    namespace: Option<String>,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(Context::new(client.clone()));
    let watcher = || WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS);

    match namespace.as_deref() {
        Some(ns) => tracing::info!(namespace = %ns, "- GeistConnector controller"),
        None => tracing::info!("- GeistConnector controller (all namespaces)"),
    }

    let connectors: Api<GeistConnector> = scoped_api(&client, namespace.as_deref());
    Box::pin(
        Controller::new(connectors, watcher())
            .owns(scoped_api::<ConfigMap>(&client, namespace.as_deref()), watcher())
            .owns(scoped_api::<Secret>(&client, namespace.as_deref()), watcher())
            .owns(scoped_api::<Deployment>(&client, namespace.as_deref()), watcher())
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("GeistConnector")),
    )
}

fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + std::fmt::Debug,
    <K as Resource>::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Creates a closure for logging reconciliation results.
///
/// Logs successful reconciliations at debug level and errors at error level.
pub fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(std::result::Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}

//! Shared helpers for kind integration tests

use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::Client;

use geist_operator::runner::ensure_crds_installed;

/// Namespace all integration fixtures live in
pub const TEST_NAMESPACE: &str = "geist-it";

/// Connect to the cluster, install the CRD and create the test namespace
pub async fn ensure_test_cluster() -> Client {
    let client = Client::try_default()
        .await
        .expect("kubeconfig must point at a test cluster");

    ensure_crds_installed(&client)
        .await
        .expect("CRD installation should succeed");
    // Give the API server a moment to publish the new resource
    tokio::time::sleep(Duration::from_secs(2)).await;

    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => {}
        Err(kube::Error::Api(ae)) if ae.code == 409 => {}
        Err(e) => panic!("failed to create namespace: {e}"),
    }
    client
}

/// Poll `check` until it returns true or `timeout` elapses
pub async fn wait_for<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    false
}

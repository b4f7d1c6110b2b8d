//! Integration tests for connector lifecycle
//!
//! A connector is reconciled against a real API server. The children it
//! produces are owned by it, and deleting it lets the garbage collector
//! remove them without the operator issuing a single delete.

use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, ResourceExt};

use geist_common::crd::{ConnectorSpec, DeploymentSpec, GeistConnector, GeistConnectorSpec};
use geist_operator::controller::{reconcile, Context};

use super::helpers::{ensure_test_cluster, wait_for, TEST_NAMESPACE};

fn self_managed_connector(name: &str) -> GeistConnector {
    let mut spec = ConnectorSpec::default();
    spec.opcua.connection.endpoint = "opc.tcp://plc-1".to_string();
    spec.opcua.connection.port = 4840;
    spec.opcua.connection.certificate.auto_create = false;
    spec.opcua.connection.certificate.certificate = "CERT".to_string();
    spec.opcua.connection.certificate.private_key = "KEY".to_string();
    spec.redpanda.brokers = vec!["redpanda:9092".to_string()];
    spec.redpanda.topic = "telemetry".to_string();

    let mut connector = GeistConnector::new(
        name,
        GeistConnectorSpec {
            connector_spec: spec,
            deployment_spec: DeploymentSpec::default(),
        },
    );
    connector.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    connector
}

async fn children_exist(client: &Client, name: &str) -> (bool, bool, bool) {
    let cms: Api<ConfigMap> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let secrets: Api<Secret> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    (
        cms.get_opt(&format!("{name}-config")).await.unwrap().is_some(),
        secrets.get_opt(&format!("{name}-secret")).await.unwrap().is_some(),
        deployments
            .get_opt(&format!("{name}-deployment"))
            .await
            .unwrap()
            .is_some(),
    )
}

/// Story: deleting a connector cascades to its children
#[tokio::test]
#[ignore = "requires a Kubernetes cluster"]
async fn story_deleting_connector_cascades_to_children() {
    let client = ensure_test_cluster().await;
    let connectors: Api<GeistConnector> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "cascade-test";

    let created = connectors
        .create(&PostParams::default(), &self_managed_connector(name))
        .await
        .expect("connector should be created");

    let ctx = Arc::new(Context::new(client.clone()));
    reconcile(Arc::new(created.clone()), ctx.clone())
        .await
        .expect("first reconcile should succeed");
    reconcile(Arc::new(created.clone()), ctx)
        .await
        .expect("second reconcile should be a no-op");

    assert_eq!(children_exist(&client, name).await, (true, true, true));

    let cm: Api<ConfigMap> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let owned = cm.get(&format!("{name}-config")).await.unwrap();
    let owner = &owned.owner_references()[0];
    assert_eq!(owner.uid, created.uid().unwrap());
    assert_eq!(owner.controller, Some(true));

    connectors
        .delete(name, &DeleteParams::foreground())
        .await
        .expect("connector should be deleted");

    let gone = wait_for(Duration::from_secs(60), || {
        let client = client.clone();
        async move { children_exist(&client, name).await == (false, false, false) }
    })
    .await;
    assert!(gone, "children should be garbage collected");
}

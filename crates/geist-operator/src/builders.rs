//! Desired state for a connector's child objects
//!
//! Pure functions from a [`GeistConnector`] to the ConfigMap, Secret and
//! Deployment the cluster should contain. Every object comes back with its
//! controller owner reference already attached.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, PodSpec, PodTemplateSpec, Secret,
    SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::ByteString;
use kube::ResourceExt;

use geist_common::crd::{CertificateSource, GeistConnector};
use geist_common::{Error, Result};

use crate::ownership::set_controller_reference;

/// ConfigMap key holding the serialized `connectorSpec`
pub const CONFIG_KEY: &str = "config.yaml";

/// Secret key holding the PEM certificate
pub const CERT_KEY: &str = "cert.pem";

/// Secret key holding the PEM private key
pub const PRIVATE_KEY_KEY: &str = "key.pem";

/// Name of the connector container
pub const CONTAINER_NAME: &str = "geist-connector";

/// Where the ConfigMap is mounted in the container
pub const CONFIG_MOUNT_PATH: &str = "/etc/config";

/// Where the certificate Secret is mounted in the container
pub const CERT_MOUNT_PATH: &str = "/app/certs";

/// Container port the connector serves health and metrics on
pub const HTTP_PORT: i32 = 8080;

/// Reserved label naming the workload kind
pub const NAME_LABEL: &str = "app.kubernetes.io/name";

/// Reserved label naming the connector instance
pub const INSTANCE_LABEL: &str = "app.kubernetes.io/instance";

const CONFIG_VOLUME: &str = "config-volume";
const CERT_VOLUME: &str = "certificates";

/// Canonical child object names for a connector
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChildNames {
    /// `<connector>-config`
    pub config_map: String,
    /// `<connector>-secret`
    pub secret: String,
    /// `<connector>-deployment`
    pub deployment: String,
}

impl ChildNames {
    /// Derive child names from the connector name
    pub fn for_connector(name: &str) -> Self {
        Self {
            config_map: format!("{name}-config"),
            secret: format!("{name}-secret"),
            deployment: format!("{name}-deployment"),
        }
    }
}

/// Kind of a child object
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChildKind {
    /// Connector configuration
    ConfigMap,
    /// Inline certificate material
    Secret,
    /// Connector workload
    Deployment,
}

impl std::fmt::Display for ChildKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigMap => write!(f, "ConfigMap"),
            Self::Secret => write!(f, "Secret"),
            Self::Deployment => write!(f, "Deployment"),
        }
    }
}

/// A built child object, ready to create
#[derive(Clone, Debug, PartialEq)]
pub enum ChildObject {
    /// See [`build_config_map`]
    ConfigMap(ConfigMap),
    /// See [`build_secret`]
    Secret(Secret),
    /// See [`build_deployment`]
    Deployment(Deployment),
}

impl ChildObject {
    /// Kind of this object
    pub fn kind(&self) -> ChildKind {
        match self {
            Self::ConfigMap(_) => ChildKind::ConfigMap,
            Self::Secret(_) => ChildKind::Secret,
            Self::Deployment(_) => ChildKind::Deployment,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ConfigMap(o) => &o.metadata,
            Self::Secret(o) => &o.metadata,
            Self::Deployment(o) => &o.metadata,
        }
    }

    /// Object name
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }
}

/// Map the declared pull policy onto the container pull policy.
///
/// Only `IfNotPresent` is passed through. Everything else, `Never`
/// included, pulls every time.
pub fn pull_policy(declared: &str) -> &'static str {
    match declared {
        "IfNotPresent" => "IfNotPresent",
        _ => "Always",
    }
}

/// Build the ConfigMap carrying the connector's `connectorSpec` as JSON
pub fn build_config_map(connector: &GeistConnector) -> Result<ConfigMap> {
    let names = ChildNames::for_connector(&connector.name_any());
    let config = serde_json::to_string(&connector.spec.connector_spec)
        .map_err(|e| Error::serialization_for(ChildKind::ConfigMap.to_string(), e.to_string()))?;

    let labels = connector.spec.deployment_spec.custom_labels.clone();
    let metadata = child_metadata(connector, names.config_map, labels, BTreeMap::new())?;

    Ok(ConfigMap {
        metadata,
        data: Some(BTreeMap::from([(CONFIG_KEY.to_string(), config)])),
        ..Default::default()
    })
}

/// Build the Secret carrying the inline certificate and private key
pub fn build_secret(connector: &GeistConnector) -> Result<Secret> {
    let names = ChildNames::for_connector(&connector.name_any());
    let certificate = &connector.spec.connector_spec.opcua.connection.certificate;
    let deployment = &connector.spec.deployment_spec;

    let metadata = child_metadata(
        connector,
        names.secret,
        deployment.custom_labels.clone(),
        deployment.custom_annotations.clone(),
    )?;

    Ok(Secret {
        metadata,
        data: Some(BTreeMap::from([
            (
                CERT_KEY.to_string(),
                ByteString(certificate.certificate.as_bytes().to_vec()),
            ),
            (
                PRIVATE_KEY_KEY.to_string(),
                ByteString(certificate.private_key.as_bytes().to_vec()),
            ),
        ])),
        ..Default::default()
    })
}

/// Build the single-replica connector Deployment
///
/// The certificate volume is mounted only for [`CertificateSource::SelfManaged`].
pub fn build_deployment(
    connector: &GeistConnector,
    certificates: CertificateSource,
) -> Result<Deployment> {
    let name = connector.name_any();
    let names = ChildNames::for_connector(&name);
    let spec = &connector.spec.deployment_spec;

    let mut labels = spec.custom_labels.clone();
    labels.insert(NAME_LABEL.to_string(), CONTAINER_NAME.to_string());
    labels.insert(INSTANCE_LABEL.to_string(), name);

    let mut volumes = vec![Volume {
        name: CONFIG_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: names.config_map.clone(),
            ..Default::default()
        }),
        ..Default::default()
    }];
    let mut volume_mounts = vec![VolumeMount {
        name: CONFIG_VOLUME.to_string(),
        mount_path: CONFIG_MOUNT_PATH.to_string(),
        ..Default::default()
    }];

    if certificates.needs_secret() {
        volumes.push(Volume {
            name: CERT_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(names.secret.clone()),
                ..Default::default()
            }),
            ..Default::default()
        });
        volume_mounts.push(VolumeMount {
            name: CERT_VOLUME.to_string(),
            mount_path: CERT_MOUNT_PATH.to_string(),
            ..Default::default()
        });
    }

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(spec.image()),
        image_pull_policy: Some(pull_policy(&spec.pull_policy).to_string()),
        ports: Some(vec![ContainerPort {
            container_port: HTTP_PORT,
            name: Some("http".to_string()),
            ..Default::default()
        }]),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    let metadata = child_metadata(
        connector,
        names.deployment,
        labels.clone(),
        spec.custom_annotations.clone(),
    )?;

    Ok(Deployment {
        metadata,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Metadata shared by all children: same namespace as the connector,
/// optional labels and annotations, controller reference attached.
fn child_metadata(
    connector: &GeistConnector,
    name: String,
    labels: BTreeMap<String, String>,
    annotations: BTreeMap<String, String>,
) -> Result<ObjectMeta> {
    let namespace = connector.namespace().ok_or_else(|| {
        Error::validation_for(connector.name_any(), "GeistConnector must be namespaced")
    })?;

    let mut metadata = ObjectMeta {
        name: Some(name),
        namespace: Some(namespace),
        labels: (!labels.is_empty()).then_some(labels),
        annotations: (!annotations.is_empty()).then_some(annotations),
        ..Default::default()
    };
    set_controller_reference(connector, &mut metadata)?;
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geist_common::crd::{ConnectorSpec, DeploymentSpec as ConnectorDeploymentSpec, GeistConnectorSpec};
    use rstest::rstest;

    fn sample_connector(name: &str) -> GeistConnector {
        let mut spec = ConnectorSpec::default();
        spec.opcua.connection.endpoint = "opc.tcp://plc-1".to_string();
        spec.opcua.connection.port = 4840;
        spec.redpanda.brokers = vec!["rp-0:9092".to_string()];
        spec.redpanda.topic = "telemetry".to_string();

        let mut connector = GeistConnector::new(
            name,
            GeistConnectorSpec {
                connector_spec: spec,
                deployment_spec: ConnectorDeploymentSpec::default(),
            },
        );
        connector.metadata.namespace = Some("geist".to_string());
        connector.metadata.uid = Some(format!("uid-{name}"));
        connector
    }

    fn self_managed(name: &str) -> GeistConnector {
        let mut connector = sample_connector(name);
        let cert = &mut connector.spec.connector_spec.opcua.connection.certificate;
        cert.auto_create = false;
        cert.external_certificate = false;
        cert.certificate = "CERT-PEM".to_string();
        cert.private_key = "KEY-PEM".to_string();
        connector
    }

    fn container(deployment: &Deployment) -> &Container {
        &deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    fn volumes(deployment: &Deployment) -> &[Volume] {
        deployment
            .spec
            .as_ref()
            .unwrap()
            .template
            .spec
            .as_ref()
            .unwrap()
            .volumes
            .as_deref()
            .unwrap()
    }

    #[test]
    fn child_names_follow_the_connector() {
        let names = ChildNames::for_connector("press-line-1");
        assert_eq!(names.config_map, "press-line-1-config");
        assert_eq!(names.secret, "press-line-1-secret");
        assert_eq!(names.deployment, "press-line-1-deployment");
    }

    #[rstest]
    #[case::if_not_present("IfNotPresent", "IfNotPresent")]
    #[case::always("Always", "Always")]
    #[case::never_still_pulls("Never", "Always")]
    #[case::unrecognized("sometimes", "Always")]
    #[case::empty("", "Always")]
    fn pull_policy_mapping(#[case] declared: &str, #[case] expected: &str) {
        assert_eq!(pull_policy(declared), expected);

        let mut connector = sample_connector("press-line-1");
        connector.spec.deployment_spec.pull_policy = declared.to_string();
        let deployment = build_deployment(&connector, CertificateSource::AutoCreated).unwrap();
        assert_eq!(container(&deployment).image_pull_policy.as_deref(), Some(expected));
    }

    mod config_map {
        use super::*;

        #[test]
        fn carries_connector_spec_as_json() {
            let connector = sample_connector("press-line-1");
            let cm = build_config_map(&connector).unwrap();

            assert_eq!(cm.metadata.name.as_deref(), Some("press-line-1-config"));
            assert_eq!(cm.metadata.namespace.as_deref(), Some("geist"));

            let data = cm.data.unwrap();
            assert_eq!(data.len(), 1);
            let parsed: ConnectorSpec = serde_json::from_str(&data[CONFIG_KEY]).unwrap();
            assert_eq!(parsed, connector.spec.connector_spec);
        }

        #[test]
        fn uses_custom_labels_only() {
            let mut connector = sample_connector("press-line-1");
            connector
                .spec
                .deployment_spec
                .custom_labels
                .insert("site".to_string(), "berlin".to_string());
            connector
                .spec
                .deployment_spec
                .custom_annotations
                .insert("team".to_string(), "ot".to_string());

            let cm = build_config_map(&connector).unwrap();
            let labels = cm.metadata.labels.unwrap();
            assert_eq!(labels.len(), 1);
            assert_eq!(labels["site"], "berlin");
            assert!(cm.metadata.annotations.is_none());
        }

        #[test]
        fn is_owned_by_the_connector() {
            let connector = sample_connector("press-line-1");
            let cm = build_config_map(&connector).unwrap();
            let refs = cm.metadata.owner_references.unwrap();
            assert_eq!(refs.len(), 1);
            assert_eq!(refs[0].name, "press-line-1");
            assert_eq!(refs[0].uid, "uid-press-line-1");
            assert_eq!(refs[0].controller, Some(true));
        }

        #[test]
        fn requires_a_namespace() {
            let mut connector = sample_connector("press-line-1");
            connector.metadata.namespace = None;
            let err = build_config_map(&connector).unwrap_err();
            assert!(matches!(err, Error::Validation { .. }));
        }
    }

    mod secret {
        use super::*;

        #[test]
        fn holds_exactly_the_two_pem_records() {
            let connector = self_managed("press-line-1");
            let secret = build_secret(&connector).unwrap();

            assert_eq!(secret.metadata.name.as_deref(), Some("press-line-1-secret"));
            let data = secret.data.unwrap();
            assert_eq!(data.len(), 2);
            assert_eq!(data[CERT_KEY].0, b"CERT-PEM".to_vec());
            assert_eq!(data[PRIVATE_KEY_KEY].0, b"KEY-PEM".to_vec());
            assert_eq!(secret.metadata.owner_references.unwrap().len(), 1);
        }

        #[test]
        fn copies_labels_and_annotations() {
            let mut connector = self_managed("press-line-1");
            connector
                .spec
                .deployment_spec
                .custom_annotations
                .insert("team".to_string(), "ot".to_string());
            let secret = build_secret(&connector).unwrap();
            assert_eq!(secret.metadata.annotations.unwrap()["team"], "ot");
            assert!(secret.metadata.labels.is_none());
        }
    }

    mod deployment {
        use super::*;

        #[test]
        fn single_replica_with_config_volume() {
            let connector = sample_connector("press-line-1");
            let deployment = build_deployment(&connector, CertificateSource::AutoCreated).unwrap();

            assert_eq!(
                deployment.metadata.name.as_deref(),
                Some("press-line-1-deployment")
            );
            assert_eq!(deployment.spec.as_ref().unwrap().replicas, Some(1));

            let c = container(&deployment);
            assert_eq!(c.name, CONTAINER_NAME);
            assert_eq!(c.image.as_deref(), Some("doteich/geist-connector:latest"));
            let port = &c.ports.as_ref().unwrap()[0];
            assert_eq!(port.container_port, HTTP_PORT);
            assert_eq!(port.name.as_deref(), Some("http"));

            let mounts = c.volume_mounts.as_ref().unwrap();
            assert_eq!(mounts.len(), 1);
            assert_eq!(mounts[0].mount_path, CONFIG_MOUNT_PATH);

            let vols = volumes(&deployment);
            assert_eq!(vols.len(), 1);
            assert_eq!(
                vols[0].config_map.as_ref().unwrap().name,
                "press-line-1-config"
            );
        }

        #[rstest]
        #[case::auto_created(CertificateSource::AutoCreated, 1)]
        #[case::external(CertificateSource::External, 1)]
        #[case::self_managed(CertificateSource::SelfManaged, 2)]
        fn certificate_volume_follows_certificate_source(
            #[case] source: CertificateSource,
            #[case] expected_volumes: usize,
        ) {
            let connector = self_managed("press-line-1");
            let deployment = build_deployment(&connector, source).unwrap();

            let vols = volumes(&deployment);
            let mounts = container(&deployment).volume_mounts.as_ref().unwrap();
            assert_eq!(vols.len(), expected_volumes);
            assert_eq!(mounts.len(), expected_volumes);

            if source.needs_secret() {
                assert_eq!(
                    vols[1].secret.as_ref().unwrap().secret_name.as_deref(),
                    Some("press-line-1-secret")
                );
                assert_eq!(mounts[1].mount_path, CERT_MOUNT_PATH);
                assert_eq!(mounts[1].name, vols[1].name);
            }
        }

        #[test]
        fn reserved_labels_override_custom_ones() {
            let mut connector = sample_connector("press-line-1");
            let labels = &mut connector.spec.deployment_spec.custom_labels;
            labels.insert(NAME_LABEL.to_string(), "spoofed".to_string());
            labels.insert("site".to_string(), "berlin".to_string());

            let deployment = build_deployment(&connector, CertificateSource::AutoCreated).unwrap();
            let meta_labels = deployment.metadata.labels.as_ref().unwrap();
            assert_eq!(meta_labels[NAME_LABEL], CONTAINER_NAME);
            assert_eq!(meta_labels[INSTANCE_LABEL], "press-line-1");
            assert_eq!(meta_labels["site"], "berlin");

            let spec = deployment.spec.as_ref().unwrap();
            assert_eq!(spec.selector.match_labels.as_ref(), Some(meta_labels));
            assert_eq!(
                spec.template.metadata.as_ref().unwrap().labels.as_ref(),
                Some(meta_labels)
            );
        }

        #[test]
        fn custom_image_reference() {
            let mut connector = sample_connector("press-line-1");
            connector.spec.deployment_spec.image_repo = "registry.local/geist".to_string();
            connector.spec.deployment_spec.image_version = "1.4.2".to_string();
            let deployment = build_deployment(&connector, CertificateSource::AutoCreated).unwrap();
            assert_eq!(
                container(&deployment).image.as_deref(),
                Some("registry.local/geist:1.4.2")
            );
        }
    }

    #[test]
    fn child_object_exposes_kind_and_name() {
        let connector = sample_connector("press-line-1");
        let child = ChildObject::ConfigMap(build_config_map(&connector).unwrap());
        assert_eq!(child.kind(), ChildKind::ConfigMap);
        assert_eq!(child.name(), "press-line-1-config");
        assert_eq!(ChildKind::Deployment.to_string(), "Deployment");
    }
}

//! GeistConnector CRD
//!
//! A GeistConnector declares one OPC UA to Redpanda bridge. The operator turns
//! it into a ConfigMap carrying `connectorSpec`, an optional Secret carrying
//! an inlined client certificate, and a single-replica Deployment.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::types::{
    AuthenticationType, CertificateSource, Condition, SaslType, SecurityMode, SecurityPolicy,
};
use super::{default_false, default_true};

/// Default connector image repository
pub const DEFAULT_IMAGE_REPO: &str = "doteich/geist-connector";

/// Default connector image tag
pub const DEFAULT_IMAGE_VERSION: &str = "latest";

/// Default image pull policy as written in the spec
pub const DEFAULT_PULL_POLICY: &str = "IfNotPresent";

/// GeistConnector describes a protocol connector and how to deploy it.
///
/// Example:
/// ```yaml
/// apiVersion: config.geist-iot.com/v1alpha
/// kind: GeistConnector
/// metadata:
///   name: press-line-1
///   namespace: geist
/// spec:
///   connectorSpec:
///     opcua:
///       connection:
///         endpoint: opc.tcp://plc-1.factory.local
///         port: 4840
///         mode: None
///         policy: None
///         authentication:
///           type: None
///         certificate:
///           auto_create: true
///         retry_count: 5
///       subscription:
///         sub_interval: 1000
///         nodeids:
///           - id: ns=2;s=Temperature
///     redpanda:
///       brokers: ["redpanda-0.redpanda:9092"]
///       topic: telemetry
///   deploymentSpec:
///     imageRepo: doteich/geist-connector
///     imageVersion: latest
///     pullPolicy: IfNotPresent
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "config.geist-iot.com",
    version = "v1alpha",
    kind = "GeistConnector",
    namespaced,
    status = "GeistConnectorStatus",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.deploymentSpec.imageRepo"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.deploymentSpec.imageVersion"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct GeistConnectorSpec {
    /// Protocol and broker settings handed to the connector process verbatim
    pub connector_spec: ConnectorSpec,

    /// How the connector workload is deployed
    pub deployment_spec: DeploymentSpec,
}

/// Container image and metadata for the connector Deployment
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    /// Image repository, without tag
    #[serde(default = "default_image_repo")]
    pub image_repo: String,

    /// Image tag
    #[serde(default = "default_image_version")]
    pub image_version: String,

    /// Image pull policy
    ///
    /// Kept as a plain string so the builder sees whatever was stored.
    #[serde(default = "default_pull_policy")]
    #[schemars(extend("enum" = ["Always", "IfNotPresent", "Never"]))]
    pub pull_policy: String,

    /// Annotations copied onto every child object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_annotations: BTreeMap<String, String>,

    /// Labels copied onto every child object
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_labels: BTreeMap<String, String>,
}

impl Default for DeploymentSpec {
    fn default() -> Self {
        Self {
            image_repo: default_image_repo(),
            image_version: default_image_version(),
            pull_policy: default_pull_policy(),
            custom_annotations: BTreeMap::new(),
            custom_labels: BTreeMap::new(),
        }
    }
}

impl DeploymentSpec {
    /// Full image reference as `repo:version`
    pub fn image(&self) -> String {
        format!("{}:{}", self.image_repo, self.image_version)
    }
}

fn default_image_repo() -> String {
    DEFAULT_IMAGE_REPO.to_string()
}

fn default_image_version() -> String {
    DEFAULT_IMAGE_VERSION.to_string()
}

fn default_pull_policy() -> String {
    DEFAULT_PULL_POLICY.to_string()
}

/// The configuration document the connector process reads at startup
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ConnectorSpec {
    /// Upstream OPC UA server
    pub opcua: OpcuaConfig,

    /// Downstream Redpanda/Kafka cluster
    pub redpanda: RedpandaConfig,
}

/// OPC UA connection and subscription
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct OpcuaConfig {
    /// Session parameters
    pub connection: ConnectionConfig,
    /// Monitored items
    pub subscription: SubscriptionConfig,
}

/// OPC UA session parameters
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct ConnectionConfig {
    /// Server endpoint URL (e.g., opc.tcp://host)
    pub endpoint: String,
    /// Server port
    pub port: i32,
    /// Message security mode
    pub mode: SecurityMode,
    /// Security policy
    pub policy: SecurityPolicy,
    /// User identity
    pub authentication: AuthenticationConfig,
    /// Application instance certificate
    pub certificate: CertificateConfig,
    /// Connection attempts before the connector gives up
    pub retry_count: i32,
}

/// OPC UA user identity
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AuthenticationConfig {
    /// Identity token kind
    #[serde(rename = "type")]
    pub type_: AuthenticationType,
    /// Username/password, used with `User&Password`
    #[serde(default)]
    pub credentials: CredentialConfig,
    /// Certificate path, used with `Certificate`
    #[serde(default)]
    pub certificate: AuthCertConfig,
}

/// Username and password identity token
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CredentialConfig {
    /// Username
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    /// Password (redacted by the discovery API)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

/// Certificate identity token
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct AuthCertConfig {
    /// Path to the user certificate inside the container
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate: String,
}

/// Application instance certificate settings
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct CertificateConfig {
    /// Connector generates a self-signed certificate at startup
    #[serde(default = "default_true")]
    pub auto_create: bool,
    /// Certificate is provisioned outside the operator
    #[serde(default = "default_false")]
    pub external_certificate: bool,
    /// PEM certificate, shipped in the connector Secret when self-managed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub certificate: String,
    /// PEM private key, shipped in the connector Secret when self-managed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private_key: String,
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            auto_create: true,
            external_certificate: false,
            certificate: String::new(),
            private_key: String::new(),
        }
    }
}

impl CertificateConfig {
    /// Classify where the certificate comes from
    pub fn source(&self) -> CertificateSource {
        if self.auto_create {
            CertificateSource::AutoCreated
        } else if self.external_certificate {
            CertificateSource::External
        } else {
            CertificateSource::SelfManaged
        }
    }
}

/// OPC UA subscription
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SubscriptionConfig {
    /// Publishing interval in milliseconds
    pub sub_interval: i32,
    /// Nodes to monitor
    pub nodeids: Vec<NodeIdInfo>,
}

/// A monitored OPC UA node
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct NodeIdInfo {
    /// Node id string (e.g., ns=2;s=Temperature)
    pub id: String,
}

/// Downstream broker settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RedpandaConfig {
    /// Seed broker addresses (host:port)
    pub brokers: Vec<String>,
    /// Topic records are produced to
    pub topic: String,
    /// SASL authentication
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<RedpandaAuthConfig>,
    /// TLS settings
    #[serde(default)]
    pub tls: RedpandaTlsConfig,
}

/// Broker authentication
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RedpandaAuthConfig {
    /// SASL credentials
    pub sasl: SaslConfig,
}

/// SASL credentials
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct SaslConfig {
    /// Mechanism, `None` when written as an empty string
    #[serde(
        rename = "type",
        default,
        deserialize_with = "deserialize_sasl_type",
        serialize_with = "serialize_sasl_type"
    )]
    #[schemars(with = "SaslType")]
    pub type_: Option<SaslType>,
    /// SASL username
    #[serde(default)]
    pub user: String,
    /// SASL password
    #[serde(default)]
    pub password: String,
}

fn deserialize_sasl_type<'de, D>(deserializer: D) -> Result<Option<SaslType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<SaslType>()
        .map(Some)
        .map_err(serde::de::Error::custom)
}

fn serialize_sasl_type<S>(value: &Option<SaslType>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(mechanism) => mechanism.serialize(serializer),
        None => serializer.serialize_str(""),
    }
}

/// Broker TLS settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
pub struct RedpandaTlsConfig {
    /// Skip broker certificate verification
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

/// Status for GeistConnector
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GeistConnectorStatus {
    /// Conditions describing the connector's state
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl GeistConnector {
    /// Where this connector's certificate comes from
    pub fn certificate_source(&self) -> CertificateSource {
        self.spec
            .connector_spec
            .opcua
            .connection
            .certificate
            .source()
    }
}

//! Custom Resource Definitions for Geist

mod connector;
mod types;

pub use connector::{
    AuthCertConfig, AuthenticationConfig, CertificateConfig, ConnectionConfig, ConnectorSpec,
    CredentialConfig, DeploymentSpec, GeistConnector, GeistConnectorSpec, GeistConnectorStatus,
    NodeIdInfo, OpcuaConfig, RedpandaAuthConfig, RedpandaConfig, RedpandaTlsConfig, SaslConfig,
    SubscriptionConfig, DEFAULT_IMAGE_REPO, DEFAULT_IMAGE_VERSION, DEFAULT_PULL_POLICY,
};
pub use types::{
    AuthenticationType, CertificateSource, Condition, ConditionStatus, SaslType, SecurityMode,
    SecurityPolicy,
};

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_false() -> bool {
    false
}
